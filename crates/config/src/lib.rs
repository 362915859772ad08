//! Process settings read from the environment.
//!
//! Every value has a default; malformed values are logged and replaced by the default so a
//! typo in one variable never prevents the server from starting.

use std::env;

use secrecy::SecretString;
use tracing::warn;

pub const DEFAULT_APP_NAME: &str = "Core PM";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://core_pm.db?mode=rwc";
const DEFAULT_SECRET_KEY: &str = "change-me-in-production";
pub const DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES: i64 = 60 * 24 * 7;
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:5173,http://localhost:3000";
pub const DEFAULT_TASK_ID_PREFIX: &str = "CORE";
pub const DEFAULT_PAGE_SIZE: u64 = 50;
pub const DEFAULT_MAX_PAGE_SIZE: u64 = 100;
pub const DEFAULT_THEME_STATUSES: [&str; 3] = ["active", "completed", "archived"];
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Clone)]
pub struct Settings {
    pub app_name: String,
    pub database_url: String,
    pub secret_key: SecretString,
    pub access_token_expire_minutes: i64,
    pub cors_origins: Vec<String>,
    pub github_webhook_secret: Option<SecretString>,
    pub task_id_prefix: String,
    pub default_page_size: u64,
    pub max_page_size: u64,
    /// Allowed theme statuses; the first entry is the default for new themes.
    pub theme_statuses: Vec<String>,
    pub host: String,
    pub port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: DEFAULT_APP_NAME.to_string(),
            database_url: DEFAULT_DATABASE_URL.to_string(),
            secret_key: SecretString::from(DEFAULT_SECRET_KEY),
            access_token_expire_minutes: DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES,
            cors_origins: split_list(DEFAULT_CORS_ORIGINS),
            github_webhook_secret: None,
            task_id_prefix: DEFAULT_TASK_ID_PREFIX.to_string(),
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            theme_statuses: DEFAULT_THEME_STATUSES
                .iter()
                .map(|status| status.to_string())
                .collect(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_env_with(|name| env::var(name).ok())
    }

    pub fn from_env_with<F>(get_env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let secret_key = match read_env_string("SECRET_KEY", &get_env) {
            Some(value) => SecretString::from(value),
            None => {
                warn!("SECRET_KEY is not set; using the development default");
                defaults.secret_key.clone()
            }
        };

        let max_page_size = normalize_max(
            read_env_u64("MAX_PAGE_SIZE", defaults.max_page_size, &get_env),
            "MAX_PAGE_SIZE",
        );
        let mut default_page_size = normalize_max(
            read_env_u64("DEFAULT_PAGE_SIZE", defaults.default_page_size, &get_env),
            "DEFAULT_PAGE_SIZE",
        );
        if default_page_size > max_page_size {
            warn!(
                "DEFAULT_PAGE_SIZE ({default_page_size}) exceeds MAX_PAGE_SIZE ({max_page_size}); clamping."
            );
            default_page_size = max_page_size;
        }

        let theme_statuses = match read_env_string("THEME_STATUSES", &get_env) {
            Some(raw) => {
                let statuses = dedup(split_list(&raw));
                if statuses.is_empty() {
                    warn!("THEME_STATUSES='{raw}' has no entries. Using defaults.");
                    defaults.theme_statuses.clone()
                } else {
                    statuses
                }
            }
            None => defaults.theme_statuses.clone(),
        };

        let task_id_prefix = read_env_string("TASK_ID_PREFIX", &get_env)
            .map(|prefix| prefix.to_uppercase())
            .unwrap_or_else(|| defaults.task_id_prefix.clone());

        let port = read_env_string("BACKEND_PORT", &get_env)
            .or_else(|| read_env_string("PORT", &get_env))
            .map(|value| match value.parse::<u16>() {
                Ok(port) => port,
                Err(err) => {
                    warn!("Invalid PORT='{value}': {err}. Using default {DEFAULT_PORT}.");
                    DEFAULT_PORT
                }
            })
            .unwrap_or(defaults.port);

        Self {
            app_name: read_env_string("APP_NAME", &get_env).unwrap_or(defaults.app_name),
            database_url: read_env_string("DATABASE_URL", &get_env)
                .unwrap_or(defaults.database_url),
            secret_key,
            access_token_expire_minutes: read_env_i64(
                "ACCESS_TOKEN_EXPIRE_MINUTES",
                defaults.access_token_expire_minutes,
                &get_env,
            ),
            cors_origins: read_env_string("CORS_ORIGINS", &get_env)
                .map(|raw| split_list(&raw))
                .unwrap_or(defaults.cors_origins),
            github_webhook_secret: read_env_string("GITHUB_WEBHOOK_SECRET", &get_env)
                .map(SecretString::from),
            task_id_prefix,
            default_page_size,
            max_page_size,
            theme_statuses,
            host: read_env_string("HOST", &get_env).unwrap_or(defaults.host),
            port,
        }
    }

    pub fn default_theme_status(&self) -> &str {
        self.theme_statuses
            .first()
            .map(String::as_str)
            .unwrap_or(DEFAULT_THEME_STATUSES[0])
    }
}

fn read_env_string<F>(name: &str, get_env: &F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    get_env(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn read_env_u64<F>(name: &str, default: u64, get_env: &F) -> u64
where
    F: Fn(&str) -> Option<String>,
{
    match read_env_string(name, get_env) {
        Some(value) => match value.parse::<u64>() {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!("Invalid {name}='{value}': {err}. Using default {default}.");
                default
            }
        },
        None => default,
    }
}

fn read_env_i64<F>(name: &str, default: i64, get_env: &F) -> i64
where
    F: Fn(&str) -> Option<String>,
{
    match read_env_string(name, get_env) {
        Some(value) => match value.parse::<i64>() {
            Ok(parsed) if parsed > 0 => parsed,
            Ok(parsed) => {
                warn!("{name} must be positive (got {parsed}). Using default {default}.");
                default
            }
            Err(err) => {
                warn!("Invalid {name}='{value}': {err}. Using default {default}.");
                default
            }
        },
        None => default,
    }
}

fn normalize_max(value: u64, name: &str) -> u64 {
    if value == 0 {
        warn!("{name} set to 0. Using minimum value 1.");
        1
    } else {
        value
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

fn dedup(values: Vec<String>) -> Vec<String> {
    let mut seen = Vec::with_capacity(values.len());
    for value in values {
        if !seen.contains(&value) {
            seen.push(value);
        }
    }
    seen
}
