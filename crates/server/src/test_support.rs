use std::sync::{Mutex, MutexGuard, OnceLock};

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    response::Response,
};
use db::{models::user::User, types::UserRole};
use deployment::Deployment;
use serde_json::Value;
use services::services::password::hash_password;
use test_support::TempRoot;
use tower::ServiceExt;

use crate::{DeploymentImpl, http};

pub const TEST_WEBHOOK_SECRET: &str = "webhook-sekrit";
pub const TEST_PASSWORD: &str = "password123";

pub fn test_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

/// Sets process env vars for the lifetime of the guard and restores them on drop.
pub struct TestEnvGuard {
    _lock: MutexGuard<'static, ()>,
    previous: Vec<(&'static str, Option<String>)>,
}

impl TestEnvGuard {
    pub fn new(vars: &[(&'static str, Option<&str>)]) -> Self {
        let lock = test_lock().lock().unwrap_or_else(|err| err.into_inner());
        let mut previous = Vec::with_capacity(vars.len());

        for (name, value) in vars {
            previous.push((*name, std::env::var(name).ok()));
            // SAFETY: tests using TestEnvGuard are serialized by test_lock.
            unsafe {
                match value {
                    Some(value) => std::env::set_var(name, value),
                    None => std::env::remove_var(name),
                }
            }
        }

        Self {
            _lock: lock,
            previous,
        }
    }
}

impl Drop for TestEnvGuard {
    fn drop(&mut self) {
        // SAFETY: tests using TestEnvGuard are serialized by test_lock.
        unsafe {
            for (name, value) in &self.previous {
                match value {
                    Some(value) => std::env::set_var(name, value),
                    None => std::env::remove_var(name),
                }
            }
        }
    }
}

/// A deployment on a fresh file-backed database with one admin signed in.
pub struct TestApp {
    pub deployment: DeploymentImpl,
    pub admin: User,
    pub admin_token: String,
    _env_guard: TestEnvGuard,
    _temp_root: TempRoot,
}

impl TestApp {
    pub async fn new() -> Self {
        let temp_root = TempRoot::new("core-pm-server");
        let db_url = temp_root.sqlite_url("db.sqlite");
        let env_guard = TestEnvGuard::new(&[
            ("DATABASE_URL", Some(db_url.as_str())),
            ("SECRET_KEY", Some("test-secret")),
            ("TASK_ID_PREFIX", Some("CORE")),
            ("THEME_STATUSES", None),
            ("GITHUB_WEBHOOK_SECRET", Some(TEST_WEBHOOK_SECRET)),
        ]);

        let deployment = DeploymentImpl::new().await.unwrap();
        let (admin, admin_token) = create_user(&deployment, "admin@test.dev", true).await;
        Self {
            deployment,
            admin,
            admin_token,
            _env_guard: env_guard,
            _temp_root: temp_root,
        }
    }

    pub fn router(&self) -> Router {
        http::router(self.deployment.clone())
    }

    pub async fn user(&self, email: &str, admin: bool) -> (User, String) {
        create_user(&self.deployment, email, admin).await
    }

    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        (status, read_json(response).await)
    }

    /// Shorthand for admin requests that must succeed; returns `data`.
    pub async fn ok(&self, method: &str, uri: &str, body: Option<Value>) -> Value {
        let (status, json) = self.send(method, uri, Some(&self.admin_token), body).await;
        assert!(status.is_success(), "{method} {uri} -> {status}: {json}");
        json["data"].clone()
    }
}

pub async fn read_json(response: Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    if body.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&body).unwrap()
}

async fn create_user(deployment: &DeploymentImpl, email: &str, admin: bool) -> (User, String) {
    let role = if admin { UserRole::Admin } else { UserRole::User };
    let user = User::create(
        &deployment.db().pool,
        email,
        "Test User",
        hash_password(TEST_PASSWORD).unwrap(),
        role,
    )
    .await
    .unwrap();
    let token = deployment.jwt().issue(user.id, &role.to_string()).unwrap();
    (user, token)
}
