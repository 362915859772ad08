use std::sync::Arc;

use async_trait::async_trait;
use config::Settings;
use db::DBService;
use deployment::{Deployment, DeploymentError};
use secrecy::ExposeSecret;
use services::services::github::TaskIdMatcher;
use utils_jwt::JwtService;

#[derive(Clone)]
pub struct LocalDeployment {
    settings: Arc<Settings>,
    db: DBService,
    jwt: JwtService,
    task_ids: TaskIdMatcher,
}

#[async_trait]
impl Deployment for LocalDeployment {
    async fn new() -> Result<Self, DeploymentError> {
        Self::from_settings(Settings::from_env()).await
    }

    fn settings(&self) -> &Settings {
        &self.settings
    }

    fn db(&self) -> &DBService {
        &self.db
    }

    fn jwt(&self) -> &JwtService {
        &self.jwt
    }

    fn task_ids(&self) -> &TaskIdMatcher {
        &self.task_ids
    }
}

impl LocalDeployment {
    pub async fn from_settings(settings: Settings) -> Result<Self, DeploymentError> {
        let db = DBService::new(&settings.database_url).await?;
        let jwt = JwtService::new(
            settings.secret_key.expose_secret().as_bytes(),
            settings.access_token_expire_minutes,
        );
        let task_ids = TaskIdMatcher::new(&settings.task_id_prefix)?;

        tracing::info!(
            app_name = %settings.app_name,
            task_id_prefix = %settings.task_id_prefix,
            webhook_signatures = settings.github_webhook_secret.is_some(),
            "Deployment ready"
        );

        Ok(Self {
            settings: Arc::new(settings),
            db,
            jwt,
            task_ids,
        })
    }
}
