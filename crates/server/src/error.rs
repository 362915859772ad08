use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use db::{
    DbErr, is_unique_violation,
    models::{project::ProjectError, task::TaskError},
};
use deployment::DeploymentError;
use services::services::{
    board::BoardError, custom_fields::CustomFieldError, password::PasswordHashError,
    team::TeamDeletionError, type_migration::TypeMigrationError, type_schema::TypeSchemaError,
    validation::ValidationError, workflow::WorkflowError,
};
use thiserror::Error;
use utils::{pagination::PaginationError, response::ApiResponse};
use utils_jwt::JwtError;

#[derive(Debug, Error, ts_rs::TS)]
#[ts(type = "string")]
pub enum ApiError {
    #[error(transparent)]
    Project(#[from] ProjectError),
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error(transparent)]
    CustomField(#[from] CustomFieldError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Pagination(#[from] PaginationError),
    #[error(transparent)]
    TypeMigration(#[from] TypeMigrationError),
    #[error(transparent)]
    TypeSchema(#[from] TypeSchemaError),
    #[error(transparent)]
    TeamDeletion(#[from] TeamDeletionError),
    #[error(transparent)]
    Board(#[from] BoardError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Password(#[from] PasswordHashError),
    #[error(transparent)]
    Deployment(#[from] DeploymentError),
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(what: &str) -> Self {
        ApiError::NotFound(format!("{what} not found"))
    }

    pub fn admin_required() -> Self {
        ApiError::Forbidden("Admin privileges required".to_string())
    }

    fn status_and_type(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Project(err) => match err {
                ProjectError::ProjectNotFound => (StatusCode::NOT_FOUND, "ProjectError"),
                ProjectError::DependencyNotFound | ProjectError::Dependency(_) => {
                    (StatusCode::BAD_REQUEST, "ProjectError")
                }
                ProjectError::Database(db_err) => database_status(db_err),
            },
            ApiError::Task(err) => match err {
                TaskError::TaskNotFound => (StatusCode::NOT_FOUND, "TaskError"),
                TaskError::DependencyNotFound | TaskError::Dependency(_) => {
                    (StatusCode::BAD_REQUEST, "TaskError")
                }
                TaskError::Database(db_err) => database_status(db_err),
            },
            ApiError::Workflow(_) => (StatusCode::BAD_REQUEST, "WorkflowError"),
            ApiError::CustomField(_) => (StatusCode::BAD_REQUEST, "CustomFieldError"),
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "ValidationError"),
            ApiError::Pagination(_) => (StatusCode::BAD_REQUEST, "PaginationError"),
            ApiError::TypeMigration(err) => match err {
                TypeMigrationError::SourceNotFound(_) | TypeMigrationError::FieldNotFound => {
                    (StatusCode::NOT_FOUND, "TypeMigrationError")
                }
                TypeMigrationError::Database(db_err) => database_status(db_err),
                _ => (StatusCode::BAD_REQUEST, "TypeMigrationError"),
            },
            ApiError::TypeSchema(_) => (StatusCode::BAD_REQUEST, "TypeSchemaError"),
            ApiError::TeamDeletion(err) => match err {
                TeamDeletionError::TeamNotFound => (StatusCode::NOT_FOUND, "TeamDeletionError"),
                TeamDeletionError::Database(db_err) => database_status(db_err),
                _ => (StatusCode::BAD_REQUEST, "TeamDeletionError"),
            },
            ApiError::Board(err) => match err {
                BoardError::TaskNotFound(_) => (StatusCode::NOT_FOUND, "BoardError"),
                BoardError::UnknownColumn { .. } => (StatusCode::BAD_REQUEST, "BoardError"),
            },
            ApiError::Jwt(_) => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            ApiError::Password(_) => (StatusCode::INTERNAL_SERVER_ERROR, "PasswordError"),
            ApiError::Deployment(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DeploymentError"),
            ApiError::Database(db_err) => database_status(db_err),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "ForbiddenError"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BadRequest"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "InternalError"),
        }
    }
}

fn database_status(err: &DbErr) -> (StatusCode, &'static str) {
    match err {
        DbErr::RecordNotFound(_) => (StatusCode::NOT_FOUND, "DatabaseError"),
        err if is_unique_violation(err) => (StatusCode::BAD_REQUEST, "IntegrityError"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "DatabaseError"),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, error_type) = self.status_and_type();

        let error_message = match &self {
            ApiError::Jwt(_) | ApiError::Unauthorized => "Unauthorized".to_string(),
            ApiError::Database(DbErr::RecordNotFound(msg)) => msg.clone(),
            _ if error_type == "IntegrityError" => {
                "Record conflicts with an existing entry".to_string()
            }
            _ if status_code.is_server_error() => format!("{}: {}", error_type, self),
            _ => self.to_string(),
        };

        if status_code.is_server_error() {
            tracing::error!(
                status = %status_code,
                error_type,
                error = %self,
                "API request failed"
            );
        }
        let response = ApiResponse::<()>::error(&error_message);
        (status_code, Json(response)).into_response()
    }
}
