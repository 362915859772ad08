use axum::{
    Json,
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use db::models::user::User;
use deployment::Deployment;
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError};

/// Authenticated caller, inserted into request extensions by [`require_api_auth`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn id(&self) -> i64 {
        self.0.id
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.0.is_admin() {
            Ok(())
        } else {
            Err(ApiError::admin_required())
        }
    }

    /// Admins may act on anyone; everyone else only on themselves.
    pub fn require_self_or_admin(&self, user_id: i64) -> Result<(), ApiError> {
        if self.0.is_admin() || self.0.id == user_id {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Not enough permissions".to_string()))
        }
    }
}

pub(crate) fn parse_authorization_bearer(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    let (prefix, rest) = trimmed.split_once(' ')?;
    if !prefix.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = rest.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}

fn reject(req: &Request, status: StatusCode, reason: &'static str, message: &str) -> Response {
    tracing::warn!(
        path = %req.uri().path(),
        method = %req.method(),
        reason,
        "Unauthorized API request"
    );
    let response = ApiResponse::<()>::error(message);
    (status, Json(response)).into_response()
}

pub async fn require_api_auth(
    State(deployment): State<DeploymentImpl>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(token) = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_authorization_bearer)
        .map(str::to_string)
    else {
        return reject(&req, StatusCode::UNAUTHORIZED, "missing_token", "Unauthorized");
    };

    let user_id = match deployment
        .jwt()
        .verify(&token)
        .and_then(|claims| claims.user_id())
    {
        Ok(user_id) => user_id,
        Err(err) => {
            tracing::debug!(error = %err, "Rejected access token");
            return reject(&req, StatusCode::UNAUTHORIZED, "invalid_token", "Unauthorized");
        }
    };

    let user = match User::find_by_id(&deployment.db().pool, user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return reject(&req, StatusCode::UNAUTHORIZED, "unknown_user", "Unauthorized");
        }
        Err(err) => return ApiError::Database(err).into_response(),
    };

    if !user.is_active {
        return reject(&req, StatusCode::FORBIDDEN, "inactive_user", "Inactive user");
    }

    req.extensions_mut().insert(CurrentUser(user));
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_prefix_is_case_insensitive_and_trimmed() {
        assert_eq!(parse_authorization_bearer("Bearer abc"), Some("abc"));
        assert_eq!(parse_authorization_bearer("  bearer   abc  "), Some("abc"));
        assert_eq!(parse_authorization_bearer("Basic abc"), None);
        assert_eq!(parse_authorization_bearer("Bearer "), None);
        assert_eq!(parse_authorization_bearer("abc"), None);
    }
}
