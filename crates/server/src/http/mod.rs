use axum::{
    Router,
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::get,
};
use deployment::Deployment;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{DeploymentImpl, routes};

pub mod auth;

pub const API_PREFIX: &str = "/api/v1";

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(origin = %origin, error = %err, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

pub fn router(deployment: DeploymentImpl) -> Router {
    let protected_routes = Router::new()
        .merge(routes::auth::router())
        .merge(routes::users::router(&deployment))
        .merge(routes::teams::router(&deployment))
        .merge(routes::board::router())
        .merge(routes::themes::router(&deployment))
        .merge(routes::project_types::router(&deployment))
        .merge(routes::task_types::router(&deployment))
        .merge(routes::projects::router(&deployment))
        .merge(routes::tasks::router(&deployment))
        .merge(routes::releases::router(&deployment))
        .merge(routes::github::router(&deployment))
        .layer(from_fn_with_state(
            deployment.clone(),
            auth::require_api_auth,
        ));

    let api_routes = Router::new()
        .merge(protected_routes)
        .merge(routes::auth::public_router())
        .merge(routes::github::webhook_router());

    let cors = cors_layer(&deployment.settings().cors_origins);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest(API_PREFIX, api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(deployment)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::test_support::{TestApp, read_json};

    #[tokio::test]
    async fn health_is_public() {
        let app = TestApp::new().await;

        let response = app
            .router()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = read_json(response).await;
        assert_eq!(json["status"], "healthy");
    }

    #[tokio::test]
    async fn api_requires_bearer_token() {
        let app = TestApp::new().await;

        let response = app
            .router()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/themes")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = read_json(response).await;
        assert_eq!(json.get("success").and_then(Value::as_bool), Some(false));
        assert_eq!(
            json.get("message").and_then(Value::as_str),
            Some("Unauthorized")
        );
    }

    #[tokio::test]
    async fn garbage_token_is_rejected() {
        let app = TestApp::new().await;

        let response = app
            .router()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/auth/me")
                    .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn login_then_me_round_trips_the_admin() {
        let app = TestApp::new().await;

        let (status, json) = app
            .send(
                "POST",
                "/api/v1/auth/login",
                None,
                Some(json!({"email": "admin@test.dev", "password": "password123"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["token_type"], "bearer");
        let token = json["data"]["access_token"].as_str().unwrap().to_string();

        let (status, json) = app.send("GET", "/api/v1/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["email"], "admin@test.dev");
        assert_eq!(json["data"]["role"], "admin");
    }

    #[tokio::test]
    async fn inactive_user_is_forbidden() {
        let app = TestApp::new().await;
        let (user, token) = app.user("idle@test.dev", false).await;

        let (status, _) = app
            .send(
                "PATCH",
                &format!("/api/v1/users/{}", user.id),
                Some(&app.admin_token),
                Some(json!({"is_active": false})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, json) = app.send("GET", "/api/v1/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["message"], "Inactive user");
    }
}
