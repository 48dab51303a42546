use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::session;
use crate::shared::AppState;

/// Builds the HTTP surface: public auth routes, bearer-protected routes and `/health`
pub fn create_router(app_state: AppState, cors_origins: &[String]) -> Router {
    let protected = Router::new()
        .route("/auth/logout", post(session::logout))
        .route("/auth/me", get(session::me))
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            session::jwt_auth,
        ));

    Router::new()
        .route("/health", get(health))
        .route("/auth/login", post(session::login))
        .route("/auth/refresh-token", post(session::refresh_token))
        .merge(protected)
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(allowed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::JwtConfig,
        session::{
            password::CredentialVerifier, repository::InMemoryAuthRepository,
            service::SessionService, token::TokenCodec,
        },
        user::repository::InMemoryUserRepository,
    };
    use axum::{body::Body, http::Request, http::StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app(origins: &[String]) -> Router {
        let service = SessionService::new(
            TokenCodec::new(&JwtConfig::new("routes-test-secret", 15, 24)),
            CredentialVerifier::new(4),
            Arc::new(InMemoryAuthRepository::new()),
            Arc::new(InMemoryUserRepository::new()),
        );
        create_router(AppState::new(Arc::new(service)), origins)
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(&["*".to_string()])
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_cors_allows_configured_origin() {
        let response = app(&["http://localhost:3000".to_string()])
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("origin", "http://localhost:3000")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "http://localhost:3000"
        );
    }

    #[tokio::test]
    async fn test_public_routes_do_not_need_bearer() {
        let response = app(&["*".to_string()])
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/auth/refresh-token")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"refresh_token":"unknown"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        // Reaches the handler, which rejects the unknown token rather than the missing header
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["error"]["code"], "INVALID_TOKEN");
    }
}
