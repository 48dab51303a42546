use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::setup::{TestSetup, TEST_PASSWORD};

/// Status and parsed JSON body of one request
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiResponse {
    pub fn error_code(&self) -> &str {
        self.body["error"]["code"].as_str().unwrap_or_default()
    }
}

/// Tokens returned by a successful login
pub struct LoginTokens {
    pub access_token: String,
    pub refresh_token: String,
}

// ============================================================================
// Request helpers
// ============================================================================

impl TestSetup {
    pub async fn send(&self, request: Request<Body>) -> ApiResponse {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        ApiResponse { status, body }
    }

    fn post_json(uri: &str, body: Value, bearer: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(token) = bearer {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    pub async fn login(&self, username: &str, password: &str) -> ApiResponse {
        self.send(Self::post_json(
            "/auth/login",
            json!({ "username": username, "password": password }),
            None,
        ))
        .await
    }

    /// Logs in with the shared test password and returns the token pair
    pub async fn login_ok(&self, username: &str) -> LoginTokens {
        let response = self.login(username, TEST_PASSWORD).await;
        assert_eq!(response.status, StatusCode::OK, "login failed: {}", response.body);
        LoginTokens {
            access_token: response.body["token"]["access_token"]
                .as_str()
                .unwrap()
                .to_string(),
            refresh_token: response.body["token"]["refresh_token"]
                .as_str()
                .unwrap()
                .to_string(),
        }
    }

    pub async fn refresh(&self, refresh_token: &str) -> ApiResponse {
        self.send(Self::post_json(
            "/auth/refresh-token",
            json!({ "refresh_token": refresh_token }),
            None,
        ))
        .await
    }

    pub async fn logout(&self, access_token: &str, refresh_token: &str) -> ApiResponse {
        self.send(Self::post_json(
            "/auth/logout",
            json!({ "refresh_token": refresh_token }),
            Some(access_token),
        ))
        .await
    }

    pub async fn me(&self, access_token: &str) -> ApiResponse {
        self.me_with_authorization(&format!("Bearer {}", access_token))
            .await
    }

    /// GET /auth/me with a raw Authorization header value
    pub async fn me_with_authorization(&self, authorization: &str) -> ApiResponse {
        self.send(
            Request::builder()
                .uri("/auth/me")
                .header("authorization", authorization)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }
}
