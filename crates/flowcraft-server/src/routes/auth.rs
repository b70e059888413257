use crate::error::GatewayError;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
struct ValidateRequest {
    #[serde(default)]
    password: Option<String>,
}

#[derive(Debug, Serialize)]
struct ValidateResponse {
    valid: bool,
    message: String,
}

impl ValidateResponse {
    fn new<M: Into<String>>(valid: bool, message: M) -> Self {
        Self {
            valid,
            message: message.into(),
        }
    }
}

async fn validate(
    State(state): State<AppState>,
    payload: Result<Json<ValidateRequest>, JsonRejection>,
) -> (StatusCode, Json<ValidateResponse>) {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::error!("Password validation failed: {}", rejection.body_text());
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ValidateResponse::new(false, "Password validation failed")),
            );
        }
    };

    let candidate = request.password.unwrap_or_default();
    match state.policy.verify(&candidate) {
        Ok(()) => (
            StatusCode::OK,
            Json(ValidateResponse::new(true, "Access password is valid")),
        ),
        Err(e @ (GatewayError::BadRequest(_) | GatewayError::Unauthorized(_))) => {
            tracing::info!("Password validation rejected: {}", e);
            (e.status(), Json(ValidateResponse::new(false, e.to_string())))
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ValidateResponse::new(false, e.to_string())),
        ),
    }
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/auth/validate", post(validate))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::{AccessPolicy, LlmSettings};
    use axum::body::Body;
    use axum::http::{header, Request};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn call(policy: AccessPolicy, body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/api/auth/validate")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = routes(AppState::new(policy)).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn with_password() -> AccessPolicy {
        AccessPolicy::new(Some("pw".to_string()), LlmSettings::default())
    }

    #[tokio::test]
    async fn test_valid_password() {
        let (status, body) = call(with_password(), &json!({"password": "pw"}).to_string()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["valid"], true);
    }

    #[tokio::test]
    async fn test_invalid_password() {
        let (status, body) = call(with_password(), &json!({"password": "nope"}).to_string()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["valid"], false);
        assert_eq!(body["message"], "Invalid access password");
    }

    #[tokio::test]
    async fn test_server_without_password() {
        let (status, body) = call(AccessPolicy::default(), &json!({"password": "pw"}).to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["valid"], false);
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let (status, body) = call(with_password(), "{oops").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["valid"], false);
    }
}
