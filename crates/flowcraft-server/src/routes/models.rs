use crate::credentials::{self, ClientConfig};
use crate::error::GatewayError;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use flowcraft::providers::{
    base::{ConnectionReport, ModelInfo},
    factory,
};
use serde::{Deserialize, Serialize};

#[derive(Default, Deserialize)]
struct ConfigRequest {
    #[serde(default)]
    config: Option<ClientConfig>,
}

#[derive(Debug, Serialize)]
struct ModelsResponse {
    models: Vec<ModelInfo>,
}

async fn list_models(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ConfigRequest>, JsonRejection>,
) -> Result<Json<ModelsResponse>, GatewayError> {
    let Json(request) = payload?;
    let (config, source) =
        credentials::resolve_for_listing(&state.policy, &headers, request.config)?;
    tracing::info!(provider = %config.provider_type, credentials = source.as_str(), "Listing models");

    let provider = factory::get_provider(config).map_err(|e| GatewayError::Internal(e.to_string()))?;
    let models = provider
        .list_models()
        .await
        .map_err(|e| GatewayError::Internal(e.to_string()))?;
    Ok(Json(ModelsResponse { models }))
}

async fn test_connection(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ConfigRequest>, JsonRejection>,
) -> Result<Json<ConnectionReport>, GatewayError> {
    let Json(request) = payload?;
    let (config, source) =
        credentials::resolve_for_listing(&state.policy, &headers, request.config)?;
    tracing::info!(provider = %config.provider_type, credentials = source.as_str(), "Testing connection");

    Ok(Json(factory::test_connection(config).await))
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/models", post(list_models))
        .route("/api/test-connection", post(test_connection))
        .with_state(state)
}
