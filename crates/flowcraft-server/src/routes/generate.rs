use crate::credentials::{self, ClientConfig};
use crate::error::GatewayError;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use flowcraft::{
    chart::ChartType,
    composer::{GenerationMode, GenerationRequest, UserInput},
    providers::factory,
};
use futures::Stream;
use serde::Deserialize;
use serde_json::{json, Value};
use std::{
    convert::Infallible,
    pin::Pin,
    task::{Context, Poll},
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    #[serde(default)]
    config: Option<ClientConfig>,
    #[serde(default)]
    user_input: Option<UserInput>,
    #[serde(default)]
    chart_type: Option<String>,
    #[serde(default)]
    presentation_mode: bool,
    #[serde(default)]
    plan: Option<String>,
    #[serde(default)]
    existing_elements: Option<Vec<Value>>,
    #[serde(default)]
    step_number: Option<u32>,
    #[serde(default)]
    total_steps: Option<u32>,
}

/// Event stream body: one `data:` frame per increment, then `[DONE]` or an error frame
pub struct SseResponse {
    rx: UnboundedReceiverStream<String>,
}

impl SseResponse {
    fn new(rx: UnboundedReceiverStream<String>) -> Self {
        Self { rx }
    }
}

impl Stream for SseResponse {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.rx)
            .poll_next(cx)
            .map(|opt| opt.map(|s| Ok(Bytes::from(s))))
    }
}

impl IntoResponse for SseResponse {
    fn into_response(self) -> Response {
        let body = axum::body::Body::from_stream(self);
        (
            [
                (header::CONTENT_TYPE, "text/event-stream"),
                (header::CACHE_CONTROL, "no-cache"),
                (header::CONNECTION, "keep-alive"),
            ],
            body,
        )
            .into_response()
    }
}

struct SseFormatter;

impl SseFormatter {
    const DONE: &'static str = "data: [DONE]\n\n";

    fn format_content(text: &str) -> String {
        format!("data: {}\n\n", json!({ "content": text }))
    }

    fn format_error(message: &str) -> String {
        format!("data: {}\n\n", json!({ "error": message }))
    }
}

async fn handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<SseResponse, GatewayError> {
    let Json(request) = payload?;

    let (config, source) = credentials::resolve(&state.policy, &headers, request.config)?;
    let input = request
        .user_input
        .filter(|input| !input.is_empty())
        .ok_or_else(|| GatewayError::BadRequest("Missing required parameters".to_string()))?;

    let generation = GenerationRequest {
        config,
        input,
        chart_type: ChartType::from_client(request.chart_type.as_deref()),
        mode: GenerationMode::from_request(
            request.presentation_mode,
            request.plan,
            request.existing_elements,
            request.step_number,
            request.total_steps,
        ),
    };
    let messages = generation
        .messages()
        .map_err(|e| GatewayError::Internal(e.to_string()))?;

    tracing::info!(
        provider = %generation.config.provider_type,
        model = %generation.config.model,
        credentials = source.as_str(),
        mode = generation.mode.label(),
        chart_type = generation.chart_type.as_ref(),
        has_image = generation.input.image().is_some(),
        "Starting generation"
    );

    // Unbounded: the increment sink cannot await, and increments are never dropped
    let (tx, rx) = mpsc::unbounded_channel();
    let config = generation.config;

    tokio::spawn(async move {
        let content_tx = tx.clone();
        let mut forward = move |text: &str| {
            let _ = content_tx.send(SseFormatter::format_content(text));
        };

        // Dropping the generation future on disconnect drops the upstream body with it
        let outcome = tokio::select! {
            result = factory::send(config, &messages, &mut forward) => Some(result),
            _ = tx.closed() => None,
        };

        match outcome {
            Some(Ok(full)) => {
                tracing::debug!(chars = full.len(), "Generation complete");
                let _ = tx.send(SseFormatter::DONE.to_string());
            }
            Some(Err(e)) => {
                tracing::error!("Generation failed: {}", e);
                let _ = tx.send(SseFormatter::format_error(&e.to_string()));
            }
            None => tracing::info!("Client disconnected, generation cancelled"),
        }
    });

    Ok(SseResponse::new(UnboundedReceiverStream::new(rx)))
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/generate", post(handler))
        .with_state(state)
}
