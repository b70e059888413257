// Export route modules
pub mod auth;
pub mod generate;
pub mod health;
pub mod models;

use crate::state::AppState;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

pub fn configure(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(generate::routes(state.clone()))
        .merge(auth::routes(state.clone()))
        .merge(models::routes(state))
        .merge(health::routes())
        .layer(cors)
}
