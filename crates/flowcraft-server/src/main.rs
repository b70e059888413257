mod configuration;
mod credentials;
mod error;
mod routes;
mod state;

use configuration::Settings;
use state::AppState;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::new()?;
    let addr = settings.server.socket_addr()?;

    let policy = settings.access_policy();
    info!(
        access_password = policy.has_password(),
        server_llm = policy.has_server_llm(),
        "Loaded access policy"
    );

    let app = routes::configure(AppState::new(policy));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
