pub mod handlers;

use std::net::SocketAddr;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use handlers::{ConsumerState, LastOutcome, ProducerState};

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

pub fn producer_router(state: ProducerState) -> Router {
    Router::new()
        .route("/generate", get(handlers::handle_generate))
        .route("/file", get(handlers::handle_file))
        .route("/health", get(handlers::handle_health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors())
}

pub fn consumer_router(state: ConsumerState) -> Router {
    Router::new()
        .route("/", get(handlers::handle_index))
        .route("/fetch", post(handlers::handle_fetch))
        .route("/records", get(handlers::handle_records))
        .route("/health", get(handlers::handle_health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors())
}

pub async fn serve_producer(listener: TcpListener, state: ProducerState) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "producer listening");
    axum::serve(listener, producer_router(state)).await?;
    Ok(())
}

/// Serve the consumer surface. Peer addresses are exposed to handlers so
/// each record can name who asked for it.
pub async fn serve_consumer(listener: TcpListener, state: ConsumerState) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "consumer listening");
    axum::serve(
        listener,
        consumer_router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
