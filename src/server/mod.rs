//! HTTP surface of the catalog
//!
//! Routes:
//! - `GET /lib`: filtered song listing, 20 per page
//! - `GET /text`: one verse of a song's text
//! - `DELETE /song`, `PATCH /song`, `POST /song`: song maintenance

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{delete, get};
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::info;
use url::Url;

use crate::error::Result;
use crate::services::song_service::SongService;

pub mod handlers;
pub mod response;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SongService>,
    /// Base URL of the song lookup API
    pub api_url: Arc<Url>,
}

impl AppState {
    pub fn new(service: Arc<SongService>, api_url: Url) -> Self {
        Self {
            service,
            api_url: Arc::new(api_url),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/lib", get(handlers::get_lib))
        .route("/text", get(handlers::get_text))
        .route(
            "/song",
            delete(handlers::del_song)
                .patch(handlers::change_song)
                .post(handlers::create_song),
        )
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

async fn log_requests(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    info!(
        "Completed {} {} with {} in {:?}",
        method,
        path,
        response.status().as_u16(),
        start.elapsed()
    );
    response
}

/// Serves until `shutdown` resolves, then lets in-flight requests finish.
pub async fn serve<F>(state: AppState, addr: SocketAddr, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server stopped");
    Ok(())
}
