use std::sync::Arc;

use log::info;
use tokio::net::TcpListener;

use crate::config::models::Http;

use gateway::Gateway;

pub mod gateway;
pub mod models;
pub mod routes;

/// Serves the HTTP API on `http.bind` until the process is stopped.
pub async fn serve(gateway: Arc<Gateway>, http_settings: &Http) -> std::io::Result<()> {
    let listener = TcpListener::bind(&http_settings.bind).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, routes::make_router(gateway)).await
}
