//! API Gateway server.

use axum::extract::DefaultBodyLimit;
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::domain::config::{GatewayConfig, GatewayConfigError};
use crate::middleware::create_cors_layer;
use crate::router::{routes, AppState};

pub struct ApiGateway {
    config: GatewayConfig,
    state: AppState,
}

impl ApiGateway {
    pub fn new(config: GatewayConfig, state: AppState) -> Result<Self, GatewayConfigError> {
        config.validate()?;
        Ok(Self { config, state })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Routes with the trace, CORS and body limit layers applied.
    pub fn router(&self) -> Router {
        routes(self.state.clone())
            .layer(DefaultBodyLimit::max(self.config.limits.max_body_bytes))
            .layer(create_cors_layer(&self.config.cors))
            .layer(TraceLayer::new_for_http())
    }

    /// Bind the configured address.
    pub async fn bind(&self) -> std::io::Result<TcpListener> {
        TcpListener::bind(self.config.http_addr()).await
    }

    /// Serve on `listener` until `shutdown` resolves.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr: SocketAddr = listener.local_addr()?;
        info!(addr = %addr, "Starting HTTP server");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("HTTP server stopped");
        Ok(())
    }
}
