use crate::config::ConvertConfig;
use crate::handlers;
use crate::services::MarkdownConverter;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use std::future::IntoFuture;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: ConvertConfig,
    pub converter: MarkdownConverter,
}

pub struct Application {
    port: u16,
    server: Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + Unpin>,
}

impl Application {
    pub async fn build(config: ConvertConfig) -> Result<Self, AppError> {
        tokio::fs::create_dir_all(&config.converter.scratch_dir)
            .await
            .map_err(|e| {
                tracing::error!(
                    "Failed to create scratch directory {:?}: {}",
                    config.converter.scratch_dir,
                    e
                );
                AppError::from(e)
            })?;

        let converter = MarkdownConverter::new(&config.converter);

        let state = AppState {
            config: config.clone(),
            converter,
        };

        // Axum's default 2 MiB body cap is far below ordinary documents.
        let body_limit = match config.max_upload_mb {
            0 => DefaultBodyLimit::disable(),
            mb => DefaultBodyLimit::max((mb * 1024 * 1024) as usize),
        };

        let app = Router::new()
            .route("/", get(handlers::index))
            .route("/health", get(handlers::health_check))
            .route("/metrics", get(handlers::metrics_endpoint))
            .route(
                "/convert",
                post(handlers::convert_file).options(handlers::preflight),
            )
            .layer(body_limit)
            .layer(TraceLayer::new_for_http())
            // Any origin may call the service.
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
            .with_state(state);

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        let server = axum::serve(listener, app);

        Ok(Self {
            port,
            server: Box::new(server.into_future()),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}
