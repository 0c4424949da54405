//! HTTP front for the prediction service.
//!
//! `POST /predict_image` and `POST /predict_video` take a multipart upload in
//! the `file` field and answer `{ "prediction": "<label>" }`, or
//! `{ "error": "..." }` with a 4xx/5xx status.

mod routes;

use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Instant};

use anyhow::Context;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

use crate::service::SignService;

const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

pub struct AppState {
    pub service: SignService,
    pub upload_dir: PathBuf,
    started: Instant,
}

impl AppState {
    pub fn new(service: SignService, upload_dir: PathBuf) -> Self {
        Self {
            service,
            upload_dir,
            started: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started.elapsed().as_secs()
    }
}

pub type SharedState = Arc<AppState>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/predict_image", post(routes::predict_image))
        .route("/predict_video", post(routes::predict_video))
        .with_state(Arc::new(state))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    std::fs::create_dir_all(&state.upload_dir).with_context(|| {
        format!(
            "failed to create upload directory {}",
            state.upload_dir.display()
        )
    })?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    log::info!("listening on http://{addr}");

    axum::serve(listener, router(state)).await?;
    Ok(())
}
