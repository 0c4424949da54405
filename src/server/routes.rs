use std::{fs, io::Write, path::Path};

use axum::{
    Json,
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use super::SharedState;
use crate::{error::PredictError, types::PredictionResponse};

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<PredictError> for ApiError {
    fn from(err: PredictError) -> Self {
        if err.is_client_error() {
            log::warn!("rejected input: {err}");
            Self::bad_request(err.to_string())
        } else {
            log::error!("prediction failed: {err}");
            Self::internal(err.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub labels: usize,
    pub uptime_seconds: u64,
    pub version: String,
}

/// GET /health
pub async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        labels: state.service.vocabulary().len(),
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// POST /predict_image
pub async fn predict_image(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<Json<PredictionResponse>, ApiError> {
    let upload = read_upload(&mut multipart).await?;
    log::info!(
        "image prediction for {:?} ({} bytes)",
        upload.filename,
        upload.bytes.len()
    );

    let service = state.service.clone();
    let prediction = tokio::task::spawn_blocking(move || service.predict_image_bytes(&upload.bytes))
        .await
        .map_err(|err| ApiError::internal(format!("prediction task failed: {err}")))??;

    Ok(Json(prediction.into()))
}

/// POST /predict_video
///
/// The upload is spooled to a temporary file in the upload directory for the
/// video decoder and removed again whether or not prediction succeeds.
pub async fn predict_video(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<Json<PredictionResponse>, ApiError> {
    let upload = read_upload(&mut multipart).await?;
    log::info!(
        "video prediction for {:?} ({} bytes)",
        upload.filename,
        upload.bytes.len()
    );

    let suffix = upload_suffix(upload.filename.as_deref());
    let service = state.service.clone();
    let upload_dir = state.upload_dir.clone();

    let prediction = tokio::task::spawn_blocking(move || {
        fs::create_dir_all(&upload_dir).map_err(|err| {
            ApiError::internal(format!("failed to create upload directory: {err}"))
        })?;
        let mut spooled = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(&suffix)
            .tempfile_in(&upload_dir)
            .map_err(|err| ApiError::internal(format!("failed to create temp file: {err}")))?;
        spooled
            .write_all(&upload.bytes)
            .and_then(|_| spooled.flush())
            .map_err(|err| ApiError::internal(format!("failed to store upload: {err}")))?;

        service
            .predict_video_path(spooled.path())
            .map_err(ApiError::from)
    })
    .await
    .map_err(|err| ApiError::internal(format!("prediction task failed: {err}")))??;

    Ok(Json(prediction.into()))
}

struct Upload {
    filename: Option<String>,
    bytes: Vec<u8>,
}

async fn read_upload(multipart: &mut Multipart) -> Result<Upload, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::bad_request(format!("malformed multipart body: {err}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().map(str::to_owned);
        let bytes = field
            .bytes()
            .await
            .map_err(|err| ApiError::bad_request(format!("failed to read upload: {err}")))?;
        if bytes.is_empty() {
            return Err(ApiError::bad_request("uploaded file is empty"));
        }
        return Ok(Upload {
            filename,
            bytes: bytes.to_vec(),
        });
    }
    Err(ApiError::bad_request("missing multipart field `file`"))
}

/// Keeps a short alphanumeric extension from the client's filename so
/// container-sniffing decoders see a familiar suffix. Nothing else of the
/// client-supplied name reaches the filesystem.
fn upload_suffix(filename: Option<&str>) -> String {
    filename
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 8)
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}
