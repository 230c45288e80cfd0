use std::path::Path;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        DefaultBodyLimit, Multipart, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use super::report::{DiagnosisReport, MarketItem};
use super::SharedState;

/// Name of the multipart field carrying the photo.
const IMAGE_FIELD: &str = "image";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub num_classes: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

struct Upload {
    file_name: String,
    bytes: Bytes,
}

pub fn router(state: SharedState) -> Router {
    let body_limit = state.max_upload_bytes;
    Router::new()
        .route("/health", get(health))
        .route("/market", get(market))
        .route("/submit", post(submit))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// GET /health
pub async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        num_classes: state.num_classes(),
    })
}

/// GET /market - every supplement with the disease it treats
pub async fn market(State(state): State<SharedState>) -> Json<Vec<MarketItem>> {
    Json(MarketItem::listing(&state.tables))
}

/// POST /submit - classify one uploaded leaf photo
pub async fn submit(
    State(state): State<SharedState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            warn!("Rejected submit request: {}", rejection.body_text());
            return (
                rejection.status(),
                Json(ErrorBody {
                    error: rejection.body_text(),
                }),
            )
                .into_response();
        }
    };

    let upload = match read_upload(&mut multipart).await {
        Ok(Some(upload)) => upload,
        Ok(None) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorBody {
                    error: format!("Missing '{}' file field", IMAGE_FIELD),
                }),
            )
                .into_response();
        }
        Err(e) => {
            error!("Error in submit route: {}", e);
            return Json(DiagnosisReport::error(e)).into_response();
        }
    };
    info!("Received upload '{}' ({} bytes)", upload.file_name, upload.bytes.len());

    retain_upload(&state, &upload).await;

    let worker = Arc::clone(&state);
    let bytes = upload.bytes;
    let report = match tokio::task::spawn_blocking(move || worker.diagnose(&bytes)).await {
        Ok(report) => report,
        Err(e) => {
            error!("Prediction task failed: {}", e);
            DiagnosisReport::error(e)
        }
    };

    Json(report).into_response()
}

/// Returns the first `image` field with a non-empty file name.
async fn read_upload(multipart: &mut Multipart) -> Result<Option<Upload>, MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let file_name = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => return Ok(None),
        };
        let bytes = field.bytes().await?;
        return Ok(Some(Upload { file_name, bytes }));
    }
    Ok(None)
}

async fn retain_upload(state: &SharedState, upload: &Upload) {
    let Some(dir) = &state.upload_dir else {
        return;
    };
    let path = dir.join(sanitize_file_name(&upload.file_name));
    if let Err(e) = tokio::fs::write(&path, &upload.bytes).await {
        warn!("Failed to keep upload at {:?}: {}", path, e);
    }
}

/// Reduces a client-supplied file name to a safe single path component.
pub fn sanitize_file_name(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");
    // Browsers on Windows may send the full client path
    let base = base.rsplit('\\').next().unwrap_or(base);

    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();

    if cleaned.is_empty() || cleaned.starts_with('.') {
        format!("upload{}", cleaned)
    } else {
        cleaned
    }
}
