//! Audio upload handler.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::Json;
use base64::Engine;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use cwave_models::{UploadEvent, CONTENT_TYPE_WEBM};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Upload query parameters.
#[derive(Debug, Deserialize)]
pub struct UploadParams {
    /// Body is base64-encoded (gateway-style transport encoding).
    #[serde(default)]
    pub base64: bool,
}

/// Upload response.
#[derive(Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub file_name: String,
}

/// Store an uploaded audio clip and notify the processing pipeline.
///
/// The notification publish is not fatal to the request: the object is
/// already stored and can be reprocessed, so the client still gets a 200.
pub async fn upload_audio(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> ApiResult<Json<UploadResponse>> {
    if body.is_empty() {
        return Err(ApiError::bad_request("No file provided in the request"));
    }

    let data = if params.base64 {
        base64::engine::general_purpose::STANDARD
            .decode(&body)
            .map_err(|e| ApiError::bad_request(format!("Invalid base64 payload: {}", e)))?
    } else {
        body.to_vec()
    };

    let file_name = generate_file_name();

    state
        .storage
        .upload_bytes(&state.config.input_bucket, &file_name, data, CONTENT_TYPE_WEBM)
        .await?;
    info!(file_name = %file_name, "Stored uploaded clip");

    let event = UploadEvent::new(&state.config.input_bucket, &file_name);
    if let Err(e) = state.publisher.publish(&event).await {
        warn!(file_name = %file_name, "Failed to publish upload notification: {}", e);
    }

    Ok(Json(UploadResponse {
        message: format!("File uploaded as {}", file_name),
        file_name,
    }))
}

/// Unique object key for an upload.
fn generate_file_name() -> String {
    format!("audio_{}.webm", Utc::now().timestamp_millis())
}
