//! Storage service - file upload and the staging area
//!
//! Uploaded files go to object storage immediately; their public URLs
//! wait in the per-(user, room) staging area until the next
//! `send_message` consumes them. A storage failure fails this endpoint
//! only and never touches chat state.

use crate::core::{AppError, AppState};
use crate::entities::User;
use axum::{
    Extension, Json,
    extract::{Multipart, Query, State},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Minimal object-storage client: PUT bytes, get back a publicly
/// resolvable URL.
pub struct ObjectStorage {
    http: reqwest::Client,
    endpoint: String,
    bucket: String,
}

impl ObjectStorage {
    pub fn new(endpoint: String, bucket: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
            bucket,
        }
    }

    #[instrument(skip(self, bytes), fields(filename, content_type))]
    pub async fn upload(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        content_type: &str,
    ) -> Result<String, AppError> {
        // Object keys are timestamped to keep same-named uploads apart.
        let key = format!("{}_{}", Utc::now().timestamp_millis(), sanitize(filename));
        let url = format!("{}/{}/{}", self.endpoint, self.bucket, key);

        self.http
            .put(&url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| {
                warn!("Object storage rejected upload: {:?}", e);
                AppError::service_unavailable("Object storage unavailable")
            })?;

        info!("Uploaded object {}", key);
        Ok(url)
    }
}

fn sanitize(filename: &str) -> String {
    filename
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub room_id: i32,
}

#[derive(Serialize)]
pub struct UploadResponse {
    pub file_url: String,
}

/// POST /files/upload?room_id= - multipart upload into the staging area.
#[instrument(skip(state, current_user, multipart), fields(user_id = %current_user.user_id, room_id = %params.room_id))]
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UploadQuery>,
    Extension(current_user): Extension<User>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    debug!("Handling file upload");
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| AppError::bad_request("Malformed multipart body"))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or("unnamed").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|_| AppError::bad_request("Failed to read uploaded file"))?;

        let file_url = state
            .storage
            .upload(bytes.to_vec(), &filename, &content_type)
            .await?;

        state.cache.stage_file_url(
            current_user.user_id,
            params.room_id,
            file_url.clone(),
            state.config.staging_ttl_secs,
        );

        info!("File staged for user {} room {}", current_user.user_id, params.room_id);
        return Ok(Json(UploadResponse { file_url }));
    }

    Err(AppError::bad_request("Missing 'file' field in multipart body"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_keeps_safe_characters_only() {
        assert_eq!(sanitize("photo 1 (copy).png"), "photo_1__copy_.png");
        assert_eq!(sanitize("report-final_v2.pdf"), "report-final_v2.pdf");
    }
}
