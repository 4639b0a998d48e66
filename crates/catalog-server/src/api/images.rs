use std::convert::Infallible;
use std::path::Path;

use axum::{
    body::Body,
    extract::{Path as UrlPath, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use catalog_core::{image_file_name, is_plain_file_name};
use serde::Serialize;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::middleware::RequestId;

use super::{form::ImageUpload, validation_error, ApiError, AppState};

#[derive(Debug, Serialize)]
struct ImageNotFound {
    message: &'static str,
}

fn image_not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ImageNotFound {
            message: "Image not found",
        }),
    )
        .into_response()
}

/// Validate the upload's extension and write it under a freshly generated
/// name. Returns the stored file name.
///
/// The file is written before the database call that references it; a
/// failed write leaves the file behind.
pub(super) async fn save_upload(
    upload_dir: &Path,
    req_id: &RequestId,
    upload: &ImageUpload,
) -> Result<String, ApiError> {
    let file_name =
        image_file_name(&upload.original_name).map_err(|e| validation_error(req_id, &e))?;
    let path = upload_dir.join(&file_name);

    tokio::fs::write(&path, &upload.bytes).await.map_err(|e| {
        tracing::error!(request_id = %req_id.0, path = %path.display(), error = %e, "failed to write upload");
        ApiError::new(req_id.0.clone(), "internal_error", "failed to store image")
    })?;

    tracing::info!(
        original = %upload.original_name,
        stored = %file_name,
        bytes = upload.bytes.len(),
        "image stored"
    );
    Ok(file_name)
}

pub(super) async fn get_product_image(
    State(state): State<AppState>,
    UrlPath(filename): UrlPath<String>,
    req: Request,
) -> Response {
    if !is_plain_file_name(&filename) {
        tracing::info!(%filename, "rejected image name outside upload directory");
        return image_not_found();
    }

    let path = state.upload_dir.join(&filename);
    let is_file = tokio::fs::metadata(&path)
        .await
        .is_ok_and(|meta| meta.is_file());
    if !is_file {
        return image_not_found();
    }

    ServeFile::new(path)
        .oneshot(req)
        .await
        .unwrap_or_else(|never: Infallible| match never {})
        .map(Body::new)
}
