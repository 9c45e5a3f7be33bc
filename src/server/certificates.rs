use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use tokio_util::io::ReaderStream;
use tracing::{info, warn};

use crate::certificates::{CertificateStorageError, ReplacedBlob, stored_filename};
use crate::error::Error;
use crate::server::AppState;
use crate::server::response::{ApiError, Message, StoreResultExt};
use crate::server::validation::required;
use crate::types::Certificate;

const NO_FILE_SELECTED: &str = "No file selected";

struct CertificateUpload {
    regno: Option<String>,
    file: Option<(String, Bytes)>,
}

async fn parse_certificate_upload(multipart: &mut Multipart) -> Result<CertificateUpload, ApiError> {
    let mut regno: Option<String> = None;
    let mut file: Option<(String, Bytes)> = None;

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("regno") => {
                regno = Some(field.text().await?);
            }
            Some("certificate") => {
                // Browsers send an empty part with no file name when nothing was picked.
                let declared = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await?;
                if !declared.is_empty() {
                    file = Some((declared, data));
                }
            }
            _ => {}
        }
    }

    Ok(CertificateUpload { regno, file })
}

fn storage_api_err(e: CertificateStorageError, message: &'static str) -> ApiError {
    match e {
        CertificateStorageError::InvalidName(detail) => {
            ApiError::bad_request(format!("Invalid certificate file name: {detail}"))
        }
        e => {
            tracing::error!("{message}: {e}");
            ApiError::internal(message)
        }
    }
}

/// Puts a replaced blob back, or removes a fresh one, after a failed commit.
async fn roll_back_blob(state: &AppState, filename: &str, replaced: Option<ReplacedBlob>) {
    let result = match replaced {
        Some(replaced) => state.certificates.restore(replaced).await,
        None => state.certificates.delete(filename).await.map(|_| ()),
    };
    if let Err(e) = result {
        warn!("Failed to roll back certificate {filename}: {e}");
    }
}

async fn discard_replaced(state: &AppState, replaced: Option<ReplacedBlob>) {
    if let Some(replaced) = replaced {
        if let Err(e) = state.certificates.discard(replaced).await {
            warn!("Failed to remove replaced certificate bytes: {e}");
        }
    }
}

/// POST /add_certificate
///
/// Writes the blob first, then points the registrant's row at it. If the row
/// write fails the blob directory is put back as it was. A blob replaced under
/// a different name stays on disk but is no longer reachable.
pub async fn add_certificate(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Message, ApiError> {
    let upload = parse_certificate_upload(&mut multipart).await?;
    let Some((declared, data)) = upload.file else {
        return Ok(Message::new(StatusCode::BAD_REQUEST, NO_FILE_SELECTED));
    };
    let regno = required("regno", upload.regno.as_deref().unwrap_or_default())?;

    let filename = stored_filename(&regno, &declared)
        .map_err(|e| storage_api_err(e, "Invalid certificate file name"))?;

    let replaced = state
        .with_blob(state.certificates.put(&filename, &data))
        .await
        .api_err("Failed to store certificate")?
        .map_err(|e| storage_api_err(e, "Failed to store certificate"))?;

    let cert = Certificate {
        regno: regno.clone(),
        filename: filename.clone(),
    };

    match state
        .with_store(move |store| store.upsert_certificate(&cert))
        .await
    {
        Ok(previous) => {
            discard_replaced(&state, replaced).await;
            match previous {
                Some(previous) if previous != filename => info!(
                    regno = %regno,
                    previous = %previous,
                    "Certificate replaced; previous blob left in storage"
                ),
                _ => info!(regno = %regno, filename = %filename, "Certificate stored"),
            }
        }
        Err(Error::Timeout) => {
            // The commit may still land, so the new blob must stay.
            warn!(
                regno = %regno,
                filename = %filename,
                "Certificate commit timed out; blob kept and may be orphaned"
            );
            discard_replaced(&state, replaced).await;
            return Err(ApiError::from_store(Error::Timeout, "Failed to record certificate"));
        }
        Err(e) => {
            roll_back_blob(&state, &filename, replaced).await;
            return Err(ApiError::from_store(e, "Failed to record certificate"));
        }
    }

    Ok(Message::ok("Certificate uploaded successfully"))
}

/// ASCII `filename` for old clients plus an RFC 5987 `filename*` carrying the
/// full UTF-8 name.
fn content_disposition(filename: &str) -> HeaderValue {
    let safe_filename: String = filename
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_' || *c == '.')
        .collect();
    let safe_filename = if safe_filename.is_empty() {
        "certificate".to_string()
    } else {
        safe_filename
    };
    let encoded = urlencoding::encode(filename);

    HeaderValue::from_str(&format!(
        "attachment; filename=\"{safe_filename}\"; filename*=UTF-8''{encoded}"
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("attachment; filename=\"certificate\""))
}

/// GET /download_certificate/{regno}
///
/// "No row" and "row without blob" are reported separately (404 vs 410).
pub async fn download_certificate(
    State(state): State<Arc<AppState>>,
    Path(regno): Path<String>,
) -> Result<Response, ApiError> {
    let lookup = regno.clone();
    let Some(cert) = state
        .with_store(move |store| store.get_certificate(&lookup))
        .await
        .api_err("Failed to look up certificate")?
    else {
        return Ok(Message::new(StatusCode::NOT_FOUND, "Certificate not found").into_response());
    };

    let (reader, size) = match state
        .with_blob(state.certificates.get(&cert.filename))
        .await
        .api_err("Failed to read certificate")?
    {
        Ok(found) => found,
        Err(CertificateStorageError::NotFound) => {
            warn!(regno = %regno, filename = %cert.filename, "Certificate row points at a missing blob");
            return Ok(
                Message::new(StatusCode::GONE, "Certificate file is missing").into_response(),
            );
        }
        Err(e) => {
            tracing::error!("Certificate storage error: {e}");
            return Err(ApiError::internal("Failed to read certificate"));
        }
    };

    let body = Body::from_stream(ReaderStream::new(reader));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::CONTENT_LENGTH, size)
        .header(header::CONTENT_DISPOSITION, content_disposition(&cert.filename))
        .header("X-Content-Type-Options", "nosniff")
        .body(body)
        .map_err(|e| ApiError::internal(format!("Failed to build response: {e}")))
}
