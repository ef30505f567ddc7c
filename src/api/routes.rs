//! REST handlers
//!
//! Thin translation between HTTP and `FileService`; all consistency logic
//! lives in the service.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use crate::error::FileStoreError;
use crate::metadata::{FileId, FileRecord};
use crate::service::{FileService, UploadRequest};

/// Multipart form field carrying the upload
const UPLOAD_FIELD: &str = "file";

/// Name used when a client omits the file name
const FALLBACK_FILE_NAME: &str = "upload.bin";

/// Content type assumed when a part declares none
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Room for multipart boundaries and part headers on top of the file itself
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Shared application state
#[derive(Clone)]
struct AppState {
    service: Arc<FileService>,
}

/// Listing response body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    pub files: Vec<FileRecord>,
    pub cached: bool,
}

/// Health response body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub cache_reachable: bool,
}

/// API error response body
#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    pub error: String,
    pub message: String,
}

/// Errors a handler can return
#[derive(Debug)]
pub enum ApiError {
    Service(FileStoreError),
    BadRequest(String),
    BodyTooLarge,
}

impl From<FileStoreError> for ApiError {
    fn from(e: FileStoreError) -> Self {
        ApiError::Service(e)
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::BodyTooLarge
        } else {
            ApiError::BadRequest(e.body_text())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::Service(e) => {
                let status = match &e {
                    FileStoreError::NotFound(_) => StatusCode::NOT_FOUND,
                    FileStoreError::InvalidType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                    FileStoreError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                    FileStoreError::InvalidName(_) => StatusCode::BAD_REQUEST,
                    FileStoreError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                // Storage details stay in the logs
                let message = match &e {
                    FileStoreError::Storage(_) => "Internal storage error".to_string(),
                    other => other.to_string(),
                };
                (status, e.code(), message)
            }
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, "bad_request", message),
            ApiError::BodyTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "too_large",
                "Request body exceeds the upload limit".to_string(),
            ),
        };

        (
            status,
            Json(ApiErrorResponse {
                error: error.to_string(),
                message,
            }),
        )
            .into_response()
    }
}

/// Build the Axum router
pub fn router(service: Arc<FileService>) -> Router {
    let body_limit = usize::try_from(service.max_upload_bytes())
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route("/files", get(list_files).post(upload_file))
        .route("/files/:id", get(get_file).delete(delete_file))
        .route("/files/:id/download", get(download_file))
        .route("/health", get(health_check))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(AppState { service })
}

/// Reduce a client-supplied path to its final component
fn client_file_name(raw: &str) -> String {
    let name = raw.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    if name.is_empty() {
        FALLBACK_FILE_NAME.to_string()
    } else {
        name.to_string()
    }
}

/// Client IDs that are not well formed can never exist
fn parse_id(raw: &str) -> Result<FileId, ApiError> {
    FileId::parse(raw).ok_or_else(|| FileStoreError::NotFound(raw.to_string()).into())
}

async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<FileRecord>), ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let display_name = field
            .file_name()
            .map(client_file_name)
            .unwrap_or_else(|| FALLBACK_FILE_NAME.to_string());
        let declared_content_type = field
            .content_type()
            .unwrap_or(FALLBACK_CONTENT_TYPE)
            .to_string();
        let content = field.bytes().await?;

        info!(name = %display_name, size = content.len(), "Received upload");
        let record = state
            .service
            .upload(UploadRequest {
                display_name,
                declared_content_type,
                content,
            })
            .await?;
        return Ok((StatusCode::CREATED, Json(record)));
    }

    Err(ApiError::BadRequest(format!(
        "Missing multipart field '{}'",
        UPLOAD_FIELD
    )))
}

async fn list_files(State(state): State<AppState>) -> Result<Json<ListResponse>, ApiError> {
    let listing = state.service.list_all().await?;
    Ok(Json(ListResponse {
        files: listing.files,
        cached: listing.cached,
    }))
}

async fn get_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<FileRecord>, ApiError> {
    let id = parse_id(&id)?;
    Ok(Json(state.service.fetch_by_id(&id).await?))
}

async fn download_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    let (record, stream) = state.service.open_download(&id).await?;
    debug!(id = %id, size = record.size_bytes, "Streaming download");

    // Dropping the body on client disconnect closes the file
    let body = Body::from_stream(ReaderStream::new(stream));
    let headers = [
        (header::CONTENT_TYPE, record.content_type.clone()),
        (header::CONTENT_LENGTH, record.size_bytes.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!(
                "attachment; filename*=UTF-8''{}",
                urlencoding::encode(&record.display_name)
            ),
        ),
    ];
    Ok((headers, body).into_response())
}

async fn delete_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    state.service.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Health check, never cached
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let cache_reachable = state.service.health().await;
    Json(HealthResponse {
        status: if cache_reachable { "ok" } else { "degraded" },
        cache_reachable,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MetadataStore, MokaBackend};
    use crate::storage::DiskStore;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    const BOUNDARY: &str = "X-FILESTORE-BOUNDARY";

    fn app(root: &std::path::Path) -> Router {
        let store = DiskStore::open(root.to_path_buf()).unwrap();
        let cache = MetadataStore::new(Arc::new(MokaBackend::default()));
        router(Arc::new(FileService::new(Arc::new(store), cache)))
    }

    fn app_with_limit(root: &std::path::Path, max_upload_bytes: u64) -> Router {
        let store = DiskStore::open(root.to_path_buf()).unwrap();
        let cache = MetadataStore::new(Arc::new(MokaBackend::default()));
        let service = FileService::new(Arc::new(store), cache).with_max_upload_bytes(max_upload_bytes);
        router(Arc::new(service))
    }

    fn is_empty_dir(path: &std::path::Path) -> bool {
        std::fs::read_dir(path).unwrap().next().is_none()
    }

    fn upload_request(file_name: &str, content_type: &str, content: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/files")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_client_file_name() {
        assert_eq!(client_file_name("a.pdf"), "a.pdf");
        assert_eq!(client_file_name("C:\\Users\\me\\scan.pdf"), "scan.pdf");
        assert_eq!(client_file_name("../../etc/passwd"), "passwd");
        assert_eq!(client_file_name("dir/"), FALLBACK_FILE_NAME);
    }

    #[tokio::test]
    async fn test_upload_list_download_flow() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path());

        let response = app
            .clone()
            .oneshot(upload_request("a.pdf", "application/pdf", b"0123456789"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let record = json_body(response).await;
        assert_eq!(record["displayName"], "a.pdf");
        assert_eq!(record["sizeBytes"], 10);
        assert_eq!(record["contentType"], "application/pdf");
        let id = record["id"].as_str().unwrap().to_string();

        let listing = json_body(app.clone().oneshot(get("/files")).await.unwrap()).await;
        assert_eq!(listing["cached"], false);
        assert_eq!(listing["files"].as_array().unwrap().len(), 1);
        let listing = json_body(app.clone().oneshot(get("/files")).await.unwrap()).await;
        assert_eq!(listing["cached"], true);

        let fetched = json_body(
            app.clone()
                .oneshot(get(&format!("/files/{}", id)))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(fetched, record);

        let response = app
            .clone()
            .oneshot(get(&format!("/files/{}/download", id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "10");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename*=UTF-8''a.pdf"
        );
        let content = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&content[..], b"0123456789");
    }

    #[tokio::test]
    async fn test_rejects_disallowed_type() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path())
            .oneshot(upload_request("a.zip", "application/zip", b"PK"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(json_body(response).await["error"], "invalid_type");
    }

    #[tokio::test]
    async fn test_missing_file_field_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"other\"\r\n\r\nvalue\r\n--{BOUNDARY}--\r\n"
        );
        let request = Request::builder()
            .method("POST")
            .uri("/files")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();

        let response = app(dir.path()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_and_malformed_ids_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path());

        let unknown = format!("/files/{}", FileId::generate());
        let response = app.clone().oneshot(get(&unknown)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["error"], "not_found");

        let response = app
            .clone()
            .oneshot(get("/files/not-an-id/download"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_then_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path());

        let record = json_body(
            app.clone()
                .oneshot(upload_request("clip.mp4", "video/mp4", b"ftyp"))
                .await
                .unwrap(),
        )
        .await;
        let uri = format!("/files/{}", record["id"].as_str().unwrap());

        let delete = Request::builder()
            .method("DELETE")
            .uri(&uri)
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(delete).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app.clone().oneshot(get(&uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_health_reports_cache() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path()).oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let health = json_body(response).await;
        assert_eq!(health["status"], "ok");
        assert_eq!(health["cacheReachable"], true);
    }

    #[tokio::test]
    async fn test_upload_over_limit_is_too_large() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_with_limit(dir.path(), 16);

        let response = app
            .oneshot(upload_request("big.pdf", "application/pdf", &[b'x'; 64]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(json_body(response).await["error"], "too_large");
        assert!(is_empty_dir(dir.path()));
    }

    #[tokio::test]
    async fn test_body_over_transport_limit_is_too_large() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_with_limit(dir.path(), 16);

        let content = vec![b'x'; MULTIPART_OVERHEAD_BYTES + 4096];
        let response = app
            .oneshot(upload_request("huge.pdf", "application/pdf", &content))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(json_body(response).await["error"], "too_large");
        assert!(is_empty_dir(dir.path()));
    }
}
