use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards;
use crate::core::state::AppState;
use crate::schemas::submission::{DownloadBatchRequest, DownloadSingleRequest};
use crate::services::packaging::{self, SourceArchive};
use crate::services::storage::{StorageService, StoredObject};

pub(crate) async fn download_batch(
    State(state): State<AppState>,
    Json(payload): Json<DownloadBatchRequest>,
) -> Result<Response, ApiError> {
    guards::require_download_secret(state.settings(), &payload.secret)?;
    payload.validate().map_err(|err| ApiError::BadRequest(err.to_string()))?;

    let storage = require_storage(&state)?;
    let prefix = format!("submissions/{}_", payload.exam_code);
    let listed = storage
        .list(&prefix)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list submissions"))?;

    if listed.is_empty() {
        return Err(ApiError::NotFound(format!(
            "No submissions found for exam code {}",
            payload.exam_code
        )));
    }

    let mut sources = Vec::with_capacity(listed.len());
    for object in &listed {
        let bytes = storage.fetch(&object.url).await;
        sources.push(SourceArchive {
            student_id: student_id_from_key(&object.key, &payload.exam_code),
            payload: bytes,
        });
    }

    let combined = packaging::aggregate(&sources)
        .map_err(|e| ApiError::internal(e, "Failed to build combined archive"))?;

    tracing::info!(
        exam_code = %payload.exam_code,
        submissions = sources.len(),
        "Batch download assembled"
    );

    Ok(zip_attachment(&format!("{}_all_submissions.zip", payload.exam_code), combined))
}

pub(crate) async fn download_single(
    State(state): State<AppState>,
    Json(payload): Json<DownloadSingleRequest>,
) -> Result<Response, ApiError> {
    guards::require_download_secret(state.settings(), &payload.secret)?;
    payload.validate().map_err(|err| ApiError::BadRequest(err.to_string()))?;

    let storage = require_storage(&state)?;
    let primary = format!("submissions/{}_{}.zip", payload.exam_code, payload.student_id);
    let legacy = format!("submissions/{}.zip", payload.student_id);

    let object = match find_object(storage, &primary).await? {
        Some(object) => object,
        None => find_object(storage, &legacy).await?.ok_or_else(|| {
            ApiError::NotFound(format!(
                "No submission found for student {} in exam {}",
                payload.student_id, payload.exam_code
            ))
        })?,
    };

    let bytes = storage
        .fetch(&object.url)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to download submission"))?;

    let filename = object.key.rsplit('/').next().unwrap_or(object.key.as_str()).to_string();
    Ok(zip_attachment(&filename, bytes))
}

fn require_storage(state: &AppState) -> Result<&StorageService, ApiError> {
    state
        .storage()
        .ok_or_else(|| ApiError::ServiceUnavailable("S3 storage is not configured".to_string()))
}

async fn find_object(
    storage: &StorageService,
    key: &str,
) -> Result<Option<StoredObject>, ApiError> {
    let listed = storage
        .list(key)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list submissions"))?;

    Ok(listed.into_iter().find(|object| object.key == key))
}

fn student_id_from_key(key: &str, exam_code: &str) -> String {
    let filename = key.rsplit('/').next().unwrap_or(key);
    let stem = filename.strip_suffix(".zip").unwrap_or(filename);
    stem.strip_prefix(&format!("{exam_code}_")).unwrap_or(stem).to_string()
}

fn zip_attachment(filename: &str, bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
        ],
        bytes,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use tower::ServiceExt;

    use super::student_id_from_key;
    use crate::test_support;

    #[test]
    fn student_id_strips_exam_prefix_and_extension() {
        assert_eq!(student_id_from_key("submissions/MID1_EN42.zip", "MID1"), "EN42");
        assert_eq!(student_id_from_key("submissions/EN42.zip", "MID1"), "EN42");
        assert_eq!(student_id_from_key("submissions/odd-name", "MID1"), "odd-name");
    }

    #[tokio::test]
    async fn batch_download_requires_secret() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        let app = test_support::build_app();

        let request = test_support::json_request(
            Method::POST,
            "/api/download-batch",
            Some(serde_json::json!({"exam_code": "MID1", "secret": "wrong"})),
        );
        let response = app.oneshot(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn batch_download_requires_exam_code() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        let app = test_support::build_app();

        let request = test_support::json_request(
            Method::POST,
            "/api/download-batch",
            Some(serde_json::json!({"secret": test_support::TEST_DOWNLOAD_SECRET})),
        );
        let response = app.oneshot(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn single_download_requires_student_id() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        let app = test_support::build_app();

        let request = test_support::json_request(
            Method::POST,
            "/api/download-single",
            Some(serde_json::json!({
                "exam_code": "MID1",
                "secret": test_support::TEST_DOWNLOAD_SECRET
            })),
        );
        let response = app.oneshot(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn batch_download_without_storage_is_unavailable() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        let app = test_support::build_app();

        let request = test_support::json_request(
            Method::POST,
            "/api/download-batch",
            Some(serde_json::json!({
                "exam_code": "MID1",
                "secret": test_support::TEST_DOWNLOAD_SECRET
            })),
        );
        let response = app.oneshot(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn unconfigured_download_secret_is_a_server_error() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        std::env::remove_var("DOWNLOAD_SECRET");
        let app = test_support::build_app();

        let request = test_support::json_request(
            Method::POST,
            "/api/download-batch",
            Some(serde_json::json!({"exam_code": "MID1", "secret": "anything"})),
        );
        let response = app.oneshot(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
