use axum::extract::{Multipart, State};
use axum::Json;

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::schemas::submission::SubmitResponse;
use crate::services::archive;

pub(crate) async fn submit(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<SubmitResponse>, ApiError> {
    let max_bytes = state.settings().storage().max_upload_bytes();

    let mut file_bytes: Option<Vec<u8>> = None;
    let mut filename = String::new();
    let mut content_type = String::new();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::BadRequest("Invalid multipart data".to_string()))?
    {
        if field.name().unwrap_or("") != "file" {
            continue;
        }

        filename = field.file_name().unwrap_or("").to_string();
        content_type =
            field.content_type().unwrap_or("application/octet-stream").to_string();

        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|_| ApiError::BadRequest("Failed to read file".to_string()))?
        {
            // Chunks past the limit are dropped; the validator only needs to
            // observe that the length exceeded the cap.
            if (bytes.len() as u64) <= max_bytes {
                bytes.extend_from_slice(&chunk);
            }
        }
        file_bytes = Some(bytes);
    }

    let file_bytes =
        file_bytes.ok_or_else(|| ApiError::BadRequest("File is required".to_string()))?;

    if let Err(rejection) =
        archive::validate_archive_upload(&file_bytes, &filename, &content_type, max_bytes)
    {
        metrics::counter!("submissions_rejected_total", "reason" => rejection.label())
            .increment(1);
        tracing::info!(filename = %filename, reason = rejection.label(), "Submission rejected");
        return Err(ApiError::BadRequest(rejection.to_string()));
    }

    let storage = state.storage().ok_or_else(|| {
        ApiError::ServiceUnavailable("S3 storage is not configured".to_string())
    })?;

    let filename = sanitized_filename(&filename);
    let key = format!("submissions/{filename}");

    let (size, hash) = storage
        .upload_bytes(&key, &content_type, file_bytes)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to save submission"))?;

    let url = storage
        .presign_get(&key)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to generate download URL"))?;

    metrics::counter!("submissions_accepted_total").increment(1);
    tracing::info!(filename = %filename, size, sha256 = %hash, "Submission stored");

    Ok(Json(SubmitResponse {
        status: "success".to_string(),
        message: "Submission received successfully".to_string(),
        filename,
        url,
        size,
    }))
}

pub(crate) fn sanitized_filename(filename: &str) -> String {
    let cleaned: String = filename
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();

    if cleaned.trim_matches(['.', '-', '_']).is_empty() {
        "upload.zip".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use tower::ServiceExt;

    use super::sanitized_filename;
    use crate::test_support;

    #[test]
    fn sanitized_filename_filters_disallowed_chars() {
        assert_eq!(sanitized_filename("MID1_EN1 (copy).zip"), "MID1_EN1copy.zip");
        assert_eq!(sanitized_filename("../../escape.zip"), "....escape.zip");
    }

    #[test]
    fn sanitized_filename_falls_back_on_empty() {
        assert_eq!(sanitized_filename("###"), "upload.zip");
    }

    #[tokio::test]
    async fn rejects_wrong_content_type() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        let app = test_support::build_app();

        let zip = test_support::build_zip(&[("answers.txt", "Q1:A")]);
        let request =
            test_support::multipart_request("/api/submit", "sub.zip", "text/plain", &zip);
        let response = app.oneshot(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = test_support::read_json(response).await;
        assert!(body["detail"].as_str().unwrap().starts_with("Invalid file type"));
    }

    #[tokio::test]
    async fn rejects_corrupt_zip_payload() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        let app = test_support::build_app();

        let request = test_support::multipart_request(
            "/api/submit",
            "sub.zip",
            "application/zip",
            b"this is not a zip",
        );
        let response = app.oneshot(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = test_support::read_json(response).await;
        assert!(body["detail"].as_str().unwrap().starts_with("Invalid ZIP file"));
    }

    #[tokio::test]
    async fn rejects_filename_without_extension() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        let app = test_support::build_app();

        let zip = test_support::build_zip(&[("answers.txt", "Q1:A")]);
        let request =
            test_support::multipart_request("/api/submit", "archive.rar", "application/zip", &zip);
        let response = app.oneshot(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = test_support::read_json(response).await;
        assert!(body["detail"].as_str().unwrap().starts_with("Invalid filename"));
    }

    #[tokio::test]
    async fn missing_file_field_is_rejected() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        let app = test_support::build_app();

        let request = test_support::multipart_request_without_file("/api/submit");
        let response = app.oneshot(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = test_support::read_json(response).await;
        assert_eq!(body["detail"], "File is required");
    }

    #[tokio::test]
    async fn valid_upload_without_storage_is_unavailable() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        let app = test_support::build_app();

        let zip = test_support::build_zip(&[("answers.txt", "Q1:A")]);
        let request =
            test_support::multipart_request("/api/submit", "EN1_submission.zip", "application/zip", &zip);
        let response = app.oneshot(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
