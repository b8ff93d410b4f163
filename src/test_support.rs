use std::io::{Cursor, Write};
use std::sync::{Arc, OnceLock};

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request},
    Router,
};
use tokio::sync::{Mutex, OwnedMutexGuard};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::api;
use crate::core::{config::Settings, state::AppState};
use crate::services::answer_key::AnswerKey;

pub(crate) const TEST_DOWNLOAD_SECRET: &str = "test-download-secret";
pub(crate) const TEST_GRADING_SECRET: &str = "test-grading-secret";

const MULTIPART_BOUNDARY: &str = "examdrop-test-boundary";

pub(crate) async fn env_lock() -> OwnedMutexGuard<()> {
    static LOCK: OnceLock<Arc<Mutex<()>>> = OnceLock::new();
    let lock = LOCK.get_or_init(|| Arc::new(Mutex::new(()))).clone();
    lock.lock_owned().await
}

pub(crate) fn set_test_env() {
    dotenvy::dotenv().ok();

    std::env::set_var("EXAMDROP_ENV", "test");
    std::env::set_var("EXAMDROP_STRICT_CONFIG", "0");
    std::env::set_var("DOWNLOAD_SECRET", TEST_DOWNLOAD_SECRET);
    std::env::set_var("GRADING_SECRET", TEST_GRADING_SECRET);
    std::env::set_var("PROMETHEUS_ENABLED", "0");
    std::env::remove_var("ANSWER_KEY");
    std::env::remove_var("MAX_UPLOAD_SIZE_MB");
    std::env::remove_var("EXAMDROP_PORT");
    std::env::remove_var("S3_ENDPOINT");
    std::env::remove_var("S3_ACCESS_KEY");
    std::env::remove_var("S3_SECRET_KEY");
    std::env::remove_var("S3_BUCKET");
    std::env::remove_var("S3_REGION");
    std::env::set_var("AWS_EC2_METADATA_DISABLED", "true");
}

pub(crate) fn build_state() -> AppState {
    let settings = Settings::load().expect("settings");
    let answer_key = AnswerKey::from_settings(&settings);
    AppState::new(settings, answer_key, None)
}

pub(crate) fn build_app() -> Router {
    api::router::router(build_state())
}

pub(crate) fn build_zip(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    for (name, contents) in entries {
        writer.start_file(*name, options).expect("start file");
        writer.write_all(contents.as_bytes()).expect("write entry");
    }

    writer.finish().expect("finish zip").into_inner()
}

pub(crate) fn json_request(
    method: Method,
    uri: &str,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);

    if let Some(body) = body {
        let bytes = serde_json::to_vec(&body).expect("serialize body");
        builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(bytes))
            .expect("request body")
    } else {
        builder.body(Body::empty()).expect("request body")
    }
}

pub(crate) fn multipart_request(
    uri: &str,
    filename: &str,
    content_type: &str,
    bytes: &[u8],
) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; \
             filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{MULTIPART_BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("multipart request")
}

pub(crate) fn multipart_request_without_file(uri: &str) -> Request<Body> {
    let body = format!(
        "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; \
         name=\"comment\"\r\n\r\nno file here\r\n--{MULTIPART_BOUNDARY}--\r\n"
    );

    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("multipart request")
}

pub(crate) async fn read_json(response: axum::response::Response<Body>) -> serde_json::Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("response body");
    serde_json::from_slice(&body).unwrap_or_else(|err| {
        let body_text = String::from_utf8_lossy(&body);
        panic!("json parse: {err}; body: {body_text}");
    })
}
