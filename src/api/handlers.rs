use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::collections::HashMap;

use crate::core::metrics;
use crate::core::state::AppState;
use crate::schemas::{HealthResponse, RootResponse};

pub(crate) async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    let mut endpoints = HashMap::new();
    endpoints.insert("submit", "POST /api/submit");
    endpoints.insert("download_batch", "POST /api/download-batch");
    endpoints.insert("download_single", "POST /api/download-single");
    endpoints.insert("start_grading", "GET /api/start-grading");

    Json(RootResponse {
        message: state.settings().api().project_name.clone(),
        version: state.settings().api().version.clone(),
        endpoints,
    })
}

pub(crate) async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    let mut status = "healthy".to_string();
    let mut components = HashMap::new();

    if state.storage().is_some() {
        components.insert("storage".to_string(), "configured".to_string());
    } else {
        components.insert("storage".to_string(), "disabled".to_string());
        status = "degraded".to_string();
    }

    components
        .insert("answer_key".to_string(), format!("{} questions", state.answer_key().len()));

    Json(HealthResponse { service: "examdrop-api".to_string(), status, components })
}

pub(crate) async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    if !state.settings().telemetry().prometheus_enabled {
        return StatusCode::NOT_FOUND.into_response();
    }

    match metrics::render() {
        Some(body) => ([(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
            .into_response(),
        None => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}
