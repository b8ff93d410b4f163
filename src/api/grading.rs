use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::api::errors::ApiError;
use crate::api::guards;
use crate::core::state::AppState;
use crate::schemas::grading::GradingReport;
use crate::services::grading::{self, GradedSource};

#[derive(Debug, Deserialize)]
pub(crate) struct GradingQuery {
    #[serde(default)]
    secret: Option<String>,
}

pub(crate) async fn start_grading(
    Query(query): Query<GradingQuery>,
    State(state): State<AppState>,
) -> Result<Json<GradingReport>, ApiError> {
    guards::require_grading_secret(state.settings(), query.secret.as_deref().unwrap_or(""))?;

    let storage = state.storage().ok_or_else(|| {
        ApiError::ServiceUnavailable("S3 storage is not configured".to_string())
    })?;

    let listed = storage
        .list("submissions/")
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list submissions"))?;

    if listed.is_empty() {
        return Ok(Json(GradingReport {
            status: "complete".to_string(),
            message: Some("No submissions found".to_string()),
            file: None,
            url: None,
            total_submissions: 0,
            graded: 0,
            errors: 0,
        }));
    }

    let mut sources = Vec::with_capacity(listed.len());
    for object in &listed {
        let filename = object.key.rsplit('/').next().unwrap_or(object.key.as_str()).to_string();
        let payload = storage.fetch(&object.url).await;
        sources.push(GradedSource { filename, payload });
    }

    let results = grading::grade_batch(sources, state.answer_key());
    let errors = results.iter().filter(|row| row.status.is_error()).count();
    let graded = results.len() - errors;

    metrics::counter!("submissions_graded_total").increment(graded as u64);
    metrics::counter!("submissions_grade_errors_total").increment(errors as u64);

    let table = grading::render_results_csv(&results)
        .map_err(|e| ApiError::internal(e, "Failed to render grading results"))?;

    storage
        .upload_bytes(grading::RESULTS_KEY, grading::RESULTS_CONTENT_TYPE, table.into_bytes())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to save grading results"))?;

    let url = storage
        .presign_get(grading::RESULTS_KEY)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to generate results URL"))?;

    tracing::info!(total = results.len(), graded, errors, "Grading run complete");

    Ok(Json(GradingReport {
        status: "Grading complete".to_string(),
        message: None,
        file: Some(grading::RESULTS_KEY.to_string()),
        url: Some(url),
        total_submissions: results.len(),
        graded,
        errors,
    }))
}
