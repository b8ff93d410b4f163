use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Serialize)]
pub(crate) struct SubmitResponse {
    pub(crate) status: String,
    pub(crate) message: String,
    pub(crate) filename: String,
    pub(crate) url: String,
    pub(crate) size: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct DownloadBatchRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "exam_code is required"))]
    pub(crate) exam_code: String,
    #[serde(default)]
    pub(crate) secret: String,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct DownloadSingleRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "exam_code is required"))]
    pub(crate) exam_code: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "student_id is required"))]
    pub(crate) student_id: String,
    #[serde(default)]
    pub(crate) secret: String,
}
