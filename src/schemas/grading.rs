use serde::Serialize;

#[derive(Debug, Serialize)]
pub(crate) struct GradingReport {
    pub(crate) status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) url: Option<String>,
    pub(crate) total_submissions: usize,
    pub(crate) graded: usize,
    pub(crate) errors: usize,
}
