use crate::api::errors::ApiError;
use crate::core::config::Settings;

pub(crate) fn require_download_secret(settings: &Settings, supplied: &str) -> Result<(), ApiError> {
    require_secret(settings.secrets().download_secret.as_deref(), supplied, "Download")
}

pub(crate) fn require_grading_secret(settings: &Settings, supplied: &str) -> Result<(), ApiError> {
    require_secret(settings.secrets().grading_secret.as_deref(), supplied, "Grading")
}

// An unconfigured secret is a server misconfiguration, not an auth failure.
fn require_secret(
    configured: Option<&str>,
    supplied: &str,
    kind: &str,
) -> Result<(), ApiError> {
    let Some(expected) = configured else {
        return Err(ApiError::Internal(format!("{kind} secret not configured on server")));
    };

    if supplied.is_empty() || supplied != expected {
        return Err(ApiError::Unauthorized("Unauthorized: Invalid or missing secret key"));
    }

    Ok(())
}
