use std::io::{Read, Seek};

use zip::ZipArchive;

use crate::services::archive;

pub(crate) const STUDENT_INFO_FILE: &str = "student_info.txt";

const UNKNOWN_ID: &str = "UNKNOWN";
const UNKNOWN_NAME: &str = "Unknown";
const UNKNOWN_TIME: &str = "N/A";

/// Optional per-submission metadata. Every field is an opaque string; the
/// recognized keys are matched exactly, without case folding, because
/// student-side tooling emits them verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StudentInfo {
    pub(crate) enrollment_id: String,
    pub(crate) student_name: String,
    pub(crate) start_time_utc: String,
    pub(crate) submit_time_utc: String,
    pub(crate) total_time_seconds: String,
}

impl Default for StudentInfo {
    fn default() -> Self {
        Self {
            enrollment_id: UNKNOWN_ID.to_string(),
            student_name: UNKNOWN_NAME.to_string(),
            start_time_utc: UNKNOWN_TIME.to_string(),
            submit_time_utc: UNKNOWN_TIME.to_string(),
            total_time_seconds: UNKNOWN_TIME.to_string(),
        }
    }
}

pub(crate) fn enrollment_from_filename(filename: &str) -> String {
    let name = filename.rsplit('/').next().unwrap_or(filename);
    if let Some(stripped) = name.strip_suffix("_submission.zip") {
        stripped.to_string()
    } else if let Some(stripped) = name.strip_suffix(".zip") {
        stripped.to_string()
    } else {
        name.to_string()
    }
}

/// Total parse: a missing or unreadable metadata file falls back to the
/// filename-derived enrollment id, and missing keys keep their sentinel
/// defaults.
pub(crate) fn parse_student_info<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    archive_filename: &str,
) -> StudentInfo {
    let mut info = StudentInfo::default();

    let contents = match archive::read_text_entry(archive, STUDENT_INFO_FILE) {
        Ok(Some(contents)) => contents,
        Ok(None) | Err(_) => {
            info.enrollment_id = enrollment_from_filename(archive_filename);
            return info;
        }
    };

    for line in contents.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };

        let value = value.trim();
        match key.trim() {
            "ENROLLMENT_ID" => info.enrollment_id = value.to_string(),
            "STUDENT_NAME" => info.student_name = value.to_string(),
            "START_TIME_UTC" => info.start_time_utc = value.to_string(),
            "SUBMIT_TIME_UTC" => info.submit_time_utc = value.to_string(),
            "TOTAL_TIME_SECONDS" => info.total_time_seconds = value.to_string(),
            _ => {}
        }
    }

    info
}
