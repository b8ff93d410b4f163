use crate::services::answer_key::{self, AnswerKey};
use crate::services::archive;
use crate::services::storage::FetchError;
use crate::services::student_info::{self, StudentInfo};

pub(crate) const RESULTS_KEY: &str = "results/marks_final.csv";
pub(crate) const RESULTS_CONTENT_TYPE: &str = "text/csv";

const ERROR_MESSAGE_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum GradeStatus {
    Graded,
    Error(String),
}

impl GradeStatus {
    fn error(message: &str) -> Self {
        Self::Error(message.chars().take(ERROR_MESSAGE_LIMIT).collect())
    }

    pub(crate) fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    pub(crate) fn label(&self) -> String {
        match self {
            Self::Graded => "Graded".to_string(),
            Self::Error(message) => format!("Error: {message}"),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct GradeResult {
    pub(crate) enrollment_id: String,
    pub(crate) student_name: String,
    pub(crate) score: u32,
    pub(crate) status: GradeStatus,
    pub(crate) filename: String,
    pub(crate) start_time_utc: String,
    pub(crate) submit_time_utc: String,
    pub(crate) total_time_seconds: String,
}

pub(crate) struct GradedSource {
    pub(crate) filename: String,
    pub(crate) payload: Result<Vec<u8>, FetchError>,
}

/// Grades every source independently, in the order given. The result
/// sequence always has one row per source; a failing archive produces an
/// `Error:` row instead of aborting the batch.
pub(crate) fn grade_batch(sources: Vec<GradedSource>, key: &AnswerKey) -> Vec<GradeResult> {
    sources.into_iter().map(|source| grade_source(source, key)).collect()
}

fn grade_source(source: GradedSource, key: &AnswerKey) -> GradeResult {
    let GradedSource { filename, payload } = source;

    let bytes = match payload {
        Ok(bytes) => bytes,
        Err(err) => return error_result(filename, &err.to_string()),
    };

    let mut archive = match archive::open_archive(&bytes) {
        Ok(archive) => archive,
        Err(err) => return error_result(filename, &format!("Invalid ZIP archive: {err}")),
    };

    let info = student_info::parse_student_info(&mut archive, &filename);
    match answer_key::score_archive(&mut archive, key) {
        Ok(score) => result_row(info, score, GradeStatus::Graded, filename),
        Err(err) => result_row(info, 0, GradeStatus::error(&err.to_string()), filename),
    }
}

fn error_result(filename: String, message: &str) -> GradeResult {
    let info = StudentInfo {
        enrollment_id: student_info::enrollment_from_filename(&filename),
        ..StudentInfo::default()
    };
    result_row(info, 0, GradeStatus::error(message), filename)
}

fn result_row(info: StudentInfo, score: u32, status: GradeStatus, filename: String) -> GradeResult {
    GradeResult {
        enrollment_id: info.enrollment_id,
        student_name: info.student_name,
        score,
        status,
        filename,
        start_time_utc: info.start_time_utc,
        submit_time_utc: info.submit_time_utc,
        total_time_seconds: info.total_time_seconds,
    }
}

pub(crate) fn render_results_csv(results: &[GradeResult]) -> anyhow::Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "enrollment_id",
        "student_name",
        "score",
        "status",
        "filename",
        "start_time_utc",
        "submit_time_utc",
        "total_time_seconds",
    ])?;

    for result in results {
        let score = result.score.to_string();
        let status = result.status.label();
        writer.write_record([
            result.enrollment_id.as_str(),
            result.student_name.as_str(),
            score.as_str(),
            status.as_str(),
            result.filename.as_str(),
            result.start_time_utc.as_str(),
            result.submit_time_utc.as_str(),
            result.total_time_seconds.as_str(),
        ])?;
    }

    let bytes = writer.into_inner()?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::test_support::build_zip;

    fn test_key() -> AnswerKey {
        let mut answers = HashMap::new();
        answers.insert("Q1".to_string(), "A".to_string());
        answers.insert("Q2".to_string(), "B".to_string());
        AnswerKey::new(answers)
    }

    fn source(filename: &str, payload: Result<Vec<u8>, FetchError>) -> GradedSource {
        GradedSource { filename: filename.to_string(), payload }
    }

    #[test]
    fn one_row_per_source_with_errors_isolated() {
        let graded = build_zip(&[
            ("student_info.txt", "ENROLLMENT_ID: EN1\nSTUDENT_NAME: Ada\n"),
            ("answers.txt", "Q1:A\nQ2:B"),
        ]);
        let missing_answers = build_zip(&[("notes.txt", "oops")]);
        let partial = build_zip(&[("answers.txt", "Q1:A\nQ2:C")]);

        let results = grade_batch(
            vec![
                source("EN1_submission.zip", Ok(graded)),
                source("EN2_submission.zip", Ok(missing_answers)),
                source("EN3_submission.zip", Ok(partial)),
            ],
            &test_key(),
        );

        assert_eq!(results.len(), 3);

        assert_eq!(results[0].enrollment_id, "EN1");
        assert_eq!(results[0].student_name, "Ada");
        assert_eq!(results[0].score, 2);
        assert_eq!(results[0].status, GradeStatus::Graded);

        assert_eq!(results[1].enrollment_id, "EN2");
        assert!(results[1].status.label().starts_with("Error:"));
        assert_eq!(results[1].score, 0);

        assert_eq!(results[2].enrollment_id, "EN3");
        assert_eq!(results[2].score, 1);
        assert_eq!(results[2].status, GradeStatus::Graded);

        assert_eq!(results.iter().filter(|row| row.status.is_error()).count(), 1);
    }

    #[test]
    fn fetch_failure_derives_identity_from_filename() {
        let results = grade_batch(
            vec![source("EN9_submission.zip", Err(FetchError::test("download timed out")))],
            &test_key(),
        );

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].enrollment_id, "EN9");
        assert_eq!(results[0].student_name, "Unknown");
        assert_eq!(results[0].status.label(), "Error: download timed out");
    }

    #[test]
    fn error_messages_are_truncated() {
        let long = "x".repeat(200);
        let results =
            grade_batch(vec![source("EN1.zip", Err(FetchError::test(&long)))], &test_key());

        match &results[0].status {
            GradeStatus::Error(message) => assert_eq!(message.len(), 50),
            other => panic!("expected error status, got {other:?}"),
        }
    }

    #[test]
    fn csv_has_header_and_listing_order() {
        let results = grade_batch(
            vec![
                source("EN2.zip", Ok(build_zip(&[("answers.txt", "Q1:A")]))),
                source("EN1.zip", Err(FetchError::test("gone"))),
            ],
            &test_key(),
        );

        let rendered = render_results_csv(&results).expect("csv");
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "enrollment_id,student_name,score,status,filename,start_time_utc,submit_time_utc,total_time_seconds"
        );
        assert!(lines[1].starts_with("EN2,Unknown,1,Graded,EN2.zip"));
        assert!(lines[2].starts_with("EN1,Unknown,0,Error: gone,EN1.zip"));
    }
}
