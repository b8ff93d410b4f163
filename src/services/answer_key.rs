use std::collections::HashMap;
use std::io::{Read, Seek};

use thiserror::Error;
use zip::ZipArchive;

use crate::core::config::Settings;
use crate::services::archive;

pub(crate) const ANSWERS_FILE: &str = "answers.txt";

const COMMENT_MARKER: char = '#';

/// The canonical question/answer mapping. Loaded once at startup and shared
/// read-only across requests.
#[derive(Debug, Clone)]
pub(crate) struct AnswerKey {
    answers: HashMap<String, String>,
}

impl AnswerKey {
    pub(crate) fn from_settings(settings: &Settings) -> Self {
        Self { answers: settings.exam().answer_key.clone() }
    }

    #[cfg(test)]
    pub(crate) fn new(answers: HashMap<String, String>) -> Self {
        Self { answers }
    }

    pub(crate) fn len(&self) -> usize {
        self.answers.len()
    }
}

#[derive(Debug, Error)]
pub(crate) enum ScoreError {
    #[error("answers.txt not found in archive")]
    AnswersFileMissing,
    #[error("failed to read answers.txt: {0}")]
    Unreadable(#[from] std::io::Error),
}

/// Parses the loosely-structured answers file. Lines are trimmed; blank
/// lines and `#` comments are skipped; a line records an answer only when
/// the part after the first `:` is non-empty. A question repeated on a
/// later line overwrites the earlier answer.
pub(crate) fn parse_student_answers(contents: &str) -> HashMap<String, String> {
    let mut answers = HashMap::new();

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with(COMMENT_MARKER) {
            continue;
        }

        let Some((question, answer)) = line.split_once(':') else {
            continue;
        };

        let answer = answer.trim();
        if answer.is_empty() {
            continue;
        }

        answers.insert(question.trim().to_string(), answer.to_string());
    }

    answers
}

/// One point per key question whose recorded answer is byte-for-byte equal
/// to the key answer. Multi-select answers are compared as the literal
/// comma-joined string: `"A,C"` and `"C,A"` do not match.
pub(crate) fn score_answers(student: &HashMap<String, String>, key: &AnswerKey) -> u32 {
    key.answers
        .iter()
        .filter(|(question, answer)| {
            student.get(question.as_str()).map(String::as_str) == Some(answer.as_str())
        })
        .count() as u32
}

pub(crate) fn score_archive<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    key: &AnswerKey,
) -> Result<u32, ScoreError> {
    let contents = archive::read_text_entry(archive, ANSWERS_FILE)?
        .ok_or(ScoreError::AnswersFileMissing)?;

    Ok(score_answers(&parse_student_answers(&contents), key))
}
