use std::io::{Cursor, Read, Seek};

use thiserror::Error;
use zip::result::ZipError;
use zip::ZipArchive;

pub(crate) const ALLOWED_CONTENT_TYPES: &[&str] =
    &["application/zip", "application/x-zip-compressed", "application/octet-stream"];

pub(crate) const ARCHIVE_EXTENSION: &str = ".zip";

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum UploadRejection {
    #[error("Invalid file type. Expected ZIP file, got {0}")]
    UnsupportedType(String),
    #[error("Invalid filename. File must have a .zip extension")]
    BadFilename,
    #[error("File is empty")]
    Empty,
    #[error("File too large. Maximum size is {0}MB")]
    TooLarge(u64),
    #[error("Invalid ZIP file. File appears to be corrupted.")]
    Corrupt,
}

impl UploadRejection {
    pub(crate) fn label(&self) -> &'static str {
        match self {
            Self::UnsupportedType(_) => "unsupported_type",
            Self::BadFilename => "bad_filename",
            Self::Empty => "empty",
            Self::TooLarge(_) => "too_large",
            Self::Corrupt => "corrupt",
        }
    }
}

/// Checks run in a fixed order and stop at the first failure, so the
/// rejection reported for a pathological upload is deterministic.
pub(crate) fn validate_archive_upload(
    bytes: &[u8],
    filename: &str,
    content_type: &str,
    max_bytes: u64,
) -> Result<(), UploadRejection> {
    if !ALLOWED_CONTENT_TYPES.contains(&content_type) {
        return Err(UploadRejection::UnsupportedType(content_type.to_string()));
    }

    if filename.is_empty() || !filename.ends_with(ARCHIVE_EXTENSION) {
        return Err(UploadRejection::BadFilename);
    }

    if bytes.is_empty() {
        return Err(UploadRejection::Empty);
    }

    if bytes.len() as u64 > max_bytes {
        return Err(UploadRejection::TooLarge(max_bytes / (1024 * 1024)));
    }

    match open_archive(bytes) {
        Ok(_) => Ok(()),
        Err(_) => Err(UploadRejection::Corrupt),
    }
}

pub(crate) fn open_archive(bytes: &[u8]) -> Result<ZipArchive<Cursor<&[u8]>>, ZipError> {
    ZipArchive::new(Cursor::new(bytes))
}

/// Reads a named entry as UTF-8 text. `Ok(None)` means the entry does not
/// exist; any read failure is reported as an error so callers can decide
/// whether it is fatal for their archive.
pub(crate) fn read_text_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<String>, std::io::Error> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(ZipError::Io(err)) => return Err(err),
        Err(other) => return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, other)),
    };

    let mut contents = String::new();
    entry.read_to_string(&mut contents)?;
    Ok(Some(contents))
}

/// Fully decompresses every file entry. All-or-nothing: a mid-archive read
/// failure fails the whole source instead of yielding a partial listing.
pub(crate) fn read_entries(bytes: &[u8]) -> Result<Vec<(String, Vec<u8>)>, ZipError> {
    let mut archive = open_archive(bytes)?;
    let mut entries = Vec::with_capacity(archive.len());

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if entry.is_dir() {
            continue;
        }

        let name = entry.name().to_string();
        let mut contents = Vec::new();
        entry.read_to_end(&mut contents).map_err(ZipError::Io)?;
        entries.push((name, contents));
    }

    Ok(entries)
}
