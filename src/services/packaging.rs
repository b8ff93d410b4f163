use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::services::archive;
use crate::services::storage::FetchError;

pub(crate) const ERROR_MARKER_FILE: &str = "_ERROR.txt";

pub(crate) struct SourceArchive {
    pub(crate) student_id: String,
    pub(crate) payload: Result<Vec<u8>, FetchError>,
}

/// Re-packs every source under its own `{student_id}/` namespace. A source
/// that could not be fetched or does not open as a zip contributes exactly
/// one `{student_id}/_ERROR.txt` entry; a failing source never aborts the
/// batch. The combined bytes are only returned once every source has been
/// processed.
pub(crate) fn aggregate(sources: &[SourceArchive]) -> anyhow::Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for source in sources {
        match &source.payload {
            Ok(bytes) => match archive::read_entries(bytes) {
                Ok(entries) => {
                    for (name, contents) in &entries {
                        writer.start_file(format!("{}/{}", source.student_id, name), options)?;
                        writer.write_all(contents)?;
                    }
                }
                Err(err) => {
                    write_error_marker(
                        &mut writer,
                        &source.student_id,
                        &format!("Invalid ZIP archive: {err}"),
                        options,
                    )?;
                }
            },
            Err(err) => {
                write_error_marker(
                    &mut writer,
                    &source.student_id,
                    &format!("Failed to fetch submission: {err}"),
                    options,
                )?;
            }
        }
    }

    let cursor = writer.finish()?;
    Ok(cursor.into_inner())
}

fn write_error_marker(
    writer: &mut ZipWriter<Cursor<Vec<u8>>>,
    student_id: &str,
    message: &str,
    options: SimpleFileOptions,
) -> zip::result::ZipResult<()> {
    writer.start_file(format!("{student_id}/{ERROR_MARKER_FILE}"), options)?;
    writer.write_all(message.as_bytes())?;
    Ok(())
}
