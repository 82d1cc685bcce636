//! Roster artifact writers.
//!
//! Two files are produced from the same records:
//! - JSON: a pretty-printed array with camelCase keys
//! - CSV: a bare header row, every data field double-quoted, `\n` line endings

use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use rosterscrape_shared::{PersonRecord, Result, RosterError};

/// CSV header row, in column order.
pub const CSV_HEADERS: [&str; 6] = [
    "Name",
    "Team",
    "Region",
    "Center of Excellence",
    "Investment Strategy",
    "Description",
];

/// Metadata of one written artifact.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactMeta {
    pub path: PathBuf,
    pub records: usize,
    pub size_bytes: usize,
    pub sha256: String,
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Pretty-printed JSON array (two-space indent).
pub fn to_json_string(records: &[PersonRecord]) -> Result<String> {
    serde_json::to_string_pretty(records)
        .map_err(|e| RosterError::Export(format!("JSON serialization failed: {e}")))
}

/// CSV document with a header row. Zero records yields the header alone.
///
/// The header is written bare; data fields are always quoted.
pub fn to_csv_string(records: &[PersonRecord]) -> Result<String> {
    let mut header = csv_writer(Vec::new(), csv::QuoteStyle::Necessary);
    header.write_record(CSV_HEADERS).map_err(csv_error)?;
    let buf = header.into_inner().map_err(flush_error)?;

    let mut writer = csv_writer(buf, csv::QuoteStyle::Always);
    for record in records {
        writer
            .write_record([
                record.name.as_str(),
                record.team.as_str(),
                record.region.as_str(),
                record.center_of_excellence.as_str(),
                record.investment_strategy.as_str(),
                record.description.as_str(),
            ])
            .map_err(csv_error)?;
    }

    let bytes = writer.into_inner().map_err(flush_error)?;
    String::from_utf8(bytes).map_err(|e| RosterError::Export(format!("CSV is not UTF-8: {e}")))
}

fn csv_writer(buf: Vec<u8>, style: csv::QuoteStyle) -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .has_headers(false)
        .quote_style(style)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(buf)
}

fn flush_error(e: csv::IntoInnerError<csv::Writer<Vec<u8>>>) -> RosterError {
    RosterError::Export(format!("CSV flush failed: {e}"))
}

fn csv_error(e: csv::Error) -> RosterError {
    RosterError::Export(format!("CSV serialization failed: {e}"))
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

#[instrument(skip_all, fields(path = %path.display(), records = records.len()))]
pub fn write_json(path: &Path, records: &[PersonRecord]) -> Result<ArtifactMeta> {
    let content = to_json_string(records)?;
    write_atomic(path, &content, records.len())
}

#[instrument(skip_all, fields(path = %path.display(), records = records.len()))]
pub fn write_csv(path: &Path, records: &[PersonRecord]) -> Result<ArtifactMeta> {
    let content = to_csv_string(records)?;
    write_atomic(path, &content, records.len())
}

/// Write through a temp file in the same directory, then rename into place.
fn write_atomic(path: &Path, content: &str, records: usize) -> Result<ArtifactMeta> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    std::fs::create_dir_all(dir).map_err(|e| RosterError::io(dir, e))?;

    let file_name = path.file_name().ok_or_else(|| {
        RosterError::validation(format!("not a file path: {}", path.display()))
    })?;
    let temp = dir.join(format!(".{}.tmp", file_name.to_string_lossy()));

    std::fs::write(&temp, content).map_err(|e| RosterError::io(&temp, e))?;
    std::fs::rename(&temp, path).map_err(|e| RosterError::io(path, e))?;

    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let sha256 = format!("{:x}", hasher.finalize());

    debug!(size = content.len(), "wrote artifact");

    Ok(ArtifactMeta {
        path: path.to_path_buf(),
        records,
        size_bytes: content.len(),
        sha256,
    })
}
