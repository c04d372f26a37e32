//! Trade history loading — delimited text files into a `RawTable`.
//!
//! Loading keeps every cell as a string; interpretation is left to the
//! normalizer. Rows may be shorter or longer than the header row.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};
use tradelens_core::RawTable;

/// File extensions accepted by [`load_csv`], compared case-insensitively.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["csv", "tsv", "txt"];

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error(
        "unsupported file type '{extension}' for {path} (expected one of: {})",
        SUPPORTED_EXTENSIONS.join(", ")
    )]
    UnsupportedExtension { path: PathBuf, extension: String },

    #[error("{0} has no header row")]
    MissingHeader(String),
}

/// Load a trade history file. `.tsv` files are read tab-delimited.
pub fn load_csv(path: &Path) -> Result<RawTable, LoadError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(LoadError::UnsupportedExtension {
            path: path.to_path_buf(),
            extension,
        });
    }

    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let delimiter = if extension == "tsv" { b'\t' } else { b',' };
    let table = read_delimited(file, delimiter, &path.display().to_string())?;
    if table.is_empty() {
        warn!(path = %path.display(), "file has a header row but no data rows");
    }
    info!(
        path = %path.display(),
        rows = table.rows.len(),
        columns = table.headers.len(),
        "loaded trade history"
    );
    Ok(table)
}

/// Read comma-separated data from any reader.
pub fn read_csv<R: Read>(reader: R) -> Result<RawTable, LoadError> {
    read_delimited(reader, b',', "input")
}

fn read_delimited<R: Read>(reader: R, delimiter: u8, label: &str) -> Result<RawTable, LoadError> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(LoadError::MissingHeader(label.to_string()));
    }

    let mut rows = Vec::new();
    let mut line_numbers = Vec::new();
    for record in rdr.records() {
        let record = record?;
        // skip blank lines that carry only delimiters
        if record.iter().all(|c| c.is_empty()) {
            continue;
        }
        let line = record.position().map_or(rows.len() as u64 + 2, |p| p.line());
        line_numbers.push(line);
        rows.push(record.iter().map(str::to_string).collect());
    }
    debug!(source = label, rows = rows.len(), "read delimited rows");

    Ok(RawTable::new(headers, rows).with_line_numbers(line_numbers))
}
