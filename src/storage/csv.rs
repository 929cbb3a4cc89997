//! # storage::csv
//!
//! Append-only CSV destinations. A header row is written once, when the file
//! is missing or empty; after that only data rows are appended. Each call is
//! rendered into one buffer and written with a single `write_all`, so a batch
//! never interleaves with another.

use std::borrow::Cow;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::StoreError;

/// A row type with a fixed, self-describing column order.
pub trait CsvRecord {
    const HEADER: &'static [&'static str];

    /// One string per header column, same order.
    fn fields(&self) -> Vec<String>;
}

/// Quote a field only when it needs it (RFC 4180).
pub fn escape(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

fn push_line<'a>(buf: &mut String, fields: impl Iterator<Item = Cow<'a, str>>) {
    let mut first = true;
    for field in fields {
        if !first {
            buf.push(',');
        }
        buf.push_str(&field);
        first = false;
    }
    buf.push('\n');
}

// ─── AppendLog ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct AppendLog {
    path: PathBuf,
}

impl AppendLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn needs_header(&self) -> Result<bool, StoreError> {
        match fs::metadata(&self.path) {
            Ok(meta) => Ok(meta.len() == 0),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(true),
            Err(e) => Err(StoreError::io(&self.path, e)),
        }
    }

    /// Append `rows`, returning how many were written. Empty input is a no-op
    /// and does not create the file.
    pub fn append<R: CsvRecord>(&self, rows: &[R]) -> Result<usize, StoreError> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut buf = String::with_capacity(rows.len() * 96);
        if self.needs_header()? {
            push_line(&mut buf, R::HEADER.iter().map(|h| Cow::Borrowed(*h)));
        }
        for row in rows {
            let fields = row.fields();
            push_line(&mut buf, fields.iter().map(|f| escape(f)));
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StoreError::io(&self.path, e))?;
        file.write_all(buf.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| StoreError::io(&self.path, e))?;

        Ok(rows.len())
    }

    /// Current size on disk; a missing file is 0.
    pub fn size_bytes(&self) -> u64 {
        fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
    }
}

/// Total size of every `*.csv` directly under `dir`; a missing dir is 0.
pub fn dir_csv_bytes(dir: &Path) -> u64 {
    let Ok(entries) = fs::read_dir(dir) else {
        return 0;
    };
    entries
        .flatten()
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "csv"))
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}
