//! Append-only transcript and diagnostic files.
//!
//! Every entry is formatted in memory and written with a single `write_all`
//! on a file opened in append mode, so concurrent writers never interleave
//! partial entries.

use std::error::Error;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Transcript of answered questions.
pub const EXCHANGE_LOG: &str = "result.txt";
/// Failures caught by the pipeline.
pub const DIAGNOSTIC_LOG: &str = "error_log.txt";

/// A journal entry could not be written.
#[derive(Debug)]
pub struct PersistenceError {
    pub path: PathBuf,
    pub source: std::io::Error,
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to append to '{}': {}", self.path.display(), self.source)
    }
}

impl Error for PersistenceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}

/// Writer for the two journal files inside the data directory.
#[derive(Debug, Clone)]
pub struct Journal {
    dir: PathBuf,
}

impl Journal {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn exchange_path(&self) -> PathBuf {
        self.dir.join(EXCHANGE_LOG)
    }

    pub fn diagnostic_path(&self) -> PathBuf {
        self.dir.join(DIAGNOSTIC_LOG)
    }

    /// Append a question and the reply body (without the channel suffix).
    ///
    /// If the transcript cannot be written, a note is attempted in the
    /// diagnostic log before the write error is returned.
    pub fn record_exchange(&self, user_message: &str, reply: &str) -> Result<(), PersistenceError> {
        let entry = format!(
            "[{}] User: {}\nBot: {}\n{}\n",
            timestamp(),
            user_message,
            reply,
            "-".repeat(60)
        );

        let result = append(&self.exchange_path(), &entry);
        if let Err(ref e) = result {
            let _ = self.record_failure(user_message, "Failed to save result", Some(e));
        }
        result
    }

    /// Append a diagnostic note, with the error chain of `cause` when present.
    pub fn record_failure(
        &self,
        user_message: &str,
        note: &str,
        cause: Option<&dyn Error>,
    ) -> Result<(), PersistenceError> {
        let mut entry = format!("[{}] User: {}\nNotes: {}\n", timestamp(), user_message, note);
        if let Some(err) = cause {
            entry.push_str("Exception:\n");
            entry.push_str(&error_chain(err));
            entry.push('\n');
        }
        entry.push_str(&"-".repeat(80));
        entry.push('\n');

        append(&self.diagnostic_path(), &entry)
    }
}

fn timestamp() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}

/// Render an error followed by its `source()` chain, one cause per line.
fn error_chain(err: &dyn Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str("\nCaused by: ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

fn append(path: &Path, entry: &str) -> Result<(), PersistenceError> {
    let wrap = |source| PersistenceError {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(wrap)?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(wrap)?;

    file.write_all(entry.as_bytes()).map_err(wrap)
}
