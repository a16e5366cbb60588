//! Plain-text knowledge documents loaded from the data directory.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::chatbot::journal::{DIAGNOSTIC_LOG, EXCHANGE_LOG};

/// Max chars of each document embedded in the system prompt.
pub const SUMMARY_CHARS: usize = 1000;

/// A knowledge file that could not be read.
#[derive(Debug)]
pub struct LoadError {
    pub path: PathBuf,
    pub source: std::io::Error,
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to read '{}': {}", self.path.display(), self.source)
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Snapshot of the knowledge directory, keyed by file stem in lexicographic order.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeStore {
    documents: BTreeMap<String, String>,
}

impl KnowledgeStore {
    /// Read every `*.txt` file in `dir` except the journal files.
    ///
    /// A missing directory gives an empty store. Unreadable files are reported
    /// to `on_error` and skipped.
    pub fn load<F>(dir: &Path, mut on_error: F) -> Self
    where
        F: FnMut(LoadError),
    {
        let mut documents = BTreeMap::new();

        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("No knowledge directory at {:?}: {e}", dir);
                return Self { documents };
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("txt") {
                continue;
            }

            let file_name = entry.file_name();
            let file_name = file_name.to_string_lossy();
            if file_name == EXCHANGE_LOG || file_name == DIAGNOSTIC_LOG {
                continue;
            }

            let Some(key) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
                continue;
            };

            match std::fs::read_to_string(&path) {
                Ok(content) => {
                    documents.insert(key, content);
                }
                Err(source) => {
                    warn!("Skipping knowledge file {:?}: {source}", path);
                    on_error(LoadError { path, source });
                }
            }
        }

        debug!("Loaded {} knowledge document(s) from {:?}", documents.len(), dir);
        Self { documents }
    }

    /// Build a store from in-memory documents.
    pub fn from_documents<I, K, V>(documents: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            documents: documents
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.documents.get(name).map(String::as_str)
    }

    /// Documents in lexicographic key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.documents.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// One titled block per document, each cut to `SUMMARY_CHARS`, separated by blank lines.
    pub fn compact_summary(&self) -> String {
        self.iter()
            .map(|(name, text)| format!("--- {} ---\n{}", display_name(name), leading_chars(text.trim(), SUMMARY_CHARS)))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Human-readable form of a document key: `exam_schedule` → `Exam Schedule`.
///
/// A letter is capitalised when it follows a non-letter, everything else is
/// lowercased.
pub fn display_name(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut prev_is_alpha = false;
    for c in key.chars() {
        let c = if c == '_' { ' ' } else { c };
        if c.is_alphabetic() {
            if prev_is_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_is_alpha = true;
        } else {
            out.push(c);
            prev_is_alpha = false;
        }
    }
    out
}

/// The first `n` chars of `s`, on a char boundary.
pub fn leading_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
