use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

pub const DEFAULT_TEXT_FILE: &str = "text.txt";
pub const DOCUMENT_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Corpus {
    documents: Vec<String>,
}

#[derive(Debug)]
pub enum CorpusError {
    SourceMissing(PathBuf),
    NotADirectory(PathBuf),
    ReadDir { path: PathBuf, source: io::Error },
}

impl fmt::Display for CorpusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourceMissing(path) => {
                write!(f, "source directory {} does not exist", path.display())
            }
            Self::NotADirectory(path) => write!(f, "{} is not a directory", path.display()),
            Self::ReadDir { path, source } => {
                write!(f, "cannot list {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for CorpusError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadDir { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl Corpus {
    pub fn from_documents<I, S>(documents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut corpus = Self::default();
        for document in documents {
            corpus.push(document.as_ref());
        }
        corpus
    }

    pub fn push(&mut self, raw: &str) -> bool {
        let trimmed = raw.trim_matches(is_document_space);
        if trimmed.is_empty() {
            return false;
        }
        self.documents.push(trimmed.to_string());
        true
    }

    pub fn documents(&self) -> &[String] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn text(&self) -> String {
        self.documents.join(DOCUMENT_SEPARATOR)
    }
}

// Unicode whitespace plus the ASCII information separators U+001C..=U+001F.
fn is_document_space(ch: char) -> bool {
    ch.is_whitespace() || ('\x1c'..='\x1f').contains(&ch)
}

/// `\r\n` and lone `\r` become `\n`.
pub fn normalize_newlines(raw: &str) -> String {
    if raw.contains('\r') {
        raw.replace("\r\n", "\n").replace('\r', "\n")
    } else {
        raw.to_string()
    }
}

/// Reads `<source_dir>/<entry>/<text_file>` for every subdirectory, in sorted
/// name order. Line endings are normalized to `\n`. Entries without a
/// readable text file are skipped.
pub fn collect_documents(source_dir: &Path, text_file: &str) -> Result<Corpus, CorpusError> {
    if !source_dir.exists() {
        return Err(CorpusError::SourceMissing(source_dir.to_path_buf()));
    }
    if !source_dir.is_dir() {
        return Err(CorpusError::NotADirectory(source_dir.to_path_buf()));
    }

    let entries = fs::read_dir(source_dir).map_err(|source| CorpusError::ReadDir {
        path: source_dir.to_path_buf(),
        source,
    })?;
    let mut document_dirs: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    document_dirs.sort();

    let mut corpus = Corpus::default();
    for dir in document_dirs {
        let path = dir.join(text_file);
        if !path.is_file() {
            debug!(dir = %dir.display(), "no text file, skipping");
            continue;
        }
        match fs::read_to_string(&path) {
            Ok(raw) => {
                if !corpus.push(&normalize_newlines(&raw)) {
                    debug!(path = %path.display(), "empty document, skipping");
                }
            }
            Err(err) => debug!(path = %path.display(), %err, "unreadable document, skipping"),
        }
    }
    Ok(corpus)
}
