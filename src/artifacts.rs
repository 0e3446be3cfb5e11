use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::data::{TokenId, VocabError, Vocabulary};

pub const TRAIN_FILE: &str = "train.bin";
pub const VAL_FILE: &str = "val.bin";
pub const META_FILE: &str = "meta.json";

const TOKEN_WIDTH: usize = std::mem::size_of::<TokenId>();

#[derive(Debug)]
pub enum ArtifactError {
    Io { path: PathBuf, source: io::Error },
    Json { path: PathBuf, source: serde_json::Error },
    TruncatedTokenFile { path: PathBuf, len: usize },
    InconsistentMeta(String),
    Vocab(VocabError),
}

impl fmt::Display for ArtifactError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
            Self::Json { path, source } => write!(f, "{}: {source}", path.display()),
            Self::TruncatedTokenFile { path, len } => write!(
                f,
                "{}: {len} bytes is not a whole number of {TOKEN_WIDTH}-byte token ids",
                path.display()
            ),
            Self::InconsistentMeta(reason) => write!(f, "inconsistent vocabulary metadata: {reason}"),
            Self::Vocab(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ArtifactError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            Self::Vocab(err) => Some(err),
            _ => None,
        }
    }
}

impl From<VocabError> for ArtifactError {
    fn from(err: VocabError) -> Self {
        Self::Vocab(err)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    pub vocab_size: usize,
    pub itos: BTreeMap<usize, char>,
    pub stoi: BTreeMap<char, TokenId>,
}

impl Meta {
    pub fn from_vocab(vocab: &Vocabulary) -> Self {
        Self {
            vocab_size: vocab.vocab_size(),
            itos: vocab.itos_map(),
            stoi: vocab.stoi_map(),
        }
    }

    pub fn into_vocab(self) -> Result<Vocabulary, ArtifactError> {
        if self.itos.len() != self.vocab_size {
            return Err(ArtifactError::InconsistentMeta(format!(
                "vocab_size is {} but itos has {} entries",
                self.vocab_size,
                self.itos.len()
            )));
        }
        if !self.itos.keys().copied().eq(0..self.vocab_size) {
            return Err(ArtifactError::InconsistentMeta(
                "itos indices are not contiguous from 0".to_string(),
            ));
        }

        let vocab = Vocabulary::from_itos(self.itos.into_values().collect())?;
        if vocab.stoi_map() != self.stoi {
            return Err(ArtifactError::InconsistentMeta(
                "stoi is not the inverse of itos".to_string(),
            ));
        }
        Ok(vocab)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub train: PathBuf,
    pub val: PathBuf,
    pub meta: PathBuf,
}

impl ArtifactPaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            train: dir.join(TRAIN_FILE),
            val: dir.join(VAL_FILE),
            meta: dir.join(META_FILE),
        }
    }
}

pub fn persist_atomic(path: &Path, payload: &[u8]) -> Result<(), ArtifactError> {
    let io_err = |source: io::Error| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let tmp_path = temporary_path(path);
    fs::write(&tmp_path, payload).map_err(io_err)?;
    fs::rename(&tmp_path, path).map_err(io_err)?;
    Ok(())
}

fn temporary_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .unwrap_or("artifact");
    path.with_file_name(format!("{file_name}.tmp"))
}

pub fn encode_token_ids(ids: &[TokenId]) -> Vec<u8> {
    ids.iter().flat_map(|id| id.to_le_bytes()).collect()
}

/// Flat little-endian `u16` array, no header.
pub fn write_token_ids(path: &Path, ids: &[TokenId]) -> Result<(), ArtifactError> {
    persist_atomic(path, &encode_token_ids(ids))
}

pub fn read_token_ids(path: &Path) -> Result<Vec<TokenId>, ArtifactError> {
    let bytes = fs::read(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if !bytes.len().is_multiple_of(TOKEN_WIDTH) {
        return Err(ArtifactError::TruncatedTokenFile {
            path: path.to_path_buf(),
            len: bytes.len(),
        });
    }
    Ok(bytes
        .chunks_exact(TOKEN_WIDTH)
        .map(|chunk| TokenId::from_le_bytes([chunk[0], chunk[1]]))
        .collect())
}

pub fn write_meta(path: &Path, meta: &Meta) -> Result<(), ArtifactError> {
    let mut payload = serde_json::to_vec_pretty(meta).map_err(|source| ArtifactError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    payload.push(b'\n');
    persist_atomic(path, &payload)
}

pub fn read_meta(path: &Path) -> Result<Meta, ArtifactError> {
    let bytes = fs::read(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Json {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_vocab(meta_path: &Path) -> Result<Vocabulary, ArtifactError> {
    read_meta(meta_path)?.into_vocab()
}

pub fn write_artifacts(
    out_dir: &Path,
    train_ids: &[TokenId],
    val_ids: &[TokenId],
    meta: &Meta,
) -> Result<ArtifactPaths, ArtifactError> {
    let paths = ArtifactPaths::in_dir(out_dir);
    write_token_ids(&paths.train, train_ids)?;
    write_token_ids(&paths.val, val_ids)?;
    write_meta(&paths.meta, meta)?;
    Ok(paths)
}

pub fn decode_file(
    meta_path: &Path,
    ids_path: &Path,
    limit: Option<usize>,
) -> Result<String, ArtifactError> {
    let vocab = load_vocab(meta_path)?;
    let ids = read_token_ids(ids_path)?;
    let end = limit.map_or(ids.len(), |limit| limit.min(ids.len()));
    Ok(vocab.decode(&ids[..end])?)
}
