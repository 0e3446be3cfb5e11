use std::fmt;

pub mod corpus;
pub mod vocab;

pub use corpus::{
    Corpus, CorpusError, DEFAULT_TEXT_FILE, DOCUMENT_SEPARATOR, collect_documents,
    normalize_newlines,
};
pub use vocab::{MAX_VOCAB_SIZE, TokenId, VocabError, Vocabulary};

pub const DEFAULT_TRAIN_FRACTION: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SplitError {
    InvalidTrainFraction(f64),
}

impl fmt::Display for SplitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTrainFraction(value) => {
                write!(f, "train fraction must be finite and within [0, 1], got {value}")
            }
        }
    }
}

impl std::error::Error for SplitError {}

pub fn validate_train_fraction(train_fraction: f64) -> Result<f64, SplitError> {
    if train_fraction.is_finite() && (0.0..=1.0).contains(&train_fraction) {
        Ok(train_fraction)
    } else {
        Err(SplitError::InvalidTrainFraction(train_fraction))
    }
}

/// Index of the first validation element: `floor(len * train_fraction)`.
pub fn split_boundary(len: usize, train_fraction: f64) -> Result<usize, SplitError> {
    let fraction = validate_train_fraction(train_fraction)?;
    let boundary = ((len as f64) * fraction).floor() as usize;
    Ok(boundary.min(len))
}

pub fn split_train_val<T: Clone>(
    items: &[T],
    train_fraction: f64,
) -> Result<(Vec<T>, Vec<T>), SplitError> {
    let boundary = split_boundary(items.len(), train_fraction)?;
    let (train, val) = items.split_at(boundary);
    Ok((train.to_vec(), val.to_vec()))
}
