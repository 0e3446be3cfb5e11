use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

pub type TokenId = u16;

/// Ids are persisted as `u16`, so at most 65,536 distinct characters fit.
pub const MAX_VOCAB_SIZE: usize = TokenId::MAX as usize + 1;

const SAMPLE_LEN: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    itos: Vec<char>,
    stoi: HashMap<char, TokenId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VocabError {
    Empty,
    TooLarge { size: usize, max: usize },
    NotCanonical,
    UnknownChar(char),
    UnknownId(TokenId),
}

impl fmt::Display for VocabError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "vocabulary must contain at least one character"),
            Self::TooLarge { size, max } => write!(
                f,
                "vocabulary of {size} characters does not fit 16-bit ids (max {max})"
            ),
            Self::NotCanonical => write!(
                f,
                "vocabulary characters must be unique and sorted by code point"
            ),
            Self::UnknownChar(ch) => write!(f, "character {ch:?} is not in the vocabulary"),
            Self::UnknownId(id) => write!(f, "token id {id} is not in the vocabulary"),
        }
    }
}

impl std::error::Error for VocabError {}

impl Vocabulary {
    pub fn from_text(text: &str) -> Result<Self, VocabError> {
        let unique_chars: BTreeSet<char> = text.chars().collect();
        Self::build(unique_chars.into_iter().collect())
    }

    pub fn from_itos(itos: Vec<char>) -> Result<Self, VocabError> {
        if !itos.windows(2).all(|pair| pair[0] < pair[1]) {
            return Err(VocabError::NotCanonical);
        }
        Self::build(itos)
    }

    fn build(itos: Vec<char>) -> Result<Self, VocabError> {
        if itos.is_empty() {
            return Err(VocabError::Empty);
        }
        if itos.len() > MAX_VOCAB_SIZE {
            return Err(VocabError::TooLarge {
                size: itos.len(),
                max: MAX_VOCAB_SIZE,
            });
        }

        // In range: len <= MAX_VOCAB_SIZE was checked above.
        let stoi = itos
            .iter()
            .enumerate()
            .map(|(idx, ch)| (*ch, idx as TokenId))
            .collect();

        Ok(Self { itos, stoi })
    }

    pub fn vocab_size(&self) -> usize {
        self.itos.len()
    }

    pub fn chars(&self) -> &[char] {
        &self.itos
    }

    pub fn id_for_char(&self, ch: char) -> Option<TokenId> {
        self.stoi.get(&ch).copied()
    }

    pub fn char_for_id(&self, id: TokenId) -> Option<char> {
        self.itos.get(usize::from(id)).copied()
    }

    pub fn encode(&self, text: &str) -> Result<Vec<TokenId>, VocabError> {
        text.chars()
            .map(|ch| self.id_for_char(ch).ok_or(VocabError::UnknownChar(ch)))
            .collect()
    }

    pub fn decode(&self, ids: &[TokenId]) -> Result<String, VocabError> {
        let mut text = String::with_capacity(ids.len());
        for id in ids {
            let ch = self.char_for_id(*id).ok_or(VocabError::UnknownId(*id))?;
            text.push(ch);
        }
        Ok(text)
    }

    pub fn itos_map(&self) -> BTreeMap<usize, char> {
        self.itos.iter().copied().enumerate().collect()
    }

    pub fn stoi_map(&self) -> BTreeMap<char, TokenId> {
        self.stoi.iter().map(|(ch, id)| (*ch, *id)).collect()
    }

    pub fn sample(&self) -> String {
        let head: String = self.itos.iter().take(SAMPLE_LEN).collect();
        if self.itos.len() > SAMPLE_LEN {
            format!("{head}...")
        } else {
            head
        }
    }
}
