use std::fmt;
use std::path::PathBuf;

use tracing::info;

use crate::artifacts::{self, ArtifactError, ArtifactPaths, Meta};
use crate::config::PrepareConfig;
use crate::data::{self, CorpusError, SplitError, TokenId, VocabError, Vocabulary};

#[derive(Debug)]
pub enum PrepareError {
    Corpus(CorpusError),
    EmptyCorpus(PathBuf),
    Vocab(VocabError),
    Split(SplitError),
    Artifact(ArtifactError),
}

impl fmt::Display for PrepareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Corpus(err) => write!(f, "{err}"),
            Self::EmptyCorpus(path) => write!(
                f,
                "no non-empty documents found under {}",
                path.display()
            ),
            Self::Vocab(err) => write!(f, "{err}"),
            Self::Split(err) => write!(f, "{err}"),
            Self::Artifact(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for PrepareError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Corpus(err) => Some(err),
            Self::EmptyCorpus(_) => None,
            Self::Vocab(err) => Some(err),
            Self::Split(err) => Some(err),
            Self::Artifact(err) => Some(err),
        }
    }
}

impl From<CorpusError> for PrepareError {
    fn from(err: CorpusError) -> Self {
        Self::Corpus(err)
    }
}

impl From<VocabError> for PrepareError {
    fn from(err: VocabError) -> Self {
        Self::Vocab(err)
    }
}

impl From<SplitError> for PrepareError {
    fn from(err: SplitError) -> Self {
        Self::Split(err)
    }
}

impl From<ArtifactError> for PrepareError {
    fn from(err: ArtifactError) -> Self {
        Self::Artifact(err)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedSplit {
    pub vocab: Vocabulary,
    pub train_ids: Vec<TokenId>,
    pub val_ids: Vec<TokenId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrepareReport {
    pub poem_count: usize,
    pub corpus_chars: usize,
    pub vocab_size: usize,
    pub vocab_sample: String,
    pub train_tokens: usize,
    pub val_tokens: usize,
    pub paths: ArtifactPaths,
}

impl fmt::Display for PrepareReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "poems={} chars={} vocab_size={} train_tokens={} val_tokens={} train={} val={} meta={}",
            self.poem_count,
            self.corpus_chars,
            self.vocab_size,
            self.train_tokens,
            self.val_tokens,
            self.paths.train.display(),
            self.paths.val.display(),
            self.paths.meta.display()
        )
    }
}

pub fn encode_and_split(text: &str, train_fraction: f64) -> Result<EncodedSplit, PrepareError> {
    let vocab = Vocabulary::from_text(text)?;
    let ids = vocab.encode(text)?;
    let (train_ids, val_ids) = data::split_train_val(&ids, train_fraction)?;
    Ok(EncodedSplit {
        vocab,
        train_ids,
        val_ids,
    })
}

pub fn prepare(config: &PrepareConfig) -> Result<PrepareReport, PrepareError> {
    data::validate_train_fraction(config.train_fraction)?;

    info!(source = %config.source_dir.display(), "collecting documents");
    let corpus = data::collect_documents(&config.source_dir, &config.text_file)?;
    if corpus.is_empty() {
        return Err(PrepareError::EmptyCorpus(config.source_dir.clone()));
    }

    let text = corpus.text();
    let corpus_chars = text.chars().count();
    info!(poems = corpus.len(), chars = corpus_chars, "collected corpus");

    let split = encode_and_split(&text, config.train_fraction)?;
    info!(
        vocab_size = split.vocab.vocab_size(),
        sample = %split.vocab.sample(),
        "built vocabulary"
    );
    info!(
        train_tokens = split.train_ids.len(),
        val_tokens = split.val_ids.len(),
        "split corpus"
    );

    let paths = artifacts::write_artifacts(
        &config.out_dir,
        &split.train_ids,
        &split.val_ids,
        &Meta::from_vocab(&split.vocab),
    )?;
    info!(out_dir = %config.out_dir.display(), "wrote artifacts");

    Ok(PrepareReport {
        poem_count: corpus.len(),
        corpus_chars,
        vocab_size: split.vocab.vocab_size(),
        vocab_sample: split.vocab.sample(),
        train_tokens: split.train_ids.len(),
        val_tokens: split.val_ids.len(),
        paths,
    })
}

#[cfg(test)]
mod tests {
    use std::error::Error;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::{PrepareError, encode_and_split, prepare};
    use crate::artifacts::{self, META_FILE, TRAIN_FILE, VAL_FILE};
    use crate::config::PrepareConfig;
    use crate::data::{CorpusError, DEFAULT_TEXT_FILE, SplitError, VocabError};

    fn scratch_dir(tag: &str) -> PathBuf {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        std::env::temp_dir().join(format!("charcorpus_prepare_{tag}_{unique}"))
    }

    fn write_poem(root: &Path, name: &str, text: &str) {
        let dir = root.join(name);
        fs::create_dir_all(&dir).expect("create poem dir");
        fs::write(dir.join(DEFAULT_TEXT_FILE), text).expect("write poem");
    }

    #[test]
    fn two_document_scenario() {
        let split = encode_and_split("AB\n\nBA", 0.9).expect("non-empty corpus");

        assert_eq!(split.vocab.chars(), &['\n', 'A', 'B']);
        assert_eq!(split.train_ids, vec![1, 2, 0, 0, 2]);
        assert_eq!(split.val_ids, vec![1]);

        let train = split.vocab.decode(&split.train_ids).expect("known ids");
        let val = split.vocab.decode(&split.val_ids).expect("known ids");
        assert_eq!(format!("{train}{val}"), "AB\n\nBA");
    }

    #[test]
    fn split_sizes_follow_floor_of_char_count() {
        // 7 chars, 3 bytes each: the cut is by char, not byte.
        let text = "大江东去浪淘尽";
        let split = encode_and_split(text, 0.9).expect("non-empty corpus");
        assert_eq!(split.train_ids.len(), 6);
        assert_eq!(split.val_ids.len(), 1);
        assert_eq!(split.vocab.vocab_size(), 7);
    }

    #[test]
    fn empty_text_has_no_vocabulary() {
        let err = encode_and_split("", 0.9).expect_err("empty corpus");
        assert!(matches!(err, PrepareError::Vocab(_)));
    }

    #[test]
    fn prepare_writes_all_artifacts() {
        let root = scratch_dir("full");
        let source = root.join("poems");
        let out = root.join("out");
        write_poem(&source, "0002", "BA\n");
        write_poem(&source, "0001", "  AB");
        write_poem(&source, "0003", " \n \t");
        fs::create_dir_all(source.join("0004")).expect("create empty poem dir");

        let report = prepare(&PrepareConfig::new(&source, &out)).expect("prepare succeeds");
        assert_eq!(report.poem_count, 2);
        assert_eq!(report.corpus_chars, 6);
        assert_eq!(report.vocab_size, 3);
        assert_eq!(report.train_tokens, 5);
        assert_eq!(report.val_tokens, 1);
        assert_eq!(report.paths.train, out.join(TRAIN_FILE));

        let train = artifacts::read_token_ids(&out.join(TRAIN_FILE)).expect("read train");
        let val = artifacts::read_token_ids(&out.join(VAL_FILE)).expect("read val");
        let vocab = artifacts::load_vocab(&out.join(META_FILE)).expect("read meta");
        let ids: Vec<u16> = train.into_iter().chain(val).collect();
        assert_eq!(vocab.decode(&ids).expect("known ids"), "AB\n\nBA");

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn prepare_is_deterministic() {
        let root = scratch_dir("determinism");
        let source = root.join("poems");
        write_poem(&source, "b", "十年生死两茫茫，不思量，自难忘。");
        write_poem(&source, "a", "明月几时有？把酒问青天。");
        write_poem(&source, "c", "大江东去，浪淘尽，千古风流人物。");

        let first = root.join("first");
        let second = root.join("second");
        prepare(&PrepareConfig::new(&source, &first)).expect("first run");
        prepare(&PrepareConfig::new(&source, &second)).expect("second run");

        for name in [TRAIN_FILE, VAL_FILE, META_FILE] {
            let a = fs::read(first.join(name)).expect("read first");
            let b = fs::read(second.join(name)).expect("read second");
            assert_eq!(a, b, "{name} differs between runs");
        }

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn prepare_rejects_empty_corpus() {
        let root = scratch_dir("empty");
        let source = root.join("poems");
        write_poem(&source, "blank", "   \n");
        let out = root.join("out");

        let err = prepare(&PrepareConfig::new(&source, &out)).expect_err("empty corpus");
        assert!(matches!(err, PrepareError::EmptyCorpus(path) if path == source));
        assert!(!out.exists(), "nothing is written for an empty corpus");

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn prepare_rejects_missing_source() {
        let root = scratch_dir("missing");
        let err = prepare(&PrepareConfig::new(root.join("nope"), root.join("out")))
            .expect_err("missing source");
        assert!(matches!(
            err,
            PrepareError::Corpus(CorpusError::SourceMissing(_))
        ));
    }

    #[test]
    fn wrapped_errors_expose_their_source() {
        let err = PrepareError::from(VocabError::Empty);
        let source = err.source().expect("vocab error is chained");
        assert_eq!(source.to_string(), VocabError::Empty.to_string());

        let err = PrepareError::from(SplitError::InvalidTrainFraction(2.0));
        assert!(err.source().is_some());

        let err = PrepareError::EmptyCorpus(PathBuf::from("poems"));
        assert!(err.source().is_none());
    }

    #[test]
    fn prepare_rejects_bad_fraction_before_reading() {
        let root = scratch_dir("fraction");
        let mut config = PrepareConfig::new(root.join("nope"), root.join("out"));
        config.train_fraction = 1.2;

        let err = prepare(&config).expect_err("invalid fraction");
        assert!(matches!(
            err,
            PrepareError::Split(SplitError::InvalidTrainFraction(_))
        ));
    }
}
