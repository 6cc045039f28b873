use anyhow::{bail, Result};
use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref TOKEN_RE: Regex = Regex::new(r"[\p{L}\p{N}]+").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = {
        // Lucene EnglishAnalyzer default stop set.
        let words: &[&str] = &[
            "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if",
            "in", "into", "is", "it", "no", "not", "of", "on", "or", "such",
            "that", "the", "their", "then", "there", "these", "they", "this",
            "to", "was", "will", "with",
        ];
        words.iter().copied().collect()
    };
}

/// External lemma provider, required only for [`NormalizationMode::Lemmatize`].
pub trait Lemmatizer: Send + Sync {
    fn lemma(&self, token: &str) -> String;
}

/// Named text-processing pipeline, applied identically at index-build and
/// query time. Each mode also maps to its own index directory so that
/// indexes built under different modes never mix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormalizationMode {
    Raw,
    Stopwords,
    Stem,
    Lemmatize,
    StopwordsStem,
}

impl NormalizationMode {
    /// Directory name the persisted index for this mode lives under.
    pub fn dir_name(&self) -> &'static str {
        match self {
            NormalizationMode::Raw => "index-raw",
            NormalizationMode::Stopwords => "index-stopwords",
            NormalizationMode::Stem => "index-stem",
            NormalizationMode::Lemmatize => "index-lemma",
            NormalizationMode::StopwordsStem => "index-stopwords-stem",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NormalizationMode::Raw => "raw",
            NormalizationMode::Stopwords => "stopwords",
            NormalizationMode::Stem => "stem",
            NormalizationMode::Lemmatize => "lemmatize",
            NormalizationMode::StopwordsStem => "stopwords-stem",
        }
    }
}

impl fmt::Display for NormalizationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NormalizationMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "raw" => Ok(NormalizationMode::Raw),
            "stopwords" => Ok(NormalizationMode::Stopwords),
            "stem" => Ok(NormalizationMode::Stem),
            "lemmatize" => Ok(NormalizationMode::Lemmatize),
            "stopwords-stem" => Ok(NormalizationMode::StopwordsStem),
            other => bail!("unknown normalization mode: {other}"),
        }
    }
}

enum Pipeline {
    Raw,
    Stopwords,
    Stem,
    Lemmatize(Arc<dyn Lemmatizer>),
    StopwordsStem,
}

/// Turns raw text into index terms under a fixed mode. The same normalizer
/// configuration must be used for the corpus and for queries; the persisted
/// meta file enforces this pairing at load time.
pub struct Normalizer {
    mode: NormalizationMode,
    pipeline: Pipeline,
}

impl Normalizer {
    /// Build a normalizer for any mode that needs no external provider.
    pub fn new(mode: NormalizationMode) -> Result<Self> {
        let pipeline = match mode {
            NormalizationMode::Raw => Pipeline::Raw,
            NormalizationMode::Stopwords => Pipeline::Stopwords,
            NormalizationMode::Stem => Pipeline::Stem,
            NormalizationMode::StopwordsStem => Pipeline::StopwordsStem,
            NormalizationMode::Lemmatize => {
                bail!("lemmatize mode requires a provider; use Normalizer::with_lemmatizer")
            }
        };
        Ok(Self { mode, pipeline })
    }

    /// Build a lemmatizing normalizer around an injected lemma provider.
    pub fn with_lemmatizer(provider: Arc<dyn Lemmatizer>) -> Self {
        Self {
            mode: NormalizationMode::Lemmatize,
            pipeline: Pipeline::Lemmatize(provider),
        }
    }

    pub fn mode(&self) -> NormalizationMode {
        self.mode
    }

    /// Tokenize on non-alphanumeric boundaries after NFKC case folding, then
    /// apply the mode's transform. An empty result is valid, not an error.
    pub fn normalize(&self, text: &str) -> Vec<String> {
        let folded = text.nfkc().collect::<String>().to_lowercase();
        let mut terms = Vec::new();
        for mat in TOKEN_RE.find_iter(&folded) {
            let token = mat.as_str();
            match &self.pipeline {
                Pipeline::Raw => terms.push(token.to_string()),
                Pipeline::Stopwords => {
                    if !STOPWORDS.contains(token) {
                        terms.push(token.to_string());
                    }
                }
                Pipeline::Stem => terms.push(STEMMER.stem(token).to_string()),
                Pipeline::Lemmatize(provider) => terms.push(provider.lemma(token)),
                Pipeline::StopwordsStem => {
                    if !STOPWORDS.contains(token) {
                        terms.push(STEMMER.stem(token).to_string());
                    }
                }
            }
        }
        terms
    }
}
