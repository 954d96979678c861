use crate::config::{PipelineConfig, TokenizerConfig};
use crate::error::{ConfigError, Result};
use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref RE: Regex = Regex::new(r"(?u)[\p{L}\p{N}]+").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
}

/// Upper bound on re-applying the stemmer or the whole pipeline while a term keeps changing.
const MAX_PASSES: usize = 8;

const SMALL_STOPWORDS: &[&str] = &[
    "the","a","and","or","is","in","of","to","that","this",
    "it","be","for","with","on","as","by","at","from","are",
    "was","were","been","have","has","do","does","did","an","but",
];

const LARGE_STOPWORDS_EXTRA: &[&str] = &[
    "about","after","all","between","can","could","each","few","had","he",
    "her","him","his","how","if","its","just","no","not","now",
    "only","other","our","out","over","same","so","some","such","than",
    "then","there","these","they","those","too","under","very","what","when",
    "where","which","who","why","will","you","your","would","should",
    "may","might","must","shall","into","through","during","before",
    "above","below","up","down","off","again","further","once","here",
    "both","more","most","nor","own","am","being","having","doing","me","us",
    "them","my","their","whom","whose","i",
];

/// Splits text into word tokens on non-alphanumeric boundaries.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tokenizer {
    nfkc: bool,
}

impl Tokenizer {
    pub fn new(config: &TokenizerConfig) -> Self {
        Self { nfkc: config.nfkc }
    }

    /// Lazy token stream; call again to restart.
    pub fn tokens<'a>(&self, text: &'a str) -> Tokens<'a> {
        let text = if self.nfkc { Cow::Owned(text.nfkc().collect()) } else { Cow::Borrowed(text) };
        Tokens { text, pos: 0 }
    }
}

pub struct Tokens<'a> {
    text: Cow<'a, str>,
    pos: usize,
}

impl Iterator for Tokens<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let m = RE.find_at(&self.text, self.pos)?;
        self.pos = m.end();
        Some(m.as_str().to_string())
    }
}

/// A named set of excluded terms. Membership is case-insensitive.
#[derive(Debug, PartialEq, Eq)]
pub struct StopwordSet {
    name: String,
    words: HashSet<String>,
}

impl StopwordSet {
    pub fn from_words<I, S>(name: impl Into<String>, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = words.into_iter().map(|w| w.as_ref().trim().to_lowercase()).filter(|w| !w.is_empty()).collect();
        Self { name: name.into(), words }
    }

    /// The 30 most frequent English function words.
    pub fn small() -> Self {
        Self::from_words("stopwords_small", SMALL_STOPWORDS)
    }

    /// A larger list (113 words) that contains `small()`.
    pub fn large() -> Self {
        Self::from_words("stopwords_large", SMALL_STOPWORDS.iter().chain(LARGE_STOPWORDS_EXTRA))
    }

    /// One word per line; blank lines and `#` comments are skipped.
    pub fn from_file(name: impl Into<String>, path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::StopwordResource { path: path.to_path_buf(), source })?;
        let words = text.lines().map(str::trim).filter(|l| !l.is_empty() && !l.starts_with('#'));
        Ok(Self::from_words(name, words))
    }

    pub fn name(&self) -> &str { &self.name }

    pub fn len(&self) -> usize { self.words.len() }

    pub fn is_empty(&self) -> bool { self.words.is_empty() }

    pub fn contains(&self, term: &str) -> bool {
        if self.words.contains(term) {
            return true;
        }
        term.chars().any(char::is_uppercase) && self.words.contains(&term.to_lowercase())
    }
}

/// One normalization step. `apply` returning `None` drops the term.
#[derive(Debug, Clone)]
pub enum Stage {
    CaseFold,
    StripNumerals,
    Stopwords(Arc<StopwordSet>),
    Stem,
}

impl Stage {
    pub fn name(&self) -> &str {
        match self {
            Stage::CaseFold => "case_fold",
            Stage::StripNumerals => "strip_numerals",
            Stage::Stopwords(set) => set.name(),
            Stage::Stem => "stem",
        }
    }

    pub fn apply(&self, term: String) -> Option<String> {
        match self {
            Stage::CaseFold => Some(term.to_lowercase()),
            Stage::StripNumerals => {
                if term.chars().all(char::is_numeric) { None } else { Some(term) }
            }
            Stage::Stopwords(set) => {
                if set.contains(&term) { None } else { Some(term) }
            }
            Stage::Stem => {
                // Snowball can strip again from its own output ("agreed" -> "agre" -> "agr").
                let mut term = term;
                for _ in 0..MAX_PASSES {
                    let stemmed = STEMMER.stem(&term).into_owned();
                    if stemmed == term {
                        break;
                    }
                    term = stemmed;
                }
                Some(term)
            }
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered list of stages shared by both construction strategies and the query path.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new(stages: Vec<Stage>) -> Self { Self { stages } }

    /// No stages: terms are indexed exactly as tokenized.
    pub fn uncompressed() -> Self { Self::default() }

    /// case folding, numerals, small list, large list, stemming.
    pub fn compressed() -> Self {
        Self::new(vec![
            Stage::CaseFold,
            Stage::StripNumerals,
            Stage::Stopwords(Arc::new(StopwordSet::small())),
            Stage::Stopwords(Arc::new(StopwordSet::large())),
            Stage::Stem,
        ])
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let mut stages = Vec::with_capacity(config.stages.len());
        for name in &config.stages {
            let stage = match name.as_str() {
                "case_fold" => Stage::CaseFold,
                "strip_numerals" => Stage::StripNumerals,
                "stopwords_small" => Stage::Stopwords(Arc::new(match &config.small_stopwords {
                    Some(path) => StopwordSet::from_file("stopwords_small", path)?,
                    None => StopwordSet::small(),
                })),
                "stopwords_large" => Stage::Stopwords(Arc::new(match &config.large_stopwords {
                    Some(path) => StopwordSet::from_file("stopwords_large", path)?,
                    None => StopwordSet::large(),
                })),
                "stem" => Stage::Stem,
                other => return Err(ConfigError::UnknownStage(other.to_string()).into()),
            };
            stages.push(stage);
        }
        Ok(Self { stages })
    }

    pub fn stages(&self) -> &[Stage] { &self.stages }

    /// Runs the stages until the term is stable, so a normalized term
    /// normalizes to itself. A stem that lands on a stopword ("haves" ->
    /// "have") is dropped on the second pass.
    pub fn normalize(&self, term: String) -> Option<String> {
        if self.stages.is_empty() {
            return Some(term);
        }
        let mut current = self.apply_once(term)?;
        for _ in 0..MAX_PASSES {
            let next = self.apply_once(current.clone())?;
            if next == current {
                break;
            }
            current = next;
        }
        Some(current)
    }

    fn apply_once(&self, term: String) -> Option<String> {
        self.stages.iter().try_fold(term, |t, stage| stage.apply(t))
    }
}

/// Tokenizer plus pipeline: turns raw text into index terms.
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    tokenizer: Tokenizer,
    pipeline: Pipeline,
}

impl Analyzer {
    pub fn new(tokenizer: Tokenizer, pipeline: Pipeline) -> Self {
        Self { tokenizer, pipeline }
    }

    pub fn from_config(tokenizer: &TokenizerConfig, pipeline: &PipelineConfig) -> Result<Self> {
        Ok(Self::new(Tokenizer::new(tokenizer), Pipeline::from_config(pipeline)?))
    }

    pub fn pipeline(&self) -> &Pipeline { &self.pipeline }

    pub fn terms<'a>(&'a self, text: &'a str) -> impl Iterator<Item = String> + 'a {
        self.tokenizer.tokens(text).filter_map(move |t| self.pipeline.normalize(t))
    }

    /// Index terms for one query word. It takes the same tokenizer path as
    /// document text, so punctuation and compatibility forms match; a word
    /// may yield several terms ("U.S." -> `u`, `s`) or none.
    pub fn query_terms(&self, word: &str) -> Vec<String> {
        self.terms(word).collect()
    }
}
