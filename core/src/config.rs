//! Build configuration, loadable from JSON. Everything is validated before
//! the first document is read.

use crate::error::{ConfigError, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const STAGE_NAMES: &[&str] = &["case_fold", "strip_numerals", "stopwords_small", "stopwords_large", "stem"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerConfig {
    /// Apply NFKC compatibility folding before word extraction.
    pub nfkc: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub stages: Vec<String>,
    /// Replaces the built-in small list.
    pub small_stopwords: Option<PathBuf>,
    /// Replaces the built-in large list.
    pub large_stopwords: Option<PathBuf>,
}

impl PipelineConfig {
    pub fn uncompressed() -> Self { Self::default() }

    pub fn compressed() -> Self {
        Self { stages: STAGE_NAMES.iter().map(|s| s.to_string()).collect(), ..Self::default() }
    }

    /// Resolve a preset name (`uncompressed`, `compressed`) or a comma-separated stage list.
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim() {
            "uncompressed" | "none" | "" => Ok(Self::uncompressed()),
            "compressed" | "all" => Ok(Self::compressed()),
            list => {
                let stages: Vec<String> = list.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
                if let Some(bad) = stages.iter().find(|s| !STAGE_NAMES.contains(&s.as_str())) {
                    return Err(ConfigError::UnknownStage(bad.clone()).into());
                }
                Ok(Self { stages, ..Self::default() })
            }
        }
    }
}

/// When a SPIMI block is flushed. `None` means unbounded for that dimension;
/// a block closes once any bounded dimension reaches its limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockBudget {
    pub max_docs: Option<usize>,
    pub max_terms: Option<usize>,
    pub max_postings: Option<usize>,
}

impl BlockBudget {
    pub fn unbounded() -> Self { Self::default() }

    pub fn docs(n: usize) -> Self { Self { max_docs: Some(n), ..Self::default() } }

    pub fn terms(n: usize) -> Self { Self { max_terms: Some(n), ..Self::default() } }

    pub fn postings(n: usize) -> Self { Self { max_postings: Some(n), ..Self::default() } }

    pub fn validate(&self) -> Result<()> {
        for (budget, value) in [("max_docs", self.max_docs), ("max_terms", self.max_terms), ("max_postings", self.max_postings)] {
            if value == Some(0) {
                return Err(Error::ResourceExhaustion { budget });
            }
        }
        Ok(())
    }

    pub fn is_exhausted(&self, docs: usize, terms: usize, postings: usize) -> bool {
        self.max_docs.is_some_and(|m| docs >= m)
            || self.max_terms.is_some_and(|m| terms >= m)
            || self.max_postings.is_some_and(|m| postings >= m)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub tokenizer: TokenizerConfig,
    pub pipeline: PipelineConfig,
    pub budget: BlockBudget,
}

impl IndexConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| ConfigError::Invalid(format!("{}: {e}", path.display())).into())
    }

    pub fn validate(&self) -> Result<()> {
        self.budget.validate()?;
        if let Some(bad) = self.pipeline.stages.iter().find(|s| !STAGE_NAMES.contains(&s.as_str())) {
            return Err(ConfigError::UnknownStage(bad.clone()).into());
        }
        Ok(())
    }
}
