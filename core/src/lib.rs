//! Inverted index construction by two interchangeable strategies.
//!
//! `traditional` collects every (term, document) pair, sorts, and builds in one
//! pass. `spimi` accumulates postings in bounded in-memory blocks and merges
//! them. Given the same [`Analyzer`] and document stream both return equal
//! [`InvertedIndex`] values. `query` evaluates term and AND lookups, and
//! `compression` measures how much each normalization stage shrinks the
//! vocabulary.

pub mod compression;
pub mod config;
pub mod error;
pub mod index;
pub mod persist;
pub mod query;
pub mod spimi;
pub mod tokenizer;
pub mod traditional;

pub use compression::{CompressionReport, CompressionRow};
pub use config::{BlockBudget, IndexConfig, PipelineConfig, TokenizerConfig};
pub use error::{ConfigError, Error, InputError, Result};
pub use index::{DocId, Document, InvertedIndex, Posting, PostingsList};
pub use query::{intersect, QueryEvaluator, QueryResult};
pub use spimi::{build_spimi, build_spimi_with_report, merge_blocks, BlockAccumulator, BlockStats, BlockStore, SpillDir, SpimiReport};
pub use tokenizer::{Analyzer, Pipeline, Stage, StopwordSet, Tokenizer};
pub use traditional::{build_traditional, PostingCollector};

/// Construction strategy, as named in configuration and index metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Traditional,
    Spimi,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Traditional => "traditional",
            Strategy::Spimi => "spimi",
        }
    }
}

impl std::str::FromStr for Strategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "traditional" | "sort" => Ok(Strategy::Traditional),
            "spimi" => Ok(Strategy::Spimi),
            other => Err(ConfigError::Invalid(format!("unknown strategy: {other}")).into()),
        }
    }
}

/// Build with `config`, validating it before any document is consumed.
pub fn build_index<I>(strategy: Strategy, config: &IndexConfig, docs: I) -> Result<InvertedIndex>
where
    I: IntoIterator<Item = Document>,
{
    config.validate()?;
    let analyzer = Analyzer::from_config(&config.tokenizer, &config.pipeline)?;
    match strategy {
        Strategy::Traditional => build_traditional(&analyzer, docs),
        Strategy::Spimi => build_spimi(&analyzer, config.budget, docs),
    }
}
