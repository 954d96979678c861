//! Vocabulary reduction per normalization stage.
//!
//! Starting from an unnormalized index, each stage is applied cumulatively to
//! the term dictionary. Terms that collapse onto the same output have their
//! document sets unioned, so the postings column counts distinct
//! (term, document) pairs after each step. The source index is never touched.

use crate::index::{DocId, InvertedIndex};
use crate::tokenizer::Stage;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompressionRow {
    pub stage: String,
    pub terms: usize,
    pub postings: usize,
    /// Term-count change against the previous row, in percent (negative = smaller).
    pub terms_delta_pct: f64,
    /// Term-count change against the first row.
    pub terms_cumulative_pct: f64,
    pub postings_delta_pct: f64,
    pub postings_cumulative_pct: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompressionReport {
    pub rows: Vec<CompressionRow>,
}

impl CompressionReport {
    /// Measure `stages` over an index built without normalization.
    pub fn measure(index: &InvertedIndex, stages: &[Stage]) -> Self {
        let vocab = index.iter().map(|(t, p)| (t.to_string(), p.doc_ids().collect::<BTreeSet<DocId>>())).collect();
        Self::run(vocab, stages)
    }

    /// Term counts only, for a bare vocabulary with no postings.
    pub fn measure_vocabulary<I, S>(vocabulary: I, stages: &[Stage]) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let vocab = vocabulary.into_iter().map(|t| (t.into(), BTreeSet::<DocId>::new())).collect();
        Self::run(vocab, stages)
    }

    fn run(mut vocab: BTreeMap<String, BTreeSet<DocId>>, stages: &[Stage]) -> Self {
        let mut report = Self::default();
        report.push("uncompressed", &vocab);
        for stage in stages {
            vocab = apply_stage(vocab, stage);
            report.push(stage.name(), &vocab);
        }
        report
    }

    pub fn final_terms(&self) -> usize {
        self.rows.last().map_or(0, |r| r.terms)
    }

    fn push(&mut self, stage: &str, vocab: &BTreeMap<String, BTreeSet<DocId>>) {
        let terms = vocab.len();
        let postings = vocab.values().map(BTreeSet::len).sum();
        let (prev, first) = (self.rows.last(), self.rows.first());
        let row = CompressionRow {
            stage: stage.to_string(),
            terms,
            postings,
            terms_delta_pct: prev.map_or(0.0, |p| pct_change(p.terms, terms)),
            terms_cumulative_pct: first.map_or(0.0, |f| pct_change(f.terms, terms)),
            postings_delta_pct: prev.map_or(0.0, |p| pct_change(p.postings, postings)),
            postings_cumulative_pct: first.map_or(0.0, |f| pct_change(f.postings, postings)),
        };
        self.rows.push(row);
    }
}

fn apply_stage(vocab: BTreeMap<String, BTreeSet<DocId>>, stage: &Stage) -> BTreeMap<String, BTreeSet<DocId>> {
    let mut out: BTreeMap<String, BTreeSet<DocId>> = BTreeMap::new();
    for (term, docs) in vocab {
        if let Some(t) = stage.apply(term) {
            out.entry(t).or_default().extend(docs);
        }
    }
    out
}

fn pct_change(from: usize, to: usize) -> f64 {
    if from == 0 {
        return 0.0;
    }
    (to as f64 - from as f64) / from as f64 * 100.0
}
