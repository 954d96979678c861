//! Collect every (term, doc) pair, sort once, then build the index in a single pass.

use crate::error::{InputError, Result};
use crate::index::{DocId, Document, InvertedIndex, Posting, PostingsList};
use crate::tokenizer::Analyzer;
use std::collections::{BTreeMap, HashSet};
use std::time::Instant;

/// Flat, unordered accumulation of (term, doc id) occurrences.
pub struct PostingCollector<'a> {
    analyzer: &'a Analyzer,
    pairs: Vec<(String, DocId)>,
    seen: HashSet<DocId>,
}

impl<'a> PostingCollector<'a> {
    pub fn new(analyzer: &'a Analyzer) -> Self {
        Self { analyzer, pairs: Vec::new(), seen: HashSet::new() }
    }

    pub fn add_document(&mut self, doc: &Document) -> Result<()> {
        if !self.seen.insert(doc.id) {
            return Err(InputError::DuplicateDocId(doc.id).into());
        }
        for term in self.analyzer.terms(&doc.text) {
            self.pairs.push((term, doc.id));
        }
        Ok(())
    }

    /// Occurrences collected so far, duplicates included.
    pub fn len(&self) -> usize { self.pairs.len() }

    pub fn is_empty(&self) -> bool { self.pairs.is_empty() }

    /// Sort by (term, doc id) and fold runs into postings with term frequency.
    pub fn build(self) -> InvertedIndex {
        let started = Instant::now();
        let num_docs = self.seen.len() as u32;
        let mut pairs = self.pairs;
        let num_pairs = pairs.len();
        pairs.sort_unstable();

        let mut terms: BTreeMap<String, PostingsList> = BTreeMap::new();
        let mut current: Option<String> = None;
        let mut postings: Vec<Posting> = Vec::new();
        for (term, doc_id) in pairs {
            if current.as_deref() != Some(term.as_str()) {
                if let Some(done) = current.take() {
                    terms.insert(done, PostingsList::from_sorted(std::mem::take(&mut postings)));
                }
                current = Some(term);
            }
            match postings.last_mut() {
                Some(last) if last.doc_id == doc_id => last.tf += 1,
                _ => postings.push(Posting { doc_id, tf: 1 }),
            }
        }
        if let Some(done) = current {
            terms.insert(done, PostingsList::from_sorted(postings));
        }

        tracing::info!(num_pairs, num_terms = terms.len(), num_docs, elapsed_ms = started.elapsed().as_millis() as u64, "sort-and-build complete");
        InvertedIndex::from_parts(terms, num_docs)
    }
}

/// Build an index from a document stream. Any input error aborts the build.
pub fn build_traditional<I>(analyzer: &Analyzer, docs: I) -> Result<InvertedIndex>
where
    I: IntoIterator<Item = Document>,
{
    let mut collector = PostingCollector::new(analyzer);
    for doc in docs {
        collector.add_document(&doc)?;
    }
    Ok(collector.build())
}
