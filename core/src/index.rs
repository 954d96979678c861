use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type DocId = u32;

/// One entry of the document stream: an id unique within a build, plus raw text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub text: String,
}

impl Document {
    pub fn new(id: DocId, text: impl Into<String>) -> Self {
        Self { id, text: text.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub tf: u32, // occurrences of the term in this document
}

/// Postings for a single term, ascending by `doc_id`, one entry per document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingsList {
    postings: Vec<Posting>,
}

impl PostingsList {
    /// Caller guarantees ascending, duplicate-free doc ids.
    pub(crate) fn from_sorted(postings: Vec<Posting>) -> Self {
        debug_assert!(postings.windows(2).all(|w| w[0].doc_id < w[1].doc_id));
        Self { postings }
    }

    pub fn postings(&self) -> &[Posting] { &self.postings }

    pub fn doc_ids(&self) -> impl Iterator<Item = DocId> + '_ {
        self.postings.iter().map(|p| p.doc_id)
    }

    /// Number of documents containing the term.
    pub fn document_frequency(&self) -> usize { self.postings.len() }

    /// Total occurrences of the term across the collection.
    pub fn collection_frequency(&self) -> u64 {
        self.postings.iter().map(|p| p.tf as u64).sum()
    }
}

/// Term → postings mapping. Immutable once a builder hands it out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvertedIndex {
    terms: BTreeMap<String, PostingsList>,
    num_docs: u32,
}

impl InvertedIndex {
    pub(crate) fn from_parts(terms: BTreeMap<String, PostingsList>, num_docs: u32) -> Self {
        Self { terms, num_docs }
    }

    pub fn get(&self, term: &str) -> Option<&PostingsList> { self.terms.get(term) }

    /// Terms in ascending order.
    pub fn terms(&self) -> impl Iterator<Item = &str> + '_ {
        self.terms.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PostingsList)> + '_ {
        self.terms.iter().map(|(t, p)| (t.as_str(), p))
    }

    pub fn num_terms(&self) -> usize { self.terms.len() }

    pub fn num_docs(&self) -> u32 { self.num_docs }

    /// Sum over terms of the number of distinct documents.
    pub fn num_postings(&self) -> usize {
        self.terms.values().map(PostingsList::document_frequency).sum()
    }

    pub fn is_empty(&self) -> bool { self.terms.is_empty() }
}

/// Union of two ascending postings slices. A document present in both gets its tf summed.
pub(crate) fn union_postings(a: &[Posting], b: &[Posting]) -> Vec<Posting> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].doc_id.cmp(&b[j].doc_id) {
            std::cmp::Ordering::Less => { out.push(a[i]); i += 1; }
            std::cmp::Ordering::Greater => { out.push(b[j]); j += 1; }
            std::cmp::Ordering::Equal => {
                out.push(Posting { doc_id: a[i].doc_id, tf: a[i].tf + b[j].tf });
                i += 1;
                j += 1;
            }
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}
