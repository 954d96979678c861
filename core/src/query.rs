//! Exact single-term and conjunctive lookups over a built index.

use crate::index::{DocId, InvertedIndex};
use crate::tokenizer::Analyzer;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueryResult {
    /// Query terms after normalization, in query order.
    pub terms: Vec<String>,
    /// Query terms with no postings, including ones the pipeline removed.
    pub absent_terms: Vec<String>,
    /// Matching documents, ascending.
    pub doc_ids: Vec<DocId>,
}

impl QueryResult {
    pub fn count(&self) -> usize { self.doc_ids.len() }

    pub fn is_empty(&self) -> bool { self.doc_ids.is_empty() }
}

/// Borrowing evaluator; the index is read-only so any number can run side by side.
pub struct QueryEvaluator<'a> {
    index: &'a InvertedIndex,
    analyzer: &'a Analyzer,
}

impl<'a> QueryEvaluator<'a> {
    /// `analyzer` must be configured like the one that built `index`.
    pub fn new(index: &'a InvertedIndex, analyzer: &'a Analyzer) -> Self {
        Self { index, analyzer }
    }

    pub fn term(&self, term: &str) -> QueryResult {
        self.and(&[term])
    }

    /// Conjunction of every term. Each query word is analyzed like document
    /// text; a word that yields several terms contributes all of them.
    /// Empty when any term is absent.
    pub fn and<S: AsRef<str>>(&self, terms: &[S]) -> QueryResult {
        let mut result = QueryResult::default();
        let mut lists: Vec<Vec<DocId>> = Vec::with_capacity(terms.len());
        for raw in terms {
            let raw = raw.as_ref().trim();
            if raw.is_empty() {
                continue;
            }
            let analyzed = self.analyzer.query_terms(raw);
            if analyzed.is_empty() {
                result.absent_terms.push(raw.to_string());
                continue;
            }
            for term in analyzed {
                match self.index.get(&term) {
                    Some(postings) => lists.push(postings.doc_ids().collect()),
                    None => result.absent_terms.push(term.clone()),
                }
                result.terms.push(term);
            }
        }
        if lists.is_empty() || !result.absent_terms.is_empty() {
            return result;
        }
        // Shortest list first keeps every intermediate result small.
        lists.sort_by_key(Vec::len);
        let mut iter = lists.into_iter();
        let mut acc = iter.next().unwrap_or_default();
        for list in iter {
            if acc.is_empty() {
                break;
            }
            acc = intersect(&acc, &list);
        }
        result.doc_ids = acc;
        result
    }
}

/// Two-pointer intersection of ascending id lists.
pub fn intersect(a: &[DocId], b: &[DocId]) -> Vec<DocId> {
    let mut out = Vec::with_capacity(a.len().min(b.len()));
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersect_basic() {
        assert_eq!(intersect(&[1, 3, 5, 7], &[2, 3, 7, 9]), vec![3, 7]);
        assert!(intersect(&[], &[1]).is_empty());
    }

    #[test]
    fn dropped_query_term_is_absent() {
        use crate::{build_traditional, Document, Pipeline, Tokenizer};
        let analyzer = Analyzer::new(Tokenizer::default(), Pipeline::compressed());
        let index = build_traditional(&analyzer, vec![Document::new(1, "the copper")]).unwrap();
        let q = QueryEvaluator::new(&index, &analyzer);
        let r = q.and(&["the", "copper"]);
        assert!(r.is_empty());
        assert_eq!(r.absent_terms, vec!["the"]);
        assert_eq!(q.term("copper").doc_ids, vec![1]);
    }
}
