use proptest::prelude::*;
use spimi_core::config::TokenizerConfig;
use spimi_core::{build_spimi, build_traditional, intersect, Analyzer, BlockBudget, Document, Pipeline, QueryEvaluator, Stage, Tokenizer};

fn corpus() -> Vec<Document> {
    vec![
        Document::new(1, "Copper prices rise"),
        Document::new(2, "COPPER falls sharply"),
        Document::new(3, "Pineapple imports"),
    ]
}

fn case_folded() -> Analyzer {
    Analyzer::new(Tokenizer::default(), Pipeline::new(vec![Stage::CaseFold]))
}

#[test]
fn lookup_depends_on_case_folding() {
    let raw = Analyzer::default();
    let index = build_traditional(&raw, corpus()).unwrap();
    let q = QueryEvaluator::new(&index, &raw);
    let r = q.term("copper");
    assert!(r.is_empty());
    assert_eq!(r.absent_terms, vec!["copper"]);
    assert_eq!(q.term("Copper").doc_ids, vec![1]);
    assert_eq!(q.term("COPPER").doc_ids, vec![2]);

    let folded = case_folded();
    let index = build_traditional(&folded, corpus()).unwrap();
    let q = QueryEvaluator::new(&index, &folded);
    assert_eq!(q.term("copper").doc_ids, vec![1, 2]);
    assert_eq!(q.term("Copper").count(), 2);
}

#[test]
fn and_without_shared_document_is_empty() {
    for analyzer in [Analyzer::default(), case_folded(), Analyzer::new(Tokenizer::default(), Pipeline::compressed())] {
        let index = build_spimi(&analyzer, BlockBudget::docs(1), corpus()).unwrap();
        let r = QueryEvaluator::new(&index, &analyzer).and(&["copper", "pineapple"]);
        assert!(r.is_empty());
    }
}

#[test]
fn absent_term_is_a_value_not_an_error() {
    let analyzer = case_folded();
    let index = build_traditional(&analyzer, corpus()).unwrap();
    let r = QueryEvaluator::new(&index, &analyzer).term("bundesbank");
    assert!(r.is_empty());
    assert_eq!(r.terms, vec!["bundesbank"]);
    assert_eq!(r.absent_terms, vec!["bundesbank"]);
    assert_eq!(index.num_docs(), 3);
}

#[test]
fn and_query_over_shared_documents() {
    let analyzer = case_folded();
    let docs = vec![
        Document::new(10, "car jaguar sales"),
        Document::new(11, "jaguar habitat"),
        Document::new(12, "Jaguar car recall"),
        Document::new(13, "car sales"),
    ];
    let index = build_traditional(&analyzer, docs).unwrap();
    let q = QueryEvaluator::new(&index, &analyzer);
    assert_eq!(q.and(&["car", "jaguar"]).doc_ids, vec![10, 12]);
    assert_eq!(q.and(&["car", "jaguar", "sales"]).doc_ids, vec![10]);
    assert_eq!(q.and(&["jaguar"]).doc_ids, vec![10, 11, 12]);
}

#[test]
fn empty_query_is_empty() {
    let analyzer = case_folded();
    let index = build_traditional(&analyzer, corpus()).unwrap();
    let none: [&str; 0] = [];
    assert!(QueryEvaluator::new(&index, &analyzer).and(&none).is_empty());
}

#[test]
fn compatibility_forms_match_when_folding_is_on() {
    let analyzer = Analyzer::new(Tokenizer::new(&TokenizerConfig { nfkc: true }), Pipeline::compressed());
    let docs = vec![Document::new(1, "\u{FB01}nance news"), Document::new(2, "finance desk")];
    let index = build_spimi(&analyzer, BlockBudget::docs(1), docs).unwrap();
    let q = QueryEvaluator::new(&index, &analyzer);
    assert_eq!(q.term("\u{FB01}nance").doc_ids, vec![1, 2]);
    assert_eq!(q.term("finance").doc_ids, vec![1, 2]);
    assert_eq!(q.and(&["\u{FB01}nance", "news"]).doc_ids, vec![1]);
}

#[test]
fn punctuation_around_query_words_is_ignored() {
    let analyzer = case_folded();
    let index = build_traditional(&analyzer, corpus()).unwrap();
    let q = QueryEvaluator::new(&index, &analyzer);
    let r = q.term("copper,");
    assert_eq!(r.doc_ids, vec![1, 2]);
    assert!(r.absent_terms.is_empty());
    assert_eq!(q.and(&["(copper)", "prices."]).doc_ids, vec![1]);
    assert_eq!(q.term("?!").absent_terms, vec!["?!"]);
}

const VOCAB: &[&str] = &["a", "b", "c", "d", "e"];

fn doc_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(VOCAB), 0..5).prop_map(|w| w.join(" "))
}

proptest! {
    #[test]
    fn prop_and_is_intersection(texts in prop::collection::vec(doc_strategy(), 0..15),
                                t1 in prop::sample::select(VOCAB),
                                t2 in prop::sample::select(VOCAB),
                                t3 in prop::sample::select(VOCAB)) {
        let analyzer = Analyzer::default();
        let docs: Vec<Document> = texts.iter().enumerate().map(|(i, t)| Document::new(i as u32, t.clone())).collect();
        let index = build_traditional(&analyzer, docs).unwrap();
        let q = QueryEvaluator::new(&index, &analyzer);

        let r1 = q.term(t1).doc_ids;
        let r2 = q.term(t2).doc_ids;
        let r3 = q.term(t3).doc_ids;
        let and12 = q.and(&[t1, t2]).doc_ids;
        prop_assert_eq!(&and12, &intersect(&r1, &r2));
        prop_assert_eq!(&and12, &q.and(&[t2, t1]).doc_ids);

        let left = intersect(&and12, &r3);
        let right = intersect(&r1, &q.and(&[t2, t3]).doc_ids);
        prop_assert_eq!(&left, &right);
        prop_assert_eq!(&left, &q.and(&[t1, t2, t3]).doc_ids);
    }
}
