use proptest::prelude::*;
use spimi_core::{build_traditional, Analyzer, CompressionReport, Document, Pipeline, Stage, StopwordSet};
use std::sync::Arc;

#[test]
fn stopwords_then_stemming_collapse_run_forms() {
    let stopwords = Stage::Stopwords(Arc::new(StopwordSet::from_words("stopwords", ["the", "a"])));
    let report = CompressionReport::measure_vocabulary(["the", "a", "run", "running", "runs"], &[stopwords, Stage::Stem]);
    let terms: Vec<usize> = report.rows.iter().map(|r| r.terms).collect();
    assert_eq!(terms, vec![5, 3, 1]);
    assert_eq!(report.final_terms(), 1);
    assert!((report.rows[1].terms_delta_pct + 40.0).abs() < 1e-9);
    assert!((report.rows[2].terms_cumulative_pct + 80.0).abs() < 1e-9);
}

#[test]
fn full_pipeline_table_has_a_row_per_stage() {
    let docs = vec![
        Document::new(1, "The Copper prices rise 3 pct"),
        Document::new(2, "COPPER falls as the prices fall"),
        Document::new(3, "Pineapple imports rising in 1987"),
    ];
    let index = build_traditional(&Analyzer::default(), docs).unwrap();
    let pipeline = Pipeline::compressed();
    let report = CompressionReport::measure(&index, pipeline.stages());
    let names: Vec<&str> = report.rows.iter().map(|r| r.stage.as_str()).collect();
    assert_eq!(names, vec!["uncompressed", "case_fold", "strip_numerals", "stopwords_small", "stopwords_large", "stem"]);
    assert_eq!(report.rows[0].terms, index.num_terms());
    assert_eq!(report.rows[0].postings, index.num_postings());
    assert_eq!(report.rows[0].terms_delta_pct, 0.0);
}

#[test]
fn measuring_leaves_index_untouched() {
    let index = build_traditional(&Analyzer::default(), vec![Document::new(1, "The THE the")]).unwrap();
    let before = index.clone();
    let _ = CompressionReport::measure(&index, Pipeline::compressed().stages());
    assert_eq!(index, before);
}

proptest! {
    #[test]
    fn prop_every_stage_shrinks_or_keeps(texts in prop::collection::vec("[A-Za-z0-9 ]{0,40}", 0..10)) {
        let docs: Vec<Document> = texts.iter().enumerate().map(|(i, t)| Document::new(i as u32, t.clone())).collect();
        let index = build_traditional(&Analyzer::default(), docs).unwrap();
        let report = CompressionReport::measure(&index, Pipeline::compressed().stages());
        for pair in report.rows.windows(2) {
            prop_assert!(pair[1].terms <= pair[0].terms);
            prop_assert!(pair[1].postings <= pair[0].postings);
        }
    }
}
