use proptest::prelude::*;
use spimi_core::config::TokenizerConfig;
use spimi_core::{Analyzer, Pipeline, Stage, Tokenizer};

fn compressed() -> Analyzer {
    Analyzer::new(Tokenizer::default(), Pipeline::compressed())
}

#[test]
fn it_normalizes_and_stems() {
    let words: Vec<String> = compressed().terms("Running Runners RUN! The menu.").collect();
    // Stemming to "run" should appear
    assert!(words.contains(&"run".to_string()));
    assert!(!words.iter().any(|w| w.chars().any(char::is_uppercase)));
}

#[test]
fn it_filters_stopwords() {
    let words: Vec<String> = compressed().terms("The quick brown fox and the lazy dog").collect();
    assert!(!words.contains(&"the".to_string()));
    assert!(!words.contains(&"and".to_string()));
    assert!(words.contains(&"fox".to_string()));
}

#[test]
fn it_strips_pure_numerals_only() {
    let words: Vec<String> = compressed().terms("1987 sales rose 12 pct in Q3").collect();
    assert!(!words.contains(&"1987".to_string()));
    assert!(!words.contains(&"12".to_string()));
    assert!(words.contains(&"q3".to_string()));
}

#[test]
fn uncompressed_keeps_case() {
    let words: Vec<String> = Analyzer::default().terms("Copper COPPER copper").collect();
    assert_eq!(words, vec!["Copper", "COPPER", "copper"]);
}

#[test]
fn nfkc_folds_compatibility_forms() {
    let tok = Tokenizer::new(&TokenizerConfig { nfkc: true });
    // U+FB01 LATIN SMALL LIGATURE FI
    let words: Vec<String> = tok.tokens("\u{FB01}nance").collect();
    assert_eq!(words, vec!["finance"]);
    let raw: Vec<String> = Tokenizer::default().tokens("\u{FB01}nance").collect();
    assert_eq!(raw, vec!["\u{FB01}nance"]);
}

#[test]
fn stages_are_deterministic() {
    let pipeline = Pipeline::compressed();
    for word in ["Running", "prices", "Bundesbank", "the", "42"] {
        assert_eq!(pipeline.normalize(word.to_string()), pipeline.normalize(word.to_string()));
    }
}

#[test]
fn stemming_is_idempotent() {
    for word in ["running", "runs", "connection", "cats", "prices", "imports", "copper", "agreed", "generously"] {
        let once = Stage::Stem.apply(word.to_string()).unwrap();
        let twice = Stage::Stem.apply(once.clone()).unwrap();
        assert_eq!(once, twice, "{word}");
    }
}

#[test]
fn case_folding_is_idempotent() {
    for word in ["Copper", "COPPER", "Ünïcode", "mIxEd42"] {
        let once = Stage::CaseFold.apply(word.to_string()).unwrap();
        assert_eq!(Stage::CaseFold.apply(once.clone()).unwrap(), once);
    }
}

#[test]
fn pipeline_is_idempotent_on_stemmed_stopwords() {
    let pipeline = Pipeline::compressed();
    for word in ["haves", "wills", "mays", "doings", "musts", "hows", "agreed", "Having"] {
        if let Some(once) = pipeline.normalize(word.to_string()) {
            assert_eq!(pipeline.normalize(once.clone()), Some(once), "{word}");
        }
    }
}

fn word_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::string::string_regex("[a-z]{1,12}").unwrap(),
        prop::string::string_regex("[A-Z][a-z]{0,10}(s|ing|ed|ly)").unwrap(),
        prop::string::string_regex("[0-9]{1,4}[a-z]{0,2}").unwrap(),
        prop::string::string_regex("(have|will|may|do|must|how|the|agree|run)(s|ing|ed|er)?").unwrap(),
    ]
}

proptest! {
    #[test]
    fn prop_normalized_terms_are_fixed_points(word in word_strategy()) {
        for pipeline in [Pipeline::compressed(), Pipeline::new(vec![Stage::Stem, Stage::CaseFold])] {
            if let Some(once) = pipeline.normalize(word.clone()) {
                prop_assert_eq!(pipeline.normalize(once.clone()), Some(once));
            }
        }
    }

    #[test]
    fn prop_analyzed_terms_reanalyze_to_themselves(text in prop::collection::vec(word_strategy(), 0..8)) {
        let analyzer = compressed();
        let text = text.join(" ");
        for term in analyzer.terms(&text) {
            prop_assert_eq!(analyzer.query_terms(&term), vec![term.clone()]);
        }
    }
}
