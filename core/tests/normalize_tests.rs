use std::str::FromStr;
use std::sync::Arc;
use trivia_core::{Lemmatizer, NormalizationMode, Normalizer};

#[test]
fn it_case_folds_and_splits_on_non_alphanumerics() {
    let n = Normalizer::new(NormalizationMode::Raw).unwrap();
    assert_eq!(
        n.normalize("This COUNTRY's flag (1969): red, white & blue"),
        vec!["this", "country", "s", "flag", "1969", "red", "white", "blue"]
    );
}

#[test]
fn it_folds_unicode_forms() {
    let n = Normalizer::new(NormalizationMode::Raw).unwrap();
    // NFKC: café -> cafe after compatibility folding of the ligature forms
    let terms = n.normalize("Caf\u{00e9} ﬁnest");
    assert!(terms.contains(&"café".to_string()) || terms.contains(&"cafe".to_string()));
    assert!(terms.contains(&"finest".to_string()));
}

#[test]
fn stopword_mode_drops_the_fixed_set() {
    let n = Normalizer::new(NormalizationMode::Stopwords).unwrap();
    let terms = n.normalize("The capital of France is Paris");
    assert_eq!(terms, vec!["capital", "france", "paris"]);
}

#[test]
fn stem_mode_keeps_stopwords_but_stems() {
    let n = Normalizer::new(NormalizationMode::Stem).unwrap();
    let terms = n.normalize("the running dogs");
    assert!(terms.contains(&"the".to_string()));
    assert!(terms.contains(&"run".to_string()));
    assert!(terms.contains(&"dog".to_string()));
}

#[test]
fn stopwords_stem_removes_then_stems() {
    let n = Normalizer::new(NormalizationMode::StopwordsStem).unwrap();
    assert_eq!(n.normalize("the running dogs"), vec!["run", "dog"]);
}

struct FixedLemmas;

impl Lemmatizer for FixedLemmas {
    fn lemma(&self, token: &str) -> String {
        match token {
            "better" => "good".to_string(),
            "geese" => "goose".to_string(),
            other => other.to_string(),
        }
    }
}

#[test]
fn lemmatize_mode_delegates_to_the_provider() {
    let n = Normalizer::with_lemmatizer(Arc::new(FixedLemmas));
    assert_eq!(n.mode(), NormalizationMode::Lemmatize);
    assert_eq!(n.normalize("Better geese fly"), vec!["good", "goose", "fly"]);
}

#[test]
fn empty_and_symbol_only_input_yield_empty_sequences() {
    let n = Normalizer::new(NormalizationMode::Raw).unwrap();
    assert!(n.normalize("").is_empty());
    assert!(n.normalize("!!! --- ???").is_empty());
}

#[test]
fn mode_names_round_trip_and_map_to_distinct_dirs() {
    let modes = [
        NormalizationMode::Raw,
        NormalizationMode::Stopwords,
        NormalizationMode::Stem,
        NormalizationMode::Lemmatize,
        NormalizationMode::StopwordsStem,
    ];
    let mut dirs = std::collections::HashSet::new();
    for mode in modes {
        assert_eq!(NormalizationMode::from_str(mode.as_str()).unwrap(), mode);
        assert!(dirs.insert(mode.dir_name()));
    }
}
