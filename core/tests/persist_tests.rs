use std::fs;
use tempfile::tempdir;
use trivia_core::persist::{load_index, load_meta, save_index, IndexPaths};
use trivia_core::search::search;
use trivia_core::{IndexBuilder, InvertedIndex, NormalizationMode, Normalizer, RawDocument};

fn build_index(mode: NormalizationMode) -> InvertedIndex {
    IndexBuilder::build_from(
        Normalizer::new(mode).unwrap(),
        vec![
            RawDocument {
                title: "Animals".into(),
                categories: "nature biology".into(),
                body: "cat dog cat".into(),
            },
            RawDocument {
                title: "Pets".into(),
                categories: "household".into(),
                body: "cat bird".into(),
            },
            RawDocument {
                title: "Empty".into(),
                categories: String::new(),
                body: String::new(),
            },
        ],
    )
}

#[test]
fn round_trip_preserves_postings_statistics_and_scores() {
    let dir = tempdir().unwrap();
    let paths = IndexPaths::new(dir.path());
    let original = build_index(NormalizationMode::Raw);
    save_index(&paths, &original, "2024-01-01T00:00:00Z").unwrap();

    let reloaded = load_index(&paths, NormalizationMode::Raw).unwrap();
    assert_eq!(reloaded, original);

    let n = Normalizer::new(NormalizationMode::Raw).unwrap();
    for query in ["cat", "cat bird", "dog nature"] {
        assert_eq!(
            search(&original, &n, query, 2, 2000.0),
            search(&reloaded, &n, query, 2, 2000.0)
        );
    }
}

#[test]
fn meta_records_mode_and_statistics() {
    let dir = tempdir().unwrap();
    let paths = IndexPaths::new(dir.path());
    let index = build_index(NormalizationMode::Stem);
    save_index(&paths, &index, "2024-01-01T00:00:00Z").unwrap();

    let meta = load_meta(&paths).unwrap();
    assert_eq!(meta.mode, NormalizationMode::Stem);
    assert_eq!(meta.num_docs, 3);
    assert_eq!(meta.total_terms, index.total_terms());
}

#[test]
fn mode_mismatch_refuses_to_load() {
    let dir = tempdir().unwrap();
    let paths = IndexPaths::new(dir.path());
    save_index(&paths, &build_index(NormalizationMode::Raw), "2024-01-01T00:00:00Z").unwrap();
    assert!(load_index(&paths, NormalizationMode::Stem).is_err());
}

#[test]
fn corrupt_postings_are_fatal_at_load() {
    let dir = tempdir().unwrap();
    let paths = IndexPaths::new(dir.path());
    save_index(&paths, &build_index(NormalizationMode::Raw), "2024-01-01T00:00:00Z").unwrap();
    fs::write(dir.path().join("postings.bin"), b"not an index").unwrap();
    assert!(load_index(&paths, NormalizationMode::Raw).is_err());
}

#[test]
fn inconsistent_statistics_are_fatal_at_load() {
    let dir = tempdir().unwrap();
    let paths = IndexPaths::new(dir.path());
    save_index(&paths, &build_index(NormalizationMode::Raw), "2024-01-01T00:00:00Z").unwrap();

    let meta_path = dir.path().join("meta.json");
    let tampered = fs::read_to_string(&meta_path)
        .unwrap()
        .replace("\"total_terms\": 11", "\"total_terms\": 99");
    fs::write(&meta_path, tampered).unwrap();
    assert!(load_index(&paths, NormalizationMode::Raw).is_err());
}

#[test]
fn for_mode_places_each_mode_in_its_own_directory() {
    let dir = tempdir().unwrap();
    let raw = IndexPaths::for_mode(dir.path(), NormalizationMode::Raw);
    let stem = IndexPaths::for_mode(dir.path(), NormalizationMode::Stem);
    assert_ne!(raw.root, stem.root);

    save_index(&raw, &build_index(NormalizationMode::Raw), "2024-01-01T00:00:00Z").unwrap();
    save_index(&stem, &build_index(NormalizationMode::Stem), "2024-01-01T00:00:00Z").unwrap();
    assert!(load_index(&raw, NormalizationMode::Raw).is_ok());
    assert!(load_index(&stem, NormalizationMode::Stem).is_ok());
}
