//! Integration tests: fixture CSV -> SequenceTable -> prediction CSV -> read back.

use std::path::{Path, PathBuf};

use oligoboost_io::{IoError, Label, PredictionWriter, SequenceReader};
use tempfile::TempDir;

/// Path to the test fixture directory.
fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn train_fixture_loads_with_labels() {
    let table = SequenceReader::new(&fixture_path("train.csv"))
        .read_labeled()
        .expect("fixture should parse");

    assert_eq!(table.len(), 6);
    assert_eq!(table.labels(), Some(vec![1, 0, 1, 0, 1, 0]));
    assert_eq!(table.records()[4].sequence, "ACGUNNACGU");
    assert_eq!(table.records()[0].label, Some(Label::Positive));
}

#[test]
fn test_fixture_is_not_labeled() {
    let err = SequenceReader::new(&fixture_path("test.csv"))
        .read_labeled()
        .unwrap_err();
    assert!(matches!(err, IoError::MissingColumn { column: "Label", .. }));

    let table = SequenceReader::new(&fixture_path("test.csv"))
        .read_unlabeled()
        .unwrap();
    assert_eq!(table.len(), 3);
}

#[test]
fn predictions_follow_test_order() {
    let table = SequenceReader::new(&fixture_path("test.csv"))
        .read_unlabeled()
        .unwrap();
    let probabilities = [0.9, 0.1, 0.5];

    let dir = TempDir::new().unwrap();
    let out = dir.path().join("submission.csv");
    PredictionWriter::new(&out)
        .write(&table.ids(), &probabilities)
        .unwrap();

    let mut rdr = csv::Reader::from_path(&out).unwrap();
    let header: Vec<&str> = rdr.headers().unwrap().iter().collect();
    assert_eq!(header, vec!["ID", "Label"]);

    let rows: Vec<(String, f64)> = rdr
        .records()
        .map(|r| {
            let r = r.unwrap();
            (r[0].to_string(), r[1].parse().unwrap())
        })
        .collect();
    let ids: Vec<&str> = rows.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["101", "102", "103"]);
    for ((_, p), expected) in rows.iter().zip(probabilities) {
        assert_eq!(*p, expected);
    }
}
