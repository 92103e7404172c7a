//! End-to-end runs of the `oligoboost` binary.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn run(train: &Path, test: &Path, output: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_oligoboost"))
        .arg("--train_file")
        .arg(train)
        .arg("--test_file")
        .arg(test)
        .arg("--output_file")
        .arg(output)
        .arg("--quiet")
        .output()
        .expect("binary should launch")
}

fn read_predictions(path: &Path) -> Vec<(String, f64)> {
    let mut rdr = csv::Reader::from_path(path).unwrap();
    let header: Vec<&str> = rdr.headers().unwrap().iter().collect();
    assert_eq!(header, vec!["ID", "Label"]);
    rdr.records()
        .map(|r| {
            let r = r.unwrap();
            (r[0].to_string(), r[1].parse().unwrap())
        })
        .collect()
}

#[test]
fn two_row_training_set_predicts_one_probability() {
    let dir = TempDir::new().unwrap();
    let train = dir.path().join("train.csv");
    let test = dir.path().join("test.csv");
    let output = dir.path().join("out").join("submission.csv");
    fs::write(&train, "ID,Sequence,Label\n1,ACGU,1\n2,AACC,0\n").unwrap();
    fs::write(&test, "ID,Sequence\n3,ACGU\n").unwrap();

    let result = run(&train, &test, &output);
    assert!(
        result.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&result.stderr)
    );

    let rows = read_predictions(&output);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].0, "3");
    assert!((0.0..=1.0).contains(&rows[0].1));

    let summary: serde_json::Value = serde_json::from_slice(&result.stdout).unwrap();
    assert_eq!(summary["n_train"], 2);
    assert_eq!(summary["n_test"], 1);
    assert_eq!(summary["max_length"], 4);
    assert_eq!(summary["n_features"], 17);
    // One sample per class is too few for stratified folds.
    assert!(summary["cv_folds"].is_null());
    assert_eq!(summary["best_params"]["n_estimators"], 25);
}

#[test]
fn separable_training_set_runs_grid_search() {
    let dir = TempDir::new().unwrap();
    let train = dir.path().join("train.csv");
    let test = dir.path().join("test.csv");
    let output = dir.path().join("submission.csv");

    let mut train_csv = String::from("ID,Sequence,Label\n");
    for i in 0..10 {
        train_csv.push_str(&format!("p{i},GGGGCC{}A,1\n", "G".repeat(i % 3)));
        train_csv.push_str(&format!("n{i},UUUUAA{}C,0\n", "U".repeat(i % 3)));
    }
    fs::write(&train, train_csv).unwrap();
    fs::write(&test, "ID,Sequence\nq1,GGGGCCA\nq2,UUUUAAC\nq3,GGGGCCA\n").unwrap();

    let result = run(&train, &test, &output);
    assert!(
        result.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&result.stderr)
    );

    let rows = read_predictions(&output);
    let ids: Vec<&str> = rows.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["q1", "q2", "q3"]);
    assert!(rows[0].1 > rows[1].1, "rows: {rows:?}");
    assert_eq!(rows[0].1, rows[2].1);

    let summary: serde_json::Value = serde_json::from_slice(&result.stdout).unwrap();
    assert_eq!(summary["cv_folds"], 5);
    assert_eq!(summary["max_length"], 9);
    assert_eq!(summary["n_features"], 37);
    let best_auc = summary["best_cv_auc"].as_f64().unwrap();
    assert!(best_auc > 0.9, "best_cv_auc = {best_auc}");
}

#[test]
fn missing_training_file_fails() {
    let dir = TempDir::new().unwrap();
    let test = dir.path().join("test.csv");
    let output = dir.path().join("submission.csv");
    fs::write(&test, "ID,Sequence\n3,ACGU\n").unwrap();

    let result = run(&dir.path().join("absent.csv"), &test, &output);
    assert!(!result.status.success());
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("failed to read training CSV"), "stderr: {stderr}");
    assert!(!output.exists());
}

#[test]
fn invalid_label_fails_before_writing() {
    let dir = TempDir::new().unwrap();
    let train = dir.path().join("train.csv");
    let test = dir.path().join("test.csv");
    let output = dir.path().join("submission.csv");
    fs::write(&train, "ID,Sequence,Label\n1,ACGU,yes\n2,AACC,0\n").unwrap();
    fs::write(&test, "ID,Sequence\n3,ACGU\n").unwrap();

    let result = run(&train, &test, &output);
    assert!(!result.status.success());
    assert!(!output.exists());
}
