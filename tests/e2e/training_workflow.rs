//! E2E Scenario: recording outcomes until the model takes over, then
//! export, reset and import.

use super::common::{TestRoot, sample_args};

fn add_samples(root: &TestRoot, count: u32) {
    for i in 0..count {
        let args = sample_args(i % 2 == 0, i);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let data = root.robot(&args);
        assert_eq!(data["durability"]["status"], "persisted");
    }
}

#[test]
fn test_model_takes_over_after_threshold() {
    let root = TestRoot::new();

    root.log_step("Record nine outcomes, one short of the threshold");
    add_samples(&root, 9);
    let stats = root.robot(&["train", "stats"]);
    assert_eq!(stats["training_samples"], 9);
    assert_eq!(stats["state"], "untrained");

    root.log_step("Explicit fit below the threshold fails");
    let output = root
        .cmd()
        .args(["--robot", "train", "fit"])
        .output()
        .unwrap();
    assert!(!output.status.success());

    root.log_step("Cross the threshold");
    add_samples(&root, 3);
    let stats = root.robot(&["train", "stats"]);
    assert_eq!(stats["training_samples"], 12);
    assert_eq!(stats["state"], "trained");
    assert!(stats["model_accuracy"].is_number());

    root.log_step("Predictions now come from the model");
    let data = root.robot(&[
        "predict",
        "--role-level",
        "senior",
        "--technical-score",
        "0.86",
        "--communication-score",
        "0.85",
        "--cultural-fit",
        "0.9",
        "--experience",
        "8",
    ]);
    let prediction = &data["prediction"];
    assert_eq!(prediction["source"], "model");
    let p = prediction["probability"].as_f64().unwrap();
    let low = prediction["confidence_interval"][0].as_f64().unwrap();
    let high = prediction["confidence_interval"][1].as_f64().unwrap();
    assert!(low <= p && p <= high);
    assert!(!prediction["similar_cases"].as_array().unwrap().is_empty());
}

#[test]
fn test_export_reset_import_round_trip() {
    let root = TestRoot::new();
    add_samples(&root, 12);

    root.log_step("Export");
    let export = root.file("export.json");
    let data = root.robot(&["train", "export", export.to_str().unwrap()]);
    assert_eq!(data["exported"], 12);

    root.log_step("Reset");
    root.robot(&["train", "reset"]);
    let stats = root.robot(&["train", "stats"]);
    assert_eq!(stats["training_samples"], 0);
    assert_eq!(stats["state"], "untrained");

    root.log_step("Import");
    let data = root.robot(&["train", "import", export.to_str().unwrap()]);
    assert_eq!(data["imported"], 12);
    assert_eq!(data["total"], 12);
    assert_eq!(data["state"], "trained");
}

#[test]
fn test_fit_reports_training_split() {
    let root = TestRoot::new();
    add_samples(&root, 10);
    let report = root.robot(&["train", "fit"]);
    assert_eq!(report["samples"], 10);
    assert_eq!(report["test_size"], 2);
    assert_eq!(report["train_size"], 8);
}
