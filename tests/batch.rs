pub mod setup;

use std::fs;
use std::path::Path;

use crate::setup::{create_test_pdf_with_config, PdfConfig};
use pdf_outline::batch::{run_batch, FileOutcome};
use pdf_outline::classify::model::{DecisionTree, ForestModel, LabelEncoder, RandomForest, TreeNode};
use pdf_outline::classify::ModelStore;
use pdf_outline::config::OutlineConfig;
use pdf_outline::features::FEATURE_KEYS;
use pdf_outline::{DocumentResult, OutlineError, OutlineExtractor, Role};

/// One-leaf forest that calls everything body text.
fn write_model(dir: &Path) {
    let encoder = LabelEncoder::from_roles(&Role::ALL);
    let body = encoder.encode(Role::BodyText).unwrap();
    let forest = RandomForest {
        n_classes: encoder.classes.len(),
        trees: vec![DecisionTree {
            nodes: vec![TreeNode::Leaf { class: body }],
        }],
    };
    let model = ForestModel::new(forest, encoder, FEATURE_KEYS.to_vec()).unwrap();
    ModelStore::new(dir).save(&model).unwrap();
}

#[test]
fn test_batch_writes_one_json_per_pdf() {
    let root = tempfile::tempdir().unwrap();
    let input = root.path().join("input");
    let output = root.path().join("output");
    let models = root.path().join("models");
    fs::create_dir(&input).unwrap();
    write_model(&models);

    create_test_pdf_with_config(&PdfConfig::default(), &input.join("report.pdf")).unwrap();
    fs::write(input.join("broken.pdf"), b"not a pdf at all").unwrap();
    fs::write(input.join("notes.txt"), b"ignored").unwrap();

    let extractor = OutlineExtractor::from_model_dir(&models, OutlineConfig::default()).unwrap();
    let summary = run_batch(&extractor, &input, &output).unwrap();

    assert_eq!(summary.reports.len(), 2);
    assert_eq!(summary.processed(), 1);
    assert_eq!(summary.failed(), 1);
    // Sorted by file name.
    assert!(summary.reports[0].input.ends_with("broken.pdf"));
    assert!(matches!(summary.reports[0].outcome, FileOutcome::Failed { .. }));
    assert_eq!(
        summary.reports[1].outcome,
        FileOutcome::Processed { outline_items: 4 }
    );

    let report: DocumentResult =
        serde_json::from_str(&fs::read_to_string(output.join("report.json")).unwrap()).unwrap();
    assert_eq!(report.title, "Annual Report: Regional Library Board");
    assert_eq!(report.metadata.input_file.as_deref(), Some("report.pdf"));
    assert_eq!(report.metadata.output_file.as_deref(), Some("report.json"));
    assert!(report.metadata.processing_time_seconds.is_some());

    let error: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(output.join("broken.json")).unwrap()).unwrap();
    assert_eq!(error["input_file"], "broken.pdf");
    assert!(error["error"].as_str().unwrap().contains("Failed to extract text"));
    assert!(error["processing_time_seconds"].is_number());

    assert!(!output.join("notes.json").exists());
}

#[test]
fn test_batch_with_no_pdfs_is_a_no_op() {
    let root = tempfile::tempdir().unwrap();
    let models = root.path().join("models");
    write_model(&models);
    let extractor = OutlineExtractor::from_model_dir(&models, OutlineConfig::default()).unwrap();

    let summary = run_batch(&extractor, root.path(), &root.path().join("out")).unwrap();
    assert!(summary.reports.is_empty());
}

#[test]
fn test_batch_missing_input_dir() {
    let root = tempfile::tempdir().unwrap();
    let models = root.path().join("models");
    write_model(&models);
    let extractor = OutlineExtractor::from_model_dir(&models, OutlineConfig::default()).unwrap();

    let result = run_batch(&extractor, &root.path().join("missing"), &root.path().join("out"));
    assert!(result.is_err());
}

#[test]
fn test_missing_model_dir() {
    let root = tempfile::tempdir().unwrap();
    let result =
        OutlineExtractor::from_model_dir(root.path().join("models"), OutlineConfig::default());
    assert!(matches!(result, Err(OutlineError::MissingModel(_))));
}
