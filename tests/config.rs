//! Configuration Contract Tests
//!
//! The config document is the only source of path derivation: acquisition
//! materializes into `dataset_dir()` and every other stage consumes what it
//! was handed, so the derivation is pinned down here against the documented
//! end-to-end scenario.

use std::io::Write;
use std::path::PathBuf;

use redactor::config::PipelineConfig;
use redactor::domain::DatasetSnapshot;

const SCENARIO_YAML: &str = r#"
data:
  roboflow_api_key: secret
  workspace: w
  project: p
  version: 1
  format: yolov8

training:
  model: yolov8n.pt
  epochs: 1
  imgsz: 640
  batch: 8
  name: run1

paths:
  data_dir: /data
  output_model: /out/model.pt
"#;

#[test]
fn test_end_to_end_path_scenario() {
    let config = PipelineConfig::from_yaml(SCENARIO_YAML).unwrap();

    // Acquisition materializes to /data/p-1/
    assert_eq!(config.dataset_dir(), PathBuf::from("/data/p-1"));
    // Training reads /data/p-1/data.yaml
    assert_eq!(
        config.dataset_manifest(),
        PathBuf::from("/data/p-1/data.yaml")
    );
    // and writes /out/model.pt
    assert_eq!(config.paths.output_model, PathBuf::from("/out/model.pt"));
}

#[test]
fn test_snapshot_agrees_with_config_derivation() {
    let config = PipelineConfig::from_yaml(SCENARIO_YAML).unwrap();

    // A snapshot rooted where acquisition materializes points its manifest at
    // exactly the path the config derives
    let snapshot = DatasetSnapshot::new(
        &config.data.workspace,
        &config.data.project,
        config.data.version,
        config.dataset_dir(),
    );
    assert_eq!(snapshot.manifest, config.dataset_manifest());
}

#[test]
fn test_config_loads_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    let mut file = std::fs::File::create(&path).unwrap();
    write!(file, "{}", SCENARIO_YAML).unwrap();

    let config = PipelineConfig::from_file(&path).unwrap();
    assert_eq!(config.data.project, "p");
    assert_eq!(config.training.name, "run1");
}

#[test]
fn test_missing_file_is_fatal() {
    let result = PipelineConfig::from_file(std::path::Path::new("/nonexistent/config.yaml"));
    assert!(result.is_err());
}

#[test]
fn test_missing_key_is_fatal() {
    let yaml = SCENARIO_YAML.replace("  output_model: /out/model.pt\n", "");
    assert!(PipelineConfig::from_yaml(&yaml).is_err());
}

#[test]
fn test_version_is_part_of_the_dataset_identity() {
    let yaml = SCENARIO_YAML.replace("version: 1", "version: 7");
    let config = PipelineConfig::from_yaml(&yaml).unwrap();
    assert_eq!(config.dataset_dir(), PathBuf::from("/data/p-7"));
}
