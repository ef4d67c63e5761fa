//! Tests for evaluation configuration.

use super::*;

#[test]
fn test_toml_parsing() {
    let toml = r#"
        [optimization]
        tree_ensembles = true
        backend = "jit"
        min_tree_count = 4
        precompile = true
        verify_optimized = true
    "#;

    let config = EvaluationConfig::from_toml_str(toml).unwrap();
    assert_eq!(config.optimization.backend, ForestBackend::Jit);
    assert_eq!(config.optimization.min_tree_count, 4);
    assert!(config.optimization.precompile);
    assert!(config.optimization.verify_optimized);
}

#[test]
fn test_yaml_parsing() {
    let yaml = r#"
        optimization:
          backend: table
          min_tree_count: 2
    "#;

    let config = EvaluationConfig::from_yaml_str(yaml).unwrap();
    assert_eq!(config.optimization.backend, ForestBackend::Table);
    assert_eq!(config.optimization.min_tree_count, 2);
    assert!(config.optimization.tree_ensembles);
}

#[test]
fn test_empty_document_uses_defaults() {
    let config = EvaluationConfig::from_toml_str("").unwrap();
    assert_eq!(config, EvaluationConfig::default());
    assert!(config.optimization.tree_ensembles);
    assert_eq!(config.optimization.backend, ForestBackend::Table);
    assert_eq!(config.optimization.min_tree_count, 1);
    assert!(!config.optimization.precompile);
}

#[test]
fn test_builder() {
    let config = EvaluationConfig::new().with_optimization(
        OptimizationConfig::default()
            .with_backend(ForestBackend::Jit)
            .with_min_tree_count(8)
            .with_precompile(true)
            .with_verify_optimized(true),
    );
    assert!(config.validate().is_ok());
    assert_eq!(config.optimization.min_tree_count, 8);
}

#[test]
fn test_validation() {
    let zero = r#"
        [optimization]
        min_tree_count = 0
    "#;
    assert!(matches!(
        EvaluationConfig::from_toml_str(zero),
        Err(ConfigError::Invalid(_))
    ));

    let verify_without_optimization =
        OptimizationConfig::disabled().with_verify_optimized(true);
    assert!(verify_without_optimization.validate().is_err());
    assert!(OptimizationConfig::disabled().validate().is_ok());
}

#[test]
fn test_unknown_backend_is_rejected() {
    let toml = r#"
        [optimization]
        backend = "gpu"
    "#;
    assert!(matches!(
        EvaluationConfig::from_toml_str(toml),
        Err(ConfigError::Toml(_))
    ));
}

#[test]
fn test_missing_file() {
    assert!(matches!(
        EvaluationConfig::load("/nonexistent/evaluation.toml"),
        Err(ConfigError::Io(_))
    ));
}
