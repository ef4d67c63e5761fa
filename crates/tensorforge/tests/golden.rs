//! End-to-end evaluation of the fixture models against known values.

use std::sync::Arc;

use approx::assert_abs_diff_eq;
use tensorforge::prelude::*;
use tensorforge::{ForestBackend, ModelError};
use tensorforge_test::ensemble::{xgboost_model, XGBOOST, XGBOOST_FEATURES, XGBOOST_SUM};
use tensorforge_test::mnist::{
    input_tensor, random_pixels, softmax_model, two_layer_model, two_layer_reference, zero_input,
    CLASSES, HIDDEN1, SOFTMAX_ZERO_SUM,
};

const DELTA: f64 = 1e-11;

#[test]
fn xgboost_with_defaults() {
    for optimization in [
        OptimizationConfig::disabled(),
        OptimizationConfig::default(),
        OptimizationConfig::default()
            .with_backend(ForestBackend::Jit)
            .with_verify_optimized(true),
    ] {
        let model = xgboost_model(optimization);
        assert_eq!(model.functions().len(), 1);

        let function = &model.functions()[0];
        assert_eq!(function.name(), XGBOOST);
        assert_eq!(function.return_type(), &TensorType::scalar());
        let arguments: Vec<&str> = function.arguments().iter().map(|a| a.name()).collect();
        assert_eq!(arguments, XGBOOST_FEATURES);

        let mut evaluator = model.evaluator().unwrap();
        assert_eq!(
            evaluator.context().names(),
            ["f109", "f29", "f56", "f60"]
        );
        let result = evaluator.evaluate().unwrap();
        assert_abs_diff_eq!(result.sum().unwrap(), XGBOOST_SUM, epsilon = DELTA);
    }
}

#[test]
fn xgboost_is_optimized() {
    let model = xgboost_model(OptimizationConfig::default().with_precompile(true));
    let function = &model.functions()[0];
    let forest = function.optimized(model.optimization()).unwrap();
    assert_eq!(forest.table().tree_count(), 2);
    assert_eq!(forest.table().node_count(), 12);
    assert_eq!(
        forest.to_string(),
        format!(
            "optimized sum of condition trees of size {} bytes",
            forest.table().size_bytes()
        )
    );
}

#[test]
fn xgboost_with_bound_features() {
    let model = xgboost_model(OptimizationConfig::default());
    let mut evaluator = model.evaluator().unwrap();
    evaluator
        .bind_double("f29", -1.0)
        .unwrap()
        .bind_double("f56", -1.0)
        .unwrap()
        .bind_double("f60", -1.0)
        .unwrap();
    let expected = 1.71218 + -0.96853;
    assert_abs_diff_eq!(
        evaluator.evaluate().unwrap().as_double().unwrap(),
        expected,
        epsilon = DELTA
    );
}

#[test]
fn softmax_with_zero_input() {
    for (name, function, lookup) in [
        ("mnist_softmax", "default.add", None),
        ("mnist_softmax_saved", "serving_default.y", Some("serving_default")),
    ] {
        let model = softmax_model(name, function);
        assert_eq!(model.functions().len(), 1);
        assert_eq!(
            model.functions()[0].return_type(),
            &TensorType::from_spec("tensor(d0[],d1[10])").unwrap()
        );

        let constant = format!("constant({}_Variable)", name);
        assert_eq!(
            model
                .evaluator_of(function)
                .unwrap()
                .context()
                .get(&constant)
                .unwrap()
                .tensor_type()
                .to_string(),
            "tensor(d1[10],d2[784])"
        );

        let mut evaluator = match lookup {
            Some(prefix) => model.evaluator_of(prefix).unwrap(),
            None => model.evaluator().unwrap(),
        };
        evaluator.bind("Placeholder", zero_input()).unwrap();
        let result = evaluator.evaluate().unwrap();
        assert_eq!(result.size(), CLASSES);
        assert_abs_diff_eq!(result.sum().unwrap(), SOFTMAX_ZERO_SUM, epsilon = DELTA);
    }
}

#[test]
fn softmax_prints_its_expression() {
    let model = softmax_model("mnist_softmax", "default.add");
    assert_eq!(
        model.functions()[0].expression().to_string(),
        "join(reduce(join(rename(Placeholder, (d0, d1), (d0, d2)), constant(mnist_softmax_Variable), f(a,b)(a * b)), sum, d2), constant(mnist_softmax_Variable_1), f(a,b)(a + b))"
    );
}

#[test]
fn two_layer_matches_reference() {
    let model = two_layer_model();
    assert_eq!(model.functions().len(), 2);
    assert!(matches!(
        model.evaluator(),
        Err(ModelError::AmbiguousFunction { .. })
    ));

    for seed in [0, 1] {
        let pixels = if seed == 0 {
            vec![0.0; 784]
        } else {
            random_pixels(seed)
        };
        let mut evaluator = model.evaluator_of("serving_default").unwrap();
        assert_eq!(evaluator.function().name(), "serving_default.y");
        evaluator.bind("input", input_tensor(&pixels)).unwrap();
        let result = evaluator.evaluate().unwrap();

        let reference = two_layer_reference(&pixels);
        assert_eq!(result.size(), reference.len());
        assert_abs_diff_eq!(
            result.sum().unwrap(),
            reference.iter().sum::<f64>(),
            epsilon = 1e-9
        );
        assert!(evaluator.context().memoized(HIDDEN1).is_some());
    }
}

#[test]
fn repeated_evaluation_is_identical() {
    let model = softmax_model("mnist_softmax", "default.add");
    let mut evaluator = model.evaluator().unwrap();
    evaluator
        .bind("Placeholder", input_tensor(&random_pixels(3)))
        .unwrap();
    let first = evaluator.evaluate().unwrap();
    let second = evaluator.evaluate().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.to_literal(), second.to_literal());
}

#[test]
fn incompatible_binding_fails_before_evaluation() {
    let model = softmax_model("mnist_softmax", "default.add");
    let mut evaluator = model.evaluator().unwrap();
    let mut wrong = Tensor::builder(TensorType::from_spec("tensor(d0[],d1[783])").unwrap());
    wrong.cell(0.0, [0, 0]);
    assert!(evaluator.bind("Placeholder", wrong.build().unwrap()).is_err());
    assert!(evaluator
        .bind("Placeholder", Tensor::scalar(0.0))
        .is_err());
    assert!(evaluator.evaluate().is_err());
}

#[test]
fn registry_of_fixture_models() {
    let registry = ModelRegistry::new([
        xgboost_model(OptimizationConfig::default()),
        softmax_model("mnist_softmax", "default.add"),
        softmax_model("mnist_softmax_saved", "serving_default.y"),
        two_layer_model(),
    ])
    .unwrap();
    assert_eq!(registry.len(), 4);

    let names: Vec<&str> = registry.models().map(|m| m.name()).collect();
    assert_eq!(
        names,
        ["mnist_saved", "mnist_softmax", "mnist_softmax_saved", "xgboost_2_2"]
    );

    let mut evaluator = registry.evaluator_of(XGBOOST, XGBOOST).unwrap();
    assert_abs_diff_eq!(
        evaluator.evaluate().unwrap().as_double().unwrap(),
        XGBOOST_SUM,
        epsilon = DELTA
    );
}
