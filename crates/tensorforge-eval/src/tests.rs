//! Tests for model building and function evaluation.

use super::*;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use approx::assert_relative_eq;
use tensorforge_config::{ForestBackend, OptimizationConfig};
use tensorforge_core::{Tensor, TensorType};
use tensorforge_expr::{Expr, Lambda, ReferenceKind, ResolveError};

fn tensor(literal: &str) -> Tensor {
    Tensor::from_literal(literal).unwrap()
}

fn tensor_type(spec: &str) -> TensorType {
    TensorType::from_spec(spec).unwrap()
}

fn dot_model() -> Model {
    Model::builder("dot")
        .with_constant("w", tensor("tensor(d0[3]):[1.0,2.0,3.0]"))
        .with_function(
            FunctionDef::parse("score", "reduce(x * constant(w), sum)")
                .unwrap()
                .with_argument("x", tensor_type("tensor(d0[3])")),
        )
        .build()
        .unwrap()
}

/// A model whose `aux` function counts how often its lambda runs.
fn counting_model(calls: &Arc<AtomicUsize>) -> Model {
    let counter = Arc::clone(calls);
    let doubling = Lambda::native("count", 1, move |args| {
        counter.fetch_add(1, Ordering::SeqCst);
        args[0] * 2.0
    });
    Model::builder("memo")
        .with_function(
            FunctionDef::new("aux", Expr::map(Expr::argument("x"), doubling))
                .with_argument("x", TensorType::scalar()),
        )
        .with_function(
            FunctionDef::parse("main", "aux + aux * 10")
                .unwrap()
                .with_argument("x", TensorType::scalar()),
        )
        .with_function(
            FunctionDef::parse("explicit", "aux(x) + aux(x)")
                .unwrap()
                .with_argument("x", TensorType::scalar()),
        )
        .build()
        .unwrap()
}

#[test]
fn test_evaluate_dot_product() {
    let model = dot_model();
    let mut evaluator = model.evaluator().unwrap();
    evaluator
        .bind("x", tensor("tensor(d0[3]):[1.0,0.5,2.0]"))
        .unwrap();
    let result = evaluator.evaluate().unwrap();
    assert!(result.tensor_type().is_scalar());
    assert_relative_eq!(result.as_double().unwrap(), 8.0);
    assert_eq!(evaluator.function().return_type(), &TensorType::scalar());
}

#[test]
fn test_bind_unknown_argument() {
    let model = dot_model();
    let mut evaluator = model.evaluator().unwrap();
    let err = evaluator.bind_double("y", 1.0).unwrap_err();
    assert_eq!(
        err,
        EvaluationError::UnknownArgument {
            function: "score".to_string(),
            argument: "y".to_string(),
        }
    );
}

#[test]
fn test_bind_type_mismatch() {
    let model = dot_model();
    let mut evaluator = model.evaluator().unwrap();

    let err = evaluator
        .bind("x", tensor("tensor(d0[2]):[1.0,2.0]"))
        .unwrap_err();
    assert!(matches!(err, EvaluationError::ArgumentTypeMismatch { ref argument, .. } if argument == "x"));

    let err = evaluator.bind_double("x", 1.0).unwrap_err();
    assert!(matches!(err, EvaluationError::ArgumentTypeMismatch { .. }));
    assert!(!evaluator.context().is_bound("x"));
}

#[test]
fn test_unbound_arguments_are_listed() {
    let model = Model::builder("m")
        .with_function(
            FunctionDef::parse("f", "a + b + c")
                .unwrap()
                .with_argument("a", TensorType::scalar())
                .with_argument("b", TensorType::scalar())
                .with_argument("c", TensorType::scalar()),
        )
        .build()
        .unwrap();
    let mut evaluator = model.evaluator().unwrap();
    evaluator.bind_double("b", 1.0).unwrap();

    let err = evaluator.evaluate().unwrap_err();
    assert_eq!(
        err,
        EvaluationError::UnboundArgument {
            function: "f".to_string(),
            arguments: vec!["a".to_string(), "c".to_string()],
        }
    );
}

#[test]
fn test_repeated_evaluate_returns_same_result() {
    let model = dot_model();
    let mut evaluator = model.evaluator().unwrap();
    evaluator
        .bind("x", tensor("tensor(d0[3]):[1.0,1.0,1.0]"))
        .unwrap();

    let first = evaluator.evaluate().unwrap();
    let second = evaluator.evaluate().unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    evaluator
        .bind("x", tensor("tensor(d0[3]):[0.0,0.0,1.0]"))
        .unwrap();
    let third = evaluator.evaluate().unwrap();
    assert!(!Arc::ptr_eq(&first, &third));
    assert_eq!(third.as_double().unwrap(), 3.0);
}

#[test]
fn test_auxiliary_function_memoized() {
    let calls = Arc::new(AtomicUsize::new(0));
    let model = counting_model(&calls);

    let mut evaluator = model.evaluator_of("main").unwrap();
    evaluator.bind_double("x", 1.5).unwrap();
    assert_eq!(evaluator.evaluate().unwrap().as_double().unwrap(), 33.0);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        evaluator.context().memoized("aux").map(|t| t.as_double().unwrap()),
        Some(3.0)
    );

    evaluator.evaluate().unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    evaluator.bind_double("x", 2.0).unwrap();
    assert!(evaluator.context().memoized("aux").is_none());
    assert_eq!(evaluator.evaluate().unwrap().as_double().unwrap(), 44.0);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_explicit_invocations_not_memoized() {
    let calls = Arc::new(AtomicUsize::new(0));
    let model = counting_model(&calls);

    let mut evaluator = model.evaluator_of("explicit").unwrap();
    evaluator.bind_double("x", 1.0).unwrap();
    assert_eq!(evaluator.evaluate().unwrap().as_double().unwrap(), 4.0);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_memo_is_per_evaluator() {
    let calls = Arc::new(AtomicUsize::new(0));
    let model = counting_model(&calls);

    for _ in 0..3 {
        let mut evaluator = model.evaluator_of("main").unwrap();
        evaluator.bind_double("x", 1.0).unwrap();
        evaluator.evaluate().unwrap();
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_default_evaluator_requires_single_function() {
    let calls = Arc::new(AtomicUsize::new(0));
    let model = counting_model(&calls);
    let err = model.evaluator().unwrap_err();
    assert_eq!(
        err,
        ModelError::AmbiguousFunction {
            model: "memo".to_string(),
            functions: vec!["aux".to_string(), "main".to_string(), "explicit".to_string()],
        }
    );

    assert_eq!(dot_model().evaluator().unwrap().function().name(), "score");
}

#[test]
fn test_evaluator_of_prefix() {
    let model = Model::builder("serving")
        .with_function(FunctionDef::parse("serving_default.y", "1.0").unwrap())
        .with_function(FunctionDef::parse("other.a", "2.0").unwrap())
        .with_function(FunctionDef::parse("other.b", "3.0").unwrap())
        .build()
        .unwrap();

    let evaluator = model.evaluator_of("serving_default").unwrap();
    assert_eq!(evaluator.function().name(), "serving_default.y");
    assert_eq!(
        model.evaluator_of("other.b").unwrap().function().name(),
        "other.b"
    );
    assert!(matches!(
        model.evaluator_of("other"),
        Err(ModelError::AmbiguousFunction { .. })
    ));
    assert_eq!(
        model.evaluator_of("serving").unwrap_err(),
        ModelError::UnknownFunction {
            model: "serving".to_string(),
            function: "serving".to_string(),
        }
    );
}

#[test]
fn test_defaults_are_bound() {
    let model = Model::builder("m")
        .with_function(
            FunctionDef::parse("f", "a * b")
                .unwrap()
                .with_argument_default("a", TensorType::scalar(), Tensor::scalar(3.0))
                .with_argument("b", TensorType::scalar()),
        )
        .build()
        .unwrap();

    let mut evaluator = model.evaluator().unwrap();
    assert_eq!(evaluator.context().names(), vec!["a"]);
    evaluator.bind_double("b", 2.0).unwrap();
    assert_eq!(evaluator.evaluate().unwrap().as_double().unwrap(), 6.0);

    evaluator.bind_double("a", 4.0).unwrap();
    assert_eq!(evaluator.evaluate().unwrap().as_double().unwrap(), 8.0);
}

#[test]
fn test_invalid_default() {
    let err = Model::builder("m")
        .with_function(
            FunctionDef::parse("f", "reduce(a, sum)")
                .unwrap()
                .with_argument_default(
                    "a",
                    tensor_type("tensor(d0[3])"),
                    tensor("tensor(d0[2]):[1.0,2.0]"),
                ),
        )
        .build()
        .unwrap_err();
    assert!(matches!(err, ModelError::InvalidDefault { ref argument, .. } if argument == "a"));
}

#[test]
fn test_duplicates_rejected() {
    let err = Model::builder("m")
        .with_function(FunctionDef::parse("f", "1").unwrap())
        .with_function(FunctionDef::parse("f", "2").unwrap())
        .build()
        .unwrap_err();
    assert_eq!(
        err,
        ModelError::DuplicateFunction {
            model: "m".to_string(),
            function: "f".to_string(),
        }
    );

    let err = Model::builder("m")
        .with_function(
            FunctionDef::parse("f", "a")
                .unwrap()
                .with_argument("a", TensorType::scalar())
                .with_argument("a", TensorType::scalar()),
        )
        .build()
        .unwrap_err();
    assert!(matches!(err, ModelError::DuplicateArgument { .. }));
}

#[test]
fn test_parse_and_resolve_errors() {
    let err = FunctionDef::parse("f", "a +").unwrap_err();
    assert!(matches!(err, ModelError::Parse { ref function, .. } if function == "f"));

    let err = Model::builder("m")
        .with_function(FunctionDef::parse("f", "a + 1").unwrap())
        .build()
        .unwrap_err();
    assert!(matches!(
        err,
        ModelError::Resolve(ResolveError::UnboundReference {
            kind: ReferenceKind::Argument,
            ..
        })
    ));
}

#[test]
fn test_cyclic_functions_fail_the_model() {
    let err = Model::builder("m")
        .with_function(FunctionDef::parse("a", "b + 1").unwrap())
        .with_function(FunctionDef::parse("b", "rankingExpression(a)").unwrap())
        .build()
        .unwrap_err();
    match err {
        ModelError::Resolve(ResolveError::CyclicDefinition { chain }) => {
            assert_eq!(chain.first(), chain.last());
            assert!(chain.iter().any(|f| f == "a"));
            assert!(chain.iter().any(|f| f == "b"));
        }
        other => panic!("expected a cycle, got {other:?}"),
    }
}

#[test]
fn test_arguments_shadow_functions() {
    let model = Model::builder("m")
        .with_function(FunctionDef::parse("x", "100").unwrap())
        .with_function(
            FunctionDef::parse("f", "x + 1")
                .unwrap()
                .with_argument("x", TensorType::scalar()),
        )
        .with_function(FunctionDef::parse("g", "x + 1").unwrap())
        .build()
        .unwrap();

    let mut f = model.evaluator_of("f").unwrap();
    f.bind_double("x", 1.0).unwrap();
    assert_eq!(f.evaluate().unwrap().as_double().unwrap(), 2.0);

    let mut g = model.evaluator_of("g").unwrap();
    assert_eq!(g.evaluate().unwrap().as_double().unwrap(), 101.0);
}

#[test]
fn test_context_lookup() {
    let model = dot_model();
    let mut evaluator = model.evaluator().unwrap();
    evaluator
        .bind("x", tensor("tensor(d0[3]):[1.0,1.0,1.0]"))
        .unwrap();

    let context = evaluator.context();
    assert_eq!(context.names(), vec!["x"]);
    assert_eq!(
        context.get("constant(w)").map(Tensor::to_literal),
        Some("tensor(d0[3]):[1.0,2.0,3.0]".to_string())
    );
    assert!(context.get("w").is_none());
    assert!(context.get("x").is_some());
    assert!(context.constant("w").is_some());
}

#[test]
fn test_verified_forest_evaluation() {
    let text = "if (x < 0.5, 1.25, if (y in [1, 2], -0.5, 2.0)) + if (x >= 3, 0.125, 0.0)";
    for backend in [ForestBackend::Table, ForestBackend::Jit] {
        let model = Model::builder("trees")
            .with_function(
                FunctionDef::parse("f", text)
                    .unwrap()
                    .with_argument("x", TensorType::scalar())
                    .with_argument_default("y", TensorType::scalar(), Tensor::scalar(2.0)),
            )
            .with_optimization(
                OptimizationConfig::default()
                    .with_backend(backend)
                    .with_precompile(true)
                    .with_verify_optimized(true),
            )
            .build()
            .unwrap();

        let mut evaluator = model.evaluator().unwrap();
        evaluator.bind_double("x", 3.0).unwrap();
        assert_eq!(evaluator.evaluate().unwrap().as_double().unwrap(), -0.375);
        evaluator.bind_double("x", 0.0).unwrap();
        assert_eq!(evaluator.evaluate().unwrap().as_double().unwrap(), 1.25);
    }
}

#[test]
fn test_forest_inside_larger_model() {
    let model = Model::builder("trees")
        .with_function(
            FunctionDef::parse("trees", "if (x < 0.5, 1.0, 2.0) + if (x < 1.5, 10.0, 20.0)")
                .unwrap()
                .with_argument("x", TensorType::scalar()),
        )
        .with_function(
            FunctionDef::parse("scaled", "trees * 2")
                .unwrap()
                .with_argument("x", TensorType::scalar()),
        )
        .build()
        .unwrap();

    let mut evaluator = model.evaluator_of("scaled").unwrap();
    evaluator.bind_double("x", 1.0).unwrap();
    assert_eq!(evaluator.evaluate().unwrap().as_double().unwrap(), 24.0);
}

#[test]
fn test_registry() {
    let registry = ModelRegistry::new([dot_model()]).unwrap();
    assert_eq!(registry.len(), 1);
    assert!(!registry.is_empty());
    assert_eq!(registry.models().count(), 1);
    assert_eq!(
        registry.evaluator_of("dot", "score").unwrap().function().name(),
        "score"
    );
    assert_eq!(
        registry.model("none").unwrap_err(),
        ModelError::UnknownModel("none".to_string())
    );

    let err = ModelRegistry::new([dot_model(), dot_model()]).unwrap_err();
    assert_eq!(err, ModelError::DuplicateModel("dot".to_string()));
}

#[test]
fn test_model_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Model>();
    assert_send_sync::<ModelRegistry>();
}
