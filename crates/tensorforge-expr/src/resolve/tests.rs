//! Tests for type resolution.

use super::*;

fn ty(spec: &str) -> TensorType {
    TensorType::from_spec(spec).unwrap()
}

fn e(text: &str) -> Expr {
    Expr::parse(text).unwrap()
}

#[test]
fn test_resolve_linear_layer() {
    let input = ty("tensor(d0[],d1[784])");
    let weights = ty("tensor(d2[784],d3[10])");
    let bias = ty("tensor(d3[10])");
    let body = e("join(reduce(join(rename(x, (d0, d1), (d0, d2)), constant(w), \
                  f(a,b)(a * b)), sum, d2), constant(b), f(a,b)(a + b))");

    let mut resolver = TypeResolver::new();
    resolver
        .constant("w", &weights)
        .constant("b", &bias)
        .function(Declaration::new("layer", &body).with_argument("x", &input));

    assert_eq!(resolver.resolve("layer").unwrap(), ty("tensor(d0[],d3[10])"));
}

#[test]
fn test_if_generalizes_branches() {
    let x = ty("tensor(d0[3])");
    let y = ty("tensor(d0[5])");
    let body = e("if (1 < 2, x, y)");

    let mut resolver = TypeResolver::new();
    resolver.function(
        Declaration::new("choose", &body)
            .with_argument("x", &x)
            .with_argument("y", &y),
    );
    assert_eq!(resolver.resolve("choose").unwrap(), ty("tensor(d0[])"));
}

#[test]
fn test_if_requires_scalar_condition() {
    let x = ty("tensor(d0[3])");
    let body = e("if (x, 1, 2)");

    let mut resolver = TypeResolver::new();
    resolver.function(Declaration::new("bad", &body).with_argument("x", &x));
    assert!(matches!(
        resolver.resolve("bad"),
        Err(ResolveError::Type {
            source: TensorError::NotScalar(_),
            ..
        })
    ));
}

#[test]
fn test_unbound_references() {
    let body = e("x + constant(missing)");
    let x = TensorType::scalar();

    let mut resolver = TypeResolver::new();
    resolver.function(Declaration::new("main", &body).with_argument("x", &x));
    assert_eq!(
        resolver.resolve("main").unwrap_err(),
        ResolveError::UnboundReference {
            kind: ReferenceKind::Constant,
            name: "missing".into(),
            function: "main".into(),
        }
    );

    let body = e("y * 2");
    let mut resolver = TypeResolver::new();
    resolver.function(Declaration::new("main", &body));
    assert!(matches!(
        resolver.resolve("main"),
        Err(ResolveError::UnboundReference {
            kind: ReferenceKind::Argument,
            ..
        })
    ));

    let body = e("rankingExpression(nowhere)");
    let mut resolver = TypeResolver::new();
    resolver.function(Declaration::new("main", &body));
    assert_eq!(
        resolver.resolve("main").unwrap_err(),
        ResolveError::UnboundReference {
            kind: ReferenceKind::Function,
            name: "nowhere".into(),
            function: "main".into(),
        }
    );
}

#[test]
fn test_cycle_is_reported_with_path() {
    let a = e("rankingExpression(b) + 1");
    let b = e("rankingExpression(c) * 2");
    let c = e("rankingExpression(a)");

    let mut resolver = TypeResolver::new();
    resolver
        .function(Declaration::new("a", &a))
        .function(Declaration::new("b", &b))
        .function(Declaration::new("c", &c));

    assert_eq!(
        resolver.resolve("a").unwrap_err(),
        ResolveError::CyclicDefinition {
            chain: vec!["a".into(), "b".into(), "c".into(), "a".into()],
        }
    );
}

#[test]
fn test_shared_function_resolves_once() {
    let x = ty("tensor(d0[4])");
    let shared = e("map(x, f(a)(a * 2))");
    let main = e("rankingExpression(shared) + rankingExpression(shared)");

    let mut resolver = TypeResolver::new();
    resolver
        .function(Declaration::new("shared", &shared).with_argument("x", &x))
        .function(Declaration::new("main", &main).with_argument("x", &x));

    let types = resolver.resolve_all().unwrap();
    assert_eq!(types["main"], x);
    assert_eq!(types["shared"], x);
}

#[test]
fn test_bare_reference_needs_compatible_caller_arguments() {
    let narrow = ty("tensor(d0[4])");
    let wide = ty("tensor(d0[])");
    let callee = e("reduce(x, sum)");
    let caller = e("rankingExpression(callee)");

    // A bound dimension is assignable to an unbound one.
    let mut resolver = TypeResolver::new();
    resolver
        .function(Declaration::new("callee", &callee).with_argument("x", &wide))
        .function(Declaration::new("caller", &caller).with_argument("x", &narrow));
    assert!(resolver.resolve("caller").unwrap().is_scalar());

    let other = ty("tensor(d0[5])");
    let mut resolver = TypeResolver::new();
    resolver
        .function(Declaration::new("callee", &callee).with_argument("x", &narrow))
        .function(Declaration::new("caller", &caller).with_argument("x", &other));
    assert!(matches!(
        resolver.resolve("caller"),
        Err(ResolveError::InvalidInvocation { .. })
    ));

    let mut resolver = TypeResolver::new();
    resolver
        .function(Declaration::new("callee", &callee).with_argument("x", &narrow))
        .function(Declaration::new("caller", &caller));
    assert!(matches!(
        resolver.resolve("caller"),
        Err(ResolveError::InvalidInvocation { .. })
    ));
}

#[test]
fn test_explicit_invocation_binds_positionally() {
    let v = ty("tensor(d0[3])");
    let s = TensorType::scalar();
    let scale = e("v * s");

    let good = e("scale(y, 2)");
    let mut resolver = TypeResolver::new();
    resolver
        .function(
            Declaration::new("scale", &scale)
                .with_argument("v", &v)
                .with_argument("s", &s),
        )
        .function(Declaration::new("main", &good).with_argument("y", &v));
    assert_eq!(resolver.resolve("main").unwrap(), v);

    let wrong_arity = e("scale(y)");
    let mut resolver = TypeResolver::new();
    resolver
        .function(
            Declaration::new("scale", &scale)
                .with_argument("v", &v)
                .with_argument("s", &s),
        )
        .function(Declaration::new("main", &wrong_arity).with_argument("y", &v));
    assert!(matches!(
        resolver.resolve("main"),
        Err(ResolveError::InvalidInvocation { .. })
    ));

    let wrong_type = e("scale(y, y)");
    let mut resolver = TypeResolver::new();
    resolver
        .function(
            Declaration::new("scale", &scale)
                .with_argument("v", &v)
                .with_argument("s", &s),
        )
        .function(Declaration::new("main", &wrong_type).with_argument("y", &v));
    assert!(matches!(
        resolver.resolve("main"),
        Err(ResolveError::InvalidInvocation { .. })
    ));
}

#[test]
fn test_lambda_arity_is_checked() {
    let x = ty("tensor(d0[3])");
    let body = Expr::map(Expr::argument("x"), Lambda::binary(crate::ops::BinaryOp::Add));

    let mut resolver = TypeResolver::new();
    resolver.function(Declaration::new("main", &body).with_argument("x", &x));
    assert!(matches!(
        resolver.resolve("main"),
        Err(ResolveError::InvalidLambda { .. })
    ));
}

#[test]
fn test_join_type_error_names_function() {
    let a = ty("tensor(d0[3])");
    let b = ty("tensor(d0{})");
    let body = e("a + b");

    let mut resolver = TypeResolver::new();
    resolver.function(
        Declaration::new("mix", &body)
            .with_argument("a", &a)
            .with_argument("b", &b),
    );
    match resolver.resolve("mix") {
        Err(ResolveError::Type { function, .. }) => assert_eq!(function, "mix"),
        other => panic!("expected a type error, got {other:?}"),
    }
}
