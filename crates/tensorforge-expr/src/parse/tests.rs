//! Tests for the expression parser and printer.

use tensorforge_core::{Aggregator, Label, TensorAddress};

use super::*;

fn p(text: &str) -> Expr {
    parse(text).unwrap_or_else(|e| panic!("{text}: {e}"))
}

fn round_trip(text: &str) {
    let expr = p(text);
    let printed = expr.to_string();
    assert_eq!(p(&printed), expr, "{text} printed as {printed}");
}

#[test]
fn test_mnist_layer_prints_back_verbatim() {
    let text = "join(reduce(join(rename(Placeholder, (d0, d1), (d0, d2)), \
                constant(mnist_softmax_Variable), f(a,b)(a * b)), sum, d2), \
                constant(mnist_softmax_Variable_1), f(a,b)(a + b))";
    let expr = p(text);
    assert_eq!(expr.to_string(), text);

    match &expr {
        Expr::Join { left, right, .. } => {
            assert!(matches!(**left, Expr::Reduce { aggregator: Aggregator::Sum, .. }));
            assert_eq!(**right, Expr::constant("mnist_softmax_Variable_1"));
        }
        other => panic!("expected a join, got {other:?}"),
    }
}

#[test]
fn test_precedence_and_associativity() {
    let a = || Expr::argument("a");
    let b = || Expr::argument("b");
    let c = || Expr::argument("c");

    assert_eq!(p("a + b * c"), a() + b() * c());
    assert_eq!(p("a - b - c"), (a() - b()) - c());
    assert_eq!(p("a - (b - c)"), a() - (b() - c()));
    assert_eq!(
        p("a ^ b ^ c"),
        Expr::binary(BinaryOp::Pow, a(), Expr::binary(BinaryOp::Pow, b(), c()))
    );
    assert_eq!(
        p("a < b && b < c || !a"),
        Expr::binary(
            BinaryOp::Or,
            Expr::binary(BinaryOp::And, Expr::lt(a(), b()), Expr::lt(b(), c())),
            !a()
        )
    );

    assert_eq!(p("(a - b) - c").to_string(), "a - b - c");
    assert_eq!(p("a - (b - c)").to_string(), "a - (b - c)");
    assert_eq!(p("(a + b) * c").to_string(), "(a + b) * c");
    assert_eq!(p("(a ^ b) ^ c").to_string(), "(a ^ b) ^ c");
}

#[test]
fn test_negative_literals_fold() {
    assert_eq!(p("-1.5"), Expr::Number(-1.5));
    assert_eq!(p("-x"), -Expr::argument("x"));
    assert_eq!(p("a - -2"), Expr::argument("a") - Expr::Number(-2.0));
    assert_eq!(p("-inf"), Expr::Number(f64::NEG_INFINITY));

    let negated = -Expr::Number(2.0);
    assert_eq!(negated.to_string(), "-(2.0)");
    assert_eq!(p(&negated.to_string()), negated);
}

#[test]
fn test_builtin_functions() {
    assert_eq!(
        p("max(a, 1)"),
        Expr::binary(BinaryOp::Max, Expr::argument("a"), Expr::Number(1.0))
    );
    assert_eq!(p("pow(a, 2)").to_string(), "a ^ 2.0");
    assert_eq!(p("fmod(a, 2)").to_string(), "a % 2.0");
    assert_eq!(
        p("sigmoid(x)"),
        Expr::unary(UnaryFunction::Sigmoid, Expr::argument("x"))
    );
}

#[test]
fn test_references() {
    assert_eq!(p("constant(w)"), Expr::constant("w"));
    assert_eq!(p("constant(\"w 2\")"), Expr::constant("w 2"));
    assert_eq!(p("rankingExpression(hidden)"), Expr::reference("hidden"));
    assert_eq!(p("query(age)"), Expr::argument("query(age)"));
    assert_eq!(
        p("layer(x, 2)"),
        Expr::invoke("layer", vec![Expr::argument("x"), Expr::Number(2.0)])
    );
    assert_eq!(p("serving_default.y"), Expr::argument("serving_default.y"));

    assert_eq!(Expr::reference("hidden").to_string(), "rankingExpression(hidden)");
    assert_eq!(Expr::constant("w 2").to_string(), "constant(\"w 2\")");
}

#[test]
fn test_set_membership() {
    assert_eq!(
        p("x in [1, -2.5]"),
        Expr::is_in(Expr::argument("x"), vec![1.0, -2.5])
    );
    assert_eq!(p("x in [1, -2.5]").to_string(), "x in [1.0, -2.5]");
}

#[test]
fn test_tensor_create_forms() {
    let general = p("tensor(x{},y[2]):{{x:a,y:1}:z + 1,{y:0,x:\"b c\"}:2}");
    match &general {
        Expr::Create { tensor_type, cells } => {
            assert_eq!(tensor_type.to_string(), "tensor(x{},y[2])");
            assert_eq!(cells.len(), 2);
            assert_eq!(cells[1].0, TensorAddress::from([Label::mapped("b c"), Label::Indexed(0)]));
        }
        other => panic!("expected a tensor, got {other:?}"),
    }
    round_trip("tensor(x{},y[2]):{{x:a,y:1}:z + 1,{y:0,x:\"b c\"}:2}");

    let short = p("tensor(key{}):{a:1, b:x}");
    match &short {
        Expr::Create { cells, .. } => {
            assert_eq!(cells[0].0, TensorAddress::from(["a"]));
            assert_eq!(cells[1].1, Expr::argument("x"));
        }
        other => panic!("expected a tensor, got {other:?}"),
    }

    let dense = p("tensor<double>(x[2],y[2]):[[1,2],[3,x]]");
    match &dense {
        Expr::Create { cells, .. } => {
            assert_eq!(cells.len(), 4);
            assert_eq!(cells[3], (TensorAddress::from([1usize, 1]), Expr::argument("x")));
        }
        other => panic!("expected a tensor, got {other:?}"),
    }
    round_trip("tensor(x[2],y[2]):[[1,2],[3,x]]");
    round_trip("tensor():{{}:5}");
}

#[test]
fn test_lambdas() {
    let expr = p("map(x, f(v)(if (v >= 0, v, 1.6732632 * (exp(v) - 1))))");
    match &expr {
        Expr::Map { lambda, .. } => {
            assert_eq!(lambda.arity(), 1);
            assert!((lambda.apply1(-1.0) - 1.6732632 * ((-1.0f64).exp() - 1.0)).abs() < 1e-12);
            assert_eq!(lambda.apply1(2.0), 2.0);
        }
        other => panic!("expected a map, got {other:?}"),
    }
    round_trip("map(x, f(v)(if (v >= 0, v, 1.6732632 * (exp(v) - 1))))");
    round_trip("join(x, y, f(a,b)(max(a, b) - a ^ 2))");
}

#[test]
fn test_round_trips() {
    for text in [
        "reduce(x, avg)",
        "reduce(x, count, d0, d1)",
        "rename(x, d0, d1)",
        "concat(a, b, d0)",
        "if (x < 3, rankingExpression(tree_1), 0.5) + if (x in [1, 2], 1, 2)",
        "!(a && b) || -(a + b) ^ 2 > 1",
        "-a ^ 2",
        "a / (b * c) % 3",
        "abs(x) + 1e-7",
        "(a < b) == (b < c)",
    ] {
        round_trip(text);
    }
}

#[test]
fn test_parse_errors() {
    let err = parse("a +").unwrap_err();
    assert_eq!(err.position, 3);

    for text in [
        "(a",
        "a b",
        "join(a, b, f(x)(x))",
        "map(a, f(x)(y))",
        "map(a, f(x, x)(x))",
        "reduce(a, median)",
        "exp(a, b)",
        "max(a)",
        "x in []",
        "tensor(x[2]):[1]",
        "tensor(x[2]):{{x:2}:1}",
        "tensor(x{}):{{x:a}:1,{x:a}:2}",
        "tensor(x{},y{}):{a:1}",
        "tensor<float>(x[2]):[1,2]",
        "\"unterminated",
        "a # b",
    ] {
        assert!(parse(text).is_err(), "{text} should be rejected");
    }
}

#[test]
fn test_operator_chains_print_in_one_pass() {
    for text in [
        "a + b - c * d + e",
        "a * b / c % d",
        "(a + b) * c - d",
        "a - (b - c) + d",
        "a || b && c || d",
        "a + b < c - d",
    ] {
        assert_eq!(p(text).to_string(), text);
    }

    let expr = p("x + y - 2.0 + z");
    let (first, links) = expr.binary_chain();
    assert_eq!(first, &Expr::argument("x"));
    let ops: Vec<BinaryOp> = links.iter().map(|(op, _)| *op).collect();
    assert_eq!(ops, [BinaryOp::Add, BinaryOp::Sub, BinaryOp::Add]);
    assert_eq!(links[2].1, &Expr::argument("z"));
}

#[test]
fn test_long_sums_link_and_drop() {
    let text = (0..20_000)
        .map(|k| if k % 2 == 0 { format!("g{}", k % 7) } else { "x".to_string() })
        .collect::<Vec<_>>()
        .join(" + ");
    let mut expr = p(&text);
    expr.link_functions(&|name: &str| name.starts_with('g'));
    assert_eq!(expr.invoked_functions(), ["g0", "g2", "g4", "g6", "g1", "g3", "g5"]);

    let mut arguments = 0;
    expr.visit(&mut |e| {
        if matches!(e, Expr::Argument(_)) {
            arguments += 1;
        }
    });
    assert_eq!(arguments, 10_000);
    drop(expr);
}
