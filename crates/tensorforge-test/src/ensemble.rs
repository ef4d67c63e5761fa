//! Gradient-boosted tree ensemble fixtures.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tensorforge_config::OptimizationConfig;
use tensorforge_core::{Tensor, TensorType};
use tensorforge_eval::{FunctionDef, Model};
use tensorforge_expr::{BinaryOp, Expr};

/// Name of the two-tree, depth-two ensemble model and of its function.
pub const XGBOOST: &str = "xgboost_2_2";

/// Features of [`xgboost_model`], sorted.
pub const XGBOOST_FEATURES: [&str; 4] = ["f109", "f29", "f56", "f60"];

/// Value of [`xgboost_model`] with every feature at its default of 0.
pub const XGBOOST_SUM: f64 = -8.17695;

/// Expression text of [`xgboost_model`].
pub const XGBOOST_EXPRESSION: &str = "\
if (f29 < -0.1234567, if (f56 < -0.242398, 1.71218, -1.70044), if (f109 < 0.8723473, -1.94071, 1.85965)) + \
if (f60 < -0.482947, if (f29 < -4.2387498, 0.784718, -0.96853), -6.23624)";

/// A two-tree ensemble whose features all default to 0.
pub fn xgboost_model(optimization: OptimizationConfig) -> Model {
    let function = XGBOOST_FEATURES.iter().fold(
        FunctionDef::parse(XGBOOST, XGBOOST_EXPRESSION).expect("fixture expression parses"),
        |def, feature| def.with_argument_default(*feature, TensorType::scalar(), Tensor::scalar(0.0)),
    );
    Model::builder(XGBOOST)
        .with_function(function)
        .with_optimization(optimization)
        .build()
        .expect("fixture model builds")
}

/// Features of [`random_ensemble`].
pub const FEATURES: [&str; 4] = ["f0", "f1", "f2", "f3"];

fn grid(rng: &mut ChaCha8Rng) -> f64 {
    f64::from(rng.random_range(-8i32..=8)) * 0.25
}

fn random_subtree(rng: &mut ChaCha8Rng, depth: usize) -> Expr {
    if depth == 0 || rng.random_bool(0.3) {
        Expr::number(rng.random_range(-1.0..1.0))
    } else {
        random_tree(rng, depth)
    }
}

fn random_tree(rng: &mut ChaCha8Rng, depth: usize) -> Expr {
    let feature = Expr::argument(FEATURES[rng.random_range(0..FEATURES.len())]);
    let threshold = Expr::number(grid(rng));
    let condition = match rng.random_range(0..6) {
        0 => Expr::lt(feature, threshold),
        1 => Expr::ge(feature, threshold),
        2 => Expr::binary(BinaryOp::Le, threshold, feature),
        3 => Expr::binary(BinaryOp::Eq, feature, threshold),
        4 => Expr::binary(BinaryOp::Gt, feature, threshold),
        _ => {
            let len = rng.random_range(1..4);
            Expr::is_in(feature, (0..len).map(|_| grid(rng)).collect())
        }
    };
    Expr::if_then_else(
        condition,
        random_subtree(rng, depth - 1),
        random_subtree(rng, depth - 1),
    )
}

/// A sum of `trees` random condition trees of depth at most `depth` over
/// [`FEATURES`].
pub fn random_ensemble(seed: u64, trees: usize, depth: usize) -> Expr {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let depth = depth.max(1);
    let mut sum = random_tree(&mut rng, depth);
    for _ in 1..trees {
        sum = Expr::binary(BinaryOp::Add, sum, random_tree(&mut rng, depth));
    }
    sum
}

/// `expression` as a function of the scalar [`FEATURES`].
pub fn ensemble_function(name: &str, expression: Expr) -> FunctionDef {
    FEATURES.iter().fold(FunctionDef::new(name, expression), |def, feature| {
        def.with_argument(*feature, TensorType::scalar())
    })
}

/// One value per [`FEATURES`] entry, on the threshold grid or NaN.
pub fn random_feature_values(rng: &mut ChaCha8Rng) -> [f64; 4] {
    std::array::from_fn(|_| {
        if rng.random_bool(0.05) {
            f64::NAN
        } else {
            grid(rng)
        }
    })
}
