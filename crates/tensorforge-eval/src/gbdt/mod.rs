//! Recognition and fast evaluation of gradient-boosted tree ensembles.
//!
//! A function qualifies when its expression is a left-to-right sum of
//! condition trees: nested `if`s whose conditions compare a scalar argument
//! with a number, or test it for set membership, with numeric leaves.

mod compact;


use std::collections::HashMap;
use std::sync::Arc;

use tensorforge_config::{ForestBackend, OptimizationConfig};
use tensorforge_core::Tensor;
use tensorforge_expr::{BinaryOp, Expr};
use tracing::warn;

pub use self::compact::CompactForest;
pub(crate) use self::compact::{Node, Test};

use self::compact::CompactForestBuilder;
use crate::function::Function;
use crate::jit::NativeForest;

/// The optimized form of a tree-ensemble function.
#[derive(Debug)]
pub struct OptimizedForest {
    features: Vec<String>,
    table: CompactForest,
    native: Option<NativeForest>,
}

impl OptimizedForest {
    /// Compiles `function` if it is a sum of at least
    /// `config.min_tree_count` condition trees.
    pub(crate) fn build(function: &Function, config: &OptimizationConfig) -> Option<Self> {
        let mut trees = Vec::new();
        collect_terms(function.expression(), &mut trees)?;
        if trees.len() < config.min_tree_count || !trees.iter().any(|t| matches!(t, Expr::If { .. })) {
            return None;
        }

        let scalar = |name: &str| {
            function
                .argument(name)
                .is_some_and(|a| a.tensor_type().is_scalar())
        };
        let mut features: Vec<String> = Vec::new();
        for tree in &trees {
            collect_features(tree, &mut features)?;
        }
        if !features.iter().all(|f| scalar(f)) {
            return None;
        }

        let mut builder = CompactForestBuilder::new(features.len());
        for tree in &trees {
            builder.begin_tree()?;
            add_node(&mut builder, tree, &features)?;
        }
        let table = builder.finish();

        let native = match config.backend {
            ForestBackend::Table => None,
            ForestBackend::Jit => match NativeForest::compile(&table) {
                Ok(native) => Some(native),
                Err(e) => {
                    warn!(
                        event = "native_compile_failed",
                        function = %function.name(),
                        error = %e,
                    );
                    None
                }
            },
        };

        Some(Self {
            features,
            table,
            native,
        })
    }

    /// Argument names, in feature-vector order.
    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn table(&self) -> &CompactForest {
        &self.table
    }

    pub fn is_native(&self) -> bool {
        self.native.is_some()
    }

    /// Sums the trees for a feature vector holding one value per
    /// [`feature`](Self::features).
    ///
    /// # Panics
    ///
    /// Panics if `features` is shorter than [`features`](Self::features).
    pub fn evaluate(&self, features: &[f64]) -> f64 {
        match self.native.as_ref().map(|native| native.evaluate(features)) {
            Some(Ok(sum)) => sum,
            _ => self.table.evaluate(features),
        }
    }

    /// The feature vector for a set of bindings; `None` if a feature is
    /// unbound or not a scalar.
    pub(crate) fn features_from(&self, bindings: &HashMap<String, Arc<Tensor>>) -> Option<Vec<f64>> {
        self.features
            .iter()
            .map(|name| bindings.get(name)?.as_double().ok())
            .collect()
    }
}

impl std::fmt::Display for OptimizedForest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.table, f)
    }
}

/// Splits the left spine of an addition chain into its terms, in
/// summation order.
fn collect_terms<'e>(expr: &'e Expr, terms: &mut Vec<&'e Expr>) -> Option<()> {
    let (first, links) = expr.binary_chain();
    if !is_tree(first) {
        return None;
    }
    terms.push(first);
    for (op, term) in links {
        if op != BinaryOp::Add || !is_tree(term) {
            return None;
        }
        terms.push(term);
    }
    Some(())
}

fn is_tree(expr: &Expr) -> bool {
    match expr {
        Expr::Number(_) => true,
        Expr::If {
            condition,
            then_expr,
            else_expr,
        } => split_condition(condition).is_some() && is_tree(then_expr) && is_tree(else_expr),
        _ => false,
    }
}

enum Condition<'e> {
    Compare {
        feature: &'e str,
        op: BinaryOp,
        value: f64,
        swapped: bool,
    },
    Member {
        feature: &'e str,
        set: &'e [f64],
    },
}

impl Condition<'_> {
    fn feature(&self) -> &str {
        match self {
            Condition::Compare { feature, .. } | Condition::Member { feature, .. } => *feature,
        }
    }
}

fn split_condition(expr: &Expr) -> Option<Condition<'_>> {
    match expr {
        Expr::Binary { op, left, right } if op.is_comparison() => match (&**left, &**right) {
            (Expr::Argument(feature), Expr::Number(value)) => Some(Condition::Compare {
                feature,
                op: *op,
                value: *value,
                swapped: false,
            }),
            (Expr::Number(value), Expr::Argument(feature)) => Some(Condition::Compare {
                feature,
                op: *op,
                value: *value,
                swapped: true,
            }),
            _ => None,
        },
        Expr::In { value, set } => match &**value {
            Expr::Argument(feature) => Some(Condition::Member { feature, set }),
            _ => None,
        },
        _ => None,
    }
}

fn collect_features(tree: &Expr, features: &mut Vec<String>) -> Option<()> {
    if let Expr::If {
        condition,
        then_expr,
        else_expr,
    } = tree
    {
        let feature = split_condition(condition)?.feature().to_string();
        if !features.contains(&feature) {
            features.push(feature);
        }
        collect_features(then_expr, features)?;
        collect_features(else_expr, features)?;
    }
    Some(())
}

fn add_node(builder: &mut CompactForestBuilder, tree: &Expr, features: &[String]) -> Option<u32> {
    match tree {
        Expr::Number(value) => builder.leaf(*value),
        Expr::If {
            condition,
            then_expr,
            else_expr,
        } => {
            let condition = split_condition(condition)?;
            let feature = features.iter().position(|f| f == condition.feature())?;
            let test = match condition {
                Condition::Compare {
                    op, value, swapped, ..
                } => Test::Compare { op, value, swapped },
                Condition::Member { set, .. } => builder.member(set)?,
            };
            let branch = builder.branch(feature, test)?;
            let then_node = add_node(builder, then_expr, features)?;
            let else_node = add_node(builder, else_expr, features)?;
            builder.link(branch, then_node, else_node);
            Some(branch)
        }
        _ => None,
    }
}
