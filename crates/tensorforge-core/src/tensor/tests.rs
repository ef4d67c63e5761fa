//! Tests for tensor values and operators.

use approx::assert_relative_eq;
use proptest::prelude::*;

use super::*;

fn tensor(literal: &str) -> Tensor {
    Tensor::from_literal(literal).unwrap()
}

fn ty(spec: &str) -> TensorType {
    TensorType::from_spec(spec).unwrap()
}

fn values(t: &Tensor) -> Vec<f64> {
    t.cells().map(|(_, v)| v).collect()
}

#[test]
fn test_dense_join_nests_distinct_dimensions() {
    let x = tensor("tensor(x[3]):[1.0,2.0,3.0]");
    let y = tensor("tensor(y[2]):[10.0,20.0]");
    let product = x.join(&y, |a, b| a * b).unwrap();
    assert_eq!(product.tensor_type(), &ty("tensor(x[3],y[2])"));
    assert_eq!(values(&product), vec![10.0, 20.0, 20.0, 40.0, 30.0, 60.0]);
    assert_eq!(product.get(&TensorAddress::from([2, 1])), 60.0);
}

#[test]
fn test_dense_join_shared_dimension_in_lock_step() {
    let a = tensor("tensor(x[3]):[1.0,2.0,3.0]");
    let b = tensor("tensor(x[3]):[4.0,5.0,6.0]");
    assert_eq!(values(&a.join(&b, |a, b| a + b).unwrap()), vec![5.0, 7.0, 9.0]);
}

#[test]
fn test_matrix_vector_product() {
    let input = tensor("tensor(d0[1],d1[3]):[[1.0,2.0,3.0]]");
    let weights = tensor("tensor(d1[3],d2[2]):[[1.0,2.0],[3.0,4.0],[5.0,6.0]]");
    let result = input
        .join(&weights, |a, b| a * b)
        .unwrap()
        .reduce(Aggregator::Sum, &["d1"])
        .unwrap();
    assert_eq!(result.tensor_type(), &ty("tensor(d0[1],d2[2])"));
    assert_eq!(values(&result), vec![22.0, 28.0]);
}

#[test]
fn test_join_smaller_extent_unbinds_dimension() {
    let a = tensor("tensor(x[]):[1.0,2.0]");
    let b = tensor("tensor(x[3]):[1.0,1.0,1.0]");
    let sum = a.join(&b, |a, b| a + b).unwrap();
    assert_eq!(sum.tensor_type(), &ty("tensor(x[])"));
    assert_eq!(sum.extent("x"), Some(2));
    assert_eq!(values(&sum), vec![2.0, 3.0]);
}

#[test]
fn test_sparse_join_matches_shared_labels() {
    let a = tensor("tensor(x{}):{a:1.0,b:2.0}");
    let b = tensor("tensor(x{},y{}):{{x:a,y:p}:10.0,{x:c,y:q}:5.0}");
    let joined = a.join(&b, |a, b| a * b).unwrap();
    assert_eq!(joined.size(), 1);
    assert_eq!(joined.get(&TensorAddress::from(["a", "p"])), 10.0);
    assert_eq!(joined.cell(&TensorAddress::from(["c", "q"])), None);
}

#[test]
fn test_mixed_join_with_scalar() {
    let t = tensor("tensor(x{},y[2]):{a:[1.0,2.0],b:[3.0,4.0]}");
    let doubled = t.join(&Tensor::scalar(2.0), |a, b| a * b).unwrap();
    assert_eq!(doubled.to_literal(), "tensor(x{},y[2]):{a:[2.0,4.0],b:[6.0,8.0]}");
}

#[test]
fn test_join_type_mismatch() {
    let a = tensor("tensor(x[2]):[1.0,2.0]");
    let b = tensor("tensor(x[3]):[1.0,2.0,3.0]");
    assert!(matches!(
        a.join(&b, |a, b| a + b),
        Err(TensorError::TypeMismatch { operation: "join", .. })
    ));
}

#[test]
fn test_reduce_aggregators() {
    let t = tensor("tensor(x[2],y[3]):[[1.0,2.0,3.0],[4.0,5.0,6.0]]");
    assert_eq!(values(&t.reduce(Aggregator::Sum, &["y"]).unwrap()), vec![6.0, 15.0]);
    assert_eq!(values(&t.reduce(Aggregator::Max, &["x"]).unwrap()), vec![4.0, 5.0, 6.0]);
    assert_eq!(values(&t.reduce(Aggregator::Prod, &["x"]).unwrap()), vec![4.0, 10.0, 18.0]);
    assert_relative_eq!(t.avg().unwrap(), 3.5);
    assert_eq!(t.count().unwrap(), 6.0);
    assert_eq!(t.min().unwrap(), 1.0);
    assert_eq!(t.max().unwrap(), 6.0);

    let all = t.reduce::<&str>(Aggregator::Sum, &[]).unwrap();
    assert!(all.tensor_type().is_scalar());
    assert_eq!(all.as_double().unwrap(), 21.0);
}

#[test]
fn test_reduce_sparse_groups() {
    let t = tensor("tensor(x{},y{}):{{x:a,y:p}:1.0,{x:a,y:q}:2.0,{x:b,y:p}:3.0}");
    let reduced = t.reduce(Aggregator::Sum, &["y"]).unwrap();
    assert_eq!(reduced.to_literal(), "tensor(x{}):{a:3.0,b:3.0}");
}

#[test]
fn test_reduce_empty_cells() {
    let empty = tensor("tensor(x{}):{}");
    assert_eq!(empty.sum().unwrap(), 0.0);
    assert_eq!(empty.prod().unwrap(), 1.0);
    assert_eq!(empty.count().unwrap(), 0.0);
    assert_eq!(
        empty.max(),
        Err(TensorError::EmptyAggregation {
            aggregator: Aggregator::Max
        })
    );
    assert!(empty.avg().is_err());
}

#[test]
fn test_reduce_unknown_dimension() {
    let t = tensor("tensor(x[2]):[1.0,2.0]");
    assert!(matches!(
        t.reduce(Aggregator::Sum, &["z"]),
        Err(TensorError::TypeMismatch { operation: "reduce", .. })
    ));
}

#[test]
fn test_reduce_sum_of_constant_cells() {
    let mut builder = Tensor::builder(ty("tensor(k{})"));
    for i in 0..7 {
        builder.cell(1.5, [format!("k{i}").as_str()]);
    }
    assert_eq!(builder.build().unwrap().sum().unwrap(), 7.0 * 1.5);
}

#[test]
fn test_rename() {
    let t = tensor("tensor(d0[1],d1[3]):[[1.0,2.0,3.0]]");
    let renamed = t.rename(&["d1"], &["d2"]).unwrap();
    assert_eq!(renamed.tensor_type(), &ty("tensor(d0[1],d2[3])"));
    assert_eq!(values(&renamed), values(&t));

    let m = tensor("tensor(x[2],y[3]):[[1.0,2.0,3.0],[4.0,5.0,6.0]]");
    let transposed = m.rename(&["x", "y"], &["y", "x"]).unwrap();
    assert_eq!(transposed.tensor_type(), &ty("tensor(x[3],y[2])"));
    assert_eq!(transposed.get(&TensorAddress::from([2, 0])), 3.0);
    assert_eq!(transposed.get(&TensorAddress::from([0, 1])), 4.0);
}

#[test]
fn test_rename_keeps_extents_of_empty_dense_tensor() {
    let empty = Tensor::from_parts(
        ty("tensor(a[],b[])"),
        Storage::Dense(DenseBlock {
            sizes: vec![0, 3],
            values: Vec::new(),
        }),
    );
    let renamed = empty.rename(&["a"], &["c"]).unwrap();
    assert_eq!(renamed.tensor_type(), &ty("tensor(b[],c[])"));
    assert_eq!(renamed.size(), 0);
    match renamed.storage() {
        Storage::Dense(block) => assert_eq!(block.sizes, [3, 0]),
        other => panic!("expected dense storage, got {other:?}"),
    }
}

#[test]
fn test_map() {
    let t = tensor("tensor(x[2]):[1.0,-2.0]");
    assert_eq!(values(&t.map(f64::abs)), vec![1.0, 2.0]);
    let sparse = tensor("tensor(x{}):{a:2.0}");
    assert_eq!(sparse.map(|v| v * v).to_literal(), "tensor(x{}):{a:4.0}");
}

#[test]
fn test_concat() {
    let a = tensor("tensor(x[2]):[1.0,2.0]");
    let b = tensor("tensor(x[3]):[3.0,4.0,5.0]");
    let ab = a.concat(&b, "x").unwrap();
    assert_eq!(ab.tensor_type(), &ty("tensor(x[5])"));
    assert_eq!(values(&ab), vec![1.0, 2.0, 3.0, 4.0, 5.0]);

    let appended = a.concat(&Tensor::scalar(3.0), "x").unwrap();
    assert_eq!(appended.to_literal(), "tensor(x[3]):[1.0,2.0,3.0]");

    let left = tensor("tensor(x[2],y[1]):[[1.0],[2.0]]");
    let right = tensor("tensor(x[2],y[2]):[[3.0,4.0],[5.0,6.0]]");
    assert_eq!(
        left.concat(&right, "y").unwrap().to_literal(),
        "tensor(x[2],y[3]):[[1.0,3.0,4.0],[2.0,5.0,6.0]]"
    );
}

#[test]
fn test_concat_mapped_dimension_fails() {
    let a = tensor("tensor(x{}):{a:1.0}");
    assert!(a.concat(&a, "x").is_err());
}

#[test]
fn test_literal_forms() {
    for literal in [
        "tensor():3.5",
        "tensor(x[2],y[3]):[[1.0,2.0,3.0],[4.0,5.0,6.0]]",
        "tensor(x{}):{a:1.0,b:2.0}",
        "tensor(x{},y[2]):{a:[1.0,2.0]}",
        "tensor(x{},y{}):{{x:a,y:b}:1.0}",
        "tensor(x{}):{\"a b\":-8.17695}",
    ] {
        assert_eq!(tensor(literal).to_literal(), literal);
    }
}

#[test]
fn test_literal_lenient_input() {
    let t = tensor(" tensor<double>( y[2] , x{} ) : { a : [ 1 , 2 ] } ");
    assert_eq!(t.to_literal(), "tensor(x{},y[2]):{a:[1.0,2.0]}");

    let general = tensor("tensor(x{},y[2]):{{y:1,x:a}:5.0}");
    assert_eq!(general.to_literal(), "tensor(x{},y[2]):{a:[0.0,5.0]}");

    let unbound = tensor("tensor(x[]):[1.0,2.0,3.0]");
    assert_eq!(unbound.extent("x"), Some(3));
}

#[test]
fn test_literal_errors() {
    assert!(matches!(
        Tensor::from_literal("tensor(x[2]):[[1.0],[2.0]"),
        Err(TensorError::Parse { .. })
    ));
    assert!(matches!(
        Tensor::from_literal("tensor(x[2],y[2]):[[1.0,2.0],[3.0]]"),
        Err(TensorError::Parse { .. })
    ));
    assert!(matches!(
        Tensor::from_literal("tensor(x[3]):[1.0,2.0]"),
        Err(TensorError::InvalidAddress { .. })
    ));
    assert!(matches!(
        Tensor::from_literal("tensor(x{}):{a:1.0,a:2.0}"),
        Err(TensorError::DuplicateAddress { .. })
    ));
    assert!(matches!(
        Tensor::from_literal("tensor(x{},y{}):{a:1.0}"),
        Err(TensorError::Parse { .. })
    ));
    assert!(matches!(
        Tensor::from_literal("tensor(x{}):{a:one}"),
        Err(TensorError::Parse { .. })
    ));
}

#[test]
fn test_builder_validation() {
    let tensor_type = ty("tensor(x{},y[2])");

    let mut wrong_arity = Tensor::builder(tensor_type.clone());
    wrong_arity.cell(1.0, ["a"]);
    assert!(matches!(wrong_arity.build(), Err(TensorError::InvalidAddress { .. })));

    let mut wrong_kind = Tensor::builder(tensor_type.clone());
    wrong_kind.cell(1.0, [Label::Indexed(0), Label::Indexed(0)]);
    assert!(matches!(wrong_kind.build(), Err(TensorError::InvalidAddress { .. })));

    let mut out_of_range = Tensor::builder(tensor_type.clone());
    out_of_range.cell(1.0, [Label::mapped("a"), Label::Indexed(2)]);
    assert!(matches!(out_of_range.build(), Err(TensorError::InvalidAddress { .. })));

    let mut duplicate = Tensor::builder(tensor_type);
    duplicate
        .cell(1.0, [Label::mapped("a"), Label::Indexed(1)])
        .cell(2.0, [Label::mapped("a"), Label::Indexed(1)]);
    assert!(matches!(duplicate.build(), Err(TensorError::DuplicateAddress { .. })));
}

#[test]
fn test_dense_unset_cells_are_zero() {
    let mut builder = Tensor::builder(ty("tensor(x[3])"));
    builder.cell(7.0, [1]);
    let t = builder.build().unwrap();
    assert_eq!(t.size(), 3);
    assert_eq!(t.cell(&TensorAddress::from([0])), Some(0.0));
    assert_eq!(t.cell(&TensorAddress::from([3])), None);
}

#[test]
fn test_as_double() {
    assert_eq!(Tensor::scalar(-8.17695).as_double().unwrap(), -8.17695);
    let vector = tensor("tensor(x[1]):[1.0]");
    assert_eq!(
        vector.as_double(),
        Err(TensorError::NotScalar(ty("tensor(x[1])")))
    );
}

#[test]
fn test_value_assignability_checks_extent() {
    let declared = ty("tensor(x[3])");
    assert!(tensor("tensor(x[]):[1.0,2.0,3.0]").is_assignable_to(&declared));
    assert!(!tensor("tensor(x[]):[1.0,2.0]").is_assignable_to(&declared));
    assert!(tensor("tensor(x[2]):[1.0,2.0]").is_assignable_to(&ty("tensor(x[])")));
}

#[test]
fn test_cells_restart() {
    let t = tensor("tensor(x{},y[2]):{a:[1.0,2.0],b:[3.0,4.0]}");
    let first: Vec<_> = t.cells().collect();
    let second: Vec<_> = t.cells().collect();
    assert_eq!(first, second);
    assert_eq!(first.len(), 4);
    assert_eq!(
        first[2],
        (TensorAddress::from([Label::mapped("b"), Label::Indexed(0)]), 3.0)
    );
}

#[test]
fn test_from_values_requires_bound_sizes() {
    assert!(Tensor::from_values(ty("tensor(x[])"), vec![1.0]).is_err());
    assert!(Tensor::from_values(ty("tensor(x[2])"), vec![1.0]).is_err());
    assert!(Tensor::from_values(ty("tensor(x[2])"), vec![1.0, 2.0]).is_ok());
}

fn dense_matrix() -> impl Strategy<Value = Tensor> {
    (1usize..5, 1usize..5).prop_flat_map(|(n, m)| {
        prop::collection::vec(-1.0e6f64..1.0e6, n * m).prop_map(move |values| {
            let tensor_type = TensorType::builder()
                .indexed("x", n)
                .indexed("y", m)
                .build()
                .unwrap();
            Tensor::from_values(tensor_type, values).unwrap()
        })
    })
}

fn sparse_vector() -> impl Strategy<Value = Tensor> {
    prop::collection::btree_map("[a-z]{1,3}", -100.0f64..100.0, 0..8).prop_map(|cells| {
        let mut builder = Tensor::builder(TensorType::builder().mapped("x").build().unwrap());
        for (label, value) in cells {
            builder.cell(value, [label.as_str()]);
        }
        builder.build().unwrap()
    })
}

proptest! {
    #[test]
    fn prop_dense_literal_round_trip(t in dense_matrix()) {
        prop_assert_eq!(Tensor::from_literal(&t.to_literal()).unwrap(), t);
    }

    #[test]
    fn prop_sparse_literal_round_trip(t in sparse_vector()) {
        prop_assert_eq!(Tensor::from_literal(&t.to_literal()).unwrap(), t);
    }

    #[test]
    fn prop_join_commutes(a in dense_matrix(), v in prop::collection::vec(-10.0f64..10.0, 1..5)) {
        let b = Tensor::from_values(
            TensorType::builder().indexed("z", v.len()).build().unwrap(),
            v,
        )
        .unwrap();
        let ab = a.join(&b, |x, y| x + y).unwrap();
        let ba = b.join(&a, |x, y| y + x).unwrap();
        prop_assert_eq!(ab.tensor_type(), ba.tensor_type());
        prop_assert_eq!(ab.size(), a.size() * b.size());
        prop_assert_eq!(ab, ba);
    }
}
