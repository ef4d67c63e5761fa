//! The tensor type and the type rules of the tensor algebra.

use std::fmt;

use super::dimension::{Dimension, DimensionKind};
use super::spec::parse_type_prefix;
use crate::error::{Result, TensorError};

/// The type of a tensor: a set of uniquely named dimensions.
///
/// Dimensions are kept sorted by name, which is also the order of labels
/// in a [`TensorAddress`](crate::TensorAddress). The empty type is the type
/// of a scalar.
///
/// # Examples
///
/// ```
/// use tensorforge_core::TensorType;
///
/// let a = TensorType::from_spec("tensor(d0[],d1[784])").unwrap();
/// let b = TensorType::from_spec("tensor(d1[784],d2[10])").unwrap();
///
/// let joined = a.join(&b).unwrap();
/// assert_eq!(joined.to_string(), "tensor(d0[],d1[784],d2[10])");
/// assert_eq!(joined.reduce(&["d1"]).unwrap().to_string(), "tensor(d0[],d2[10])");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TensorType {
    dimensions: Vec<Dimension>,
}

impl TensorType {
    /// The type of a scalar.
    pub fn scalar() -> Self {
        Self::default()
    }

    /// Creates a type from dimensions in any order.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::InvalidType`] if a dimension name occurs twice.
    pub fn new(dimensions: impl IntoIterator<Item = Dimension>) -> Result<Self> {
        let mut dimensions: Vec<Dimension> = dimensions.into_iter().collect();
        dimensions.sort_by(|a, b| a.name().cmp(b.name()));
        if let Some(pair) = dimensions.windows(2).find(|w| w[0].name() == w[1].name()) {
            let spec = format!(
                "tensor({})",
                dimensions
                    .iter()
                    .map(|d| d.to_string())
                    .collect::<Vec<_>>()
                    .join(",")
            );
            return Err(TensorError::InvalidType {
                spec,
                reason: format!("dimension '{}' is declared twice", pair[0].name()),
            });
        }
        Ok(Self { dimensions })
    }

    /// Starts building a type dimension by dimension.
    pub fn builder() -> TensorTypeBuilder {
        TensorTypeBuilder::default()
    }

    /// Parses a type specification such as `tensor(x{},y[3],z[])`.
    pub fn from_spec(spec: &str) -> Result<Self> {
        let (tensor_type, consumed) = parse_type_prefix(spec)?;
        if !spec[consumed..].trim().is_empty() {
            return Err(TensorError::InvalidType {
                spec: spec.to_string(),
                reason: format!("unexpected trailing input '{}'", spec[consumed..].trim()),
            });
        }
        Ok(tensor_type)
    }

    pub(crate) fn from_sorted(dimensions: Vec<Dimension>) -> Self {
        debug_assert!(dimensions.windows(2).all(|w| w[0].name() < w[1].name()));
        Self { dimensions }
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.index_of(name).map(|i| &self.dimensions[i])
    }

    /// Position of a dimension in address order.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.dimensions
            .binary_search_by(|d| d.name().cmp(name))
            .ok()
    }

    pub fn dimension_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.dimensions.iter().map(|d| d.name())
    }

    pub fn rank(&self) -> usize {
        self.dimensions.len()
    }

    pub fn is_scalar(&self) -> bool {
        self.dimensions.is_empty()
    }

    /// True when every dimension is indexed (scalars included).
    pub fn is_dense(&self) -> bool {
        self.dimensions.iter().all(Dimension::is_indexed)
    }

    /// True when there is at least one dimension and all are mapped.
    pub fn is_sparse(&self) -> bool {
        !self.dimensions.is_empty() && self.dimensions.iter().all(Dimension::is_mapped)
    }

    /// Result type of joining two tensors.
    pub fn join(&self, other: &TensorType) -> Result<TensorType> {
        self.merge(other, "join")
    }

    /// Result type of reducing the named dimensions (all if empty).
    pub fn reduce<S: AsRef<str>>(&self, dimensions: &[S]) -> Result<TensorType> {
        if dimensions.is_empty() {
            return Ok(TensorType::scalar());
        }
        for name in dimensions {
            if self.dimension(name.as_ref()).is_none() {
                return Err(TensorError::unary_mismatch(
                    "reduce",
                    self,
                    format!("dimension '{}' does not exist", name.as_ref()),
                ));
            }
        }
        let kept = self
            .dimensions
            .iter()
            .filter(|d| !dimensions.iter().any(|n| n.as_ref() == d.name()))
            .cloned()
            .collect();
        Ok(Self::from_sorted(kept))
    }

    /// Result type of renaming `from[i]` to `to[i]`.
    pub fn rename<S: AsRef<str>, T: AsRef<str>>(&self, from: &[S], to: &[T]) -> Result<TensorType> {
        if from.len() != to.len() {
            return Err(TensorError::unary_mismatch(
                "rename",
                self,
                format!(
                    "{} dimensions renamed to {} names",
                    from.len(),
                    to.len()
                ),
            ));
        }
        if from.is_empty() {
            return Err(TensorError::unary_mismatch(
                "rename",
                self,
                "no dimensions to rename",
            ));
        }
        for (i, name) in from.iter().enumerate() {
            if self.dimension(name.as_ref()).is_none() {
                return Err(TensorError::unary_mismatch(
                    "rename",
                    self,
                    format!("dimension '{}' does not exist", name.as_ref()),
                ));
            }
            if from[..i].iter().any(|n| n.as_ref() == name.as_ref()) {
                return Err(TensorError::unary_mismatch(
                    "rename",
                    self,
                    format!("dimension '{}' is renamed twice", name.as_ref()),
                ));
            }
        }

        let renamed: Vec<Dimension> = self
            .dimensions
            .iter()
            .map(|d| match from.iter().position(|n| n.as_ref() == d.name()) {
                Some(i) => d.with_name(to[i].as_ref()),
                None => d.clone(),
            })
            .collect();

        let mut sorted = renamed;
        sorted.sort_by(|a, b| a.name().cmp(b.name()));
        if let Some(pair) = sorted.windows(2).find(|w| w[0].name() == w[1].name()) {
            return Err(TensorError::unary_mismatch(
                "rename",
                self,
                format!("dimension '{}' would occur twice", pair[0].name()),
            ));
        }
        Ok(Self::from_sorted(sorted))
    }

    /// Result type of concatenating two tensors along `dimension`.
    pub fn concat(&self, other: &TensorType, dimension: &str) -> Result<TensorType> {
        let size_along = |t: &TensorType| -> Result<Option<usize>> {
            match t.dimension(dimension) {
                None => Ok(Some(1)),
                Some(d) if d.is_mapped() => Err(TensorError::mismatch(
                    "concat",
                    self,
                    other,
                    format!("concat dimension '{}' is mapped", dimension),
                )),
                Some(d) => Ok(d.size()),
            }
        };
        let size = match (size_along(self)?, size_along(other)?) {
            (Some(a), Some(b)) => Some(a + b),
            _ => None,
        };

        let rest = self
            .without(dimension)
            .merge(&other.without(dimension), "concat")
            .map_err(|err| match err {
                TensorError::TypeMismatch { detail, .. } => {
                    TensorError::mismatch("concat", self, other, detail)
                }
                err => err,
            })?;

        let mut dimensions = rest.dimensions;
        let concat_dim = Dimension::indexed_unbound(dimension).with_size(size);
        let at = dimensions
            .binary_search_by(|d| d.name().cmp(dimension))
            .unwrap_or_else(|i| i);
        dimensions.insert(at, concat_dim);
        Ok(Self::from_sorted(dimensions))
    }

    /// Common type of two alternatives, e.g. the branches of an `if`.
    ///
    /// Both types must have the same dimensions of the same kinds; indexed
    /// sizes that differ become unbound.
    pub fn generalize(&self, other: &TensorType) -> Result<TensorType> {
        if self == other {
            return Ok(self.clone());
        }
        if self.rank() != other.rank() {
            return Err(TensorError::mismatch(
                "if",
                self,
                other,
                "branches have different dimensions",
            ));
        }
        let mut dimensions = Vec::with_capacity(self.rank());
        for (a, b) in self.dimensions.iter().zip(&other.dimensions) {
            if a.name() != b.name() || a.is_mapped() != b.is_mapped() {
                return Err(TensorError::mismatch(
                    "if",
                    self,
                    other,
                    "branches have different dimensions",
                ));
            }
            if a.size() == b.size() {
                dimensions.push(a.clone());
            } else {
                dimensions.push(a.with_size(None));
            }
        }
        Ok(Self::from_sorted(dimensions))
    }

    /// Whether a value of this type may be bound where `declared` is expected.
    ///
    /// Names and kinds must match. A bound declared size requires the same
    /// bound size; an unbound size here is accepted at the type level and
    /// checked against the actual extent by
    /// [`Tensor::is_assignable_to`](crate::Tensor::is_assignable_to).
    pub fn is_assignable_to(&self, declared: &TensorType) -> bool {
        self.rank() == declared.rank()
            && self
                .dimensions
                .iter()
                .zip(&declared.dimensions)
                .all(|(actual, expected)| {
                    actual.name() == expected.name()
                        && match (actual.kind(), expected.kind()) {
                            (DimensionKind::Mapped, DimensionKind::Mapped) => true,
                            (
                                DimensionKind::Indexed { size: actual },
                                DimensionKind::Indexed { size: expected },
                            ) => match (actual, expected) {
                                (_, None) | (None, _) => true,
                                (Some(a), Some(e)) => a == e,
                            },
                            _ => false,
                        }
                })
    }

    /// This type without the named dimension.
    pub(crate) fn without(&self, name: &str) -> TensorType {
        Self::from_sorted(
            self.dimensions
                .iter()
                .filter(|d| d.name() != name)
                .cloned()
                .collect(),
        )
    }

    /// This type with the indexed dimension `name` bound to `size`.
    pub(crate) fn with_size(&self, name: &str, size: Option<usize>) -> TensorType {
        Self::from_sorted(
            self.dimensions
                .iter()
                .map(|d| {
                    if d.name() == name && d.is_indexed() {
                        d.with_size(size)
                    } else {
                        d.clone()
                    }
                })
                .collect(),
        )
    }

    fn merge(&self, other: &TensorType, operation: &'static str) -> Result<TensorType> {
        let (a, b) = (&self.dimensions, &other.dimensions);
        let mut dimensions = Vec::with_capacity(a.len() + b.len());
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            match a[i].name().cmp(b[j].name()) {
                std::cmp::Ordering::Less => {
                    dimensions.push(a[i].clone());
                    i += 1;
                }
                std::cmp::Ordering::Greater => {
                    dimensions.push(b[j].clone());
                    j += 1;
                }
                std::cmp::Ordering::Equal => {
                    dimensions.push(self.merge_dimension(other, &a[i], &b[j], operation)?);
                    i += 1;
                    j += 1;
                }
            }
        }
        dimensions.extend_from_slice(&a[i..]);
        dimensions.extend_from_slice(&b[j..]);
        Ok(Self::from_sorted(dimensions))
    }

    fn merge_dimension(
        &self,
        other: &TensorType,
        a: &Dimension,
        b: &Dimension,
        operation: &'static str,
    ) -> Result<Dimension> {
        match (a.kind(), b.kind()) {
            (DimensionKind::Mapped, DimensionKind::Mapped) => Ok(a.clone()),
            (DimensionKind::Indexed { size: sa }, DimensionKind::Indexed { size: sb }) => {
                match (sa, sb) {
                    (Some(x), Some(y)) if x != y => Err(TensorError::mismatch(
                        operation,
                        self,
                        other,
                        format!("dimension '{}' has size {} and {}", a.name(), x, y),
                    )),
                    (Some(x), _) | (_, Some(x)) => Ok(a.with_size(Some(x))),
                    (None, None) => Ok(a.clone()),
                }
            }
            _ => Err(TensorError::mismatch(
                operation,
                self,
                other,
                format!(
                    "dimension '{}' is mapped in one operand and indexed in the other",
                    a.name()
                ),
            )),
        }
    }
}

impl fmt::Display for TensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tensor(")?;
        for (i, dimension) in self.dimensions.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", dimension)?;
        }
        write!(f, ")")
    }
}

impl std::str::FromStr for TensorType {
    type Err = TensorError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_spec(s)
    }
}

/// Builder for [`TensorType`].
#[derive(Debug, Clone, Default)]
pub struct TensorTypeBuilder {
    dimensions: Vec<Dimension>,
}

impl TensorTypeBuilder {
    /// Adds a mapped dimension.
    pub fn mapped(mut self, name: impl Into<String>) -> Self {
        self.dimensions.push(Dimension::mapped(name));
        self
    }

    /// Adds a bound indexed dimension.
    pub fn indexed(mut self, name: impl Into<String>, size: usize) -> Self {
        self.dimensions.push(Dimension::indexed(name, size));
        self
    }

    /// Adds an unbound indexed dimension.
    pub fn indexed_unbound(mut self, name: impl Into<String>) -> Self {
        self.dimensions.push(Dimension::indexed_unbound(name));
        self
    }

    pub fn build(self) -> Result<TensorType> {
        TensorType::new(self.dimensions)
    }
}
