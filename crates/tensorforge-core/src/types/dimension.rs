//! Dimension descriptors.

use std::fmt;

/// The kind of a tensor dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DimensionKind {
    /// Sparse dimension addressed by string labels.
    Mapped,
    /// Dense dimension addressed by indices, with an optional bound size.
    Indexed { size: Option<usize> },
}

/// A named tensor dimension.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Dimension {
    name: String,
    kind: DimensionKind,
}

impl Dimension {
    /// Creates a mapped dimension.
    pub fn mapped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: DimensionKind::Mapped,
        }
    }

    /// Creates an indexed dimension of a bound size.
    pub fn indexed(name: impl Into<String>, size: usize) -> Self {
        Self {
            name: name.into(),
            kind: DimensionKind::Indexed { size: Some(size) },
        }
    }

    /// Creates an indexed dimension whose size is resolved from values.
    pub fn indexed_unbound(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: DimensionKind::Indexed { size: None },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> DimensionKind {
        self.kind
    }

    pub fn is_mapped(&self) -> bool {
        self.kind == DimensionKind::Mapped
    }

    pub fn is_indexed(&self) -> bool {
        !self.is_mapped()
    }

    /// Bound size of an indexed dimension; `None` for mapped or unbound.
    pub fn size(&self) -> Option<usize> {
        match self.kind {
            DimensionKind::Indexed { size } => size,
            DimensionKind::Mapped => None,
        }
    }

    pub fn is_bound(&self) -> bool {
        self.size().is_some()
    }

    /// Returns this dimension under another name.
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: self.kind,
        }
    }

    /// Returns this indexed dimension with the given size binding.
    pub(crate) fn with_size(&self, size: Option<usize>) -> Self {
        Self {
            name: self.name.clone(),
            kind: DimensionKind::Indexed { size },
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            DimensionKind::Mapped => write!(f, "{}{{}}", self.name),
            DimensionKind::Indexed { size: Some(size) } => write!(f, "{}[{}]", self.name, size),
            DimensionKind::Indexed { size: None } => write!(f, "{}[]", self.name),
        }
    }
}
