//! Cell labels and addresses.

use std::fmt;

use smallvec::SmallVec;

use crate::types::is_identifier;

/// The label of one dimension in a cell address.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Label {
    /// Position along an indexed dimension.
    Indexed(usize),
    /// Label along a mapped dimension.
    Mapped(String),
}

impl Label {
    pub fn mapped(label: impl Into<String>) -> Self {
        Label::Mapped(label.into())
    }

    pub fn as_index(&self) -> Option<usize> {
        match self {
            Label::Indexed(i) => Some(*i),
            Label::Mapped(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Label::Mapped(s) => Some(s),
            Label::Indexed(_) => None,
        }
    }
}

impl From<usize> for Label {
    fn from(index: usize) -> Self {
        Label::Indexed(index)
    }
}

impl From<&str> for Label {
    fn from(label: &str) -> Self {
        Label::Mapped(label.to_string())
    }
}

impl From<String> for Label {
    fn from(label: String) -> Self {
        Label::Mapped(label)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Indexed(i) => write!(f, "{}", i),
            Label::Mapped(s) if is_identifier(s) => write!(f, "{}", s),
            Label::Mapped(s) => write_quoted(f, s),
        }
    }
}

pub(crate) fn write_quoted(f: &mut impl fmt::Write, s: &str) -> fmt::Result {
    f.write_char('"')?;
    for c in s.chars() {
        if c == '"' || c == '\\' {
            f.write_char('\\')?;
        }
        f.write_char(c)?;
    }
    f.write_char('"')
}

/// The address of a cell: one label per dimension, in dimension order.
///
/// ```
/// use tensorforge_core::{Label, TensorAddress};
///
/// let address = TensorAddress::from([0, 783]);
/// assert_eq!(address.labels(), &[Label::Indexed(0), Label::Indexed(783)]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TensorAddress(SmallVec<[Label; 4]>);

impl TensorAddress {
    /// The address of the single cell of a scalar.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(labels: impl IntoIterator<Item = Label>) -> Self {
        Self(labels.into_iter().collect())
    }

    pub fn labels(&self) -> &[Label] {
        &self.0
    }

    pub fn label(&self, position: usize) -> Option<&Label> {
        self.0.get(position)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn push(&mut self, label: Label) {
        self.0.push(label);
    }
}

impl FromIterator<Label> for TensorAddress {
    fn from_iter<I: IntoIterator<Item = Label>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<Vec<Label>> for TensorAddress {
    fn from(labels: Vec<Label>) -> Self {
        Self(SmallVec::from_vec(labels))
    }
}

impl<const N: usize> From<[usize; N]> for TensorAddress {
    fn from(indexes: [usize; N]) -> Self {
        indexes.into_iter().map(Label::Indexed).collect()
    }
}

impl<const N: usize> From<[&str; N]> for TensorAddress {
    fn from(labels: [&str; N]) -> Self {
        labels.into_iter().map(Label::from).collect()
    }
}

impl<const N: usize> From<[Label; N]> for TensorAddress {
    fn from(labels: [Label; N]) -> Self {
        labels.into_iter().collect()
    }
}

impl fmt::Display for TensorAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, label) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", label)?;
        }
        write!(f, "]")
    }
}
