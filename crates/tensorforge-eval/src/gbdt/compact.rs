//! Flat branch tables for sums of condition trees.

use std::fmt;
use std::mem::size_of;

use tensorforge_expr::BinaryOp;

/// The condition of a branch node, applied to one feature value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Test {
    /// `feature <op> value`, or `value <op> feature` when `swapped`.
    Compare {
        op: BinaryOp,
        value: f64,
        swapped: bool,
    },
    /// `feature in sets[start..start + len]`.
    Member { start: u32, len: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Node {
    Leaf(f64),
    Branch {
        feature: u32,
        test: Test,
        then_node: u32,
        else_node: u32,
    },
}

/// A sum of condition trees compacted into one node array.
///
/// Trees are stored depth-first, each branch pointing at its two children
/// by index. Trees are summed left to right, in the order the expression
/// adds them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompactForest {
    nodes: Vec<Node>,
    sets: Vec<f64>,
    roots: Vec<u32>,
    feature_count: usize,
}

impl CompactForest {
    pub fn tree_count(&self) -> usize {
        self.roots.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of features a feature vector must hold.
    pub fn feature_count(&self) -> usize {
        self.feature_count
    }

    /// Memory held by the table.
    pub fn size_bytes(&self) -> usize {
        self.nodes.len() * size_of::<Node>()
            + self.sets.len() * size_of::<f64>()
            + self.roots.len() * size_of::<u32>()
    }

    /// Sums every tree for one feature vector, indexed as the features of
    /// the owning [`OptimizedForest`](super::OptimizedForest).
    pub fn evaluate(&self, features: &[f64]) -> f64 {
        let mut trees = self.roots.iter().map(|&root| self.evaluate_tree(root, features));
        match trees.next() {
            Some(first) => trees.fold(first, |sum, value| sum + value),
            None => 0.0,
        }
    }

    fn evaluate_tree(&self, root: u32, features: &[f64]) -> f64 {
        let mut at = root as usize;
        loop {
            match self.nodes[at] {
                Node::Leaf(value) => return value,
                Node::Branch {
                    feature,
                    test,
                    then_node,
                    else_node,
                } => {
                    let x = features[feature as usize];
                    at = if self.passes(test, x) {
                        then_node as usize
                    } else {
                        else_node as usize
                    };
                }
            }
        }
    }

    #[inline]
    fn passes(&self, test: Test, x: f64) -> bool {
        match test {
            Test::Compare { op, value, swapped } => {
                let result = if swapped {
                    op.apply(value, x)
                } else {
                    op.apply(x, value)
                };
                result != 0.0
            }
            Test::Member { start, len } => self.set(start, len).contains(&x),
        }
    }

    pub(crate) fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub(crate) fn roots(&self) -> &[u32] {
        &self.roots
    }

    pub(crate) fn set(&self, start: u32, len: u32) -> &[f64] {
        &self.sets[start as usize..(start + len) as usize]
    }
}

impl fmt::Display for CompactForest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "optimized sum of condition trees of size {} bytes",
            self.size_bytes()
        )
    }
}

/// Appends trees to a [`CompactForest`]; `None` from any method means the
/// table would not fit 32-bit indices.
#[derive(Debug, Default)]
pub(crate) struct CompactForestBuilder {
    forest: CompactForest,
}

impl CompactForestBuilder {
    pub(crate) fn new(feature_count: usize) -> Self {
        Self {
            forest: CompactForest {
                feature_count,
                ..CompactForest::default()
            },
        }
    }

    pub(crate) fn begin_tree(&mut self) -> Option<()> {
        let root = u32::try_from(self.forest.nodes.len()).ok()?;
        self.forest.roots.push(root);
        Some(())
    }

    pub(crate) fn leaf(&mut self, value: f64) -> Option<u32> {
        self.push(Node::Leaf(value))
    }

    /// Reserves a branch whose children are filled in by [`Self::link`].
    pub(crate) fn branch(&mut self, feature: usize, test: Test) -> Option<u32> {
        let feature = u32::try_from(feature).ok()?;
        self.push(Node::Branch {
            feature,
            test,
            then_node: 0,
            else_node: 0,
        })
    }

    pub(crate) fn link(&mut self, branch: u32, then_node: u32, else_node: u32) {
        if let Some(Node::Branch {
            then_node: t,
            else_node: e,
            ..
        }) = self.forest.nodes.get_mut(branch as usize)
        {
            *t = then_node;
            *e = else_node;
        }
    }

    pub(crate) fn member(&mut self, values: &[f64]) -> Option<Test> {
        let start = u32::try_from(self.forest.sets.len()).ok()?;
        let len = u32::try_from(values.len()).ok()?;
        start.checked_add(len)?;
        self.forest.sets.extend_from_slice(values);
        Some(Test::Member { start, len })
    }

    pub(crate) fn finish(self) -> CompactForest {
        self.forest
    }

    fn push(&mut self, node: Node) -> Option<u32> {
        let index = u32::try_from(self.forest.nodes.len()).ok()?;
        self.forest.nodes.push(node);
        Some(index)
    }
}
