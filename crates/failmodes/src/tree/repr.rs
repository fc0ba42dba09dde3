//! Canonical tree representation (SoA).
//!
//! Nodes are stored as parallel arrays indexed by node id; node 0 is the
//! root. Internal nodes send a sample left when `x[feature] <= threshold`.

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// Node identifier (index into the SoA arrays).
pub type NodeId = u32;

/// Structural validation errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TreeValidationError {
    #[error("tree has no nodes")]
    Empty,
    #[error("node arrays have inconsistent lengths")]
    InconsistentArrays,
    #[error("node {node} references child {child} outside 1..{n_nodes}")]
    ChildOutOfBounds { node: NodeId, child: NodeId, n_nodes: usize },
}

/// Immutable binary decision tree with scalar leaves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    split_feature: Vec<u32>,
    threshold: Vec<f32>,
    left: Vec<NodeId>,
    right: Vec<NodeId>,
    is_leaf: Vec<bool>,
    value: Vec<f32>,
}

impl Tree {
    /// A tree with a single leaf.
    pub fn leaf(value: f32) -> Self {
        let mut tree = Self::with_capacity(1);
        tree.push_leaf(value);
        tree
    }

    pub(crate) fn with_capacity(n_nodes: usize) -> Self {
        Self {
            split_feature: Vec::with_capacity(n_nodes),
            threshold: Vec::with_capacity(n_nodes),
            left: Vec::with_capacity(n_nodes),
            right: Vec::with_capacity(n_nodes),
            is_leaf: Vec::with_capacity(n_nodes),
            value: Vec::with_capacity(n_nodes),
        }
    }

    /// Append a placeholder leaf and return its id.
    pub(crate) fn push_leaf(&mut self, value: f32) -> NodeId {
        let id = self.is_leaf.len() as NodeId;
        self.split_feature.push(0);
        self.threshold.push(0.0);
        self.left.push(0);
        self.right.push(0);
        self.is_leaf.push(true);
        self.value.push(value);
        id
    }

    /// Turn `node` into a numeric split.
    pub(crate) fn set_split(
        &mut self,
        node: NodeId,
        feature: u32,
        threshold: f32,
        left: NodeId,
        right: NodeId,
    ) {
        let i = node as usize;
        self.split_feature[i] = feature;
        self.threshold[i] = threshold;
        self.left[i] = left;
        self.right[i] = right;
        self.is_leaf[i] = false;
        self.value[i] = 0.0;
    }

    pub(crate) fn set_leaf_value(&mut self, node: NodeId, value: f32) {
        self.value[node as usize] = value;
    }

    pub fn n_nodes(&self) -> usize {
        self.is_leaf.len()
    }

    pub fn n_leaves(&self) -> usize {
        self.is_leaf.iter().filter(|l| **l).count()
    }

    /// Maximum root-to-leaf depth (a single leaf has depth 0).
    pub fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack = vec![(0u32, 0usize)];
        while let Some((node, depth)) = stack.pop() {
            let i = node as usize;
            if self.is_leaf[i] {
                max_depth = max_depth.max(depth);
            } else {
                stack.push((self.left[i], depth + 1));
                stack.push((self.right[i], depth + 1));
            }
        }
        max_depth
    }

    /// Leaf value reached by `row`.
    #[inline]
    pub fn predict_row(&self, row: ArrayView1<f32>) -> f32 {
        let mut node = 0usize;
        while !self.is_leaf[node] {
            let x = row[self.split_feature[node] as usize];
            node = if x <= self.threshold[node] {
                self.left[node] as usize
            } else {
                self.right[node] as usize
            };
        }
        self.value[node]
    }

    /// Check the structural invariants of a deserialized tree.
    pub fn validate(&self, n_features: usize) -> Result<(), TreeValidationError> {
        let n = self.is_leaf.len();
        if n == 0 {
            return Err(TreeValidationError::Empty);
        }
        let lens = [
            self.split_feature.len(),
            self.threshold.len(),
            self.left.len(),
            self.right.len(),
            self.value.len(),
        ];
        if lens.iter().any(|&l| l != n) {
            return Err(TreeValidationError::InconsistentArrays);
        }
        for node in 0..n {
            if self.is_leaf[node] {
                continue;
            }
            if self.split_feature[node] as usize >= n_features {
                return Err(TreeValidationError::InconsistentArrays);
            }
            for child in [self.left[node], self.right[node]] {
                if child == 0 || child as usize >= n || child as usize <= node {
                    return Err(TreeValidationError::ChildOutOfBounds {
                        node: node as NodeId,
                        child,
                        n_nodes: n,
                    });
                }
            }
        }
        Ok(())
    }
}
