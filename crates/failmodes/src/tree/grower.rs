//! Histogram-based tree growing.
//!
//! A single grower serves both ensemble families: it fits a regression tree
//! to per-row gradient/hessian pairs. Random forests feed it impurity-style
//! pairs (`grad = -w*y`, `hess = w`), boosting feeds it logistic-loss
//! derivatives.
//!
//! Growth is depth-first with an explicit work stack, so deep trees never
//! recurse.

use rand::seq::SliceRandom;
use rand_xoshiro::Xoshiro256PlusPlus;

use super::bins::BinnedMatrix;
use super::gain::GainParams;
use super::repr::{NodeId, Tree};

/// Splits must improve the objective by more than this to be taken.
const MIN_SPLIT_GAIN: f64 = 1e-10;

/// Parameters for a single tree.
#[derive(Clone, Debug, PartialEq)]
pub struct GrowerParams {
    /// Gain computation parameters.
    pub gain: GainParams,
    /// Maximum depth (root = 0).
    pub max_depth: u32,
    /// Shrinkage applied to every leaf value.
    pub learning_rate: f32,
    /// Number of candidate features drawn at each node. `None` = all of the
    /// tree's features.
    pub features_per_node: Option<usize>,
}

#[derive(Clone, Copy, Default)]
struct HistBin {
    grad: f64,
    hess: f64,
    count: u32,
}

#[derive(Clone, Copy, Debug)]
struct SplitCandidate {
    feature: u32,
    bin: usize,
    gain: f64,
}

struct NodeTask {
    node: NodeId,
    start: usize,
    end: usize,
    depth: u32,
}

/// Grows trees over a fixed [`BinnedMatrix`].
pub struct TreeGrower<'a> {
    binned: &'a BinnedMatrix,
    params: &'a GrowerParams,
}

impl<'a> TreeGrower<'a> {
    pub fn new(binned: &'a BinnedMatrix, params: &'a GrowerParams) -> Self {
        Self { binned, params }
    }

    /// Grow one tree.
    ///
    /// * `rows` - ids of the rows taking part (each with non-zero hessian)
    /// * `grad`, `hess` - per-row derivatives, indexed by row id
    /// * `tree_features` - features this tree may split on
    /// * `rng` - source for per-node feature sampling
    pub fn grow(
        &self,
        mut rows: Vec<u32>,
        grad: &[f32],
        hess: &[f32],
        tree_features: &[u32],
        rng: &mut Xoshiro256PlusPlus,
    ) -> Tree {
        debug_assert_eq!(grad.len(), self.binned.n_rows());
        debug_assert_eq!(hess.len(), self.binned.n_rows());

        let params = self.params;
        let min_leaf = params.gain.min_samples_leaf.max(1) as usize;

        let mut tree = Tree::with_capacity(2 * rows.len().min(1024) + 1);
        let root = tree.push_leaf(0.0);
        let mut stack = vec![NodeTask {
            node: root,
            start: 0,
            end: rows.len(),
            depth: 0,
        }];
        let mut scratch: Vec<u32> = Vec::with_capacity(tree_features.len());

        while let Some(task) = stack.pop() {
            let node_rows = &mut rows[task.start..task.end];
            let (sum_grad, sum_hess) = node_rows.iter().fold((0.0f64, 0.0f64), |(g, h), &r| {
                (g + grad[r as usize] as f64, h + hess[r as usize] as f64)
            });
            let value = params.gain.leaf_weight(sum_grad, sum_hess) * params.learning_rate as f64;
            tree.set_leaf_value(task.node, value as f32);

            if task.depth >= params.max_depth || node_rows.len() < 2 * min_leaf {
                continue;
            }

            let candidates = self.sample_features(tree_features, &mut scratch, rng);
            let Some(best) =
                self.find_best_split(node_rows, grad, hess, candidates, sum_grad, sum_hess)
            else {
                continue;
            };

            let bins = self.binned.feature_bins(best.feature as usize);
            let n_left = partition(node_rows, |r| bins[r as usize] as usize <= best.bin);

            let left = tree.push_leaf(0.0);
            let right = tree.push_leaf(0.0);
            let threshold = self.binned.mapper(best.feature as usize).threshold(best.bin);
            tree.set_split(task.node, best.feature, threshold, left, right);

            let mid = task.start + n_left;
            stack.push(NodeTask {
                node: right,
                start: mid,
                end: task.end,
                depth: task.depth + 1,
            });
            stack.push(NodeTask {
                node: left,
                start: task.start,
                end: mid,
                depth: task.depth + 1,
            });
        }

        tree
    }

    fn sample_features<'s>(
        &self,
        tree_features: &'s [u32],
        scratch: &'s mut Vec<u32>,
        rng: &mut Xoshiro256PlusPlus,
    ) -> &'s [u32] {
        match self.params.features_per_node {
            Some(k) if k < tree_features.len() => {
                scratch.clear();
                scratch.extend_from_slice(tree_features);
                let (chosen, _) = scratch.partial_shuffle(rng, k.max(1));
                chosen
            }
            _ => tree_features,
        }
    }

    fn find_best_split(
        &self,
        rows: &[u32],
        grad: &[f32],
        hess: &[f32],
        features: &[u32],
        sum_grad: f64,
        sum_hess: f64,
    ) -> Option<SplitCandidate> {
        let gain_params = &self.params.gain;
        let n_rows = rows.len() as u32;
        let mut best: Option<SplitCandidate> = None;
        let mut hist: Vec<HistBin> = Vec::new();

        for &feature in features {
            let mapper = self.binned.mapper(feature as usize);
            let n_bins = mapper.n_bins();
            if n_bins < 2 {
                continue;
            }

            hist.clear();
            hist.resize(n_bins, HistBin::default());
            let bins = self.binned.feature_bins(feature as usize);
            for &r in rows {
                let slot = &mut hist[bins[r as usize] as usize];
                slot.grad += grad[r as usize] as f64;
                slot.hess += hess[r as usize] as f64;
                slot.count += 1;
            }

            let mut left = HistBin::default();
            for (bin, slot) in hist.iter().enumerate().take(n_bins - 1) {
                left.grad += slot.grad;
                left.hess += slot.hess;
                left.count += slot.count;
                if slot.count == 0 {
                    continue;
                }

                let right_grad = sum_grad - left.grad;
                let right_hess = sum_hess - left.hess;
                let right_count = n_rows - left.count;
                if !gain_params.is_valid_split(left.hess, right_hess, left.count, right_count) {
                    continue;
                }

                let gain = gain_params.compute_gain(
                    left.grad, left.hess, right_grad, right_hess, sum_grad, sum_hess,
                );
                if gain > MIN_SPLIT_GAIN && best.is_none_or(|b| gain > b.gain) {
                    best = Some(SplitCandidate { feature, bin, gain });
                }
            }
        }

        best
    }
}

/// In-place partition; returns the number of elements satisfying `pred`,
/// which end up at the front.
fn partition(rows: &mut [u32], pred: impl Fn(u32) -> bool) -> usize {
    let mut i = 0;
    let mut j = rows.len();
    while i < j {
        if pred(rows[i]) {
            i += 1;
        } else {
            j -= 1;
            rows.swap(i, j);
        }
    }
    i
}
