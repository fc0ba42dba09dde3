//! Feature quantization for histogram-based split finding.
//!
//! Every feature column is mapped once to at most [`MAX_BINS`] ordered bins.
//! Trees are grown on bin indices and store the matching raw-value upper
//! bound as their split threshold, so prediction runs on raw features.

use ndarray::ArrayView2;

/// Maximum number of bins per feature.
pub const MAX_BINS: usize = 255;

// ============================================================================
// BinMapper
// ============================================================================

/// Mapping from continuous values to bin indices for one feature.
///
/// Value `v` maps to the first bin `i` with `v <= upper_bounds[i]`. The last
/// bound is `+inf`, so every finite value has a bin.
#[derive(Clone, Debug)]
pub struct BinMapper {
    upper_bounds: Vec<f32>,
}

impl BinMapper {
    /// Build bin bounds from one feature column.
    ///
    /// With few distinct values each value gets its own bin and bounds sit at
    /// the midpoints. Otherwise bounds are taken at evenly spaced quantiles.
    pub fn from_values(values: impl Iterator<Item = f32>, max_bins: usize) -> Self {
        let mut sorted: Vec<f32> = values.filter(|v| v.is_finite()).collect();
        sorted.sort_by(f32::total_cmp);

        let mut distinct = sorted.clone();
        distinct.dedup();

        let max_bins = max_bins.max(2);
        let mut upper_bounds = Vec::new();

        if distinct.len() <= max_bins {
            for pair in distinct.windows(2) {
                let (lo, hi) = (pair[0], pair[1]);
                let mid = lo + (hi - lo) / 2.0;
                upper_bounds.push(if mid >= hi { lo } else { mid });
            }
        } else {
            let n = sorted.len();
            for j in 1..max_bins {
                let bound = sorted[(j * n / max_bins).min(n - 1)];
                if upper_bounds.last().is_none_or(|&last| bound > last) && bound < sorted[n - 1] {
                    upper_bounds.push(bound);
                }
            }
        }

        upper_bounds.push(f32::INFINITY);
        Self { upper_bounds }
    }

    /// Number of bins.
    pub fn n_bins(&self) -> usize {
        self.upper_bounds.len()
    }

    /// Bin index of `value`.
    #[inline]
    pub fn bin(&self, value: f32) -> u8 {
        self.upper_bounds.partition_point(|&b| b < value) as u8
    }

    /// Raw-value threshold for a split that sends bins `0..=bin` left.
    #[inline]
    pub fn threshold(&self, bin: usize) -> f32 {
        self.upper_bounds[bin]
    }
}

// ============================================================================
// BinnedMatrix
// ============================================================================

/// Feature-major bin indices of a dense matrix.
#[derive(Clone, Debug)]
pub struct BinnedMatrix {
    bins: Vec<Vec<u8>>,
    mappers: Vec<BinMapper>,
    n_rows: usize,
}

impl BinnedMatrix {
    /// Quantize `features` (`[n_rows, n_features]`, sample-major).
    pub fn from_matrix(features: ArrayView2<f32>, max_bins: usize) -> Self {
        let max_bins = max_bins.min(MAX_BINS);
        let (n_rows, n_features) = features.dim();

        let mut bins = Vec::with_capacity(n_features);
        let mut mappers = Vec::with_capacity(n_features);
        for col in features.columns() {
            let mapper = BinMapper::from_values(col.iter().copied(), max_bins);
            bins.push(col.iter().map(|&v| mapper.bin(v)).collect());
            mappers.push(mapper);
        }

        debug_assert_eq!(bins.len(), n_features);
        Self { bins, mappers, n_rows }
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_features(&self) -> usize {
        self.mappers.len()
    }

    /// Bin indices of one feature, indexed by row.
    #[inline]
    pub fn feature_bins(&self, feature: usize) -> &[u8] {
        &self.bins[feature]
    }

    pub fn mapper(&self, feature: usize) -> &BinMapper {
        &self.mappers[feature]
    }
}
