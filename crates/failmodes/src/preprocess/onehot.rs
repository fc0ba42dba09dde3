//! One-hot encoding of categorical columns.

use serde::{Deserialize, Serialize};

/// Indicator encoding over the categories seen during fitting.
///
/// Categories are kept sorted; a value outside the vocabulary encodes to all
/// zeros.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    pub column: String,
    categories: Vec<String>,
}

impl OneHotEncoder {
    pub fn fit(name: &str, values: impl IntoIterator<Item = Option<String>>) -> Self {
        let mut categories: Vec<String> = values.into_iter().flatten().collect();
        categories.sort_unstable();
        categories.dedup();
        Self {
            column: name.to_string(),
            categories,
        }
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Number of indicator columns.
    pub fn width(&self) -> usize {
        self.categories.len()
    }

    /// Output names, `<column>_<category>`.
    pub fn feature_names(&self) -> impl Iterator<Item = String> + '_ {
        self.categories.iter().map(move |c| format!("{}_{}", self.column, c))
    }

    /// Position of `value`'s indicator, if known.
    #[inline]
    pub fn index_of(&self, value: &str) -> Option<usize> {
        self.categories.binary_search_by(|c| c.as_str().cmp(value)).ok()
    }
}
