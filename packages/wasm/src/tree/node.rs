//! Tree node type.
//!
//! A node holds everything derived from its input record plus the aggregate
//! fields filled in by the builder. Nodes are immutable once the tree is
//! built; UI state lives in the [`TreeStateStore`](super::TreeStateStore)
//! side table.

use std::fmt;

use crate::data::{ClassifiedRecord, Rank, SampleValues};

/// One taxon in the hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub struct TaxonNode {
    /// Full `@`-delimited path; unique within a tree.
    pub id: String,
    /// Last path segment.
    pub taxon: String,
    pub rank: Rank,
    /// Distance from the root (root = 0).
    pub depth: usize,
    /// Summed MS intensity from the input row.
    pub value: f64,
    /// `10 * log10(value)`, 0 for non-positive values.
    pub log_intensity: f64,
    pub samples: Option<SampleValues>,
    /// `value / parent.value`, 0 when the parent is 0, `None` for the root.
    pub avg_proportion: Option<f64>,
    /// Own value plus the values of all descendants.
    pub subtree_value: f64,
    /// Number of leaves below (and including) this node.
    pub leaf_count: usize,
}

impl TaxonNode {
    pub(crate) fn from_record(classified: ClassifiedRecord) -> Self {
        let ClassifiedRecord {
            record,
            taxon,
            rank,
        } = classified;
        let depth = record.path.matches(crate::data::PATH_SEPARATOR).count();

        Self {
            id: record.path,
            taxon,
            rank,
            depth,
            value: record.value,
            log_intensity: record.log_intensity,
            samples: record.samples,
            avg_proportion: None,
            subtree_value: record.value,
            leaf_count: 1,
        }
    }

    /// Intensity for one sample, if the dataset has it.
    pub fn sample_value(&self, sample: &str) -> Option<f64> {
        self.samples.as_ref().and_then(|samples| samples.get(sample))
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.depth == 0
    }
}

impl fmt::Display for TaxonNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.taxon, self.rank)
    }
}
