//! Taxonomy tree and its per-node UI state.
//!
//! The [`HierarchyBuilder`] links classified records into an immutable
//! [`TaxonTree`] (petgraph StableGraph underneath). Mutable UI state such as
//! collapse and selection lives in a separate [`TreeStateStore`] keyed by
//! node id, so the tree shape never changes after construction.

mod builder;
mod node;
mod state;

pub use builder::{Ancestors, HierarchyBuilder, TaxonTree};
pub use node::TaxonNode;
pub use petgraph::stable_graph::NodeIndex;
pub use state::{NodeUiState, Toggle, TreeStateStore};

#[cfg(test)]
pub(crate) mod test_support {
    use super::{HierarchyBuilder, TaxonTree};
    use crate::data::{ClassifiedRecord, Rank, Record, TaxonClassifier, taxon_of};

    pub fn record(path: &str, value: f64) -> Record {
        Record {
            path: path.to_string(),
            value,
            log_intensity: 0.0,
            samples: None,
        }
    }

    pub fn classified(path: &str, value: f64) -> ClassifiedRecord {
        ClassifiedRecord {
            record: record(path, value),
            taxon: taxon_of(path).to_string(),
            rank: Rank::for_path(path).unwrap_or(Rank::Species),
        }
    }

    /// Build a tree from `(path, value)` pairs.
    pub fn tree_from(rows: &[(&str, f64)]) -> TaxonTree {
        let records = rows.iter().map(|&(path, value)| record(path, value)).collect();
        let (classified, _) = TaxonClassifier::classify(records).unwrap();
        HierarchyBuilder::build(classified).unwrap()
    }
}
