//! Active-value selection.
//!
//! The displayed value of a node depends on the active sample: the summed
//! intensity when samples are averaged, or one sample's intensity. Policies
//! only read nodes, so switching modes back and forth never loses data.

use petgraph::stable_graph::NodeIndex;

use crate::tree::{TaxonNode, TaxonTree};

/// Picks the number a node is displayed with.
pub trait AggregationPolicy {
    fn active_value(&self, node: &TaxonNode) -> f64;

    /// Human-readable name of the active mode.
    fn label(&self) -> String;

    /// Active value summed over a node and its descendants.
    fn subtree_value(&self, tree: &TaxonTree, index: NodeIndex) -> f64 {
        tree.descendants(index)
            .into_iter()
            .map(|node| self.active_value(&tree[node]))
            .sum()
    }
}

impl<P: AggregationPolicy + ?Sized> AggregationPolicy for &P {
    fn active_value(&self, node: &TaxonNode) -> f64 {
        (**self).active_value(node)
    }

    fn label(&self) -> String {
        (**self).label()
    }

    fn subtree_value(&self, tree: &TaxonTree, index: NodeIndex) -> f64 {
        (**self).subtree_value(tree, index)
    }
}

/// Averaged intensity or a single sample.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ValueMode {
    #[default]
    Averaged,
    BySample(String),
}

impl ValueMode {
    pub fn sample(&self) -> Option<&str> {
        match self {
            ValueMode::Averaged => None,
            ValueMode::BySample(sample) => Some(sample),
        }
    }
}

impl AggregationPolicy for ValueMode {
    fn active_value(&self, node: &TaxonNode) -> f64 {
        match self {
            ValueMode::Averaged => node.value,
            ValueMode::BySample(sample) => node.sample_value(sample).unwrap_or(0.0),
        }
    }

    fn label(&self) -> String {
        match self {
            ValueMode::Averaged => "Averaged".to_string(),
            ValueMode::BySample(sample) => sample.clone(),
        }
    }

    fn subtree_value(&self, tree: &TaxonTree, index: NodeIndex) -> f64 {
        match self {
            // Summed once by the builder.
            ValueMode::Averaged => tree[index].subtree_value,
            ValueMode::BySample(_) => tree
                .descendants(index)
                .into_iter()
                .map(|node| self.active_value(&tree[node]))
                .sum(),
        }
    }
}

/// `log10(v + 1) + 2` over another policy; used for node radii.
#[derive(Debug, Clone, PartialEq)]
pub struct LogScaled<P>(pub P);

impl<P: AggregationPolicy> AggregationPolicy for LogScaled<P> {
    fn active_value(&self, node: &TaxonNode) -> f64 {
        (self.0.active_value(node) + 1.0).log10() + 2.0
    }

    fn label(&self) -> String {
        format!("log({})", self.0.label())
    }
}

/// Which number a layout sizes nodes by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizingBasis {
    /// The node's own active value.
    OwnValue,
    /// Active value summed over the node and its descendants.
    SubtreeValue,
    /// Number of leaves under the node.
    LeafCount,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ClassifiedRecord, Rank, Record, SampleValues, TaxonClassifier};
    use crate::tree::HierarchyBuilder;

    fn node() -> TaxonNode {
        TaxonNode::from_record(ClassifiedRecord {
            record: Record {
                path: "Cellular organisms@Eukaryota".to_string(),
                value: 99.0,
                log_intensity: 0.0,
                samples: Some(SampleValues::new(vec![
                    ("s1".to_string(), 9.0),
                    ("s2".to_string(), 0.0),
                ])),
            },
            taxon: "Eukaryota".to_string(),
            rank: Rank::Superkingdom,
        })
    }

    #[test]
    fn test_averaged_uses_summed_value() {
        assert_eq!(ValueMode::Averaged.active_value(&node()), 99.0);
        assert_eq!(ValueMode::Averaged.label(), "Averaged");
    }

    #[test]
    fn test_by_sample() {
        let node = node();
        assert_eq!(ValueMode::BySample("s1".into()).active_value(&node), 9.0);
        assert_eq!(ValueMode::BySample("s2".into()).active_value(&node), 0.0);
        assert_eq!(ValueMode::BySample("missing".into()).active_value(&node), 0.0);
    }

    #[test]
    fn test_mode_switch_is_lossless() {
        let node = node();
        let before = node.clone();

        let averaged = ValueMode::Averaged.active_value(&node);
        let _ = ValueMode::BySample("s1".into()).active_value(&node);
        assert_eq!(ValueMode::Averaged.active_value(&node), averaged);
        assert_eq!(node, before);
    }

    #[test]
    fn test_log_scaled() {
        let node = node();
        let scaled = LogScaled(ValueMode::BySample("s1".into()));
        assert!((scaled.active_value(&node) - 3.0).abs() < 1e-12);
        assert_eq!(LogScaled(ValueMode::BySample("s2".into())).active_value(&node), 2.0);
        assert_eq!(scaled.label(), "log(s1)");
    }

    #[test]
    fn test_log_scaled_through_trait_object() {
        let mode = ValueMode::Averaged;
        let policy: &dyn AggregationPolicy = &mode;
        let radius = LogScaled(policy).active_value(&node());
        assert!((radius - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_subtree_value_per_mode() {
        let tree = tree_from_samples();
        let root = tree.root();

        assert_eq!(ValueMode::Averaged.subtree_value(&tree, root), 15.0);
        assert_eq!(ValueMode::BySample("s1".into()).subtree_value(&tree, root), 6.0);
        assert_eq!(ValueMode::BySample("s9".into()).subtree_value(&tree, root), 0.0);

        let b = tree.index_of("A@B").unwrap();
        let scaled = LogScaled(ValueMode::Averaged);
        assert_eq!(scaled.subtree_value(&tree, b), scaled.active_value(&tree[b]));
    }

    fn tree_from_samples() -> TaxonTree {
        let records = [("A", 10.0, 4.0), ("A@B", 3.0, 1.0), ("A@C", 2.0, 1.0)]
            .into_iter()
            .map(|(path, value, s1)| Record {
                path: path.to_string(),
                value,
                log_intensity: 0.0,
                samples: Some(SampleValues::new(vec![("s1".to_string(), s1)])),
            })
            .collect();
        let (classified, _) = TaxonClassifier::classify(records).unwrap();
        HierarchyBuilder::build(classified).unwrap()
    }
}
