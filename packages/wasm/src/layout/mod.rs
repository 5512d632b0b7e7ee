//! Layout dispatch.
//!
//! Chart types differ in whether they honour collapse and in what they size
//! nodes by. A [`LayoutKind`] resolves to a [`Traversal`] exactly once, and
//! adapters read the tree only through a [`TreeView`] built for that
//! traversal. Pixel geometry is left to the front-end.

pub mod snapshot;

use petgraph::stable_graph::NodeIndex;
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TaxonomyError};
use crate::policy::{AggregationPolicy, Color, ColorPolicy, LogScaled, SizingBasis};
use crate::tree::{TaxonNode, TaxonTree, TreeStateStore};

pub use snapshot::{HierarchySnapshot, RenderNode, RenderTree};

/// Supported chart types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayoutKind {
    HorizontalTree,
    RadialTree,
    Treemap,
    CirclePacking,
    Sunburst,
    HierarchicalBars,
}

impl LayoutKind {
    pub const ALL: [LayoutKind; 6] = [
        LayoutKind::HorizontalTree,
        LayoutKind::RadialTree,
        LayoutKind::Treemap,
        LayoutKind::CirclePacking,
        LayoutKind::Sunburst,
        LayoutKind::HierarchicalBars,
    ];

    /// Chart id used by the front-end.
    pub fn id(self) -> &'static str {
        match self {
            LayoutKind::HorizontalTree => "horizontal-tree",
            LayoutKind::RadialTree => "radial-tree",
            LayoutKind::Treemap => "static-treemap",
            LayoutKind::CirclePacking => "circle-packing",
            LayoutKind::Sunburst => "sunburst",
            LayoutKind::HierarchicalBars => "hierarchical-bars",
        }
    }

    pub fn traversal(self) -> Traversal {
        match self {
            LayoutKind::HorizontalTree | LayoutKind::RadialTree => Traversal {
                honors_collapse: true,
                sizing: SizingBasis::OwnValue,
            },
            LayoutKind::Treemap => Traversal {
                honors_collapse: false,
                sizing: SizingBasis::LeafCount,
            },
            LayoutKind::CirclePacking | LayoutKind::Sunburst => Traversal {
                honors_collapse: false,
                sizing: SizingBasis::SubtreeValue,
            },
            LayoutKind::HierarchicalBars => Traversal {
                honors_collapse: false,
                sizing: SizingBasis::OwnValue,
            },
        }
    }
}

impl fmt::Display for LayoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for LayoutKind {
    type Err = TaxonomyError;

    fn from_str(s: &str) -> Result<Self> {
        let id = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.id() == id)
            .ok_or_else(|| TaxonomyError::UnknownLayout(s.to_string()))
    }
}

/// How a layout walks the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Traversal {
    /// Collapsed nodes hide their children.
    pub honors_collapse: bool,
    pub sizing: SizingBasis,
}

/// Turns a tree view into layout output.
pub trait LayoutAdapter {
    type Output;

    fn layout(&mut self, view: &TreeView<'_>) -> Self::Output;
}

/// Read-only view of a tree under one layout, value mode and colour policy.
pub struct TreeView<'a> {
    tree: &'a TaxonTree,
    state: &'a TreeStateStore,
    colors: &'a ColorPolicy,
    values: &'a dyn AggregationPolicy,
    kind: LayoutKind,
    traversal: Traversal,
}

impl<'a> TreeView<'a> {
    pub fn new(
        tree: &'a TaxonTree,
        state: &'a TreeStateStore,
        colors: &'a ColorPolicy,
        values: &'a dyn AggregationPolicy,
        kind: LayoutKind,
    ) -> Self {
        Self {
            tree,
            state,
            colors,
            values,
            kind,
            traversal: kind.traversal(),
        }
    }

    #[inline]
    pub fn tree(&self) -> &'a TaxonTree {
        self.tree
    }

    #[inline]
    pub fn kind(&self) -> LayoutKind {
        self.kind
    }

    #[inline]
    pub fn traversal(&self) -> Traversal {
        self.traversal
    }

    /// Label of the active value mode.
    pub fn mode_label(&self) -> String {
        self.values.label()
    }

    #[inline]
    pub fn root(&self) -> NodeIndex {
        self.tree.root()
    }

    #[inline]
    pub fn node(&self, index: NodeIndex) -> &'a TaxonNode {
        &self.tree[index]
    }

    pub fn visible_children(&self, index: NodeIndex) -> Vec<NodeIndex> {
        if self.traversal.honors_collapse {
            self.state.visible_children(self.tree, index)
        } else {
            self.tree.children(index)
        }
    }

    /// Visible children by descending size, ties broken by ascending id.
    pub fn ordered_children(&self, index: NodeIndex) -> Vec<NodeIndex> {
        let mut sized: Vec<(NodeIndex, f64)> = self
            .visible_children(index)
            .into_iter()
            .map(|child| (child, self.size(child)))
            .collect();
        sized.sort_by(|(a, a_size), (b, b_size)| {
            b_size
                .total_cmp(a_size)
                .then_with(|| self.tree[*a].id.cmp(&self.tree[*b].id))
        });
        sized.into_iter().map(|(child, _)| child).collect()
    }

    pub fn active_value(&self, index: NodeIndex) -> f64 {
        self.values.active_value(&self.tree[index])
    }

    pub fn size(&self, index: NodeIndex) -> f64 {
        match self.traversal.sizing {
            SizingBasis::OwnValue => self.active_value(index),
            SizingBasis::SubtreeValue => self.values.subtree_value(self.tree, index),
            SizingBasis::LeafCount => self.tree[index].leaf_count as f64,
        }
    }

    /// Node radius for tree charts: `log10(v + 1) + 2` of the active value.
    pub fn radius(&self, index: NodeIndex) -> f64 {
        LogScaled(self.values).active_value(&self.tree[index])
    }

    /// Custom override if set, otherwise the policy colour.
    pub fn color(&self, index: NodeIndex) -> Color {
        self.state
            .custom_color(&self.tree[index].id)
            .unwrap_or_else(|| self.colors.color_for(self.tree, index))
    }

    pub fn is_collapsed(&self, index: NodeIndex) -> bool {
        self.state.is_collapsed(&self.tree[index].id)
    }

    pub fn is_selected(&self, index: NodeIndex) -> bool {
        self.state.is_selected(&self.tree[index].id)
    }
}
