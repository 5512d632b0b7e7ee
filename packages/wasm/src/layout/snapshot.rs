//! Serialisable render tree handed to the chart front-end.

use petgraph::stable_graph::NodeIndex;
use serde::Serialize;

use super::{LayoutAdapter, TreeView};
use crate::policy::Color;

/// One node as the front-end draws it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderNode {
    pub id: String,
    pub taxon: String,
    pub rank: &'static str,
    pub depth: usize,
    /// Active value under the current mode.
    pub value: f64,
    pub log_intensity: f64,
    /// Number the chart sizes the node by.
    pub size: f64,
    /// Circle radius; only tree charts draw node circles.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    pub color: Color,
    pub avg_proportion: Option<f64>,
    pub collapsed: bool,
    pub selected: bool,
    /// Children left out by collapse or by the depth limit.
    pub hidden_children: usize,
    pub children: Vec<RenderNode>,
}

impl RenderNode {
    /// Number of nodes in this subtree, including itself.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(RenderNode::count).sum::<usize>()
    }

    pub fn find(&self, id: &str) -> Option<&RenderNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }
}

/// A rendered hierarchy plus the context it was rendered in.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderTree {
    pub layout: &'static str,
    /// Active sample, or "Averaged".
    pub sample: String,
    pub root: RenderNode,
}

/// Snapshots the visible hierarchy, optionally cut at `max_depth`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HierarchySnapshot {
    pub max_depth: Option<usize>,
}

impl HierarchySnapshot {
    pub fn new(max_depth: Option<usize>) -> Self {
        Self { max_depth }
    }

    fn snapshot(&self, view: &TreeView<'_>, index: NodeIndex) -> RenderNode {
        let node = view.node(index);
        let total_children = view.tree().children(index).len();

        let children = match self.max_depth {
            Some(limit) if node.depth >= limit => Vec::new(),
            _ => view
                .ordered_children(index)
                .into_iter()
                .map(|child| self.snapshot(view, child))
                .collect(),
        };

        RenderNode {
            id: node.id.clone(),
            taxon: node.taxon.clone(),
            rank: node.rank.label(),
            depth: node.depth,
            value: view.active_value(index),
            log_intensity: node.log_intensity,
            size: view.size(index),
            radius: view
                .traversal()
                .honors_collapse
                .then(|| view.radius(index)),
            color: view.color(index),
            avg_proportion: node.avg_proportion,
            collapsed: view.is_collapsed(index),
            selected: view.is_selected(index),
            hidden_children: total_children - children.len(),
            children,
        }
    }
}

impl LayoutAdapter for HierarchySnapshot {
    type Output = RenderTree;

    fn layout(&mut self, view: &TreeView<'_>) -> RenderTree {
        RenderTree {
            layout: view.kind().id(),
            sample: view.mode_label(),
            root: self.snapshot(view, view.root()),
        }
    }
}
