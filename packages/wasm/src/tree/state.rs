//! Per-node UI state kept beside the tree.
//!
//! State is keyed by node id (the path), so re-rendering the same tree keeps
//! collapse, selection and colour overrides, while a newly loaded dataset
//! starts from an empty store. Collapsing never touches the tree itself: a
//! collapsed node simply exposes no children through
//! [`TreeStateStore::visible_children`].

use petgraph::stable_graph::NodeIndex;
use std::collections::HashMap;

use super::builder::TaxonTree;
use crate::error::{Result, TaxonomyError};
use crate::policy::Color;

/// UI state of one node: flag byte plus optional colour override.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NodeUiState {
    flags: u8,
    custom_color: Option<Color>,
}

impl NodeUiState {
    const COLLAPSED: u8 = 0b0000_0001;
    const SELECTED: u8 = 0b0000_0010;

    #[inline]
    pub fn new() -> Self {
        Self {
            flags: 0,
            custom_color: None,
        }
    }

    /// Check if the node hides its children.
    #[inline]
    pub fn is_collapsed(self) -> bool {
        self.flags & Self::COLLAPSED != 0
    }

    #[inline]
    pub fn set_collapsed(&mut self, collapsed: bool) {
        if collapsed {
            self.flags |= Self::COLLAPSED;
        } else {
            self.flags &= !Self::COLLAPSED;
        }
    }

    /// Check if the node is selected.
    #[inline]
    pub fn is_selected(self) -> bool {
        self.flags & Self::SELECTED != 0
    }

    #[inline]
    pub fn set_selected(&mut self, selected: bool) {
        if selected {
            self.flags |= Self::SELECTED;
        } else {
            self.flags &= !Self::SELECTED;
        }
    }

    /// Get the colour override, if any.
    #[inline]
    pub fn custom_color(self) -> Option<Color> {
        self.custom_color
    }

    #[inline]
    pub fn set_custom_color(&mut self, color: Option<Color>) {
        self.custom_color = color;
    }
}

/// Outcome of a collapse toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Collapsed,
    Expanded,
    /// Leaf node; nothing to hide.
    Unchanged,
}

/// Side table of [`NodeUiState`] keyed by node id.
#[derive(Debug, Clone, Default)]
pub struct TreeStateStore {
    states: HashMap<String, NodeUiState>,
}

impl TreeStateStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of a node (default if never touched).
    pub fn state(&self, id: &str) -> NodeUiState {
        self.states.get(id).copied().unwrap_or_default()
    }

    /// Number of nodes with a state entry.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    fn entry(&mut self, id: &str) -> &mut NodeUiState {
        self.states.entry(id.to_string()).or_default()
    }

    fn resolve(tree: &TaxonTree, id: &str) -> Result<NodeIndex> {
        tree.index_of(id)
            .ok_or_else(|| TaxonomyError::UnknownNode(id.to_string()))
    }

    // =========================================================================
    // Collapse / Expand
    // =========================================================================

    /// Check if a node is collapsed.
    pub fn is_collapsed(&self, id: &str) -> bool {
        self.state(id).is_collapsed()
    }

    /// Flip a node between collapsed and expanded. Leaves are left alone.
    pub fn toggle_collapse(&mut self, tree: &TaxonTree, id: &str) -> Result<Toggle> {
        let index = Self::resolve(tree, id)?;
        if !tree.has_children(index) {
            return Ok(Toggle::Unchanged);
        }

        let state = self.entry(id);
        let collapsed = !state.is_collapsed();
        state.set_collapsed(collapsed);
        log::trace!("{id}: collapsed = {collapsed}");

        Ok(if collapsed {
            Toggle::Collapsed
        } else {
            Toggle::Expanded
        })
    }

    /// Children shown to layouts: none while collapsed.
    pub fn visible_children(&self, tree: &TaxonTree, index: NodeIndex) -> Vec<NodeIndex> {
        if self.is_collapsed(&tree[index].id) {
            Vec::new()
        } else {
            tree.children(index)
        }
    }

    /// Whether every ancestor of the node is expanded.
    pub fn is_visible(&self, tree: &TaxonTree, index: NodeIndex) -> bool {
        tree.ancestors(index)
            .all(|ancestor| !self.is_collapsed(&tree[ancestor].id))
    }

    /// Expand `id` if needed, then collapse every other visible node at the
    /// same depth. Returns the number of nodes collapsed.
    pub fn collapse_others_at_depth(&mut self, tree: &TaxonTree, id: &str) -> Result<usize> {
        let target = Self::resolve(tree, id)?;
        if self.is_collapsed(id) {
            self.entry(id).set_collapsed(false);
        }

        let depth = tree[target].depth;
        let others: Vec<NodeIndex> = tree
            .iter()
            .filter(|&(index, node)| {
                index != target
                    && node.depth == depth
                    && tree.has_children(index)
                    && !self.is_collapsed(&node.id)
                    && self.is_visible(tree, index)
            })
            .map(|(index, _)| index)
            .collect();

        for &index in &others {
            self.entry(&tree[index].id).set_collapsed(true);
        }
        Ok(others.len())
    }

    /// Expand the node itself if it shows no children, otherwise expand each
    /// of its collapsed children. Returns the number of nodes expanded.
    pub fn expand_children(&mut self, tree: &TaxonTree, id: &str) -> Result<usize> {
        let index = Self::resolve(tree, id)?;
        if self.visible_children(tree, index).is_empty() {
            return Ok(match self.toggle_collapse(tree, id)? {
                Toggle::Expanded => 1,
                // A collapsed node with no visible children always expands.
                Toggle::Collapsed | Toggle::Unchanged => 0,
            });
        }

        let mut expanded = 0;
        for child in tree.children(index) {
            let child_id = &tree[child].id;
            if self.is_collapsed(child_id) {
                self.entry(child_id).set_collapsed(false);
                expanded += 1;
            }
        }
        Ok(expanded)
    }

    /// Expand every node.
    pub fn expand_all(&mut self) {
        for state in self.states.values_mut() {
            state.set_collapsed(false);
        }
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Check if a node is selected.
    pub fn is_selected(&self, id: &str) -> bool {
        self.state(id).is_selected()
    }

    /// Select or deselect a node.
    pub fn set_selected(&mut self, tree: &TaxonTree, id: &str, selected: bool) -> Result<()> {
        Self::resolve(tree, id)?;
        self.entry(id).set_selected(selected);
        Ok(())
    }

    /// Flip selection; returns the new value.
    pub fn toggle_selected(&mut self, tree: &TaxonTree, id: &str) -> Result<bool> {
        Self::resolve(tree, id)?;
        let state = self.entry(id);
        let selected = !state.is_selected();
        state.set_selected(selected);
        Ok(selected)
    }

    /// Deselect every node.
    pub fn clear_selection(&mut self) {
        for state in self.states.values_mut() {
            state.set_selected(false);
        }
    }

    /// Selected ids, sorted.
    pub fn selected_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .states
            .iter()
            .filter(|(_, state)| state.is_selected())
            .map(|(id, _)| id.as_str())
            .collect();
        ids.sort_unstable();
        ids
    }

    // =========================================================================
    // Colour overrides
    // =========================================================================

    /// Get the colour override of a node, if any.
    pub fn custom_color(&self, id: &str) -> Option<Color> {
        self.state(id).custom_color()
    }

    /// Override the computed colour of a node.
    pub fn set_custom_color(&mut self, tree: &TaxonTree, id: &str, color: Color) -> Result<()> {
        Self::resolve(tree, id)?;
        self.entry(id).set_custom_color(Some(color));
        Ok(())
    }

    /// Drop every colour override.
    pub fn reset_colors(&mut self) {
        for state in self.states.values_mut() {
            state.set_custom_color(None);
        }
    }

    /// Forget state for ids that are not in `tree`.
    pub fn retain_existing(&mut self, tree: &TaxonTree) {
        self.states.retain(|id, _| tree.contains(id));
    }
}
