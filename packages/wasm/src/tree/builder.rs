//! HierarchyBuilder and the TaxonTree it produces.
//!
//! The tree topology is stored in petgraph's StableGraph with one directed
//! edge per parent→child link, alongside a map from node id (the path) to
//! graph index. Every record's parent key is its path with the final
//! `@segment` stripped; a record whose parent key has no record is an error,
//! as is more than one parentless record. No partial tree is ever returned.

use petgraph::stable_graph::{NodeIndex, StableGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use petgraph::{Directed, Direction};
use std::collections::HashMap;
use std::ops::Index;

use super::node::TaxonNode;
use crate::data::{ClassifiedRecord, PATH_SEPARATOR, parent_path};
use crate::error::{Result, TaxonomyError};

/// An immutable taxonomy tree.
///
/// Node indices are only meaningful for the tree that produced them; ids
/// (paths) are the stable handle across re-renders.
#[derive(Debug, Clone)]
pub struct TaxonTree {
    /// Topology: nodes carry their data, edges point parent → child.
    graph: StableGraph<TaxonNode, (), Directed>,

    /// Map from node id (path) to graph index.
    index_by_id: HashMap<String, NodeIndex>,

    root: NodeIndex,
}

impl TaxonTree {
    /// Index of the single root node.
    #[inline]
    pub fn root(&self) -> NodeIndex {
        self.root
    }

    /// Get the root node.
    pub fn root_node(&self) -> &TaxonNode {
        &self.graph[self.root]
    }

    /// Get a node by graph index.
    pub fn node(&self, index: NodeIndex) -> Option<&TaxonNode> {
        self.graph.node_weight(index)
    }

    /// Look up the graph index of a node id.
    pub fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.index_by_id.get(id).copied()
    }

    /// Get a node by id.
    pub fn get(&self, id: &str) -> Option<&TaxonNode> {
        self.index_of(id).and_then(|index| self.node(index))
    }

    /// Check if a node id is part of this tree.
    pub fn contains(&self, id: &str) -> bool {
        self.index_by_id.contains_key(id)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Depth of the deepest node.
    pub fn max_depth(&self) -> usize {
        self.graph
            .node_indices()
            .map(|index| self.graph[index].depth)
            .max()
            .unwrap_or(0)
    }

    /// Get the parent of a node (`None` for the root).
    pub fn parent(&self, index: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .neighbors_directed(index, Direction::Incoming)
            .next()
    }

    /// Children of a node, sorted by id.
    pub fn children(&self, index: NodeIndex) -> Vec<NodeIndex> {
        let mut children: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(index, Direction::Outgoing)
            .collect();
        children.sort_by(|&a, &b| self.graph[a].id.cmp(&self.graph[b].id));
        children
    }

    /// Check if a node has at least one child.
    pub fn has_children(&self, index: NodeIndex) -> bool {
        self.graph
            .neighbors_directed(index, Direction::Outgoing)
            .next()
            .is_some()
    }

    /// Ancestors from the parent up to the root.
    pub fn ancestors(&self, index: NodeIndex) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.parent(index),
        }
    }

    /// The node and all of its descendants in pre-order.
    pub fn descendants(&self, index: NodeIndex) -> Vec<NodeIndex> {
        let mut order = Vec::new();
        let mut stack = vec![index];
        while let Some(current) = stack.pop() {
            order.push(current);
            stack.extend(self.children(current).into_iter().rev());
        }
        order
    }

    /// All nodes in pre-order from the root.
    pub fn iter(&self) -> impl Iterator<Item = (NodeIndex, &TaxonNode)> {
        self.descendants(self.root)
            .into_iter()
            .map(move |index| (index, &self.graph[index]))
    }

    /// Fill `avg_proportion`, `subtree_value` and `leaf_count`.
    fn compute_aggregates(&mut self) {
        // Each proportion only needs the immediate parent's value.
        let links: Vec<(NodeIndex, NodeIndex)> = self
            .graph
            .edge_references()
            .map(|edge| (edge.source(), edge.target()))
            .collect();
        for (parent, child) in links {
            let parent_value = self.graph[parent].value;
            let node = &mut self.graph[child];
            node.avg_proportion = Some(if parent_value == 0.0 {
                0.0
            } else {
                node.value / parent_value
            });
        }

        // Reverse pre-order visits every child before its parent.
        for index in self.descendants(self.root).into_iter().rev() {
            let children = self.children(index);
            if children.is_empty() {
                continue;
            }
            let (sum, leaves) = children.iter().fold((0.0, 0), |(sum, leaves), &child| {
                let child = &self.graph[child];
                (sum + child.subtree_value, leaves + child.leaf_count)
            });
            let node = &mut self.graph[index];
            node.subtree_value = node.value + sum;
            node.leaf_count = leaves;
        }
    }
}

impl Index<NodeIndex> for TaxonTree {
    type Output = TaxonNode;

    fn index(&self, index: NodeIndex) -> &TaxonNode {
        &self.graph[index]
    }
}

/// Iterator over a node's ancestors, nearest first.
pub struct Ancestors<'a> {
    tree: &'a TaxonTree,
    next: Option<NodeIndex>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeIndex;

    fn next(&mut self) -> Option<NodeIndex> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}

/// Links classified records into a [`TaxonTree`].
pub struct HierarchyBuilder;

impl HierarchyBuilder {
    /// Build the tree.
    ///
    /// Records are linked shallowest first (ties by id), so every parent is
    /// in place before its children and error reporting is deterministic.
    pub fn build(mut records: Vec<ClassifiedRecord>) -> Result<TaxonTree> {
        if records.is_empty() {
            return Err(TaxonomyError::EmptyDataset);
        }

        records.sort_by(|a, b| {
            depth_of(&a.record.path)
                .cmp(&depth_of(&b.record.path))
                .then_with(|| a.record.path.cmp(&b.record.path))
        });

        // Sorted input puts equal paths next to each other.
        if let Some(pair) = records
            .windows(2)
            .find(|pair| pair[0].record.path == pair[1].record.path)
        {
            return Err(TaxonomyError::DuplicateNode(pair[0].record.path.clone()));
        }

        let roots: Vec<String> = records
            .iter()
            .filter(|classified| parent_path(&classified.record.path).is_none())
            .map(|classified| classified.record.path.clone())
            .collect();
        if roots.len() > 1 {
            return Err(TaxonomyError::MultipleRoots(roots));
        }

        let count = records.len();
        let mut graph = StableGraph::with_capacity(count, count.saturating_sub(1));
        let mut index_by_id: HashMap<String, NodeIndex> = HashMap::with_capacity(count);

        for classified in records {
            let id = classified.record.path.clone();

            let parent = match parent_path(&id) {
                Some(parent_id) => Some(index_by_id.get(parent_id).copied().ok_or_else(|| {
                    TaxonomyError::OrphanNode {
                        id: id.clone(),
                        parent: parent_id.to_string(),
                    }
                })?),
                None => None,
            };

            let index = graph.add_node(TaxonNode::from_record(classified));
            if let Some(parent) = parent {
                graph.add_edge(parent, index, ());
            }
            index_by_id.insert(id, index);
        }

        // With no parentless record the shallowest record is an orphan, which
        // the loop above has already reported.
        let root = roots
            .first()
            .and_then(|id| index_by_id.get(id))
            .copied()
            .ok_or(TaxonomyError::EmptyDataset)?;

        let mut tree = TaxonTree {
            graph,
            index_by_id,
            root,
        };
        tree.compute_aggregates();

        log::info!(
            "built taxonomy tree: {} nodes, max depth {}",
            tree.len(),
            tree.max_depth()
        );
        Ok(tree)
    }
}

fn depth_of(path: &str) -> usize {
    path.matches(PATH_SEPARATOR).count()
}
