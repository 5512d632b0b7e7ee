//! One loaded dataset together with its UI state and policies.
//!
//! The explorer owns everything the chart front-end mutates between renders:
//! the tree, the per-node state store, the colour policy and the active value
//! mode. Loading a dataset either fully succeeds or leaves the previous one
//! in place.

use serde::Deserialize;

use crate::data::{ParserConfig, Rank, RankRegistry, RawRow, RowParser, TaxonClassifier};
use crate::error::{Result, TaxonomyError};
use crate::layout::{HierarchySnapshot, LayoutAdapter, LayoutKind, RenderTree, TreeView};
use crate::policy::{Color, ColorConfig, ColorPolicy, ValueMode};
use crate::tree::{HierarchyBuilder, TaxonTree, Toggle, TreeStateStore};

/// Configuration passed when the explorer is created.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExplorerConfig {
    pub parser: ParserConfig,
    pub colors: ColorConfig,
}

#[derive(Debug)]
struct Dataset {
    tree: TaxonTree,
    registry: RankRegistry,
    sample_names: Vec<String>,
}

fn loaded(dataset: &Option<Dataset>) -> Result<&Dataset> {
    dataset.as_ref().ok_or(TaxonomyError::NoDataset)
}

/// Taxonomy engine for one chart session.
#[derive(Debug)]
pub struct Explorer {
    parser: RowParser,
    dataset: Option<Dataset>,
    state: TreeStateStore,
    colors: ColorPolicy,
    mode: ValueMode,
}

impl Explorer {
    pub fn new(config: ExplorerConfig) -> Result<Self> {
        Ok(Self {
            parser: RowParser::new(config.parser),
            dataset: None,
            state: TreeStateStore::new(),
            colors: ColorPolicy::new(config.colors)?,
            mode: ValueMode::Averaged,
        })
    }

    pub fn with_defaults() -> Self {
        Self {
            parser: RowParser::with_defaults(),
            dataset: None,
            state: TreeStateStore::new(),
            colors: ColorPolicy::with_defaults(),
            mode: ValueMode::Averaged,
        }
    }

    // =========================================================================
    // Dataset
    // =========================================================================

    fn build(&self, rows: &[RawRow]) -> Result<Dataset> {
        let parsed = self.parser.parse(rows)?;
        let (classified, registry) = TaxonClassifier::classify(parsed.records)?;
        let tree = HierarchyBuilder::build(classified)?;
        Ok(Dataset {
            tree,
            registry,
            sample_names: parsed.sample_names,
        })
    }

    /// Replace the dataset. UI state, colour policy and value mode start
    /// fresh.
    ///
    /// Returns the number of nodes. On error the previous dataset is kept.
    pub fn load_rows(&mut self, rows: &[RawRow]) -> Result<usize> {
        let dataset = self.build(rows)?;
        let count = dataset.tree.len();
        log::info!(
            "loaded {count} taxa ({} samples)",
            dataset.sample_names.len()
        );

        self.dataset = Some(dataset);
        self.state = TreeStateStore::new();
        self.colors.rebuild();
        self.mode = ValueMode::Averaged;
        Ok(count)
    }

    /// Rebuild from updated rows of the same dataset, keeping the state of
    /// every node id that still exists.
    pub fn refresh_rows(&mut self, rows: &[RawRow]) -> Result<usize> {
        let dataset = self.build(rows)?;
        self.state.retain_existing(&dataset.tree);
        let sample_gone = self
            .mode
            .sample()
            .is_some_and(|sample| !dataset.sample_names.iter().any(|name| name == sample));
        if sample_gone {
            log::debug!("active sample gone after refresh, averaging");
            self.mode = ValueMode::Averaged;
        }

        let count = dataset.tree.len();
        self.dataset = Some(dataset);
        Ok(count)
    }

    pub fn is_loaded(&self) -> bool {
        self.dataset.is_some()
    }

    pub fn tree(&self) -> Result<&TaxonTree> {
        Ok(&loaded(&self.dataset)?.tree)
    }

    pub fn registry(&self) -> Result<&RankRegistry> {
        Ok(&loaded(&self.dataset)?.registry)
    }

    /// Sample names in header order; empty without a dataset.
    pub fn sample_names(&self) -> &[String] {
        self.dataset
            .as_ref()
            .map(|dataset| dataset.sample_names.as_slice())
            .unwrap_or_default()
    }

    pub fn node_count(&self) -> usize {
        self.dataset.as_ref().map_or(0, |dataset| dataset.tree.len())
    }

    #[inline]
    pub fn state(&self) -> &TreeStateStore {
        &self.state
    }

    #[inline]
    pub fn colors(&self) -> &ColorPolicy {
        &self.colors
    }

    #[inline]
    pub fn mode(&self) -> &ValueMode {
        &self.mode
    }

    // =========================================================================
    // Collapse
    // =========================================================================

    pub fn toggle_collapse(&mut self, id: &str) -> Result<Toggle> {
        let tree = &loaded(&self.dataset)?.tree;
        let toggle = self.state.toggle_collapse(tree, id)?;
        log::trace!("toggle {id}: {toggle:?}");
        Ok(toggle)
    }

    pub fn collapse_others(&mut self, id: &str) -> Result<usize> {
        let tree = &loaded(&self.dataset)?.tree;
        self.state.collapse_others_at_depth(tree, id)
    }

    pub fn expand_children(&mut self, id: &str) -> Result<usize> {
        let tree = &loaded(&self.dataset)?.tree;
        self.state.expand_children(tree, id)
    }

    pub fn expand_all(&mut self) {
        self.state.expand_all();
    }

    // =========================================================================
    // Selection
    // =========================================================================

    pub fn set_selected(&mut self, id: &str, selected: bool) -> Result<()> {
        let tree = &loaded(&self.dataset)?.tree;
        self.state.set_selected(tree, id, selected)
    }

    pub fn toggle_selected(&mut self, id: &str) -> Result<bool> {
        let tree = &loaded(&self.dataset)?.tree;
        self.state.toggle_selected(tree, id)
    }

    pub fn clear_selection(&mut self) {
        self.state.clear_selection();
    }

    pub fn selected_ids(&self) -> Vec<String> {
        self.state
            .selected_ids()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    // =========================================================================
    // Colours
    // =========================================================================

    pub fn set_custom_color(&mut self, id: &str, color: &str) -> Result<()> {
        let color: Color = color.parse()?;
        let tree = &loaded(&self.dataset)?.tree;
        self.state.set_custom_color(tree, id, color)
    }

    /// Clear every override and restore the configured palettes.
    pub fn reset_colors(&mut self) {
        self.state.reset_colors();
        self.colors.reset();
    }

    pub fn set_rank_cutoff(&mut self, rank: Rank) {
        self.colors.set_rank_cutoff(rank);
    }

    pub fn set_rank_palette(&mut self, colors: Vec<Color>) -> Result<()> {
        self.colors.set_rank_palette(colors)
    }

    pub fn set_branch_palette(&mut self, colors: Vec<Color>) -> Result<()> {
        self.colors.set_branch_palette(colors)
    }

    // =========================================================================
    // Value mode
    // =========================================================================

    /// Show one sample, or the averaged values for `None`.
    pub fn set_sample(&mut self, sample: Option<&str>) -> Result<()> {
        self.mode = match sample {
            None => ValueMode::Averaged,
            Some(name) => {
                let dataset = loaded(&self.dataset)?;
                if !dataset.sample_names.iter().any(|known| known == name) {
                    return Err(TaxonomyError::UnknownSample(name.to_string()));
                }
                ValueMode::BySample(name.to_string())
            }
        };
        Ok(())
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    /// Run any adapter over the current tree under `kind`.
    pub fn layout_with<A: LayoutAdapter>(
        &self,
        kind: LayoutKind,
        adapter: &mut A,
    ) -> Result<A::Output> {
        let tree = &loaded(&self.dataset)?.tree;
        let view = TreeView::new(tree, &self.state, &self.colors, &self.mode, kind);
        Ok(adapter.layout(&view))
    }

    pub fn render(&self, kind: LayoutKind, max_depth: Option<usize>) -> Result<RenderTree> {
        self.layout_with(kind, &mut HierarchySnapshot::new(max_depth))
    }
}

impl Default for Explorer {
    fn default() -> Self {
        Self::with_defaults()
    }
}
