//! Taxoview - WASM Module
//!
//! This module builds taxonomy hierarchies from mass-spec intensity tables
//! and keeps the per-node chart state (collapse, selection, colours) that a
//! D3 front-end needs between renders. It is compiled to WebAssembly and
//! exposes a JavaScript-friendly API via wasm-bindgen.
//!
//! # Architecture
//!
//! - `data`: row validation and rank classification
//! - `tree`: the taxonomy tree (petgraph StableGraph) and its UI state table
//! - `policy`: active-value and colour resolution
//! - `layout`: chart-type dispatch and the serialisable render tree
//! - `explorer`: one loaded dataset with its state and policies

use js_sys::Array;
use serde::Serialize;
use wasm_bindgen::prelude::*;

pub mod data;
pub mod error;
pub mod explorer;
pub mod layout;
pub mod logging;
pub mod policy;
pub mod tree;

use data::{Rank, RawRow};
use explorer::{Explorer, ExplorerConfig};
use layout::LayoutKind;
use policy::Color;
use tree::Toggle;

/// Initialize the WASM module.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    logging::init(log::LevelFilter::Info);
}

/// Change the console log level ("error", "warn", "info", "debug", "trace", "off").
#[wasm_bindgen(js_name = setLogLevel)]
pub fn set_log_level(level: &str) -> bool {
    match level.parse::<log::LevelFilter>() {
        Ok(filter) => {
            logging::init(filter);
            true
        }
        Err(_) => false,
    }
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsError> {
    let serializer = serde_wasm_bindgen::Serializer::new().serialize_maps_as_objects(true);
    Ok(value.serialize(&serializer)?)
}

fn string_array<'a>(items: impl IntoIterator<Item = &'a str>) -> Array {
    items.into_iter().map(JsValue::from_str).collect()
}

fn parse_palette(colors: &[String]) -> error::Result<Vec<Color>> {
    colors.iter().map(|color| color.parse()).collect()
}

/// Main entry point for the taxonomy engine.
///
/// This struct wraps the internal [`Explorer`] and provides the public API
/// exposed to JavaScript.
#[wasm_bindgen]
pub struct TaxoviewWasm {
    explorer: Explorer,
}

#[wasm_bindgen]
impl TaxoviewWasm {
    /// Create an engine. `config` may be omitted for the defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<TaxoviewWasm, JsError> {
        let config: ExplorerConfig = if config.is_undefined() || config.is_null() {
            ExplorerConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)?
        };
        Ok(Self {
            explorer: Explorer::new(config)?,
        })
    }

    // =========================================================================
    // Dataset
    // =========================================================================

    /// Load an array of row objects, replacing the current dataset.
    ///
    /// Returns the number of nodes. On error the previous dataset stays.
    #[wasm_bindgen(js_name = loadRows)]
    pub fn load_rows(&mut self, rows: JsValue) -> Result<u32, JsError> {
        let rows: Vec<RawRow> = serde_wasm_bindgen::from_value(rows)?;
        Ok(self.explorer.load_rows(&rows)? as u32)
    }

    /// Reload rows of the same dataset, keeping state for surviving nodes.
    #[wasm_bindgen(js_name = refreshRows)]
    pub fn refresh_rows(&mut self, rows: JsValue) -> Result<u32, JsError> {
        let rows: Vec<RawRow> = serde_wasm_bindgen::from_value(rows)?;
        Ok(self.explorer.refresh_rows(&rows)? as u32)
    }

    #[wasm_bindgen(js_name = nodeCount)]
    pub fn node_count(&self) -> u32 {
        self.explorer.node_count() as u32
    }

    #[wasm_bindgen(js_name = sampleNames)]
    pub fn sample_names(&self) -> Array {
        string_array(self.explorer.sample_names().iter().map(String::as_str))
    }

    /// Distinct taxa per rank, as `{ "Phylum": ["Chordata", ...], ... }`.
    #[wasm_bindgen(js_name = identifiedTaxa)]
    pub fn identified_taxa(&self) -> Result<JsValue, JsError> {
        to_js(self.explorer.registry()?)
    }

    // =========================================================================
    // Collapse / Expand
    // =========================================================================

    /// Toggle a node. Returns true if it is now collapsed.
    #[wasm_bindgen(js_name = toggleCollapse)]
    pub fn toggle_collapse(&mut self, id: &str) -> Result<bool, JsError> {
        Ok(self.explorer.toggle_collapse(id)? == Toggle::Collapsed)
    }

    #[wasm_bindgen(js_name = collapseOthers)]
    pub fn collapse_others(&mut self, id: &str) -> Result<u32, JsError> {
        Ok(self.explorer.collapse_others(id)? as u32)
    }

    #[wasm_bindgen(js_name = expandChildren)]
    pub fn expand_children(&mut self, id: &str) -> Result<u32, JsError> {
        Ok(self.explorer.expand_children(id)? as u32)
    }

    #[wasm_bindgen(js_name = expandAll)]
    pub fn expand_all(&mut self) {
        self.explorer.expand_all();
    }

    // =========================================================================
    // Selection
    // =========================================================================

    #[wasm_bindgen(js_name = setSelected)]
    pub fn set_selected(&mut self, id: &str, selected: bool) -> Result<(), JsError> {
        Ok(self.explorer.set_selected(id, selected)?)
    }

    #[wasm_bindgen(js_name = toggleSelected)]
    pub fn toggle_selected(&mut self, id: &str) -> Result<bool, JsError> {
        Ok(self.explorer.toggle_selected(id)?)
    }

    #[wasm_bindgen(js_name = clearSelection)]
    pub fn clear_selection(&mut self) {
        self.explorer.clear_selection();
    }

    #[wasm_bindgen(js_name = selectedIds)]
    pub fn selected_ids(&self) -> Array {
        let ids = self.explorer.selected_ids();
        string_array(ids.iter().map(String::as_str))
    }

    // =========================================================================
    // Colours
    // =========================================================================

    #[wasm_bindgen(js_name = setCustomColor)]
    pub fn set_custom_color(&mut self, id: &str, color: &str) -> Result<(), JsError> {
        Ok(self.explorer.set_custom_color(id, color)?)
    }

    /// Clear colour overrides and restore the configured palettes.
    #[wasm_bindgen(js_name = resetColors)]
    pub fn reset_colors(&mut self) {
        self.explorer.reset_colors();
    }

    /// Set the colour cutoff from a rank slider position (clamped to the
    /// ladder). Returns the rank label.
    #[wasm_bindgen(js_name = setRankCutoff)]
    pub fn set_rank_cutoff(&mut self, position: u32) -> String {
        let last = Rank::ALL.len() - 1;
        let rank = Rank::ALL[(position as usize).min(last)];
        self.explorer.set_rank_cutoff(rank);
        rank.label().to_string()
    }

    #[wasm_bindgen(js_name = rankCutoff)]
    pub fn rank_cutoff(&self) -> String {
        self.explorer.colors().rank_cutoff().label().to_string()
    }

    #[wasm_bindgen(js_name = setRankPalette)]
    pub fn set_rank_palette(&mut self, colors: Vec<String>) -> Result<(), JsError> {
        Ok(self.explorer.set_rank_palette(parse_palette(&colors)?)?)
    }

    #[wasm_bindgen(js_name = setBranchPalette)]
    pub fn set_branch_palette(&mut self, colors: Vec<String>) -> Result<(), JsError> {
        Ok(self.explorer.set_branch_palette(parse_palette(&colors)?)?)
    }

    // =========================================================================
    // Value mode
    // =========================================================================

    /// Show one sample; `null` switches back to averaged values.
    #[wasm_bindgen(js_name = setSample)]
    pub fn set_sample(&mut self, sample: Option<String>) -> Result<(), JsError> {
        Ok(self.explorer.set_sample(sample.as_deref())?)
    }

    #[wasm_bindgen(js_name = activeSample)]
    pub fn active_sample(&self) -> Option<String> {
        self.explorer.mode().sample().map(str::to_string)
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    /// Render tree for a chart id such as `"sunburst"`, optionally cut at
    /// `maxDepth`.
    pub fn render(&self, kind: &str, max_depth: Option<u32>) -> Result<JsValue, JsError> {
        let kind: LayoutKind = kind.parse()?;
        let rendered = self
            .explorer
            .render(kind, max_depth.map(|depth| depth as usize))?;
        to_js(&rendered)
    }
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use crate::error::TaxonomyError;
    use serde_json::json;

    /// Rows as the upload collaborator hands them over (JSON objects).
    fn rows(value: serde_json::Value) -> Vec<RawRow> {
        serde_json::from_value(value).unwrap()
    }

    fn loaded(value: serde_json::Value) -> Explorer {
        let mut explorer = Explorer::with_defaults();
        explorer.load_rows(&rows(value)).unwrap();
        explorer
    }

    #[test]
    fn test_abc_end_to_end() {
        let explorer = loaded(json!([
            {"id": "A", "value": 10},
            {"id": "A@B", "value": 4},
            {"id": "A@C", "value": "6"},
        ]));

        let tree = explorer.tree().unwrap();
        assert_eq!(tree.root_node().id, "A");
        let children: Vec<&str> = tree
            .children(tree.root())
            .into_iter()
            .map(|ix| tree[ix].taxon.as_str())
            .collect();
        assert_eq!(children, ["B", "C"]);

        let b = tree.get("A@B").unwrap().avg_proportion.unwrap();
        let c = tree.get("A@C").unwrap().avg_proportion.unwrap();
        assert!((b - 0.4).abs() < 1e-9);
        assert!((c - 0.6).abs() < 1e-9);

        for (index, node) in tree.iter() {
            if let Some(parent) = tree.parent(index) {
                assert_eq!(node.id, format!("{}@{}", tree[parent].id, node.taxon));
            }
        }
    }

    #[test]
    fn test_phylum_from_both_ladders() {
        let explorer = loaded(json!([
            {"id": "Cellular organisms", "value": 100},
            {"id": "Cellular organisms@Bacteria", "value": 60},
            {"id": "Cellular organisms@Bacteria@Proteobacteria", "value": 50},
            {"id": "Cellular organisms@Eukaryota", "value": 40},
            {"id": "Cellular organisms@Eukaryota@Metazoa", "value": 30},
            {"id": "Cellular organisms@Eukaryota@Metazoa@Chordata", "value": 20},
        ]));

        let rendered = explorer.render(LayoutKind::HierarchicalBars, None).unwrap();
        let proteobacteria = rendered
            .root
            .find("Cellular organisms@Bacteria@Proteobacteria")
            .unwrap();
        let chordata = rendered
            .root
            .find("Cellular organisms@Eukaryota@Metazoa@Chordata")
            .unwrap();
        assert_eq!(proteobacteria.rank, "Phylum");
        assert_eq!(chordata.rank, "Phylum");

        let registry = explorer.registry().unwrap();
        let phyla: Vec<&str> = registry.taxa(Rank::Phylum).collect();
        assert_eq!(phyla, ["Chordata", "Proteobacteria"]);
        assert!(registry.taxa(Rank::Kingdom).eq(["Metazoa"]));
    }

    #[test]
    fn test_sample_switching() {
        let mut explorer = loaded(json!([
            {"id": "A", "value": 10, "Intensity s1;Intensity s2": "7;3"},
            {"id": "A@B", "value": 4, "Intensity s1;Intensity s2": "4;0"},
        ]));
        assert_eq!(explorer.sample_names(), ["s1", "s2"]);

        let averaged = explorer.render(LayoutKind::CirclePacking, None).unwrap();
        explorer.set_sample(Some("s2")).unwrap();
        let s2 = explorer.render(LayoutKind::CirclePacking, None).unwrap();
        assert_eq!(s2.sample, "s2");
        assert_eq!(s2.root.value, 3.0);
        assert_eq!(s2.root.find("A@B").unwrap().value, 0.0);

        explorer.set_sample(None).unwrap();
        let back = explorer.render(LayoutKind::CirclePacking, None).unwrap();
        assert_eq!(back, averaged);
        assert_eq!(back.root.size, 14.0);
    }

    #[test]
    fn test_sample_count_mismatch_aborts_load() {
        let mut explorer = Explorer::with_defaults();
        let result = explorer.load_rows(&rows(json!([
            {"id": "A", "value": 1, "s1;s2;s3;s4": "1;2;3;4"},
            {"id": "A@B", "value": 1, "s1;s2;s3;s4": "1;2;3"},
        ])));

        assert!(matches!(result, Err(TaxonomyError::MalformedRow { row: 1, .. })));
        assert!(!explorer.is_loaded());
    }

    #[test]
    fn test_collapse_round_trip_through_render() {
        let mut explorer = loaded(json!([
            {"id": "A", "value": 10},
            {"id": "A@B", "value": 4},
            {"id": "A@C", "value": 6},
            {"id": "A@B@D", "value": 1},
            {"id": "A@B@E", "value": 2},
        ]));

        let before = explorer.render(LayoutKind::RadialTree, None).unwrap();
        assert_eq!(explorer.toggle_collapse("A@B").unwrap(), Toggle::Collapsed);

        let collapsed = explorer.render(LayoutKind::RadialTree, None).unwrap();
        assert_eq!(collapsed.root.count(), 3);
        // Non-tree charts ignore collapse.
        let sunburst = explorer.render(LayoutKind::Sunburst, None).unwrap();
        assert_eq!(sunburst.root.count(), 5);

        assert_eq!(explorer.toggle_collapse("A@B").unwrap(), Toggle::Expanded);
        assert_eq!(explorer.render(LayoutKind::RadialTree, None).unwrap(), before);
        assert_eq!(explorer.toggle_collapse("A@B@D").unwrap(), Toggle::Unchanged);
    }

    #[test]
    fn test_state_survives_rerender_not_reload() {
        let data = json!([
            {"id": "A", "value": 10},
            {"id": "A@B", "value": 4},
        ]);
        let mut explorer = loaded(data.clone());
        explorer.set_selected("A@B", true).unwrap();
        explorer.set_custom_color("A@B", "#00f").unwrap();

        for _ in 0..2 {
            let rendered = explorer.render(LayoutKind::Treemap, Some(3)).unwrap();
            let b = rendered.root.find("A@B").unwrap();
            assert!(b.selected);
            assert_eq!(b.color, Color::new(0, 0, 255));
        }

        explorer.load_rows(&rows(data)).unwrap();
        let rendered = explorer.render(LayoutKind::Treemap, Some(3)).unwrap();
        assert!(!rendered.root.find("A@B").unwrap().selected);
    }

    #[test]
    fn test_invalid_input_is_reported() {
        let mut explorer = Explorer::with_defaults();
        assert!(matches!(
            explorer.load_rows(&rows(json!([{"id": "A", "value": 1}, {"id": "B", "value": 1}]))),
            Err(TaxonomyError::MultipleRoots(_))
        ));
        assert!(matches!(
            explorer.load_rows(&rows(json!([{"id": "A", "value": 1}, {"id": "A@B@C", "value": 1}]))),
            Err(TaxonomyError::OrphanNode { .. })
        ));
        assert_eq!(explorer.load_rows(&[]), Err(TaxonomyError::EmptyDataset));
        assert_eq!(
            "bubble".parse::<LayoutKind>(),
            Err(TaxonomyError::UnknownLayout("bubble".to_string()))
        );
    }

    #[test]
    fn test_parse_palette() {
        assert_eq!(
            parse_palette(&["#000".to_string(), "#ffffff".to_string()]).unwrap(),
            [Color::new(0, 0, 0), Color::new(255, 255, 255)]
        );
        assert!(parse_palette(&["nope".to_string()]).is_err());
    }
}
