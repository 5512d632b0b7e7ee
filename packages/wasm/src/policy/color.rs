//! Node colouring by taxonomic rank or by branch.
//!
//! Nodes shallower than the rank cutoff take the rank palette colour of their
//! rank. Nodes at the cutoff take the branch palette colour of their own
//! taxon, and deeper nodes inherit the branch colour of their nearest
//! ancestor at or above the cutoff. Bacteria and archaea have no kingdom, so
//! with a kingdom cutoff their lineages anchor on the superkingdom.

use petgraph::stable_graph::NodeIndex;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::data::Rank;
use crate::error::{Result, TaxonomyError};
use crate::tree::TaxonTree;

/// An RGB colour, written as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb` or `#rgb` (the leading `#` is optional).
    pub fn parse_hex(text: &str) -> Result<Self> {
        let invalid = || TaxonomyError::InvalidColor(text.to_string());
        let hex = text.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if !hex.is_ascii() {
            return Err(invalid());
        }

        let channel = |digits: &str| u8::from_str_radix(digits, 16).map_err(|_| invalid());
        match hex.len() {
            6 => Ok(Self::new(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            3 => {
                let short = |i: usize| channel(&hex[i..=i]).map(|v| v * 17);
                Ok(Self::new(short(0)?, short(1)?, short(2)?))
            }
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = TaxonomyError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_hex(s)
    }
}

impl TryFrom<String> for Color {
    type Error = TaxonomyError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse_hex(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

const fn hex(rgb: u32) -> Color {
    Color::new((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
}

/// D3 `schemePastel1`, the default rank palette.
pub const PASTEL1: [Color; 9] = [
    hex(0xfbb4ae),
    hex(0xb3cde3),
    hex(0xccebc5),
    hex(0xdecbe4),
    hex(0xfed9a6),
    hex(0xffffcc),
    hex(0xe5d8bd),
    hex(0xfddaec),
    hex(0xf2f2f2),
];

/// D3 `schemeSet3`, the default branch palette.
pub const SET3: [Color; 12] = [
    hex(0x8dd3c7),
    hex(0xffffb3),
    hex(0xbebada),
    hex(0xfb8072),
    hex(0x80b1d3),
    hex(0xfdb462),
    hex(0xb3de69),
    hex(0xfccde5),
    hex(0xd9d9d9),
    hex(0xbc80bd),
    hex(0xccebc5),
    hex(0xffed6f),
];

/// Colour configuration for a dataset.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ColorConfig {
    /// Rank at which branch colouring starts.
    pub rank_cutoff: Rank,
    /// One colour per rank level (wraps if shorter than the rank ladder).
    pub rank_palette: Vec<Color>,
    /// Colours handed out to branch taxa in first-use order.
    pub branch_palette: Vec<Color>,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            rank_cutoff: Rank::Kingdom,
            rank_palette: PASTEL1.to_vec(),
            branch_palette: SET3.to_vec(),
        }
    }
}

/// Ordinal colour scale over taxon names.
///
/// A taxon gets the next palette slot the first time it is asked for and
/// keeps it afterwards, even if the palette colours are replaced.
#[derive(Debug, Clone)]
pub struct BranchPalette {
    colors: Vec<Color>,
    slots: RefCell<HashMap<String, usize>>,
}

impl BranchPalette {
    pub fn new(colors: Vec<Color>) -> Result<Self> {
        if colors.is_empty() {
            return Err(TaxonomyError::InvalidPalette);
        }
        Ok(Self {
            colors,
            slots: RefCell::new(HashMap::new()),
        })
    }

    pub fn color(&self, taxon: &str) -> Color {
        let mut slots = self.slots.borrow_mut();
        let next = slots.len();
        let slot = *slots.entry(taxon.to_string()).or_insert(next);
        self.colors[slot % self.colors.len()]
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    fn set_colors(&mut self, colors: Vec<Color>) -> Result<()> {
        if colors.is_empty() {
            return Err(TaxonomyError::InvalidPalette);
        }
        self.colors = colors;
        Ok(())
    }
}

/// Rank cutoff plus rank and branch palettes.
#[derive(Debug, Clone)]
pub struct ColorPolicy {
    rank_cutoff: Rank,
    rank_palette: Vec<Color>,
    branch_palette: BranchPalette,
    defaults: ColorConfig,
}

impl ColorPolicy {
    pub fn new(config: ColorConfig) -> Result<Self> {
        if config.rank_palette.is_empty() {
            return Err(TaxonomyError::InvalidPalette);
        }
        Ok(Self {
            rank_cutoff: config.rank_cutoff,
            rank_palette: config.rank_palette.clone(),
            branch_palette: BranchPalette::new(config.branch_palette.clone())?,
            defaults: config,
        })
    }

    pub fn with_defaults() -> Self {
        let config = ColorConfig::default();
        Self {
            rank_cutoff: config.rank_cutoff,
            rank_palette: config.rank_palette.clone(),
            branch_palette: BranchPalette {
                colors: config.branch_palette.clone(),
                slots: RefCell::new(HashMap::new()),
            },
            defaults: config,
        }
    }

    #[inline]
    pub fn rank_cutoff(&self) -> Rank {
        self.rank_cutoff
    }

    pub fn set_rank_cutoff(&mut self, rank: Rank) {
        log::trace!("rank cutoff -> {rank}");
        self.rank_cutoff = rank;
    }

    pub fn rank_palette(&self) -> &[Color] {
        &self.rank_palette
    }

    pub fn set_rank_palette(&mut self, colors: Vec<Color>) -> Result<()> {
        if colors.is_empty() {
            return Err(TaxonomyError::InvalidPalette);
        }
        self.rank_palette = colors;
        Ok(())
    }

    pub fn set_branch_palette(&mut self, colors: Vec<Color>) -> Result<()> {
        self.branch_palette.set_colors(colors)
    }

    /// Restore the configured palettes. The rank cutoff is kept.
    pub fn reset(&mut self) {
        self.rank_palette = self.defaults.rank_palette.clone();
        self.branch_palette.colors = self.defaults.branch_palette.clone();
    }

    /// Return to the configured state for a new dataset: default cutoff and
    /// palettes, and no branch colours handed out yet.
    pub fn rebuild(&mut self) {
        self.rank_cutoff = self.defaults.rank_cutoff;
        self.reset();
        self.branch_palette.slots.get_mut().clear();
    }

    pub fn rank_color(&self, rank: Rank) -> Color {
        self.rank_palette[rank.index() % self.rank_palette.len()]
    }

    pub fn branch_color(&self, taxon: &str) -> Color {
        self.branch_palette.color(taxon)
    }

    /// Computed colour of a node (ignores per-node overrides).
    pub fn color_for(&self, tree: &TaxonTree, index: NodeIndex) -> Color {
        let node = &tree[index];
        let cutoff = self.rank_cutoff;

        if node.rank < cutoff {
            return self.rank_color(node.rank);
        }
        if node.rank == cutoff {
            return self.branch_color(&node.taxon);
        }

        let anchor = tree
            .ancestors(index)
            .find(|&ancestor| tree[ancestor].rank <= cutoff)
            .unwrap_or_else(|| tree.root());
        self.branch_color(&tree[anchor].taxon)
    }
}

impl Default for ColorPolicy {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::test_support::tree_from;

    fn lineage_tree() -> TaxonTree {
        tree_from(&[
            ("Cellular organisms", 100.0),
            ("Cellular organisms@Bacteria", 60.0),
            ("Cellular organisms@Bacteria@Proteobacteria", 50.0),
            ("Cellular organisms@Bacteria@Proteobacteria@Gammaproteobacteria", 40.0),
            ("Cellular organisms@Eukaryota", 30.0),
            ("Cellular organisms@Eukaryota@Metazoa", 25.0),
            ("Cellular organisms@Eukaryota@Metazoa@Chordata", 20.0),
            ("Cellular organisms@Eukaryota@Viridiplantae", 5.0),
        ])
    }

    fn color_of(policy: &ColorPolicy, tree: &TaxonTree, id: &str) -> Color {
        policy.color_for(tree, tree.index_of(id).unwrap())
    }

    #[test]
    fn test_parse_hex() {
        assert_eq!(Color::parse_hex("#fbb4ae").unwrap(), Color::new(0xfb, 0xb4, 0xae));
        assert_eq!(Color::parse_hex("0f0").unwrap(), Color::new(0, 255, 0));
        assert_eq!("#ABCDEF".parse::<Color>().unwrap().to_string(), "#abcdef");
        assert!(Color::parse_hex("#12345").is_err());
        assert!(Color::parse_hex("#gggggg").is_err());
        assert!(Color::parse_hex("#ééé").is_err());
    }

    #[test]
    fn test_default_palettes_match_d3() {
        assert_eq!(PASTEL1[0].to_string(), "#fbb4ae");
        assert_eq!(SET3[11].to_string(), "#ffed6f");
    }

    #[test]
    fn test_shallow_nodes_use_rank_palette() {
        let tree = lineage_tree();
        let policy = ColorPolicy::with_defaults();

        assert_eq!(color_of(&policy, &tree, "Cellular organisms"), PASTEL1[0]);
        assert_eq!(color_of(&policy, &tree, "Cellular organisms@Eukaryota"), PASTEL1[1]);
    }

    #[test]
    fn test_node_at_cutoff_uses_own_taxon() {
        let tree = lineage_tree();
        let policy = ColorPolicy::with_defaults();

        let metazoa = color_of(&policy, &tree, "Cellular organisms@Eukaryota@Metazoa");
        assert_eq!(metazoa, policy.branch_color("Metazoa"));
        let plants = color_of(&policy, &tree, "Cellular organisms@Eukaryota@Viridiplantae");
        assert_ne!(metazoa, plants);
    }

    #[test]
    fn test_deeper_nodes_inherit_branch_color() {
        let tree = lineage_tree();
        let policy = ColorPolicy::with_defaults();

        assert_eq!(
            color_of(&policy, &tree, "Cellular organisms@Eukaryota@Metazoa@Chordata"),
            color_of(&policy, &tree, "Cellular organisms@Eukaryota@Metazoa")
        );
    }

    #[test]
    fn test_kingdomless_lineage_anchors_on_superkingdom() {
        let tree = lineage_tree();
        let policy = ColorPolicy::with_defaults();

        // Bacteria is a superkingdom, shallower than the kingdom cutoff, so it
        // keeps its rank colour while its descendants share a branch colour.
        assert_eq!(color_of(&policy, &tree, "Cellular organisms@Bacteria"), PASTEL1[1]);
        let phylum = color_of(&policy, &tree, "Cellular organisms@Bacteria@Proteobacteria");
        assert_eq!(phylum, policy.branch_color("Bacteria"));
        assert_eq!(
            color_of(
                &policy,
                &tree,
                "Cellular organisms@Bacteria@Proteobacteria@Gammaproteobacteria"
            ),
            phylum
        );
    }

    #[test]
    fn test_cutoff_change() {
        let tree = lineage_tree();
        let mut policy = ColorPolicy::with_defaults();
        policy.set_rank_cutoff(Rank::Phylum);

        assert_eq!(
            color_of(&policy, &tree, "Cellular organisms@Eukaryota@Metazoa"),
            PASTEL1[Rank::Kingdom.index()]
        );
        assert_eq!(
            color_of(&policy, &tree, "Cellular organisms@Bacteria@Proteobacteria@Gammaproteobacteria"),
            policy.branch_color("Proteobacteria")
        );
    }

    #[test]
    fn test_branch_palette_is_ordinal() {
        let palette = BranchPalette::new(vec![Color::new(1, 1, 1), Color::new(2, 2, 2)]).unwrap();
        assert_eq!(palette.color("x"), Color::new(1, 1, 1));
        assert_eq!(palette.color("y"), Color::new(2, 2, 2));
        assert_eq!(palette.color("z"), Color::new(1, 1, 1));
        assert_eq!(palette.color("y"), Color::new(2, 2, 2));
    }

    #[test]
    fn test_palette_edit_and_reset() {
        let mut policy = ColorPolicy::with_defaults();
        let black = Color::new(0, 0, 0);

        policy.set_rank_palette(vec![black]).unwrap();
        policy.set_branch_palette(vec![black]).unwrap();
        policy.set_rank_cutoff(Rank::Genus);
        assert_eq!(policy.rank_color(Rank::Phylum), black);
        assert_eq!(policy.branch_color("Chordata"), black);

        policy.reset();
        assert_eq!(policy.rank_color(Rank::Phylum), PASTEL1[3]);
        assert_eq!(policy.branch_color("Chordata"), SET3[0]);
        assert_eq!(policy.rank_cutoff(), Rank::Genus);

        assert_eq!(policy.set_rank_palette(Vec::new()), Err(TaxonomyError::InvalidPalette));
    }

    #[test]
    fn test_rebuild_forgets_branch_slots_and_cutoff() {
        let mut policy = ColorPolicy::with_defaults();
        policy.set_rank_cutoff(Rank::Superkingdom);
        policy.set_rank_palette(vec![Color::new(0, 0, 0)]).unwrap();
        policy.branch_color("X");
        policy.branch_color("Y");

        policy.rebuild();
        assert_eq!(policy.rank_cutoff(), Rank::Kingdom);
        assert_eq!(policy.rank_color(Rank::CellularOrganisms), PASTEL1[0]);
        assert_eq!(policy.branch_color("Z"), SET3[0]);
    }

    #[test]
    fn test_config_rejects_empty_palette() {
        let config = ColorConfig {
            branch_palette: Vec::new(),
            ..Default::default()
        };
        assert!(matches!(ColorPolicy::new(config), Err(TaxonomyError::InvalidPalette)));
    }
}
