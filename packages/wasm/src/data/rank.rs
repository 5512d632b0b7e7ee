//! Taxonomic ranks and rank classification of records.
//!
//! A record's rank comes from the number of `@` separators in its path, with
//! one domain exception: bacteria and archaea have no kingdom, so any path of
//! more than two segments that passes through `Bacteria` or `Archaea` is
//! shifted one rank deeper.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::row::Record;
use crate::error::{Result, TaxonomyError};

/// Path segment separator.
pub const PATH_SEPARATOR: char = '@';

/// Lineages without a kingdom rank.
const KINGDOMLESS: [&str; 2] = ["Bacteria", "Archaea"];

/// Taxonomic rank, ordered from the root downwards.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rank {
    #[serde(rename = "Cellular organisms")]
    CellularOrganisms = 0,
    Superkingdom = 1,
    Kingdom = 2,
    Phylum = 3,
    Class = 4,
    Order = 5,
    Family = 6,
    Genus = 7,
    Species = 8,
}

impl Rank {
    pub const ALL: [Rank; 9] = [
        Rank::CellularOrganisms,
        Rank::Superkingdom,
        Rank::Kingdom,
        Rank::Phylum,
        Rank::Class,
        Rank::Order,
        Rank::Family,
        Rank::Genus,
        Rank::Species,
    ];

    /// Rank at the given ladder position, if there is one.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Ladder position (0 = cellular organisms).
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Display name used by the front-end.
    pub fn label(self) -> &'static str {
        match self {
            Rank::CellularOrganisms => "Cellular organisms",
            Rank::Superkingdom => "Superkingdom",
            Rank::Kingdom => "Kingdom",
            Rank::Phylum => "Phylum",
            Rank::Class => "Class",
            Rank::Order => "Order",
            Rank::Family => "Family",
            Rank::Genus => "Genus",
            Rank::Species => "Species",
        }
    }

    /// Parse a display name (case-insensitive).
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|rank| rank.label().eq_ignore_ascii_case(label))
    }

    /// Derive the rank of an `@`-delimited path.
    ///
    /// Returns `None` when the path is deeper than the species rank.
    pub fn for_path(path: &str) -> Option<Self> {
        let segments: Vec<&str> = path.split(PATH_SEPARATOR).collect();
        let symbols = segments.len() - 1;
        let kingdomless = segments.len() > 2
            && segments.iter().any(|segment| KINGDOMLESS.contains(segment));

        if kingdomless {
            Self::from_index(symbols + 1)
        } else {
            Self::from_index(symbols)
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Final segment of a path.
pub fn taxon_of(path: &str) -> &str {
    path.rsplit(PATH_SEPARATOR).next().unwrap_or(path)
}

/// Path of the parent node, or `None` for a root path.
pub fn parent_path(path: &str) -> Option<&str> {
    path.rfind(PATH_SEPARATOR).map(|at| &path[..at])
}

/// A record annotated with its taxon name and rank.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedRecord {
    pub record: Record,
    pub taxon: String,
    pub rank: Rank,
}

/// Distinct taxa observed per rank for one dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RankRegistry {
    taxa: BTreeMap<Rank, BTreeSet<String>>,
}

impl RankRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, rank: Rank, taxon: &str) {
        self.taxa.entry(rank).or_default().insert(taxon.to_string());
    }

    /// Taxa seen at `rank`, sorted.
    pub fn taxa(&self, rank: Rank) -> impl Iterator<Item = &str> {
        self.taxa
            .get(&rank)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    pub fn contains(&self, rank: Rank, taxon: &str) -> bool {
        self.taxa.get(&rank).is_some_and(|set| set.contains(taxon))
    }

    /// Ranks with at least one taxon, shallowest first.
    pub fn iter(&self) -> impl Iterator<Item = (Rank, &BTreeSet<String>)> {
        self.taxa.iter().map(|(&rank, set)| (rank, set))
    }

    /// Total number of distinct (rank, taxon) pairs.
    pub fn len(&self) -> usize {
        self.taxa.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Assigns ranks and taxon names to parsed records.
pub struct TaxonClassifier;

impl TaxonClassifier {
    /// Classify every record and collect the taxa seen at each rank.
    pub fn classify(records: Vec<Record>) -> Result<(Vec<ClassifiedRecord>, RankRegistry)> {
        let mut registry = RankRegistry::new();
        let mut classified = Vec::with_capacity(records.len());

        for (row, record) in records.into_iter().enumerate() {
            let rank = Rank::for_path(&record.path).ok_or_else(|| TaxonomyError::MalformedRow {
                row,
                reason: format!("path '{}' is deeper than the species rank", record.path),
            })?;
            let taxon = taxon_of(&record.path).to_string();
            registry.insert(rank, &taxon);
            classified.push(ClassifiedRecord {
                record,
                taxon,
                rank,
            });
        }

        log::debug!(
            "classified {} records into {} distinct taxa",
            classified.len(),
            registry.len()
        );
        Ok((classified, registry))
    }
}
