//! Input data: row parsing and rank classification.
//!
//! Rows from the upload collaborator are validated into [`Record`]s by the
//! [`RowParser`], then annotated with taxon name and [`Rank`] by the
//! [`TaxonClassifier`].

mod rank;
mod row;

pub use rank::{
    ClassifiedRecord, PATH_SEPARATOR, Rank, RankRegistry, TaxonClassifier, parent_path, taxon_of,
};
pub use row::{ParsedRows, ParserConfig, RawField, RawRow, Record, RowParser, SampleValues};
