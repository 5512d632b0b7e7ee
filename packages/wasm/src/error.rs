//! Error taxonomy for dataset loading and tree-state operations.
//!
//! Construction errors abort the whole dataset load; no partial tree is ever
//! handed to callers. Numeric coercion problems are not errors at all: they
//! are recovered in the row parser by substituting 0.

use thiserror::Error;

/// Errors produced by the taxonomy engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TaxonomyError {
    /// A row could not be turned into a record.
    #[error("malformed row {row}: {reason}")]
    MalformedRow { row: usize, reason: String },

    /// A non-root record whose parent path has no record.
    #[error("orphan node '{id}': parent '{parent}' is missing")]
    OrphanNode { id: String, parent: String },

    /// More than one record without an `@` in its path.
    #[error("multiple root nodes: {}", .0.join(", "))]
    MultipleRoots(Vec<String>),

    /// Two records share the same path.
    #[error("duplicate node '{0}'")]
    DuplicateNode(String),

    /// The dataset contained no rows.
    #[error("dataset is empty")]
    EmptyDataset,

    /// The node id is not part of the current tree.
    #[error("unknown node '{0}'")]
    UnknownNode(String),

    /// The sample key is not one of the dataset's sample columns.
    #[error("unknown sample '{0}'")]
    UnknownSample(String),

    /// A colour string was not `#rgb` or `#rrggbb`.
    #[error("invalid color '{0}'")]
    InvalidColor(String),

    /// A palette must contain at least one colour.
    #[error("palette must not be empty")]
    InvalidPalette,

    /// The chart type is not one of the supported layouts.
    #[error("unknown layout '{0}'")]
    UnknownLayout(String),

    /// Non-tabular upload. Raised by the file ingestion front-end.
    #[error("unsupported file type '{0}'")]
    UnsupportedFileType(String),

    /// An operation needed a loaded dataset.
    #[error("no dataset loaded")]
    NoDataset,
}

pub type Result<T> = std::result::Result<T, TaxonomyError>;
