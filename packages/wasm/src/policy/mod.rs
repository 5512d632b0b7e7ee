//! Value and colour policies applied on demand at render time.

pub mod aggregation;
pub mod color;

pub use aggregation::{AggregationPolicy, LogScaled, SizingBasis, ValueMode};
pub use color::{BranchPalette, Color, ColorConfig, ColorPolicy, PASTEL1, SET3};
