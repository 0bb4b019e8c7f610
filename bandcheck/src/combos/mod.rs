//! Combo verification
//!
//! Canonicalizes carrier aggregation / dual connectivity combos from three
//! sources (RFC definitions, the modem's runtime table, the UE capability
//! advertisement), compares them pairwise and reconciles the differences
//! against EFS control files.

pub mod comparator;
pub mod efs;
mod error;
pub mod models;
pub mod normalizer;

pub use comparator::{
    compare, compare_built_vs_advertised, compare_defined_vs_built, summary_stats,
    ComboCollection, ComboSummary, PipelineComparison,
};
pub use efs::{EfsControlState, PrunedCombo};
pub use error::ComboParseError;
pub use models::{
    BandComponent, Combo, ComboSet, ComboType, ComparisonResult, DataSource, Discrepancy,
    DiscrepancyType,
};
