//! bandcheck - modem band and combo configuration verifier
//!
//! Checks that a modem's radio-band configuration agrees across its
//! configuration documents (RF card, HW filter, carrier policy, regulatory
//! restrictions, NV preferences) and its observed behavior (QXDM log, UE
//! capability), and that carrier aggregation / dual connectivity combos
//! defined in RFC are built into the runtime table and advertised to the
//! network.
//!
//! # Modules
//! - [`bands`]: per-band, per-stage tracer
//! - [`combos`]: combo canonicalization, comparison and EFS reconciliation
//! - [`knowledge`]: knowledge-base context and reasoning engine
//! - [`registry`]: table of verification modules
//! - [`input`] / [`analysis`]: one-shot run over a JSON input document

pub mod analysis;
pub mod bands;
pub mod combos;
pub mod error;
pub mod input;
pub mod knowledge;
pub mod registry;

pub use analysis::{AnalysisReport, AnalysisRun};
pub use error::{AnalysisError, Result};
pub use input::AnalysisInput;
pub use registry::ModuleRegistry;
