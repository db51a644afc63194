//! Validation Engine
//!
//! Structural, schema and heuristic checks of speech-markup documents.
//! Independent of the language server; usable from any caller holding a
//! `Schema`.

mod conformance;
pub mod engine;
mod metrics;
mod structure;
mod wellformed;

pub use engine::{
    validate, Diagnostic, EstimatedCost, ReportInfo, Severity, Span, ValidationReport,
};
