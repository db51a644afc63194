//! Schema System
//!
//! Target-engine schemas as data: loaded from TOML, compiled once, shared
//! read-only by every validation.

pub mod registry;
pub mod types;

pub use registry::{embedded_polly_schema, SchemaRegistry};
pub use types::{AttributeDef, Constraint, Heuristics, Pricing, Schema, TagDef};
