//! SSML Language Server
//!
//! Validates Speech Synthesis Markup Language documents against the schema
//! of a target speech engine before they are submitted for synthesis.
//!
//! This library provides:
//! - Markup tokenization
//! - Schema-driven validation with cost estimation
//! - LSP protocol implementation
//! - Configuration management

pub mod config;
pub mod lsp;
pub mod parser;
pub mod schema;
pub mod validation;

pub use config::Config;
pub use parser::{tokenize, Token, TokenKind};
pub use schema::{Schema, SchemaRegistry};
pub use validation::{validate, Diagnostic, ReportInfo, Severity, ValidationReport};
