//! LSP Protocol Implementation
//!
//! Protocol handling only: documents are validated by the validation engine
//! and results are translated to LSP types here.

pub mod backend;
pub mod document;
pub mod handlers;
pub mod server;

pub use backend::{Backend, ReportParams};
pub use document::DocumentState;
