//! Validation Engine
//!
//! Runs the four validation passes over a document and assembles the
//! report. Validation never fails: malformed input produces errors in the
//! report, not an `Err`.

use anyhow::bail;
use serde::Serialize;

use crate::parser::tokenize;
use crate::schema::Schema;

use super::{conformance, metrics, structure, wellformed};

/// Severity of a diagnostic message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks use of the document
    Error,
    /// Advisory only
    Warning,
}

/// Byte range in the validated document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// A diagnostic message for a validation issue
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    /// Offending text, `None` for document-level findings
    pub span: Option<Span>,
}

/// Estimated synthesis cost in USD
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EstimatedCost {
    pub standard: f64,
    pub neural: f64,
}

/// Metrics derived from the document
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportInfo {
    /// Characters left once markup is removed (entities not decoded)
    pub character_count: usize,
    /// Opening, closing and self-closing tags
    pub tag_count: usize,
    pub estimated_cost: EstimatedCost,
}

/// Outcome of validating one document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub info: ReportInfo,
    /// Errors and warnings in discovery order, with positions
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationReport {
    fn new(findings: Findings, info: ReportInfo) -> Self {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        for diagnostic in &findings.diagnostics {
            match diagnostic.severity {
                Severity::Error => errors.push(diagnostic.message.clone()),
                Severity::Warning => warnings.push(diagnostic.message.clone()),
            }
        }

        Self {
            valid: errors.is_empty(),
            errors,
            warnings,
            info,
            diagnostics: findings.diagnostics,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Turn an invalid report into an error, for callers that must not
    /// submit invalid documents for synthesis. Warnings never block.
    pub fn ensure_valid(&self) -> anyhow::Result<()> {
        if self.valid {
            return Ok(());
        }
        bail!(
            "Document failed validation with {} error(s): {}",
            self.errors.len(),
            self.errors.join("; ")
        )
    }
}

/// Diagnostics collected by the passes, in the order they were found
#[derive(Debug, Default)]
pub(crate) struct Findings {
    pub(crate) diagnostics: Vec<Diagnostic>,
}

impl Findings {
    pub(crate) fn add_error(&mut self, span: Option<Span>, message: String) {
        self.diagnostics.push(Diagnostic {
            severity: Severity::Error,
            message,
            span,
        });
    }

    pub(crate) fn add_warning(&mut self, span: Option<Span>, message: String) {
        self.diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            message,
            span,
        });
    }

    #[cfg(test)]
    pub(crate) fn messages(&self) -> Vec<String> {
        self.diagnostics.iter().map(|d| d.message.clone()).collect()
    }
}

/// Validate a document against a schema.
///
/// The passes always all run, in order: root structure, tag balance,
/// schema conformance, then metrics and heuristics.
pub fn validate(document: &str, schema: &Schema) -> ValidationReport {
    let tokens = tokenize(document);
    let mut findings = Findings::default();

    structure::check_root_structure(document, &tokens, &schema.root, &mut findings);
    wellformed::check_tag_balance(&tokens, &mut findings);
    conformance::check_schema_conformance(&tokens, schema, &mut findings);
    let info = metrics::check_metrics(document, &tokens, schema, &mut findings);

    let report = ValidationReport::new(findings, info);
    log::debug!(
        "Validated {} bytes against schema '{}': {} error(s), {} warning(s)",
        document.len(),
        schema.name,
        report.errors.len(),
        report.warnings.len()
    );
    report
}
