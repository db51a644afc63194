use std::sync::Arc;

use tower_lsp::lsp_types::Position;

use crate::schema::Schema;
use crate::validation::{validate, ValidationReport};

/// State for each open document
#[derive(Debug)]
pub struct DocumentState {
    pub content: String,
    /// Schema selected by modeline or configuration
    pub schema: Option<Arc<Schema>>,
    /// Result of validating `content` against `schema`
    pub report: Option<ValidationReport>,
    pub line_index: LineIndex,
}

impl DocumentState {
    pub fn new(content: String, schema: Option<Arc<Schema>>) -> Self {
        let report = schema.as_deref().map(|schema| validate(&content, schema));
        let line_index = LineIndex::new(&content);

        Self {
            content,
            schema,
            report,
            line_index,
        }
    }

    pub fn position(&self, offset: usize) -> Position {
        self.line_index.position(&self.content, offset)
    }

    pub fn offset(&self, position: Position) -> Option<usize> {
        self.line_index.offset(&self.content, position)
    }
}

/// Converts between byte offsets and LSP positions (UTF-16 columns)
#[derive(Debug, Clone, PartialEq)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self { line_starts }
    }

    pub fn position(&self, text: &str, offset: usize) -> Position {
        let mut offset = offset.min(text.len());
        while !text.is_char_boundary(offset) {
            offset -= 1;
        }

        let line = self.line_starts.partition_point(|&start| start <= offset) - 1;
        let line_start = self.line_starts[line];
        let character = text[line_start..offset].encode_utf16().count();

        Position::new(line as u32, character as u32)
    }

    pub fn offset(&self, text: &str, position: Position) -> Option<usize> {
        let line_start = *self.line_starts.get(position.line as usize)?;
        let mut remaining = position.character as usize;

        for (i, ch) in text[line_start..].char_indices() {
            if remaining == 0 || ch == '\n' {
                return Some(line_start + i);
            }
            remaining = remaining.saturating_sub(ch.len_utf16());
        }

        Some(text.len())
    }
}
