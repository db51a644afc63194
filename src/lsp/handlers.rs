use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tower_lsp::jsonrpc::Result as LspResult;
use tower_lsp::lsp_types::*;

use crate::lsp::backend::Backend;
use crate::lsp::document::DocumentState;
use crate::parser::{parse_attributes, strip_markup, token_at, tokenize, Token, TokenKind};
use crate::schema::{Schema, TagDef};
use crate::validation::{Diagnostic as ValidationDiagnostic, Severity};

/// Tags shown in the document outline
const OUTLINE_TAGS: &[&str] = &["p", "s", "mark"];

/// Longest text preview used as a symbol name
const SYMBOL_PREVIEW_CHARS: usize = 40;

/// Attribute whose quoted value is still open at the end of the text
static OPEN_VALUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_][\w:.-]*)\s*=\s*"[^"]*$"#).expect("valid open value regex")
});

/// Trait for handling hover requests
#[tower_lsp::async_trait]
pub trait HandleHover {
    async fn handle_hover(&self, params: HoverParams) -> LspResult<Option<Hover>>;
}

/// Trait for handling completion requests
#[tower_lsp::async_trait]
pub trait HandleCompletion {
    async fn handle_completion(
        &self,
        params: CompletionParams,
    ) -> LspResult<Option<CompletionResponse>>;
}

/// Trait for handling document symbols
#[tower_lsp::async_trait]
pub trait HandleDocumentSymbol {
    async fn handle_document_symbol(
        &self,
        params: DocumentSymbolParams,
    ) -> LspResult<Option<DocumentSymbolResponse>>;
}

/// Trait for handling diagnostics
#[tower_lsp::async_trait]
pub trait HandleDiagnostics {
    async fn create_document_state(&self, content: String) -> DocumentState;
    async fn publish_diagnostics(&self, uri: Url);
}

#[tower_lsp::async_trait]
impl HandleHover for Backend {
    async fn handle_hover(&self, params: HoverParams) -> LspResult<Option<Hover>> {
        let tdpp = params.text_document_position_params;
        let uri = tdpp.text_document.uri;

        let docs = self.documents.lock().await;
        let doc_state = match docs.get(&uri) {
            Some(state) => state,
            None => return Ok(None),
        };
        let Some(schema) = doc_state.schema.as_deref() else {
            return Ok(None);
        };
        let Some(offset) = doc_state.offset(tdpp.position) else {
            return Ok(None);
        };

        let tokens = tokenize(&doc_state.content);
        let token = match token_at(&tokens, offset) {
            Some(index) if tokens[index].is_tag() => &tokens[index],
            _ => return Ok(None),
        };

        let value = match schema.tag(token.name) {
            Some(tag) => tag_hover_text(tag),
            None => format!(
                "**<{}>**\n\nNot supported by schema `{}`",
                token.name, schema.name
            ),
        };

        Ok(Some(Hover {
            contents: HoverContents::Markup(MarkupContent {
                kind: MarkupKind::Markdown,
                value,
            }),
            range: Some(Range::new(
                doc_state.position(token.start),
                doc_state.position(token.end),
            )),
        }))
    }
}

/// Markdown description of a tag and its attributes
pub(crate) fn tag_hover_text(tag: &TagDef) -> String {
    let mut text = format!("**<{}>**", tag.name);
    if let Some(description) = &tag.description {
        text.push_str("\n\n");
        text.push_str(description);
    }

    if !tag.attributes.is_empty() {
        text.push_str("\n\n**Attributes:**");
        for attr in &tag.attributes {
            text.push_str(&format!("\n- `{}`", attr.name));
            if let Some(constraint) = &attr.constraint {
                text.push_str(&format!(" ({constraint})"));
            }
            if tag.is_required(&attr.name) {
                text.push_str(", required");
            }
            if let Some(description) = &attr.description {
                text.push_str(&format!(": {description}"));
            }
        }
    }

    text
}

#[tower_lsp::async_trait]
impl HandleCompletion for Backend {
    async fn handle_completion(
        &self,
        params: CompletionParams,
    ) -> LspResult<Option<CompletionResponse>> {
        let uri = params.text_document_position.text_document.uri;
        let pos = params.text_document_position.position;

        let docs = self.documents.lock().await;
        let doc_state = match docs.get(&uri) {
            Some(state) => state,
            None => return Ok(None),
        };
        let Some(schema) = doc_state.schema.as_deref() else {
            return Ok(None);
        };
        let Some(offset) = doc_state.offset(pos) else {
            return Ok(None);
        };

        let completions = completion_items(&doc_state.content[..offset], schema);
        if completions.is_empty() {
            Ok(None)
        } else {
            Ok(Some(CompletionResponse::Array(completions)))
        }
    }
}

/// Completions for a cursor placed at the end of `before_cursor`
pub(crate) fn completion_items(before_cursor: &str, schema: &Schema) -> Vec<CompletionItem> {
    let Some(open) = before_cursor.rfind('<') else {
        return Vec::new();
    };
    let fragment = &before_cursor[open + 1..];
    if fragment.contains('>') {
        // Cursor is in text, not inside a tag
        return Vec::new();
    }

    match fragment.find(char::is_whitespace) {
        None => {
            let prefix = fragment.strip_prefix('/').unwrap_or(fragment);
            tag_completions(prefix, schema)
        }
        Some(name_end) => {
            let Some(tag) = schema.tag(&fragment[..name_end]) else {
                return Vec::new();
            };
            let attribute_text = &fragment[name_end..];
            match OPEN_VALUE_RE.captures(attribute_text) {
                Some(caps) => value_completions(tag, &caps[1]),
                None => attribute_completions(tag, attribute_text),
            }
        }
    }
}

fn tag_completions(prefix: &str, schema: &Schema) -> Vec<CompletionItem> {
    schema
        .tag_names()
        .into_iter()
        .filter(|name| name.starts_with(prefix))
        .filter_map(|name| schema.tag(name))
        .map(|tag| CompletionItem {
            label: tag.name.clone(),
            kind: Some(CompletionItemKind::KEYWORD),
            detail: tag.description.clone(),
            documentation: Some(Documentation::MarkupContent(MarkupContent {
                kind: MarkupKind::Markdown,
                value: tag_hover_text(tag),
            })),
            ..Default::default()
        })
        .collect()
}

fn attribute_completions(tag: &TagDef, attribute_text: &str) -> Vec<CompletionItem> {
    // Skip attributes already present on the tag
    let existing: HashSet<&str> = parse_attributes(attribute_text)
        .iter()
        .map(|attr| attr.name)
        .collect();

    tag.attributes
        .iter()
        .filter(|attr| !existing.contains(attr.name.as_str()))
        .map(|attr| {
            let required = tag.is_required(&attr.name);
            CompletionItem {
                label: attr.name.clone(),
                kind: Some(CompletionItemKind::PROPERTY),
                detail: attr.constraint.as_ref().map(ToString::to_string),
                documentation: attr.description.clone().map(Documentation::String),
                sort_text: Some(format!("{}{}", if required { "0" } else { "1" }, attr.name)),
                insert_text: Some(format!("{}=\"$1\"", attr.name)),
                insert_text_format: Some(InsertTextFormat::SNIPPET),
                preselect: Some(required),
                ..Default::default()
            }
        })
        .collect()
}

fn value_completions(tag: &TagDef, attribute: &str) -> Vec<CompletionItem> {
    let Some(constraint) = tag.constraint(attribute) else {
        return Vec::new();
    };

    constraint
        .literals()
        .into_iter()
        .map(|value| CompletionItem {
            label: value.to_string(),
            kind: Some(CompletionItemKind::VALUE),
            detail: Some(format!("{} {}", tag.name, attribute)),
            ..Default::default()
        })
        .collect()
}

#[tower_lsp::async_trait]
impl HandleDiagnostics for Backend {
    /// Create a new document state, selecting the schema and validating
    async fn create_document_state(&self, content: String) -> DocumentState {
        let schema = self.schema_registry.schema_for_document(&content);
        if schema.is_none() {
            log::warn!("No schema available, document will not be validated");
        }
        DocumentState::new(content, schema)
    }

    /// Publish diagnostics for a document
    async fn publish_diagnostics(&self, uri: Url) {
        let diagnostics: Vec<Diagnostic> = {
            let docs = self.documents.lock().await;
            let doc_state = match docs.get(&uri) {
                Some(state) => state,
                None => return,
            };

            doc_state
                .report
                .iter()
                .flat_map(|report| &report.diagnostics)
                .map(|diagnostic| to_lsp_diagnostic(doc_state, diagnostic))
                .collect()
        };

        self.client
            .publish_diagnostics(uri, diagnostics, None)
            .await;
    }
}

/// Convert a validation finding to an LSP diagnostic.
///
/// Document-level findings are reported on the first line.
pub(crate) fn to_lsp_diagnostic(
    doc_state: &DocumentState,
    diagnostic: &ValidationDiagnostic,
) -> Diagnostic {
    let severity = match diagnostic.severity {
        Severity::Error => DiagnosticSeverity::ERROR,
        Severity::Warning => DiagnosticSeverity::WARNING,
    };

    let (start, end) = match diagnostic.span {
        Some(span) => (span.start, span.end),
        None => {
            let first_line = doc_state.content.find('\n').unwrap_or(doc_state.content.len());
            (0, first_line)
        }
    };

    Diagnostic::new(
        Range::new(doc_state.position(start), doc_state.position(end)),
        Some(severity),
        None,
        Some("ssml-ls".to_string()),
        diagnostic.message.clone(),
        None,
        None,
    )
}

#[tower_lsp::async_trait]
impl HandleDocumentSymbol for Backend {
    async fn handle_document_symbol(
        &self,
        params: DocumentSymbolParams,
    ) -> LspResult<Option<DocumentSymbolResponse>> {
        let uri = params.text_document.uri;

        let docs = self.documents.lock().await;
        let doc_state = match docs.get(&uri) {
            Some(state) => state,
            None => return Ok(None),
        };

        Ok(Some(DocumentSymbolResponse::Nested(document_symbols(
            doc_state,
        ))))
    }
}

/// An element still open while building the outline
struct Frame<'a> {
    token: Token<'a>,
    children: Vec<DocumentSymbol>,
}

/// Nested outline of paragraphs, sentences and marks
pub(crate) fn document_symbols(doc_state: &DocumentState) -> Vec<DocumentSymbol> {
    let content = &doc_state.content;
    let mut symbols = Vec::new();
    let mut stack: Vec<Frame<'_>> = Vec::new();

    for token in tokenize(content) {
        match token.kind {
            TokenKind::Opening => stack.push(Frame {
                token,
                children: Vec::new(),
            }),
            TokenKind::SelfClosing if OUTLINE_TAGS.contains(&token.name) => {
                let symbol = make_symbol(doc_state, &token, token.end, Vec::new());
                push_symbol(&mut stack, &mut symbols, symbol);
            }
            TokenKind::Closing => {
                if let Some(frame) = stack.pop() {
                    close_frame(doc_state, frame, token.end, &mut stack, &mut symbols);
                }
            }
            _ => {}
        }
    }

    // Unclosed elements run to the end of the document
    while let Some(frame) = stack.pop() {
        close_frame(doc_state, frame, content.len(), &mut stack, &mut symbols);
    }

    symbols
}

fn close_frame(
    doc_state: &DocumentState,
    frame: Frame<'_>,
    end: usize,
    stack: &mut [Frame<'_>],
    symbols: &mut Vec<DocumentSymbol>,
) {
    if OUTLINE_TAGS.contains(&frame.token.name) {
        let symbol = make_symbol(doc_state, &frame.token, end, frame.children);
        push_symbol(stack, symbols, symbol);
    } else {
        // Hoist children of elements left out of the outline
        for child in frame.children {
            push_symbol(stack, symbols, child);
        }
    }
}

fn push_symbol(stack: &mut [Frame<'_>], symbols: &mut Vec<DocumentSymbol>, symbol: DocumentSymbol) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(symbol),
        None => symbols.push(symbol),
    }
}

#[allow(deprecated)]
fn make_symbol(
    doc_state: &DocumentState,
    token: &Token<'_>,
    end: usize,
    children: Vec<DocumentSymbol>,
) -> DocumentSymbol {
    let name = if token.name == "mark" {
        parse_attributes(token.attributes)
            .iter()
            .find(|attr| attr.name == "name")
            .map(|attr| attr.value.to_string())
    } else {
        text_preview(&doc_state.content[token.end..end.max(token.end)])
    };

    let kind = match token.name {
        "p" => SymbolKind::MODULE,
        "s" => SymbolKind::STRING,
        _ => SymbolKind::KEY,
    };

    DocumentSymbol {
        // Editors reject empty symbol names
        name: name.unwrap_or_else(|| format!("<{}>", token.name)),
        detail: Some(format!("<{}>", token.name)),
        kind,
        tags: None,
        deprecated: None,
        range: Range::new(doc_state.position(token.start), doc_state.position(end)),
        selection_range: Range::new(
            doc_state.position(token.start),
            doc_state.position(token.end),
        ),
        children: if children.is_empty() {
            None
        } else {
            Some(children)
        },
    }
}

/// First words of the spoken text, whitespace collapsed
fn text_preview(markup: &str) -> Option<String> {
    let text = strip_markup(markup);
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return None;
    }

    let joined = words.join(" ");
    if joined.chars().count() <= SYMBOL_PREVIEW_CHARS {
        return Some(joined);
    }
    let truncated: String = joined.chars().take(SYMBOL_PREVIEW_CHARS).collect();
    Some(format!("{}…", truncated.trim_end()))
}
