//! Root-structure pass: the document must be exactly one root element.

use crate::parser::{Token, TokenKind};

use super::engine::{Findings, Span};

fn is_root_opening(token: &Token<'_>, root: &str) -> bool {
    matches!(token.kind, TokenKind::Opening | TokenKind::SelfClosing) && token.name == root
}

fn is_root_closing(token: &Token<'_>, root: &str) -> bool {
    token.kind == TokenKind::Closing && token.name == root
}

/// First token, provided only whitespace precedes it
fn leading_token<'t, 'a>(document: &str, tokens: &'t [Token<'a>]) -> Option<&'t Token<'a>> {
    tokens
        .first()
        .filter(|token| document[..token.start].trim().is_empty())
}

/// Last token, provided only whitespace follows it
fn trailing_token<'t, 'a>(document: &str, tokens: &'t [Token<'a>]) -> Option<&'t Token<'a>> {
    tokens
        .last()
        .filter(|token| document[token.end..].trim().is_empty())
}

/// Check that the document starts and ends with the root element and
/// contains it exactly once. Reports errors only.
pub(crate) fn check_root_structure(
    document: &str,
    tokens: &[Token<'_>],
    root: &str,
    findings: &mut Findings,
) {
    let starts_with_root =
        leading_token(document, tokens).is_some_and(|token| is_root_opening(token, root));
    if !starts_with_root {
        findings.add_error(None, format!("Missing opening <{root}> root tag"));
    }

    let ends_with_root =
        trailing_token(document, tokens).is_some_and(|token| is_root_closing(token, root));
    if !ends_with_root {
        findings.add_error(None, format!("Missing closing </{root}> root tag"));
    }

    let openings: Vec<&Token<'_>> = tokens.iter().filter(|t| is_root_opening(t, root)).collect();
    let closings = tokens.iter().filter(|t| is_root_closing(t, root)).count();

    if openings.len() != closings {
        findings.add_error(
            None,
            format!(
                "Unbalanced <{root}> root tags: {} opening, {} closing",
                openings.len(),
                closings
            ),
        );
    }

    if let Some(extra) = openings.get(1) {
        findings.add_error(
            Some(Span::new(extra.start, extra.end)),
            format!("Multiple <{root}> root tags found"),
        );
    }
}
