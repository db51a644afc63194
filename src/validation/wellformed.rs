//! Tag-balance pass
//!
//! Replays the tag tokens against a stack of open elements. The pass is
//! lenient: a mismatch is reported and the popped frame discarded, with no
//! attempt to resynchronize. Self-closing tags never touch the stack.

use crate::parser::{Token, TokenKind};

use super::engine::{Findings, Span};

/// An element waiting for its closing tag
struct OpenTag<'a> {
    name: &'a str,
    span: Span,
}

pub(crate) fn check_tag_balance(tokens: &[Token<'_>], findings: &mut Findings) {
    let mut stack: Vec<OpenTag<'_>> = Vec::new();

    for token in tokens {
        let span = Span::new(token.start, token.end);
        match token.kind {
            TokenKind::Opening => stack.push(OpenTag {
                name: token.name,
                span,
            }),
            TokenKind::Closing => match stack.pop() {
                None => findings.add_error(
                    Some(span),
                    format!("Unexpected closing tag: </{}>", token.name),
                ),
                Some(open) if open.name != token.name => findings.add_error(
                    Some(span),
                    format!(
                        "Mismatched tags: expected </{}>, found </{}>",
                        open.name, token.name
                    ),
                ),
                Some(_) => {}
            },
            _ => {}
        }
    }

    if let Some(first) = stack.first() {
        let names: Vec<String> = stack.iter().map(|open| format!("<{}>", open.name)).collect();
        findings.add_error(
            Some(first.span),
            format!("Unclosed tags: {}", names.join(", ")),
        );
    }
}
