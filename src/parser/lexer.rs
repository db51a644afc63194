//! Markup Lexer
//!
//! Single left-to-right scan that extracts tag tokens from a speech-markup
//! document. Text between tokens is never materialized here; callers slice
//! the input with the token offsets when they need it.
//!
//! Quoted attribute values may contain `>` and `<`. Comments, CDATA sections,
//! processing instructions and declarations are recognized as their own token
//! kinds so the tags they contain are not mistaken for markup.

/// Token types in speech markup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// `<name ...>`
    Opening,
    /// `</name>`
    Closing,
    /// `<name .../>`
    SelfClosing,
    /// `<!-- ... -->`
    Comment,
    /// `<![CDATA[ ... ]]>`
    CData,
    /// `<? ... ?>` or `<! ... >`
    Instruction,
}

/// A token borrowed from the scanned document
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// Tag name, empty for comments, CDATA and instructions
    pub name: &'a str,
    /// Raw attribute text between the name and the closing `>` (or `/>`)
    pub attributes: &'a str,
    /// Full source text of the token
    pub text: &'a str,
    pub start: usize, // byte offset
    pub end: usize,   // byte offset (exclusive)
}

impl<'a> Token<'a> {
    /// Opening, closing or self-closing element tag
    pub fn is_tag(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Opening | TokenKind::Closing | TokenKind::SelfClosing
        )
    }

    /// Text this token contributes to the spoken content.
    ///
    /// Only CDATA sections carry text; every other token is pure markup.
    pub fn spoken_text(&self) -> &'a str {
        match self.kind {
            TokenKind::CData => self
                .text
                .strip_prefix(CDATA_OPEN)
                .and_then(|rest| rest.strip_suffix(CDATA_CLOSE))
                .unwrap_or(""),
            _ => "",
        }
    }
}

const COMMENT_OPEN: &str = "<!--";
const COMMENT_CLOSE: &str = "-->";
const CDATA_OPEN: &str = "<![CDATA[";
const CDATA_CLOSE: &str = "]]>";

/// Tokenize a whole document
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut pos = 0;

    while let Some(offset) = input[pos..].find('<') {
        let start = pos + offset;
        let rest = &input[start..];

        let token = if rest.starts_with(COMMENT_OPEN) {
            scan_delimited(input, start, COMMENT_OPEN, COMMENT_CLOSE, TokenKind::Comment)
        } else if rest.starts_with(CDATA_OPEN) {
            scan_delimited(input, start, CDATA_OPEN, CDATA_CLOSE, TokenKind::CData)
        } else if rest.starts_with("<?") {
            scan_delimited(input, start, "<?", "?>", TokenKind::Instruction)
        } else if rest.starts_with("<!") {
            scan_delimited(input, start, "<!", ">", TokenKind::Instruction)
        } else {
            scan_tag(input, start)
        };

        match token {
            Some(token) => {
                pos = token.end;
                tokens.push(token);
            }
            // A lone '<' is plain text
            None => pos = start + 1,
        }
    }

    tokens
}

/// Scan a token that runs from `open` to the first following `close`
fn scan_delimited<'a>(
    input: &'a str,
    start: usize,
    open: &str,
    close: &str,
    kind: TokenKind,
) -> Option<Token<'a>> {
    let body_start = start + open.len();
    let end = body_start + input[body_start..].find(close)? + close.len();

    Some(Token {
        kind,
        name: "",
        attributes: "",
        text: &input[start..end],
        start,
        end,
    })
}

/// Scan an element tag starting at the `<` at `start`
fn scan_tag(input: &str, start: usize) -> Option<Token<'_>> {
    let bytes = input.as_bytes();
    let mut i = start + 1;

    let closing = bytes.get(i) == Some(&b'/');
    if closing {
        i += 1;
    }

    let name_start = i;
    if !bytes.get(i).is_some_and(u8::is_ascii_alphabetic) {
        return None;
    }
    while bytes.get(i).copied().is_some_and(is_name_byte) {
        i += 1;
    }
    let name_end = i;

    // The name must end at whitespace, '/' or '>'
    match bytes.get(i) {
        Some(b) if b.is_ascii_whitespace() || *b == b'/' || *b == b'>' => {}
        _ => return None,
    }

    // Find the closing '>' outside of quoted attribute values
    let mut quote: Option<u8> = None;
    loop {
        let b = *bytes.get(i)?;
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None if b == b'>' => break,
            // Another tag starts before this one was closed
            None if b == b'<' => return None,
            None => {}
        }
        i += 1;
    }
    let end = i + 1;

    let inner = &input[name_end..i];
    let (attributes, self_closing) = match inner.trim_end().strip_suffix('/') {
        Some(attributes) => (attributes, true),
        None => (inner, false),
    };

    let kind = if closing {
        TokenKind::Closing
    } else if self_closing {
        TokenKind::SelfClosing
    } else {
        TokenKind::Opening
    };

    Some(Token {
        kind,
        name: &input[name_start..name_end],
        attributes: if closing { "" } else { attributes.trim() },
        text: &input[start..end],
        start,
        end,
    })
}

/// Tag names are letters followed by letters, digits, colons, hyphens or underscores
fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b':' | b'-' | b'_')
}
