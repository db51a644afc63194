//! Metrics and heuristic warnings
//!
//! Character counts are taken on the raw text between tags, so entities
//! such as `&amp;` count as written. Costs are not rounded.

use crate::parser::{Token, TokenKind};
use crate::schema::{Pricing, Schema};

use super::engine::{EstimatedCost, Findings, ReportInfo, Span};

const CHARS_PER_PRICING_UNIT: f64 = 1_000_000.0;

pub(crate) fn estimate_cost(character_count: usize, pricing: &Pricing) -> EstimatedCost {
    let units = character_count as f64 / CHARS_PER_PRICING_UNIT;
    EstimatedCost {
        standard: units * pricing.standard_per_million,
        neural: units * pricing.neural_per_million,
    }
}

/// A run of spoken text between two segment breaks
struct Segment {
    chars: usize,
    span: Span,
}

/// Compute report metrics and emit heuristic warnings in a fixed order:
/// long segment, deep nesting, empty tags.
pub(crate) fn check_metrics(
    document: &str,
    tokens: &[Token<'_>],
    schema: &Schema,
    findings: &mut Findings,
) -> ReportInfo {
    let segments = text_segments(document, tokens, schema);
    let character_count = segments.iter().map(|segment| segment.chars).sum();
    let tag_count = tokens.iter().filter(|t| t.is_tag()).count();

    check_segment_length(&segments, schema.heuristics.max_segment_chars, findings);
    check_nesting_depth(tokens, schema.heuristics.max_nesting_depth, findings);
    check_empty_tags(tokens, findings);

    ReportInfo {
        character_count,
        tag_count,
        estimated_cost: estimate_cost(character_count, &schema.pricing),
    }
}

/// Split the spoken text at every self-closing segment-break tag
fn text_segments(document: &str, tokens: &[Token<'_>], schema: &Schema) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut current = Segment {
        chars: 0,
        span: Span::new(0, 0),
    };
    let mut cursor = 0;

    for token in tokens {
        current.chars += document[cursor..token.start].chars().count();
        current.chars += token.spoken_text().chars().count();
        cursor = token.end;

        if token.kind == TokenKind::SelfClosing && schema.is_segment_break(token.name) {
            current.span.end = token.start;
            segments.push(current);
            current = Segment {
                chars: 0,
                span: Span::new(token.end, token.end),
            };
        }
    }
    current.chars += document[cursor..].chars().count();
    current.span.end = document.len();
    segments.push(current);

    segments
}

/// Warn once, about the first segment over the limit
fn check_segment_length(segments: &[Segment], max_chars: usize, findings: &mut Findings) {
    if let Some(segment) = segments.iter().find(|segment| segment.chars > max_chars) {
        findings.add_warning(
            Some(segment.span),
            format!(
                "Long text segment: {} characters without a break (recommended maximum {}); consider adding <break> tags",
                segment.chars, max_chars
            ),
        );
    }
}

fn check_nesting_depth(tokens: &[Token<'_>], max_depth: usize, findings: &mut Findings) {
    let mut depth = 0usize;
    let mut deepest = 0usize;
    let mut deepest_span = None;

    for token in tokens {
        match token.kind {
            TokenKind::Opening => {
                depth += 1;
                if depth > deepest {
                    deepest = depth;
                    deepest_span = Some(Span::new(token.start, token.end));
                }
            }
            TokenKind::Closing => depth = depth.saturating_sub(1),
            _ => {}
        }
    }

    if deepest > max_depth {
        findings.add_warning(
            deepest_span,
            format!(
                "Deep nesting detected: {} levels (recommended maximum {})",
                deepest, max_depth
            ),
        );
    }
}

/// An opening tag directly followed by a closing tag encloses nothing
fn check_empty_tags(tokens: &[Token<'_>], findings: &mut Findings) {
    let empty = tokens.windows(2).find(|pair| {
        pair[0].kind == TokenKind::Opening
            && pair[1].kind == TokenKind::Closing
            && pair[0].end == pair[1].start
    });

    if let Some(pair) = empty {
        findings.add_warning(
            Some(Span::new(pair[0].start, pair[1].end)),
            "Empty tags detected".to_string(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::tokenize;
    use crate::schema::embedded_polly_schema;

    fn metrics(document: &str) -> (ReportInfo, Vec<String>) {
        let schema = embedded_polly_schema().expect("embedded schema");
        let mut findings = Findings::default();
        let info = check_metrics(document, &tokenize(document), &schema, &mut findings);
        (info, findings.messages())
    }

    #[test]
    fn test_counts() {
        let (info, warnings) =
            metrics(r#"<speak>Hello <emphasis level="strong">world</emphasis>!</speak>"#);
        assert_eq!(info.character_count, 12);
        assert_eq!(info.tag_count, 4);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_entities_counted_literally() {
        let (info, _) = metrics("<speak>Fish &amp; chips</speak>");
        assert_eq!(info.character_count, "Fish &amp; chips".len());
    }

    #[test]
    fn test_counts_unicode_characters() {
        let (info, _) = metrics("<speak>café</speak>");
        assert_eq!(info.character_count, 4);
    }

    #[test]
    fn test_self_closing_tags_counted() {
        let (info, _) = metrics(r#"<speak>a<break time="1s"/>b<amazon:breath/></speak>"#);
        assert_eq!(info.tag_count, 4);
        assert_eq!(info.character_count, 2);
    }

    #[test]
    fn test_cost_estimate() {
        let pricing = Pricing::default();
        let cost = estimate_cost(1_000_000, &pricing);
        assert_eq!(cost.standard, 4.0);
        assert_eq!(cost.neural, 16.0);

        let cost = estimate_cost(250_000, &pricing);
        assert_eq!(cost.standard, 1.0);
        assert_eq!(cost.neural, 4.0);

        let cost = estimate_cost(0, &pricing);
        assert_eq!(cost.standard, 0.0);
    }

    #[test]
    fn test_long_segment_warning() {
        let document = format!("<speak>{}</speak>", "a".repeat(600));
        let (_, warnings) = metrics(&document);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].starts_with("Long text segment: 600 characters"));
    }

    #[test]
    fn test_segment_boundary_is_exclusive() {
        let document = format!("<speak>{}</speak>", "a".repeat(500));
        let (_, warnings) = metrics(&document);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_breaks_split_segments() {
        let text = "a".repeat(400);
        let document = format!(r#"<speak>{text}<break time="1s"/>{text}</speak>"#);
        let (_, warnings) = metrics(&document);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_long_segment_reported_once() {
        let text = "a".repeat(600);
        let document = format!("<speak>{text}<break/>{text}<break/>{text}</speak>");
        let (_, warnings) = metrics(&document);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_markup_inside_segment_not_counted() {
        let text = "a".repeat(250);
        let document = format!(
            r#"<speak><prosody rate="slow">{text}</prosody><emphasis>{text}</emphasis></speak>"#
        );
        let (_, warnings) = metrics(&document);
        assert!(warnings.is_empty());
    }

    fn nested(levels: usize) -> String {
        let names = ["speak", "p", "s", "prosody", "emphasis", "w", "sub"];
        let mut document = String::new();
        for name in &names[..levels] {
            document.push_str(&format!("<{name}>"));
        }
        document.push('x');
        for name in names[..levels].iter().rev() {
            document.push_str(&format!("</{name}>"));
        }
        document
    }

    #[test]
    fn test_nesting_depth_boundary() {
        let (_, warnings) = metrics(&nested(5));
        assert!(warnings.is_empty());

        let (_, warnings) = metrics(&nested(6));
        assert_eq!(
            warnings,
            vec!["Deep nesting detected: 6 levels (recommended maximum 5)"]
        );
    }

    #[test]
    fn test_self_closing_does_not_nest() {
        let (_, warnings) = metrics("<speak><p><s><prosody><emphasis><break/></emphasis></prosody></s></p></speak>");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_empty_tags_warned_once() {
        let (_, warnings) = metrics("<speak><p></p><s></s></speak>");
        assert_eq!(warnings, vec!["Empty tags detected"]);
    }

    #[test]
    fn test_whitespace_is_not_empty() {
        let (_, warnings) = metrics("<speak><p> </p></speak>");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_self_closing_is_not_empty_pair() {
        let (_, warnings) = metrics("<speak>a<break/></speak>");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_segment_span() {
        let document = format!("<speak>hi<break/>{}</speak>", "b".repeat(501));
        let schema = embedded_polly_schema().expect("embedded schema");
        let tokens = tokenize(&document);
        let segments = text_segments(&document, &tokens, &schema);

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].chars, 2);
        assert_eq!(segments[0].span, Span::new(0, 9));
        assert_eq!(segments[1].chars, 501);
        assert_eq!(segments[1].span, Span::new(17, document.len()));
    }
}
