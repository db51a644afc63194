//! Schema conformance pass
//!
//! Checks every opening and self-closing tag against the schema. Unknown
//! tags are only warned about since engines typically ignore them;
//! violations on supported tags are errors.

use crate::parser::{parse_attributes, Token, TokenKind};
use crate::schema::Schema;

use super::engine::{Findings, Span};

pub(crate) fn check_schema_conformance(
    tokens: &[Token<'_>],
    schema: &Schema,
    findings: &mut Findings,
) {
    for token in tokens {
        if !matches!(token.kind, TokenKind::Opening | TokenKind::SelfClosing) {
            continue;
        }
        let span = Some(Span::new(token.start, token.end));

        let Some(tag) = schema.tag(token.name) else {
            findings.add_warning(span, format!("Unsupported tag: <{}>", token.name));
            continue;
        };

        let attributes = parse_attributes(token.attributes);

        // Self-closing forms are assumed complete
        if token.kind == TokenKind::Opening {
            for required in &tag.required {
                if !attributes.iter().any(|attr| attr.name == required.as_str()) {
                    findings.add_error(
                        span,
                        format!(
                            "Missing required attribute '{}' for tag <{}>",
                            required, tag.name
                        ),
                    );
                }
            }
        }

        for attr in &attributes {
            if let Some(constraint) = tag.constraint(attr.name) {
                if !constraint.allows(attr.value) {
                    findings.add_error(
                        span,
                        format!(
                            "Invalid value '{}' for attribute '{}' in tag <{}>",
                            attr.value, attr.name, tag.name
                        ),
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::tokenize;
    use crate::schema::embedded_polly_schema;

    fn conformance(document: &str) -> (Vec<String>, Vec<String>) {
        let schema = embedded_polly_schema().expect("embedded schema");
        let mut findings = Findings::default();
        check_schema_conformance(&tokenize(document), &schema, &mut findings);

        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        for diagnostic in findings.diagnostics {
            match diagnostic.severity {
                crate::validation::Severity::Error => errors.push(diagnostic.message),
                crate::validation::Severity::Warning => warnings.push(diagnostic.message),
            }
        }
        (errors, warnings)
    }

    #[test]
    fn test_conformant_tags() {
        let (errors, warnings) = conformance(
            r#"<speak><prosody rate="90%" volume="+6dB" pitch="high">a</prosody><say-as interpret-as="digits">12</say-as><amazon:breath duration="long"/></speak>"#,
        );
        assert!(errors.is_empty(), "{errors:?}");
        assert!(warnings.is_empty(), "{warnings:?}");
    }

    #[test]
    fn test_unsupported_tag_is_warning() {
        let (errors, warnings) =
            conformance(r#"<speak><badtag level="x">x</badtag><audio src="a"/></speak>"#);
        assert!(errors.is_empty());
        assert_eq!(
            warnings,
            vec!["Unsupported tag: <badtag>", "Unsupported tag: <audio>"]
        );
    }

    #[test]
    fn test_missing_required_attributes_each_reported() {
        let (errors, _) = conformance("<speak><phoneme>tomato</phoneme></speak>");
        assert_eq!(
            errors,
            vec![
                "Missing required attribute 'alphabet' for tag <phoneme>",
                "Missing required attribute 'ph' for tag <phoneme>",
            ]
        );
    }

    #[test]
    fn test_self_closing_skips_required_attributes() {
        let (errors, _) = conformance("<speak><mark/></speak>");
        assert!(errors.is_empty());
    }

    #[test]
    fn test_single_quoted_attribute_not_recognized() {
        let (errors, _) = conformance("<speak><sub alias='World Wide Web'>WWW</sub></speak>");
        assert_eq!(errors, vec!["Missing required attribute 'alias' for tag <sub>"]);
    }

    #[test]
    fn test_invalid_enumerated_value() {
        let (errors, _) = conformance(r#"<speak><break strength="invalid-value"/></speak>"#);
        assert_eq!(
            errors,
            vec!["Invalid value 'invalid-value' for attribute 'strength' in tag <break>"]
        );
    }

    #[test]
    fn test_pattern_and_mixed_values() {
        let (errors, _) = conformance(
            r#"<speak><break time="3 seconds"/><prosody rate="fastest">a</prosody><prosody rate="200%">b</prosody></speak>"#,
        );
        assert_eq!(
            errors,
            vec![
                "Invalid value '3 seconds' for attribute 'time' in tag <break>",
                "Invalid value 'fastest' for attribute 'rate' in tag <prosody>",
            ]
        );
    }

    #[test]
    fn test_values_are_case_sensitive() {
        let (errors, _) = conformance(r#"<speak><emphasis level="Strong">a</emphasis></speak>"#);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_unconstrained_attributes_accept_anything() {
        let (errors, _) =
            conformance(r#"<speak><mark name="anything goes"/><p data-x="1">a</p></speak>"#);
        assert!(errors.is_empty());
    }
}
