//! Substitution d'un fragment déjà signé dans le payload rendu

use crate::error::SoapError;
use regex::Regex;

/// Splices pre-rendered XML into a request without re-serializing it
///
/// The first match of `pattern` in the rendered envelope is replaced verbatim
/// by `content`, then every `\n` and `\r` is removed from the whole payload.
#[derive(Debug, Clone)]
pub struct PlaceholderDirective {
    pattern: Regex,
    content: String,
}

impl PlaceholderDirective {
    pub fn new(pattern: &str, content: impl Into<String>) -> Result<Self, SoapError> {
        let pattern = Regex::new(pattern)
            .map_err(|e| SoapError::InvalidInput(format!("invalid placeholder pattern: {e}")))?;
        Ok(Self {
            pattern,
            content: content.into(),
        })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Applies the substitution
    ///
    /// Without a match, or with empty replacement content, the payload is
    /// returned untouched.
    pub fn apply(&self, payload: String) -> String {
        if self.content.is_empty() {
            return payload;
        }
        let Some(found) = self.pattern.find(&payload) else {
            return payload;
        };

        let mut spliced = String::with_capacity(payload.len() + self.content.len());
        spliced.push_str(&payload[..found.start()]);
        spliced.push_str(&self.content);
        spliced.push_str(&payload[found.end()..]);
        spliced.retain(|c| c != '\n' && c != '\r');
        spliced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RENDERED: &str = "<enviNFe versao=\"4.00\">\n  <idLote>1</idLote>\r\n  <NFe>placeholder</NFe>\n</enviNFe>";

    #[test]
    fn test_replacement_is_verbatim_and_single_line() {
        let signed = "<NFe><infNFe Id=\"NFe42\"/><Signature>abc</Signature></NFe>";
        let directive = PlaceholderDirective::new("<NFe>.*?</NFe>", signed).unwrap();

        let out = directive.apply(RENDERED.to_string());

        assert!(out.contains(signed));
        assert!(!out.contains("placeholder"));
        assert!(!out.contains('\n'));
        assert!(!out.contains('\r'));
        assert!(out.starts_with("<enviNFe"));
    }

    #[test]
    fn test_only_first_match_is_replaced() {
        let directive = PlaceholderDirective::new("X", "<y/>").unwrap();
        let out = directive.apply("<a>X</a><b>X</b>".to_string());
        assert_eq!(out, "<a><y/></a><b>X</b>");
    }

    #[test]
    fn test_no_match_leaves_payload_unchanged() {
        let directive = PlaceholderDirective::new("<missing/>", "<NFe/>").unwrap();
        let out = directive.apply(RENDERED.to_string());
        assert_eq!(out, RENDERED);
    }

    #[test]
    fn test_empty_content_is_a_no_op() {
        let directive = PlaceholderDirective::new("<NFe>.*?</NFe>", "").unwrap();
        assert_eq!(directive.apply(RENDERED.to_string()), RENDERED);
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let err = PlaceholderDirective::new("(unclosed", "x").unwrap_err();
        assert!(matches!(err, SoapError::InvalidInput(_)));
    }
}
