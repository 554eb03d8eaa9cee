//! SOAP 1.1 / SOAP 1.2 envelope dialects

use std::borrow::Cow;
use tracing::warn;

/// SOAP 1.1 envelope namespace
pub const SOAP11_ENV_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// SOAP 1.2 envelope namespace
pub const SOAP12_ENV_NS: &str = "http://www.w3.org/2003/05/soap-envelope";

/// Prefix bound to the envelope namespace in every request we build
pub const ENVELOPE_PREFIX: &str = "soapenv";

/// Envelope namespace version a message declares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SoapDialect {
    #[default]
    Soap11,
    Soap12,
}

impl SoapDialect {
    pub fn envelope_namespace(self) -> &'static str {
        match self {
            SoapDialect::Soap11 => SOAP11_ENV_NS,
            SoapDialect::Soap12 => SOAP12_ENV_NS,
        }
    }

    pub fn from_namespace(namespace: &str) -> Option<Self> {
        match namespace {
            SOAP11_ENV_NS => Some(SoapDialect::Soap11),
            SOAP12_ENV_NS => Some(SoapDialect::Soap12),
            _ => None,
        }
    }

    /// HTTP headers announcing the dialect and the SOAP action
    ///
    /// SOAP 1.1 carries the action in a `SOAPAction` header, SOAP 1.2 in the
    /// `action` parameter of the content type.
    pub fn headers(self, soap_action: &str) -> Vec<(String, String)> {
        match self {
            SoapDialect::Soap11 => vec![
                (
                    "Content-Type".to_string(),
                    "text/xml; charset=utf-8".to_string(),
                ),
                ("SOAPAction".to_string(), format!("\"{soap_action}\"")),
            ],
            SoapDialect::Soap12 => vec![(
                "Content-Type".to_string(),
                format!("application/soap+xml; charset=utf-8; action=\"{soap_action}\""),
            )],
        }
    }

    /// Rewrites the envelope namespace declaration of a rendered request
    ///
    /// Plain text substitution: the payload may hold signed content that must
    /// not be re-rendered.
    pub fn rewrite_request(self, data: String) -> String {
        match self {
            SoapDialect::Soap11 => data,
            SoapDialect::Soap12 => data.replace(
                &format!("xmlns:{ENVELOPE_PREFIX}=\"{SOAP11_ENV_NS}\""),
                &format!("xmlns:{ENVELOPE_PREFIX}=\"{SOAP12_ENV_NS}\""),
            ),
        }
    }
}

/// Brings a response back to the SOAP 1.1 dialect the parser expects
///
/// Some authorities (e.g. Paraná for NFe) answer with the SOAP 1.2 namespace
/// to SOAP 1.1 requests. The namespace is rewritten when the client itself
/// speaks SOAP 1.2, or when the response only mentions SOAP 1.2 and the
/// caller did not ask to be told about mismatches. This is a best-effort
/// heuristic, kept loose on purpose for non-compliant servers.
pub fn normalize_response<'a>(
    response: &'a str,
    sent: SoapDialect,
    raise_on_mismatch: bool,
) -> Cow<'a, str> {
    let only_soap12 = response.contains(SOAP12_ENV_NS) && !response.contains(SOAP11_ENV_NS);

    if sent == SoapDialect::Soap12 || (!raise_on_mismatch && only_soap12) {
        if response.contains(SOAP12_ENV_NS) {
            warn!("SOAP 1.2 namespace found in response, rewriting it to SOAP 1.1 for parsing");
            return Cow::Owned(response.replace(SOAP12_ENV_NS, SOAP11_ENV_NS));
        }
    }

    Cow::Borrowed(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOAP12_BODY: &str =
        r#"<soap:Envelope xmlns:soap="http://www.w3.org/2003/05/soap-envelope"><soap:Body/></soap:Envelope>"#;

    #[test]
    fn test_rewrite_request_only_for_soap12() {
        let data = format!(r#"<soapenv:Envelope xmlns:soapenv="{SOAP11_ENV_NS}"/>"#);

        let same = SoapDialect::Soap11.rewrite_request(data.clone());
        assert_eq!(same, data);

        let rewritten = SoapDialect::Soap12.rewrite_request(data);
        assert!(rewritten.contains(SOAP12_ENV_NS));
        assert!(!rewritten.contains(SOAP11_ENV_NS));
    }

    #[test]
    fn test_soap12_response_repaired_by_default() {
        let normalized = normalize_response(SOAP12_BODY, SoapDialect::Soap11, false);
        assert!(normalized.contains(SOAP11_ENV_NS));
        assert!(!normalized.contains(SOAP12_ENV_NS));
    }

    #[test]
    fn test_soap12_response_left_alone_when_raising() {
        let normalized = normalize_response(SOAP12_BODY, SoapDialect::Soap11, true);
        assert_eq!(normalized, SOAP12_BODY);
    }

    #[test]
    fn test_soap12_client_always_repairs() {
        let normalized = normalize_response(SOAP12_BODY, SoapDialect::Soap12, true);
        assert!(normalized.contains(SOAP11_ENV_NS));
    }

    #[test]
    fn test_mixed_namespaces_not_repaired() {
        let mixed = format!(
            r#"<soap:Envelope xmlns:soap="{SOAP12_ENV_NS}" xmlns:old="{SOAP11_ENV_NS}"/>"#
        );
        let normalized = normalize_response(&mixed, SoapDialect::Soap11, false);
        assert_eq!(normalized, mixed);
    }

    #[test]
    fn test_headers_follow_dialect() {
        let soap11 = SoapDialect::Soap11.headers("urn:action");
        assert!(soap11.iter().any(|(k, v)| k == "SOAPAction" && v == "\"urn:action\""));

        let soap12 = SoapDialect::Soap12.headers("urn:action");
        assert_eq!(soap12.len(), 1);
        assert!(soap12[0].1.starts_with("application/soap+xml"));
        assert!(soap12[0].1.contains("action=\"urn:action\""));
    }
}
