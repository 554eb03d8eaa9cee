//! Parser SOAP des réponses des autorités

use crate::any_element::AnyElement;
use crate::dialect::{SOAP11_ENV_NS, SoapDialect, normalize_response};
use crate::envelope::{EnvelopeMode, SoapBody, SoapEnvelope, SoapHeader};
use crate::error::SoapError;
use crate::fault::SoapFault;
use crate::fiscal_namespace;
use crate::message::{FiscalMessage, parse_message};
use std::io::BufReader;
use tracing::{debug, error};
use xmltree::Element;

/// Parse une enveloppe SOAP complète
pub fn parse_soap_envelope(xml: &[u8]) -> Result<SoapEnvelope, SoapError> {
    let reader = BufReader::new(xml);
    let root = Element::parse(reader)?;

    // Vérifier que c'est bien une Envelope
    if !root.name.ends_with("Envelope") {
        return Err(SoapError::MissingEnvelope);
    }

    let header = root
        .children
        .iter()
        .find_map(|n| n.as_element())
        .filter(|e| e.name.ends_with("Header"))
        .map(|e| SoapHeader { content: e.clone() });

    let body_elem = root
        .get_child("Body")
        .or_else(|| {
            root.children
                .iter()
                .find_map(|n| n.as_element().filter(|e| e.name.ends_with("Body")))
        })
        .ok_or(SoapError::MissingBody)?;

    Ok(SoapEnvelope {
        namespace: root.namespace.clone(),
        header,
        body: SoapBody {
            content: body_elem.clone(),
        },
    })
}

/// Turns a raw authority response into the caller's concrete type
#[derive(Debug, Clone)]
pub struct ResponseResolver {
    service: String,
    dialect: SoapDialect,
}

impl ResponseResolver {
    /// # Arguments
    ///
    /// * `service` - Service family, used for the `<service>ResultMsg` lookup
    /// * `dialect` - Dialect the requests are sent in
    pub fn new(service: impl Into<String>, dialect: SoapDialect) -> Self {
        Self {
            service: service.into(),
            dialect,
        }
    }

    /// Resolves the wildcard result of a response
    ///
    /// The response is first parsed loosely; its result element is then
    /// rendered on its own under the fiscal namespace and parsed again as `R`.
    pub fn resolve<R: FiscalMessage>(
        &self,
        raw: &[u8],
        mode: &EnvelopeMode,
        raise_on_mismatch: bool,
    ) -> Result<R, SoapError> {
        let text = String::from_utf8_lossy(raw);
        debug!("📥 SOAP response:\n{}", text);

        let text = normalize_response(&text, self.dialect, raise_on_mismatch);

        let result = self.resolve_text(&text, mode, raise_on_mismatch);
        if let Err(err) = &result {
            if err.is_parse_error() {
                error!("❌ Cannot parse SOAP response ({}):\n{}", err, text);
            }
        }
        result
    }

    fn resolve_text<R: FiscalMessage>(
        &self,
        text: &str,
        mode: &EnvelopeMode,
        raise_on_mismatch: bool,
    ) -> Result<R, SoapError> {
        let envelope = parse_soap_envelope(text.as_bytes())?;

        let observed = envelope.namespace.clone().unwrap_or_default();
        if observed != SOAP11_ENV_NS {
            if raise_on_mismatch {
                return Err(SoapError::DialectMismatch {
                    expected: SOAP11_ENV_NS.to_string(),
                    observed,
                });
            }
            return Err(SoapError::parse(format!(
                "unexpected envelope namespace `{observed}`"
            )));
        }

        if let Some(fault) = SoapFault::from_body(&envelope.body) {
            return Err(fault.into());
        }

        let fiscal_ns = fiscal_namespace(&self.service);
        let result = match mode {
            EnvelopeMode::SchemaBound { .. } => self.wildcard::<R>(&envelope.body)?,
            EnvelopeMode::Generic => self.positional(&envelope.body)?,
        };

        let xml = result.render(R::TAG, Some(&fiscal_ns))?;
        parse_message(&xml)
    }

    /// `content[0]` of the `<service>ResultMsg` element, checked against `R`
    fn wildcard<R: FiscalMessage>(&self, body: &SoapBody) -> Result<AnyElement, SoapError> {
        let result_name = format!("{}ResultMsg", self.service);
        let result_msg = body
            .child_ending_with("ResultMsg")
            .filter(|e| e.name.eq_ignore_ascii_case(&result_name))
            .ok_or_else(|| SoapError::parse(format!("missing `{result_name}` in SOAP body")))?;

        let content = result_msg
            .children
            .iter()
            .find_map(|n| n.as_element())
            .ok_or_else(|| SoapError::EmptyResult(result_name.clone()))?;

        let mut any = AnyElement::from_element(content);
        if any.local_name() != Some(R::TAG) {
            return Err(SoapError::parse(format!(
                "result holds `{}`, expected `{}`",
                any.local_name().unwrap_or_default(),
                R::TAG
            )));
        }
        any.clear_markers();
        Ok(any)
    }

    /// Envelope / Body / ResultMsg / first element, by position only
    fn positional(&self, body: &SoapBody) -> Result<AnyElement, SoapError> {
        let result_msg = body
            .first_element()
            .ok_or_else(|| SoapError::parse("empty SOAP body"))?;
        let content = result_msg
            .children
            .iter()
            .find_map(|n| n.as_element())
            .ok_or_else(|| SoapError::EmptyResult(result_msg.name.clone()))?;
        Ok(AnyElement::from_element(content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::SOAP12_ENV_NS;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct RetConsStat {
        #[serde(rename = "@versao")]
        versao: String,
        #[serde(rename = "tpAmb")]
        tp_amb: String,
        #[serde(rename = "cStat")]
        c_stat: String,
        #[serde(rename = "xMotivo")]
        x_motivo: String,
    }

    impl FiscalMessage for RetConsStat {
        const TAG: &'static str = "retConsStatServ";
    }

    fn response(env_ns: &str, result: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<soap:Envelope xmlns:soap="{env_ns}" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <soap:Body>
    <nfeResultMsg xmlns="http://www.portalfiscal.inf.br/nfe/wsdl/NFeStatusServico4">{result}</nfeResultMsg>
  </soap:Body>
</soap:Envelope>"#
        )
    }

    const RESULT: &str = r#"<retConsStatServ versao="4.00" xmlns="http://www.portalfiscal.inf.br/nfe"><tpAmb>2</tpAmb><cStat>107</cStat><xMotivo>Servico em Operacao</xMotivo></retConsStatServ>"#;

    fn schema_bound() -> EnvelopeMode {
        EnvelopeMode::SchemaBound {
            namespace: "http://www.portalfiscal.inf.br/nfe/wsdl/NFeStatusServico4".to_string(),
        }
    }

    #[test]
    fn test_parse_envelope_keeps_namespace() {
        let xml = response(SOAP11_ENV_NS, RESULT);
        let envelope = parse_soap_envelope(xml.as_bytes()).unwrap();
        assert_eq!(envelope.namespace.as_deref(), Some(SOAP11_ENV_NS));
        assert!(envelope.header.is_none());
        assert!(envelope.body.child_ending_with("ResultMsg").is_some());
    }

    #[test]
    fn test_parse_rejects_non_envelope() {
        let err = parse_soap_envelope(b"<html><body/></html>").unwrap_err();
        assert!(matches!(err, SoapError::MissingEnvelope));
    }

    #[test]
    fn test_schema_bound_resolution() {
        let resolver = ResponseResolver::new("nfe", SoapDialect::Soap11);
        let xml = response(SOAP11_ENV_NS, RESULT);

        let ret: RetConsStat = resolver.resolve(xml.as_bytes(), &schema_bound(), false).unwrap();

        assert_eq!(ret.c_stat, "107");
        assert_eq!(ret.x_motivo, "Servico em Operacao");
        assert_eq!(ret.versao, "4.00");
    }

    #[test]
    fn test_generic_resolution() {
        let resolver = ResponseResolver::new("nfe", SoapDialect::Soap11);
        let xml = response(SOAP11_ENV_NS, RESULT);

        let ret: RetConsStat = resolver
            .resolve(xml.as_bytes(), &EnvelopeMode::Generic, false)
            .unwrap();
        assert_eq!(ret.c_stat, "107");
    }

    #[test]
    fn test_empty_result() {
        let resolver = ResponseResolver::new("nfe", SoapDialect::Soap11);
        let xml = response(SOAP11_ENV_NS, "");

        let err = resolver
            .resolve::<RetConsStat>(xml.as_bytes(), &schema_bound(), false)
            .unwrap_err();
        assert!(matches!(err, SoapError::EmptyResult(_)));
    }

    #[test]
    fn test_wrong_result_type_is_a_parse_error() {
        let resolver = ResponseResolver::new("nfe", SoapDialect::Soap11);
        let xml = response(
            SOAP11_ENV_NS,
            r#"<retEnviNFe xmlns="http://www.portalfiscal.inf.br/nfe"><cStat>103</cStat></retEnviNFe>"#,
        );

        let err = resolver
            .resolve::<RetConsStat>(xml.as_bytes(), &schema_bound(), false)
            .unwrap_err();
        assert!(matches!(err, SoapError::Parse(_)));
    }

    #[test]
    fn test_soap12_response_repaired_without_raise() {
        let resolver = ResponseResolver::new("nfe", SoapDialect::Soap11);
        let xml = response(SOAP12_ENV_NS, RESULT);

        let ret: RetConsStat = resolver.resolve(xml.as_bytes(), &schema_bound(), false).unwrap();
        assert_eq!(ret.c_stat, "107");
    }

    #[test]
    fn test_soap12_response_raises_mismatch() {
        let resolver = ResponseResolver::new("nfe", SoapDialect::Soap11);
        let xml = response(SOAP12_ENV_NS, RESULT);

        let err = resolver
            .resolve::<RetConsStat>(xml.as_bytes(), &schema_bound(), true)
            .unwrap_err();
        match err {
            SoapError::DialectMismatch { expected, observed } => {
                assert_eq!(expected, SOAP11_ENV_NS);
                assert_eq!(observed, SOAP12_ENV_NS);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_fault_is_reported() {
        let resolver = ResponseResolver::new("nfe", SoapDialect::Soap11);
        let xml = crate::fault::build_soap_fault(SoapDialect::Soap11, "soap:Server", "Erro")
            .unwrap();

        let err = resolver
            .resolve::<RetConsStat>(xml.as_bytes(), &schema_bound(), false)
            .unwrap_err();
        assert!(matches!(err, SoapError::Fault { .. }));
    }

    #[test]
    fn test_garbage_is_a_parse_error() {
        let resolver = ResponseResolver::new("nfe", SoapDialect::Soap11);
        let err = resolver
            .resolve::<RetConsStat>(b"<Envelope", &schema_bound(), false)
            .unwrap_err();
        assert!(err.is_parse_error());
    }
}
