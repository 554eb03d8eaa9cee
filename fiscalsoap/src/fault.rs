//! SOAP Faults renvoyés par les autorités fiscales

use crate::any_element::write_element;
use crate::dialect::{ENVELOPE_PREFIX, SoapDialect};
use crate::envelope::SoapBody;
use crate::error::SoapError;
use xmltree::{Element, XMLNode};

/// Erreur SOAP (Fault)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoapFault {
    /// Code d'erreur (ex: "soap:Server", "soap:Receiver")
    pub fault_code: String,

    /// Description de l'erreur
    pub fault_string: String,
}

impl SoapFault {
    pub fn new(fault_code: impl Into<String>, fault_string: impl Into<String>) -> Self {
        Self {
            fault_code: fault_code.into(),
            fault_string: fault_string.into(),
        }
    }

    /// Extracts a fault from a SOAP body, if the body carries one
    ///
    /// Understands both the SOAP 1.1 (`faultcode`/`faultstring`) and the
    /// SOAP 1.2 (`Code/Value`, `Reason/Text`) layouts.
    pub fn from_body(body: &SoapBody) -> Option<Self> {
        let fault = body.child_ending_with("Fault")?;

        let code = child_text(fault, "faultcode")
            .or_else(|| {
                fault
                    .get_child("Code")
                    .and_then(|c| child_text(c, "Value"))
            })
            .unwrap_or_default();

        let reason = child_text(fault, "faultstring")
            .or_else(|| {
                fault
                    .get_child("Reason")
                    .and_then(|r| child_text(r, "Text"))
            })
            .unwrap_or_default();

        Some(Self::new(code, reason))
    }
}

impl From<SoapFault> for SoapError {
    fn from(fault: SoapFault) -> Self {
        SoapError::Fault {
            code: fault.fault_code,
            reason: fault.fault_string,
        }
    }
}

fn child_text(elem: &Element, name: &str) -> Option<String> {
    elem.get_child(name)
        .and_then(|c| c.get_text())
        .map(|t| t.trim().to_string())
}

fn text_element(name: &str, text: &str) -> Element {
    let mut elem = Element::new(name);
    elem.children.push(XMLNode::Text(text.to_string()));
    elem
}

/// Construit un SOAP Fault XML dans le dialecte demandé
///
/// # Arguments
///
/// * `dialect` - Version SOAP de l'enveloppe
/// * `fault_code` - Code du fault (ex: "soapenv:Server")
/// * `fault_string` - Message d'erreur
pub fn build_soap_fault(
    dialect: SoapDialect,
    fault_code: &str,
    fault_string: &str,
) -> Result<String, SoapError> {
    let mut fault = Element::new(&format!("{ENVELOPE_PREFIX}:Fault"));

    match dialect {
        SoapDialect::Soap11 => {
            fault
                .children
                .push(XMLNode::Element(text_element("faultcode", fault_code)));
            fault
                .children
                .push(XMLNode::Element(text_element("faultstring", fault_string)));
        }
        SoapDialect::Soap12 => {
            let mut code = Element::new(&format!("{ENVELOPE_PREFIX}:Code"));
            code.children.push(XMLNode::Element(text_element(
                &format!("{ENVELOPE_PREFIX}:Value"),
                fault_code,
            )));
            let mut reason = Element::new(&format!("{ENVELOPE_PREFIX}:Reason"));
            reason.children.push(XMLNode::Element(text_element(
                &format!("{ENVELOPE_PREFIX}:Text"),
                fault_string,
            )));
            fault.children.push(XMLNode::Element(code));
            fault.children.push(XMLNode::Element(reason));
        }
    }

    let mut body = Element::new(&format!("{ENVELOPE_PREFIX}:Body"));
    body.children.push(XMLNode::Element(fault));

    let mut envelope = Element::new(&format!("{ENVELOPE_PREFIX}:Envelope"));
    envelope.attributes.insert(
        format!("xmlns:{ENVELOPE_PREFIX}"),
        dialect.envelope_namespace().to_string(),
    );
    envelope.children.push(XMLNode::Element(body));

    write_element(&envelope, true, true)
}
