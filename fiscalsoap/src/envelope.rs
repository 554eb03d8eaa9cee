//! Structures de l'enveloppe SOAP et description d'une opération

use xmltree::Element;

/// Parsed SOAP envelope
#[derive(Debug, Clone)]
pub struct SoapEnvelope {
    /// Namespace of the `Envelope` element
    pub namespace: Option<String>,

    /// En-tête SOAP optionnel
    pub header: Option<SoapHeader>,

    pub body: SoapBody,
}

/// En-tête SOAP
#[derive(Debug, Clone)]
pub struct SoapHeader {
    pub content: Element,
}

/// Corps SOAP
#[derive(Debug, Clone)]
pub struct SoapBody {
    /// Contenu XML brut du corps
    pub content: Element,
}

impl SoapBody {
    /// First element child of the body
    pub fn first_element(&self) -> Option<&Element> {
        self.content.children.iter().find_map(|n| n.as_element())
    }

    /// Child whose local name ends with `suffix` (e.g. `ResultMsg`)
    pub fn child_ending_with(&self, suffix: &str) -> Option<&Element> {
        self.content
            .children
            .iter()
            .filter_map(|n| n.as_element())
            .find(|e| e.name.ends_with(suffix))
    }
}

/// How the request envelope is built and the response resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeMode {
    /// A generated binding exists for the operation
    SchemaBound {
        /// WSDL target namespace of the operation
        namespace: String,
    },
    /// Hand-built envelope around a rendered fragment
    Generic,
}

/// Description of one SOAP operation, built fresh for every request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub style: String,
    pub location: String,
    pub input_type: &'static str,
    pub output_type: &'static str,
    pub soap_action: String,
    /// Service family (`nfe`, `cte`, `mdfe`, `bpe`)
    pub service: String,
    pub envelope: EnvelopeMode,
}

impl ServiceConfig {
    pub fn is_generic(&self) -> bool {
        matches!(self.envelope, EnvelopeMode::Generic)
    }
}
