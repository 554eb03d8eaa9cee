//! Opérations WSDL et actions adressées au client

use fiscalsoap::FiscalMessage;

/// One operation of a fiscal WSDL, as emitted by the binding generator
pub trait WsdlOperation {
    type Input: FiscalMessage;
    /// Concrete type of the `xsd:any` result
    type Output: FiscalMessage;

    /// Operation name (e.g. `nfeStatusServicoNF`)
    const NAME: &'static str;
    /// WSDL-declared endpoint
    const LOCATION: &'static str;
    /// WSDL target namespace, also the `<service>DadosMsg` namespace
    const NAMESPACE: &'static str;
    const SOAP_ACTION: &'static str;
    const STYLE: &'static str = "document";
}

/// Type-erased view of a [`WsdlOperation`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationRef {
    pub name: &'static str,
    pub location: &'static str,
    pub namespace: &'static str,
    pub soap_action: &'static str,
    pub style: &'static str,
    pub input_type: &'static str,
    pub output_type: &'static str,
}

impl OperationRef {
    pub fn of<O: WsdlOperation>() -> Self {
        Self {
            name: O::NAME,
            location: O::LOCATION,
            namespace: O::NAMESPACE,
            soap_action: O::SOAP_ACTION,
            style: O::STYLE,
            input_type: <O::Input as FiscalMessage>::type_name(),
            output_type: <O::Output as FiscalMessage>::type_name(),
        }
    }
}

/// Target of a `send`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Operation with generated bindings
    SchemaBound(OperationRef),
    /// Absolute URL, or path relative to the service base URL
    Generic(String),
}

impl Action {
    pub fn operation<O: WsdlOperation>() -> Self {
        Action::SchemaBound(OperationRef::of::<O>())
    }
}

impl From<&str> for Action {
    fn from(url: &str) -> Self {
        Action::Generic(url.to_string())
    }
}

impl From<String> for Action {
    fn from(url: String) -> Self {
        Action::Generic(url)
    }
}

impl From<OperationRef> for Action {
    fn from(operation: OperationRef) -> Self {
        Action::SchemaBound(operation)
    }
}
