//! Erreurs de la couche SOAP

use thiserror::Error;

/// Errors raised while building or resolving a SOAP message
#[derive(Debug, Error)]
pub enum SoapError {
    /// The payload does not match the operation input type
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The payload could not be rendered to XML
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("XML parse error: {0}")]
    Xml(#[from] xmltree::ParseError),

    /// Well-formed XML that does not fit the expected structure or type
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Missing SOAP Envelope")]
    MissingEnvelope,

    #[error("Missing SOAP Body")]
    MissingBody,

    #[error("SOAP dialect mismatch: expected namespace {expected}, found {observed}")]
    DialectMismatch { expected: String, observed: String },

    #[error("Empty result: {0} has no content")]
    EmptyResult(String),

    /// SOAP Fault returned by the remote service
    #[error("SOAP Fault {code}: {reason}")]
    Fault { code: String, reason: String },
}

impl SoapError {
    pub fn parse(message: impl Into<String>) -> Self {
        SoapError::Parse(message.into())
    }

    pub fn serialization(err: impl std::fmt::Display) -> Self {
        SoapError::Serialization(err.to_string())
    }

    /// True for every error caused by the response document
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            SoapError::Xml(_)
                | SoapError::Parse(_)
                | SoapError::MissingEnvelope
                | SoapError::MissingBody
        )
    }
}
