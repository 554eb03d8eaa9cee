//! Gestion des erreurs pour le client fiscal

use fiscalsoap::SoapError;
use thiserror::Error;

/// Type Result personnalisé pour fiscalclient
pub type Result<T> = std::result::Result<T, FiscalError>;

/// Erreurs possibles lors d'un échange avec une autorité fiscale
#[derive(Error, Debug)]
pub enum FiscalError {
    /// Paramètre de construction invalide (environnement, UF, certificat...)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Erreur de configuration (anyhow)
    #[error("Configuration file error: {0}")]
    Config(#[from] anyhow::Error),

    /// Le payload ne correspond pas au type d'entrée de l'opération
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Erreur HTTP (réseau, DNS, TLS, timeout)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Statut HTTP non récupérable, ou tentatives épuisées
    #[error("HTTP status {status} from {url} after {attempts} attempt(s)")]
    HttpStatus {
        url: String,
        status: u16,
        attempts: u32,
    },

    /// URL de destination inutilisable
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("SOAP dialect mismatch: expected namespace {expected}, found {observed}")]
    DialectMismatch { expected: String, observed: String },

    /// Réponse XML mal formée ou incompatible avec le type attendu
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Empty result: {0}")]
    EmptyResult(String),

    /// SOAP Fault renvoyé par l'autorité
    #[error("SOAP Fault {code}: {reason}")]
    Fault { code: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl FiscalError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Vérifie si l'erreur vient du transport (réseau ou statut HTTP)
    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            FiscalError::Http(_) | FiscalError::HttpStatus { .. } | FiscalError::Transport(_)
        )
    }

    pub fn is_configuration_error(&self) -> bool {
        matches!(self, FiscalError::Configuration(_) | FiscalError::Config(_))
    }
}

impl From<SoapError> for FiscalError {
    fn from(err: SoapError) -> Self {
        match err {
            SoapError::InvalidInput(msg) => Self::InvalidInput(msg),
            SoapError::Serialization(msg) => Self::Serialization(msg),
            SoapError::DialectMismatch { expected, observed } => {
                Self::DialectMismatch { expected, observed }
            }
            SoapError::EmptyResult(msg) => Self::EmptyResult(msg),
            SoapError::Fault { code, reason } => Self::Fault { code, reason },
            other => Self::Parse(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soap_errors_keep_their_class() {
        let err: FiscalError = SoapError::DialectMismatch {
            expected: "a".to_string(),
            observed: "b".to_string(),
        }
        .into();
        assert!(matches!(err, FiscalError::DialectMismatch { .. }));

        let err: FiscalError = SoapError::MissingBody.into();
        assert!(matches!(err, FiscalError::Parse(_)));

        let err: FiscalError = SoapError::InvalidInput("x".to_string()).into();
        assert!(matches!(err, FiscalError::InvalidInput(_)));
    }

    #[test]
    fn test_transport_grouping() {
        let err = FiscalError::HttpStatus {
            url: "https://sefaz/ws".to_string(),
            status: 503,
            attempts: 3,
        };
        assert!(err.is_transport_error());
        assert!(!FiscalError::Parse("x".to_string()).is_transport_error());
        assert!(FiscalError::configuration("bad").is_configuration_error());
    }
}
