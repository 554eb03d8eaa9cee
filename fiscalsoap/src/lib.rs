//! # fiscalsoap - Enveloppes SOAP des services fiscaux brésiliens
//!
//! Cette crate construit les requêtes SOAP envoyées aux autorités fiscales
//! (NFe, CTe, MDFe, BPe) et résout leurs réponses en types concrets.
//!
//! ## Fonctionnalités
//!
//! - ✅ Enveloppes liées au schéma (`<service>DadosMsg`) et enveloppes génériques
//! - ✅ Dialectes SOAP 1.1 / SOAP 1.2 et réparation des réponses
//! - ✅ Substitution de XML déjà signé (placeholder)
//! - ✅ Résolution du résultat `xsd:any` en deux passes
//! - ✅ Détection des SOAP Faults
//!
//! ## Architecture
//!
//! - [`EnvelopeBuilder`] : rend le payload et l'enveloppe
//! - [`ResponseResolver`] : analyse la réponse et résout le type attendu
//! - [`ServiceConfig`] : description d'une opération, recréée à chaque appel
//! - [`AnyElement`] : élément XML non typé
//!
//! ## Example
//!
//! ```ignore
//! use fiscalsoap::{EnvelopeBuilder, Payload, ResponseResolver, SoapDialect};
//!
//! let builder = EnvelopeBuilder::new("nfe", SoapDialect::Soap11, false);
//! let request = builder.prepare(Payload::from(cons_stat_serv), &config, None)?;
//!
//! let resolver = ResponseResolver::new("nfe", SoapDialect::Soap11);
//! let ret: RetConsStatServ = resolver.resolve(&body, &config.envelope, false)?;
//! ```

mod any_element;
mod builder;
mod dialect;
mod envelope;
mod error;
mod fault;
mod message;
mod parser;
mod placeholder;

pub use any_element::AnyElement;
pub use builder::{EnvelopeBuilder, action_name};
pub use dialect::{ENVELOPE_PREFIX, SOAP11_ENV_NS, SOAP12_ENV_NS, SoapDialect, normalize_response};
pub use envelope::{EnvelopeMode, ServiceConfig, SoapBody, SoapEnvelope, SoapHeader};
pub use error::SoapError;
pub use fault::{SoapFault, build_soap_fault};
pub use message::{FiscalMessage, Payload, parse_message, render_message};
pub use parser::{ResponseResolver, parse_soap_envelope};
pub use placeholder::PlaceholderDirective;

/// Racine des namespaces du portail fiscal
pub const PORTAL_FISCAL: &str = "http://www.portalfiscal.inf.br";

/// Default namespace of the fiscal messages of a service family
pub fn fiscal_namespace(service: &str) -> String {
    format!("{PORTAL_FISCAL}/{service}")
}

/// Namespace of the `<service>DadosMsg` element of an operation
pub fn wsdl_namespace(service: &str, action_name: &str) -> String {
    format!("{PORTAL_FISCAL}/{service}/wsdl/{action_name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespaces() {
        assert_eq!(fiscal_namespace("cte"), "http://www.portalfiscal.inf.br/cte");
        assert_eq!(
            wsdl_namespace("mdfe", "MDFeStatusServico"),
            "http://www.portalfiscal.inf.br/mdfe/wsdl/MDFeStatusServico"
        );
    }
}
