//! # fiscalclient - Client SOAP des web services fiscaux brésiliens
//!
//! Client pour les services NFe, CTe, MDFe et BPe des autorités fiscales
//! (SEFAZ), authentifié par certificat client PKCS#12.
//!
//! ## Fonctionnalités
//!
//! - ✅ Transport HTTPS avec certificat client monté par hôte
//! - ✅ Retry sur les statuts 500, 502, 503, 504
//! - ✅ Enveloppes SOAP 1.1 / 1.2, liées au schéma ou génériques
//! - ✅ Résolution du résultat `xsd:any` dans le type attendu
//! - ✅ Intégration avec fiscalconfig
//!
//! ## Utilisation
//!
//! ```rust,ignore
//! use fiscalclient::{ConsStatServ, FiscalClient, NfeStatusServico4, SendOptions};
//!
//! let client = FiscalClient::builder("2", "42")
//!     .certificate(std::fs::read("a1.pfx")?, "1234")
//!     .build()?;
//!
//! let status = client.call::<NfeStatusServico4>(
//!     ConsStatServ::new("4.00", "2", "42"),
//!     &SendOptions::new(),
//! )?;
//! assert!(status.is_in_operation());
//! ```

pub mod bindings;
pub mod client;
pub mod codes;
pub mod config_ext;
pub mod context;
pub mod error;
pub mod identity;
pub mod logging;
pub mod retry;
pub mod service;
pub mod time;
pub mod transport;

pub use bindings::{ConsStatServ, NfeStatusServico4, RetConsStatServ};
pub use client::{FiscalClient, FiscalClientBuilder, SendOptions};
pub use codes::{Environment, ServiceName, StateCode};
pub use config_ext::FiscalConfigExt;
pub use context::EnvironmentContext;
pub use error::{FiscalError, Result};
pub use identity::ClientIdentity;
pub use retry::{HttpReply, RetryPolicy};
pub use service::{Action, OperationRef, WsdlOperation};
pub use time::timestamp;
pub use transport::CertificateTransport;

pub use fiscalsoap::{FiscalMessage, Payload, PlaceholderDirective, SoapDialect};
