//! Identité TLS du client (certificat PKCS#12)

use crate::error::{FiscalError, Result};
use std::fmt;

/// Mutual-TLS credential, immutable once built
#[derive(Clone)]
pub struct ClientIdentity {
    certificate: Vec<u8>,
    password: String,
    fake: bool,
}

impl ClientIdentity {
    /// Builds a real identity; the bundle must not be empty
    pub fn new(certificate: Vec<u8>, password: impl Into<String>) -> Result<Self> {
        if certificate.is_empty() {
            return Err(FiscalError::configuration(
                "a PKCS#12 certificate is required",
            ));
        }
        Ok(Self {
            certificate,
            password: password.into(),
            fake: false,
        })
    }

    /// Identity that disables client-certificate TLS (tests only)
    pub fn fake() -> Self {
        Self {
            certificate: Vec::new(),
            password: String::new(),
            fake: true,
        }
    }

    pub fn certificate(&self) -> &[u8] {
        &self.certificate
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn is_fake(&self) -> bool {
        self.fake
    }
}

impl fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientIdentity")
            .field("certificate", &format_args!("<{} bytes>", self.certificate.len()))
            .field("password", &"<redacted>")
            .field("fake", &self.fake)
            .finish()
    }
}
