//! Transport HTTPS avec certificat client, monté par hôte

use crate::error::{FiscalError, Result};
use crate::identity::ClientIdentity;
use crate::retry::{HttpReply, RetryPolicy};
use parking_lot::Mutex;
use reqwest::blocking::Client;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Default timeout of one HTTP attempt
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// HTTP transport with one mounted adapter per destination origin
///
/// An adapter is a blocking client carrying the TLS identity and the
/// timeout, used under the retry policy. The adapter table is the only state
/// shared between calls; entries are never replaced once mounted.
#[derive(Debug)]
pub struct CertificateTransport {
    identity: ClientIdentity,
    verify_ssl: bool,
    timeout: Duration,
    retry: RetryPolicy,
    adapters: Mutex<HashMap<String, Client>>,
}

impl CertificateTransport {
    /// Creates the transport, checking the PKCS#12 bundle up front
    pub fn new(
        identity: ClientIdentity,
        verify_ssl: bool,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self> {
        retry.validate()?;
        if !identity.is_fake() {
            load_identity(&identity)?;
        }
        Ok(Self {
            identity,
            verify_ssl,
            timeout,
            retry,
            adapters: Mutex::new(HashMap::new()),
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Mounts the adapter for the origin of `url`, once
    ///
    /// Returns the origin (`scheme://host[:port]`) the adapter is keyed by.
    pub fn ensure_mounted(&self, url: &str) -> Result<String> {
        let origin = origin_of(url)?;
        self.adapter(&origin)?;
        Ok(origin)
    }

    /// Origins with a mounted adapter, sorted
    pub fn mounted_hosts(&self) -> Vec<String> {
        let mut hosts: Vec<String> = self.adapters.lock().keys().cloned().collect();
        hosts.sort();
        hosts
    }

    /// POSTs `body` to `url` under the retry policy
    ///
    /// Any non-2xx final status is reported as [`FiscalError::HttpStatus`].
    pub fn post(&self, url: &str, headers: &[(String, String)], body: &str) -> Result<HttpReply> {
        let origin = origin_of(url)?;
        let client = self.adapter(&origin)?;

        self.retry.run(url, |attempt| {
            debug!(url, attempt, "POST");
            let mut request = client.post(url).body(body.to_string());
            for (name, value) in headers {
                request = request.header(name.as_str(), value.as_str());
            }
            let response = request.send()?;
            let status = response.status().as_u16();
            let body = response.bytes()?.to_vec();
            debug!(url, status, bytes = body.len(), "Response received");
            Ok(HttpReply { status, body })
        })
    }

    fn adapter(&self, origin: &str) -> Result<Client> {
        let mut adapters = self.adapters.lock();
        if let Some(client) = adapters.get(origin) {
            return Ok(client.clone());
        }

        let mut builder = Client::builder()
            .timeout(self.timeout)
            .danger_accept_invalid_certs(!self.verify_ssl);
        if !self.identity.is_fake() {
            builder = builder.identity(load_identity(&self.identity)?);
        }
        let client = builder.build()?;

        info!(
            origin,
            client_certificate = !self.identity.is_fake(),
            verify_ssl = self.verify_ssl,
            "Mounted HTTP adapter"
        );
        adapters.insert(origin.to_string(), client.clone());
        Ok(client)
    }
}

fn load_identity(identity: &ClientIdentity) -> Result<reqwest::Identity> {
    reqwest::Identity::from_pkcs12_der(identity.certificate(), identity.password()).map_err(|e| {
        FiscalError::configuration(format!("cannot load PKCS#12 certificate: {e}"))
    })
}

/// `scheme://host[:port]` of a URL
pub fn origin_of(url: &str) -> Result<String> {
    let parsed =
        Url::parse(url).map_err(|e| FiscalError::Transport(format!("invalid URL `{url}`: {e}")))?;
    if parsed.host_str().is_none() {
        return Err(FiscalError::Transport(format!("URL `{url}` has no host")));
    }
    Ok(parsed.origin().ascii_serialization())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_transport() -> CertificateTransport {
        CertificateTransport::new(
            ClientIdentity::fake(),
            false,
            DEFAULT_TIMEOUT,
            RetryPolicy::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_origin_of() {
        assert_eq!(
            origin_of("https://nfe.sefaz.rs.gov.br/ws/NfeStatusServico/NfeStatusServico4.asmx")
                .unwrap(),
            "https://nfe.sefaz.rs.gov.br"
        );
        assert_eq!(
            origin_of("http://127.0.0.1:8080/ws").unwrap(),
            "http://127.0.0.1:8080"
        );
        assert!(origin_of("not a url").unwrap_err().is_transport_error());
    }

    #[test]
    fn test_mounting_is_idempotent() {
        let transport = fake_transport();
        transport.ensure_mounted("https://a.example/ws/one").unwrap();
        transport.ensure_mounted("https://a.example/ws/two").unwrap();
        transport.ensure_mounted("https://b.example/ws").unwrap();

        assert_eq!(
            transport.mounted_hosts(),
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
    }

    #[test]
    fn test_invalid_certificate_fails_construction() {
        let identity = ClientIdentity::new(b"not a pkcs12 bundle".to_vec(), "pw").unwrap();
        let err = CertificateTransport::new(identity, false, DEFAULT_TIMEOUT, RetryPolicy::default())
            .unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_unbounded_backoff_fails_construction() {
        let retry = RetryPolicy {
            backoff_factor: f64::INFINITY,
            ..RetryPolicy::default()
        };
        let err = CertificateTransport::new(ClientIdentity::fake(), false, DEFAULT_TIMEOUT, retry)
            .unwrap_err();
        assert!(err.is_configuration_error());
    }
}
