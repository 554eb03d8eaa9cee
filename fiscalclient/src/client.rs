//! Client principal pour les web services fiscaux

use crate::codes::{Environment, ServiceName, StateCode};
use crate::context::{DEFAULT_SCHEMA_VERSION, EnvironmentContext};
use crate::error::{FiscalError, Result};
use crate::identity::ClientIdentity;
use crate::retry::RetryPolicy;
use crate::service::{Action, WsdlOperation};
use crate::transport::{CertificateTransport, DEFAULT_TIMEOUT};
use fiscalsoap::{
    EnvelopeBuilder, EnvelopeMode, FiscalMessage, Payload, PlaceholderDirective,
    ResponseResolver, ServiceConfig, SoapDialect, action_name, wsdl_namespace,
};
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info};

/// Per-call options of [`FiscalClient::send`]
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    /// Explicit endpoint, overrides every other location rule
    pub location: Option<String>,
    /// Pre-signed XML spliced into the rendered request
    pub placeholder: Option<PlaceholderDirective>,
    /// Extra headers, they override the dialect defaults
    pub headers: Vec<(String, String)>,
    /// Fail on a SOAP 1.2 response instead of repairing it
    pub raise_on_soap_mismatch: bool,
    /// Overrides the SOAPAction of the operation
    pub soap_action: Option<String>,
}

impl SendOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn placeholder(mut self, directive: PlaceholderDirective) -> Self {
        self.placeholder = Some(directive);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn raise_on_soap_mismatch(mut self, raise: bool) -> Self {
        self.raise_on_soap_mismatch = raise;
        self
    }

    pub fn soap_action(mut self, soap_action: impl Into<String>) -> Self {
        self.soap_action = Some(soap_action.into());
        self
    }
}

/// Client SOAP des autorités fiscales (NFe, CTe, MDFe, BPe)
///
/// Owns its transport, envelope builder and response resolver. Operation
/// descriptions are rebuilt for every call; the per-host adapter table of the
/// transport is the only state shared between calls, so a client can be
/// shared across threads.
///
/// # Exemple
///
/// ```rust,ignore
/// use fiscalclient::{ConsStatServ, FiscalClient, NfeStatusServico4, SendOptions};
///
/// let client = FiscalClient::builder("2", "42")
///     .certificate(pfx_bytes, "1234")
///     .build()?;
/// let ret = client.call::<NfeStatusServico4>(
///     ConsStatServ::new("4.00", "2", "42"),
///     &SendOptions::new(),
/// )?;
/// println!("{}: {}", ret.c_stat, ret.x_motivo);
/// ```
#[derive(Debug)]
pub struct FiscalClient {
    context: EnvironmentContext,
    base_url: Option<String>,
    dialect: SoapDialect,
    transport: CertificateTransport,
    builder: EnvelopeBuilder,
    resolver: ResponseResolver,
}

impl FiscalClient {
    /// Starts a builder from raw environment and IBGE state codes
    pub fn builder(environment: impl AsRef<str>, state: impl AsRef<str>) -> FiscalClientBuilder {
        FiscalClientBuilder::new(environment, state)
    }

    pub fn context(&self) -> &EnvironmentContext {
        &self.context
    }

    pub fn environment(&self) -> Environment {
        self.context.environment
    }

    pub fn state(&self) -> StateCode {
        self.context.state
    }

    pub fn service(&self) -> ServiceName {
        self.context.service
    }

    pub fn schema_version(&self) -> &str {
        &self.context.schema_version
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    pub fn dialect(&self) -> SoapDialect {
        self.dialect
    }

    pub fn transport(&self) -> &CertificateTransport {
        &self.transport
    }

    /// Sends one request and resolves its result as `R`
    ///
    /// # Arguments
    ///
    /// * `action` - Schema-bound operation or bare URL/path
    /// * `payload` - Typed message or mapping decoded as `T`
    /// * `options` - Location, placeholder, headers and dialect policy
    pub fn send<T, R>(
        &self,
        action: &Action,
        payload: impl Into<Payload<T>>,
        options: &SendOptions,
    ) -> Result<R>
    where
        T: FiscalMessage,
        R: FiscalMessage,
    {
        let config = self.service_config::<T, R>(action, options)?;
        if config.output_type != R::type_name() {
            return Err(FiscalError::InvalidInput(format!(
                "Invalid output service type, expected `{}` got `{}`",
                config.output_type,
                R::type_name()
            )));
        }

        self.transport.ensure_mounted(&config.location)?;

        let body = self
            .builder
            .prepare(payload.into(), &config, options.placeholder.as_ref())?;
        let headers = self.headers(&config.soap_action, &options.headers);
        debug!(location = %config.location, headers = ?headers, "Sending SOAP request");

        let reply = self
            .transport
            .post(&config.location, &headers, &body)
            .inspect_err(|e| error!("❌ SOAP request to {} failed: {}", config.location, e))?;

        let result = self
            .resolver
            .resolve::<R>(&reply.body, &config.envelope, options.raise_on_soap_mismatch)?;
        info!(location = %config.location, result = R::TAG, "✅ SOAP call completed");
        Ok(result)
    }

    /// Typed shortcut for a schema-bound operation
    pub fn call<O: WsdlOperation>(
        &self,
        payload: impl Into<Payload<O::Input>>,
        options: &SendOptions,
    ) -> Result<O::Output> {
        self.send::<O::Input, O::Output>(&Action::operation::<O>(), payload, options)
    }

    /// Builds the operation description of one call
    pub fn service_config<T: FiscalMessage, R: FiscalMessage>(
        &self,
        action: &Action,
        options: &SendOptions,
    ) -> Result<ServiceConfig> {
        let service = self.context.service.as_str();
        let location = self.resolve_location(action, options)?;

        let config = match action {
            Action::SchemaBound(op) => ServiceConfig {
                style: op.style.to_string(),
                soap_action: options
                    .soap_action
                    .clone()
                    .unwrap_or_else(|| op.soap_action.to_string()),
                input_type: op.input_type,
                output_type: op.output_type,
                service: service.to_string(),
                envelope: EnvelopeMode::SchemaBound {
                    namespace: op.namespace.to_string(),
                },
                location,
            },
            Action::Generic(_) => ServiceConfig {
                style: "document".to_string(),
                soap_action: options
                    .soap_action
                    .clone()
                    .unwrap_or_else(|| wsdl_namespace(service, &action_name(&location))),
                input_type: T::type_name(),
                output_type: R::type_name(),
                service: service.to_string(),
                envelope: EnvelopeMode::Generic,
                location,
            },
        };
        Ok(config)
    }

    /// Endpoint of a call
    ///
    /// The explicit option wins. A generic action is an absolute URL or a
    /// path under the base URL. A schema-bound action keeps the last two
    /// segments of its WSDL location under `<base>/ws/` when a base URL is
    /// configured, and its WSDL location otherwise.
    fn resolve_location(&self, action: &Action, options: &SendOptions) -> Result<String> {
        if let Some(location) = &options.location {
            return Ok(location.clone());
        }

        match action {
            Action::Generic(target) if is_absolute(target) => Ok(target.clone()),
            Action::Generic(path) => {
                let base = self.base_url.as_deref().ok_or_else(|| {
                    FiscalError::configuration(format!(
                        "relative action `{path}` needs a service base URL"
                    ))
                })?;
                Ok(join_url(base, path))
            }
            Action::SchemaBound(op) => match &self.base_url {
                Some(base) => {
                    let segments: Vec<&str> = op
                        .location
                        .trim_end_matches('/')
                        .rsplit('/')
                        .take(2)
                        .collect();
                    let tail: Vec<&str> = segments.into_iter().rev().collect();
                    Ok(join_url(base, &format!("ws/{}", tail.join("/"))))
                }
                None => Ok(op.location.to_string()),
            },
        }
    }

    /// Dialect headers, then caller headers replacing same-named ones
    fn headers(&self, soap_action: &str, extra: &[(String, String)]) -> Vec<(String, String)> {
        let mut headers = self.dialect.headers(soap_action);
        for (name, value) in extra {
            headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
            headers.push((name.clone(), value.clone()));
        }
        headers
    }
}

impl fmt::Display for FiscalClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FiscalClient(environment={}, state={}, service={}, version={})",
            self.context.environment,
            self.context.state,
            self.context.service,
            self.context.schema_version
        )
    }
}

fn is_absolute(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://")
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Builder of [`FiscalClient`], validating everything in [`build`](Self::build)
#[derive(Debug, Clone)]
pub struct FiscalClientBuilder {
    environment: String,
    state: String,
    service: String,
    schema_version: String,
    certificate: Option<(Vec<u8>, String)>,
    fake_certificate: bool,
    verify_ssl: bool,
    timeout: Duration,
    soap12: bool,
    pretty_print: bool,
    base_url: Option<String>,
    retry: RetryPolicy,
}

impl FiscalClientBuilder {
    pub fn new(environment: impl AsRef<str>, state: impl AsRef<str>) -> Self {
        Self {
            environment: environment.as_ref().to_string(),
            state: state.as_ref().to_string(),
            service: ServiceName::default().to_string(),
            schema_version: DEFAULT_SCHEMA_VERSION.to_string(),
            certificate: None,
            fake_certificate: false,
            verify_ssl: false,
            timeout: DEFAULT_TIMEOUT,
            soap12: false,
            pretty_print: false,
            base_url: None,
            retry: RetryPolicy::default(),
        }
    }

    pub fn service(mut self, service: impl AsRef<str>) -> Self {
        self.service = service.as_ref().to_string();
        self
    }

    pub fn schema_version(mut self, version: impl AsRef<str>) -> Self {
        self.schema_version = version.as_ref().to_string();
        self
    }

    /// PKCS#12 bundle and its password
    pub fn certificate(mut self, pkcs12: Vec<u8>, password: impl Into<String>) -> Self {
        self.certificate = Some((pkcs12, password.into()));
        self
    }

    /// Skips client-certificate TLS (tests only)
    pub fn fake_certificate(mut self, fake: bool) -> Self {
        self.fake_certificate = fake;
        self
    }

    pub fn verify_ssl(mut self, verify: bool) -> Self {
        self.verify_ssl = verify;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn soap12(mut self, soap12: bool) -> Self {
        self.soap12 = soap12;
        self
    }

    pub fn pretty_print(mut self, pretty: bool) -> Self {
        self.pretty_print = pretty;
        self
    }

    /// Base URL of the authority (`https://host`), empty to clear
    pub fn base_url(mut self, base_url: impl AsRef<str>) -> Self {
        let url = base_url.as_ref().trim();
        self.base_url = (!url.is_empty()).then(|| url.trim_end_matches('/').to_string());
        self
    }

    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn build(self) -> Result<FiscalClient> {
        let context = EnvironmentContext::parse(
            &self.environment,
            &self.state,
            &self.service,
            &self.schema_version,
        )?;

        let identity = match (self.fake_certificate, self.certificate) {
            (true, _) => ClientIdentity::fake(),
            (false, Some((pkcs12, password))) => ClientIdentity::new(pkcs12, password)?,
            (false, None) => {
                return Err(FiscalError::configuration(
                    "a PKCS#12 certificate is required unless fake_certificate is set",
                ));
            }
        };

        if let Some(base) = &self.base_url {
            if !is_absolute(base) {
                return Err(FiscalError::configuration(format!(
                    "base URL `{base}` must start with http:// or https://"
                )));
            }
        }

        let dialect = if self.soap12 {
            SoapDialect::Soap12
        } else {
            SoapDialect::Soap11
        };
        let service = context.service.as_str();
        let transport =
            CertificateTransport::new(identity, self.verify_ssl, self.timeout, self.retry)?;

        let client = FiscalClient {
            builder: EnvelopeBuilder::new(service, dialect, self.pretty_print),
            resolver: ResponseResolver::new(service, dialect),
            context,
            base_url: self.base_url,
            dialect,
            transport,
        };
        info!("Created {}", client);
        Ok(client)
    }
}
