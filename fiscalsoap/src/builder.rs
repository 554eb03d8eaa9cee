//! Construction des enveloppes de requête

use crate::any_element::{AnyElement, write_element};
use crate::dialect::{ENVELOPE_PREFIX, SOAP11_ENV_NS, SoapDialect};
use crate::envelope::{EnvelopeMode, ServiceConfig};
use crate::error::SoapError;
use crate::message::{FiscalMessage, Payload, render_message};
use crate::placeholder::PlaceholderDirective;
use crate::{fiscal_namespace, wsdl_namespace};
use tracing::debug;
use xmltree::{Element, XMLNode};

/// Builds the exact bytes POSTed to an authority
#[derive(Debug, Clone)]
pub struct EnvelopeBuilder {
    service: String,
    dialect: SoapDialect,
    pretty_print: bool,
}

impl EnvelopeBuilder {
    pub fn new(service: impl Into<String>, dialect: SoapDialect, pretty_print: bool) -> Self {
        Self {
            service: service.into(),
            dialect,
            pretty_print,
        }
    }

    pub fn dialect(&self) -> SoapDialect {
        self.dialect
    }

    /// Renders a request envelope
    ///
    /// Mapping payloads are decoded against the operation input type; typed
    /// payloads must be of that type when the operation is schema-bound. The
    /// dialect rewrite happens before the placeholder splice so the spliced
    /// content is never touched by it.
    pub fn prepare<T: FiscalMessage>(
        &self,
        payload: Payload<T>,
        config: &ServiceConfig,
        placeholder: Option<&PlaceholderDirective>,
    ) -> Result<String, SoapError> {
        let message = payload.into_message()?;
        if !config.is_generic() && T::type_name() != config.input_type {
            return Err(SoapError::InvalidInput(format!(
                "Invalid input service type, expected `{}` got `{}`",
                config.input_type,
                T::type_name()
            )));
        }

        let mut root = render_message(&message)?;
        root.set_attribute("xmlns", fiscal_namespace(&self.service));

        let envelope = match &config.envelope {
            EnvelopeMode::SchemaBound { namespace } => self.schema_bound(root, namespace)?,
            EnvelopeMode::Generic => self.generic(root, &config.location)?,
        };

        let envelope = self.dialect.rewrite_request(envelope);
        let envelope = match placeholder {
            Some(directive) => directive.apply(envelope),
            None => envelope,
        };

        debug!("📤 SOAP request for {}:\n{}", config.location, envelope);
        Ok(envelope)
    }

    fn schema_bound(&self, root: AnyElement, namespace: &str) -> Result<String, SoapError> {
        let mut dados = Element::new(&format!("{}DadosMsg", self.service));
        dados
            .attributes
            .insert("xmlns".to_string(), namespace.to_string());
        dados
            .children
            .push(XMLNode::Element(root.to_element(&self.service)));

        let mut body = Element::new(&format!("{ENVELOPE_PREFIX}:Body"));
        body.children.push(XMLNode::Element(dados));

        let mut envelope = Element::new(&format!("{ENVELOPE_PREFIX}:Envelope"));
        envelope.attributes.insert(
            format!("xmlns:{ENVELOPE_PREFIX}"),
            SOAP11_ENV_NS.to_string(),
        );
        envelope.children.push(XMLNode::Element(body));

        write_element(&envelope, true, self.pretty_print)
    }

    fn generic(&self, root: AnyElement, location: &str) -> Result<String, SoapError> {
        let fragment = write_element(&root.to_element(&self.service), false, false)?;
        let namespace = wsdl_namespace(&self.service, &action_name(location));

        Ok(format!(
            concat!(
                r#"<?xml version="1.0" encoding="utf-8"?>"#,
                r#"<{p}:Envelope xmlns:{p}="{env}" "#,
                r#"xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" "#,
                r#"xmlns:xsd="http://www.w3.org/2001/XMLSchema">"#,
                r#"<{p}:Body><{svc}DadosMsg xmlns="{ns}">{fragment}</{svc}DadosMsg></{p}:Body>"#,
                r#"</{p}:Envelope>"#,
            ),
            p = ENVELOPE_PREFIX,
            env = SOAP11_ENV_NS,
            svc = self.service,
            ns = namespace,
            fragment = fragment,
        ))
    }
}

/// Last path segment of a URL, without its file extension
///
/// `https://host/ws/NFeStatusServico4/NFeStatusServico4.asmx` gives
/// `NFeStatusServico4`.
pub fn action_name(location: &str) -> String {
    let path = location
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim_end_matches('/');
    let segment = path.rsplit('/').next().unwrap_or(path);
    match segment.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => segment.to_string(),
    }
}
