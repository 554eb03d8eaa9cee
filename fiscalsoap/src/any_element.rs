//! Untyped XML element used for `xsd:any` slots
//!
//! The fiscal WSDLs declare the result message content as `xsd:any`, so the
//! first parse of a response only yields this loose structure. It is later
//! rendered back to XML and parsed again into the concrete type chosen by the
//! caller.

use crate::error::SoapError;
use std::io::BufReader;
use xmltree::{Element, EmitterConfig, XMLNode};

/// Untyped XML element
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnyElement {
    /// Qualified name in Clark notation (`{namespace}local`), `None` once cleared
    pub qname: Option<String>,

    /// Text content, `None` when the element only holds whitespace
    pub text: Option<String>,

    /// Attributes in name order
    pub attributes: Vec<(String, String)>,

    /// Child elements in document order
    pub children: Vec<AnyElement>,
}

impl AnyElement {
    /// Builds an untyped element from a parsed tree
    pub fn from_element(elem: &Element) -> Self {
        let qname = match &elem.namespace {
            Some(ns) if !ns.is_empty() => format!("{{{ns}}}{}", elem.name),
            _ => elem.name.clone(),
        };

        let text: String = elem
            .children
            .iter()
            .filter_map(|node| match node {
                XMLNode::Text(t) | XMLNode::CData(t) => Some(t.as_str()),
                _ => None,
            })
            .collect();

        let mut attributes: Vec<(String, String)> = elem
            .attributes
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        attributes.sort();

        let children = elem
            .children
            .iter()
            .filter_map(|node| node.as_element())
            .map(AnyElement::from_element)
            .collect();

        AnyElement {
            qname: Some(qname),
            text: (!text.trim().is_empty()).then_some(text),
            attributes,
            children,
        }
    }

    /// Parses a standalone XML fragment
    pub fn parse(xml: &str) -> Result<Self, SoapError> {
        let root = Element::parse(BufReader::new(xml.as_bytes()))?;
        Ok(Self::from_element(&root))
    }

    /// Local part of the qualified name
    pub fn local_name(&self) -> Option<&str> {
        self.qname
            .as_deref()
            .map(|q| q.rsplit_once('}').map_or(q, |(_, local)| local))
    }

    /// Namespace part of the qualified name
    pub fn namespace(&self) -> Option<&str> {
        self.qname
            .as_deref()
            .and_then(|q| q.strip_prefix('{'))
            .and_then(|q| q.split_once('}'))
            .map(|(ns, _)| ns)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Sets (or replaces) an attribute
    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    /// Forgets the wire name and the whitespace text of the element
    ///
    /// A cleared element is rendered under the name the caller asks for.
    pub fn clear_markers(&mut self) {
        self.qname = None;
        self.text = None;
    }

    /// Converts back to an xmltree element without namespace bookkeeping
    ///
    /// Names are written unprefixed so that children inherit the default
    /// namespace declared on the root.
    pub fn to_element(&self, fallback_name: &str) -> Element {
        let mut elem = Element::new(self.local_name().unwrap_or(fallback_name));
        for (k, v) in &self.attributes {
            elem.attributes.insert(k.clone(), v.clone());
        }
        if let Some(text) = &self.text {
            elem.children.push(XMLNode::Text(text.clone()));
        }
        for child in &self.children {
            elem.children
                .push(XMLNode::Element(child.to_element(fallback_name)));
        }
        elem
    }

    /// Renders the element as a standalone fragment
    ///
    /// # Arguments
    ///
    /// * `root_name` - Name used when the qualified name was cleared
    /// * `namespace` - Default namespace declared on the root, if any
    pub fn render(&self, root_name: &str, namespace: Option<&str>) -> Result<String, SoapError> {
        let mut root = self.to_element(root_name);
        if let Some(ns) = namespace {
            root.attributes.insert("xmlns".to_string(), ns.to_string());
        }
        write_element(&root, false, false)
    }
}

/// Serializes an xmltree element to a string
pub(crate) fn write_element(
    elem: &Element,
    declaration: bool,
    indent: bool,
) -> Result<String, SoapError> {
    let mut buf = Vec::new();
    let config = EmitterConfig::new()
        .write_document_declaration(declaration)
        .perform_indent(indent)
        .indent_string("  ");
    elem.write_with_config(&mut buf, config)
        .map_err(SoapError::serialization)?;
    String::from_utf8(buf).map_err(SoapError::serialization)
}
