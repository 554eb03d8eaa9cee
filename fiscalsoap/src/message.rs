//! Typed fiscal messages and loosely typed payloads

use crate::any_element::AnyElement;
use crate::error::SoapError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::type_name;

/// A message bound to a fiscal XSD element
///
/// Implemented by the generated bindings. `TAG` is the local name of the root
/// element (e.g. `consStatServ`); the fiscal namespace is added when the
/// message is rendered.
pub trait FiscalMessage: Serialize + DeserializeOwned {
    const TAG: &'static str;

    /// Name used in diagnostics and for input type checks
    fn type_name() -> &'static str {
        type_name::<Self>()
    }
}

/// Request payload handed to the client
#[derive(Debug, Clone)]
pub enum Payload<T> {
    /// Concrete binding value
    Typed(T),
    /// Generic mapping decoded against the operation input type
    ///
    /// Either the bare message or the wrapped
    /// `{"Body": {"nfeDadosMsg": {"content": [message]}}}` shape.
    Mapping(Value),
}

impl<T> From<T> for Payload<T> {
    fn from(value: T) -> Self {
        Payload::Typed(value)
    }
}

impl<T: FiscalMessage> Payload<T> {
    /// Resolves the payload into the concrete message
    pub fn into_message(self) -> Result<T, SoapError> {
        match self {
            Payload::Typed(value) => Ok(value),
            Payload::Mapping(mapping) => {
                let message = unwrap_envelope_mapping(mapping);
                serde_json::from_value(message).map_err(|e| {
                    SoapError::InvalidInput(format!(
                        "cannot decode mapping as `{}`: {e}",
                        T::type_name()
                    ))
                })
            }
        }
    }
}

/// Strips the `Body / *DadosMsg / content[0]` wrapping when present
fn unwrap_envelope_mapping(mapping: Value) -> Value {
    let Value::Object(mut root) = mapping else {
        return mapping;
    };
    let Some(Value::Object(mut body)) = root.remove("Body") else {
        return Value::Object(root);
    };
    let Some(key) = body.keys().find(|k| k.ends_with("DadosMsg")).cloned() else {
        return Value::Object(body);
    };
    match body.remove(&key) {
        Some(Value::Object(mut dados)) => match dados.remove("content") {
            Some(Value::Array(mut content)) if !content.is_empty() => content.swap_remove(0),
            Some(other) => other,
            None => Value::Object(dados),
        },
        Some(other) => other,
        None => Value::Null,
    }
}

/// Renders a message as an untyped element named after its root tag
pub fn render_message<T: FiscalMessage>(message: &T) -> Result<AnyElement, SoapError> {
    let xml = quick_xml::se::to_string_with_root(T::TAG, message)
        .map_err(SoapError::serialization)?;
    AnyElement::parse(&xml)
}

/// Parses a standalone fragment into a typed message
pub fn parse_message<T: FiscalMessage>(xml: &str) -> Result<T, SoapError> {
    quick_xml::de::from_str(xml).map_err(|e| {
        SoapError::Parse(format!("cannot parse `{}` from result: {e}", T::type_name()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Ping {
        #[serde(rename = "@versao", alias = "versao")]
        versao: String,
        #[serde(rename = "tpAmb")]
        tp_amb: String,
    }

    impl FiscalMessage for Ping {
        const TAG: &'static str = "ping";
    }

    #[test]
    fn test_bare_mapping_is_decoded() {
        let payload: Payload<Ping> = Payload::Mapping(json!({"versao": "4.00", "tpAmb": "2"}));
        let ping = payload.into_message().unwrap();
        assert_eq!(ping.tp_amb, "2");
    }

    #[test]
    fn test_wrapped_mapping_is_unwrapped() {
        let payload: Payload<Ping> = Payload::Mapping(json!({
            "Body": {"nfeDadosMsg": {"content": [{"versao": "4.00", "tpAmb": "1"}]}}
        }));
        let ping = payload.into_message().unwrap();
        assert_eq!(ping.versao, "4.00");
        assert_eq!(ping.tp_amb, "1");
    }

    #[test]
    fn test_mapping_of_wrong_shape_is_invalid_input() {
        let payload: Payload<Ping> = Payload::Mapping(json!({"cStat": "107"}));
        let err = payload.into_message().unwrap_err();
        assert!(matches!(err, SoapError::InvalidInput(_)));
    }

    #[test]
    fn test_render_then_parse() {
        let ping = Ping {
            versao: "4.00".to_string(),
            tp_amb: "2".to_string(),
        };
        let any = render_message(&ping).unwrap();
        assert_eq!(any.local_name(), Some("ping"));
        assert_eq!(any.attribute("versao"), Some("4.00"));

        let xml = any.render("ping", None).unwrap();
        let back: Ping = parse_message(&xml).unwrap();
        assert_eq!(back, ping);
    }
}
