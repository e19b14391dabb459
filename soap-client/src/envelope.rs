//! SOAP request envelope construction

use quick_xml::escape::escape;

/// Namespace URI of the SOAP 1.1 envelope
pub const ENVELOPE_NAMESPACE: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// Encoding style declared on every request envelope
pub const ENCODING_STYLE: &str = "http://schemas.xmlsoap.org/soap/encoding/";

/// A single named action argument. `None` serializes as an empty element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionArgument {
    pub name: String,
    pub value: Option<String>,
}

/// A remote action invocation with its arguments in wire order
///
/// # Example
///
/// ```
/// use soap_client::ActionRequest;
///
/// let request = ActionRequest::new("DeletePortMapping")
///     .arg("NewRemoteHost", "")
///     .arg("NewExternalPort", 3000)
///     .arg("NewProtocol", "TCP");
///
/// assert_eq!(request.arguments().len(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    action: String,
    arguments: Vec<ActionArgument>,
}

impl ActionRequest {
    /// Create a request for `action` with no arguments
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            arguments: Vec::new(),
        }
    }

    /// Append an argument with a value
    pub fn arg(self, name: impl Into<String>, value: impl ToString) -> Self {
        self.arg_opt(name, Some(value))
    }

    /// Append an argument whose value may be absent
    pub fn arg_opt<V: ToString>(mut self, name: impl Into<String>, value: Option<V>) -> Self {
        self.arguments.push(ActionArgument {
            name: name.into(),
            value: value.map(|v| v.to_string()),
        });
        self
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn arguments(&self) -> &[ActionArgument] {
        &self.arguments
    }

    /// Value of the `SOAPAction` HTTP header, quotes included
    pub fn soap_action(&self, service_type: &str) -> String {
        format!("\"{}#{}\"", service_type, self.action)
    }

    /// Serialize the argument list in order, without the surrounding envelope
    pub fn payload(&self) -> String {
        let mut payload = String::new();
        for argument in &self.arguments {
            let value = argument.value.as_deref().unwrap_or("");
            payload.push('<');
            payload.push_str(&argument.name);
            payload.push('>');
            payload.push_str(&escape(value));
            payload.push_str("</");
            payload.push_str(&argument.name);
            payload.push('>');
        }
        payload
    }

    /// Build the complete request envelope for `service_type`
    pub fn envelope(&self, service_type: &str) -> String {
        format!(
            concat!(
                r#"<?xml version="1.0"?>"#,
                r#"<s:Envelope xmlns:s="{envelope_ns}" s:encodingStyle="{encoding}">"#,
                "<s:Body>",
                r#"<u:{action} xmlns:u="{service}">"#,
                "{payload}",
                "</u:{action}>",
                "</s:Body>",
                "</s:Envelope>",
            ),
            envelope_ns = ENVELOPE_NAMESPACE,
            encoding = ENCODING_STYLE,
            action = self.action,
            service = escape(service_type),
            payload = self.payload(),
        )
    }
}
