//! SOAP response decoding: envelope prefix discovery, fault extraction and
//! action result lookup.

use std::borrow::Cow;

use xmltree::{Element, XMLNode};

use crate::envelope::ENVELOPE_NAMESPACE;
use crate::SoapError;

/// Find the prefix bound to `uri` among a set of `(prefix, uri)` namespace
/// declarations.
///
/// Devices are free to pick any prefix for the envelope namespace (`s:`,
/// `soap:`, `SOAP-ENV:`...). The default namespace and the reserved `xml` /
/// `xmlns` prefixes are never returned.
pub fn namespace_prefix<'a, I>(declarations: I, uri: &str) -> Option<&'a str>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    declarations
        .into_iter()
        .find(|(prefix, bound)| {
            !prefix.is_empty() && *prefix != "xml" && *prefix != "xmlns" && *bound == uri
        })
        .map(|(prefix, _)| prefix)
}

/// Envelope prefix declared on the root element, if any
pub(crate) fn envelope_prefix(root: &Element) -> Option<String> {
    let namespaces = root.namespaces.as_ref()?;
    namespace_prefix(namespaces, ENVELOPE_NAMESPACE).map(str::to_string)
}

/// First child element with the given prefix and local name
pub(crate) fn qualified_child<'a>(
    element: &'a Element,
    prefix: Option<&str>,
    name: &str,
) -> Option<&'a Element> {
    child_elements(element).find(|child| child.name == name && child.prefix.as_deref() == prefix)
}

fn child_elements(element: &Element) -> impl Iterator<Item = &Element> {
    element.children.iter().filter_map(XMLNode::as_element)
}

/// Text content of `name` under `element`; an empty element reads as `""`
fn child_text<'a>(element: &'a Element, name: &str) -> Option<Cow<'a, str>> {
    element
        .get_child(name)
        .map(|child| child.get_text().unwrap_or(Cow::Borrowed("")))
}

/// Extract the UPnP error carried by a fault response.
///
/// The `faultstring` names the entry inside `detail` (normally `UPnPError`)
/// that carries `errorCode` and `errorDescription`.
pub(crate) fn extract_fault(root: &Element) -> Result<SoapError, SoapError> {
    let prefix = envelope_prefix(root);
    let prefix = prefix.as_deref();

    let body = qualified_child(root, prefix, "Body")
        .ok_or_else(|| SoapError::InvalidResponse("Missing SOAP Body in fault response".to_string()))?;
    let fault = qualified_child(body, prefix, "Fault")
        .ok_or_else(|| SoapError::InvalidResponse("Missing SOAP Fault element".to_string()))?;

    let fault_string = child_text(fault, "faultstring")
        .ok_or_else(|| SoapError::InvalidResponse("Missing faultstring".to_string()))?;
    let detail = fault
        .get_child("detail")
        .ok_or_else(|| SoapError::InvalidResponse("Missing fault detail".to_string()))?;
    let entry = detail.get_child(fault_string.trim()).ok_or_else(|| {
        SoapError::InvalidResponse(format!("Fault detail has no {} entry", fault_string.trim()))
    })?;

    let code = child_text(entry, "errorCode")
        .ok_or_else(|| SoapError::InvalidResponse("Missing errorCode".to_string()))?;
    let description = child_text(entry, "errorDescription")
        .ok_or_else(|| SoapError::InvalidResponse("Missing errorDescription".to_string()))?;

    Ok(SoapError::Fault {
        code: code.into_owned(),
        description: description.into_owned(),
    })
}

/// The decoded `Body` of a successful action call
#[derive(Debug, Clone)]
pub struct ActionResponse {
    prefix: Option<String>,
    body: Element,
}

impl ActionResponse {
    pub(crate) fn from_envelope(root: Element) -> Result<Self, SoapError> {
        let prefix = envelope_prefix(&root);
        let body = qualified_child(&root, prefix.as_deref(), "Body")
            .cloned()
            .ok_or_else(|| SoapError::InvalidResponse("Missing SOAP Body".to_string()))?;
        Ok(Self { prefix, body })
    }

    /// Prefix the device bound to the envelope namespace, if any
    pub fn envelope_prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// The full `Body` element
    pub fn body(&self) -> &Element {
        &self.body
    }

    /// The `<prefix:{action}Response>` element, located by name suffix since
    /// the device chooses the prefix
    pub fn action_result(&self, action: &str) -> Option<&Element> {
        let suffix = format!("{}Response", action);
        child_elements(&self.body).find(|child| child.name.ends_with(&suffix))
    }

    /// A single output argument of `action`. `None` means the element is
    /// missing; an empty element yields `Some("")`.
    pub fn value(&self, action: &str, field: &str) -> Option<String> {
        self.action_result(action)
            .and_then(|result| child_text(result, field))
            .map(Cow::into_owned)
    }
}
