use std::fmt::Display;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{IzumiError, IzumiResult};

/// One element of the manifest document tree.
///
/// Tag names are kept verbatim, prefix included, so namespaced children such
/// as `cenc:pssh` are looked up by their literal name.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
    text: String,
}

impl Element {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attributes in document order.
    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    /// Child elements with the given tag name, in document order.
    pub fn children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |child| child.name == name)
    }

    pub fn find_child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|child| child.name == name)
    }

    /// Trimmed text content of this element.
    pub fn content(&self) -> &str {
        self.text.trim()
    }
}

/// Parses manifest text and returns the `MPD` root element.
pub fn parse_manifest(text: &str) -> IzumiResult<Element> {
    if text.is_empty() {
        return Err(IzumiError::EmptyManifest);
    }

    match parse_document(text)? {
        Some(root) if root.name() == "MPD" => Ok(root),
        _ => Err(IzumiError::InvalidXml("no MPD root element".to_string())),
    }
}

fn invalid_xml<E: Display>(error: E) -> IzumiError {
    IzumiError::InvalidXml(error.to_string())
}

fn parse_document(text: &str) -> IzumiResult<Option<Element>> {
    let mut reader = Reader::from_str(text);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event().map_err(invalid_xml)? {
            Event::Start(start) => stack.push(element_from_start(&start)?),
            Event::Empty(start) => {
                let element = element_from_start(&start)?;
                place(element, &mut stack, &mut root);
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| IzumiError::InvalidXml("unbalanced end tag".to_string()))?;
                place(element, &mut stack, &mut root);
            }
            Event::Text(chunk) => {
                if let Some(parent) = stack.last_mut() {
                    parent.text.push_str(&chunk.unescape().map_err(invalid_xml)?);
                }
            }
            Event::CData(chunk) => {
                if let Some(parent) = stack.last_mut() {
                    parent.text.push_str(&String::from_utf8_lossy(&chunk));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(IzumiError::InvalidXml("unclosed element".to_string()));
    }

    Ok(root)
}

fn place(element: Element, stack: &mut Vec<Element>, root: &mut Option<Element>) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}

fn element_from_start(start: &BytesStart<'_>) -> IzumiResult<Element> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();

    let mut attributes = Vec::new();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(invalid_xml)?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute.unescape_value().map_err(invalid_xml)?.into_owned();
        attributes.push((key, value));
    }

    Ok(Element {
        name,
        attributes,
        children: Vec::new(),
        text: String::new(),
    })
}
