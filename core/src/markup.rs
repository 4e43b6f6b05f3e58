#![deny(missing_docs)]

//! # Markup Normalization
//!
//! Reads one XML document into a generic element tree so the rest of the
//! resolver never touches the XML reader directly. Bundle documents encode
//! "one or many" as either a single child element or a run of repeated
//! children; [`XmlElement::children`] folds both shapes into one iterator.

use std::borrow::Cow;

use indexmap::IndexMap;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{AppError, AppResult};

/// One element of a parsed document: tag name, attributes in document order,
/// child elements in document order and accumulated character data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    name: String,
    attributes: IndexMap<String, String>,
    children: Vec<XmlElement>,
    text: String,
}

impl XmlElement {
    fn from_start(start: &BytesStart) -> AppResult<Self> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes = IndexMap::new();
        for attribute in start.attributes() {
            let attribute = attribute.map_err(quick_xml::Error::from)?;
            let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
            let value = attribute.unescape_value()?.into_owned();
            attributes.insert(key, value);
        }
        Ok(Self {
            name,
            attributes,
            children: Vec::new(),
            text: String::new(),
        })
    }

    /// Tag name of this element.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attribute value by name, e.g. `name` or `revision`.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// First child element with the given tag name.
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|child| child.name == name)
    }

    /// Every child element with the given tag name, in document order.
    ///
    /// A single child and a repeated run both come back as a sequence, so
    /// callers never branch on cardinality.
    pub fn children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// Character data of this element, trimmed; `None` when absent or blank.
    pub fn text(&self) -> Option<&str> {
        let trimmed = self.text.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }

    /// Trimmed character data of the first child with the given tag name.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).and_then(XmlElement::text)
    }

    fn push_text(&mut self, text: &str) {
        self.text.push_str(text);
    }
}

/// Parses one XML document into its root element.
///
/// Exported bundles occasionally carry non-breaking spaces; those are folded
/// to plain spaces before reading so conditions and patterns tokenize the
/// same way either way.
pub fn parse_document(xml: &str) -> AppResult<XmlElement> {
    let cleaned: Cow<str> = if xml.contains('\u{a0}') {
        Cow::Owned(xml.replace('\u{a0}', " "))
    } else {
        Cow::Borrowed(xml)
    };
    let mut reader = Reader::from_str(&cleaned);
    reader.trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;
    loop {
        match reader.read_event()? {
            Event::Start(start) => stack.push(XmlElement::from_start(&start)?),
            Event::Empty(start) => {
                let element = XmlElement::from_start(&start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                // Name mismatches already error inside the reader.
                let element = stack
                    .pop()
                    .ok_or_else(|| AppError::Malformed("closing tag without opener".to_string()))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                if let Some(parent) = stack.last_mut() {
                    parent.push_text(&text.unescape()?);
                }
            }
            Event::CData(cdata) => {
                if let Some(parent) = stack.last_mut() {
                    parent.push_text(&String::from_utf8_lossy(&cdata.into_inner()));
                }
            }
            Event::Eof => break,
            // Declarations, comments, doctypes and processing instructions
            // carry nothing the resolver reads.
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(AppError::Malformed(format!(
            "unclosed element '{}'",
            stack[stack.len() - 1].name
        )));
    }
    root.ok_or_else(|| AppError::Malformed("document has no root element".to_string()))
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> AppResult<()> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(element);
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        None => Err(AppError::Malformed(format!(
            "second root element '{}'",
            element.name
        ))),
    }
}
