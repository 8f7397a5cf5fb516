//! Mutable element tree over BPMN XML.
//!
//! Everything that is not an element (declaration, comments, whitespace,
//! CDATA, processing instructions) is kept as the raw source slice, so a
//! document serializes back to what was read. Two normalisations apply:
//! attribute values are re-quoted with `"` and childless elements are written
//! self-closing.

use std::fmt::Display;
use std::io::Write;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{InjectError, InjectResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(Element),
    /// Character data exactly as it appeared in the source, entities still escaped.
    Text(String),
    /// Declarations, comments, processing instructions, doctype and CDATA.
    Markup(String),
}

impl XmlNode {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            XmlNode::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            XmlNode::Element(element) => Some(element),
            _ => None,
        }
    }

    fn is_whitespace(&self) -> bool {
        matches!(self, XmlNode::Text(text) if text.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlNode>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Qualified tag name, prefix included.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn local_name(&self) -> &str {
        split_qualified(&self.name).1
    }

    pub fn prefix(&self) -> Option<&str> {
        split_qualified(&self.name).0
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Overwrites an existing attribute in place, otherwise appends it.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(name, _)| *name == key) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((key, value)),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(key, value);
        self
    }

    /// Element children paired with their position among all child nodes.
    pub fn child_elements(&self) -> impl Iterator<Item = (usize, &Element)> {
        self.children
            .iter()
            .enumerate()
            .filter_map(|(index, node)| node.as_element().map(|element| (index, element)))
    }

    pub fn child_element_mut(&mut self, index: usize) -> Option<&mut Element> {
        self.children.get_mut(index)?.as_element_mut()
    }

    /// Appends `child` after the last child, reusing the indentation of the
    /// existing children when there is any. Returns the child's position.
    pub fn append_element(&mut self, child: Element) -> usize {
        let closing = match self.children.last() {
            Some(node) if node.is_whitespace() => Some(self.children.len() - 1),
            _ => None,
        };

        match (self.child_indent(), closing) {
            (Some(indent), Some(at)) => {
                self.children.insert(at, XmlNode::Text(indent));
                self.children.insert(at + 1, XmlNode::Element(child));
                at + 1
            }
            _ => {
                self.children.push(XmlNode::Element(child));
                self.children.len() - 1
            }
        }
    }

    /// Removes the child at `index`. Whitespace directly in front of a removed
    /// element goes with it so no blank line is left behind.
    pub fn remove_child(&mut self, index: usize) -> Option<XmlNode> {
        if index >= self.children.len() {
            return None;
        }

        let removed = self.children.remove(index);
        if removed.as_element().is_some() && index > 0 && self.children[index - 1].is_whitespace()
        {
            self.children.remove(index - 1);
        }
        Some(removed)
    }

    fn child_indent(&self) -> Option<String> {
        self.children
            .windows(2)
            .rev()
            .find_map(|pair| match pair {
                [XmlNode::Text(text), XmlNode::Element(_)] if text.trim().is_empty() => {
                    Some(text.clone())
                }
                _ => None,
            })
    }
}

/// Splits `prefix:local` into its parts.
pub fn split_qualified(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, name),
    }
}

/// A parsed document: the top-level nodes in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    nodes: Vec<XmlNode>,
}

impl XmlDocument {
    pub fn parse(text: &str) -> InjectResult<Self> {
        let mut reader = Reader::from_str(text);
        let mut open: Vec<Element> = Vec::new();
        let mut nodes = Vec::new();

        loop {
            let start = reader.buffer_position() as usize;
            let event = match reader.read_event() {
                Ok(event) => event,
                Err(err) => {
                    return Err(InjectError::Xml(format!(
                        "at byte {}: {err}",
                        reader.buffer_position()
                    )))
                }
            };
            let end = reader.buffer_position() as usize;

            match event {
                Event::Start(tag) => open.push(element_from_start(&tag)?),
                Event::Empty(tag) => {
                    let element = element_from_start(&tag)?;
                    attach(&mut open, &mut nodes, XmlNode::Element(element));
                }
                Event::End(_) => {
                    let element = open.pop().ok_or_else(|| {
                        InjectError::Xml(format!("at byte {start}: unexpected closing tag"))
                    })?;
                    attach(&mut open, &mut nodes, XmlNode::Element(element));
                }
                Event::Text(_) => {
                    attach(&mut open, &mut nodes, XmlNode::Text(text[start..end].to_string()))
                }
                Event::Eof => break,
                _ => attach(
                    &mut open,
                    &mut nodes,
                    XmlNode::Markup(text[start..end].to_string()),
                ),
            }
        }

        if let Some(unclosed) = open.last() {
            return Err(InjectError::Xml(format!(
                "unclosed element <{}>",
                unclosed.name
            )));
        }

        Ok(Self { nodes })
    }

    pub fn serialize(&self) -> InjectResult<String> {
        let mut writer = Writer::new(Vec::new());
        for node in &self.nodes {
            write_node(&mut writer, node)?;
        }
        String::from_utf8(writer.into_inner()).map_err(write_error)
    }

    /// Path of child positions to the first element (depth-first, document
    /// order) whose local name is `local_name`.
    pub fn find_path(&self, local_name: &str) -> Option<Vec<usize>> {
        find_in(&self.nodes, local_name)
    }

    pub fn element_at(&self, path: &[usize]) -> Option<&Element> {
        let (first, rest) = path.split_first()?;
        let mut current = self.nodes.get(*first)?.as_element()?;
        for index in rest {
            current = current.children.get(*index)?.as_element()?;
        }
        Some(current)
    }

    pub fn element_at_mut(&mut self, path: &[usize]) -> Option<&mut Element> {
        let (first, rest) = path.split_first()?;
        let mut current = self.nodes.get_mut(*first)?.as_element_mut()?;
        for index in rest {
            current = current.children.get_mut(*index)?.as_element_mut()?;
        }
        Some(current)
    }
}

fn element_from_start(tag: &BytesStart<'_>) -> InjectResult<Element> {
    let mut element = Element::new(String::from_utf8_lossy(tag.name().as_ref()).into_owned());
    for attribute in tag.attributes() {
        let attribute = attribute.map_err(|err| InjectError::Xml(err.to_string()))?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute
            .unescape_value()
            .map_err(|err| InjectError::Xml(err.to_string()))?
            .into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(open: &mut [Element], nodes: &mut Vec<XmlNode>, node: XmlNode) {
    match open.last_mut() {
        Some(parent) => parent.children.push(node),
        None => nodes.push(node),
    }
}

fn find_in(nodes: &[XmlNode], local_name: &str) -> Option<Vec<usize>> {
    for (index, node) in nodes.iter().enumerate() {
        let XmlNode::Element(element) = node else {
            continue;
        };
        if element.local_name() == local_name {
            return Some(vec![index]);
        }
        if let Some(mut path) = find_in(&element.children, local_name) {
            path.insert(0, index);
            return Some(path);
        }
    }
    None
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &XmlNode) -> InjectResult<()> {
    match node {
        XmlNode::Element(element) => write_element(writer, element),
        XmlNode::Text(text) => writer
            .write_event(Event::Text(BytesText::from_escaped(text.as_str())))
            .map_err(write_error),
        XmlNode::Markup(raw) => {
            writer.get_mut().write_all(raw.as_bytes())?;
            Ok(())
        }
    }
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &Element) -> InjectResult<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() {
        return writer.write_event(Event::Empty(start)).map_err(write_error);
    }

    writer.write_event(Event::Start(start)).map_err(write_error)?;
    for child in &element.children {
        write_node(writer, child)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(element.name.as_str())))
        .map_err(write_error)
}

fn write_error(err: impl Display) -> InjectError {
    InjectError::Xml(err.to_string())
}
