//! Builds a [`Document`] out of the events of a [`Parser`](super::parser::Parser).

use std::mem;

use crate::errors::{Error, Result};
use crate::name::{declared_prefix, split_qname_last};
use crate::tree::{Document, NodeId};

use super::parser::{is_whitespace, Handler};

/// [`Handler`] appending every event to a document under construction.
///
/// Once the top-level element is closed the document can be taken with
/// [`take_document`](Self::take_document); any further element is then a
/// second root until the document was taken.
#[derive(Debug, Default)]
pub(crate) struct TreeBuilder {
    keep_whitespace: bool,
    doc: Document,
    /// Innermost open element
    current: Option<NodeId>,
    root: Option<NodeId>,
}

impl TreeBuilder {
    pub fn new(keep_whitespace: bool) -> Self {
        Self {
            keep_whitespace,
            ..Self::default()
        }
    }

    /// Drops the partially built document.
    pub fn reset(&mut self) {
        self.doc = Document::new();
        self.current = None;
        self.root = None;
    }

    /// Returns the finished document if its root element was closed, and
    /// starts a new one.
    pub fn take_document(&mut self) -> Option<Document> {
        self.root.take()?;
        self.current = None;
        Some(mem::take(&mut self.doc))
    }
}

impl Handler for TreeBuilder {
    fn start_element(&mut self, name: &str) -> Result<()> {
        debug!("start element <{}>", name);
        if self.root.is_some() {
            return Err(Error::MultipleRoots);
        }
        let element = self.doc.create_element(name);
        if let Some(parent) = self.current {
            self.doc.append_child(parent, element)?;
        }
        self.current = Some(element);
        Ok(())
    }

    fn attribute(&mut self, name: &str, value: &str) -> Result<()> {
        debug!("attribute {}=\"{}\"", name, value);
        let element = self.current.ok_or_else(|| {
            Error::InvalidSyntax(format!("attribute `{}` outside of a start tag", name))
        })?;
        match declared_prefix(name) {
            Some(prefix) => self.doc.set_namespace_uri(element, prefix, value),
            None => self.doc.add_attribute(element, name, value),
        }
    }

    fn end_element(&mut self, name: Option<&str>) -> Result<()> {
        debug!("end element </{}>", name.unwrap_or(""));
        let element = self.current.ok_or_else(|| Error::TagMismatch {
            expected: String::new(),
            found: name.unwrap_or_default().to_owned(),
        })?;

        if let Some(name) = name {
            let (prefix, tag) = split_qname_last(name);
            if let Some(e) = self.doc.element(element) {
                if e.prefix() != prefix || e.tag() != tag {
                    return Err(Error::TagMismatch {
                        expected: e.qualified_name().into_owned(),
                        found: name.to_owned(),
                    });
                }
            }
        }

        match self.doc.parent(element) {
            Some(parent) => self.current = Some(parent),
            None => {
                if self.root.is_some() {
                    return Err(Error::MultipleRoots);
                }
                self.doc.set_root(element)?;
                self.root = Some(element);
                self.current = None;
            }
        }
        Ok(())
    }

    fn character_data(&mut self, data: &str) -> Result<()> {
        let blank = data.bytes().all(is_whitespace);
        match self.current {
            None if blank => Ok(()),
            None => Err(Error::InvalidNesting),
            Some(element) if self.keep_whitespace || !blank => {
                debug!("text ({} bytes)", data.len());
                self.doc.add_text(element, data).map(|_| ())
            }
            Some(_) => Ok(()),
        }
    }
}
