//! A module to handle `Writer`

mod canonical;

use std::io::Write;

use delegate::delegate;

use crate::errors::{Error, Result};
use crate::escape::{escape_attribute, escape_text};
use crate::tree::{Document, NodeId, NodeKind, TokenType};

pub use self::canonical::CanonicalWriter;

const XML_DECLARATION: &[u8] = b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\r\n";

/// Low level XML event writer.
///
/// The closing `>` of a start tag is only written once something follows
/// it, so that an element without content can be closed as `<tag/>`.
///
/// # Examples
///
/// ```
/// # use pretty_assertions::assert_eq;
/// use xml_arbor::writer::Serializer;
///
/// let mut serializer = Serializer::new(Vec::new());
/// serializer.start_document().unwrap();
/// serializer.start_element("", "my_elem").unwrap();
/// serializer.attribute("", "my-key", "some value").unwrap();
/// serializer.start_element("x", "empty").unwrap();
/// serializer.end_element("x", "empty").unwrap();
/// serializer.text("a < b").unwrap();
/// serializer.end_element("", "my_elem").unwrap();
/// serializer.end_document().unwrap();
///
/// let result = serializer.into_inner();
/// let expected = r#"<my_elem my-key="some value"><x:empty/>a &lt; b</my_elem>"#;
/// assert_eq!(result, expected.as_bytes());
/// ```
#[derive(Clone, Debug)]
pub struct Serializer<W: Write> {
    /// underlying writer
    writer: W,
    indentation: usize,
    shrink_empty_elements: bool,
    xml_declaration: bool,
    depth: usize,
    /// A start tag was written without its closing `>`
    pending: bool,
    /// Text was written since the last start or end tag
    has_text: bool,
}

impl<W: Write> Serializer<W> {
    /// Creates a serializer with no indentation, shrinking empty elements and
    /// without XML declaration.
    pub fn new(inner: W) -> Serializer<W> {
        Serializer {
            writer: inner,
            indentation: 0,
            shrink_empty_elements: true,
            xml_declaration: false,
            depth: 0,
            pending: false,
            has_text: false,
        }
    }

    /// Changes the number of spaces written per nesting level before each tag.
    /// With `0`, tags are written one after the other.
    ///
    /// (`0` by default)
    pub fn indentation(mut self, val: usize) -> Self {
        self.indentation = val;
        self
    }

    /// Changes whether an element without content is written as `<tag/>`
    /// instead of `<tag></tag>`.
    ///
    /// (`true` by default)
    pub fn shrink_empty_elements(mut self, val: bool) -> Self {
        self.shrink_empty_elements = val;
        self
    }

    /// Changes whether [`start_document`](Self::start_document) writes an XML
    /// declaration.
    ///
    /// (`false` by default)
    pub fn xml_declaration(mut self, val: bool) -> Self {
        self.xml_declaration = val;
        self
    }

    /// Consumes this `Serializer`, returning the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Get a reference to the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Get a mutable reference to the underlying writer.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Writes the XML declaration if it is enabled.
    pub fn start_document(&mut self) -> Result<()> {
        if self.xml_declaration {
            self.write(XML_DECLARATION)?;
        }
        Ok(())
    }

    /// Checks that no start tag was left unfinished.
    pub fn end_document(&mut self) -> Result<()> {
        if self.pending {
            return Err(Error::InvalidState(
                "document ended inside an unterminated start tag".to_string(),
            ));
        }
        self.writer.flush().map_err(Error::Io)
    }

    /// Opens an element. `prefix` is empty for an unprefixed name.
    pub fn start_element(&mut self, prefix: &str, name: &str) -> Result<()> {
        self.close_pending()?;
        if self.indentation > 0 {
            self.write_indentation(true)?;
        }
        self.pending = true;
        self.has_text = false;
        self.depth += 1;
        self.write(b"<")?;
        self.write_qname(prefix, name)
    }

    /// Closes the current element.
    pub fn end_element(&mut self, prefix: &str, name: &str) -> Result<()> {
        self.depth = self.depth.saturating_sub(1);
        if self.pending {
            self.pending = false;
            if self.shrink_empty_elements {
                return self.write(b"/>");
            }
            self.write(b">")?;
        }
        if self.indentation > 0 && !self.has_text {
            self.write_indentation(false)?;
        }
        self.has_text = false;
        self.write(b"</")?;
        self.write_qname(prefix, name)?;
        self.write(b">")
    }

    /// Adds an attribute to the element just started.
    ///
    /// Fails with [`Error::InvalidState`] once the start tag was closed by
    /// some content.
    pub fn attribute(&mut self, prefix: &str, name: &str, value: &str) -> Result<()> {
        if !self.pending {
            return Err(Error::InvalidState(format!(
                "attribute `{}` written outside of a start tag",
                name
            )));
        }
        self.write(b" ")?;
        self.write_qname(prefix, name)?;
        self.write(b"=\"")?;
        self.write(escape_attribute(value).as_bytes())?;
        self.write(b"\"")
    }

    /// Writes escaped character data.
    pub fn text(&mut self, text: &str) -> Result<()> {
        self.close_pending()?;
        self.has_text = true;
        self.write(escape_text(text).as_bytes())
    }

    /// Writes `data` verbatim inside a `<![CDATA[...]]>` section.
    pub fn cdata_section(&mut self, data: &str) -> Result<()> {
        self.close_pending()?;
        self.has_text = true;
        self.write(b"<![CDATA[")?;
        self.write(data.as_bytes())?;
        self.write(b"]]>")
    }

    /// Writes `comment` verbatim inside `<!--...-->`.
    pub fn comment(&mut self, comment: &str) -> Result<()> {
        self.close_pending()?;
        self.write(b"<!--")?;
        self.write(comment.as_bytes())?;
        self.write(b"-->")
    }

    #[inline]
    fn write(&mut self, value: &[u8]) -> Result<()> {
        self.writer.write_all(value).map_err(Error::Io)
    }

    fn write_qname(&mut self, prefix: &str, name: &str) -> Result<()> {
        if !prefix.is_empty() {
            self.write(prefix.as_bytes())?;
            self.write(b":")?;
        }
        self.write(name.as_bytes())
    }

    fn close_pending(&mut self) -> Result<()> {
        if self.pending {
            self.pending = false;
            self.write(b">")?;
        }
        Ok(())
    }

    /// A line break (omitted before the first start tag at the top level),
    /// then the indentation of the current depth.
    fn write_indentation(&mut self, start: bool) -> Result<()> {
        if self.depth > 0 || !start {
            self.write(b"\r\n")?;
        }
        let width = self.indentation * self.depth;
        write!(self.writer, "{:width$}", "", width = width).map_err(Error::Io)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////

/// Step of a depth first walk over a subtree.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Walk {
    Enter(NodeId),
    Leave(NodeId),
}

/// Yields the enter and leave steps of the subtree rooted at `node`, in
/// document order.
pub(crate) fn walk(doc: &Document, node: NodeId) -> impl Iterator<Item = Walk> + '_ {
    let mut stack = vec![Walk::Enter(node)];
    std::iter::from_fn(move || {
        let step = stack.pop()?;
        if let Walk::Enter(id) = step {
            if doc.element(id).is_some() {
                stack.push(Walk::Leave(id));
                stack.extend(doc.children(id).iter().rev().map(|&c| Walk::Enter(c)));
            }
        }
        Some(step)
    })
}

/// Writes a subtree as XML, the way it was read.
///
/// Namespace bindings owned by an element are written as `xmlns` attributes
/// after its regular attributes. Text nodes of type
/// [`CdataSection`](TokenType::CdataSection) and [`Comment`](TokenType::Comment)
/// are written as such, every other text is escaped.
///
/// # Examples
///
/// ```
/// # use pretty_assertions::assert_eq;
/// use xml_arbor::{Reader, Writer};
///
/// let doc = Reader::new().parse_str("<a xmlns='urn:a'><b>x&amp;y</b></a>").unwrap();
///
/// let mut writer = Writer::new_with_indent(Vec::new(), 2);
/// writer.serialize_document(&doc).unwrap();
///
/// let expected = "<a xmlns=\"urn:a\">\r\n  <b>x&amp;y</b>\r\n</a>";
/// assert_eq!(writer.into_inner(), expected.as_bytes());
/// ```
#[derive(Clone, Debug)]
pub struct Writer<W: Write> {
    serializer: Serializer<W>,
}

impl<W: Write> Writer<W> {
    /// Creates a `Writer` from a generic writer.
    pub fn new(inner: W) -> Writer<W> {
        Writer {
            serializer: Serializer::new(inner),
        }
    }

    /// Creates a `Writer` indenting every nesting level by `indentation` spaces.
    pub fn new_with_indent(inner: W, indentation: usize) -> Writer<W> {
        Writer {
            serializer: Serializer::new(inner).indentation(indentation),
        }
    }

    /// Changes whether the output starts with an XML declaration.
    ///
    /// (`false` by default)
    pub fn xml_declaration(mut self, val: bool) -> Self {
        self.serializer = self.serializer.xml_declaration(val);
        self
    }

    delegate! {
        to self.serializer {
            /// Consumes this `Writer`, returning the underlying writer.
            pub fn into_inner(self) -> W;
            /// Get a reference to the underlying writer.
            pub fn get_ref(&self) -> &W;
            /// Get a mutable reference to the underlying writer.
            pub fn get_mut(&mut self) -> &mut W;
        }
    }

    /// Writes the subtree rooted at `node`.
    pub fn serialize(&mut self, doc: &Document, node: NodeId) -> Result<()> {
        let s = &mut self.serializer;
        s.start_document()?;
        for step in walk(doc, node) {
            match step {
                Walk::Enter(id) => match doc.node(id).kind() {
                    NodeKind::Element(e) => {
                        s.start_element(e.prefix(), e.tag())?;
                        for attribute in e.attributes() {
                            s.attribute(attribute.prefix(), attribute.name(), attribute.value())?;
                        }
                        for (prefix, uri) in e.namespace_map().into_iter().flat_map(|m| m.iter()) {
                            if prefix.is_empty() {
                                s.attribute("", "xmlns", uri)?;
                            } else {
                                s.attribute("xmlns", prefix, uri)?;
                            }
                        }
                    }
                    NodeKind::Text(t) => match t.token() {
                        TokenType::CdataSection => s.cdata_section(t.as_str())?,
                        TokenType::Comment => s.comment(t.as_str())?,
                        _ => s.text(t.as_str())?,
                    },
                },
                Walk::Leave(id) => {
                    if let Some(e) = doc.element(id) {
                        s.end_element(e.prefix(), e.tag())?;
                    }
                }
            }
        }
        s.end_document()
    }

    /// Writes the whole document. Fails with [`Error::NoRoot`] if it has no root.
    pub fn serialize_document(&mut self, doc: &Document) -> Result<()> {
        let root = doc.root().ok_or(Error::NoRoot)?;
        self.serialize(doc, root)
    }
}
