//! Canonical serialization.
//!
//! Two trees with the same elements, attributes, text and namespace
//! resolution are written as the same bytes, whatever the order of their
//! attributes and the place where their namespaces were declared.

use std::collections::BTreeMap;
use std::io::Write;

use delegate::delegate;

use crate::errors::{Error, Result};
use crate::name::{XML_NAMESPACE, XML_PREFIX};
use crate::tree::{Attribute, Document, NodeId, NodeKind};

use super::{walk, Serializer, Walk};

/// `prefix -> uri` bindings rendered on one element. The empty prefix is the
/// default namespace.
type NsBinding = BTreeMap<String, String>;

/// Writes a subtree in canonical form.
///
/// - elements are never shrunk and nothing is indented;
/// - an element declares exactly the namespaces that it or its attributes use
///   and that are not already declared the same way by a written ancestor,
///   sorted by prefix with the default namespace first;
/// - unprefixed attributes come first, sorted by name, then prefixed ones
///   sorted by namespace URI and local name; prefixed attributes whose prefix
///   is not bound are left out;
/// - all text is written as escaped character data, including CDATA
///   sections and comments.
///
/// # Examples
///
/// ```
/// # use pretty_assertions::assert_eq;
/// use xml_arbor::{CanonicalWriter, Reader};
///
/// let xml = "<r xmlns:b='urn:b' xmlns:unused='urn:u' b:x='1' z='2' a='3'><e/></r>";
/// let doc = Reader::new().parse_str(xml).unwrap();
///
/// let mut writer = CanonicalWriter::new(Vec::new());
/// writer.serialize_document(&doc).unwrap();
///
/// let expected = r#"<r xmlns:b="urn:b" a="3" z="2" b:x="1"><e></e></r>"#;
/// assert_eq!(writer.into_inner(), expected.as_bytes());
/// ```
#[derive(Clone, Debug)]
pub struct CanonicalWriter<W: Write> {
    serializer: Serializer<W>,
}

impl<W: Write> CanonicalWriter<W> {
    /// Creates a `CanonicalWriter` from a generic writer.
    pub fn new(inner: W) -> CanonicalWriter<W> {
        CanonicalWriter {
            serializer: Serializer::new(inner).shrink_empty_elements(false),
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
            /// Consumes this `CanonicalWriter`, returning the underlying writer.
            pub fn into_inner(self) -> W;
            /// Get a reference to the underlying writer.
            pub fn get_ref(&self) -> &W;
            /// Get a mutable reference to the underlying writer.
            pub fn get_mut(&mut self) -> &mut W;
        }
    }

    /// Writes the subtree rooted at `node`.
    ///
    /// Namespaces inherited from outside of the subtree are declared on the
    /// elements that use them.
    pub fn serialize(&mut self, doc: &Document, node: NodeId) -> Result<()> {
        let s = &mut self.serializer;
        // bindings rendered by the open ancestors that declared something
        let mut rendered_ns_stack: Vec<NsBinding> = Vec::new();
        // whether each open element pushed onto `rendered_ns_stack`
        let mut pushed: Vec<bool> = Vec::new();

        s.start_document()?;
        for step in walk(doc, node) {
            match step {
                Walk::Enter(id) => match doc.node(id).kind() {
                    NodeKind::Element(e) => {
                        let (declared, naked, prefixed) = element_layout(doc, id, &rendered_ns_stack);

                        s.start_element(e.prefix(), e.tag())?;
                        for (prefix, uri) in &declared {
                            if prefix.is_empty() {
                                s.attribute("", "xmlns", uri)?;
                            } else if prefix != XML_PREFIX || uri != XML_NAMESPACE {
                                s.attribute("xmlns", prefix, uri)?;
                            }
                        }
                        for a in naked.into_iter().chain(prefixed) {
                            s.attribute(a.prefix(), a.name(), a.value())?;
                        }

                        pushed.push(!declared.is_empty());
                        if !declared.is_empty() {
                            rendered_ns_stack.push(declared);
                        }
                    }
                    NodeKind::Text(t) => s.text(t.as_str())?,
                },
                Walk::Leave(id) => {
                    if let Some(e) = doc.element(id) {
                        s.end_element(e.prefix(), e.tag())?;
                    }
                    if pushed.pop() == Some(true) {
                        rendered_ns_stack.pop();
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

/// URI rendered for `prefix` by the closest ancestor that declared it.
fn rendered_for<'s>(stack: &'s [NsBinding], prefix: &str) -> Option<&'s str> {
    stack
        .iter()
        .rev()
        .find_map(|binding| binding.get(prefix))
        .map(String::as_str)
}

/// Computes the namespace declarations an element needs and its attributes,
/// unprefixed then prefixed, in output order.
fn element_layout<'d>(
    doc: &'d Document,
    id: NodeId,
    stack: &[NsBinding],
) -> (NsBinding, Vec<&'d Attribute>, Vec<&'d Attribute>) {
    let mut declared = NsBinding::new();
    let e = match doc.element(id) {
        Some(e) => e,
        None => return (declared, Vec::new(), Vec::new()),
    };

    let namespace = doc.namespace(id);
    let rendered = rendered_for(stack, e.prefix());
    if e.prefix().is_empty() {
        match (rendered, namespace) {
            (None, Some(uri)) => {
                declared.insert(String::new(), uri.to_owned());
            }
            (Some(r), uri) if r != uri.unwrap_or("") => {
                declared.insert(String::new(), uri.unwrap_or("").to_owned());
            }
            _ => {}
        }
    } else if let Some(uri) = namespace {
        if rendered != Some(uri) {
            declared.insert(e.prefix().to_owned(), uri.to_owned());
        }
    }

    let mut naked = Vec::new();
    let mut prefixed = Vec::new();
    for a in e.attributes() {
        if a.prefix().is_empty() {
            naked.push(a);
        } else if let Some(uri) = doc.namespace_uri(id, a.prefix()) {
            if rendered_for(stack, a.prefix()) != Some(uri) {
                declared.insert(a.prefix().to_owned(), uri.to_owned());
            }
            prefixed.push((uri, a));
        } else {
            trace!("dropping attribute {}:{}, its prefix is unbound", a.prefix(), a.name());
        }
    }
    naked.sort_by(|a, b| a.name().cmp(b.name()));
    prefixed.sort_by(|(u1, a1), (u2, a2)| u1.cmp(u2).then_with(|| a1.name().cmp(a2.name())));

    (declared, naked, prefixed.into_iter().map(|(_, a)| a).collect())
}
