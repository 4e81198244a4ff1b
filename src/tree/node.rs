//! Node payloads stored in a [`Document`](super::Document) arena.

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

use std::borrow::Cow;

use super::NodeId;
use crate::name::{split_qname, NamespaceMap};

/// One slot of the arena: the node payload and a link to its parent.
///
/// The parent link never owns anything, the arena owns every node.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) kind: NodeKind,
}

impl Node {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Self { parent: None, kind }
    }

    /// The element this node is a child of, if it was attached to one.
    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// What this node is.
    #[inline]
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Returns the element payload if this node is an element.
    #[inline]
    pub fn as_element(&self) -> Option<&Element> {
        match &self.kind {
            NodeKind::Element(e) => Some(e),
            NodeKind::Text(_) => None,
        }
    }

    /// Returns the text payload if this node is a text node.
    #[inline]
    pub fn as_text(&self) -> Option<&Text> {
        match &self.kind {
            NodeKind::Text(t) => Some(t),
            NodeKind::Element(_) => None,
        }
    }
}

/// The two kinds of nodes a tree is made of.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum NodeKind {
    /// A tag with attributes and children.
    Element(Element),
    /// A run of character data.
    Text(Text),
}

////////////////////////////////////////////////////////////////////////////////////////////////////

/// An element node.
///
/// Namespace declarations (`xmlns`, `xmlns:p`) are not attributes: they live in
/// the element's own [`NamespaceMap`], created when the first one is declared.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Element {
    pub(crate) prefix: String,
    pub(crate) tag: String,
    pub(crate) attributes: Vec<Attribute>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) namespaces: Option<NamespaceMap>,
    /// Nearest ancestor that owns a namespace map.
    pub(crate) namespace_parent: Option<NodeId>,
}

impl Element {
    pub(crate) fn new(prefix: &str, tag: &str) -> Self {
        Self {
            prefix: prefix.to_owned(),
            tag: tag.to_owned(),
            attributes: Vec::new(),
            children: Vec::new(),
            namespaces: None,
            namespace_parent: None,
        }
    }

    /// Namespace prefix, empty when the element is unprefixed.
    #[inline]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Local name.
    #[inline]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// `prefix:tag`, or just `tag` without a prefix.
    pub fn qualified_name(&self) -> Cow<str> {
        if self.prefix.is_empty() {
            Cow::Borrowed(&self.tag)
        } else {
            Cow::Owned(format!("{}:{}", self.prefix, self.tag))
        }
    }

    /// Attributes in document order.
    #[inline]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Children in document order.
    #[inline]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Bindings declared on this very element, if any.
    #[inline]
    pub fn namespace_map(&self) -> Option<&NamespaceMap> {
        self.namespaces.as_ref()
    }

    /// The nearest ancestor owning a [`NamespaceMap`]; unresolved prefixes are
    /// looked up there.
    #[inline]
    pub fn namespace_parent(&self) -> Option<NodeId> {
        self.namespace_parent
    }
}

/// An attribute of an [`Element`].
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Attribute {
    prefix: String,
    name: String,
    value: String,
}

impl Attribute {
    /// Creates an attribute from a qualified name, split at the first `:`.
    ///
    /// ```
    /// # use pretty_assertions::assert_eq;
    /// use xml_arbor::tree::Attribute;
    ///
    /// let attr = Attribute::new("xml:lang", "en");
    /// assert_eq!(attr.prefix(), "xml");
    /// assert_eq!(attr.name(), "lang");
    /// assert_eq!(attr.value(), "en");
    /// ```
    pub fn new(qname: &str, value: &str) -> Self {
        let (prefix, name) = split_qname(qname);
        Self::with_prefix(prefix, name, value)
    }

    /// Creates an attribute from an explicit prefix (empty for none) and local name.
    pub fn with_prefix(prefix: &str, name: &str, value: &str) -> Self {
        Self {
            prefix: prefix.to_owned(),
            name: name.to_owned(),
            value: value.to_owned(),
        }
    }

    /// Namespace prefix, empty when the attribute is unprefixed.
    #[inline]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Local name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unescaped value.
    #[inline]
    pub fn value(&self) -> &str {
        &self.value
    }

    #[inline]
    pub(crate) fn set_value(&mut self, value: &str) {
        self.value.clear();
        self.value.push_str(value);
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////

/// Where the content of a [`Text`] node came from.
///
/// The reader merges everything between two tags into one
/// [`CharacterData`](TokenType::CharacterData) node. The other kinds only appear
/// in trees built by hand, and tell the [`Writer`](crate::writer::Writer) how
/// to write them back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum TokenType {
    /// Plain character data, escaped when written.
    CharacterData,
    /// Whitespace only, not significant for the document.
    IgnorableWhitespace,
    /// Written back as `<![CDATA[...]]>`.
    CdataSection,
    /// Text produced by an entity reference.
    EntityReference,
    /// Written back as `<!--...-->`.
    Comment,
}

/// A text node.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Text {
    token: TokenType,
    text: String,
}

impl Text {
    pub(crate) fn new(token: TokenType, text: &str) -> Self {
        Self {
            token,
            text: text.to_owned(),
        }
    }

    /// Kind of the token this text was made of.
    #[inline]
    pub fn token(&self) -> TokenType {
        self.token
    }

    /// Decoded content.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.text
    }
}
