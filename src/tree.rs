//! Arena based document tree.
//!
//! Every node of a [`Document`] lives in one vector and is addressed by a
//! [`NodeId`]. Parent links and the namespace parent links used to resolve
//! prefixes are indices into that vector, so the tree owns all its nodes
//! without reference cycles.
//!
//! ```
//! # use pretty_assertions::assert_eq;
//! use xml_arbor::tree::{Document, NamespaceMatch};
//!
//! let mut doc = Document::new();
//! let top = doc.create_element("top");
//! doc.set_root(top).unwrap();
//! doc.set_namespace_uri(top, "", "urn:a").unwrap();
//!
//! let child = doc.create_element("child");
//! doc.append_child(top, child).unwrap();
//! doc.add_text(child, "hello").unwrap();
//!
//! assert_eq!(doc.namespace(child), Some("urn:a"));
//! assert_eq!(doc.child(top, "child", NamespaceMatch::Uri("urn:a"), 0), Some(child));
//! assert_eq!(doc.text(child, 0), Some("hello"));
//! ```

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

use std::iter::once;

use crate::errors::{Error, Result};
use crate::name::{split_qname, NamespaceMap, XML_NAMESPACE, XML_PREFIX};

mod node;

pub use self::node::{Attribute, Element, Node, NodeKind, Text, TokenType};

/// Index of a node inside the [`Document`] that created it.
///
/// Ids are only meaningful for the document they come from. Passing an id of
/// another document to an accessor panics or addresses an unrelated node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in the arena.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Namespace filter used by [`Document::attribute`] and [`Document::child`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NamespaceMatch<'a> {
    /// Only names that are not in any namespace.
    Unqualified,
    /// Names in any namespace, or in none.
    Any,
    /// Names in this namespace. `Uri("")` is the same as
    /// [`Unqualified`](Self::Unqualified).
    Uri(&'a str),
}

impl<'a> NamespaceMatch<'a> {
    fn uri(self) -> Option<Option<&'a str>> {
        match self {
            NamespaceMatch::Any => None,
            NamespaceMatch::Unqualified | NamespaceMatch::Uri("") => Some(None),
            NamespaceMatch::Uri(uri) => Some(Some(uri)),
        }
    }
}

/// A tree of elements and text nodes with at most one root element.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Document {
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

impl Document {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// The root element, if one was set.
    #[inline]
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Makes a detached element the root of the document.
    pub fn set_root(&mut self, id: NodeId) -> Result<()> {
        let node = &self.nodes[id.0];
        if node.parent.is_some() || node.as_element().is_none() {
            return Err(Error::InvalidNesting);
        }
        self.root = Some(id);
        Ok(())
    }

    /// Number of nodes ever created in this document, attached or not.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// `true` if no node was created yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the node behind `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not created by this document.
    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Returns the element behind `id`, or `None` for a text node.
    #[inline]
    pub fn element(&self, id: NodeId) -> Option<&Element> {
        self.node(id).as_element()
    }

    /// Returns the text node behind `id`, or `None` for an element.
    #[inline]
    pub fn text_node(&self, id: NodeId) -> Option<&Text> {
        self.node(id).as_text()
    }

    /// The element `id` is attached to.
    #[inline]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Children of `id` in document order. Text nodes have none.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.element(id) {
            Some(e) => &e.children,
            None => &[],
        }
    }

    /// Iterates over the parent of `id`, its parent, and so on up to the top.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: self.parent(id),
        }
    }

    /// Iterates over `id` and all the nodes below it in document order.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            doc: self,
            stack: vec![id],
        }
    }

    ////////////////////////////////////////////////////////////////////////////////////////////////

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(kind));
        id
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut Element> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Element(e) => Ok(e),
            NodeKind::Text(_) => Err(Error::InvalidNesting),
        }
    }

    /// Creates a detached element from a qualified name, split at the first `:`.
    pub fn create_element(&mut self, qname: &str) -> NodeId {
        let (prefix, tag) = split_qname(qname);
        self.create_element_with_prefix(prefix, tag)
    }

    /// Creates a detached element with an explicit prefix (empty for none).
    pub fn create_element_with_prefix(&mut self, prefix: &str, tag: &str) -> NodeId {
        self.push(NodeKind::Element(Element::new(prefix, tag)))
    }

    /// Creates a detached text node.
    pub fn create_text(&mut self, token: TokenType, text: &str) -> NodeId {
        self.push(NodeKind::Text(Text::new(token, text)))
    }

    /// Attaches the detached node `child` as the last child of the element `parent`.
    ///
    /// Fails with [`Error::InvalidNesting`] if `parent` is a text node, if
    /// `child` already has a parent or is the document root, or if `child`
    /// is `parent` or one of its ancestors.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        if self.node(child).parent.is_some()
            || self.root == Some(child)
            || child == parent
            || self.ancestors(parent).any(|a| a == child)
        {
            return Err(Error::InvalidNesting);
        }
        self.element_mut(parent)?.children.push(child);
        self.nodes[child.0].parent = Some(parent);

        let namespace_parent = self.inherited_namespace_parent(parent);
        let changed = match &mut self.nodes[child.0].kind {
            NodeKind::Element(e) if e.namespace_parent != namespace_parent => {
                e.namespace_parent = namespace_parent;
                true
            }
            _ => false,
        };
        if changed {
            self.relink_namespace_maps(child);
        }
        Ok(())
    }

    /// Creates a [`CharacterData`](TokenType::CharacterData) node and appends
    /// it to `element`.
    pub fn add_text(&mut self, element: NodeId, text: &str) -> Result<NodeId> {
        // checked before creating the node, so that a failure leaves no orphan
        self.element_mut(element)?;
        let id = self.create_text(TokenType::CharacterData, text);
        self.append_child(element, id)?;
        Ok(id)
    }

    /// Appends an attribute without looking for an existing one of the same name.
    pub fn add_attribute(&mut self, element: NodeId, qname: &str, value: &str) -> Result<()> {
        self.element_mut(element)?
            .attributes
            .push(Attribute::new(qname, value));
        Ok(())
    }

    /// Sets the value of the attribute with exactly this `prefix` (empty for
    /// none) and local `name`, adding it if there is none.
    ///
    /// ```
    /// # use pretty_assertions::assert_eq;
    /// use xml_arbor::tree::{Document, NamespaceMatch};
    ///
    /// let mut doc = Document::new();
    /// let top = doc.create_element("top");
    /// doc.set_namespace_uri(top, "ns", "urn:ns").unwrap();
    /// doc.set_attribute(top, "", "foo", "1").unwrap();
    /// doc.set_attribute(top, "ns", "foo", "2").unwrap();
    /// doc.set_attribute(top, "", "foo", "3").unwrap();
    ///
    /// assert_eq!(doc.attribute(top, "foo", NamespaceMatch::Unqualified), Some("3"));
    /// assert_eq!(doc.attribute(top, "foo", NamespaceMatch::Uri("urn:ns")), Some("2"));
    /// ```
    pub fn set_attribute(
        &mut self,
        element: NodeId,
        prefix: &str,
        name: &str,
        value: &str,
    ) -> Result<()> {
        let attributes = &mut self.element_mut(element)?.attributes;
        match attributes
            .iter_mut()
            .find(|a| a.prefix() == prefix && a.name() == name)
        {
            Some(attribute) => attribute.set_value(value),
            None => attributes.push(Attribute::with_prefix(prefix, name, value)),
        }
        Ok(())
    }

    /// Value of the first attribute of `element` with this local name whose
    /// namespace matches.
    ///
    /// Unprefixed attributes are never in a namespace, not even the default one.
    pub fn attribute(&self, element: NodeId, name: &str, namespace: NamespaceMatch) -> Option<&str> {
        let e = self.element(element)?;
        let wanted = namespace.uri();
        e.attributes
            .iter()
            .find(|a| {
                a.name() == name
                    && match wanted {
                        None => true,
                        Some(None) => a.prefix().is_empty(),
                        Some(Some(uri)) => {
                            !a.prefix().is_empty()
                                && self.namespace_uri(element, a.prefix()) == Some(uri)
                        }
                    }
            })
            .map(Attribute::value)
    }

    /// The `n`-th (starting at 0) child element of `element` with this tag
    /// whose namespace matches.
    pub fn child(
        &self,
        element: NodeId,
        tag: &str,
        namespace: NamespaceMatch,
        n: usize,
    ) -> Option<NodeId> {
        let wanted = namespace.uri();
        self.children(element)
            .iter()
            .copied()
            .filter(|&id| match self.element(id) {
                Some(e) if e.tag() == tag => match wanted {
                    None => true,
                    Some(uri) => self.namespace(id) == uri,
                },
                _ => false,
            })
            .nth(n)
    }

    /// Content of the `n`-th (starting at 0) text child of `element`.
    pub fn text(&self, element: NodeId, n: usize) -> Option<&str> {
        self.children(element)
            .iter()
            .filter_map(|&id| self.text_node(id))
            .nth(n)
            .map(Text::as_str)
    }

    ////////////////////////////////////////////////////////////////////////////////////////////////

    /// Binds `prefix` (empty for the default namespace) to `uri` on `element`.
    ///
    /// The first binding creates the element's namespace map, after which the
    /// descendants resolve their prefixes through it.
    pub fn set_namespace_uri(&mut self, element: NodeId, prefix: &str, uri: &str) -> Result<()> {
        let e = self.element_mut(element)?;
        let created = e.namespaces.is_none();
        e.namespaces.get_or_insert_with(NamespaceMap::new).set(prefix, uri);
        if created {
            self.relink_namespace_maps(element);
        }
        Ok(())
    }

    /// Resolves `prefix` (empty for the default namespace) as seen from `element`.
    ///
    /// A binding to the empty URI undeclares the prefix. The `xml` prefix is
    /// always bound to [`XML_NAMESPACE`] unless redeclared.
    pub fn namespace_uri(&self, element: NodeId, prefix: &str) -> Option<&str> {
        let mut current = self.element(element);
        while let Some(e) = current {
            if let Some(uri) = e.namespaces.as_ref().and_then(|map| map.uri(prefix)) {
                return if uri.is_empty() { None } else { Some(uri) };
            }
            match e.namespace_parent {
                Some(parent) => current = self.element(parent),
                None if prefix == XML_PREFIX => return Some(XML_NAMESPACE),
                None => return None,
            }
        }
        None
    }

    /// Namespace URI of the element itself.
    #[inline]
    pub fn namespace(&self, element: NodeId) -> Option<&str> {
        let prefix = self.element(element)?.prefix();
        self.namespace_uri(element, prefix)
    }

    /// First prefix bound to `uri` in the namespace map of `element`, or when
    /// it has none, in the map of its namespace parent.
    pub fn namespace_prefix(&self, element: NodeId, uri: &str) -> Option<&str> {
        let e = self.element(element)?;
        let map = match &e.namespaces {
            Some(map) => map,
            None => self.element(e.namespace_parent?)?.namespaces.as_ref()?,
        };
        map.prefix(uri)
    }

    /// Copies into `element` every namespace binding that it or its subtree
    /// uses but that is declared on an ancestor, so that the subtree can be
    /// written on its own.
    ///
    /// The `xml` prefix is never copied.
    pub fn make_standalone(&mut self, element: NodeId) -> Result<()> {
        let own = self
            .element(element)
            .ok_or(Error::InvalidNesting)?
            .namespaces
            .clone()
            .unwrap_or_default();

        let mut missing: Vec<(&str, &str)> = Vec::new();
        for id in self.descendants(element) {
            let e = match self.element(id) {
                Some(e) => e,
                None => continue,
            };
            // unprefixed attributes are in no namespace
            let prefixes = once(e.prefix()).chain(
                e.attributes
                    .iter()
                    .map(Attribute::prefix)
                    .filter(|p| !p.is_empty()),
            );
            for prefix in prefixes {
                if prefix == XML_PREFIX
                    || own.uri(prefix).is_some()
                    || missing.iter().any(|(p, _)| *p == prefix)
                {
                    continue;
                }
                if let Some(uri) = self.namespace_uri(element, prefix) {
                    missing.push((prefix, uri));
                }
            }
        }

        let missing: Vec<(String, String)> = missing
            .into_iter()
            .map(|(p, u)| (p.to_owned(), u.to_owned()))
            .collect();
        for (prefix, uri) in missing {
            debug!("make_standalone: copying xmlns:{}={}", prefix, uri);
            self.set_namespace_uri(element, &prefix, &uri)?;
        }
        Ok(())
    }

    /// Namespace parent for a child attached under `parent`.
    fn inherited_namespace_parent(&self, parent: NodeId) -> Option<NodeId> {
        let e = self.element(parent)?;
        if e.namespaces.is_some() {
            Some(parent)
        } else {
            e.namespace_parent
        }
    }

    /// Points the descendants of `start` to their nearest ancestor with a
    /// namespace map. Subtrees below an element owning a map are unaffected.
    fn relink_namespace_maps(&mut self, start: NodeId) {
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            let namespace_parent = self.inherited_namespace_parent(id);
            let children = match self.element(id) {
                Some(e) => e.children.clone(),
                None => continue,
            };
            for child in children {
                if let NodeKind::Element(e) = &mut self.nodes[child.0].kind {
                    e.namespace_parent = namespace_parent;
                    if e.namespaces.is_none() {
                        stack.push(child);
                    }
                }
            }
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////

/// Iterator returned by [`Document::ancestors`].
pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.parent(current);
        Some(current)
    }
}

/// Iterator returned by [`Document::descendants`].
pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.stack.pop()?;
        self.stack
            .extend(self.doc.children(current).iter().rev().copied());
        Some(current)
    }
}
