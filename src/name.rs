//! Module for handling qualified names and namespace bindings as described by the
//! [Namespaces in XML] recommendation.
//!
//! [Namespaces in XML]: https://www.w3.org/TR/xml-names11/

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// URI permanently bound to the `xml` prefix. It never needs to be declared.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// The reserved prefix implicitly bound to [`XML_NAMESPACE`].
pub(crate) const XML_PREFIX: &str = "xml";

/// Splits a qualified name into `(prefix, local_name)` at the first `:`.
///
/// The prefix is empty when the name contains no colon. This is how start
/// tags and attribute names are interpreted.
///
/// ```
/// # use pretty_assertions::assert_eq;
/// use xml_arbor::name::split_qname;
///
/// assert_eq!(split_qname("soap:Envelope"), ("soap", "Envelope"));
/// assert_eq!(split_qname("a:b:c"), ("a", "b:c"));
/// assert_eq!(split_qname("plain"), ("", "plain"));
/// ```
#[inline]
pub fn split_qname(name: &str) -> (&str, &str) {
    match memchr::memchr(b':', name.as_bytes()) {
        Some(i) => (&name[..i], &name[i + 1..]),
        None => ("", name),
    }
}

/// Splits a qualified name at the last `:`. Closing tags are compared this way.
#[inline]
pub(crate) fn split_qname_last(name: &str) -> (&str, &str) {
    match memchr::memrchr(b':', name.as_bytes()) {
        Some(i) => (&name[..i], &name[i + 1..]),
        None => ("", name),
    }
}

/// If `name` is a namespace declaration (`xmlns` or `xmlns:prefix`), returns the
/// declared prefix (empty for the default namespace).
#[inline]
pub(crate) fn declared_prefix(name: &str) -> Option<&str> {
    let rest = name.strip_prefix("xmlns")?;
    if rest.is_empty() {
        Some("")
    } else {
        rest.strip_prefix(':')
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////

/// An ordered set of `prefix -> uri` bindings declared on one element.
///
/// Insertion order is kept, which is the order in which a plain writer emits the
/// `xmlns` attributes. A prefix appears at most once: binding it again replaces
/// the URI in place. The empty prefix stands for the default namespace, and an
/// empty URI undeclares it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct NamespaceMap {
    entries: Vec<(String, String)>,
}

impl NamespaceMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `prefix` to `uri`, replacing a previous binding of the same prefix.
    pub fn set(&mut self, prefix: &str, uri: &str) {
        match self.entries.iter_mut().find(|(p, _)| p == prefix) {
            Some((_, u)) => {
                u.clear();
                u.push_str(uri);
            }
            None => self.entries.push((prefix.to_owned(), uri.to_owned())),
        }
    }

    /// Returns the URI bound to `prefix` in this map only.
    pub fn uri(&self, prefix: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(p, _)| p == prefix)
            .map(|(_, u)| u.as_str())
    }

    /// Returns the first prefix bound to `uri` in this map only.
    pub fn prefix(&self, uri: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, u)| u == uri)
            .map(|(p, _)| p.as_str())
    }

    /// Iterates over `(prefix, uri)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(p, u)| (p.as_str(), u.as_str()))
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
