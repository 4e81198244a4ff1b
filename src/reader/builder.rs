use super::parser::Parser;
use super::tree_builder::TreeBuilder;
use super::Reader;

/// Builder for configuring a new [`Reader`].
///
/// ```
/// # use pretty_assertions::assert_eq;
/// use xml_arbor::Reader;
///
/// let mut reader = Reader::builder().keep_whitespace(true).build();
/// let doc = reader.parse_str("<a> </a>").unwrap();
/// assert_eq!(doc.text(doc.root().unwrap(), 0), Some(" "));
/// ```
#[derive(Clone, Debug)]
pub struct ReaderBuilder {
    keep_whitespace: bool,
}

impl Default for ReaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReaderBuilder {
    /// Create a new default [`ReaderBuilder`].
    pub fn new() -> Self {
        Self {
            keep_whitespace: false,
        }
    }

    /// Changes whether text made only of whitespace is kept in the tree.
    ///
    /// When set to `false`, the whitespace between two tags is dropped unless
    /// it is part of a text that also contains other characters. When set to
    /// `true`, every piece of text inside the root element becomes a text node.
    ///
    /// Whitespace outside of the root element is never kept.
    ///
    /// (`false` by default)
    pub fn keep_whitespace(mut self, val: bool) -> Self {
        self.keep_whitespace = val;
        self
    }

    /// Builds a new [`Reader`] from this configuration.
    pub fn build(self) -> Reader {
        Reader {
            parser: Parser::new(),
            builder: TreeBuilder::new(self.keep_whitespace),
        }
    }
}
