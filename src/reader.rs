//! A module to handle `Reader`

#[cfg(feature = "async")]
mod azync;
mod builder;
pub(crate) mod parser;
mod tree_builder;
mod xml_source;

use std::io::{BufRead, BufReader};
use std::{fs::File, path::Path};

#[cfg(feature = "async")]
use tokio::io::AsyncBufRead;

use crate::errors::{Error, Result};
use crate::tree::Document;

#[cfg(feature = "async")]
use self::azync::AsyncXmlSource;
use self::parser::Parser;
use self::tree_builder::TreeBuilder;
use self::xml_source::XmlSource;

pub use self::builder::ReaderBuilder;

/// Maximum number of bytes pulled from a byte source at once.
const CHUNK_SIZE: usize = 1024;

/// A streaming XML reader building a [`Document`].
///
/// The whole document can be parsed at once from memory ([`parse`]), from a
/// [`BufRead`] ([`read_document`]) or, with the `async` feature, from a tokio
/// [`AsyncBufRead`](tokio::io::AsyncBufRead). It can also be fed chunk by chunk
/// as the bytes arrive ([`feed`]), in which case the document is returned by
/// the call during which its root element was closed.
///
/// The reader keeps nothing but its buffers between two documents, so one
/// instance can be reused for any number of them.
///
/// # Examples
///
/// ```
/// # use pretty_assertions::assert_eq;
/// use xml_arbor::{tree::NamespaceMatch, Reader};
///
/// let xml = r#"<tag1 att1="test" xmlns:n="urn:n">
///                 <tag2><!--Test comment-->Test</tag2>
///                 <n:tag2>Test 2</n:tag2>
///             </tag1>"#;
/// let mut reader = Reader::new();
/// let doc = reader.parse_str(xml).unwrap();
///
/// let root = doc.root().unwrap();
/// assert_eq!(doc.attribute(root, "att1", NamespaceMatch::Unqualified), Some("test"));
///
/// let plain = doc.child(root, "tag2", NamespaceMatch::Unqualified, 0).unwrap();
/// let qualified = doc.child(root, "tag2", NamespaceMatch::Uri("urn:n"), 0).unwrap();
/// assert_eq!(doc.text(plain, 0), Some("Test"));
/// assert_eq!(doc.text(qualified, 0), Some("Test 2"));
/// ```
///
/// [`parse`]: Self::parse
/// [`read_document`]: Self::read_document
/// [`feed`]: Self::feed
#[derive(Debug)]
pub struct Reader {
    pub(crate) parser: Parser,
    pub(crate) builder: TreeBuilder,
}

impl Default for Reader {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder methods
impl Reader {
    /// Create a new builder for configuring this reader.
    pub fn builder() -> ReaderBuilder {
        ReaderBuilder::new()
    }

    /// Creates a reader with the default configuration.
    pub fn new() -> Self {
        ReaderBuilder::new().build()
    }
}

/// Getters
impl Reader {
    /// Gets the number of bytes handed to the parser since the last reset.
    ///
    /// After a syntax error this is the position just after the offending
    /// byte. Useful when debugging errors.
    pub fn buffer_position(&self) -> usize {
        self.parser.offset()
    }

    /// Forgets the partially read document and any pending parsing state.
    ///
    /// Required before reusing a reader whose [`feed`](Self::feed) failed.
    pub fn reset(&mut self) {
        self.parser.reset();
        self.builder.reset();
    }
}

/// Read methods
impl Reader {
    /// Parses a complete document.
    ///
    /// Any state left by previous calls is discarded first. Fails with
    /// [`Error::NoRoot`] if the input ends before a root element was closed.
    pub fn parse(&mut self, xml: &[u8]) -> Result<Document> {
        self.reset();
        let result = self.parser.feed(xml, &mut self.builder);
        self.finish(result)
    }

    /// Parses a complete document from a string slice.
    #[inline]
    pub fn parse_str(&mut self, xml: &str) -> Result<Document> {
        self.parse(xml.as_bytes())
    }

    /// Parses the next chunk of a document without resetting the reader.
    ///
    /// Returns the document once a chunk closes its root element, `None`
    /// before. After an error, call [`reset`](Self::reset) before feeding
    /// another document.
    ///
    /// ```
    /// # use pretty_assertions::assert_eq;
    /// use xml_arbor::Reader;
    ///
    /// let mut reader = Reader::new();
    /// assert!(reader.feed(b"<greeting>hel").unwrap().is_none());
    /// assert!(reader.feed(b"lo</greet").unwrap().is_none());
    ///
    /// let doc = reader.feed(b"ing>").unwrap().unwrap();
    /// assert_eq!(doc.text(doc.root().unwrap(), 0), Some("hello"));
    /// ```
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Option<Document>> {
        self.parser.feed(chunk, &mut self.builder)?;
        Ok(self.builder.take_document())
    }

    /// Reads a complete document from a buffered reader.
    ///
    /// The input is consumed in chunks of at most 1024 bytes until it is
    /// exhausted, then the document is checked like in [`parse`](Self::parse).
    #[inline]
    pub fn read_document<R: BufRead>(&mut self, reader: R) -> Result<Document> {
        self.read_document_impl(reader, None)
    }

    /// Reads a complete document, consuming at most `max_bytes` from `reader`.
    ///
    /// Content past the limit is not read at all, so a document longer than
    /// that fails with [`Error::NoRoot`].
    #[inline]
    pub fn read_document_limited<R: BufRead>(
        &mut self,
        reader: R,
        max_bytes: usize,
    ) -> Result<Document> {
        self.read_document_impl(reader, Some(max_bytes))
    }

    /// Reads a complete document from a file.
    pub fn read_file<P: AsRef<Path>>(&mut self, path: P) -> Result<Document> {
        let file = File::open(path).map_err(Error::Io)?;
        self.read_document(BufReader::new(file))
    }

    /// Feeds everything `reader` yields (up to `max_bytes` if given) without
    /// resetting the reader, like repeated calls to [`feed`](Self::feed).
    pub fn feed_reader<R: BufRead>(
        &mut self,
        mut reader: R,
        max_bytes: Option<usize>,
    ) -> Result<Option<Document>> {
        self.pump(&mut reader, max_bytes)?;
        Ok(self.builder.take_document())
    }

    fn read_document_impl<R: BufRead>(
        &mut self,
        mut reader: R,
        max_bytes: Option<usize>,
    ) -> Result<Document> {
        self.reset();
        let result = self.pump(&mut reader, max_bytes);
        self.finish(result)
    }

    fn pump<R: BufRead>(&mut self, reader: &mut R, max_bytes: Option<usize>) -> Result<()> {
        let mut buf = Vec::with_capacity(CHUNK_SIZE);
        let mut remaining = max_bytes.unwrap_or(usize::MAX);
        let mut position = 0;
        loop {
            let limit = remaining.min(CHUNK_SIZE);
            let read = XmlSource::read_chunk(reader, &mut buf, limit, &mut position)?;
            if read == 0 {
                debug!("end of input after {} bytes", position);
                return Ok(());
            }
            remaining -= read;
            self.parser.feed(&buf, &mut self.builder)?;
        }
    }

    /// Turns the outcome of a whole-document parse into the document, dropping
    /// the partial tree on failure.
    fn finish(&mut self, result: Result<()>) -> Result<Document> {
        let builder = &mut self.builder;
        match result.and_then(|_| builder.take_document().ok_or(Error::NoRoot)) {
            Ok(doc) => Ok(doc),
            Err(e) => {
                debug!("parse failed at byte {}: {}", self.parser.offset(), e);
                self.builder.reset();
                Err(e)
            }
        }
    }
}

#[cfg(feature = "async")]
/// Async read methods
impl Reader {
    /// Reads a complete document from an async buffered reader.
    ///
    /// Async equivalent of [`read_document`](Self::read_document).
    ///
    /// ```
    /// # use pretty_assertions::assert_eq;
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// use xml_arbor::Reader;
    ///
    /// let mut reader = Reader::new();
    /// let doc = reader.read_document_async(b"<a>b</a>".as_ref()).await.unwrap();
    /// assert_eq!(doc.text(doc.root().unwrap(), 0), Some("b"));
    /// # }
    /// ```
    #[inline]
    pub async fn read_document_async<R: AsyncBufRead + Unpin + Send>(
        &mut self,
        reader: R,
    ) -> Result<Document> {
        self.read_document_impl_async(reader, None).await
    }

    /// Reads a complete document, consuming at most `max_bytes` from `reader`.
    ///
    /// Async equivalent of [`read_document_limited`](Self::read_document_limited).
    #[inline]
    pub async fn read_document_limited_async<R: AsyncBufRead + Unpin + Send>(
        &mut self,
        reader: R,
        max_bytes: usize,
    ) -> Result<Document> {
        self.read_document_impl_async(reader, Some(max_bytes)).await
    }

    async fn read_document_impl_async<R: AsyncBufRead + Unpin + Send>(
        &mut self,
        mut reader: R,
        max_bytes: Option<usize>,
    ) -> Result<Document> {
        self.reset();
        let result = self.pump_async(&mut reader, max_bytes).await;
        self.finish(result)
    }

    async fn pump_async<R: AsyncBufRead + Unpin + Send>(
        &mut self,
        reader: &mut R,
        max_bytes: Option<usize>,
    ) -> Result<()> {
        let mut buf = Vec::with_capacity(CHUNK_SIZE);
        let mut remaining = max_bytes.unwrap_or(usize::MAX);
        let mut position = 0;
        loop {
            let limit = remaining.min(CHUNK_SIZE);
            let read = AsyncXmlSource::read_chunk(reader, &mut buf, limit, &mut position).await?;
            if read == 0 {
                debug!("end of input after {} bytes", position);
                return Ok(());
            }
            remaining -= read;
            self.parser.feed(&buf, &mut self.builder)?;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    #[test]
    fn parse_simple_document() {
        let mut reader = Reader::new();
        let doc = reader.parse_str("<a x='1'><b/>text</a>").unwrap();
        let a = doc.root().unwrap();
        assert_eq!(doc.element(a).unwrap().tag(), "a");
        assert_eq!(doc.children(a).len(), 2);
        assert_eq!(reader.buffer_position(), 21);
    }

    #[test]
    fn no_root() {
        let mut reader = Reader::new();
        assert!(matches!(reader.parse(b""), Err(Error::NoRoot)));
        assert!(matches!(reader.parse(b"  "), Err(Error::NoRoot)));
        assert!(matches!(reader.parse(b"<a><b></b>"), Err(Error::NoRoot)));
    }

    #[test]
    fn multiple_roots() {
        let mut reader = Reader::new();
        assert!(matches!(
            reader.parse_str("<top1></top1><top2></top2>"),
            Err(Error::MultipleRoots)
        ));
        // the failed parse leaves nothing behind
        assert!(reader.parse_str("<top/>").is_ok());
    }

    #[test]
    fn text_outside_root() {
        let mut reader = Reader::new();
        assert!(matches!(
            reader.parse_str("<a/>oops<b/>"),
            Err(Error::InvalidNesting)
        ));
        assert!(reader.parse_str("<a/>\r\n  ").is_ok());
    }

    #[test]
    fn syntax_error_position() {
        let mut reader = Reader::new();
        match reader.parse_str("<a><=/a>") {
            Err(Error::InvalidSyntax(_)) => assert_eq!(reader.buffer_position(), 5),
            x => panic!("Expected InvalidSyntax, got {:?}", x),
        }
    }

    #[test]
    fn feed_byte_by_byte() {
        let xml = b"\xEF\xBB\xBF<?xml version='1.0'?><r a=\"&lt;&#x41;\"><![CDATA[x]]>&amp;y</r>";
        let mut reader = Reader::new();
        let mut doc = None;
        for (i, b) in xml.iter().enumerate() {
            let result = reader.feed(&[*b]).unwrap();
            if i + 1 < xml.len() {
                assert!(result.is_none());
            } else {
                doc = result;
            }
        }
        let doc = doc.unwrap();
        let r = doc.root().unwrap();
        assert_eq!(doc.element(r).unwrap().attributes()[0].value(), "<A");
        assert_eq!(doc.text(r, 0), Some("x&y"));
    }

    #[test]
    fn feed_after_error_needs_reset() {
        let mut reader = Reader::new();
        assert!(reader.feed(b"<a></b>").is_err());
        reader.reset();
        assert!(reader.feed(b"<b></b>").unwrap().is_some());
        // a second document can follow once the first was handed out
        assert!(reader.feed(b"<c/>").unwrap().is_some());
    }

    #[test]
    fn read_document_in_chunks() {
        let mut xml = String::from("<list>");
        for i in 0..500 {
            xml.push_str(&format!("<item n='{}'>value {}</item>", i, i));
        }
        xml.push_str("</list>");

        let mut reader = Reader::new();
        let doc = reader.read_document(Cursor::new(xml.as_bytes())).unwrap();
        let list = doc.root().unwrap();
        assert_eq!(doc.children(list).len(), 500);
        assert_eq!(reader.buffer_position(), xml.len());
    }

    #[test]
    fn read_document_limited() {
        let xml = "<a>0123456789</a>";
        let mut reader = Reader::new();
        assert!(matches!(
            reader.read_document_limited(xml.as_bytes(), 10),
            Err(Error::NoRoot)
        ));
        assert_eq!(reader.buffer_position(), 10);

        assert!(reader.read_document_limited(xml.as_bytes(), 100).is_ok());
        assert_eq!(reader.buffer_position(), xml.len());
    }

    #[test]
    fn feed_reader_continues() {
        let mut reader = Reader::new();
        let mut input = b"<a>12</a>".as_ref();
        assert!(reader.feed_reader(&mut input, Some(5)).unwrap().is_none());
        assert_eq!(input, b"</a>");
        let doc = reader.feed_reader(&mut input, None).unwrap().unwrap();
        assert_eq!(doc.text(doc.root().unwrap(), 0), Some("12"));
    }
}
