//! Incremental XML reader building a namespace-aware tree, with plain and
//! canonical writers.
//!
//! # Description
//!
//! xml-arbor turns a byte stream into a [`Document`] and a [`Document`] back
//! into bytes:
//!
//! - [`Reader`]: a byte-driven parser. A document can be given whole, pulled
//!   from a [`BufRead`](std::io::BufRead) or fed in chunks of any size as it
//!   arrives, the state machine never looks ahead.
//! - [`Document`]: an arena of elements and text nodes. Every element resolves
//!   namespace prefixes through the nearest ancestor that declares some.
//! - [`Writer`]: writes a subtree back the way it was read, optionally
//!   indented.
//! - [`CanonicalWriter`]: writes a subtree in a deterministic form, suitable
//!   for comparing or signing documents.
//!
//! xml-arbor contains optional support for reading from asynchronous byte
//! sources using [tokio]. It is enabled by the default [`async`](#async)
//! feature. The tree can be serialized with [Serde] when the
//! [`serialize`](#serialize) feature is enabled.
//!
//! # Examples
//!
//! ```
//! # use pretty_assertions::assert_eq;
//! use xml_arbor::{tree::NamespaceMatch, CanonicalWriter, Reader};
//!
//! let xml = r#"<catalog xmlns="urn:books" xmlns:x="urn:ext">
//!     <book id="b1" x:rating="5">Rust &amp; XML</book>
//! </catalog>"#;
//!
//! let mut doc = Reader::new().parse_str(xml).unwrap();
//! let catalog = doc.root().unwrap();
//! let book = doc.child(catalog, "book", NamespaceMatch::Uri("urn:books"), 0).unwrap();
//! assert_eq!(doc.attribute(book, "rating", NamespaceMatch::Uri("urn:ext")), Some("5"));
//! assert_eq!(doc.text(book, 0), Some("Rust & XML"));
//!
//! doc.make_standalone(book).unwrap();
//! let mut writer = CanonicalWriter::new(Vec::new());
//! writer.serialize(&doc, book).unwrap();
//! assert_eq!(
//!     writer.into_inner(),
//!     br#"<book xmlns="urn:books" xmlns:x="urn:ext" id="b1" x:rating="5">Rust &amp; XML</book>"#.as_ref()
//! );
//! ```
//!
//! # Features
//!
//! `xml-arbor` supports the following features:
//!
//! [tokio]: https://tokio.rs/
//! [Serde]: https://serde.rs/
#![cfg_attr(
    feature = "document-features",
    cfg_attr(doc, doc = ::document_features::document_features!())
)]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

#[macro_use]
extern crate log;

pub mod errors;
pub mod escape;
pub mod name;
pub mod reader;
pub mod tree;
pub mod writer;

// reexports
pub use crate::errors::{Error, Result};
pub use crate::reader::{Reader, ReaderBuilder};
pub use crate::tree::{Document, NodeId};
pub use crate::writer::{CanonicalWriter, Serializer, Writer};
