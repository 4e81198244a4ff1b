//! Error management module

use std::str::Utf8Error;

/// The error type used by this crate.
#[derive(Debug)]
pub enum Error {
    /// IO error, either from the byte source of a reader or from the sink of a writer
    Io(::std::io::Error),
    /// Input decoding error. Names, values and text must be valid UTF-8
    NonDecodable(Option<Utf8Error>),
    /// The byte stream violates the XML grammar at the current parsing state
    InvalidSyntax(String),
    /// Character data appeared outside of the root element, or a node was
    /// attached where it cannot live
    InvalidNesting,
    /// A closing tag does not match the currently open element
    TagMismatch {
        /// Qualified name of the currently open element
        expected: String,
        /// Qualified name found in the closing tag
        found: String,
    },
    /// A second top-level element was found
    MultipleRoots,
    /// The input ended before any element was closed at the top level
    NoRoot,
    /// A writer was driven in an order that cannot produce well-formed output
    InvalidState(String),
}

impl From<::std::io::Error> for Error {
    /// Creates a new `Error::Io` from the given error
    #[inline]
    fn from(error: ::std::io::Error) -> Error {
        Error::Io(error)
    }
}

impl From<Utf8Error> for Error {
    /// Creates a new `Error::NonDecodable` from the given error
    #[inline]
    fn from(error: Utf8Error) -> Error {
        Error::NonDecodable(Some(error))
    }
}

/// A specialized `Result` type where the error is hard-wired to [`Error`].
///
/// [`Error`]: enum.Error.html
pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::NonDecodable(None) => write!(f, "Malformed input, decoding impossible"),
            Error::NonDecodable(Some(e)) => write!(f, "Malformed UTF-8 input: {}", e),
            Error::InvalidSyntax(e) => write!(f, "Invalid syntax: {}", e),
            Error::InvalidNesting => write!(f, "Character data or node outside of an element"),
            Error::TagMismatch { expected, found } if expected.is_empty() => {
                write!(f, "Unexpected closing tag </{}>, no element is open", found)
            }
            Error::TagMismatch { expected, found } => {
                write!(f, "Expecting </{}> found </{}>", expected, found)
            }
            Error::MultipleRoots => write!(f, "Document has more than one root element"),
            Error::NoRoot => write!(f, "Document has no root element"),
            Error::InvalidState(e) => write!(f, "Invalid writer state: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::NonDecodable(Some(e)) => Some(e),
            _ => None,
        }
    }
}
