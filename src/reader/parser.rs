//! Byte-driven XML state machine.
//!
//! [`Parser`] consumes input one byte at a time, across as many chunks as the
//! caller wants to split the document into, and reports structural events to a
//! [`Handler`]. It never looks ahead beyond the byte it is given, so a document
//! can be fed exactly as it arrives from a socket or a file.

use std::str::from_utf8;

use memchr::memchr3;

use crate::errors::{Error, Result};

/// Receiver of the structural events produced by a [`Parser`].
///
/// Returning an error from any method aborts the current [`Parser::feed`] call
/// with that error.
pub(crate) trait Handler {
    /// A start tag `<name` was read up to the end of its name.
    fn start_element(&mut self, name: &str) -> Result<()>;
    /// An attribute of the last started element, with its value already
    /// normalized and unescaped.
    fn attribute(&mut self, name: &str, value: &str) -> Result<()>;
    /// A closing tag `</name>` (`Some(name)`), or the end of an empty element
    /// `<name/>` (`None`).
    fn end_element(&mut self, name: Option<&str>) -> Result<()>;
    /// Character data collected since the previous tag, including the content
    /// of CDATA sections and resolved references.
    fn character_data(&mut self, data: &str) -> Result<()>;
}

////////////////////////////////////////////////////////////////////////////////////////////////////

const ANY: u8 = 1;
const WHITESPACE: u8 = 2;
const NAME: u8 = 4;
const CONTENT: u8 = 8;
const VALUE: u8 = 16;

/// Character classes of every byte value.
static CHAR_MAP: [u8; 256] = build_char_map();

const fn build_char_map() -> [u8; 256] {
    let mut map = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        map[i] = classify(i as u8);
        i += 1;
    }
    map
}

const fn classify(b: u8) -> u8 {
    match b {
        b'\t' | b'\n' | b'\r' | b' ' => ANY | WHITESPACE | CONTENT | VALUE,
        b'&' | b'<' => ANY,
        b'-' | b'.' | b'0'..=b'9' | b':' | b'A'..=b'Z' | b'_' | b'a'..=b'z' => {
            ANY | NAME | CONTENT | VALUE
        }
        0xD7 | 0xF7 => ANY | CONTENT | VALUE,
        0xC0..=0xFF => ANY | NAME | CONTENT | VALUE,
        0x21..=0xBF => ANY | CONTENT | VALUE,
        _ => 0,
    }
}

#[inline]
fn is_any_char(b: u8) -> bool {
    CHAR_MAP[b as usize] & ANY != 0
}

#[inline]
pub(crate) fn is_whitespace(b: u8) -> bool {
    CHAR_MAP[b as usize] & WHITESPACE != 0
}

#[inline]
fn is_name_char(b: u8) -> bool {
    CHAR_MAP[b as usize] & NAME != 0
}

#[inline]
fn is_entity_ref_char(b: u8) -> bool {
    is_name_char(b) || b == b'#'
}

#[inline]
fn is_value_char(b: u8) -> bool {
    CHAR_MAP[b as usize] & VALUE != 0
}

////////////////////////////////////////////////////////////////////////////////////////////////////

/// Where the parser is in the grammar.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    /// Nothing was read yet. Accepts whitespace, `<` or the first byte of a BOM.
    Init,
    /// Read `0xEF`, the first byte of a UTF-8 BOM.
    BomEf,
    /// Read `0xEF 0xBB`.
    BomBb,
    /// Skipping whitespace. What may end it depends on the [`Context`].
    Whitespace,
    /// Collecting a tag name or an attribute name.
    Name,
    /// Collecting the keyword after `<!` (`--`, `[CDATA[`, `DOCTYPE`, ...).
    NameSpecial,
    /// After `=`, waiting for the opening quote of a value.
    ValueStart,
    /// Inside a quoted attribute value.
    Value,
    /// Just read `<`.
    TagStart,
    /// Read the `/` of `<name .../>`, waiting for `>`.
    EmptyTagEnd,
    /// Collecting character data between tags.
    Content,
    /// Inside `<? ... ?>`.
    ProcessingInstruction,
    /// Read the `?` that must be followed by `>`.
    ProcessingInstructionEnd,
    /// Inside `<!-- ... -->`.
    Comment,
    /// Read one `-` inside a comment.
    CommentEnd1,
    /// Read `--` inside a comment, only `>` may follow.
    CommentEnd2,
    /// Inside `<!DOCTYPE ...`.
    Dtd,
    /// Inside the `[...]` internal subset of a document type declaration.
    DtdMarkupDecl,
    /// After the `]` of the internal subset, waiting for `>`.
    DtdMarkupDeclEnd,
    /// Inside `<![CDATA[ ... ]]>`.
    Cdata,
    /// Read `]` inside a CDATA section.
    CdataEnd1,
    /// Read `]]` inside a CDATA section.
    CdataEnd2,
    /// Inside an unknown `<!...>` declaration, skipped up to `>`.
    Special,
    /// Collecting the name of a `&name;` reference.
    EntityRef,
}

/// What the bytes being read belong to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Context {
    None,
    OpenTag,
    CloseTag,
    Attribute,
    ValueSingleQuote,
    ValueDoubleQuote,
}

/// Incremental XML tokenizer.
///
/// All accumulated data (partial names, values, text and references) survives
/// between [`feed`](Self::feed) calls, so a document may be split at any byte.
#[derive(Clone, Debug)]
pub(crate) struct Parser {
    state: State,
    context: Context,
    /// The previous byte was a `\r`, so an immediately following `\n` is dropped.
    skip_newline: bool,
    name: Vec<u8>,
    value: Vec<u8>,
    text: Vec<u8>,
    entity: Vec<u8>,
    /// Number of bytes consumed since the last reset.
    offset: usize,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    pub fn new() -> Self {
        Self {
            state: State::Init,
            context: Context::None,
            skip_newline: false,
            name: Vec::new(),
            value: Vec::new(),
            text: Vec::new(),
            entity: Vec::new(),
            offset: 0,
        }
    }

    /// Forgets everything read so far.
    pub fn reset(&mut self) {
        self.state = State::Init;
        self.context = Context::None;
        self.skip_newline = false;
        self.name.clear();
        self.value.clear();
        self.text.clear();
        self.entity.clear();
        self.offset = 0;
    }

    /// Number of bytes consumed since creation or the last [`reset`](Self::reset).
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Processes the next chunk of the document.
    ///
    /// After an error the parser is left in an unspecified state and must be
    /// [`reset`](Self::reset) before reuse.
    pub fn feed<H: Handler>(&mut self, chunk: &[u8], handler: &mut H) -> Result<()> {
        let mut i = 0;
        while i < chunk.len() {
            if self.state == State::Content && !self.skip_newline {
                let run = memchr3(b'<', b'&', b'\r', &chunk[i..]).unwrap_or(chunk.len() - i);
                if run > 0 {
                    self.text.extend_from_slice(&chunk[i..i + run]);
                    self.offset += run;
                    i += run;
                    continue;
                }
            }

            let mut c = chunk[i];
            let position = self.offset;
            i += 1;
            self.offset += 1;

            // normalize line ends
            if self.skip_newline {
                self.skip_newline = false;
                if c == b'\n' {
                    continue;
                }
            }
            if c == b'\r' {
                self.skip_newline = true;
                c = b'\n';
            }

            self.step(c, position, handler)?;
        }
        Ok(())
    }

    #[inline]
    fn set_state(&mut self, state: State) {
        trace!(
            "state transition: {:?} to {:?} [ctx={:?}]",
            self.state,
            state,
            self.context
        );
        self.state = state;
    }

    #[inline]
    fn set_state_in(&mut self, state: State, context: Context) {
        trace!(
            "state transition: {:?} [ctx={:?}] to {:?} [ctx={:?}]",
            self.state,
            self.context,
            state,
            context
        );
        self.state = state;
        self.context = context;
    }

    fn unexpected(&self, c: u8, position: usize) -> Error {
        Error::InvalidSyntax(format!(
            "unexpected byte 0x{:02X} ({:?}) at position {} in state {:?} [ctx={:?}]",
            c, c as char, position, self.state, self.context
        ))
    }

    fn flush_pending_text<H: Handler>(&mut self, handler: &mut H) -> Result<()> {
        if !self.text.is_empty() {
            handler.character_data(from_utf8(&self.text)?)?;
            self.text.clear();
        }
        Ok(())
    }

    fn emit_start<H: Handler>(&mut self, handler: &mut H) -> Result<()> {
        self.flush_pending_text(handler)?;
        handler.start_element(from_utf8(&self.name)?)?;
        self.name.clear();
        Ok(())
    }

    fn emit_end<H: Handler>(&mut self, handler: &mut H, named: bool) -> Result<()> {
        self.flush_pending_text(handler)?;
        if named {
            handler.end_element(Some(from_utf8(&self.name)?))
        } else {
            handler.end_element(None)
        }
    }

    fn step<H: Handler>(&mut self, c: u8, position: usize, handler: &mut H) -> Result<()> {
        match self.state {
            State::Init => match c {
                _ if is_whitespace(c) => self.set_state(State::Whitespace),
                b'<' => self.set_state(State::TagStart),
                0xEF => self.set_state(State::BomEf),
                _ => return Err(self.unexpected(c, position)),
            },
            State::BomEf => match c {
                0xBB => self.set_state(State::BomBb),
                _ => return Err(self.unexpected(c, position)),
            },
            State::BomBb => match c {
                0xBF => self.set_state(State::Whitespace),
                _ => return Err(self.unexpected(c, position)),
            },

            State::Whitespace => {
                if is_whitespace(c) {
                    return Ok(());
                }
                match (self.context, c) {
                    (Context::None, b'<') => self.set_state(State::TagStart),
                    (Context::Attribute, b'/') => {
                        self.set_state_in(State::EmptyTagEnd, Context::None)
                    }
                    (Context::Attribute, b'>') => self.set_state_in(State::Content, Context::None),
                    (Context::Attribute, _) if is_name_char(c) => {
                        self.name.clear();
                        self.name.push(c);
                        self.set_state(State::Name);
                    }
                    (Context::CloseTag, b'>') => {
                        self.emit_end(handler, true)?;
                        self.set_state_in(State::Content, Context::None);
                    }
                    _ => return Err(self.unexpected(c, position)),
                }
            }

            State::Name => {
                if is_name_char(c) {
                    self.name.push(c);
                    return Ok(());
                }
                match self.context {
                    Context::Attribute => {
                        if c == b'=' {
                            self.value.clear();
                            self.set_state(State::ValueStart);
                        } else if !is_whitespace(c) {
                            return Err(self.unexpected(c, position));
                        }
                    }
                    Context::OpenTag => {
                        if c == b'>' || c == b'/' || is_whitespace(c) {
                            self.emit_start(handler)?;
                            match c {
                                b'>' => self.set_state_in(State::Content, Context::None),
                                b'/' => self.set_state(State::EmptyTagEnd),
                                _ => self.set_state_in(State::Whitespace, Context::Attribute),
                            }
                        } else {
                            return Err(self.unexpected(c, position));
                        }
                    }
                    Context::CloseTag => {
                        if c == b'>' {
                            self.emit_end(handler, true)?;
                            self.set_state_in(State::Content, Context::None);
                        } else if is_whitespace(c) {
                            self.set_state(State::Whitespace);
                        } else {
                            return Err(self.unexpected(c, position));
                        }
                    }
                    _ => return Err(self.unexpected(c, position)),
                }
            }

            State::NameSpecial => {
                if is_name_char(c) || c == b'[' {
                    self.name.push(c);
                    if self.name == b"--" {
                        self.name.clear();
                        self.set_state_in(State::Comment, Context::None);
                    } else if self.name == b"[CDATA[" {
                        self.name.clear();
                        self.set_state_in(State::Cdata, Context::None);
                    }
                } else if is_whitespace(c) {
                    if self.name == b"DOCTYPE" {
                        self.set_state_in(State::Dtd, Context::None);
                    } else {
                        self.set_state_in(State::Special, Context::None);
                    }
                    self.name.clear();
                } else {
                    return Err(self.unexpected(c, position));
                }
            }

            State::ValueStart => match c {
                _ if is_whitespace(c) => {}
                b'"' => {
                    self.value.clear();
                    self.set_state_in(State::Value, Context::ValueDoubleQuote);
                }
                b'\'' => {
                    self.value.clear();
                    self.set_state_in(State::Value, Context::ValueSingleQuote);
                }
                _ => return Err(self.unexpected(c, position)),
            },

            State::Value => match (self.context, c) {
                (Context::ValueDoubleQuote, b'"') | (Context::ValueSingleQuote, b'\'') => {
                    handler.attribute(from_utf8(&self.name)?, from_utf8(&self.value)?)?;
                    self.set_state_in(State::Whitespace, Context::Attribute);
                }
                (_, b'&') => {
                    self.entity.clear();
                    self.set_state(State::EntityRef);
                }
                _ if is_whitespace(c) => self.value.push(b' '),
                _ if is_value_char(c) => self.value.push(c),
                _ => return Err(self.unexpected(c, position)),
            },

            State::TagStart => {
                self.name.clear();
                match c {
                    b'!' => self.set_state_in(State::NameSpecial, Context::None),
                    b'?' => self.set_state_in(State::ProcessingInstruction, Context::None),
                    b'/' => self.set_state_in(State::Name, Context::CloseTag),
                    _ if is_name_char(c) => {
                        self.name.push(c);
                        self.set_state_in(State::Name, Context::OpenTag);
                    }
                    _ => return Err(self.unexpected(c, position)),
                }
            }

            State::EmptyTagEnd => match c {
                b'>' => {
                    self.emit_end(handler, false)?;
                    self.set_state_in(State::Content, Context::None);
                }
                _ => return Err(self.unexpected(c, position)),
            },

            State::EntityRef => {
                let in_value = match self.context {
                    Context::ValueSingleQuote | Context::ValueDoubleQuote => true,
                    Context::None => false,
                    _ => return Err(self.unexpected(c, position)),
                };
                if c == b';' {
                    if in_value {
                        resolve_entity(&self.entity, &mut self.value)?;
                        self.set_state(State::Value);
                    } else {
                        resolve_entity(&self.entity, &mut self.text)?;
                        self.set_state(State::Content);
                    }
                } else if is_entity_ref_char(c) {
                    self.entity.push(c);
                } else {
                    return Err(self.unexpected(c, position));
                }
            }

            State::Comment => {
                if c == b'-' {
                    self.set_state(State::CommentEnd1);
                } else if !is_any_char(c) {
                    return Err(self.unexpected(c, position));
                }
            }
            State::CommentEnd1 => {
                if c == b'-' {
                    self.set_state(State::CommentEnd2);
                } else if is_any_char(c) {
                    self.set_state(State::Comment);
                } else {
                    return Err(self.unexpected(c, position));
                }
            }
            State::CommentEnd2 => match c {
                b'>' => self.set_state_in(State::Content, Context::None),
                _ => return Err(self.unexpected(c, position)),
            },

            State::Content => match c {
                b'<' => self.set_state_in(State::TagStart, Context::None),
                b'&' => {
                    self.entity.clear();
                    self.set_state(State::EntityRef);
                }
                _ => self.text.push(c),
            },

            State::ProcessingInstruction => {
                if c == b'?' {
                    self.set_state(State::ProcessingInstructionEnd);
                }
            }
            State::ProcessingInstructionEnd => match c {
                b'>' => self.set_state_in(State::Whitespace, Context::None),
                _ => return Err(self.unexpected(c, position)),
            },

            State::Dtd => match c {
                _ if is_whitespace(c) => {}
                b'[' => self.set_state(State::DtdMarkupDecl),
                b'>' => self.set_state_in(State::Whitespace, Context::None),
                _ => {}
            },
            State::DtdMarkupDecl => {
                if c == b']' {
                    self.set_state(State::DtdMarkupDeclEnd);
                }
            }
            State::DtdMarkupDeclEnd => match c {
                b'>' => self.set_state_in(State::Whitespace, Context::None),
                _ if is_whitespace(c) => {}
                _ => return Err(self.unexpected(c, position)),
            },

            State::Cdata => match c {
                b']' => self.set_state(State::CdataEnd1),
                _ => self.text.push(c),
            },
            State::CdataEnd1 => match c {
                b']' => self.set_state(State::CdataEnd2),
                _ => {
                    self.text.push(b']');
                    self.text.push(c);
                    self.set_state(State::Cdata);
                }
            },
            State::CdataEnd2 => match c {
                b'>' => self.set_state_in(State::Content, Context::None),
                // `]]]>`: the first bracket is content, the last two may still end the section
                b']' => self.text.push(b']'),
                _ => {
                    self.text.extend_from_slice(b"]]");
                    self.text.push(c);
                    self.set_state(State::Cdata);
                }
            },

            State::Special => {
                if c == b'>' {
                    self.set_state_in(State::Whitespace, Context::None);
                }
            }
        }
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////

/// Appends the replacement text of the reference `&entity;` to `destination`.
///
/// The five predefined entities and decimal (`#65`) or hexadecimal (`#x41`)
/// character references are resolved. Any other name is kept verbatim as
/// `&name;`. A malformed character reference is kept verbatim too, but the
/// call then fails with [`Error::InvalidSyntax`].
pub(crate) fn resolve_entity(entity: &[u8], destination: &mut Vec<u8>) -> Result<()> {
    match entity {
        b"lt" => destination.push(b'<'),
        b"gt" => destination.push(b'>'),
        b"amp" => destination.push(b'&'),
        b"quot" => destination.push(b'"'),
        b"apos" => destination.push(b'\''),
        [b'#', reference @ ..] => {
            let (digits, radix) = match reference {
                [b'x', hex @ ..] => (hex, 16),
                _ => (reference, 10),
            };
            match parse_code_point(digits, radix) {
                Some(ch) => push_code_point(destination, ch),
                None => {
                    push_verbatim(entity, destination);
                    return Err(Error::InvalidSyntax(format!(
                        "invalid character reference `&{};`",
                        String::from_utf8_lossy(entity)
                    )));
                }
            }
        }
        _ => push_verbatim(entity, destination),
    }
    Ok(())
}

fn parse_code_point(digits: &[u8], radix: u32) -> Option<char> {
    if digits.is_empty() {
        return None;
    }
    let mut code: u32 = 0;
    for &d in digits {
        let digit = (d as char).to_digit(radix)?;
        code = code.checked_mul(radix)?.checked_add(digit)?;
    }
    std::char::from_u32(code)
}

/// Appends the UTF-8 encoding of `ch`, 1 to 4 bytes.
#[inline]
fn push_code_point(destination: &mut Vec<u8>, ch: char) {
    let mut buf = [0u8; 4];
    destination.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
}

#[inline]
fn push_verbatim(entity: &[u8], destination: &mut Vec<u8>) {
    destination.push(b'&');
    destination.extend_from_slice(entity);
    destination.push(b';');
}
