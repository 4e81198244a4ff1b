//! Manage xml character escapes for the writers

use std::borrow::Cow;

/// Escapes character data so that it can be written between tags.
///
/// `&`, `<` and `>` are replaced by entity references and a carriage return by
/// a character reference, so that a reader does not normalize it into a line
/// feed. Quotes, tabs and line feeds are kept.
///
/// ```
/// # use pretty_assertions::assert_eq;
/// use xml_arbor::escape::escape_text;
///
/// assert_eq!(escape_text("a < b & \"c\""), "a &lt; b &amp; \"c\"");
/// assert_eq!(escape_text("line\r\n"), "line&#xD;\n");
/// ```
pub fn escape_text(raw: &str) -> Cow<str> {
    _escape(raw, |ch| matches!(ch, b'&' | b'<' | b'>' | b'\r'))
}

/// Escapes an attribute value so that it can be written between double quotes.
///
/// Unlike [`escape_text`], `>` is kept and `"` is escaped. Tabs and line feeds
/// become character references as well, since a reader folds any whitespace
/// inside an attribute value into a single space.
///
/// ```
/// # use pretty_assertions::assert_eq;
/// use xml_arbor::escape::escape_attribute;
///
/// assert_eq!(escape_attribute("b&w"), "b&amp;w");
/// assert_eq!(escape_attribute("\t\"x\">\n"), "&#x9;&quot;x&quot;>&#xA;");
/// ```
pub fn escape_attribute(raw: &str) -> Cow<str> {
    _escape(raw, |ch| {
        matches!(ch, b'&' | b'<' | b'"' | b'\r' | b'\n' | b'\t')
    })
}

fn _escape<F: Fn(u8) -> bool>(raw: &str, escape_chars: F) -> Cow<str> {
    let bytes = raw.as_bytes();
    let mut escaped: Option<String> = None;
    let mut pos = 0;
    while let Some(i) = bytes[pos..].iter().position(|&b| escape_chars(b)) {
        let escaped = escaped.get_or_insert_with(|| String::with_capacity(raw.len() + 8));
        let new_pos = pos + i;
        // all escaped bytes are ASCII, so `new_pos` is a char boundary
        escaped.push_str(&raw[pos..new_pos]);
        match bytes[new_pos] {
            b'<' => escaped.push_str("&lt;"),
            b'>' => escaped.push_str("&gt;"),
            b'&' => escaped.push_str("&amp;"),
            b'"' => escaped.push_str("&quot;"),
            b => push_char_reference(escaped, b),
        }
        pos = new_pos + 1;
    }

    match escaped {
        Some(mut escaped) => {
            escaped.push_str(&raw[pos..]);
            Cow::Owned(escaped)
        }
        None => Cow::Borrowed(raw),
    }
}

/// Writes `&#xH;` with uppercase hex digits and no leading zero.
fn push_char_reference(out: &mut String, b: u8) {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    out.push_str("&#x");
    if b >> 4 != 0 {
        out.push(HEX[(b >> 4) as usize] as char);
    }
    out.push(HEX[(b & 0xF) as usize] as char);
    out.push(';');
}
