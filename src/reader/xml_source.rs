//! Module for the [`XmlSource`] trait.

use std::io::{self, BufRead};

use crate::{Error, Result};

/// Represents an input from which a reader pulls bytes in bounded chunks.
///
/// The chunks are handed over to the parser as they come, so the input never
/// has to be held in memory as a whole.
pub(super) trait XmlSource {
    /// Reads at most `limit` bytes into `buf`, replacing its previous content.
    ///
    /// Returns the number of bytes read, `0` meaning that the input is
    /// exhausted (or that `limit` is `0`).
    ///
    /// # Example
    ///
    /// ```ignore
    /// let mut position = 0;
    /// let mut input = b"abc*def".as_ref();
    /// let mut buf = Vec::new();
    ///
    /// assert_eq!(input.read_chunk(&mut buf, 4, &mut position).unwrap(), 4);
    /// assert_eq!(buf, b"abc*");
    /// assert_eq!(position, 4);
    /// ```
    ///
    /// # Parameters
    /// - `buf`: Buffer receiving the chunk
    /// - `limit`: Maximum number of bytes to read
    /// - `position`: Will be increased by amount of bytes consumed
    fn read_chunk(&mut self, buf: &mut Vec<u8>, limit: usize, position: &mut usize)
        -> Result<usize>;
}

/// Implementation of `XmlSource` for any `BufRead` reader, which copies the
/// bytes it has already buffered.
impl<R: BufRead> XmlSource for R {
    fn read_chunk(
        &mut self,
        buf: &mut Vec<u8>,
        limit: usize,
        position: &mut usize,
    ) -> Result<usize> {
        buf.clear();
        if limit == 0 {
            return Ok(0);
        }
        let used = loop {
            match self.fill_buf() {
                Ok(available) => {
                    let used = available.len().min(limit);
                    buf.extend_from_slice(&available[..used]);
                    break used;
                }
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::Io(e)),
            }
        };
        self.consume(used);
        *position += used;
        Ok(used)
    }
}
