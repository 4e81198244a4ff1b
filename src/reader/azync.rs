//! Module for async-specific reader code.

use std::{future::Future, io, pin::Pin};

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::{Error, Result};

/// Represents an async input from which a reader pulls bytes in bounded chunks.
///
/// Async equivalent of [`XmlSource`](super::xml_source::XmlSource)
pub(super) trait AsyncXmlSource {
    /// Reads at most `limit` bytes into `buf`, replacing its previous content.
    ///
    /// Equivalent to:
    /// ```ignore
    /// async fn read_chunk(&mut self, buf: &mut Vec<u8>, limit: usize, position: &mut usize) -> Result<usize>;
    /// ```
    ///
    /// See also [`XmlSource::read_chunk`](super::xml_source::XmlSource::read_chunk).
    fn read_chunk<'_self, 'buf, 'pos, 'func>(
        &'_self mut self,
        buf: &'buf mut Vec<u8>,
        limit: usize,
        position: &'pos mut usize,
    ) -> Pin<Box<dyn Future<Output = Result<usize>> + Send + 'func>>
    where
        '_self: 'func,
        'buf: 'func,
        'pos: 'func;
}

impl<R: AsyncBufRead + Unpin + Send> AsyncXmlSource for R {
    fn read_chunk<'a, 'buf, 'b, 'func>(
        &'a mut self,
        buf: &'buf mut Vec<u8>,
        limit: usize,
        position: &'b mut usize,
    ) -> Pin<Box<dyn Future<Output = Result<usize>> + Send + 'func>>
    where
        'a: 'func,
        'buf: 'func,
        'b: 'func,
    {
        Box::pin(async move {
            buf.clear();
            if limit == 0 {
                return Ok(0);
            }
            let used = loop {
                match self.fill_buf().await {
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
        })
    }
}
