use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::Error;

const INITIAL_CAPACITY: usize = 8 * 1024;

/// The longest message accepted from a provider.
pub const MAX_LINE_LEN: usize = 16 * 1024 * 1024;

/// A type for reading newline-delimited messages from a byte stream.
pub struct Lines<R> {
    buf: BytesMut,
    reader: R,
    eof: bool,
    max_len: usize,
}

impl<R: AsyncRead + Unpin> Lines<R> {
    #[inline]
    pub fn new(reader: R) -> Self {
        Self::with_limit(reader, MAX_LINE_LEN)
    }

    /// Creates a reader that rejects lines longer than `max_len` bytes.
    pub fn with_limit(reader: R, max_len: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_CAPACITY.min(max_len + 1)),
            reader,
            eof: false,
            max_len,
        }
    }

    /// Returns the next non-blank line, or `None` once the stream ends.
    pub async fn next_line(&mut self) -> Result<Option<String>, Error> {
        loop {
            // Drain what is already buffered before touching the stream.
            if let Some(line) = self.try_take_line()? {
                return Ok(Some(line));
            }
            self.check_len(self.buf.len())?;

            if self.eof {
                // The last message may come without a trailing line feed.
                let rest = self.buf.split();
                let line = decode(&rest)?;
                if line.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(line.to_owned()));
            }

            let read = self
                .reader
                .read_buf(&mut self.buf)
                .await
                .map_err(|err| Error::io().with_reason(format!("{err}")))?;
            if read == 0 {
                self.eof = true;
            }
        }
    }

    fn try_take_line(&mut self) -> Result<Option<String>, Error> {
        loop {
            let Some(eol_idx) = self.buf.iter().position(|b| *b == b'\n')
            else {
                return Ok(None);
            };
            self.check_len(eol_idx)?;
            let raw = self.buf.split_to(eol_idx + 1);
            let line = decode(&raw[..eol_idx])?;
            if line.is_empty() {
                continue;
            }
            return Ok(Some(line.to_owned()));
        }
    }

    fn check_len(&mut self, len: usize) -> Result<(), Error> {
        if len <= self.max_len {
            return Ok(());
        }
        self.buf.clear();
        Err(Error::protocol().with_reason(format!(
            "message exceeds the limit of {} bytes",
            self.max_len
        )))
    }
}

#[inline]
fn decode(raw: &[u8]) -> Result<&str, Error> {
    let Ok(s) = str::from_utf8(raw) else {
        return Err(Error::protocol().with_reason("output is not valid UTF-8"));
    };
    Ok(s.trim())
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncReadExt;

    use super::*;
    use crate::ErrorKind;

    #[tokio::test]
    async fn test_normal_lines() {
        let mut lines = Lines::new(&b"{\"a\":1}\n{\"b\":2}\n"[..]);
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "{\"a\":1}");
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "{\"b\":2}");
        assert_eq!(lines.next_line().await.unwrap(), None);
        assert_eq!(lines.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_split_chunks() {
        let reader = (&b"{\"a\""[..])
            .chain(&b":1}\r\n\n\n"[..])
            .chain(&b"{\"b\":2}"[..]);
        let mut lines = Lines::new(reader);
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "{\"a\":1}");
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "{\"b\":2}");
        assert_eq!(lines.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_oversized_line() {
        let mut lines = Lines::with_limit(&b"{\"a\":1}\n{\"long\":\"abcdefgh\"}\n"[..], 8);
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "{\"a\":1}");
        let err = lines.next_line().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[tokio::test]
    async fn test_endless_line_is_cut_off() {
        // Never yields a newline, so only the limit stops the read.
        let reader = tokio::io::repeat(b'x');
        let mut lines = Lines::with_limit(reader, 64 * 1024);
        let err = lines.next_line().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert!(err.reason().contains("65536"));
    }

    #[tokio::test]
    async fn test_invalid_utf8() {
        let mut lines = Lines::new(&b"\xff\xfe\n"[..]);
        let err = lines.next_line().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }
}
