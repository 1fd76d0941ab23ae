//! Response body framing.

use std::io::{self, BufRead, Read};

use http::{header, Method, Version};

use crate::ext::StatusExt;
use crate::parser::ResponseHead;
use crate::Error;

mod chunked;
pub use chunked::ChunkedDecoder;
pub(crate) use chunked::{write_chunk, write_last_chunk};

/// How the response body is delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyMode {
    /// No body at all, e.g. HEAD requests and 204 responses.
    NoBody,
    /// Exact number of bytes given by `content-length`.
    LengthDelimited(u64),
    /// `transfer-encoding: chunked`
    Chunked,
    /// Body ends when the server closes the connection.
    CloseDelimited,
}

impl BodyMode {
    /// Decide the body mode of a response to a request made with `method`.
    pub(crate) fn for_response(method: &Method, head: &ResponseHead) -> Result<BodyMode, Error> {
        if *method == Method::HEAD || head.status.has_no_body() {
            return Ok(BodyMode::NoBody);
        }

        // Chunked only counts if it's the final coding. HTTP/1.0 has no chunking.
        let is_chunked = head.version != Version::HTTP_10
            && head
                .headers
                .get_all(header::TRANSFER_ENCODING.as_str())
                .filter_map(|v| v.to_str().ok())
                .flat_map(|v| v.split(','))
                .last()
                .map(|t| t.trim().eq_ignore_ascii_case("chunked"))
                .unwrap_or(false);

        if is_chunked {
            return Ok(BodyMode::Chunked);
        }

        let mut lengths = head.headers.get_all(header::CONTENT_LENGTH.as_str());

        if let Some(v) = lengths.next() {
            let len = v
                .to_str()
                .ok()
                .and_then(|s| s.trim().parse::<u64>().ok())
                .ok_or(Error::BadContentLengthHeader)?;

            // Repeated headers are only fine when they agree.
            for other in lengths {
                if other.as_bytes() != v.as_bytes() {
                    return Err(Error::BadContentLengthHeader);
                }
            }

            return Ok(BodyMode::LengthDelimited(len));
        }

        Ok(BodyMode::CloseDelimited)
    }

    /// Tell if there is any body to read.
    pub fn has_body(&self) -> bool {
        !matches!(self, BodyMode::NoBody | BodyMode::LengthDelimited(0))
    }
}

/// Reader of a response body over the connection `R`.
#[derive(Debug)]
pub struct BodyReader<R> {
    mode: BodyMode,
    inner: Inner<R>,
}

#[derive(Debug)]
enum Inner<R> {
    Plain { reader: R, left: Option<u64> },
    Chunked(ChunkedDecoder<R>),
}

impl<R: BufRead> BodyReader<R> {
    pub(crate) fn new(mode: BodyMode, reader: R) -> Self {
        let inner = match mode {
            BodyMode::NoBody => Inner::Plain {
                reader,
                left: Some(0),
            },
            BodyMode::LengthDelimited(n) => Inner::Plain {
                reader,
                left: Some(n),
            },
            BodyMode::Chunked => Inner::Chunked(ChunkedDecoder::new(reader)),
            BodyMode::CloseDelimited => Inner::Plain { reader, left: None },
        };

        BodyReader { mode, inner }
    }

    /// The mode this body is read with.
    pub fn body_mode(&self) -> BodyMode {
        self.mode
    }

    /// Tell if the whole body has been read.
    ///
    /// A close delimited body is never known to be ended until a read returns 0.
    pub fn is_ended(&self) -> bool {
        match &self.inner {
            Inner::Plain { left, .. } => *left == Some(0),
            Inner::Chunked(d) => d.is_ended(),
        }
    }

    /// Give back the underlying reader. Unread body bytes stay in it.
    pub fn into_inner(self) -> R {
        match self.inner {
            Inner::Plain { reader, .. } => reader,
            Inner::Chunked(d) => d.into_inner(),
        }
    }
}

impl<R: BufRead> Read for BodyReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.inner {
            Inner::Chunked(d) => d.read(buf),

            Inner::Plain { reader, left: None } => reader.read(buf),

            Inner::Plain {
                reader,
                left: Some(left),
            } => {
                if *left == 0 || buf.is_empty() {
                    return Ok(0);
                }

                let max = (*left).min(buf.len() as u64) as usize;
                let n = reader.read(&mut buf[..max])?;

                if n == 0 {
                    return Err(Error::UnexpectedEof.into());
                }

                *left -= n as u64;
                Ok(n)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::try_parse_response;
    use std::io::Cursor;

    fn mode(method: Method, res: &[u8]) -> Result<BodyMode, Error> {
        let (_, head) = try_parse_response::<16>(res).unwrap().unwrap();
        BodyMode::for_response(&method, &head)
    }

    #[test]
    fn head_has_no_body() {
        let m = mode(Method::HEAD, b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\n");
        assert_eq!(m.unwrap(), BodyMode::NoBody);
    }

    #[test]
    fn status_without_body() {
        for res in [
            &b"HTTP/1.1 204 No Content\r\nContent-Length: 10\r\n\r\n"[..],
            b"HTTP/1.1 304 Not Modified\r\n\r\n",
            b"HTTP/1.1 100 Continue\r\n\r\n",
        ] {
            assert_eq!(mode(Method::GET, res).unwrap(), BodyMode::NoBody);
        }
    }

    #[test]
    fn chunked_wins_over_length() {
        let m = mode(
            Method::GET,
            b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\nTransfer-Encoding: gzip, CHUNKED\r\n\r\n",
        );
        assert_eq!(m.unwrap(), BodyMode::Chunked);
    }

    #[test]
    fn chunked_not_last() {
        let m = mode(
            Method::GET,
            b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked, gzip\r\n\r\n",
        );
        assert_eq!(m.unwrap(), BodyMode::CloseDelimited);
    }

    #[test]
    fn length_delimited() {
        let m = mode(Method::GET, b"HTTP/1.1 200 OK\r\nContent-Length: 42\r\n\r\n");
        assert_eq!(m.unwrap(), BodyMode::LengthDelimited(42));
    }

    #[test]
    fn bad_content_length() {
        let m = mode(Method::GET, b"HTTP/1.1 200 OK\r\nContent-Length: x\r\n\r\n");
        assert!(matches!(m, Err(Error::BadContentLengthHeader)));

        let m = mode(
            Method::GET,
            b"HTTP/1.1 200 OK\r\nContent-Length: 1\r\nContent-Length: 2\r\n\r\n",
        );
        assert!(matches!(m, Err(Error::BadContentLengthHeader)));
    }

    #[test]
    fn close_delimited() {
        let m = mode(Method::GET, b"HTTP/1.0 200 OK\r\n\r\n");
        assert_eq!(m.unwrap(), BodyMode::CloseDelimited);
    }

    #[test]
    fn read_length_delimited_stops() {
        let mut r = BodyReader::new(BodyMode::LengthDelimited(5), Cursor::new(&b"hallo world"[..]));
        let mut out = String::new();
        r.read_to_string(&mut out).unwrap();
        assert_eq!(out, "hallo");
        assert!(r.is_ended());
    }

    #[test]
    fn read_length_delimited_short() {
        let mut r = BodyReader::new(BodyMode::LengthDelimited(10), Cursor::new(&b"hal"[..]));
        let mut out = Vec::new();
        let err = r.read_to_end(&mut out).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn read_close_delimited() {
        let mut r = BodyReader::new(BodyMode::CloseDelimited, Cursor::new(&b"all of it"[..]));
        let mut out = Vec::new();
        r.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"all of it");
    }
}
