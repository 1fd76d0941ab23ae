use std::io::{self, Write};

use http::{Method, Version};

use crate::body::{write_chunk, write_last_chunk};
use crate::headers::HeaderCollection;
use crate::net::Connection;
use crate::util::log_data;
use crate::Error;

/// Request line and headers, ready to be written.
#[derive(Debug, Clone)]
pub(crate) struct RequestHead {
    pub method: Method,
    pub target: String,
    pub version: Version,
    pub headers: HeaderCollection,
}

impl RequestHead {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(256);
        // Writing to a Vec cannot fail.
        let _ = write!(buf, "{} {} {:?}\r\n", self.method, self.target, self.version);
        let _ = self.headers.write_to(&mut buf);
        buf.extend_from_slice(b"\r\n");
        buf
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let buf = self.to_bytes();
        log_data(&buf);
        w.write_all(&buf)
    }
}

/// How the request body is framed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Framing {
    /// No body, no body headers.
    None,
    /// `content-length` known up front.
    Length(u64),
    /// `transfer-encoding: chunked`
    Chunked,
    /// Held in memory until close, then sent with `content-length`.
    Buffered,
}

/// Writer of a request body.
///
/// Depending on how the request is configured, the body is either held in
/// memory until [`close`][RequestStream::close] (which is when the request
/// head goes out, with the `content-length` of what was written), or
/// written straight to the connection after the head. Straight writes are
/// capped by the declared `content-length`, or framed as chunks.
#[derive(Debug)]
pub struct RequestStream {
    conn: Connection,
    head: RequestHead,
    mode: Mode,
    closed: bool,
}

#[derive(Debug)]
enum Mode {
    Buffered(Vec<u8>),
    Direct { left: u64 },
    Chunked,
}

impl RequestStream {
    pub(crate) fn open(head: RequestHead, mut conn: Connection, framing: Framing) -> Result<Self, Error> {
        let mode = match framing {
            Framing::Buffered => Mode::Buffered(Vec::new()),
            Framing::Length(n) => Mode::Direct { left: n },
            Framing::None => Mode::Direct { left: 0 },
            Framing::Chunked => Mode::Chunked,
        };

        if !matches!(mode, Mode::Buffered(_)) {
            head.write_to(&mut conn)?;
        }

        Ok(RequestStream {
            conn,
            head,
            mode,
            closed: false,
        })
    }

    /// Tell if the body is held in memory until close.
    pub fn is_buffered(&self) -> bool {
        matches!(self.mode, Mode::Buffered(_))
    }

    /// Tell if [`close`][RequestStream::close] has been called successfully.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Finish the body.
    ///
    /// A buffered body is sent now, after the request head. A body with a
    /// declared length fails if fewer bytes were written. Closing twice does
    /// nothing.
    pub fn close(&mut self) -> Result<(), Error> {
        if self.closed {
            return Ok(());
        }

        match &self.mode {
            Mode::Buffered(buf) => {
                self.head
                    .headers
                    .set_raw("Content-Length", &buf.len().to_string())?;
                let mut out = self.head.to_bytes();
                log_data(&out);
                out.extend_from_slice(buf);
                self.conn.write_all(&out)?;
            }
            Mode::Direct { left } => {
                if *left > 0 {
                    return Err(Error::BodySmallerThanContentLength(*left));
                }
            }
            Mode::Chunked => {
                write_last_chunk(&mut self.conn)?;
            }
        }

        self.conn.flush()?;
        self.closed = true;

        Ok(())
    }

    /// Give back the connection, and the body if it can be sent again.
    pub(crate) fn finish(self) -> (Connection, Option<Vec<u8>>) {
        let replay = match self.mode {
            Mode::Buffered(buf) => Some(buf),
            _ => None,
        };
        (self.conn, replay)
    }
}

impl Write for RequestStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.closed {
            return Err(Error::BodyContentAfterFinish.into());
        }

        match &mut self.mode {
            Mode::Buffered(v) => {
                v.extend_from_slice(buf);
            }
            Mode::Direct { left } => {
                if buf.len() as u64 > *left {
                    return Err(Error::BodyLargerThanContentLength.into());
                }
                self.conn.write_all(buf)?;
                *left -= buf.len() as u64;
            }
            Mode::Chunked => {
                write_chunk(&mut self.conn, buf)?;
            }
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.is_buffered() {
            return Ok(());
        }
        self.conn.flush()
    }
}
