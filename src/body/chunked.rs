use std::io::{self, BufRead, Read, Write};

use crate::Error;

/// Longest chunk size line (including extensions) or trailer line we accept.
const MAX_LINE: u64 = 4096;

/// Decodes `transfer-encoding: chunked` while reading.
///
/// Reading stops after the terminating zero size chunk and its (ignored)
/// trailer section. Nothing beyond the end of the chunked body is consumed
/// from the inner reader.
#[derive(Debug)]
pub struct ChunkedDecoder<R> {
    inner: R,
    state: State,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Expecting a size line. `after_data` means the CRLF ending the previous
    /// chunk's data comes first.
    AwaitingSize { after_data: bool },
    ReadingChunk(u64),
    Done,
}

impl<R: BufRead> ChunkedDecoder<R> {
    /// Decode the chunked body at the current position of `inner`.
    pub fn new(inner: R) -> Self {
        ChunkedDecoder {
            inner,
            state: State::AwaitingSize { after_data: false },
        }
    }

    /// Tell if the terminating chunk has been read.
    pub fn is_ended(&self) -> bool {
        self.state == State::Done
    }

    /// Give back the inner reader.
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn next_size(&mut self, after_data: bool) -> Result<u64, Error> {
        if after_data {
            let mut crlf = [0_u8; 2];
            self.inner.read_exact(&mut crlf)?;
            if &crlf != b"\r\n" {
                return Err(Error::ChunkExpectedCrLf);
            }
        }

        let mut line = Vec::with_capacity(16);
        read_line(&mut self.inner, &mut line)?;

        let Some(line) = line.strip_suffix(b"\r\n") else {
            if line.is_empty() {
                return Err(Error::UnexpectedEof);
            }
            return Err(Error::ChunkExpectedCrLf);
        };

        parse_chunk_size(line)
    }

    fn skip_trailers(&mut self) -> Result<(), Error> {
        let mut line = Vec::new();
        loop {
            line.clear();
            read_line(&mut self.inner, &mut line)?;

            // Some servers close right after the last chunk.
            if line.is_empty() || line == b"\r\n" || line == b"\n" {
                return Ok(());
            }

            trace!("Ignore chunked trailer: {}", String::from_utf8_lossy(&line).trim_end());
        }
    }
}

fn read_line<R: BufRead>(r: &mut R, line: &mut Vec<u8>) -> Result<(), Error> {
    let n = r.take(MAX_LINE).read_until(b'\n', line)?;
    if n as u64 == MAX_LINE && line.last() != Some(&b'\n') {
        return Err(Error::ChunkExpectedCrLf);
    }
    Ok(())
}

fn parse_chunk_size(line: &[u8]) -> Result<u64, Error> {
    // Extensions start with ';'. We also stop at whitespace, which some
    // servers put between the size and the extension.
    let end = line
        .iter()
        .position(|c| matches!(c, b';' | b' ' | b'\t'))
        .unwrap_or(line.len());

    let digits = &line[..end];

    if !digits.is_ascii() {
        return Err(Error::ChunkLenNotAscii);
    }

    // is_ascii above means this can't fail.
    let digits = std::str::from_utf8(digits).map_err(|_| Error::ChunkLenNotAscii)?;

    if digits.is_empty() || !digits.bytes().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::ChunkLenNotANumber);
    }

    u64::from_str_radix(digits, 16).map_err(|_| Error::ChunkLenNotANumber)
}

impl<R: BufRead> Read for ChunkedDecoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            match self.state {
                State::Done => return Ok(0),

                State::AwaitingSize { after_data } => {
                    let size = self.next_size(after_data)?;

                    if size == 0 {
                        self.skip_trailers()?;
                        self.state = State::Done;
                        return Ok(0);
                    }

                    self.state = State::ReadingChunk(size);
                }

                State::ReadingChunk(left) => {
                    if buf.is_empty() {
                        return Ok(0);
                    }

                    let max = (left.min(buf.len() as u64)) as usize;
                    let n = self.inner.read(&mut buf[..max])?;

                    if n == 0 {
                        return Err(Error::UnexpectedEof.into());
                    }

                    let left = left - n as u64;
                    self.state = if left == 0 {
                        State::AwaitingSize { after_data: true }
                    } else {
                        State::ReadingChunk(left)
                    };

                    return Ok(n);
                }
            }
        }
    }
}

/// Write `data` as one chunk. Empty input writes nothing, since a zero
/// size chunk would end the body.
pub(crate) fn write_chunk<W: Write>(w: &mut W, data: &[u8]) -> io::Result<()> {
    if data.is_empty() {
        return Ok(());
    }
    write!(w, "{:x}\r\n", data.len())?;
    w.write_all(data)?;
    w.write_all(b"\r\n")
}

/// Write the terminating chunk with an empty trailer.
pub(crate) fn write_last_chunk<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(b"0\r\n\r\n")
}
