//! Response head parsing.

use std::io::BufRead;

use http::{StatusCode, Version};

use crate::headers::HeaderCollection;
use crate::util::log_data;
use crate::Error;

/// Max number of headers in a response.
pub(crate) const MAX_RESPONSE_HEADERS: usize = 128;

/// Limit on the size of a response head.
const MAX_HEAD_SIZE: usize = 64 * 1024;

/// Status line and headers of a response.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    /// HTTP/1.0 or HTTP/1.1
    pub version: Version,
    /// Numeric status.
    pub status: StatusCode,
    /// Free text after the status code.
    pub reason: String,
    /// Headers as received, in order.
    pub headers: HeaderCollection,
}

/// Try to parse a response head from `input`.
///
/// `Ok(None)` means the head is not complete yet. On success, the returned `usize`
/// is the amount of `input` that makes up the head including the terminating blank line.
/// Lines may end with CRLF or a bare LF.
pub fn try_parse_response<const N: usize>(
    input: &[u8],
) -> Result<Option<(usize, ResponseHead)>, Error> {
    let mut headers = [httparse::EMPTY_HEADER; N];
    let mut res = httparse::Response::new(&mut headers);

    let input_used = match res.parse(input)? {
        httparse::Status::Complete(v) => v,
        httparse::Status::Partial => return Ok(None),
    };

    let version = match res.version {
        Some(0) => Version::HTTP_10,
        Some(1) => Version::HTTP_11,
        _ => return Err(Error::UnsupportedVersion),
    };

    let code = res
        .code
        .ok_or_else(|| Error::HttpParseFail("missing status code".into()))?;
    let status = StatusCode::from_u16(code)
        .map_err(|_| Error::HttpParseFail(format!("bad status code: {}", code)))?;

    let reason = res.reason.unwrap_or_default().to_string();

    let mut collection = HeaderCollection::new();
    for h in res.headers.iter() {
        collection.add_parsed(h.name, h.value)?;
    }

    let head = ResponseHead {
        version,
        status,
        reason,
        headers: collection,
    };

    Ok(Some((input_used, head)))
}

/// Read a response head off `r`.
///
/// Exactly the head is consumed, the body (if any) is left in the reader.
pub(crate) fn read_response_head<R: BufRead>(r: &mut R) -> Result<ResponseHead, Error> {
    let mut buf = Vec::new();

    loop {
        let available = r.fill_buf()?;
        let amount = available.len();

        if amount == 0 {
            return Err(Error::UnexpectedEof);
        }

        let prev = buf.len();
        buf.extend_from_slice(available);

        match try_parse_response::<MAX_RESPONSE_HEADERS>(&buf)? {
            Some((used, head)) => {
                r.consume(used.saturating_sub(prev));
                log_data(&buf[..used]);
                return Ok(head);
            }
            None => {
                r.consume(amount);
                if buf.len() > MAX_HEAD_SIZE {
                    return Err(Error::ResponseHeadTooLarge);
                }
            }
        }
    }
}
