use std::io::{self, Read};

use http::{header, StatusCode, Uri, Version};

use crate::body::{BodyMode, BodyReader};
use crate::headers::HeaderCollection;
use crate::net::Connection;
use crate::parser::ResponseHead;

/// The final response of a request.
///
/// The body is read through the [`Read`] impl. Redirect and challenge
/// responses that were not followed are returned as is, so check
/// [`status`][Response::status].
#[derive(Debug)]
pub struct Response {
    version: Version,
    status: StatusCode,
    reason: String,
    headers: HeaderCollection,
    uri: Uri,
    body: BodyReader<Connection>,
}

impl Response {
    pub(crate) fn new(head: ResponseHead, uri: Uri, mode: BodyMode, conn: Connection) -> Self {
        Response {
            version: head.version,
            status: head.status,
            reason: head.reason,
            headers: head.headers,
            uri,
            body: BodyReader::new(mode, conn),
        }
    }

    /// HTTP version of the response.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Status text, e.g. `Not Found`.
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Response headers in the order received.
    pub fn headers(&self) -> &HeaderCollection {
        &self.headers
    }

    /// The uri that produced this response, after any redirects.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Value of `content-length`, if present and a number.
    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .get(header::CONTENT_LENGTH.as_str())
            .and_then(|v| v.trim().parse().ok())
    }

    /// Value of `content-type`.
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(header::CONTENT_TYPE.as_str())
    }

    /// Value of `location`.
    pub fn location(&self) -> Option<&str> {
        self.headers.get(header::LOCATION.as_str())
    }

    /// How the body is delimited.
    pub fn body_mode(&self) -> BodyMode {
        self.body.body_mode()
    }

    /// The body reader on its own.
    pub fn into_body(self) -> BodyReader<Connection> {
        self.body
    }
}

impl Read for Response {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.body.read(buf)
    }
}
