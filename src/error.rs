use std::{fmt, io};

use http::{Method, StatusCode};

/// Error type for webrequest
#[derive(Debug)]
#[allow(missing_docs)]
#[non_exhaustive]
pub enum Error {
    InvalidHeader(String),
    RestrictedHeader(String),
    HeadersAlreadySent,
    InvalidMethod(String),
    MethodCannotSendBody(Method),
    UnsupportedVersion,
    BadUri(String),
    InvalidArgument(&'static str),
    ContentLengthRequired,
    ResponseAlreadyTaken,
    RequestFailed,
    BadContentLengthHeader,
    ChunkLenNotAscii,
    ChunkLenNotANumber,
    ChunkExpectedCrLf,
    BodyContentAfterFinish,
    BodyLargerThanContentLength,
    BodySmallerThanContentLength(u64),
    HttpParseFail(String),
    HttpParseTooManyHeaders,
    ResponseHeadTooLarge,
    UnexpectedEof,
    Transport(TransportStatus, io::Error),
    ProxyConnect(StatusCode),
    NotSupported(&'static str),
    Timeout,
    Aborted,
    Io(io::Error),
}

/// Classification of a failure to reach the peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportStatus {
    /// The host name of the next hop could not be resolved.
    NameResolutionFailure,
    /// The TCP connection could not be opened.
    ConnectFailure,
    /// The TLS handshake failed.
    SecureChannelFailure,
    /// The proxy refused or broke the tunnel.
    ProxyFailure,
}

impl Error {
    /// Tell which stage of connection establishment failed, if any.
    pub fn transport_status(&self) -> Option<TransportStatus> {
        match self {
            Error::Transport(s, _) => Some(*s),
            Error::ProxyConnect(_) => Some(TransportStatus::ProxyFailure),
            _ => None,
        }
    }

    /// Protocol errors mean the peer sent something we cannot interpret.
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedVersion
                | Error::HttpParseFail(_)
                | Error::HttpParseTooManyHeaders
                | Error::ResponseHeadTooLarge
                | Error::BadContentLengthHeader
                | Error::ChunkLenNotAscii
                | Error::ChunkLenNotANumber
                | Error::ChunkExpectedCrLf
                | Error::UnexpectedEof
        )
    }

    pub(crate) fn transport(status: TransportStatus, msg: impl fmt::Display) -> Error {
        Error::Transport(status, io::Error::new(io::ErrorKind::Other, msg.to_string()))
    }
}

impl From<httparse::Error> for Error {
    fn from(value: httparse::Error) -> Self {
        match value {
            httparse::Error::Version => Error::UnsupportedVersion,
            httparse::Error::TooManyHeaders => Error::HttpParseTooManyHeaders,
            _ => Error::HttpParseFail(value.to_string()),
        }
    }
}

impl From<io::Error> for Error {
    fn from(value: io::Error) -> Self {
        // Errors that travelled through a Read/Write impl as io::Error are unwrapped again.
        if value.get_ref().map(|e| e.is::<Error>()).unwrap_or(false) {
            let kind = value.kind();
            return match value.into_inner().map(|e| e.downcast::<Error>()) {
                Some(Ok(e)) => *e,
                Some(Err(e)) => Error::Io(io::Error::new(kind, e)),
                None => Error::Io(kind.into()),
            };
        }

        match value.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Error::Timeout,
            io::ErrorKind::UnexpectedEof => Error::UnexpectedEof,
            _ => Error::Io(value),
        }
    }
}

impl From<Error> for io::Error {
    fn from(value: Error) -> Self {
        match value {
            Error::Io(e) => e,
            Error::UnexpectedEof => io::Error::new(io::ErrorKind::UnexpectedEof, value),
            Error::Timeout => io::Error::new(io::ErrorKind::TimedOut, value),
            e if e.is_protocol_error() => io::Error::new(io::ErrorKind::InvalidData, e),
            e => io::Error::new(io::ErrorKind::Other, e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Transport(_, e) => Some(e),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidHeader(v) => write!(f, "invalid header: {}", v),
            Error::RestrictedHeader(v) => {
                write!(f, "header {} must be set through its dedicated property", v)
            }
            Error::HeadersAlreadySent => write!(f, "request headers are already sent"),
            Error::InvalidMethod(v) => write!(f, "invalid http method: {}", v),
            Error::MethodCannotSendBody(m) => write!(f, "{} cannot send a request body", m),
            Error::UnsupportedVersion => write!(f, "unsupported http version"),
            Error::BadUri(v) => write!(f, "bad uri: {}", v),
            Error::InvalidArgument(v) => write!(f, "invalid argument: {}", v),
            Error::ContentLengthRequired => {
                write!(f, "content-length required when buffering and chunking are off")
            }
            Error::ResponseAlreadyTaken => write!(f, "response has already been taken"),
            Error::RequestFailed => write!(f, "request failed after it was sent"),
            Error::BadContentLengthHeader => write!(f, "content-length header not a number"),
            Error::ChunkLenNotAscii => write!(f, "chunk length is not ascii"),
            Error::ChunkLenNotANumber => write!(f, "chunk length cannot be read as a number"),
            Error::ChunkExpectedCrLf => write!(f, "chunk expected crlf as next character"),
            Error::BodyContentAfterFinish => {
                write!(f, "attempt to write body after the request stream was closed")
            }
            Error::BodyLargerThanContentLength => {
                write!(f, "attempt to write larger body than content-length")
            }
            Error::BodySmallerThanContentLength(left) => {
                write!(f, "request stream closed with {} bytes left to send", left)
            }
            Error::HttpParseFail(v) => write!(f, "http parse fail: {}", v),
            Error::HttpParseTooManyHeaders => write!(f, "http parse resulted in too many headers"),
            Error::ResponseHeadTooLarge => write!(f, "response head is too large"),
            Error::UnexpectedEof => write!(f, "connection closed before the message was complete"),
            Error::Transport(s, e) => write!(f, "{}: {}", s, e),
            Error::ProxyConnect(s) => write!(f, "proxy refused CONNECT: {}", s),
            Error::NotSupported(v) => write!(f, "not supported: {}", v),
            Error::Timeout => write!(f, "operation timed out"),
            Error::Aborted => write!(f, "request was aborted"),
            Error::Io(e) => write!(f, "io: {}", e),
        }
    }
}

impl fmt::Display for TransportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportStatus::NameResolutionFailure => write!(f, "name resolution failure"),
            TransportStatus::ConnectFailure => write!(f, "connect failure"),
            TransportStatus::SecureChannelFailure => write!(f, "secure channel failure"),
            TransportStatus::ProxyFailure => write!(f, "proxy failure"),
        }
    }
}
