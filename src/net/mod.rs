//! Connection establishment.
//!
//! A [`Connector`] opens a plain [`Connection`] to the next hop. If the
//! target is secure, [`establish`] then tunnels through the proxy with
//! `CONNECT` (when there is one) and hands the stream to a [`TlsProvider`].

use std::fmt;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::TcpStream;

use http::{StatusCode, Uri, Version};

use crate::ext::UriExt;
use crate::parser::read_response_head;
use crate::util::{log_data, Deadline};
use crate::{Error, TransportStatus};

mod tcp;
pub use tcp::{Resolver, SystemResolver, TcpConnector};

#[cfg(feature = "rustls")]
mod tls;
#[cfg(feature = "rustls")]
pub use tls::RustlsProvider;

/// A bidirectional byte stream.
pub trait Transport: Read + Write + Send {}

impl<T: Read + Write + Send> Transport for T {}

/// Opens connections to a host and port.
pub trait Connector: Send + Sync {
    /// Open a plain connection to `host:port`. `host` has no IPv6 brackets.
    fn connect(&self, host: &str, port: u16, deadline: Deadline) -> Result<Connection, Error>;
}

/// Turns a plain stream into an encrypted one.
pub trait TlsProvider: Send + Sync {
    /// Run the handshake for `host` over `transport`.
    fn handshake(
        &self,
        host: &str,
        transport: Box<dyn Transport>,
    ) -> Result<Box<dyn Transport>, Error>;
}

/// An open connection to the next hop.
///
/// Reads are buffered. When the connection is backed by a socket, the socket
/// is kept alongside so timeouts can be updated and the connection can be
/// shut down from another thread.
pub struct Connection {
    stream: BufReader<Box<dyn Transport>>,
    socket: Option<TcpStream>,
}

impl Connection {
    /// Connection over any transport, without socket control.
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Connection {
            stream: BufReader::new(transport),
            socket: None,
        }
    }

    /// Connection over a TCP socket.
    pub fn from_tcp(stream: TcpStream) -> io::Result<Self> {
        let socket = stream.try_clone()?;
        Ok(Connection {
            stream: BufReader::new(Box::new(stream)),
            socket: Some(socket),
        })
    }

    /// Another handle to the socket, used to abort from elsewhere.
    pub(crate) fn socket_handle(&self) -> Option<TcpStream> {
        self.socket.as_ref().and_then(|s| s.try_clone().ok())
    }

    /// Bound blocking reads and writes by what's left of `deadline`.
    pub(crate) fn apply_deadline(&self, deadline: &Deadline) -> Result<(), Error> {
        let remaining = deadline.remaining()?;
        if let Some(socket) = &self.socket {
            socket.set_read_timeout(remaining)?;
            socket.set_write_timeout(remaining)?;
        }
        Ok(())
    }

    /// Replace the transport, e.g. with a TLS stream over it.
    ///
    /// Fails if there is unread data in the buffer, since the new transport
    /// would never see it.
    pub(crate) fn upgrade<F>(self, f: F) -> Result<Connection, Error>
    where
        F: FnOnce(Box<dyn Transport>) -> Result<Box<dyn Transport>, Error>,
    {
        if !self.stream.buffer().is_empty() {
            return Err(Error::transport(
                TransportStatus::ProxyFailure,
                "unexpected data before handshake",
            ));
        }

        let socket = self.socket;
        let transport = f(self.stream.into_inner())?;

        Ok(Connection {
            stream: BufReader::new(transport),
            socket,
        })
    }
}

impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

impl BufRead for Connection {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.stream.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.stream.consume(amt)
    }
}

impl Write for Connection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.get_mut().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.get_mut().flush()
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("socket", &self.socket)
            .finish_non_exhaustive()
    }
}

/// Where and how to connect for one attempt.
#[derive(Debug)]
pub(crate) struct Route<'a> {
    /// The uri the request is for.
    pub target: &'a Uri,
    /// Proxy to go through, already checked against the bypass rules.
    pub proxy: Option<&'a Uri>,
    /// Value for `proxy-authorization` in the `CONNECT` request.
    pub proxy_authorization: Option<&'a str>,
    pub version: Version,
}

/// Open a connection ready for the request head to be written.
pub(crate) fn establish(
    connector: &dyn Connector,
    tls: Option<&dyn TlsProvider>,
    route: &Route<'_>,
    deadline: Deadline,
) -> Result<Connection, Error> {
    let secure = route.target.is_secure();

    // Check before opening any socket.
    if secure && tls.is_none() {
        return Err(Error::NotSupported("tls"));
    }

    let hop = route.proxy.unwrap_or(route.target);
    let host = hop.bare_host()?;
    let port = hop.effective_port()?;

    debug!("Connect to {}:{}", host, port);
    let mut conn = connector.connect(host, port, deadline)?;
    conn.apply_deadline(&deadline)?;

    if secure && route.proxy.is_some() {
        tunnel(&mut conn, route)?;
    }

    if let Some(tls) = tls.filter(|_| secure) {
        let server_name = route.target.bare_host()?;
        debug!("TLS handshake with {}", server_name);
        conn = conn.upgrade(|t| tls.handshake(server_name, t))?;
    }

    Ok(conn)
}

fn tunnel(conn: &mut Connection, route: &Route<'_>) -> Result<(), Error> {
    let host = route.target.host().unwrap_or_default();
    let port = route.target.effective_port()?;
    let authority = format!("{}:{}", host, port);

    let mut req = Vec::with_capacity(128);
    write!(req, "CONNECT {} {:?}\r\n", authority, route.version)?;
    write!(req, "Host: {}\r\n", authority)?;
    if let Some(auth) = route.proxy_authorization {
        write!(req, "Proxy-Authorization: {}\r\n", auth)?;
    }
    req.extend_from_slice(b"\r\n");

    log_data(&req);
    conn.write_all(&req)
        .and_then(|_| conn.flush())
        .map_err(|e| Error::Transport(TransportStatus::ProxyFailure, e))?;

    let head = read_response_head(conn).map_err(|e| match e {
        Error::Timeout | Error::Aborted => e,
        e => Error::transport(TransportStatus::ProxyFailure, format!("bad CONNECT reply: {}", e)),
    })?;

    if head.status != StatusCode::OK {
        debug!("Proxy refused CONNECT {}: {}", authority, head.status);
        return Err(Error::ProxyConnect(head.status));
    }

    debug!("Tunnel open to {}", authority);
    Ok(())
}
