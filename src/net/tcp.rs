use std::fmt;
use std::io;
use std::net::{IpAddr, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;

use super::{Connection, Connector};
use crate::util::Deadline;
use crate::{Error, TransportStatus};

/// Turns a host name into socket addresses.
pub trait Resolver: Send + Sync {
    /// Addresses for `host:port`, in the order they should be tried.
    fn resolve(&self, host: &str, port: u16) -> Result<Vec<SocketAddr>, Error>;
}

/// Resolver using the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemResolver;

impl Resolver for SystemResolver {
    fn resolve(&self, host: &str, port: u16) -> Result<Vec<SocketAddr>, Error> {
        // Literal addresses need no lookup.
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(vec![SocketAddr::new(ip, port)]);
        }

        let addrs: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()
            .map_err(|e| Error::Transport(TransportStatus::NameResolutionFailure, e))?
            .collect();

        if addrs.is_empty() {
            return Err(Error::transport(
                TransportStatus::NameResolutionFailure,
                format!("no addresses for {}", host),
            ));
        }

        trace!("Resolved {} to {:?}", host, addrs);
        Ok(addrs)
    }
}

/// Opens TCP connections.
#[derive(Clone)]
pub struct TcpConnector {
    resolver: Arc<dyn Resolver>,
    no_delay: bool,
}

impl TcpConnector {
    /// Connector resolving names with `resolver`.
    pub fn new(resolver: Arc<dyn Resolver>) -> Self {
        TcpConnector {
            resolver,
            no_delay: true,
        }
    }

    /// Set `TCP_NODELAY` on new sockets. Defaults to true.
    pub fn no_delay(mut self, v: bool) -> Self {
        self.no_delay = v;
        self
    }
}

impl Default for TcpConnector {
    fn default() -> Self {
        TcpConnector::new(Arc::new(SystemResolver))
    }
}

impl Connector for TcpConnector {
    fn connect(&self, host: &str, port: u16, deadline: Deadline) -> Result<Connection, Error> {
        let addrs = self.resolver.resolve(host, port)?;

        let mut last_err = None;

        for addr in addrs {
            let attempt = match deadline.remaining()? {
                Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
                None => TcpStream::connect(addr),
            };

            match attempt {
                Ok(stream) => {
                    debug!("Connected to {}", addr);
                    stream.set_nodelay(self.no_delay)?;
                    return Ok(Connection::from_tcp(stream)?);
                }
                Err(e) => {
                    debug!("Failed to connect to {}: {}", addr, e);
                    last_err = Some(e);
                }
            }
        }

        // Report a timeout rather than the last refused address.
        deadline.remaining()?;

        let err = last_err.unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "no address"));
        Err(Error::Transport(TransportStatus::ConnectFailure, err))
    }
}

impl fmt::Debug for TcpConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TcpConnector")
            .field("no_delay", &self.no_delay)
            .finish_non_exhaustive()
    }
}
