use std::fmt;
use std::sync::Arc;

use rustls::pki_types::ServerName;
use rustls::{ClientConfig, ClientConnection, RootCertStore, StreamOwned};

use super::{TlsProvider, Transport};
use crate::{Error, TransportStatus};

/// TLS through rustls, trusting the Mozilla roots from `webpki-roots`.
#[derive(Clone)]
pub struct RustlsProvider {
    config: Arc<ClientConfig>,
}

impl RustlsProvider {
    /// Provider with the default root store and the ring crypto provider.
    pub fn new() -> Result<Self, Error> {
        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        let provider = Arc::new(rustls::crypto::ring::default_provider());

        let config = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(secure_channel)?
            .with_root_certificates(roots)
            .with_no_client_auth();

        Ok(RustlsProvider::with_config(Arc::new(config)))
    }

    /// Provider using an already built rustls config.
    pub fn with_config(config: Arc<ClientConfig>) -> Self {
        RustlsProvider { config }
    }
}

impl TlsProvider for RustlsProvider {
    fn handshake(
        &self,
        host: &str,
        mut transport: Box<dyn Transport>,
    ) -> Result<Box<dyn Transport>, Error> {
        let name: ServerName<'static> = host
            .to_string()
            .try_into()
            .map_err(|_| Error::BadUri(format!("invalid server name: {}", host)))?;

        let mut conn = ClientConnection::new(self.config.clone(), name).map_err(secure_channel)?;

        while conn.is_handshaking() {
            conn.complete_io(&mut transport)
                .map_err(|e| Error::Transport(TransportStatus::SecureChannelFailure, e))?;
        }

        debug!(
            "TLS established with {}: {:?}",
            host,
            conn.protocol_version()
        );

        Ok(Box::new(StreamOwned::new(conn, transport)))
    }
}

fn secure_channel(e: rustls::Error) -> Error {
    Error::transport(TransportStatus::SecureChannelFailure, e)
}

impl fmt::Debug for RustlsProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RustlsProvider").finish_non_exhaustive()
    }
}
