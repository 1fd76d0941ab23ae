//! Proxy selection.

use std::net::IpAddr;

use http::Uri;

use crate::auth::Credential;
use crate::ext::UriExt;
use crate::Error;

/// Decides which proxy, if any, a request goes through.
pub trait ProxySelector: Send + Sync {
    /// The proxy for `target`, or `None` to connect directly.
    fn proxy_for(&self, target: &Uri) -> Option<Uri>;

    /// Tell if `target` is reached directly even though a proxy is configured.
    fn is_bypassed(&self, target: &Uri) -> bool;

    /// Credentials for the proxy itself.
    fn credentials(&self) -> Option<&Credential> {
        None
    }
}

/// A single HTTP proxy with a bypass list.
#[derive(Debug, Clone)]
pub struct WebProxy {
    address: Uri,
    bypass_on_local: bool,
    bypass_list: Vec<String>,
    credentials: Option<Credential>,
}

impl WebProxy {
    /// Proxy at `address`, e.g. `http://proxy.test:3128`.
    pub fn new(address: &str) -> Result<Self, Error> {
        let address: Uri = address
            .parse()
            .map_err(|e| Error::BadUri(format!("{}: {}", address, e)))?;

        if address.scheme_str() != Some("http") {
            return Err(Error::BadUri(format!("proxy must be http: {}", address)));
        }
        address.bare_host()?;

        Ok(WebProxy {
            address,
            bypass_on_local: false,
            bypass_list: Vec::new(),
            credentials: None,
        })
    }

    /// Address of the proxy.
    pub fn address(&self) -> &Uri {
        &self.address
    }

    /// Go direct to hosts without a dot in their name, like `intranet`.
    pub fn bypass_on_local(mut self, v: bool) -> Self {
        self.bypass_on_local = v;
        self
    }

    /// Go direct to hosts matching `pattern`. A leading `*.` matches any
    /// subdomain, otherwise the host must match exactly. Case is ignored.
    pub fn bypass(mut self, pattern: impl Into<String>) -> Self {
        self.bypass_list.push(pattern.into().to_ascii_lowercase());
        self
    }

    /// Credentials sent to the proxy in `proxy-authorization`.
    pub fn credentials(mut self, credential: Credential) -> Self {
        self.credentials = Some(credential);
        self
    }
}

impl ProxySelector for WebProxy {
    fn proxy_for(&self, target: &Uri) -> Option<Uri> {
        if self.is_bypassed(target) {
            None
        } else {
            Some(self.address.clone())
        }
    }

    fn is_bypassed(&self, target: &Uri) -> bool {
        let Ok(host) = target.bare_host() else {
            return false;
        };
        let host = host.to_ascii_lowercase();

        if host == "localhost" {
            return true;
        }

        if let Ok(ip) = host.parse::<IpAddr>() {
            if ip.is_loopback() {
                return true;
            }
        } else if self.bypass_on_local && !host.contains('.') {
            return true;
        }

        self.bypass_list.iter().any(|p| host_matches(p, &host))
    }

    fn credentials(&self) -> Option<&Credential> {
        self.credentials.as_ref()
    }
}

fn host_matches(pattern: &str, host: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(domain) => host
            .strip_suffix(domain)
            .map(|rest| rest.ends_with('.'))
            .unwrap_or(false),
        None => pattern == host,
    }
}
