use std::time::Duration;

use http::uri::Scheme;
use http::Uri;

/// Per request configuration.
///
/// The values are copied into each [`WebRequest`][crate::client::WebRequest]
/// where they can be changed individually before the request is sent.
#[derive(Debug, Clone)]
pub struct Config {
    /// Value of the `user-agent` header. Empty means no header.
    pub user_agent: String,

    /// Max number of redirects followed before the 3xx response is handed
    /// back unfollowed.
    ///
    /// Defaults to 5.
    pub max_redirects: u32,

    /// Follow redirects automatically.
    ///
    /// Defaults to true.
    pub allow_auto_redirect: bool,

    /// Buffer a request body of unknown length in memory to compute
    /// `content-length`. When false, the body length must be given up front
    /// or the body must be sent chunked.
    ///
    /// Defaults to true.
    pub allow_write_stream_buffering: bool,

    /// Ask the server to keep the connection open. When false, the request
    /// carries `connection: close`.
    ///
    /// Defaults to true.
    pub keep_alive: bool,

    /// Send authorization with the first request, before any challenge.
    ///
    /// Defaults to false.
    pub pre_authenticate: bool,

    /// Bound on the whole operation, including redirects and retries.
    /// `None` waits forever.
    ///
    /// Defaults to 100 seconds.
    pub timeout: Option<Duration>,

    /// When to keep the `authorization` header on redirect.
    ///
    /// Defaults to [`RedirectAuthHeaders::SameHost`].
    pub redirect_auth_headers: RedirectAuthHeaders,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            user_agent: format!("webrequest/{}", env!("CARGO_PKG_VERSION")),
            max_redirects: 5,
            allow_auto_redirect: true,
            allow_write_stream_buffering: true,
            keep_alive: true,
            pre_authenticate: false,
            timeout: Some(Duration::from_secs(100)),
            redirect_auth_headers: RedirectAuthHeaders::SameHost,
        }
    }
}

/// Strategy for keeping `authorization` headers during redirects.
///
/// * `Never` never preserves `authorization` header in redirects.
/// * `SameHost` keeps it only if the redirect goes to the same host, using
///   the same scheme or switching from `http` to `https`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum RedirectAuthHeaders {
    /// Never preserve the `authorization` header on redirect.
    Never,
    /// Preserve the `authorization` header when the redirect is to the same host.
    SameHost,
}

impl RedirectAuthHeaders {
    pub(crate) fn keeps_auth(&self, prev: &Uri, next: &Uri) -> bool {
        match self {
            RedirectAuthHeaders::Never => false,
            RedirectAuthHeaders::SameHost => {
                let host_prev = prev.authority().map(|a| a.host());
                let host_next = next.authority().map(|a| a.host());
                let scheme_prev = prev.scheme();
                let scheme_next = next.scheme();
                host_prev == host_next
                    && (scheme_prev == scheme_next || scheme_next == Some(&Scheme::HTTPS))
            }
        }
    }
}
