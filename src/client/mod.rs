//! The request engine.
//!
//! A [`WebRequest`] is configured through setters, then driven by
//! [`request_stream`][WebRequest::request_stream] (for a body) and
//! [`get_response`][WebRequest::get_response].
//!
//! Each physical attempt goes through the same steps:
//!
//! * **Connect** - next hop (proxy or target), `CONNECT` tunnel and TLS for
//!   secure targets, see [`net`](crate::net).
//! * **Send** - request line, headers and body.
//! * **Receive** - response head, then the [`Controller`] decides.
//!
//! ```text
//!          ┌──────────────────┐
//!     ┌───▶│     Connect      │
//!     │    └──────────────────┘
//!     │              │
//!     │              ▼
//!     │    ┌──────────────────┐
//!     │    │       Send       │
//!     │    └──────────────────┘
//!     │              │
//!     │              ▼
//!     │    ┌──────────────────┐
//!     │    │     Receive      │◀──┐ Interim (1xx)
//!     │    └──────────────────┘───┘
//!     │              │
//!     │     Resend   ▼   Final
//!     └───────── Controller ──────▶ Response
//! ```
//!
//! Redirects rebind the request to the new uri, authentication challenges
//! install `authorization` (or `proxy-authorization`) and the loop runs
//! again on a fresh connection. The controller bounds both, so the loop
//! always ends with a response.

use std::fmt;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use http::{header, Method, Uri, Version};

use crate::auth::{AuthRegistry, CredentialSource};
use crate::body::BodyMode;
use crate::config::{Config, RedirectAuthHeaders};
use crate::ext::{AuthorityExt, MethodExt, UriExt};
use crate::headers::HeaderCollection;
use crate::net::{self, Connection, Connector, Route, TcpConnector, TlsProvider};
use crate::parser::read_response_head;
use crate::proxy::ProxySelector;
use crate::util::{log_data, Deadline};
use crate::Error;

mod controller;
pub use controller::{AuthState, Controller, RequestControl, Verdict};

mod stream;
pub use stream::RequestStream;
use stream::{Framing, RequestHead};

mod response;
pub use response::Response;

mod handle;
pub use handle::{AbortHandle, ResponseHandle};

#[cfg(test)]
mod test;

/// The collaborators a request talks to.
#[derive(Clone)]
pub struct Services {
    /// Opens plain connections.
    pub connector: Arc<dyn Connector>,
    /// TLS for secure targets. `None` makes `https` requests fail with
    /// [`Error::NotSupported`].
    pub tls: Option<Arc<dyn TlsProvider>>,
    /// Authentication modules answering challenges.
    pub auth: Arc<AuthRegistry>,
}

impl Default for Services {
    /// System resolver, TCP, rustls (if enabled) and Basic authentication.
    fn default() -> Self {
        Services {
            connector: Arc::new(TcpConnector::default()),
            tls: default_tls(),
            auth: Arc::new(AuthRegistry::default()),
        }
    }
}

#[cfg(feature = "rustls")]
fn default_tls() -> Option<Arc<dyn TlsProvider>> {
    use std::sync::OnceLock;

    static TLS: OnceLock<Option<Arc<dyn TlsProvider>>> = OnceLock::new();

    TLS.get_or_init(|| match crate::net::RustlsProvider::new() {
        Ok(v) => Some(Arc::new(v)),
        Err(e) => {
            warn!("TLS not available: {}", e);
            None
        }
    })
    .clone()
}

#[cfg(not(feature = "rustls"))]
fn default_tls() -> Option<Arc<dyn TlsProvider>> {
    None
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services")
            .field("tls", &self.tls.is_some())
            .field("auth", &self.auth)
            .finish_non_exhaustive()
    }
}

/// One logical HTTP operation.
///
/// Holds the request configuration, and once sent, the state of the
/// redirect and authentication loop.
pub struct WebRequest {
    original_uri: Uri,
    uri: Uri,
    method: Method,
    version: Version,
    headers: HeaderCollection,
    content_length: Option<u64>,
    send_chunked: bool,
    credentials: Option<Arc<dyn CredentialSource>>,
    proxy: Option<Arc<dyn ProxySelector>>,
    config: Config,
    services: Services,

    phase: Phase,
    deadline: Deadline,
    controller: Controller,
    authorization: Option<String>,
    proxy_authorization: Option<String>,
    stream: Option<RequestStream>,
    body: Body,
    abort: AbortHandle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Configuring,
    HeadersSent,
    ResponseTaken,
    Failed,
}

/// The request body as far as resending is concerned.
#[derive(Debug)]
enum Body {
    None,
    Replayable(Vec<u8>),
    Streamed,
}

impl WebRequest {
    /// Request for `uri` with default configuration and services.
    pub fn new(uri: &str) -> Result<Self, Error> {
        WebRequest::with_services(uri, Config::default(), Services::default())
    }

    /// Request for `uri` with the given configuration.
    pub fn with_config(uri: &str, config: Config) -> Result<Self, Error> {
        WebRequest::with_services(uri, config, Services::default())
    }

    /// Request for `uri` with the given configuration and collaborators.
    pub fn with_services(uri: &str, config: Config, services: Services) -> Result<Self, Error> {
        let uri: Uri = uri
            .parse()
            .map_err(|e| Error::BadUri(format!("{}: {}", uri, e)))?;

        if !matches!(uri.scheme_str(), Some("http") | Some("https")) {
            return Err(Error::BadUri(format!("{} is not http or https", uri)));
        }
        uri.bare_host()?;

        Ok(WebRequest {
            original_uri: uri.clone(),
            uri,
            method: Method::GET,
            version: Version::HTTP_11,
            headers: HeaderCollection::restricted(),
            content_length: None,
            send_chunked: false,
            credentials: None,
            proxy: None,
            config,
            services,
            phase: Phase::Configuring,
            deadline: Deadline::NONE,
            controller: Controller::new(),
            authorization: None,
            proxy_authorization: None,
            stream: None,
            body: Body::None,
            abort: AbortHandle::default(),
        })
    }

    /// The uri the request was created with.
    pub fn original_uri(&self) -> &Uri {
        &self.original_uri
    }

    /// The current uri, which changes when redirects are followed.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Method of the request.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Set the method. Only GET, HEAD, POST, PUT, DELETE, TRACE and OPTIONS.
    ///
    /// Ranges added with [`add_range`][WebRequest::add_range] are dropped
    /// when the method is no longer GET.
    pub fn set_method(&mut self, method: &str) -> Result<(), Error> {
        self.check_not_sent()?;
        let m = Method::from_bytes(method.as_bytes())
            .ok()
            .filter(|m| m.is_supported())
            .ok_or_else(|| Error::InvalidMethod(method.to_string()))?;
        if m != Method::GET && self.headers.contains(header::RANGE.as_str()) {
            debug!("Drop range for {}", m);
            self.headers.remove_raw("Range");
        }
        self.method = m;
        Ok(())
    }

    /// Protocol version.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Set the protocol version, HTTP/1.0 or HTTP/1.1.
    pub fn set_version(&mut self, version: Version) -> Result<(), Error> {
        self.check_not_sent()?;
        if version != Version::HTTP_10 && version != Version::HTTP_11 {
            return Err(Error::UnsupportedVersion);
        }
        self.version = version;
        Ok(())
    }

    /// The request headers set so far.
    ///
    /// Protocol headers like `host` and `content-length` are added when the
    /// request is sent and do not show here.
    pub fn headers(&self) -> &HeaderCollection {
        &self.headers
    }

    /// Mutable access to the request headers. Restricted names must be set
    /// through their setters, like [`set_accept`][WebRequest::set_accept].
    pub fn headers_mut(&mut self) -> Result<&mut HeaderCollection, Error> {
        self.check_not_sent()?;
        Ok(&mut self.headers)
    }

    /// Declared length of the request body.
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// Declare the length of the request body. The body is then written
    /// straight to the connection instead of being buffered.
    pub fn set_content_length(&mut self, length: u64) -> Result<(), Error> {
        self.check_not_sent()?;
        self.content_length = Some(length);
        Ok(())
    }

    /// Credentials used to answer authentication challenges.
    pub fn set_credentials(&mut self, credentials: Option<Arc<dyn CredentialSource>>) {
        self.credentials = credentials;
    }

    /// The proxy selector, if any.
    pub fn proxy(&self) -> Option<&Arc<dyn ProxySelector>> {
        self.proxy.as_ref()
    }

    /// Send the request through a proxy.
    pub fn set_proxy(&mut self, proxy: Option<Arc<dyn ProxySelector>>) -> Result<(), Error> {
        self.check_not_sent()?;
        self.proxy = proxy;
        Ok(())
    }

    /// The configuration of this request.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Bound the whole operation. `None` waits forever.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.config.timeout = timeout;
    }

    /// Max number of redirects to follow, must be above zero.
    pub fn set_max_redirects(&mut self, max: u32) -> Result<(), Error> {
        if max == 0 {
            return Err(Error::InvalidArgument("max redirects must be above zero"));
        }
        self.config.max_redirects = max;
        Ok(())
    }

    /// Follow redirects automatically.
    pub fn set_allow_auto_redirect(&mut self, v: bool) {
        self.config.allow_auto_redirect = v;
    }

    /// Send authorization before any challenge.
    pub fn set_pre_authenticate(&mut self, v: bool) {
        self.config.pre_authenticate = v;
    }

    /// Ask the server to keep the connection open.
    pub fn set_keep_alive(&mut self, v: bool) -> Result<(), Error> {
        self.check_not_sent()?;
        self.config.keep_alive = v;
        Ok(())
    }

    /// Hold a body of unknown length in memory to compute `content-length`.
    pub fn set_allow_write_stream_buffering(&mut self, v: bool) -> Result<(), Error> {
        self.check_not_sent()?;
        self.config.allow_write_stream_buffering = v;
        Ok(())
    }

    /// When to keep `authorization` on redirect.
    pub fn set_redirect_auth_headers(&mut self, v: RedirectAuthHeaders) {
        self.config.redirect_auth_headers = v;
    }

    /// Tell if the body is sent with `transfer-encoding: chunked`.
    pub fn send_chunked(&self) -> bool {
        self.send_chunked
    }

    /// Send the body with `transfer-encoding: chunked`.
    pub fn set_send_chunked(&mut self, v: bool) -> Result<(), Error> {
        self.check_not_sent()?;
        self.send_chunked = v;
        Ok(())
    }

    /// Set `accept`. Empty removes it.
    pub fn set_accept(&mut self, v: &str) -> Result<(), Error> {
        self.set_restricted("Accept", v)
    }

    /// Set `content-type`. Empty removes it.
    pub fn set_content_type(&mut self, v: &str) -> Result<(), Error> {
        self.set_restricted("Content-Type", v)
    }

    /// Set `referer`. Empty removes it.
    pub fn set_referer(&mut self, v: &str) -> Result<(), Error> {
        self.set_restricted("Referer", v)
    }

    /// Set `user-agent`. Empty sends none.
    pub fn set_user_agent(&mut self, v: &str) -> Result<(), Error> {
        self.check_not_sent()?;
        let v = v.trim();
        if !v.is_empty() {
            http::HeaderValue::from_str(v)
                .map_err(|_| Error::InvalidHeader(format!("bad user agent: {:?}", v)))?;
        }
        self.config.user_agent = v.to_string();
        Ok(())
    }

    /// Set `connection` to `keep-alive` or `close`. Empty removes it.
    pub fn set_connection(&mut self, v: &str) -> Result<(), Error> {
        let v = v.trim().to_ascii_lowercase();
        if !v.is_empty() && v != "keep-alive" && v != "close" {
            return Err(Error::InvalidArgument("connection must be keep-alive or close"));
        }
        self.set_restricted("Connection", &v)
    }

    /// Set `expect`. `100-continue` is not allowed. Empty removes it.
    pub fn set_expect(&mut self, v: &str) -> Result<(), Error> {
        if v.trim().eq_ignore_ascii_case("100-continue") {
            return Err(Error::InvalidArgument("expect cannot be 100-continue"));
        }
        self.set_restricted("Expect", v)
    }

    /// Set transfer codings applied before `chunked`, e.g. `gzip`.
    ///
    /// Requires [`set_send_chunked`][WebRequest::set_send_chunked]. `chunked`
    /// itself is added by the request. Empty removes it.
    pub fn set_transfer_encoding(&mut self, v: &str) -> Result<(), Error> {
        self.check_not_sent()?;
        if !self.send_chunked {
            return Err(Error::InvalidArgument("transfer encoding requires send chunked"));
        }
        if v.trim().eq_ignore_ascii_case("chunked") {
            return Err(Error::InvalidArgument("transfer encoding cannot be chunked"));
        }
        self.set_restricted("Transfer-Encoding", v)
    }

    /// Add a byte range `from..=to` (or `from..` without `to`) to `range`.
    /// Only for GET.
    pub fn add_range(&mut self, from: u64, to: Option<u64>) -> Result<(), Error> {
        self.check_not_sent()?;

        if self.method != Method::GET {
            return Err(Error::InvalidArgument("range requires GET"));
        }

        let span = match to {
            Some(to) if to < from => return Err(Error::InvalidArgument("range end before start")),
            Some(to) => format!("{}-{}", from, to),
            None => format!("{}-", from),
        };

        let value = match self.headers.get(header::RANGE.as_str()) {
            Some(prev) => format!("{},{}", prev, span),
            None => format!("bytes={}", span),
        };

        self.headers.set_raw("Range", &value)
    }

    /// Handle to abort this request from another thread.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Abort the request. The connection is shut down and every later
    /// operation fails with [`Error::Aborted`].
    pub fn abort(&mut self) {
        self.abort.abort();
        self.stream = None;
    }

    /// Redirect and authentication state so far.
    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    /// Open the connection and get the writer for the request body.
    ///
    /// Only POST and PUT send a body. Calling this again returns the same
    /// writer.
    pub fn request_stream(&mut self) -> Result<&mut RequestStream, Error> {
        self.check_usable()?;

        if !self.method.can_send_body() {
            return Err(Error::MethodCannotSendBody(self.method.clone()));
        }

        if self.stream.is_none() {
            let opened = self.open_stream();
            self.settle(opened)?;
        }

        self.stream.as_mut().ok_or(Error::ResponseAlreadyTaken)
    }

    /// Send the request (if not already sent), follow redirects and answer
    /// challenges, and return the final response.
    ///
    /// An open request stream is closed first. The response may have any
    /// status code.
    pub fn get_response(&mut self) -> Result<Response, Error> {
        self.check_usable()?;
        let response = self.exchange();
        self.settle(response)
    }

    /// Run [`get_response`][WebRequest::get_response] on a worker thread.
    pub fn begin_get_response(self) -> Result<ResponseHandle, Error> {
        ResponseHandle::spawn(self)
    }

    /// Connect, send the head and keep the body writer.
    fn open_stream(&mut self) -> Result<(), Error> {
        let framing = self.body_framing()?;
        self.start();

        let conn = self.connect()?;
        let head = self.build_head(framing)?;
        self.phase = Phase::HeadersSent;

        let stream = RequestStream::open(head, conn, framing);
        let stream = self.guard(stream)?;

        self.body = if framing == Framing::Buffered {
            Body::Replayable(Vec::new())
        } else {
            Body::Streamed
        };

        self.stream = Some(stream);
        Ok(())
    }

    fn exchange(&mut self) -> Result<Response, Error> {
        // POST and PUT always send a body, even if nobody wrote one.
        if self.method.can_send_body() && self.stream.is_none() {
            self.request_stream()?;
        }

        self.start();

        let mut conn = match self.stream.take() {
            Some(mut stream) => {
                let closed = stream.close();
                self.guard(closed)?;
                let (conn, replay) = stream.finish();
                if let Some(replay) = replay {
                    self.body = Body::Replayable(replay);
                }
                conn
            }
            None => self.send()?,
        };

        self.phase = Phase::HeadersSent;

        loop {
            let head = conn
                .apply_deadline(&self.deadline)
                .and_then(|_| read_response_head(&mut conn));
            let head = self.guard(head)?;

            let mut controller = std::mem::take(&mut self.controller);
            let verdict = controller.evaluate(self, &head);
            self.controller = controller;

            match verdict {
                Verdict::Interim => continue,
                Verdict::Final => {
                    let mode = BodyMode::for_response(&self.method, &head)?;
                    self.phase = Phase::ResponseTaken;
                    return Ok(Response::new(head, self.uri.clone(), mode, conn));
                }
                Verdict::Resend => {
                    conn = self.send()?;
                }
            }
        }
    }

    /// A failure after anything went on the wire ends the request.
    fn settle<T>(&mut self, result: Result<T, Error>) -> Result<T, Error> {
        if result.is_err() && self.phase == Phase::HeadersSent {
            debug!("Request to {} failed after send", self.uri);
            self.phase = Phase::Failed;
            self.stream = None;
        }
        result
    }

    /// Set up the operation state once.
    fn start(&mut self) {
        if self.phase != Phase::Configuring {
            return;
        }

        self.deadline = Deadline::after(self.config.timeout);

        if self.config.pre_authenticate {
            if let Some(credentials) = &self.credentials {
                let auth = self
                    .services
                    .auth
                    .pre_authenticate(&self.uri, credentials.as_ref());
                if let Some(auth) = auth {
                    debug!("Pre-authenticate {}", self.uri);
                    self.authorization = Some(auth);
                    self.controller = Controller::pre_authenticated();
                }
            }
        }
    }

    /// Connect and send the whole request, for requests without an open
    /// stream and for every resend.
    fn send(&mut self) -> Result<Connection, Error> {
        let mut conn = self.connect()?;

        let (framing, body) = match &self.body {
            Body::Replayable(b) => (Framing::Length(b.len() as u64), Some(b.as_slice())),
            _ => (Framing::None, None),
        };

        let head = self.build_head(framing)?;

        let mut out = head.to_bytes();
        log_data(&out);
        if let Some(body) = body {
            out.extend_from_slice(body);
        }

        let sent = conn.write_all(&out).and_then(|_| conn.flush());
        self.guard(sent.map_err(Error::from))?;

        Ok(conn)
    }

    fn connect(&self) -> Result<Connection, Error> {
        self.check_aborted()?;

        let proxy = self.next_proxy();
        let tunnel_auth = match &proxy {
            Some(_) if self.uri.is_secure() => self.proxy_authorization_value(),
            _ => None,
        };

        let route = Route {
            target: &self.uri,
            proxy: proxy.as_ref(),
            proxy_authorization: tunnel_auth.as_deref(),
            version: self.version,
        };

        let conn = net::establish(
            self.services.connector.as_ref(),
            self.services.tls.as_deref(),
            &route,
            self.deadline,
        );
        let conn = self.guard(conn)?;

        self.abort.watch(conn.socket_handle())?;

        Ok(conn)
    }

    fn next_proxy(&self) -> Option<Uri> {
        self.proxy.as_ref().and_then(|p| p.proxy_for(&self.uri))
    }

    /// `proxy-authorization` from a challenge, or pre-authenticated from
    /// the proxy credentials.
    fn proxy_authorization_value(&self) -> Option<String> {
        if let Some(v) = &self.proxy_authorization {
            return Some(v.clone());
        }

        let credential = self.proxy.as_ref()?.credentials()?;
        self.services.auth.pre_authenticate(&self.uri, credential)
    }

    fn body_framing(&self) -> Result<Framing, Error> {
        if self.send_chunked {
            return Ok(Framing::Chunked);
        }

        if let Some(len) = self.content_length {
            return Ok(Framing::Length(len));
        }

        if self.config.allow_write_stream_buffering {
            Ok(Framing::Buffered)
        } else {
            Err(Error::ContentLengthRequired)
        }
    }

    fn build_head(&self, framing: Framing) -> Result<RequestHead, Error> {
        let proxy = self.next_proxy();
        let plain_proxy = proxy.is_some() && !self.uri.is_secure();

        let target = if plain_proxy {
            self.uri.absolute_form()?
        } else {
            self.uri.origin_form().to_string()
        };

        let mut headers = HeaderCollection::restricted();
        headers.add_raw("Host", &self.uri.host_header()?)?;

        if !self.config.user_agent.is_empty() {
            headers.add_raw("User-Agent", &self.config.user_agent)?;
        }

        for (name, value) in self.headers.iter() {
            // Codings only mean something in front of chunked.
            if framing != Framing::Chunked && name.eq_ignore_ascii_case("transfer-encoding") {
                continue;
            }
            headers.add_parsed(name, value.as_bytes())?;
        }

        if !self.config.keep_alive && !headers.contains(header::CONNECTION.as_str()) {
            headers.add_raw("Connection", "close")?;
        }

        match framing {
            Framing::Length(n) => headers.set_raw("Content-Length", &n.to_string())?,
            Framing::Chunked => {
                let value = match self.headers.get(header::TRANSFER_ENCODING.as_str()) {
                    Some(codings) => format!("{}, chunked", codings),
                    None => "chunked".to_string(),
                };
                headers.set_raw("Transfer-Encoding", &value)?;
            }
            Framing::None | Framing::Buffered => {}
        }

        if let Some(auth) = self.authorization.clone().or_else(|| self.userinfo_auth()) {
            headers.set_raw("Authorization", &auth)?;
        }

        if plain_proxy {
            let auth = match &self.proxy_authorization {
                Some(v) => Some(v.clone()),
                // Only requests with a side effect get it up front.
                None if !self.method.is_followable() => self.proxy_authorization_value(),
                None => None,
            };
            if let Some(auth) = auth {
                headers.set_raw("Proxy-Authorization", &auth)?;
            }
        }

        Ok(RequestHead {
            method: self.method.clone(),
            target,
            version: self.version,
            headers,
        })
    }

    /// Basic authorization from `user:password@` in the uri.
    fn userinfo_auth(&self) -> Option<String> {
        let authority = self.uri.authority()?;
        authority.userinfo()?;
        let user = authority.username().unwrap_or_default();
        let pass = authority.password().unwrap_or_default();
        let creds = BASE64_STANDARD.encode(format!("{}:{}", user, pass));
        Some(format!("Basic {}", creds))
    }

    fn set_restricted(&mut self, name: &str, value: &str) -> Result<(), Error> {
        self.check_not_sent()?;
        if value.trim().is_empty() {
            self.headers.remove_raw(name);
            Ok(())
        } else {
            self.headers.set_raw(name, value)
        }
    }

    fn check_not_sent(&self) -> Result<(), Error> {
        if self.phase != Phase::Configuring {
            return Err(Error::HeadersAlreadySent);
        }
        Ok(())
    }

    fn check_usable(&self) -> Result<(), Error> {
        self.check_aborted()?;
        match self.phase {
            Phase::ResponseTaken => Err(Error::ResponseAlreadyTaken),
            Phase::Failed => Err(Error::RequestFailed),
            _ => Ok(()),
        }
    }

    fn check_aborted(&self) -> Result<(), Error> {
        if self.abort.is_aborted() {
            return Err(Error::Aborted);
        }
        Ok(())
    }

    /// Errors after an abort are reported as [`Error::Aborted`].
    fn guard<T>(&self, result: Result<T, Error>) -> Result<T, Error> {
        match result {
            Err(_) if self.abort.is_aborted() => Err(Error::Aborted),
            r => r,
        }
    }
}

impl RequestControl for WebRequest {
    fn method(&self) -> &Method {
        &self.method
    }

    fn uri(&self) -> &Uri {
        &self.uri
    }

    fn allow_auto_redirect(&self) -> bool {
        self.config.allow_auto_redirect
    }

    fn max_redirects(&self) -> u32 {
        self.config.max_redirects
    }

    fn reset_body(&mut self) -> bool {
        !matches!(self.body, Body::Streamed)
    }

    fn add_auth_headers(&mut self, challenge: &str) -> bool {
        let Some(credentials) = &self.credentials else {
            return false;
        };

        let auth = self
            .services
            .auth
            .authenticate(challenge, &self.uri, credentials.as_ref());

        match auth {
            Some(v) => {
                self.authorization = Some(v);
                true
            }
            None => false,
        }
    }

    fn add_proxy_auth_headers(&mut self, challenge: &str) -> bool {
        let Some(proxy) = &self.proxy else {
            return false;
        };
        let Some(credential) = proxy.credentials() else {
            return false;
        };

        let auth = self
            .services
            .auth
            .authenticate(challenge, &self.uri, credential);

        match auth {
            Some(v) => {
                self.proxy_authorization = Some(v);
                true
            }
            None => false,
        }
    }

    fn redirect_to(&mut self, uri: Uri) -> Result<(), Error> {
        let keep_auth = self.config.redirect_auth_headers.keeps_auth(&self.uri, &uri);

        let uri = if keep_auth {
            uri
        } else {
            self.authorization = None;
            uri.without_userinfo()?
        };

        self.uri = uri;
        Ok(())
    }
}

impl fmt::Debug for WebRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebRequest")
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("version", &self.version)
            .field("phase", &self.phase)
            .field("controller", &self.controller)
            .finish_non_exhaustive()
    }
}
