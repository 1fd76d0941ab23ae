//! Decides what happens after each response.
//!
//! The [`Controller`] sees every response head of one logical operation and
//! returns a [`Verdict`]. It keeps the authentication state for the proxy and
//! the origin server and counts redirects, so every retry loop terminates.

use http::{header, Method, StatusCode, Uri};

use crate::ext::{MethodExt, StatusExt, UriExt};
use crate::parser::ResponseHead;
use crate::Error;

/// Progress of authentication against one party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthState {
    /// No challenge seen.
    #[default]
    NoAuth,
    /// Credentials sent, waiting to see whether they are accepted.
    Trying,
    /// Credentials accepted.
    Ok,
    /// Gave up, the last challenge response is final.
    Failed,
}

/// What to do with a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Informational response. Read the next response on the same connection.
    Interim,
    /// Hand this response to the caller.
    Final,
    /// The request was changed, send it again on a new connection.
    Resend,
}

/// The request side as seen by the [`Controller`].
pub trait RequestControl {
    /// Method of the request.
    fn method(&self) -> &Method;

    /// Current target of the request.
    fn uri(&self) -> &Uri;

    /// Whether redirects are followed at all.
    fn allow_auto_redirect(&self) -> bool;

    /// Max number of redirects to follow.
    fn max_redirects(&self) -> u32;

    /// Prepare the body to be sent again. False if it cannot be replayed.
    fn reset_body(&mut self) -> bool;

    /// Install `authorization` answering `challenge`. False if there is
    /// nothing to answer with.
    fn add_auth_headers(&mut self, challenge: &str) -> bool;

    /// Install `proxy-authorization` answering `challenge`.
    fn add_proxy_auth_headers(&mut self, challenge: &str) -> bool;

    /// Point the request at `uri`.
    fn redirect_to(&mut self, uri: Uri) -> Result<(), Error>;
}

/// Redirect and authentication state of one logical operation.
#[derive(Debug, Default, Clone)]
pub struct Controller {
    proxy: AuthState,
    origin: AuthState,
    redirects: u32,
}

#[derive(Debug, Clone, Copy)]
enum Party {
    Proxy,
    Origin,
}

impl Controller {
    /// Fresh state.
    pub fn new() -> Self {
        Controller::default()
    }

    /// State for a request that sent authorization before any challenge.
    pub fn pre_authenticated() -> Self {
        Controller {
            origin: AuthState::Trying,
            ..Default::default()
        }
    }

    /// Authentication state against the proxy.
    pub fn proxy_auth(&self) -> AuthState {
        self.proxy
    }

    /// Authentication state against the origin server.
    pub fn origin_auth(&self) -> AuthState {
        self.origin
    }

    /// Number of redirects followed so far.
    pub fn redirects(&self) -> u32 {
        self.redirects
    }

    /// Decide what to do with `head`, the response to `request`.
    ///
    /// On [`Verdict::Resend`], `request` has already been changed.
    pub fn evaluate<R>(&mut self, request: &mut R, head: &ResponseHead) -> Verdict
    where
        R: RequestControl + ?Sized,
    {
        let status = head.status;

        let verdict = if status.is_interim() {
            Verdict::Interim
        } else if status.is_success() {
            self.promote();
            Verdict::Final
        } else if status == StatusCode::PROXY_AUTHENTICATION_REQUIRED {
            self.challenge(Party::Proxy, request, head)
        } else if status.is_origin_challenge() {
            self.challenge(Party::Origin, request, head)
        } else if status.is_followable_redirect() {
            self.redirect(request, head)
        } else {
            Verdict::Final
        };

        debug!("{} {} -> {:?}", status, request.uri(), verdict);

        verdict
    }

    fn promote(&mut self) {
        for state in [&mut self.proxy, &mut self.origin] {
            if *state == AuthState::Trying {
                *state = AuthState::Ok;
            }
        }
    }

    fn challenge<R>(&mut self, party: Party, request: &mut R, head: &ResponseHead) -> Verdict
    where
        R: RequestControl + ?Sized,
    {
        let (state, header) = match party {
            Party::Proxy => (&mut self.proxy, header::PROXY_AUTHENTICATE),
            Party::Origin => (&mut self.origin, header::WWW_AUTHENTICATE),
        };

        // The same challenge again means the credentials were refused.
        if matches!(*state, AuthState::Trying | AuthState::Failed) {
            *state = AuthState::Failed;
            return Verdict::Final;
        }

        let challenges: Vec<&str> = head
            .headers
            .get_all(header.as_str())
            .filter_map(|v| v.to_str().ok())
            .collect();

        if challenges.is_empty() {
            debug!("{:?} challenge without {}", party, header);
            *state = AuthState::Failed;
            return Verdict::Final;
        }

        if !request.reset_body() {
            warn!("Request body cannot be resent, not answering {:?} challenge", party);
            *state = AuthState::Failed;
            return Verdict::Final;
        }

        let answered = challenges.iter().any(|c| match party {
            Party::Proxy => request.add_proxy_auth_headers(c),
            Party::Origin => request.add_auth_headers(c),
        });

        if answered {
            *state = AuthState::Trying;
            Verdict::Resend
        } else {
            *state = AuthState::Failed;
            Verdict::Final
        }
    }

    fn redirect<R>(&mut self, request: &mut R, head: &ResponseHead) -> Verdict
    where
        R: RequestControl + ?Sized,
    {
        if !request.allow_auto_redirect() || !request.method().is_followable() {
            return Verdict::Final;
        }

        if self.redirects >= request.max_redirects() {
            debug!("Not following more than {} redirects", self.redirects);
            return Verdict::Final;
        }

        let Some(location) = head.headers.get(header::LOCATION.as_str()) else {
            return Verdict::Final;
        };

        let uri = match request.uri().resolve_location(location) {
            Ok(v) => v,
            Err(e) => {
                warn!("Not following redirect: {}", e);
                return Verdict::Final;
            }
        };

        if !request.reset_body() {
            return Verdict::Final;
        }

        debug!("Redirect to {}", uri);

        if let Err(e) = request.redirect_to(uri) {
            warn!("Not following redirect: {}", e);
            return Verdict::Final;
        }

        self.redirects += 1;
        Verdict::Resend
    }
}
