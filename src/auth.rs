//! Credentials and pluggable authentication modules.
//!
//! An [`AuthRegistry`] holds at most one [`AuthModule`] per scheme. Given a
//! server challenge such as `Basic realm="x"`, the registry picks the module
//! for the scheme, asks a [`CredentialSource`] for a credential and lets the
//! module produce the value for the `Authorization` (or
//! `Proxy-Authorization`) header.

use std::fmt;
use std::sync::{Arc, RwLock};

use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use http::Uri;

/// User name, password and optional domain.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    /// User name.
    pub username: String,
    /// Password.
    pub password: String,
    /// Domain, empty if none.
    pub domain: String,
}

impl Credential {
    /// Credential without a domain.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credential {
            username: username.into(),
            password: password.into(),
            domain: String::new(),
        }
    }

    /// Set the domain.
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("domain", &self.domain)
            .finish_non_exhaustive()
    }
}

/// Source of credentials for a target and authentication scheme.
pub trait CredentialSource: Send + Sync {
    /// Credential to use against `target` with `scheme`, e.g. `"Basic"`.
    fn credential(&self, target: &Uri, scheme: &str) -> Option<Credential>;
}

/// A single credential is used for every target and scheme.
impl CredentialSource for Credential {
    fn credential(&self, _target: &Uri, _scheme: &str) -> Option<Credential> {
        Some(self.clone())
    }
}

/// Credentials keyed by uri prefix and scheme.
///
/// The entry with the longest matching prefix wins.
#[derive(Debug, Default)]
pub struct CredentialCache {
    entries: Vec<(String, String, Credential)>,
}

impl CredentialCache {
    /// Empty cache.
    pub fn new() -> Self {
        CredentialCache::default()
    }

    /// Add a credential for every uri starting with `prefix`. An existing
    /// entry for the same prefix and scheme is replaced.
    pub fn add(&mut self, prefix: &str, scheme: &str, credential: Credential) {
        self.remove(prefix, scheme);
        self.entries
            .push((prefix.to_string(), scheme.to_string(), credential));
    }

    /// Remove the credential for `prefix` and `scheme`.
    pub fn remove(&mut self, prefix: &str, scheme: &str) {
        self.entries
            .retain(|(p, s, _)| !(p == prefix && s.eq_ignore_ascii_case(scheme)));
    }
}

impl CredentialSource for CredentialCache {
    fn credential(&self, target: &Uri, scheme: &str) -> Option<Credential> {
        let target = target.to_string();
        self.entries
            .iter()
            .filter(|(p, s, _)| s.eq_ignore_ascii_case(scheme) && target.starts_with(p.as_str()))
            .max_by_key(|(p, _, _)| p.len())
            .map(|(_, _, c)| c.clone())
    }
}

/// An authentication scheme implementation.
pub trait AuthModule: Send + Sync {
    /// Scheme name as it appears in challenges, e.g. `"Basic"`.
    fn scheme(&self) -> &str;

    /// Tell if this module can produce an authorization before any challenge.
    fn can_pre_authenticate(&self) -> bool;

    /// Answer `challenge` for a request to `target`.
    fn authenticate(&self, challenge: &str, target: &Uri, credential: &Credential) -> Option<String>;

    /// Produce an authorization without a challenge.
    fn pre_authenticate(&self, target: &Uri, credential: &Credential) -> Option<String>;
}

/// The `Basic` scheme, `Basic base64(user[:domain]:password)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct BasicAuth;

impl BasicAuth {
    fn token(credential: &Credential) -> String {
        let plain = if credential.domain.is_empty() {
            format!("{}:{}", credential.username, credential.password)
        } else {
            format!(
                "{}:{}:{}",
                credential.username, credential.domain, credential.password
            )
        };
        format!("Basic {}", BASE64_STANDARD.encode(plain))
    }
}

impl AuthModule for BasicAuth {
    fn scheme(&self) -> &str {
        "Basic"
    }

    fn can_pre_authenticate(&self) -> bool {
        true
    }

    fn authenticate(&self, challenge: &str, _target: &Uri, credential: &Credential) -> Option<String> {
        if !challenge_scheme(challenge).eq_ignore_ascii_case(self.scheme()) {
            return None;
        }
        Some(Self::token(credential))
    }

    fn pre_authenticate(&self, _target: &Uri, credential: &Credential) -> Option<String> {
        Some(Self::token(credential))
    }
}

/// Registered authentication modules, at most one per scheme.
pub struct AuthRegistry {
    modules: RwLock<Vec<Arc<dyn AuthModule>>>,
}

impl AuthRegistry {
    /// Registry without any modules.
    pub fn empty() -> Self {
        AuthRegistry {
            modules: RwLock::new(Vec::new()),
        }
    }

    /// Add `module`, replacing any module registered for the same scheme.
    pub fn register(&self, module: Arc<dyn AuthModule>) {
        let mut modules = self.modules.write().unwrap_or_else(|e| e.into_inner());
        modules.retain(|m| !m.scheme().eq_ignore_ascii_case(module.scheme()));
        debug!("Register auth module: {}", module.scheme());
        modules.push(module);
    }

    /// Remove the module for `scheme`. Returns whether there was one.
    pub fn unregister(&self, scheme: &str) -> bool {
        let mut modules = self.modules.write().unwrap_or_else(|e| e.into_inner());
        let before = modules.len();
        modules.retain(|m| !m.scheme().eq_ignore_ascii_case(scheme));
        before != modules.len()
    }

    /// Schemes of the registered modules, in registration order.
    pub fn schemes(&self) -> Vec<String> {
        self.read().iter().map(|m| m.scheme().to_string()).collect()
    }

    /// Produce an authorization value answering `challenge`.
    ///
    /// `None` when no module handles the scheme, or `credentials` has nothing
    /// for it. That's not an error, the caller decides whether to give up.
    pub fn authenticate(
        &self,
        challenge: &str,
        target: &Uri,
        credentials: &dyn CredentialSource,
    ) -> Option<String> {
        let scheme = challenge_scheme(challenge);

        let Some(credential) = credentials.credential(target, scheme) else {
            debug!("No credential for {} scheme {}", target, scheme);
            return None;
        };

        self.read()
            .iter()
            .filter(|m| m.scheme().eq_ignore_ascii_case(scheme))
            .find_map(|m| m.authenticate(challenge, target, &credential))
    }

    /// Produce an authorization before any challenge, using modules that
    /// support it.
    pub fn pre_authenticate(&self, target: &Uri, credentials: &dyn CredentialSource) -> Option<String> {
        self.read()
            .iter()
            .filter(|m| m.can_pre_authenticate())
            .find_map(|m| {
                let credential = credentials.credential(target, m.scheme())?;
                m.pre_authenticate(target, &credential)
            })
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Arc<dyn AuthModule>>> {
        self.modules.read().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for AuthRegistry {
    /// Registry with [`BasicAuth`].
    fn default() -> Self {
        let registry = AuthRegistry::empty();
        registry.register(Arc::new(BasicAuth));
        registry
    }
}

impl fmt::Debug for AuthRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AuthRegistry").field(&self.schemes()).finish()
    }
}

/// The scheme of a challenge, i.e. everything up to the first space.
pub(crate) fn challenge_scheme(challenge: &str) -> &str {
    let challenge = challenge.trim();
    match challenge.find(' ') {
        Some(i) => &challenge[..i],
        None => challenge,
    }
}
