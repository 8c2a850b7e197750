//! Route guarding over an explicit session context.
//!
//! Nothing here reads ambient state: whoever handles a request builds a
//! [`SessionContext`] and asks the [`RouteGuard`] what to do with it.

use std::fmt;

/// Cookie that carries the session token.
pub const AUTH_COOKIE: &str = "auth_token";

#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    /// Returns `None` for blank tokens, which count as no session at all.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            None
        } else {
            Some(Self(raw))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

// keep tokens out of logs
impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(..)")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    token: Option<SessionToken>,
}

impl SessionContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_token(token: SessionToken) -> Self {
        Self { token: Some(token) }
    }

    /// Reads [`AUTH_COOKIE`] out of a `Cookie` request header value.
    pub fn from_cookie_header(header: &str) -> Self {
        let token = header
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| name.trim() == AUTH_COOKIE)
            .and_then(|(_, value)| SessionToken::new(value.trim()));
        Self { token }
    }

    pub fn token(&self) -> Option<&SessionToken> {
        self.token.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Proceed,
    Redirect(String),
}

#[derive(Debug, Clone)]
pub struct RouteGuard {
    pub protected_prefix: String,
    pub login_path: String,
    pub home_path: String,
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self {
            protected_prefix: "/dashboard".to_owned(),
            login_path: "/login".to_owned(),
            home_path: "/dashboard".to_owned(),
        }
    }
}

impl RouteGuard {
    pub fn decide(&self, path: &str, session: &SessionContext) -> GuardDecision {
        let authenticated = session.is_authenticated();
        if !authenticated && path.starts_with(&self.protected_prefix) {
            GuardDecision::Redirect(self.login_path.clone())
        } else if authenticated && path == self.login_path {
            GuardDecision::Redirect(self.home_path.clone())
        } else {
            GuardDecision::Proceed
        }
    }
}
