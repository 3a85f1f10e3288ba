use std::collections::HashSet;

use axum::http::{header, HeaderMap};

const SESSION_COOKIE: &str = "session";

/// Authenticated caller attached to request extensions by the session middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Short digest of the token, safe to log.
    pub subject: String,
}

impl Session {
    pub fn for_token(token: &str) -> Self {
        let digest = blake3::hash(token.as_bytes()).to_hex();
        Self {
            subject: digest.as_str()[..12].to_string(),
        }
    }
}

/// Decides whether a presented session token belongs to a signed-in user.
pub trait SessionVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Option<Session>;
}

/// Accepts a fixed set of tokens issued out of band.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenVerifier {
    tokens: HashSet<String>,
}

impl StaticTokenVerifier {
    pub fn new<I, T>(tokens: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl SessionVerifier for StaticTokenVerifier {
    fn verify(&self, token: &str) -> Option<Session> {
        self.tokens
            .contains(token)
            .then(|| Session::for_token(token))
    }
}

/// Token from `Authorization: Bearer ...`, falling back to the `session` cookie.
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());
    if bearer.is_some() {
        return bearer;
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim())
        .filter(|token| !token.is_empty())
}
