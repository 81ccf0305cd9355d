//! Caller identity resolution
//!
//! A verified bearer token wins. Otherwise, unless login is required, the
//! caller is identified by the peer address, then [`ANONYMOUS_IDENTITY`].
//! The first `X-Forwarded-For` address replaces the peer address only when
//! the resolver is told the server sits behind a trusted proxy.

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use providers::IdentityProvider;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::api::routes::AppState;
use crate::domain::ANONYMOUS_IDENTITY;

/// Resolves request identities
#[derive(Clone, Default)]
pub struct IdentityResolver {
    provider: Option<Arc<dyn IdentityProvider>>,
    require_login: bool,
    trust_forwarded_for: bool,
}

impl IdentityResolver {
    pub fn new(provider: Option<Arc<dyn IdentityProvider>>, require_login: bool) -> Self {
        Self {
            provider,
            require_login,
            trust_forwarded_for: false,
        }
    }

    /// Take the client address from `X-Forwarded-For` (proxy deployments only)
    pub fn with_trusted_forwarded_for(mut self, trust: bool) -> Self {
        self.trust_forwarded_for = trust;
        self
    }

    /// Resolve the caller, or `None` when login is required and missing
    pub async fn resolve(&self, headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
        if let Some(user_id) = self.verified_user(headers).await {
            return Some(user_id);
        }
        if self.require_login {
            return None;
        }

        let forwarded = headers
            .get("x-forwarded-for")
            .filter(|_| self.trust_forwarded_for)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        Some(
            forwarded
                .or_else(|| peer.map(|addr| addr.ip().to_string()))
                .unwrap_or_else(|| ANONYMOUS_IDENTITY.to_string()),
        )
    }

    async fn verified_user(&self, headers: &HeaderMap) -> Option<String> {
        let provider = self.provider.as_ref()?;
        let token = bearer_token(headers)?;
        match provider.user_id(token).await {
            Ok(user) => user,
            Err(err) => {
                tracing::warn!(error = %err, "Identity provider unavailable, treating caller as anonymous");
                None
            }
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Extracted caller identity; `None` when login is required and missing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestIdentity(pub Option<String>);

#[async_trait]
impl FromRequestParts<AppState> for RequestIdentity {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(Self(state.identity.resolve(&parts.headers, peer).await))
    }
}
