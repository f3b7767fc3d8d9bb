//! Request authentication: resolves the caller from a bearer token or the
//! `auth_token` cookie and stashes it in the request extensions.
use std::convert::Infallible;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::cookie::CookieJar;
use tracing::warn;

use service::auth::AuthUser;

use crate::state::ServerState;

pub const AUTH_COOKIE: &str = "auth_token";

fn bearer(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    scheme.eq_ignore_ascii_case("bearer").then(|| token.trim().to_string())
}

/// Header first, then cookie.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    bearer(headers).or_else(|| {
        CookieJar::from_headers(headers)
            .get(AUTH_COOKIE)
            .map(|c| c.value().to_string())
    })
}

/// Unknown or expired tokens leave the request anonymous; the permission
/// gate decides what that means.
pub async fn authenticate(State(state): State<ServerState>, mut req: Request, next: Next) -> Response {
    if let Some(token) = extract_token(req.headers()) {
        match state.auth.authenticate_token(&token).await {
            Ok(user) => {
                req.extensions_mut().insert(user);
            }
            Err(e) => warn!(code = e.code(), error = %e, "token rejected"),
        }
    }
    next.run(req).await
}

/// The authenticated caller, if any.
#[derive(Debug, Clone)]
pub struct Requester(pub Option<AuthUser>);

impl Requester {
    pub fn user(&self) -> Option<&AuthUser> {
        self.0.as_ref()
    }
}

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Requester {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Requester(parts.extensions.get::<AuthUser>().cloned()))
    }
}
