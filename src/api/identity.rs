//! Identity extraction from request headers
//!
//! The auth provider sits in front of this service and forwards the
//! verified user id in `x-user-id`. Guests add `x-user-anonymous: true`.

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::session::Identity;
use crate::{Error, Result};

/// Header carrying the signed-in user's id
pub const USER_ID_HEADER: &str = "x-user-id";

/// Header flagging a guest sign-in
pub const ANONYMOUS_HEADER: &str = "x-user-anonymous";

/// Identity of the caller, if any
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Option<Identity>);

impl CurrentUser {
    /// The identity, or `Error::Unauthenticated`
    ///
    /// # Errors
    ///
    /// Returns `Error::Unauthenticated` when no identity header was sent
    pub fn require(self) -> Result<Identity> {
        self.0.ok_or(Error::Unauthenticated)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> std::result::Result<Self, Self::Rejection> {
        let uid = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        let anonymous = parts
            .headers
            .get(ANONYMOUS_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));

        Ok(Self(uid.map(|uid| Identity {
            uid: uid.to_string(),
            anonymous,
        })))
    }
}
