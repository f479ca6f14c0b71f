// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for the login layer.
//!
//! ```rust,ignore
//! async fn me(CurrentUser(user): CurrentUser) -> impl IntoResponse {
//!     Json(user.to_attributes())
//! }
//!
//! async fn login(manager: AuthManager, Query(form): Query<Credentials>) -> Result<&'static str, AuthError> {
//!     manager.authenticate(form, false).await?;
//!     Ok("Logged in")
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Response},
};

use super::context::RequestContext;
use super::error::AuthError;
use super::manager::{Access, AuthManager};
use super::principal::SharedPrincipal;

/// The request's principal.
///
/// Behind [`secured`](super::middleware::secured) this is the principal the
/// guard accepted. Elsewhere the guard policy runs on demand: unauthenticated
/// and forbidden principals are rejected with the configured responders.
///
/// In disabled mode nothing is checked and this holds the anonymous
/// principal.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub SharedPrincipal);

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Set by the guard
        if let Some(user) = parts.extensions.get::<CurrentUser>().cloned() {
            return Ok(user);
        }

        let manager = AuthManager::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;
        let access = manager.authorize().await.map_err(IntoResponse::into_response)?;
        match access {
            Access::Granted(principal) => Ok(CurrentUser(principal)),
            Access::Bypassed => Ok(CurrentUser(manager.config().anonymous())),
            denied => match manager.denial(&denied).await {
                Some(response) => Err(response),
                None => Err(AuthError::Unauthorized.into_response()),
            },
        }
    }
}

/// Optional authentication extractor.
///
/// Yields the principal only if it is authenticated and not forbidden.
/// Nothing is rejected and no events are dispatched.
#[derive(Debug, Clone)]
pub struct OptionalUser(pub Option<SharedPrincipal>);

impl<S: Send + Sync> FromRequestParts<S> for OptionalUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(CurrentUser(user)) = parts.extensions.get::<CurrentUser>().cloned() {
            return Ok(OptionalUser(Some(user)));
        }
        let Ok(manager) = AuthManager::from_request_parts(parts, state).await else {
            return Ok(OptionalUser(None));
        };

        match manager.resolve().await {
            Ok(user) if user.is_authenticated() && !user.is_forbidden() => Ok(OptionalUser(Some(user))),
            Ok(_) => Ok(OptionalUser(None)),
            Err(e) => {
                tracing::warn!(error = %e, "resolution failed, treating request as anonymous");
                Ok(OptionalUser(None))
            }
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for AuthManager {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthManager>()
            .cloned()
            .ok_or(AuthError::ManagerUnavailable)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for RequestContext {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .ok_or(AuthError::ManagerUnavailable)
    }
}
