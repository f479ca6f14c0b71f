// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-request authorization manager.
//!
//! ## Resolution order
//!
//! 1. Header strategy, if the configured header is present
//! 2. Session strategy, if the session holds a login record
//! 3. Anonymous principal
//!
//! The first strategy that yields a principal wins; later strategies are
//! not consulted. Missing credentials never fail resolution, but a failing
//! strategy does.
//!
//! ## Authorization
//!
//! [`AuthManager::authorize`] applies the guard policy: an unauthenticated
//! principal is rejected first, then a forbidden one. The guard and the
//! [`CurrentUser`](super::extractor::CurrentUser) extractor share it.
//!
//! ## Events
//!
//! Every event is dispatched after the transition it announces has been
//! applied (e.g. `login` after the session write). In disabled mode no
//! events are dispatched at all.

use std::fmt;
use std::sync::Arc;

use axum::response::Response;
use serde::{Deserialize, Serialize};

use super::config::{DispatchPolicy, LoginConfig};
use super::context::RequestContext;
use super::error::AuthError;
use super::events::Event;
use super::principal::{Attributes, SharedPrincipal};
use super::session::{SessionError, SessionHandle};
use super::strategy::{Credentials, StrategyKind};

/// Shape of the value stored under the session key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginRecord {
    pub user: Attributes,
    #[serde(default)]
    pub remember: bool,
}

/// Which step of the resolution order produced the principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedBy {
    Header,
    Session,
    Anonymous,
}

/// Outcome of [`AuthManager::authorize`].
#[derive(Debug, Clone)]
pub enum Access {
    /// Disabled mode, nothing was checked.
    Bypassed,
    Granted(SharedPrincipal),
    Unauthorized,
    Forbidden,
}

/// A resolved principal and where it came from.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub principal: SharedPrincipal,
    pub source: ResolvedBy,
}

/// Request-scoped authorization manager.
///
/// Created by the login middleware for every request and dropped with it.
/// Handlers obtain it through its extractor.
#[derive(Clone)]
pub struct AuthManager {
    context: RequestContext,
    config: Arc<LoginConfig>,
    session: Option<SessionHandle>,
}

impl AuthManager {
    pub fn new(context: RequestContext, config: Arc<LoginConfig>, session: Option<SessionHandle>) -> Self {
        Self {
            context,
            config,
            session,
        }
    }

    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    pub fn config(&self) -> &LoginConfig {
        &self.config
    }

    pub fn session(&self) -> Option<&SessionHandle> {
        self.session.as_ref()
    }

    pub fn disabled(&self) -> bool {
        self.config.disabled
    }

    /// Resolve the principal making this request.
    pub async fn resolve(&self) -> Result<SharedPrincipal, AuthError> {
        Ok(self.resolve_source().await?.principal)
    }

    /// Resolve the principal along with the step that produced it.
    pub async fn resolve_source(&self) -> Result<Resolved, AuthError> {
        if self.disabled() {
            return Ok(self.anonymous());
        }

        if let Some(token) = self.context.header(&self.config.header_name) {
            tracing::debug!(request_id = ?self.context.request_id(), "resolving by header");
            let principal = self
                .config
                .strategies
                .by_header(self.context.clone(), token.to_string())
                .await
                .map_err(|error| AuthError::Strategy {
                    strategy: StrategyKind::Header,
                    error,
                })?;
            if let Some(principal) = principal {
                self.emit(Event::HeaderResolved).await?;
                return Ok(Resolved {
                    principal,
                    source: ResolvedBy::Header,
                });
            }
        }

        if let Some(record) = self.login_record().await? {
            tracing::debug!(request_id = ?self.context.request_id(), "resolving by session");
            let principal = self
                .config
                .strategies
                .by_session(self.context.clone(), record.user)
                .await
                .map_err(|error| AuthError::Strategy {
                    strategy: StrategyKind::Session,
                    error,
                })?;
            if let Some(principal) = principal {
                self.emit(Event::SessionResolved).await?;
                return Ok(Resolved {
                    principal,
                    source: ResolvedBy::Session,
                });
            }
        }

        tracing::debug!(request_id = ?self.context.request_id(), "falling back to anonymous");
        Ok(self.anonymous())
    }

    /// Resolve the principal and apply the guard policy, dispatching
    /// `unauthorized`, `forbidden` or `authenticated`.
    pub async fn authorize(&self) -> Result<Access, AuthError> {
        if self.disabled() {
            return Ok(Access::Bypassed);
        }

        let principal = self.resolve().await?;
        if !principal.is_authenticated() {
            tracing::debug!(path = %self.context.uri().path(), "rejecting unauthenticated request");
            self.emit(Event::Unauthorized).await?;
            return Ok(Access::Unauthorized);
        }
        if principal.is_forbidden() {
            tracing::info!(path = %self.context.uri().path(), "rejecting forbidden principal");
            self.emit(Event::Forbidden).await?;
            return Ok(Access::Forbidden);
        }

        self.context.set_current_user(principal.clone());
        self.emit(Event::Authenticated).await?;
        Ok(Access::Granted(principal))
    }

    /// Persist `principal` in the session and announce the login.
    ///
    /// The session moves to a fresh identifier first, so a cookie handed
    /// out before the login never carries the logged-in session. Logging in
    /// again overwrites the previous record.
    pub async fn login(&self, principal: SharedPrincipal, remember: bool) -> Result<(), AuthError> {
        if !principal.is_authenticated() {
            return Err(AuthError::InvalidPrincipal(format!(
                "cannot log in an unauthenticated principal: {principal:?}"
            )));
        }
        let session = self.session.as_ref().ok_or(AuthError::SessionUnavailable)?;

        let record = LoginRecord {
            user: principal.to_attributes(),
            remember,
        };
        let value = serde_json::to_value(&record).map_err(SessionError::from)?;
        session.cycle_id().await?;
        session.set(&self.config.session_key, value).await?;
        session.set_persistent(remember).await?;
        self.context.set_current_user(principal);

        tracing::info!(request_id = ?self.context.request_id(), remember, "principal logged in");
        self.emit(Event::Login).await
    }

    /// Forget the whole session and announce the logout.
    pub async fn logout(&self) -> Result<(), AuthError> {
        let session = self.session.as_ref().ok_or(AuthError::SessionUnavailable)?;
        session.delete_all().await?;
        self.context.clear_current_user();

        tracing::info!(request_id = ?self.context.request_id(), "session invalidated");
        self.emit(Event::Logout).await
    }

    /// Check credentials with the form strategy and log the result in.
    pub async fn authenticate(&self, credentials: Credentials, remember: bool) -> Result<SharedPrincipal, AuthError> {
        let principal = self
            .config
            .strategies
            .by_form(self.context.clone(), credentials)
            .await
            .map_err(|error| AuthError::Strategy {
                strategy: StrategyKind::Form,
                error,
            })?;

        let Some(principal) = principal else {
            self.emit(Event::Unauthorized).await?;
            return Err(AuthError::Unauthorized);
        };

        self.context.set_current_user(principal.clone());
        self.emit(Event::Authenticated).await?;
        self.login(principal.clone(), remember).await?;
        Ok(principal)
    }

    /// Response for a denied [`Access`], `None` when access was not denied.
    pub async fn denial(&self, access: &Access) -> Option<Response> {
        match access {
            Access::Unauthorized => Some(self.unauthorized().await),
            Access::Forbidden => Some(self.forbidden().await),
            Access::Bypassed | Access::Granted(_) => None,
        }
    }

    /// Response for a request without an authenticated principal.
    pub async fn unauthorized(&self) -> Response {
        self.config.unauthorized(self.context.clone()).await
    }

    /// Response for an authenticated but forbidden principal.
    pub async fn forbidden(&self) -> Response {
        self.config.forbidden(self.context.clone()).await
    }

    /// Dispatch `event`, applying the configured failure policy.
    pub async fn emit(&self, event: Event) -> Result<(), AuthError> {
        if self.disabled() {
            return Ok(());
        }
        match self.config.events.dispatch(event, &self.context).await {
            Ok(()) => Ok(()),
            Err(error) if self.config.dispatch_policy == DispatchPolicy::LogAndContinue => {
                tracing::warn!(
                    %event,
                    error = %error,
                    request_id = ?self.context.request_id(),
                    "event callback failed, continuing"
                );
                Ok(())
            }
            Err(error) => Err(error),
        }
    }

    fn anonymous(&self) -> Resolved {
        Resolved {
            principal: self.config.anonymous(),
            source: ResolvedBy::Anonymous,
        }
    }

    async fn login_record(&self) -> Result<Option<LoginRecord>, AuthError> {
        let Some(session) = self.session.as_ref() else {
            return Ok(None);
        };
        let Some(value) = session.get(&self.config.session_key).await? else {
            return Ok(None);
        };
        match serde_json::from_value(value) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring malformed login record in session");
                Ok(None)
            }
        }
    }
}

impl fmt::Debug for AuthManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthManager")
            .field("context", &self.context)
            .field("disabled", &self.config.disabled)
            .field("session", &self.session)
            .finish()
    }
}
