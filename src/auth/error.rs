// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Login layer errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use super::events::Event;
use super::session::SessionError;
use super::strategy::StrategyKind;

/// Body text of every 401 produced by the login layer.
pub const UNAUTHORIZED_BODY: &str = "Unauthorized";

/// Body text of every 403 produced by the login layer.
pub const FORBIDDEN_BODY: &str = "Forbidden";

/// Login layer error type.
///
/// Only [`AuthError::Unauthorized`] is an authorization outcome. Every other
/// variant is a setup or integration fault and maps to a server error.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// A callback was registered under something that is not a lifecycle event.
    #[error("invalid event callback: {0}")]
    InvalidCallback(String),

    /// A principal that cannot be logged in was handed to the manager.
    #[error("invalid principal: {0}")]
    InvalidPrincipal(String),

    /// Credential check failed.
    #[error("credentials were not accepted")]
    Unauthorized,

    /// An integrator-supplied strategy failed.
    #[error("{strategy} strategy failed: {error:#}")]
    Strategy {
        strategy: StrategyKind,
        error: anyhow::Error,
    },

    /// An event callback failed during dispatch.
    #[error("{event} callback failed: {error:#}")]
    Callback {
        event: Event,
        error: anyhow::Error,
    },

    #[error(transparent)]
    Session(#[from] SessionError),

    /// The request did not pass through the session middleware.
    #[error("session middleware is not installed for this route")]
    SessionUnavailable,

    /// The request did not pass through the login middleware.
    #[error("login middleware is not installed for this route")]
    ManagerUnavailable,
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: &'static str,
    error_code: &'static str,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::InvalidCallback(_) => "invalid_callback",
            AuthError::InvalidPrincipal(_) => "invalid_principal",
            AuthError::Unauthorized => "unauthorized",
            AuthError::Strategy { .. } => "strategy_error",
            AuthError::Callback { .. } => "callback_error",
            AuthError::Session(_) => "session_error",
            AuthError::SessionUnavailable => "session_unavailable",
            AuthError::ManagerUnavailable => "manager_unavailable",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Unauthorized => StatusCode::UNAUTHORIZED,
            AuthError::InvalidCallback(_)
            | AuthError::InvalidPrincipal(_)
            | AuthError::Strategy { .. }
            | AuthError::Callback { .. }
            | AuthError::Session(_)
            | AuthError::SessionUnavailable
            | AuthError::ManagerUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status == StatusCode::UNAUTHORIZED {
            return (status, UNAUTHORIZED_BODY).into_response();
        }

        // Details stay in the log.
        tracing::error!(error = %self, error_code = self.error_code(), "login layer failure");
        let body = Json(AuthErrorBody {
            error: "Internal Server Error",
            error_code: self.error_code(),
        });
        (status, body).into_response()
    }
}
