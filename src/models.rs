// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response structures used by the demo API. All types derive
//! `Serialize` and `ToSchema` for JSON handling and OpenAPI documentation.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::{Attributes, Primitive, Principal};

// =============================================================================
// Principal
// =============================================================================

/// A directory account acting as a principal.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct User {
    /// Account email, unique within the directory.
    pub email: String,
    /// Banned accounts can log in but are refused by secured routes.
    #[serde(default)]
    pub banned: bool,
}

impl User {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            banned: false,
        }
    }

    /// Rebuild a user from the attributes persisted at login.
    pub fn from_attributes(attrs: &Attributes) -> Option<Self> {
        let email = attrs.get("email")?.as_str()?.to_string();
        let banned = attrs.get("banned").and_then(Primitive::as_bool).unwrap_or(false);
        Some(Self { email, banned })
    }
}

impl Principal for User {
    fn is_authenticated(&self) -> bool {
        true
    }

    fn is_forbidden(&self) -> bool {
        self.banned
    }

    fn to_attributes(&self) -> Attributes {
        Attributes::from([
            ("email".to_string(), Primitive::from(self.email.as_str())),
            ("banned".to_string(), Primitive::from(self.banned)),
        ])
    }
}

// =============================================================================
// Login Models
// =============================================================================

/// Query parameters of `GET /login`.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LoginQuery {
    pub email: String,
    pub password: String,
    /// Use the longer remembered-session lifetime.
    #[serde(default)]
    pub remember: bool,
}

/// Identity behind a request, as returned by `GET /me`.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Profile {
    /// False only while login is disabled.
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub banned: bool,
}

impl Profile {
    pub fn anonymous() -> Self {
        Self {
            authenticated: false,
            email: None,
            banned: false,
        }
    }
}

impl From<User> for Profile {
    fn from(user: User) -> Self {
        Self {
            authenticated: true,
            email: Some(user.email),
            banned: user.banned,
        }
    }
}

/// Outcome of a login or logout call.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}
