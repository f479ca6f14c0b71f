// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Login Module
//!
//! Session-based authorization for Axum applications.
//!
//! ## Request Flow
//!
//! 1. The `tower-sessions` manager layer loads the session named by the
//!    cookie and `session_middleware` wraps it into a [`SessionHandle`]
//! 2. `login_middleware` attaches a request-scoped [`AuthManager`]
//! 3. Routes behind the [`secured`] guard require a resolved principal:
//!    - header strategy, when the configured header is present
//!    - session strategy, when the session holds a login record
//!    - anonymous otherwise
//! 4. Handlers log principals in and out through the manager
//!
//! ## Principals
//!
//! Applications bring their own principal types by implementing
//! [`Principal`]. The login layer only persists the attributes a principal
//! exposes and asks the session strategy to rebuild it on later requests.
//!
//! ## Events
//!
//! Callbacks registered on [`LoginConfig`] observe `login`, `logout`,
//! `authenticated`, `forbidden` and `unauthorized`, plus which strategy
//! resolved the request. They run sequentially in registration order.
//!
//! ## Disabled Mode
//!
//! With `disabled` set, the guard lets every request through, resolution
//! always yields the anonymous principal (which is what [`CurrentUser`]
//! holds) and no events fire. `login` and
//! `logout` still update the session.

pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod extractor;
pub mod manager;
pub mod middleware;
pub mod principal;
pub mod session;
pub mod strategy;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{DispatchPolicy, LoginConfig, LoginConfigBuilder, DEFAULT_SESSION_KEY};
pub use context::RequestContext;
pub use error::AuthError;
pub use events::{callback, Event, EventBus, EventCallback};
pub use extractor::{CurrentUser, OptionalUser};
pub use manager::{Access, AuthManager, LoginRecord, Resolved, ResolvedBy};
pub use middleware::{login_middleware, secured};
pub use principal::{AnonymousPrincipal, Attributes, Primitive, Principal, SharedPrincipal};
pub use session::{session_middleware, MemorySessionStore, SessionConfig, SessionError, SessionHandle, Sessions};
pub use strategy::{Credentials, StrategyKind};
