// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Resolution strategies.
//!
//! A strategy turns one kind of credential into a principal. Returning
//! `Ok(None)` means "not recognized" and lets the manager fall through to
//! the next strategy; returning `Err` is a bug in integrator code and is
//! propagated as a server error.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};
use serde::Deserialize;

use super::context::RequestContext;
use super::principal::{Attributes, SharedPrincipal};

/// Outcome of a strategy.
pub type StrategyResult = anyhow::Result<Option<SharedPrincipal>>;

/// Resolves a principal from a header token.
pub type HeaderStrategy =
    Arc<dyn Fn(RequestContext, String) -> BoxFuture<'static, StrategyResult> + Send + Sync>;

/// Resolves a principal from the attributes stored by `login`.
pub type SessionStrategy =
    Arc<dyn Fn(RequestContext, Attributes) -> BoxFuture<'static, StrategyResult> + Send + Sync>;

/// Resolves a principal from submitted credentials.
pub type FormStrategy =
    Arc<dyn Fn(RequestContext, Credentials) -> BoxFuture<'static, StrategyResult> + Send + Sync>;

/// Which strategy produced an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Header,
    Session,
    Form,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::Header => write!(f, "auth_by_header"),
            StrategyKind::Session => write!(f, "auth_by_session"),
            StrategyKind::Form => write!(f, "auth_by_form"),
        }
    }
}

/// Submitted login credentials.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    /// Account identifier, typically an email address
    pub email: String,
    /// Plain secret as submitted; verification is up to the form strategy
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// The configured strategies. Each defaults to one that never recognizes
/// anything.
#[derive(Clone)]
pub struct Strategies {
    pub(crate) header: HeaderStrategy,
    pub(crate) session: SessionStrategy,
    pub(crate) form: FormStrategy,
}

fn unrecognized<A>(_ctx: RequestContext, _input: A) -> BoxFuture<'static, StrategyResult> {
    async { Ok(None) }.boxed()
}

impl Default for Strategies {
    fn default() -> Self {
        Self {
            header: Arc::new(unrecognized::<String>),
            session: Arc::new(unrecognized::<Attributes>),
            form: Arc::new(unrecognized::<Credentials>),
        }
    }
}

impl Strategies {
    pub fn set_header<F, Fut>(&mut self, strategy: F)
    where
        F: Fn(RequestContext, String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = StrategyResult> + Send + 'static,
    {
        self.header = Arc::new(move |ctx: RequestContext, token: String| strategy(ctx, token).boxed());
    }

    pub fn set_session<F, Fut>(&mut self, strategy: F)
    where
        F: Fn(RequestContext, Attributes) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = StrategyResult> + Send + 'static,
    {
        self.session =
            Arc::new(move |ctx: RequestContext, attrs: Attributes| strategy(ctx, attrs).boxed());
    }

    pub fn set_form<F, Fut>(&mut self, strategy: F)
    where
        F: Fn(RequestContext, Credentials) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = StrategyResult> + Send + 'static,
    {
        self.form = Arc::new(move |ctx: RequestContext, credentials: Credentials| {
            strategy(ctx, credentials).boxed()
        });
    }

    pub async fn by_header(&self, ctx: RequestContext, token: String) -> StrategyResult {
        (self.header)(ctx, token).await
    }

    pub async fn by_session(&self, ctx: RequestContext, attrs: Attributes) -> StrategyResult {
        (self.session)(ctx, attrs).await
    }

    pub async fn by_form(&self, ctx: RequestContext, credentials: Credentials) -> StrategyResult {
        (self.form)(ctx, credentials).await
    }
}

impl fmt::Debug for Strategies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Strategies").finish_non_exhaustive()
    }
}
