// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Login layer configuration.
//!
//! A [`LoginConfig`] is built once per application and shared as
//! `Arc<LoginConfig>`. It is immutable after [`LoginConfigBuilder::build`];
//! every request gets its own [`AuthManager`](super::manager::AuthManager)
//! reading from it.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use axum::{
    http::{header::AUTHORIZATION, HeaderName, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::future::{BoxFuture, FutureExt};

use super::context::RequestContext;
use super::error::{AuthError, FORBIDDEN_BODY, UNAUTHORIZED_BODY};
use super::events::{Event, EventBus, EventCallback};
use super::principal::{AnonymousPrincipal, Attributes, Principal, SharedPrincipal};
use super::strategy::{Credentials, Strategies, StrategyResult};
use crate::config::Settings;

/// Default session key holding the login record.
pub const DEFAULT_SESSION_KEY: &str = "__aiologin__";

/// Builds the response for a rejected request.
pub type Responder = Arc<dyn Fn(RequestContext) -> BoxFuture<'static, Response> + Send + Sync>;

/// Produces the principal used when nothing recognizes the request.
pub type AnonymousFactory = Arc<dyn Fn() -> SharedPrincipal + Send + Sync>;

/// What to do when an event callback fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DispatchPolicy {
    /// Fail the request with a server error.
    #[default]
    Propagate,
    /// Log the failure and carry on with the request.
    LogAndContinue,
}

fn default_unauthorized(_ctx: RequestContext) -> BoxFuture<'static, Response> {
    async { (StatusCode::UNAUTHORIZED, UNAUTHORIZED_BODY).into_response() }.boxed()
}

fn default_forbidden(_ctx: RequestContext) -> BoxFuture<'static, Response> {
    async { (StatusCode::FORBIDDEN, FORBIDDEN_BODY).into_response() }.boxed()
}

fn responder<F, Fut>(f: F) -> Responder
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    Arc::new(move |ctx: RequestContext| f(ctx).boxed())
}

/// Application-wide login settings.
#[derive(Clone)]
pub struct LoginConfig {
    pub(crate) session_key: String,
    pub(crate) disabled: bool,
    pub(crate) header_name: HeaderName,
    pub(crate) dispatch_policy: DispatchPolicy,
    pub(crate) strategies: Strategies,
    pub(crate) anonymous: AnonymousFactory,
    pub(crate) events: EventBus,
    pub(crate) unauthorized: Responder,
    pub(crate) forbidden: Responder,
}

impl LoginConfig {
    pub fn builder() -> LoginConfigBuilder {
        LoginConfigBuilder::default()
    }

    pub fn session_key(&self) -> &str {
        &self.session_key
    }

    pub fn disabled(&self) -> bool {
        self.disabled
    }

    pub fn header_name(&self) -> &HeaderName {
        &self.header_name
    }

    pub fn dispatch_policy(&self) -> DispatchPolicy {
        self.dispatch_policy
    }

    pub fn strategies(&self) -> &Strategies {
        &self.strategies
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn anonymous(&self) -> SharedPrincipal {
        (self.anonymous)()
    }

    pub async fn unauthorized(&self, ctx: RequestContext) -> Response {
        (self.unauthorized)(ctx).await
    }

    pub async fn forbidden(&self, ctx: RequestContext) -> Response {
        (self.forbidden)(ctx).await
    }
}

impl Default for LoginConfig {
    fn default() -> Self {
        LoginConfigBuilder::default().build()
    }
}

impl fmt::Debug for LoginConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginConfig")
            .field("session_key", &self.session_key)
            .field("disabled", &self.disabled)
            .field("header_name", &self.header_name)
            .field("dispatch_policy", &self.dispatch_policy)
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

/// Builder for [`LoginConfig`].
pub struct LoginConfigBuilder {
    config: LoginConfig,
}

impl Default for LoginConfigBuilder {
    fn default() -> Self {
        Self {
            config: LoginConfig {
                session_key: DEFAULT_SESSION_KEY.to_string(),
                disabled: false,
                header_name: AUTHORIZATION,
                dispatch_policy: DispatchPolicy::default(),
                strategies: Strategies::default(),
                anonymous: Arc::new(|| AnonymousPrincipal.into_shared()),
                events: EventBus::new(),
                unauthorized: Arc::new(default_unauthorized),
                forbidden: Arc::new(default_forbidden),
            },
        }
    }
}

impl LoginConfigBuilder {
    /// Start from environment-derived settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::default()
            .session_key(settings.session_key.clone())
            .disabled(settings.disabled)
            .header_name(settings.header_name.clone())
    }

    pub fn session_key(mut self, key: impl Into<String>) -> Self {
        self.config.session_key = key.into();
        self
    }

    /// Bypass resolution, the guard and all events.
    pub fn disabled(mut self, disabled: bool) -> Self {
        self.config.disabled = disabled;
        self
    }

    /// Header handed to the header strategy.
    pub fn header_name(mut self, name: HeaderName) -> Self {
        self.config.header_name = name;
        self
    }

    pub fn dispatch_policy(mut self, policy: DispatchPolicy) -> Self {
        self.config.dispatch_policy = policy;
        self
    }

    pub fn auth_by_header<F, Fut>(mut self, strategy: F) -> Self
    where
        F: Fn(RequestContext, String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = StrategyResult> + Send + 'static,
    {
        self.config.strategies.set_header(strategy);
        self
    }

    pub fn auth_by_session<F, Fut>(mut self, strategy: F) -> Self
    where
        F: Fn(RequestContext, Attributes) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = StrategyResult> + Send + 'static,
    {
        self.config.strategies.set_session(strategy);
        self
    }

    pub fn auth_by_form<F, Fut>(mut self, strategy: F) -> Self
    where
        F: Fn(RequestContext, Credentials) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = StrategyResult> + Send + 'static,
    {
        self.config.strategies.set_form(strategy);
        self
    }

    /// Replace the anonymous principal factory.
    pub fn anonymous<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> SharedPrincipal + Send + Sync + 'static,
    {
        self.config.anonymous = Arc::new(factory);
        self
    }

    /// Register an event callback.
    pub fn on<F, Fut>(mut self, event: Event, callback: F) -> Self
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.config.events.register(event, callback);
        self
    }

    /// Register an event callback by event name.
    pub fn on_named<F, Fut>(mut self, name: &str, callback: F) -> Result<Self, AuthError>
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.config.events.register_named(name, callback)?;
        Ok(self)
    }

    /// Register prepared callbacks in iteration order.
    pub fn events(mut self, registrations: impl IntoIterator<Item = (Event, EventCallback)>) -> Self {
        for (event, callback) in registrations {
            self.config.events.register_boxed(event, callback);
        }
        self
    }

    pub fn unauthorized<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.config.unauthorized = responder(f);
        self
    }

    pub fn forbidden<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.config.forbidden = responder(f);
        self
    }

    pub fn build(self) -> LoginConfig {
        self.config
    }
}
