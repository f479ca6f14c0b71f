// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Lifecycle events and the callback registry that dispatches them.
//!
//! ## Ordering
//!
//! Callbacks for one event run in registration order, one after another.
//! Each callback is awaited to completion before the next one starts, so
//! callbacks may mutate shared request state without racing. The first
//! failing callback stops the dispatch and its error is returned.
//!
//! ## Ownership
//!
//! A bus belongs to one [`LoginConfig`](super::config::LoginConfig), which
//! is built once per application. There is no process-wide registry.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};

use super::context::RequestContext;
use super::error::AuthError;

/// Boxed asynchronous event callback.
pub type EventCallback =
    Arc<dyn Fn(RequestContext) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Lifecycle event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Event {
    /// A principal was written into the session.
    Login,
    /// The session was invalidated.
    Logout,
    /// A request passed the guard, or credentials were accepted.
    Authenticated,
    /// An authenticated principal was refused by the guard.
    Forbidden,
    /// The guard found no authenticated principal, or credentials were refused.
    Unauthorized,
    /// The header strategy recognized the request.
    #[serde(rename = "auth_by_header")]
    HeaderResolved,
    /// The session strategy recognized the request.
    #[serde(rename = "auth_by_session")]
    SessionResolved,
}

impl Event {
    pub const ALL: [Event; 7] = [
        Event::Login,
        Event::Logout,
        Event::Authenticated,
        Event::Forbidden,
        Event::Unauthorized,
        Event::HeaderResolved,
        Event::SessionResolved,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Event::Login => "login",
            Event::Logout => "logout",
            Event::Authenticated => "authenticated",
            Event::Forbidden => "forbidden",
            Event::Unauthorized => "unauthorized",
            Event::HeaderResolved => "auth_by_header",
            Event::SessionResolved => "auth_by_session",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Event {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        Event::ALL
            .into_iter()
            .find(|event| event.as_str() == name)
            .ok_or_else(|| AuthError::InvalidCallback(format!("unknown event '{s}'")))
    }
}

/// Box an asynchronous closure into an [`EventCallback`].
pub fn callback<F, Fut>(f: F) -> EventCallback
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |ctx: RequestContext| f(ctx).boxed())
}

/// Ordered callback registry keyed by event.
#[derive(Clone, Default)]
pub struct EventBus {
    callbacks: HashMap<Event, Vec<EventCallback>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an asynchronous callback for `event`.
    ///
    /// The callback must return a future; a plain function is rejected when
    /// the application is compiled:
    ///
    /// ```compile_fail
    /// use relational_login::auth::{Event, EventBus};
    ///
    /// let mut bus = EventBus::new();
    /// bus.register(Event::Login, |_ctx| Ok::<(), anyhow::Error>(()));
    /// ```
    pub fn register<F, Fut>(&mut self, event: Event, f: F)
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.register_boxed(event, callback(f));
    }

    pub fn register_boxed(&mut self, event: Event, callback: EventCallback) {
        self.callbacks.entry(event).or_default().push(callback);
    }

    /// Register a callback under an event name, e.g. from configuration.
    pub fn register_named<F, Fut>(&mut self, name: &str, f: F) -> Result<Event, AuthError>
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let event: Event = name.parse()?;
        self.register(event, f);
        Ok(event)
    }

    /// Number of callbacks registered for `event`.
    pub fn len(&self, event: Event) -> usize {
        self.callbacks.get(&event).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.values().all(Vec::is_empty)
    }

    /// Run every callback for `event` in registration order.
    pub async fn dispatch(&self, event: Event, ctx: &RequestContext) -> Result<(), AuthError> {
        let Some(callbacks) = self.callbacks.get(&event) else {
            return Ok(());
        };

        tracing::debug!(%event, callbacks = callbacks.len(), "dispatching event");
        for (position, callback) in callbacks.iter().enumerate() {
            if let Err(error) = callback(ctx.clone()).await {
                tracing::debug!(%event, position, error = %error, "event callback failed");
                return Err(AuthError::Callback { event, error });
            }
        }
        Ok(())
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<&'static str, usize> = self
            .callbacks
            .iter()
            .map(|(event, callbacks)| (event.as_str(), callbacks.len()))
            .collect();
        f.debug_struct("EventBus").field("callbacks", &counts).finish()
    }
}
