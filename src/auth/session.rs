// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Cookie-backed sessions on top of `tower-sessions`.
//!
//! ## Flow
//!
//! 1. The `SessionManagerLayer` from [`Sessions::layer`] reads the session
//!    cookie and puts a lazily loaded [`Session`] into request extensions.
//! 2. [`session_middleware`] wraps it into a [`SessionHandle`], restoring
//!    the lifetime of remembered sessions.
//! 3. On the way out the manager layer saves non-empty sessions (refreshing
//!    their expiry), issues the cookie and removes the cookie of flushed
//!    sessions.
//!
//! Concurrency control for a record shared by parallel requests is left to
//! the store; the last save wins in [`MemorySessionStore`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tokio::sync::Mutex;
use tower_sessions::{
    cookie::{time, time::OffsetDateTime, SameSite},
    session::{Id, Record},
    session_store, Expiry, Session, SessionManagerLayer, SessionStore,
};

use super::error::AuthError;

/// Default session cookie name.
pub const DEFAULT_COOKIE_NAME: &str = "relational_session";

/// Default idle lifetime of a session (24 hours).
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Default idle lifetime of a remembered session (30 days).
pub const DEFAULT_REMEMBER_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Session key marking a remembered session.
pub const PERSISTENT_KEY: &str = "__persistent__";

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session store error: {0}")]
    Store(#[from] tower_sessions::session::Error),

    #[error("session serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// In-process session store.
///
/// Expired records are invisible to `load`; [`purge_expired`](Self::purge_expired)
/// reclaims their memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    records: Arc<Mutex<HashMap<Id, Record>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions, expired ones included.
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    /// Stored record for `id`, expired or not.
    pub async fn record(&self, id: &Id) -> Option<Record> {
        self.records.lock().await.get(id).cloned()
    }

    /// Drop expired sessions, returning how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = OffsetDateTime::now_utc();
        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|_, record| record.expiry_date > now);
        before - records.len()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        let mut records = self.records.lock().await;
        while records.contains_key(&record.id) {
            record.id = Id::default();
        }
        records.insert(record.id, record.clone());
        Ok(())
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        self.records.lock().await.insert(record.id, record.clone());
        Ok(())
    }

    async fn load(&self, id: &Id) -> session_store::Result<Option<Record>> {
        let now = OffsetDateTime::now_utc();
        Ok(self
            .records
            .lock()
            .await
            .get(id)
            .filter(|record| record.expiry_date > now)
            .cloned())
    }

    async fn delete(&self, id: &Id) -> session_store::Result<()> {
        self.records.lock().await.remove(id);
        Ok(())
    }
}

/// Cookie and lifetime settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub cookie_name: String,
    /// Idle lifetime; every request that carries the session extends it.
    pub ttl: Duration,
    /// Idle lifetime of remembered sessions.
    pub remember_ttl: Duration,
    pub secure: bool,
}

impl SessionConfig {
    fn expiry(&self, persistent: bool) -> Expiry {
        let ttl = if persistent { self.remember_ttl } else { self.ttl };
        Expiry::OnInactivity(time::Duration::seconds(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX)))
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            ttl: DEFAULT_SESSION_TTL,
            remember_ttl: DEFAULT_REMEMBER_TTL,
            secure: false,
        }
    }
}

/// A store paired with its cookie settings.
#[derive(Clone)]
pub struct Sessions<S = MemorySessionStore> {
    store: S,
    config: SessionConfig,
}

impl<S: SessionStore + Clone> Sessions<S> {
    pub fn new(store: S, config: SessionConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Cookie manager layer; goes outside [`session_middleware`].
    ///
    /// Sessions are saved on every request so their idle lifetime keeps
    /// moving while they are in use.
    pub fn layer(&self) -> SessionManagerLayer<S> {
        SessionManagerLayer::new(self.store.clone())
            .with_name(self.config.cookie_name.clone())
            .with_path("/")
            .with_http_only(true)
            .with_same_site(SameSite::Lax)
            .with_secure(self.config.secure)
            .with_expiry(self.config.expiry(false))
            .with_always_save(true)
    }
}

impl<S> fmt::Debug for Sessions<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sessions").field("config", &self.config).finish_non_exhaustive()
    }
}

/// One request's view of its session.
///
/// Clones share the same state. The manager layer persists it once the
/// handler is done.
#[derive(Clone)]
pub struct SessionHandle {
    session: Session,
    config: Arc<SessionConfig>,
}

impl SessionHandle {
    pub fn new(session: Session, config: Arc<SessionConfig>) -> Self {
        Self { session, config }
    }

    /// The underlying `tower-sessions` session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Store identifier, `None` until the session was first saved.
    pub fn id(&self) -> Option<Id> {
        self.session.id()
    }

    pub async fn get(&self, key: &str) -> Result<Option<Value>, SessionError> {
        Ok(self.session.get_value(key).await?)
    }

    pub async fn set(&self, key: &str, value: Value) -> Result<(), SessionError> {
        self.session.insert_value(key, value).await?;
        Ok(())
    }

    pub async fn remove(&self, key: &str) -> Result<Option<Value>, SessionError> {
        Ok(self.session.remove_value(key).await?)
    }

    /// Forget every key and drop the record from the store.
    pub async fn delete_all(&self) -> Result<(), SessionError> {
        Ok(self.session.flush().await?)
    }

    /// Write the session through to the store now, for changes made to a
    /// value obtained earlier.
    pub async fn mark_changed(&self) -> Result<(), SessionError> {
        Ok(self.session.save().await?)
    }

    /// Move the session to a fresh identifier, dropping the old record.
    pub async fn cycle_id(&self) -> Result<(), SessionError> {
        Ok(self.session.cycle_id().await?)
    }

    pub async fn set_persistent(&self, persistent: bool) -> Result<(), SessionError> {
        if persistent {
            self.session.insert_value(PERSISTENT_KEY, Value::Bool(true)).await?;
        } else {
            self.session.remove_value(PERSISTENT_KEY).await?;
        }
        self.session.set_expiry(Some(self.config.expiry(persistent)));
        Ok(())
    }

    pub async fn is_persistent(&self) -> Result<bool, SessionError> {
        Ok(self.get(PERSISTENT_KEY).await?.and_then(|v| v.as_bool()).unwrap_or(false))
    }

    pub async fn is_empty(&self) -> bool {
        self.session.is_empty().await
    }

    // The record only keeps the expiry date, so the remembered lifetime is
    // reapplied on every request.
    async fn restore_expiry(&self) -> Result<(), SessionError> {
        if self.is_persistent().await? {
            self.session.set_expiry(Some(self.config.expiry(true)));
        }
        Ok(())
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.session.id())
            .finish_non_exhaustive()
    }
}

/// Session middleware.
///
/// ```rust,ignore
/// let sessions = Sessions::new(MemorySessionStore::new(), SessionConfig::default());
/// let app = Router::new()
///     .route("/", get(handler))
///     .layer(axum::middleware::from_fn_with_state(sessions.config().clone(), session_middleware))
///     .layer(sessions.layer());
/// ```
pub async fn session_middleware(State(config): State<SessionConfig>, mut request: Request, next: Next) -> Response {
    let Some(session) = request.extensions().get::<Session>().cloned() else {
        tracing::debug!("no session manager layer in front of the session middleware");
        return next.run(request).await;
    };

    let handle = SessionHandle::new(session, Arc::new(config));
    if let Err(e) = handle.restore_expiry().await {
        return AuthError::from(e).into_response();
    }
    request.extensions_mut().insert(handle);
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn handle(store: &MemorySessionStore) -> SessionHandle {
        let session = Session::new(None, Arc::new(store.clone()), None);
        SessionHandle::new(session, Arc::new(SessionConfig::default()))
    }

    fn reopen(store: &MemorySessionStore, id: Option<Id>) -> SessionHandle {
        let session = Session::new(id, Arc::new(store.clone()), None);
        SessionHandle::new(session, Arc::new(SessionConfig::default()))
    }

    fn idle_lifetime(session: &Session) -> Option<time::Duration> {
        match session.expiry() {
            Some(Expiry::OnInactivity(duration)) => Some(duration),
            _ => None,
        }
    }

    #[tokio::test]
    async fn values_round_trip_through_the_store() {
        let store = MemorySessionStore::new();
        let first = handle(&store);
        first.set("counter", json!(1)).await.unwrap();
        first.mark_changed().await.unwrap();
        assert_eq!(store.len().await, 1);

        let next = reopen(&store, first.id());
        assert_eq!(next.get("counter").await.unwrap(), Some(json!(1)));
        assert_eq!(next.remove("counter").await.unwrap(), Some(json!(1)));
        assert!(next.is_empty().await);
    }

    #[tokio::test]
    async fn delete_all_drops_the_record() {
        let store = MemorySessionStore::new();
        let first = handle(&store);
        first.set("k", json!("v")).await.unwrap();
        first.mark_changed().await.unwrap();

        first.delete_all().await.unwrap();
        assert!(first.is_empty().await);
        assert!(first.id().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn cycle_id_moves_the_record() {
        let store = MemorySessionStore::new();
        let first = handle(&store);
        first.set("k", json!("v")).await.unwrap();
        first.mark_changed().await.unwrap();
        let old = first.id().unwrap();

        first.cycle_id().await.unwrap();
        first.mark_changed().await.unwrap();
        let new = first.id().unwrap();

        assert_ne!(old, new);
        assert!(store.record(&old).await.is_none());
        assert_eq!(reopen(&store, Some(new)).get("k").await.unwrap(), Some(json!("v")));
    }

    #[tokio::test]
    async fn persistent_flag_selects_the_remember_lifetime() {
        let store = MemorySessionStore::new();
        let first = handle(&store);
        first.set("k", json!("v")).await.unwrap();
        first.set_persistent(true).await.unwrap();
        assert!(first.is_persistent().await.unwrap());
        assert_eq!(idle_lifetime(first.session()), Some(time::Duration::days(30)));
        first.mark_changed().await.unwrap();

        let next = reopen(&store, first.id());
        next.restore_expiry().await.unwrap();
        assert_eq!(idle_lifetime(next.session()), Some(time::Duration::days(30)));

        next.set_persistent(false).await.unwrap();
        assert!(!next.is_persistent().await.unwrap());
        assert_eq!(idle_lifetime(next.session()), Some(time::Duration::days(1)));
    }

    #[tokio::test]
    async fn expired_sessions_are_ignored_and_purged() {
        let store = MemorySessionStore::new();
        let mut expired = Record {
            id: Id::default(),
            data: HashMap::from([("k".to_string(), json!("v"))]),
            expiry_date: OffsetDateTime::now_utc() - time::Duration::seconds(1),
        };
        store.create(&mut expired).await.unwrap();

        assert!(store.load(&expired.id).await.unwrap().is_none());
        assert_eq!(store.purge_expired().await, 1);
        assert!(store.is_empty().await);
    }
}
