// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared fixtures for the login layer tests.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    extract::Query,
    http::{header::SET_COOKIE, Request, Response},
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use parking_lot::Mutex;
use serde::Deserialize;
use tower_sessions::Session;

use super::config::{LoginConfig, LoginConfigBuilder};
use super::error::AuthError;
use super::events::{callback, Event};
use super::extractor::CurrentUser;
use super::manager::AuthManager;
use super::middleware::{login_middleware, secured};
use super::principal::{Attributes, Primitive, Principal};
use super::session::{session_middleware, MemorySessionStore, SessionConfig, SessionHandle, Sessions};
use super::strategy::Credentials;

pub const ADMIN_TOKEN: &str = "1234567890";
pub const PASSWORD: &str = "blueberry";

#[derive(Debug, Clone, PartialEq)]
pub struct TestUser {
    pub email: String,
    pub banned: bool,
}

impl TestUser {
    pub fn new(email: &str) -> Self {
        Self {
            email: email.to_string(),
            banned: false,
        }
    }

    pub fn banned(email: &str) -> Self {
        Self {
            email: email.to_string(),
            banned: true,
        }
    }

    pub fn from_attributes(attrs: &Attributes) -> Option<Self> {
        Some(Self {
            email: attrs.get("email")?.as_str()?.to_string(),
            banned: attrs.get("banned").and_then(Primitive::as_bool).unwrap_or(false),
        })
    }
}

impl Principal for TestUser {
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

/// Strategies backed by a fixed token, a fixed password and the session.
pub fn directory_config_builder() -> LoginConfigBuilder {
    LoginConfig::builder()
        .auth_by_header(|_ctx, token| async move {
            Ok((token == ADMIN_TOKEN).then(|| TestUser::new("admin@b.com").into_shared()))
        })
        .auth_by_session(|_ctx, attrs| async move {
            Ok(TestUser::from_attributes(&attrs).map(|user| user.into_shared()))
        })
        .auth_by_form(|_ctx, credentials| async move {
            if credentials.password != PASSWORD {
                return Ok(None);
            }
            let user = if credentials.email.starts_with("banned") {
                TestUser::banned(&credentials.email)
            } else {
                TestUser::new(&credentials.email)
            };
            Ok(Some(user.into_shared()))
        })
}

pub fn directory_config() -> LoginConfig {
    directory_config_builder().build()
}

/// Finish `builder` with a callback on every event that records its name.
pub fn recording_config(builder: LoginConfigBuilder) -> (LoginConfig, Arc<Mutex<Vec<Event>>>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let registrations: Vec<_> = Event::ALL
        .into_iter()
        .map(|event| {
            let log = Arc::clone(&log);
            let recorder = callback(move |_ctx| {
                let log = Arc::clone(&log);
                async move {
                    log.lock().push(event);
                    Ok(())
                }
            });
            (event, recorder)
        })
        .collect();
    let config = builder.events(registrations).build();
    (config, log)
}

#[derive(Deserialize)]
struct LoginParams {
    email: String,
    password: String,
    #[serde(default)]
    remember: bool,
}

async fn login(manager: AuthManager, Query(params): Query<LoginParams>) -> Result<&'static str, AuthError> {
    manager
        .authenticate(Credentials::new(params.email, params.password), params.remember)
        .await?;
    Ok("Logged in")
}

async fn logout(manager: AuthManager) -> Result<&'static str, AuthError> {
    manager.logout().await?;
    Ok("Logged out")
}

async fn whoami(CurrentUser(user): CurrentUser) -> String {
    user.downcast_ref::<TestUser>()
        .map(|user| user.email.clone())
        .unwrap_or_default()
}

/// Minimal application: a guarded `/` and `/whoami`, an unguarded
/// `/profile` reading [`CurrentUser`], plus login and logout.
pub fn app(config: LoginConfig) -> (Router, MemorySessionStore) {
    let store = MemorySessionStore::new();
    let sessions = Sessions::new(store.clone(), SessionConfig::default());
    let router = Router::new()
        .route("/", get(|| async { "OK" }))
        .route("/whoami", get(whoami))
        .route_layer(from_fn(secured))
        .route("/profile", get(whoami))
        .route("/login", get(login))
        .route("/logout", get(logout))
        .layer(from_fn_with_state(Arc::new(config), login_middleware))
        .layer(from_fn_with_state(sessions.config().clone(), session_middleware))
        .layer(sessions.layer());
    (router, store)
}

/// A session that has not been saved yet, backed by its own store.
pub fn fresh_session() -> (SessionHandle, MemorySessionStore) {
    let store = MemorySessionStore::new();
    let session = Session::new(None, Arc::new(store.clone()), None);
    let handle = SessionHandle::new(session, Arc::new(SessionConfig::default()));
    (handle, store)
}

/// Save `handle` and open the same session again, as the next request would.
pub async fn reload(handle: &SessionHandle, store: &MemorySessionStore) -> SessionHandle {
    handle.mark_changed().await.unwrap();
    let session = Session::new(handle.id(), Arc::new(store.clone()), None);
    SessionHandle::new(session, Arc::new(SessionConfig::default()))
}

pub fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }
    builder.body(Body::empty()).unwrap()
}

/// `name=value` part of the first `Set-Cookie` header.
pub fn set_cookie(response: &Response<Body>) -> Option<String> {
    let value = response.headers().get(SET_COOKIE)?.to_str().ok()?;
    value.split(';').next().map(str::to_string)
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
