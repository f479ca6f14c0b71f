// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request context handed to strategies, event callbacks and responders.
//!
//! The context is a cheap, clonable snapshot of the request head plus the
//! per-request mutable state the login layer shares with its collaborators.
//! It lives exactly as long as one request; nothing in it is shared across
//! requests.

use std::fmt;
use std::sync::Arc;

use axum::http::{request::Parts, Extensions, HeaderMap, HeaderName, Method, Uri};
use parking_lot::{Mutex, RwLock};

use super::principal::SharedPrincipal;

/// Header carrying the request id set by the tower-http request-id layer.
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

#[derive(Clone)]
pub struct RequestContext {
    inner: Arc<Inner>,
}

struct Inner {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    current_user: RwLock<Option<SharedPrincipal>>,
    extensions: Mutex<Extensions>,
}

impl RequestContext {
    pub fn new(method: Method, uri: Uri, headers: HeaderMap) -> Self {
        Self {
            inner: Arc::new(Inner {
                method,
                uri,
                headers,
                current_user: RwLock::new(None),
                extensions: Mutex::new(Extensions::new()),
            }),
        }
    }

    /// Snapshot the head of an incoming request.
    pub fn from_parts(parts: &Parts) -> Self {
        Self::new(parts.method.clone(), parts.uri.clone(), parts.headers.clone())
    }

    pub fn method(&self) -> &Method {
        &self.inner.method
    }

    pub fn uri(&self) -> &Uri {
        &self.inner.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.inner.headers
    }

    /// Trimmed, non-empty value of a header.
    pub fn header(&self, name: &HeaderName) -> Option<&str> {
        self.inner
            .headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn request_id(&self) -> Option<&str> {
        self.header(&REQUEST_ID_HEADER)
    }

    /// The principal attached by the guard or by `login`.
    pub fn current_user(&self) -> Option<SharedPrincipal> {
        self.inner.current_user.read().clone()
    }

    pub fn set_current_user(&self, principal: SharedPrincipal) {
        *self.inner.current_user.write() = Some(principal);
    }

    pub fn clear_current_user(&self) {
        *self.inner.current_user.write() = None;
    }

    /// Store a typed value for later callbacks in the same request.
    pub fn insert<T: Clone + Send + Sync + 'static>(&self, value: T) -> Option<T> {
        self.inner.extensions.lock().insert(value)
    }

    pub fn get<T: Clone + Send + Sync + 'static>(&self) -> Option<T> {
        self.inner.extensions.lock().get::<T>().cloned()
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("method", &self.inner.method)
            .field("uri", &self.inner.uri)
            .field("current_user", &self.current_user())
            .finish_non_exhaustive()
    }
}
