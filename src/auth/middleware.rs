// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Login middleware and the `secured` guard for Axum.
//!
//! [`login_middleware`] installs an [`AuthManager`] into every request. It
//! must run inside [`session_middleware`](super::session::session_middleware)
//! so the manager can see the session.
//!
//! [`secured`] protects a router subtree:
//!
//! ```rust,ignore
//! let app = Router::new()
//!     .route("/", get(home))
//!     .route_layer(axum::middleware::from_fn(secured))
//!     .route("/login", get(login))
//!     .layer(axum::middleware::from_fn_with_state(Arc::new(config), login_middleware))
//!     .layer(axum::middleware::from_fn_with_state(sessions.config().clone(), session_middleware))
//!     .layer(sessions.layer());
//! ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use super::config::LoginConfig;
use super::context::RequestContext;
use super::error::AuthError;
use super::extractor::CurrentUser;
use super::manager::{Access, AuthManager};
use super::session::SessionHandle;

/// Attach a request-scoped [`AuthManager`] and its [`RequestContext`].
pub async fn login_middleware(State(config): State<Arc<LoginConfig>>, mut request: Request, next: Next) -> Response {
    let context = RequestContext::new(
        request.method().clone(),
        request.uri().clone(),
        request.headers().clone(),
    );
    let session = request.extensions().get::<SessionHandle>().cloned();
    if session.is_none() {
        tracing::debug!("no session layer in front of the login layer");
    }

    let manager = AuthManager::new(context.clone(), config, session);
    request.extensions_mut().insert(context);
    request.extensions_mut().insert(manager);
    next.run(request).await
}

/// Let the request through only for an authenticated, non-forbidden
/// principal.
///
/// The resolved principal is available to the handler through
/// [`CurrentUser`] and to callbacks through
/// [`RequestContext::current_user`].
pub async fn secured(mut request: Request, next: Next) -> Result<Response, AuthError> {
    let manager = request
        .extensions()
        .get::<AuthManager>()
        .cloned()
        .ok_or(AuthError::ManagerUnavailable)?;

    let access = manager.authorize().await?;
    if let Some(denied) = manager.denial(&access).await {
        return Ok(denied);
    }
    if let Access::Granted(principal) = access {
        request.extensions_mut().insert(CurrentUser(principal));
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::config::DispatchPolicy;
    use crate::auth::events::Event;
    use crate::auth::test_support::{
        app, body_text, directory_config, directory_config_builder, get_request, recording_config, set_cookie,
        ADMIN_TOKEN,
    };
    use axum::{body::Body, http::StatusCode, routing::get, Router};
    use parking_lot::Mutex;
    use tower::ServiceExt;
    use tower_sessions::session::Id;

    async fn login_cookie(router: &Router, query: &str) -> String {
        let response = router
            .clone()
            .oneshot(get_request(&format!("/login?{query}"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        set_cookie(&response).expect("login issues a session cookie")
    }

    #[tokio::test]
    async fn rejects_request_without_credentials() {
        let (config, log) = recording_config(directory_config_builder());
        let (router, _) = app(config);

        let response = router.oneshot(get_request("/", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_text(response).await, "Unauthorized");
        assert_eq!(*log.lock(), vec![Event::Unauthorized]);
    }

    #[tokio::test]
    async fn login_then_secured_request_succeeds() {
        let (config, log) = recording_config(directory_config_builder());
        let (router, store) = app(config);

        let cookie = login_cookie(&router, "email=a@b.com&password=blueberry").await;
        assert_eq!(store.len().await, 1);

        let response = router.clone().oneshot(get_request("/", Some(cookie.as_str()))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "OK");

        let response = router.oneshot(get_request("/whoami", Some(cookie.as_str()))).await.unwrap();
        assert_eq!(body_text(response).await, "a@b.com");

        assert_eq!(
            *log.lock(),
            vec![
                Event::Authenticated,
                Event::Login,
                Event::SessionResolved,
                Event::Authenticated,
                Event::SessionResolved,
                Event::Authenticated,
            ]
        );
    }

    #[tokio::test]
    async fn bad_password_is_unauthorized() {
        let (router, store) = app(directory_config());
        let response = router
            .oneshot(get_request("/login?email=a@b.com&password=nope", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(set_cookie(&response).is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn logout_revokes_access() {
        let (router, store) = app(directory_config());
        let cookie = login_cookie(&router, "email=a@b.com&password=blueberry").await;

        let response = router.clone().oneshot(get_request("/logout", Some(cookie.as_str()))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(set_cookie(&response).is_some_and(|c| c.ends_with('=')));
        assert!(store.is_empty().await);

        let response = router.oneshot(get_request("/", Some(cookie.as_str()))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn forbidden_principal_gets_403() {
        let (config, log) = recording_config(directory_config_builder());
        let (router, _) = app(config);
        let cookie = login_cookie(&router, "email=banned@b.com&password=blueberry").await;
        log.lock().clear();

        let response = router.oneshot(get_request("/", Some(cookie.as_str()))).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_text(response).await, "Forbidden");
        assert_eq!(*log.lock(), vec![Event::SessionResolved, Event::Forbidden]);
    }

    #[tokio::test]
    async fn header_token_grants_access_without_session() {
        let (config, log) = recording_config(directory_config_builder());
        let (router, store) = app(config);
        let request = axum::http::Request::builder()
            .uri("/whoami")
            .header("authorization", ADMIN_TOKEN)
            .body(Body::empty())
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(set_cookie(&response).is_none());
        assert_eq!(body_text(response).await, "admin@b.com");
        assert!(store.is_empty().await);
        assert_eq!(*log.lock(), vec![Event::HeaderResolved, Event::Authenticated]);
    }

    #[tokio::test]
    async fn disabled_mode_lets_everything_through() {
        let (config, log) = recording_config(directory_config_builder().disabled(true));
        let (router, _) = app(config);

        let response = router.oneshot(get_request("/", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "OK");
        assert!(log.lock().is_empty());
    }

    #[tokio::test]
    async fn disabled_mode_runs_handlers_reading_the_current_user() {
        let (router, _) = app(directory_config_builder().disabled(true).build());

        for uri in ["/whoami", "/profile"] {
            let response = router.clone().oneshot(get_request(uri, None)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{uri}");
            assert_eq!(body_text(response).await, "");
        }
    }

    #[tokio::test]
    async fn current_user_outside_the_guard_rejects_forbidden_principal() {
        let (config, log) = recording_config(directory_config_builder());
        let (router, _) = app(config);
        let cookie = login_cookie(&router, "email=banned@b.com&password=blueberry").await;
        log.lock().clear();

        let response = router.clone().oneshot(get_request("/profile", Some(cookie.as_str()))).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_text(response).await, "Forbidden");
        assert_eq!(*log.lock(), vec![Event::SessionResolved, Event::Forbidden]);

        let response = router.oneshot(get_request("/profile", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn login_issues_a_new_session_id() {
        let (router, store) = app(directory_config());
        let first = login_cookie(&router, "email=a@b.com&password=blueberry").await;

        let response = router
            .clone()
            .oneshot(get_request("/login?email=c@d.com&password=blueberry", Some(first.as_str())))
            .await
            .unwrap();
        let second = set_cookie(&response).expect("login issues a session cookie");
        assert_ne!(first, second);
        assert_eq!(store.len().await, 1);

        let response = router.clone().oneshot(get_request("/", Some(first.as_str()))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let response = router.oneshot(get_request("/whoami", Some(second.as_str()))).await.unwrap();
        assert_eq!(body_text(response).await, "c@d.com");
    }

    #[tokio::test]
    async fn requests_extend_the_idle_lifetime() {
        let (router, store) = app(directory_config());
        let cookie = login_cookie(&router, "email=a@b.com&password=blueberry").await;
        let id: Id = cookie.split_once('=').unwrap().1.parse().unwrap();
        let issued = store.record(&id).await.unwrap().expiry_date;

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let response = router.oneshot(get_request("/", Some(cookie.as_str()))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let refreshed = store.record(&id).await.unwrap().expiry_date;
        assert!(refreshed > issued);
    }

    #[tokio::test]
    async fn failing_callback_fails_the_request() {
        let config = directory_config_builder()
            .on(Event::Unauthorized, |_ctx| async { Err(anyhow::anyhow!("alerting down")) })
            .build();
        let (router, _) = app(config);

        let response = router.oneshot(get_request("/", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn failing_callback_is_logged_under_log_and_continue() {
        let config = directory_config_builder()
            .on(Event::Unauthorized, |_ctx| async { Err(anyhow::anyhow!("alerting down")) })
            .dispatch_policy(DispatchPolicy::LogAndContinue)
            .build();
        let (router, _) = app(config);

        let response = router.oneshot(get_request("/", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn login_callbacks_fire_in_order_on_every_login() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (first, second) = (Arc::clone(&log), Arc::clone(&log));
        let config = directory_config_builder()
            .on(Event::Login, move |_ctx| {
                let log = Arc::clone(&first);
                async move {
                    log.lock().push("first");
                    Ok(())
                }
            })
            .on(Event::Login, move |_ctx| {
                let log = Arc::clone(&second);
                async move {
                    log.lock().push("second");
                    Ok(())
                }
            })
            .build();
        let (router, _) = app(config);

        login_cookie(&router, "email=a@b.com&password=blueberry").await;
        login_cookie(&router, "email=c@d.com&password=blueberry").await;
        assert_eq!(*log.lock(), vec!["first", "second", "first", "second"]);
    }

    #[tokio::test]
    async fn authenticated_callbacks_see_current_user() {
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let config = directory_config_builder()
            .on(Event::Authenticated, move |ctx: RequestContext| {
                let sink = Arc::clone(&sink);
                async move {
                    *sink.lock() = ctx.current_user().map(|user| user.is_authenticated());
                    Ok(())
                }
            })
            .build();
        let (router, _) = app(config);
        let request = axum::http::Request::builder()
            .uri("/")
            .header("authorization", ADMIN_TOKEN)
            .body(Body::empty())
            .unwrap();

        router.oneshot(request).await.unwrap();
        assert_eq!(*seen.lock(), Some(true));
    }

    #[tokio::test]
    async fn guard_without_login_layer_is_a_server_error() {
        let router = Router::new()
            .route("/", get(|| async { "OK" }))
            .route_layer(axum::middleware::from_fn(secured));

        let response = router.oneshot(get_request("/", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
