// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Login, logout and secured demo endpoints.

use axum::{extract::Query, Json};

use crate::auth::{AuthError, AuthManager, Credentials, CurrentUser};
use crate::models::{LoginQuery, Profile, SessionResponse, User};

/// Secured landing page.
#[utoipa::path(
    get,
    path = "/",
    tag = "Session",
    responses(
        (status = 200, description = "Authenticated", body = String),
        (status = 401, description = "No authenticated principal"),
        (status = 403, description = "Principal is banned"),
    )
)]
pub async fn home() -> &'static str {
    "OK"
}

/// Identity of the current principal.
#[utoipa::path(
    get,
    path = "/me",
    tag = "Session",
    responses(
        (status = 200, description = "Current user, anonymous while login is disabled", body = Profile),
        (status = 401, description = "No authenticated principal"),
        (status = 403, description = "Principal is banned"),
    )
)]
pub async fn me(CurrentUser(user): CurrentUser) -> Result<Json<Profile>, AuthError> {
    if !user.is_authenticated() {
        return Ok(Json(Profile::anonymous()));
    }
    if let Some(user) = user.downcast_ref::<User>() {
        return Ok(Json(Profile::from(user.clone())));
    }
    User::from_attributes(&user.to_attributes())
        .map(|user| Json(Profile::from(user)))
        .ok_or_else(|| AuthError::InvalidPrincipal(format!("not a directory user: {user:?}")))
}

/// Check credentials and start a session.
#[utoipa::path(
    get,
    path = "/login",
    tag = "Session",
    params(LoginQuery),
    responses(
        (status = 200, description = "Logged in", body = SessionResponse),
        (status = 401, description = "Credentials were not accepted"),
    )
)]
pub async fn login(manager: AuthManager, Query(query): Query<LoginQuery>) -> Result<Json<SessionResponse>, AuthError> {
    let credentials = Credentials::new(query.email, query.password);
    let principal = manager.authenticate(credentials, query.remember).await?;
    let email = principal
        .downcast_ref::<User>()
        .map(|user| user.email.clone());

    Ok(Json(SessionResponse {
        status: "logged_in".to_string(),
        email,
    }))
}

/// End the session.
#[utoipa::path(
    get,
    path = "/logout",
    tag = "Session",
    responses(
        (status = 200, description = "Logged out", body = SessionResponse),
    )
)]
pub async fn logout(manager: AuthManager) -> Result<Json<SessionResponse>, AuthError> {
    manager.logout().await?;
    Ok(Json(SessionResponse {
        status: "logged_out".to_string(),
        email: None,
    }))
}
