// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, Request},
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info_span, Span};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{login_middleware, secured, session_middleware},
    models::{Profile, SessionResponse, User},
    state::AppState,
};

pub mod health;
pub mod session;

const REQUEST_ID: &str = "x-request-id";

pub fn router(state: AppState) -> Router {
    let secured_routes = Router::new()
        .route("/", get(session::home))
        .route("/me", get(session::me))
        .route_layer(from_fn(secured));

    let app = Router::new()
        .merge(secured_routes)
        .route("/login", get(session::login))
        .route("/logout", get(session::logout))
        .route("/health", get(health::health))
        .layer(from_fn_with_state(state.login.clone(), login_middleware))
        .layer(from_fn_with_state(state.sessions.config().clone(), session_middleware))
        .layer(state.sessions.layer())
        .with_state(state);

    Router::new()
        .merge(app)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(HeaderName::from_static(REQUEST_ID), MakeRequestUuid))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(REQUEST_ID)))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(CorsLayer::permissive()),
        )
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID)
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

#[derive(OpenApi)]
#[openapi(
    paths(
        session::home,
        session::me,
        session::login,
        session::logout,
        health::health
    ),
    components(
        schemas(
            User,
            Profile,
            SessionResponse,
            health::HealthResponse,
            health::HealthChecks
        )
    ),
    tags(
        (name = "Session", description = "Login, logout and secured routes"),
        (name = "Health", description = "Service health")
    )
)]
struct ApiDoc;
