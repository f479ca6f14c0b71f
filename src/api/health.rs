// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Health check response with individual component status.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Overall status, always "ok" while the process serves requests.
    pub status: String,
    /// Individual checks and their results.
    pub checks: HealthChecks,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    pub service: String,
    /// "enabled" or "disabled".
    pub login: String,
    /// Number of accounts in the directory.
    pub accounts: usize,
}

/// Health check endpoint handler.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let login = if state.login.disabled() { "disabled" } else { "enabled" };
    Json(HealthResponse {
        status: "ok".to_string(),
        checks: HealthChecks {
            service: "ok".to_string(),
            login: login.to_string(),
            accounts: state.directory.len(),
        },
    })
}
