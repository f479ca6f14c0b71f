// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relational Login - Session-Based Authorization for Axum
//!
//! This crate provides a login layer that resolves the principal behind a
//! request from a header token or the session, guards secured routes and
//! notifies registered callbacks about lifecycle events.
//!
//! ## Modules
//!
//! - `auth` - Login layer: principals, strategies, events, sessions, guard
//! - `api` - Demo HTTP API (Axum)
//! - `config` - Environment configuration
//! - `reaper` - Background purge of expired sessions
//! - `store` - In-memory user directory backing the demo strategies
//! - `telemetry` - Tracing setup

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod reaper;
pub mod state;
pub mod store;
pub mod telemetry;
