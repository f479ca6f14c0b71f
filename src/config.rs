// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! at startup through [`Settings::from_env`].
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `LOGIN_SESSION_KEY` | Session key holding the login record | `__aiologin__` |
//! | `LOGIN_DISABLED` | Disable authorization (`1`, `true` or `yes`) | `false` |
//! | `LOGIN_HEADER` | Header consulted by the header strategy | `authorization` |
//! | `SESSION_COOKIE_NAME` | Session cookie name | `relational_session` |
//! | `SESSION_TTL_SECS` | Idle lifetime of a session | `86400` |
//! | `SESSION_REMEMBER_SECS` | Idle lifetime of a remembered session | `2592000` |
//! | `SESSION_COOKIE_SECURE` | Mark the session cookie `Secure` | `false` |
//! | `SESSION_PURGE_SECS` | Interval between expired-session sweeps | `300` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//!
//! Values that fail to parse fall back to their default.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use axum::http::{header::AUTHORIZATION, HeaderName};

use crate::auth::{SessionConfig, DEFAULT_SESSION_KEY};
use crate::auth::session::{DEFAULT_COOKIE_NAME, DEFAULT_REMEMBER_TTL, DEFAULT_SESSION_TTL};
use crate::reaper::DEFAULT_PURGE_INTERVAL;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Session key under which the login record is stored.
pub const LOGIN_SESSION_KEY_ENV: &str = "LOGIN_SESSION_KEY";

/// Bypass the guard, resolution and events. Intended for local development.
pub const LOGIN_DISABLED_ENV: &str = "LOGIN_DISABLED";

/// Header whose value is handed to the header strategy.
pub const LOGIN_HEADER_ENV: &str = "LOGIN_HEADER";

pub const SESSION_COOKIE_NAME_ENV: &str = "SESSION_COOKIE_NAME";
pub const SESSION_TTL_SECS_ENV: &str = "SESSION_TTL_SECS";
pub const SESSION_REMEMBER_SECS_ENV: &str = "SESSION_REMEMBER_SECS";

/// Set behind TLS termination so browsers only send the cookie over HTTPS.
pub const SESSION_COOKIE_SECURE_ENV: &str = "SESSION_COOKIE_SECURE";

pub const SESSION_PURGE_SECS_ENV: &str = "SESSION_PURGE_SECS";

pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// Process settings read from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub session_key: String,
    pub disabled: bool,
    pub header_name: HeaderName,
    pub session: SessionConfig,
    pub purge_interval: Duration,
    pub log_format: LogFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            session_key: DEFAULT_SESSION_KEY.to_string(),
            disabled: false,
            header_name: AUTHORIZATION,
            session: SessionConfig::default(),
            purge_interval: DEFAULT_PURGE_INTERVAL,
            log_format: LogFormat::default(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from an arbitrary variable source.
    pub fn from_lookup(source: impl Fn(&str) -> Option<String>) -> Self {
        let lookup = |key: &str| source(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let secs = |key: &str, default: Duration| {
            parsed::<u64>(lookup(key)).map(Duration::from_secs).unwrap_or(default)
        };

        Self {
            host: lookup(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parsed(lookup(PORT_ENV)).unwrap_or(DEFAULT_PORT),
            session_key: lookup(LOGIN_SESSION_KEY_ENV).unwrap_or_else(|| DEFAULT_SESSION_KEY.to_string()),
            disabled: lookup(LOGIN_DISABLED_ENV).is_some_and(|v| parse_flag(&v)),
            header_name: lookup(LOGIN_HEADER_ENV)
                .and_then(|v| HeaderName::from_bytes(v.as_bytes()).ok())
                .unwrap_or(AUTHORIZATION),
            session: SessionConfig {
                cookie_name: lookup(SESSION_COOKIE_NAME_ENV).unwrap_or_else(|| DEFAULT_COOKIE_NAME.to_string()),
                ttl: secs(SESSION_TTL_SECS_ENV, DEFAULT_SESSION_TTL),
                remember_ttl: secs(SESSION_REMEMBER_SECS_ENV, DEFAULT_REMEMBER_TTL),
                secure: lookup(SESSION_COOKIE_SECURE_ENV).is_some_and(|v| parse_flag(&v)),
            },
            purge_interval: secs(SESSION_PURGE_SECS_ENV, DEFAULT_PURGE_INTERVAL),
            log_format: parsed(lookup(LOG_FORMAT_ENV)).unwrap_or_default(),
        }
    }

    /// Address the server binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parsed<T: FromStr>(value: Option<String>) -> Option<T> {
    value.and_then(|v| v.parse().ok())
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Settings {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let s = settings(&[]);
        assert_eq!(s.bind_address(), "0.0.0.0:8080");
        assert_eq!(s.session_key, "__aiologin__");
        assert!(!s.disabled);
        assert_eq!(s.header_name, AUTHORIZATION);
        assert_eq!(s.session.cookie_name, "relational_session");
        assert_eq!(s.session.ttl, Duration::from_secs(86_400));
        assert_eq!(s.session.remember_ttl, Duration::from_secs(2_592_000));
        assert!(!s.session.secure);
        assert_eq!(s.purge_interval, Duration::from_secs(300));
        assert_eq!(s.log_format, LogFormat::Pretty);
    }

    #[test]
    fn reads_overrides() {
        let s = settings(&[
            ("PORT", "9000"),
            ("LOGIN_DISABLED", "Yes"),
            ("LOGIN_HEADER", "X-Api-Key"),
            ("LOGIN_SESSION_KEY", "user"),
            ("SESSION_TTL_SECS", "60"),
            ("SESSION_COOKIE_SECURE", "1"),
            ("LOG_FORMAT", "JSON"),
        ]);
        assert_eq!(s.port, 9000);
        assert!(s.disabled);
        assert_eq!(s.header_name.as_str(), "x-api-key");
        assert_eq!(s.session_key, "user");
        assert_eq!(s.session.ttl, Duration::from_secs(60));
        assert!(s.session.secure);
        assert_eq!(s.log_format, LogFormat::Json);
    }

    #[test]
    fn unparseable_values_fall_back() {
        let s = settings(&[
            ("PORT", "eighty"),
            ("LOGIN_DISABLED", "sometimes"),
            ("LOGIN_HEADER", "bad header"),
            ("SESSION_REMEMBER_SECS", "-1"),
            ("LOG_FORMAT", "xml"),
        ]);
        assert_eq!(s.port, DEFAULT_PORT);
        assert!(!s.disabled);
        assert_eq!(s.header_name, AUTHORIZATION);
        assert_eq!(s.session.remember_ttl, DEFAULT_REMEMBER_TTL);
        assert_eq!(s.log_format, LogFormat::Pretty);
    }
}
