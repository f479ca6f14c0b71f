// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::{LoginConfig, LoginConfigBuilder, MemorySessionStore, SessionConfig, Sessions};
use crate::store::UserDirectory;

#[derive(Clone)]
pub struct AppState {
    pub login: Arc<LoginConfig>,
    pub sessions: Sessions,
    pub directory: UserDirectory,
}

impl AppState {
    /// Wire `directory` into `builder` as the strategy backend.
    pub fn new(builder: LoginConfigBuilder, directory: UserDirectory, sessions: Sessions) -> Self {
        let login = directory.strategies(builder).build();
        Self {
            login: Arc::new(login),
            sessions,
            directory,
        }
    }

    /// Demo directory with an in-memory session store.
    pub fn in_memory(builder: LoginConfigBuilder) -> Self {
        let sessions = Sessions::new(MemorySessionStore::new(), SessionConfig::default());
        Self::new(builder, UserDirectory::demo(), sessions)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::in_memory(LoginConfig::builder())
    }
}
