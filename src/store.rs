// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory user directory backing the demo strategies.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::auth::{Attributes, Credentials, LoginConfigBuilder, Principal, SharedPrincipal};
use crate::models::User;

/// Demo account seeded by [`UserDirectory::demo`].
pub const DEMO_EMAIL: &str = "trivigy@gmail.com";
pub const DEMO_PASSWORD: &str = "blueberry";
pub const DEMO_TOKEN: &str = "1234567890";
pub const DEMO_BANNED_EMAIL: &str = "banned@example.com";

struct Account {
    password: String,
    banned: bool,
}

#[derive(Default)]
struct Directory {
    accounts: HashMap<String, Account>,
    tokens: HashMap<String, String>,
}

/// Accounts and API tokens.
#[derive(Clone, Default)]
pub struct UserDirectory {
    inner: Arc<RwLock<Directory>>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory with one regular and one banned account.
    pub fn demo() -> Self {
        let directory = Self::new();
        directory.insert_account(DEMO_EMAIL, DEMO_PASSWORD, false);
        directory.insert_account(DEMO_BANNED_EMAIL, DEMO_PASSWORD, true);
        directory.insert_token(DEMO_TOKEN, DEMO_EMAIL);
        directory
    }

    pub fn insert_account(&self, email: impl Into<String>, password: impl Into<String>, banned: bool) {
        self.inner.write().accounts.insert(
            email.into(),
            Account {
                password: password.into(),
                banned,
            },
        );
    }

    /// Issue `token` for an existing account. Returns false for unknown
    /// accounts.
    pub fn insert_token(&self, token: impl Into<String>, email: &str) -> bool {
        let mut directory = self.inner.write();
        if !directory.accounts.contains_key(email) {
            return false;
        }
        directory.tokens.insert(token.into(), email.to_string());
        true
    }

    pub fn ban(&self, email: &str) {
        if let Some(account) = self.inner.write().accounts.get_mut(email) {
            account.banned = true;
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn find(&self, email: &str) -> Option<User> {
        self.inner.read().accounts.get(email).map(|account| User {
            email: email.to_string(),
            banned: account.banned,
        })
    }

    /// Account owning an API token.
    pub fn by_token(&self, token: &str) -> Option<User> {
        let email = self.inner.read().tokens.get(token).cloned()?;
        self.find(&email)
    }

    /// Account matching the persisted attributes.
    ///
    /// The account is looked up again so bans and deletions take effect on
    /// live sessions.
    pub fn by_attributes(&self, attrs: &Attributes) -> Option<User> {
        let user = User::from_attributes(attrs)?;
        self.find(&user.email)
    }

    pub fn by_credentials(&self, credentials: &Credentials) -> Option<User> {
        let directory = self.inner.read();
        let account = directory.accounts.get(&credentials.email)?;
        (account.password == credentials.password).then(|| User {
            email: credentials.email.clone(),
            banned: account.banned,
        })
    }

    /// Install the three strategies on `builder`.
    pub fn strategies(&self, builder: LoginConfigBuilder) -> LoginConfigBuilder {
        let (by_header, by_session, by_form) = (self.clone(), self.clone(), self.clone());
        builder
            .auth_by_header(move |_ctx, token| {
                let user = by_header.by_token(&token);
                async move { Ok(user.map(shared)) }
            })
            .auth_by_session(move |_ctx, attrs| {
                let user = by_session.by_attributes(&attrs);
                async move { Ok(user.map(shared)) }
            })
            .auth_by_form(move |_ctx, credentials| {
                let user = by_form.by_credentials(&credentials);
                async move { Ok(user.map(shared)) }
            })
    }
}

fn shared(user: User) -> SharedPrincipal {
    user.into_shared()
}
