// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Principal contract and the anonymous principal.
//!
//! Every identity the login layer deals with implements [`Principal`]. The
//! layer itself never knows concrete user shapes: it persists a principal
//! through [`Principal::to_attributes`] and asks the session strategy to
//! rebuild it from those attributes on the next request.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Flat attribute map used to persist a principal in the session.
pub type Attributes = BTreeMap<String, Primitive>;

/// A principal shared between the manager, the request and event callbacks.
pub type SharedPrincipal = Arc<dyn Principal>;

/// Primitive attribute value.
///
/// Integers stay exact across the whole `i64` and `u64` ranges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Primitive {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
}

impl Primitive {
    /// Borrow the value as a string, if it is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Primitive::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Primitive::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Primitive::Int(i) => Some(*i),
            Primitive::UInt(u) => i64::try_from(*u).ok(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Primitive::Int(i) => u64::try_from(*i).ok(),
            Primitive::UInt(u) => Some(*u),
            _ => None,
        }
    }
}

impl From<&str> for Primitive {
    fn from(value: &str) -> Self {
        Primitive::Str(value.to_string())
    }
}

impl From<String> for Primitive {
    fn from(value: String) -> Self {
        Primitive::Str(value)
    }
}

impl From<bool> for Primitive {
    fn from(value: bool) -> Self {
        Primitive::Bool(value)
    }
}

impl From<i64> for Primitive {
    fn from(value: i64) -> Self {
        Primitive::Int(value)
    }
}

impl From<u64> for Primitive {
    fn from(value: u64) -> Self {
        Primitive::UInt(value)
    }
}

impl From<f64> for Primitive {
    fn from(value: f64) -> Self {
        Primitive::Float(value)
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Primitive::Null => write!(f, "null"),
            Primitive::Bool(b) => write!(f, "{b}"),
            Primitive::Int(i) => write!(f, "{i}"),
            Primitive::UInt(u) => write!(f, "{u}"),
            Primitive::Float(x) => write!(f, "{x}"),
            Primitive::Str(s) => write!(f, "{s}"),
        }
    }
}

/// Capability contract every principal satisfies.
///
/// Reconstruction from attributes is not part of the trait: it belongs to
/// the session strategy, which knows the concrete type.
pub trait Principal: Any + Send + Sync + fmt::Debug {
    /// Whether the principal proved its identity.
    fn is_authenticated(&self) -> bool;

    /// Whether the principal is barred from secured handlers.
    fn is_forbidden(&self) -> bool;

    /// Identity attributes to persist in the session.
    fn to_attributes(&self) -> Attributes;

    /// Wrap the principal for sharing.
    fn into_shared(self) -> SharedPrincipal
    where
        Self: Sized,
    {
        Arc::new(self)
    }
}

impl dyn Principal {
    /// Downcast to the concrete principal type.
    pub fn downcast_ref<T: Principal>(&self) -> Option<&T> {
        let any: &dyn Any = self;
        any.downcast_ref::<T>()
    }

    /// Look up a single attribute.
    pub fn attribute(&self, key: &str) -> Option<Primitive> {
        self.to_attributes().remove(key)
    }
}

/// The principal used when no strategy recognizes the request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnonymousPrincipal;

impl Principal for AnonymousPrincipal {
    fn is_authenticated(&self) -> bool {
        false
    }

    fn is_forbidden(&self) -> bool {
        false
    }

    fn to_attributes(&self) -> Attributes {
        Attributes::new()
    }
}
