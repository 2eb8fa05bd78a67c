// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Correlation registry: in-flight exchanges keyed by correlation UUID.
//!
//! Owned exclusively by the reactor; no concurrent access.

use std::time::Duration;

use indexmap::IndexMap;
use uuid::Uuid;

use crate::package::Package;

/// One outstanding request: the original package, how many times it has
/// been retried, and when it first went out.
#[derive(Debug, Clone, PartialEq)]
pub struct Exchange {
    pub request: Package,
    pub retry_count: u32,
    pub started: Duration,
}

impl Exchange {
    pub fn new(request: Package, started: Duration) -> Self {
        Self { request, retry_count: 0, started }
    }

    pub fn correlation(&self) -> Uuid {
        self.request.correlation
    }
}

/// Map from correlation to [`Exchange`]. Keys unique; a correlation appears
/// at most once.
///
/// Backed by an `IndexMap` so iteration (survivor selection, shutdown
/// drain) follows insertion order rather than hash order.
#[derive(Debug, Default)]
pub struct Registry {
    entries: IndexMap<Uuid, Exchange>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert keyed by the request correlation, replacing any previous
    /// entry with the same key.
    pub fn insert(&mut self, exchange: Exchange) {
        self.entries.insert(exchange.correlation(), exchange);
    }

    /// Single-pass lookup and delete.
    pub fn remove(&mut self, correlation: &Uuid) -> Option<Exchange> {
        self.entries.swap_remove(correlation)
    }

    pub fn contains(&self, correlation: &Uuid) -> bool {
        self.entries.contains_key(correlation)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Exchange> {
        self.entries.values()
    }

    /// Remove and yield every exchange, oldest insertion first.
    pub fn drain(&mut self) -> impl Iterator<Item = Exchange> + '_ {
        self.entries.drain(..).map(|(_, exchange)| exchange)
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod registry_tests;
