// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};

use crate::events::EndPoint;
use crate::package::Credentials;
use crate::retry::Retry;

/// Client settings consumed by the driver and the transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Seed endpoints for discovery, tried round-robin.
    pub seeds: Vec<EndPoint>,

    /// When present, the handshake starts with an authentication stage and
    /// these credentials ride along on it.
    pub default_user_credentials: Option<Credentials>,

    /// Connection name sent during identification. When absent an
    /// `ES-<uuid>` name is generated.
    pub default_connection_name: Option<String>,

    /// Retry budget for exchanges the server reported as unroutable.
    pub operation_retry: Retry,

    /// Bound of the reactor input queue; back-pressure point for
    /// submissions and socket events.
    pub msg_buffer: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            seeds: vec![EndPoint::new("127.0.0.1", 1113)],
            default_user_credentials: None,
            default_connection_name: None,
            operation_retry: Retry::AtMost(10),
            msg_buffer: 512,
        }
    }
}

impl Settings {
    pub fn with_seed(mut self, seed: EndPoint) -> Self {
        self.seeds = vec![seed];
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.default_user_credentials = Some(credentials);
        self
    }

    pub fn with_connection_name(mut self, name: impl Into<String>) -> Self {
        self.default_connection_name = Some(name.into());
        self
    }

    pub fn with_retry(mut self, retry: Retry) -> Self {
        self.operation_retry = retry;
        self
    }
}
