// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Driver state: one tagged union per lifecycle dimension.
//!
//! Exactly one [`DriverState`] variant is current after any message is
//! processed. All transitions live in [`crate::driver`]; this module only
//! holds the data.

use std::fmt;
use std::time::Duration;

use uuid::Uuid;

use crate::events::ConnectionId;
use crate::package::Package;
use crate::registry::Registry;

/// Where a not-yet-connected driver is in the reconnect cycle.
#[derive(Debug, PartialEq)]
pub enum ConnectingStage {
    /// Discovery requested but its completion not yet consumed.
    Reconnecting,
    /// Discovery in flight.
    EndpointDiscovery,
    /// TCP socket opening for this handle.
    ConnectionEstablishing(ConnectionId),
}

/// Which handshake package is outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakePhase {
    Authentication,
    Identification,
}

impl HandshakePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::Identification => "identification",
        }
    }
}

impl fmt::Display for HandshakePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stage of a bound TCP session.
#[derive(Debug)]
pub enum ConnectedStage {
    /// Handshake in progress. `correlation` matches exactly one unanswered
    /// wire package; the registry does not exist yet and user submissions
    /// keep buffering in `pending`.
    Confirming {
        pending: Vec<Package>,
        started: Duration,
        correlation: Uuid,
        phase: HandshakePhase,
    },
    /// Steady state; every outstanding wire request is in the registry.
    Active(Registry),
}

/// The driver's complete state.
#[derive(Debug)]
pub enum DriverState {
    /// Before any message has been processed.
    Init,
    /// No live session; user submissions queue in `pending`.
    Awaiting { pending: Vec<Package>, stage: ConnectingStage },
    /// TCP session bound.
    Connected { id: ConnectionId, stage: ConnectedStage },
    /// Terminal.
    Closed,
}

impl DriverState {
    /// Short tag for log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Awaiting { stage: ConnectingStage::Reconnecting, .. } => "reconnecting",
            Self::Awaiting { stage: ConnectingStage::EndpointDiscovery, .. } => {
                "endpoint_discovery"
            }
            Self::Awaiting { stage: ConnectingStage::ConnectionEstablishing(_), .. } => {
                "connection_establishing"
            }
            Self::Connected { stage: ConnectedStage::Confirming { .. }, .. } => "confirming",
            Self::Connected { stage: ConnectedStage::Active(_), .. } => "active",
            Self::Closed => "closed",
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for DriverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
