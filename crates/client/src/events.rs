// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Input and output alphabets of the reactor, plus the connection and
//! endpoint identities they carry.
//!
//! The reactor consumes [`Msg`]s from one queue and emits [`Transmission`]s
//! to one sink; nothing else crosses its boundary.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::BadNews;
use crate::package::Package;

/// Opaque handle minted by the environment when a TCP connection is opened.
///
/// Monotonically refreshes on reconnect; packages bearing a stale handle
/// never mutate driver state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for ConnectionId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A `(host, port)` pair the environment can connect to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndPoint {
    pub host: String,
    pub port: u16,
}

impl EndPoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port }
    }
}

impl fmt::Display for EndPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Master-redirection payload: where the current cluster master lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeEndPoints {
    pub tcp: EndPoint,
    pub secure_tcp: Option<EndPoint>,
}

/// Input message set of the reactor.
#[derive(Debug, Clone)]
pub enum Msg {
    /// Boot; triggers endpoint discovery.
    SystemInit,
    /// Discovery completed with an endpoint to connect to.
    EstablishConnection(EndPoint),
    /// The TCP session for this handle is up.
    ConnectionEstablished(ConnectionId),
    /// The TCP session for this handle died or never came up.
    ConnectionDropped(ConnectionId),
    /// A package arrived from the socket reader.
    PackageArrived(ConnectionId, Package),
    /// User submission.
    SendPackage(Package),
    /// Terminate: abort everything outstanding and close the session.
    Shutdown,
}

impl Msg {
    /// Wire-format tag, for log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SystemInit => "system_init",
            Self::EstablishConnection(_) => "establish_connection",
            Self::ConnectionEstablished(_) => "connection_established",
            Self::ConnectionDropped(_) => "connection_dropped",
            Self::PackageArrived(_, _) => "package_arrived",
            Self::SendPackage(_) => "send_package",
            Self::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for Msg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output transmission set of the reactor.
#[derive(Debug, Clone)]
pub enum Transmission {
    /// Frame and write to the live socket.
    Send(Package),
    /// Received package matched no exchange or a stale connection;
    /// observable for metrics and debugging, never fatal.
    Ignored(Package),
    /// Completed exchange delivered to the awaiting caller.
    Recv(Result<Package, BadNews>),
}
