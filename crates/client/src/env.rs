// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use uuid::Uuid;

use crate::events::{ConnectionId, EndPoint, NodeEndPoints};

/// Capabilities the reactor invokes on its environment.
///
/// Every method is synchronous and infallible from the reactor's point of
/// view: a production implementation dispatches work and returns quickly,
/// with completions arriving later as [`crate::events::Msg`]s on the input
/// queue. Tests inject a recorder that stores invocations and returns
/// scripted results.
pub trait Env {
    /// Start opening a TCP session to `endpoint`; the returned handle is
    /// confirmed later by `ConnectionEstablished`.
    fn connect(&mut self, endpoint: &EndPoint) -> ConnectionId;

    /// Tear down the session for `id`. The driver calls this at most once
    /// per handle; sessions announced dead via `ConnectionDropped` are
    /// already closed by the transport.
    fn close_connection(&mut self, id: ConnectionId);

    /// Initiate endpoint discovery; completion arrives as
    /// `EstablishConnection`.
    fn discover(&mut self);

    /// Fresh correlation UUID.
    fn generate_id(&mut self) -> Uuid;

    /// Monotonic elapsed time since driver start.
    fn elapsed(&self) -> Duration;

    /// Close the current session and open a new one to the redirection
    /// target. Closing is the implementation's job; the driver does not
    /// also call [`Env::close_connection`] for the replaced session.
    fn force_reconnect(&mut self, correlation: Uuid, node: &NodeEndPoints) -> ConnectionId;
}
