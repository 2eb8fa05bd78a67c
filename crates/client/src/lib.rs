// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection driver for an EventStore TCP cluster node.
//!
//! The core is a single-threaded reactor ([`driver::Driver`]) consuming
//! typed messages and emitting typed transmissions: connection
//! establishment, the authentication/identification handshake, correlation
//! of in-flight requests, bounded retry and master redirection, heartbeat
//! servicing, and clean shutdown. [`client::Client`] wires the reactor to
//! real sockets.

pub mod client;
pub mod codec;
pub mod config;
pub mod driver;
pub mod env;
pub mod error;
pub mod events;
pub mod package;
pub mod proto;
pub mod reactor;
pub mod registry;
pub mod retry;
pub mod state;
pub mod transport;

pub use client::Client;
pub use config::Settings;
pub use driver::Driver;
pub use error::{BadNews, OperationError};
pub use events::{ConnectionId, EndPoint, Msg, NodeEndPoints, Transmission};
pub use package::{Cmd, Credentials, Package};
pub use retry::Retry;
