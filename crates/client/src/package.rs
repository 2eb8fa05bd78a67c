// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The wire unit of the protocol: one framed package, carrying a command
//! byte, a correlation UUID, an opaque payload, and optional per-request
//! credentials.

use std::fmt;

use bytes::Bytes;
use prost::Message;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::proto;

/// One-byte command code.
///
/// Only the handshake/admin subset is named here; every other value is a
/// data command the driver passes through opaquely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cmd(pub u8);

impl Cmd {
    pub const HEARTBEAT_REQUEST: Cmd = Cmd(0x01);
    pub const HEARTBEAT_RESPONSE: Cmd = Cmd(0x02);
    pub const PING: Cmd = Cmd(0x03);
    pub const PONG: Cmd = Cmd(0x04);
    pub const BAD_REQUEST: Cmd = Cmd(0xF0);
    pub const NOT_HANDLED: Cmd = Cmd(0xF1);
    pub const AUTHENTICATE: Cmd = Cmd(0xF2);
    pub const AUTHENTICATED: Cmd = Cmd(0xF3);
    pub const NOT_AUTHENTICATED: Cmd = Cmd(0xF4);
    pub const IDENTIFY_CLIENT: Cmd = Cmd(0xF5);
    pub const CLIENT_IDENTIFIED: Cmd = Cmd(0xF6);

    /// Human-readable name for the known subset, `None` for data commands.
    pub fn name(&self) -> Option<&'static str> {
        match self.0 {
            0x01 => Some("heartbeat_request"),
            0x02 => Some("heartbeat_response"),
            0x03 => Some("ping"),
            0x04 => Some("pong"),
            0xF0 => Some("bad_request"),
            0xF1 => Some("not_handled"),
            0xF2 => Some("authenticate"),
            0xF3 => Some("authenticated"),
            0xF4 => Some("not_authenticated"),
            0xF5 => Some("identify_client"),
            0xF6 => Some("client_identified"),
            _ => None,
        }
    }
}

impl fmt::Display for Cmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "0x{:02X}", self.0),
        }
    }
}

/// Username/password pair attached to a package when the server requires
/// per-request auth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self { username: username.into(), password: password.into() }
    }
}

/// One framed wire message.
#[derive(Debug, Clone, PartialEq)]
pub struct Package {
    pub cmd: Cmd,
    pub correlation: Uuid,
    pub payload: Bytes,
    pub credentials: Option<Credentials>,
}

impl Package {
    /// Build a package with an empty payload and no credentials.
    pub fn new(cmd: Cmd, correlation: Uuid) -> Self {
        Self { cmd, correlation, payload: Bytes::new(), credentials: None }
    }

    pub fn with_payload(mut self, payload: impl Into<Bytes>) -> Self {
        self.payload = payload.into();
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Answer to a server heartbeat request; echoes the request correlation.
    pub fn heartbeat_response(correlation: Uuid) -> Self {
        Self::new(Cmd::HEARTBEAT_RESPONSE, correlation)
    }

    /// First handshake stage when default credentials are configured.
    pub fn authenticate(correlation: Uuid, credentials: Credentials) -> Self {
        Self::new(Cmd::AUTHENTICATE, correlation).with_credentials(credentials)
    }

    /// Identification request carrying the client version and connection
    /// name.
    pub fn identify_client(correlation: Uuid, version: i32, connection_name: &str) -> Self {
        let body = proto::IdentifyClient {
            version,
            connection_name: Some(connection_name.to_owned()),
        };
        Self::new(Cmd::IDENTIFY_CLIENT, correlation).with_payload(body.encode_to_vec())
    }
}

#[cfg(test)]
#[path = "package_tests.rs"]
mod package_tests;
