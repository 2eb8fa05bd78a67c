// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test harness for end-to-end client smoke tests.
//!
//! Runs an in-process fake EventStore node speaking the framed TCP
//! protocol: it answers the handshake, services data commands per its
//! [`NodeMode`], records every inbound package for inspection, and can
//! push arbitrary packages at the client.

use std::time::Duration;

use anyhow::Context;
use futures_util::{SinkExt, StreamExt};
use prost::Message;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::codec::Framed;

use evstore::codec::PackageCodec;
use evstore::proto;
use evstore::{Cmd, EndPoint, Package};

/// How long harness waits count as "never happened".
pub const TIMEOUT: Duration = Duration::from_secs(10);

/// How the node answers data commands. Handshake and heartbeat commands
/// are always answered properly regardless of mode.
#[derive(Debug, Clone)]
pub enum NodeMode {
    /// Answer each data command with `Cmd(request + 1)`, echoing the
    /// correlation (so `Ping` becomes `Pong`).
    Master,
    /// Answer each data command with `BadRequest` carrying this reason.
    Reject(String),
    /// Answer each data command with `NotHandled { NotMaster }` pointing
    /// at this endpoint.
    RedirectTo(EndPoint),
    /// Swallow data commands; exchanges stay outstanding forever.
    Silent,
}

/// A fake node accepting one client connection at a time.
pub struct FakeNode {
    endpoint: EndPoint,
    inbound_rx: mpsc::UnboundedReceiver<Package>,
    push_tx: mpsc::UnboundedSender<Package>,
}

impl FakeNode {
    pub async fn spawn(mode: NodeMode) -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let endpoint = EndPoint::new("127.0.0.1", listener.local_addr()?.port());
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (push_tx, push_rx) = mpsc::unbounded_channel();
        tokio::spawn(serve(listener, mode, inbound_tx, push_rx));
        Ok(Self { endpoint, inbound_rx, push_tx })
    }

    pub fn endpoint(&self) -> EndPoint {
        self.endpoint.clone()
    }

    /// Next package the node received from the client.
    pub async fn next_package(&mut self) -> anyhow::Result<Package> {
        tokio::time::timeout(TIMEOUT, self.inbound_rx.recv())
            .await
            .context("timed out waiting for a package from the client")?
            .context("fake node stopped")
    }

    /// Receive packages until one matches `cmd`.
    pub async fn package_with_cmd(&mut self, cmd: Cmd) -> anyhow::Result<Package> {
        loop {
            let pkg = self.next_package().await?;
            if pkg.cmd == cmd {
                return Ok(pkg);
            }
        }
    }

    /// Push a package at the connected client.
    pub fn push(&self, pkg: Package) {
        let _ = self.push_tx.send(pkg);
    }
}

async fn serve(
    listener: TcpListener,
    mode: NodeMode,
    inbound_tx: mpsc::UnboundedSender<Package>,
    mut push_rx: mpsc::UnboundedReceiver<Package>,
) {
    loop {
        let Ok((stream, _)) = listener.accept().await else { return };
        handle_connection(stream, &mode, &inbound_tx, &mut push_rx).await;
    }
}

async fn handle_connection(
    stream: TcpStream,
    mode: &NodeMode,
    inbound_tx: &mpsc::UnboundedSender<Package>,
    push_rx: &mut mpsc::UnboundedReceiver<Package>,
) {
    let mut framed = Framed::new(stream, PackageCodec);
    loop {
        tokio::select! {
            incoming = framed.next() => {
                let Some(Ok(pkg)) = incoming else { return };
                let _ = inbound_tx.send(pkg.clone());
                if let Some(reply) = respond(mode, &pkg) {
                    if framed.send(reply).await.is_err() {
                        return;
                    }
                }
            }
            pushed = push_rx.recv() => {
                let Some(pkg) = pushed else { return };
                if framed.send(pkg).await.is_err() {
                    return;
                }
            }
        }
    }
}

fn respond(mode: &NodeMode, pkg: &Package) -> Option<Package> {
    if pkg.cmd == Cmd::AUTHENTICATE {
        Some(Package::new(Cmd::AUTHENTICATED, pkg.correlation))
    } else if pkg.cmd == Cmd::IDENTIFY_CLIENT {
        Some(Package::new(Cmd::CLIENT_IDENTIFIED, pkg.correlation))
    } else if pkg.cmd == Cmd::HEARTBEAT_REQUEST {
        Some(Package::heartbeat_response(pkg.correlation))
    } else if pkg.cmd == Cmd::HEARTBEAT_RESPONSE {
        None
    } else {
        data_response(mode, pkg)
    }
}

fn data_response(mode: &NodeMode, pkg: &Package) -> Option<Package> {
    match mode {
        NodeMode::Master => {
            Some(Package::new(Cmd(pkg.cmd.0.wrapping_add(1)), pkg.correlation))
        }
        NodeMode::Reject(reason) => Some(
            Package::new(Cmd::BAD_REQUEST, pkg.correlation)
                .with_payload(reason.clone().into_bytes()),
        ),
        NodeMode::RedirectTo(target) => {
            let info = proto::MasterInfo {
                external_tcp_address: target.host.clone(),
                external_tcp_port: i32::from(target.port),
                external_http_address: target.host.clone(),
                external_http_port: 2113,
                external_secure_tcp_address: None,
                external_secure_tcp_port: None,
            };
            let body = proto::NotHandled {
                reason: proto::NotHandledReason::NotMaster as i32,
                additional_info: Some(info.encode_to_vec()),
            };
            Some(
                Package::new(Cmd::NOT_HANDLED, pkg.correlation)
                    .with_payload(body.encode_to_vec()),
            )
        }
        NodeMode::Silent => None,
    }
}
