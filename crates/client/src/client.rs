// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thin handle over a running driver: submit packages, receive completed
//! exchanges, shut down. The per-operation encoder layer lives above this
//! crate.

use std::fmt;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::Settings;
use crate::driver::Driver;
use crate::error::BadNews;
use crate::events::Msg;
use crate::package::Package;
use crate::reactor;
use crate::transport::{self, TcpEnv};

/// The reactor has shut down and no longer accepts submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Closed;

impl fmt::Display for Closed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("client closed")
    }
}

impl std::error::Error for Closed {}

/// Handle to a spawned connection driver.
pub struct Client {
    msg_tx: mpsc::Sender<Msg>,
    recv_rx: mpsc::Receiver<Result<Package, BadNews>>,
    shutdown: CancellationToken,
}

impl Client {
    /// Wire the reactor, transport, and router tasks, then boot the driver
    /// with `SystemInit`. Must be called within a tokio runtime.
    pub fn spawn(settings: Settings) -> Self {
        let buffer = settings.msg_buffer.max(1);
        let (msg_tx, msg_rx) = mpsc::channel(buffer);
        let (out_tx, out_rx) = mpsc::channel(buffer);
        let (recv_tx, recv_rx) = mpsc::channel(buffer);

        let (env, conns) = TcpEnv::new(settings.seeds.clone(), msg_tx.clone());
        let driver = Driver::new(settings, env);
        let shutdown = CancellationToken::new();

        tokio::spawn(reactor::run(driver, msg_rx, out_tx, shutdown.clone()));
        tokio::spawn(transport::route_transmissions(out_rx, conns, recv_tx));

        let boot_tx = msg_tx.clone();
        tokio::spawn(async move {
            let _ = boot_tx.send(Msg::SystemInit).await;
        });

        Self { msg_tx, recv_rx, shutdown }
    }

    /// Submit one package. Buffered until the driver is active; answered
    /// with `Aborted` if the driver is already closed.
    pub async fn submit(&self, pkg: Package) -> Result<(), Closed> {
        self.msg_tx.send(Msg::SendPackage(pkg)).await.map_err(|_| Closed)
    }

    /// Next completed exchange. `None` once the driver has shut down and
    /// every outstanding result was delivered.
    pub async fn recv(&mut self) -> Option<Result<Package, BadNews>> {
        self.recv_rx.recv().await
    }

    /// Graceful shutdown: queued messages are processed first, then every
    /// outstanding exchange aborts.
    pub async fn shutdown(&self) {
        if self.msg_tx.send(Msg::Shutdown).await.is_err() {
            self.shutdown.cancel();
        }
    }
}
