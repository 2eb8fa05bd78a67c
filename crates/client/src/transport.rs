// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Production environment: real sockets behind the [`Env`] capabilities.
//!
//! The reactor stays synchronous; everything here dispatches work onto
//! tokio tasks and reports completions back through the message queue.
//! One connection is live at a time, published on a watch channel the
//! transmission router reads the writer from.

use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::codec::PackageCodec;
use crate::env::Env;
use crate::error::BadNews;
use crate::events::{ConnectionId, EndPoint, Msg, NodeEndPoints, Transmission};
use crate::package::Package;

/// Writer-channel depth per connection.
const WRITE_BUFFER: usize = 64;

/// Writer handle for one live connection.
#[derive(Clone)]
struct Conn {
    id: ConnectionId,
    out_tx: mpsc::Sender<Package>,
    cancel: CancellationToken,
}

/// Read side of the live-connection watch; held by the transmission
/// router.
pub struct ConnWatch(watch::Receiver<Option<Conn>>);

impl ConnWatch {
    /// Writer for the live connection, if any.
    fn sender(&self) -> Option<mpsc::Sender<Package>> {
        self.0.borrow().as_ref().map(|conn| conn.out_tx.clone())
    }
}

/// [`Env`] implementation over tokio TCP.
pub struct TcpEnv {
    msg_tx: mpsc::Sender<Msg>,
    conn_tx: watch::Sender<Option<Conn>>,
    seeds: Vec<EndPoint>,
    cursor: usize,
    origin: Instant,
}

impl TcpEnv {
    /// Returns the environment and the connection watch the transmission
    /// router needs.
    pub fn new(seeds: Vec<EndPoint>, msg_tx: mpsc::Sender<Msg>) -> (Self, ConnWatch) {
        let (conn_tx, conn_rx) = watch::channel(None);
        let env = Self { msg_tx, conn_tx, seeds, cursor: 0, origin: Instant::now() };
        (env, ConnWatch(conn_rx))
    }
}

impl Env for TcpEnv {
    fn connect(&mut self, endpoint: &EndPoint) -> ConnectionId {
        let id = ConnectionId::new();
        let (out_tx, out_rx) = mpsc::channel(WRITE_BUFFER);
        let cancel = CancellationToken::new();
        let previous = self.conn_tx.send_replace(Some(Conn { id, out_tx, cancel: cancel.clone() }));
        if let Some(old) = previous {
            old.cancel.cancel();
        }
        tokio::spawn(run_connection(endpoint.clone(), id, out_rx, self.msg_tx.clone(), cancel));
        id
    }

    fn close_connection(&mut self, id: ConnectionId) {
        self.conn_tx.send_if_modified(|slot| {
            if slot.as_ref().is_some_and(|conn| conn.id == id) {
                if let Some(conn) = slot.take() {
                    conn.cancel.cancel();
                }
                true
            } else {
                false
            }
        });
    }

    fn discover(&mut self) {
        let Some(endpoint) = self.seeds.get(self.cursor % self.seeds.len().max(1)).cloned()
        else {
            warn!("no seed endpoints configured; discovery stalls");
            return;
        };
        self.cursor = self.cursor.wrapping_add(1);
        let msg_tx = self.msg_tx.clone();
        tokio::spawn(async move {
            let _ = msg_tx.send(Msg::EstablishConnection(endpoint)).await;
        });
    }

    fn generate_id(&mut self) -> Uuid {
        Uuid::new_v4()
    }

    fn elapsed(&self) -> Duration {
        self.origin.elapsed()
    }

    fn force_reconnect(&mut self, correlation: Uuid, node: &NodeEndPoints) -> ConnectionId {
        debug!(correlation = %correlation, master = %node.tcp, "reconnecting to master");
        // `connect` replaces the live connection, which cancels it.
        self.connect(&node.tcp)
    }
}

/// Open the socket, report establishment, then pump frames both ways until
/// cancellation or socket death.
async fn run_connection(
    endpoint: EndPoint,
    id: ConnectionId,
    mut out_rx: mpsc::Receiver<Package>,
    msg_tx: mpsc::Sender<Msg>,
    cancel: CancellationToken,
) {
    let stream = tokio::select! {
        result = TcpStream::connect((endpoint.host.as_str(), endpoint.port)) => match result {
            Ok(stream) => stream,
            Err(e) => {
                warn!(endpoint = %endpoint, error = %e, "connect failed");
                let _ = msg_tx.send(Msg::ConnectionDropped(id)).await;
                return;
            }
        },
        _ = cancel.cancelled() => return,
    };
    let _ = stream.set_nodelay(true);

    if msg_tx.send(Msg::ConnectionEstablished(id)).await.is_err() {
        return;
    }
    let mut framed = Framed::new(stream, PackageCodec);

    loop {
        tokio::select! {
            incoming = framed.next() => match incoming {
                Some(Ok(pkg)) => {
                    if msg_tx.send(Msg::PackageArrived(id, pkg)).await.is_err() {
                        return;
                    }
                }
                Some(Err(e)) => {
                    warn!(connection = %id, error = %e, "socket read failed");
                    let _ = msg_tx.send(Msg::ConnectionDropped(id)).await;
                    return;
                }
                None => {
                    debug!(connection = %id, "socket closed by peer");
                    let _ = msg_tx.send(Msg::ConnectionDropped(id)).await;
                    return;
                }
            },
            outgoing = out_rx.recv() => match outgoing {
                Some(pkg) => {
                    if let Err(e) = framed.send(pkg).await {
                        warn!(connection = %id, error = %e, "socket write failed");
                        let _ = msg_tx.send(Msg::ConnectionDropped(id)).await;
                        return;
                    }
                }
                None => return,
            },
            _ = cancel.cancelled() => return,
        }
    }
}

/// Couple the reactor output to the world: `Send` to the live socket,
/// `Recv` to the caller, `Ignored` to the log.
pub async fn route_transmissions(
    mut out_rx: mpsc::Receiver<Transmission>,
    conns: ConnWatch,
    recv_tx: mpsc::Sender<Result<Package, BadNews>>,
) {
    while let Some(transmission) = out_rx.recv().await {
        match transmission {
            Transmission::Send(pkg) => match conns.sender() {
                Some(writer) => {
                    if writer.send(pkg).await.is_err() {
                        debug!("writer gone; package dropped pending reconnect");
                    }
                }
                None => debug!("no live connection; package dropped pending reconnect"),
            },
            Transmission::Ignored(pkg) => {
                debug!(cmd = %pkg.cmd, correlation = %pkg.correlation, "ignored package");
            }
            Transmission::Recv(result) => {
                if recv_tx.send(result).await.is_err() {
                    debug!("caller gone; operation result dropped");
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod transport_tests;
