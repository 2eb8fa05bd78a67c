// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The reactor loop: one task draining the bounded input queue through
//! [`Driver::react`] and forwarding transmissions in order.
//!
//! Messages are processed FIFO; transmissions produced while handling one
//! message reach the sink before any transmission of a later message.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::driver::Driver;
use crate::env::Env;
use crate::events::{Msg, Transmission};

/// Run the driver until it reaches `Closed`, the input channel closes, or
/// `shutdown` fires. The latter two inject a final `Shutdown` message so
/// outstanding work is aborted rather than dropped. Messages already queued
/// behind the shutdown are still fed through the driver (submissions
/// answer `Aborted`) before the queue is dropped.
pub async fn run<E: Env>(
    mut driver: Driver<E>,
    mut msg_rx: mpsc::Receiver<Msg>,
    out_tx: mpsc::Sender<Transmission>,
    shutdown: CancellationToken,
) {
    loop {
        let msg = tokio::select! {
            msg = msg_rx.recv() => msg.unwrap_or(Msg::Shutdown),
            _ = shutdown.cancelled() => Msg::Shutdown,
        };
        let last = matches!(msg, Msg::Shutdown);
        if !forward(&mut driver, msg, &out_tx).await {
            return;
        }
        if last || driver.is_closed() {
            // A submission accepted by the queue must get its answer even
            // when it lost the race against shutdown.
            while let Ok(msg) = msg_rx.try_recv() {
                if !forward(&mut driver, msg, &out_tx).await {
                    return;
                }
            }
            debug!("reactor stopped");
            return;
        }
    }
}

/// Feed one message through the driver, forwarding its transmissions.
/// Returns `false` when the sink is gone.
async fn forward<E: Env>(
    driver: &mut Driver<E>,
    msg: Msg,
    out_tx: &mpsc::Sender<Transmission>,
) -> bool {
    for transmission in driver.react(msg) {
        if out_tx.send(transmission).await.is_err() {
            debug!("transmission sink closed; reactor stopping");
            return false;
        }
    }
    true
}

#[cfg(test)]
#[path = "reactor_tests.rs"]
mod reactor_tests;
