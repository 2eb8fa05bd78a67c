// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end smoke tests: the real client stack (reactor, transport,
//! codec) against fake nodes over real TCP sockets.

use anyhow::Context;
use uuid::Uuid;

use evstore::{BadNews, Client, Cmd, Credentials, OperationError, Package, Settings};
use evstore_specs::{FakeNode, NodeMode, TIMEOUT};

fn settings_for(node: &FakeNode) -> Settings {
    Settings::default().with_seed(node.endpoint()).with_connection_name("specs")
}

async fn next_result(client: &mut Client) -> anyhow::Result<Result<Package, BadNews>> {
    tokio::time::timeout(TIMEOUT, client.recv())
        .await
        .context("timed out waiting for an operation result")?
        .context("client stopped")
}

// -- Handshake & ping ----------------------------------------------------------

#[tokio::test]
async fn handshake_then_ping() -> anyhow::Result<()> {
    let mut node = FakeNode::spawn(NodeMode::Master).await?;
    let mut client = Client::spawn(settings_for(&node));

    let correlation = Uuid::new_v4();
    client.submit(Package::new(Cmd::PING, correlation)).await?;

    // Identification reaches the node before any buffered data command.
    let first = node.next_package().await?;
    assert_eq!(first.cmd, Cmd::IDENTIFY_CLIENT);
    let second = node.next_package().await?;
    assert_eq!(second.cmd, Cmd::PING);
    assert_eq!(second.correlation, correlation);

    let reply = next_result(&mut client).await?.map_err(|bad| anyhow::anyhow!("{bad}"))?;
    assert_eq!(reply.cmd, Cmd::PONG);
    assert_eq!(reply.correlation, correlation);

    client.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn credentials_flow_through_the_handshake() -> anyhow::Result<()> {
    let mut node = FakeNode::spawn(NodeMode::Master).await?;
    let settings =
        settings_for(&node).with_credentials(Credentials::new("admin", "changeit"));
    let mut client = Client::spawn(settings);

    let correlation = Uuid::new_v4();
    client.submit(Package::new(Cmd::PING, correlation)).await?;

    let auth = node.next_package().await?;
    assert_eq!(auth.cmd, Cmd::AUTHENTICATE);
    assert_eq!(auth.credentials, Some(Credentials::new("admin", "changeit")));
    assert_eq!(node.next_package().await?.cmd, Cmd::IDENTIFY_CLIENT);
    assert_eq!(node.next_package().await?.cmd, Cmd::PING);

    let reply = next_result(&mut client).await?.map_err(|bad| anyhow::anyhow!("{bad}"))?;
    assert_eq!(reply.cmd, Cmd::PONG);

    client.shutdown().await;
    Ok(())
}

// -- Heartbeats ----------------------------------------------------------------

#[tokio::test]
async fn heartbeat_requests_are_echoed() -> anyhow::Result<()> {
    let mut node = FakeNode::spawn(NodeMode::Master).await?;
    let mut client = Client::spawn(settings_for(&node));

    let correlation = Uuid::new_v4();
    client.submit(Package::new(Cmd::PING, correlation)).await?;
    next_result(&mut client).await?.map_err(|bad| anyhow::anyhow!("{bad}"))?;

    let heartbeat = Uuid::new_v4();
    node.push(Package::new(Cmd::HEARTBEAT_REQUEST, heartbeat));
    let echo = node.package_with_cmd(Cmd::HEARTBEAT_RESPONSE).await?;
    assert_eq!(echo.correlation, heartbeat);

    client.shutdown().await;
    Ok(())
}

// -- Failures ------------------------------------------------------------------

#[tokio::test]
async fn server_rejection_surfaces_as_server_error() -> anyhow::Result<()> {
    let node = FakeNode::spawn(NodeMode::Reject("no such stream".to_owned())).await?;
    let mut client = Client::spawn(settings_for(&node));

    let correlation = Uuid::new_v4();
    client.submit(Package::new(Cmd(0xB0), correlation)).await?;

    let result = next_result(&mut client).await?;
    let bad = result.err().context("expected a failed exchange")?;
    assert_eq!(bad.correlation, correlation);
    assert_eq!(bad.error, OperationError::ServerError("no such stream".to_owned()));

    client.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn shutdown_aborts_outstanding_exchanges() -> anyhow::Result<()> {
    let mut node = FakeNode::spawn(NodeMode::Silent).await?;
    let mut client = Client::spawn(settings_for(&node));

    let correlation = Uuid::new_v4();
    client.submit(Package::new(Cmd::PING, correlation)).await?;
    // Exchange is registered once the node has seen it.
    node.package_with_cmd(Cmd::PING).await?;

    client.shutdown().await;
    let result = next_result(&mut client).await?;
    let bad = result.err().context("expected the exchange to abort")?;
    assert_eq!(bad.correlation, correlation);
    assert_eq!(bad.error, OperationError::Aborted);
    assert!(client.recv().await.is_none());

    Ok(())
}

// -- Master redirection --------------------------------------------------------

#[tokio::test]
async fn redirection_follows_the_cluster_master() -> anyhow::Result<()> {
    let mut master = FakeNode::spawn(NodeMode::Master).await?;
    let follower = FakeNode::spawn(NodeMode::RedirectTo(master.endpoint())).await?;
    let mut client = Client::spawn(settings_for(&follower));

    let correlation = Uuid::new_v4();
    client.submit(Package::new(Cmd::PING, correlation)).await?;

    // The client re-identifies against the master, then re-sends the
    // exchange with its original correlation.
    assert_eq!(master.next_package().await?.cmd, Cmd::IDENTIFY_CLIENT);
    let resent = master.next_package().await?;
    assert_eq!(resent.cmd, Cmd::PING);
    assert_eq!(resent.correlation, correlation);

    let reply = next_result(&mut client).await?.map_err(|bad| anyhow::anyhow!("{bad}"))?;
    assert_eq!(reply.cmd, Cmd::PONG);
    assert_eq!(reply.correlation, correlation);

    client.shutdown().await;
    Ok(())
}
