// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The connection driver: a synchronous state machine mediating between
//! user submissions and the framed request/response protocol.
//!
//! [`Driver::react`] is the whole behavior: `(state, msg)` in,
//! transmissions out, with a handful of effects invoked on the
//! environment. It never suspends; the async world stays on the other
//! side of the message queue.

use prost::Message;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Settings;
use crate::env::Env;
use crate::error::{BadNews, OperationError};
use crate::events::{ConnectionId, EndPoint, Msg, NodeEndPoints, Transmission};
use crate::package::{Cmd, Package};
use crate::proto;
use crate::registry::{Exchange, Registry};
use crate::state::{ConnectedStage, ConnectingStage, DriverState, HandshakePhase};

/// Protocol version reported during identification.
pub const CLIENT_VERSION: i32 = 1;

/// The reactor's state machine, generic over its environment.
pub struct Driver<E> {
    env: E,
    settings: Settings,
    state: DriverState,
}

impl<E: Env> Driver<E> {
    pub fn new(settings: Settings, env: E) -> Self {
        Self { env, settings, state: DriverState::Init }
    }

    pub fn state(&self) -> &DriverState {
        &self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state.is_closed()
    }

    /// Process one message: update state, return the transmissions to
    /// deliver, in emission order.
    pub fn react(&mut self, msg: Msg) -> Vec<Transmission> {
        let mut out = Vec::new();
        let msg_tag = msg.as_str();
        let prev_tag = self.state.as_str();

        let state = std::mem::replace(&mut self.state, DriverState::Closed);
        self.state = match state {
            DriverState::Init => self.on_init(msg, &mut out),
            DriverState::Awaiting { pending, stage } => {
                self.on_awaiting(pending, stage, msg, &mut out)
            }
            DriverState::Connected { id, stage } => self.on_connected(id, stage, msg, &mut out),
            DriverState::Closed => self.on_closed(msg, &mut out),
        };

        if self.state.as_str() != prev_tag {
            debug!(from = prev_tag, to = self.state.as_str(), msg = msg_tag, "state transition");
        }
        out
    }

    // -- Init ------------------------------------------------------------------

    fn on_init(&mut self, msg: Msg, out: &mut Vec<Transmission>) -> DriverState {
        match msg {
            Msg::SystemInit => {
                self.env.discover();
                DriverState::Awaiting { pending: vec![], stage: ConnectingStage::EndpointDiscovery }
            }
            Msg::SendPackage(pkg) => {
                self.env.discover();
                DriverState::Awaiting { pending: vec![pkg], stage: ConnectingStage::Reconnecting }
            }
            Msg::PackageArrived(_, pkg) => {
                out.push(Transmission::Ignored(pkg));
                DriverState::Init
            }
            Msg::Shutdown => DriverState::Closed,
            _ => DriverState::Init,
        }
    }

    // -- Awaiting --------------------------------------------------------------

    fn on_awaiting(
        &mut self,
        mut pending: Vec<Package>,
        stage: ConnectingStage,
        msg: Msg,
        out: &mut Vec<Transmission>,
    ) -> DriverState {
        match msg {
            Msg::SendPackage(pkg) => {
                pending.push(pkg);
                DriverState::Awaiting { pending, stage }
            }
            Msg::EstablishConnection(endpoint) => match stage {
                // Reconnecting also has a discovery outstanding (submission
                // in Init, transport-failure re-seed); its completion must
                // not be dropped.
                ConnectingStage::Reconnecting | ConnectingStage::EndpointDiscovery => {
                    let id = self.env.connect(&endpoint);
                    info!(endpoint = %endpoint, connection = %id, "connecting");
                    DriverState::Awaiting {
                        pending,
                        stage: ConnectingStage::ConnectionEstablishing(id),
                    }
                }
                ConnectingStage::ConnectionEstablishing(_) => {
                    DriverState::Awaiting { pending, stage }
                }
            },
            Msg::ConnectionEstablished(id) => match stage {
                ConnectingStage::ConnectionEstablishing(known) if id == known => {
                    self.start_handshake(id, pending, out)
                }
                _ => DriverState::Awaiting { pending, stage },
            },
            Msg::ConnectionDropped(id) => match stage {
                ConnectingStage::ConnectionEstablishing(known) if id == known => {
                    warn!(connection = %id, "connection failed before establishment");
                    self.env.discover();
                    DriverState::Awaiting { pending, stage: ConnectingStage::EndpointDiscovery }
                }
                _ => DriverState::Awaiting { pending, stage },
            },
            Msg::PackageArrived(_, pkg) => {
                out.push(Transmission::Ignored(pkg));
                DriverState::Awaiting { pending, stage }
            }
            Msg::Shutdown => {
                if let ConnectingStage::ConnectionEstablishing(id) = stage {
                    self.env.close_connection(id);
                }
                abort_all(pending, out);
                DriverState::Closed
            }
            Msg::SystemInit => DriverState::Awaiting { pending, stage },
        }
    }

    /// First wire package after the TCP session comes up: authenticate when
    /// default credentials are configured, identify otherwise.
    fn start_handshake(
        &mut self,
        id: ConnectionId,
        pending: Vec<Package>,
        out: &mut Vec<Transmission>,
    ) -> DriverState {
        let started = self.env.elapsed();
        let (pkg, phase) = match self.settings.default_user_credentials.clone() {
            Some(credentials) => {
                let correlation = self.env.generate_id();
                (Package::authenticate(correlation, credentials), HandshakePhase::Authentication)
            }
            None => (self.identification_package(), HandshakePhase::Identification),
        };
        debug!(connection = %id, phase = %phase, correlation = %pkg.correlation, "handshake started");
        let correlation = pkg.correlation;
        out.push(Transmission::Send(pkg));
        DriverState::Connected {
            id,
            stage: ConnectedStage::Confirming { pending, started, correlation, phase },
        }
    }

    fn identification_package(&mut self) -> Package {
        let correlation = self.env.generate_id();
        let name = match &self.settings.default_connection_name {
            Some(name) => name.clone(),
            None => format!("ES-{}", self.env.generate_id()),
        };
        Package::identify_client(correlation, CLIENT_VERSION, &name)
    }

    // -- Connected -------------------------------------------------------------

    fn on_connected(
        &mut self,
        known: ConnectionId,
        stage: ConnectedStage,
        msg: Msg,
        out: &mut Vec<Transmission>,
    ) -> DriverState {
        match msg {
            Msg::SendPackage(pkg) => match stage {
                ConnectedStage::Active(mut registry) => {
                    let started = self.env.elapsed();
                    registry.insert(Exchange::new(pkg.clone(), started));
                    out.push(Transmission::Send(pkg));
                    DriverState::Connected { id: known, stage: ConnectedStage::Active(registry) }
                }
                ConnectedStage::Confirming { mut pending, started, correlation, phase } => {
                    pending.push(pkg);
                    DriverState::Connected {
                        id: known,
                        stage: ConnectedStage::Confirming { pending, started, correlation, phase },
                    }
                }
            },
            Msg::PackageArrived(id, pkg) => {
                if id != known {
                    debug!(connection = %id, cmd = %pkg.cmd, "package from stale connection");
                    out.push(Transmission::Ignored(pkg));
                    return DriverState::Connected { id: known, stage };
                }
                // Heartbeats are serviced uniformly, ahead of stage dispatch.
                if pkg.cmd == Cmd::HEARTBEAT_REQUEST {
                    out.push(Transmission::Send(Package::heartbeat_response(pkg.correlation)));
                    return DriverState::Connected { id: known, stage };
                }
                if pkg.cmd == Cmd::HEARTBEAT_RESPONSE {
                    return DriverState::Connected { id: known, stage };
                }
                match stage {
                    ConnectedStage::Confirming { pending, started, correlation, phase } => self
                        .on_confirming_arrival(
                            known,
                            pending,
                            started,
                            correlation,
                            phase,
                            pkg,
                            out,
                        ),
                    ConnectedStage::Active(registry) => {
                        self.on_active_arrival(known, registry, pkg, out)
                    }
                }
            }
            Msg::ConnectionDropped(id) if id == known => {
                warn!(connection = %id, "connection dropped");
                let pending = match stage {
                    ConnectedStage::Confirming { pending, .. } => pending,
                    ConnectedStage::Active(mut registry) => {
                        self.surviving_requests(&mut registry, out)
                    }
                };
                self.env.discover();
                DriverState::Awaiting { pending, stage: ConnectingStage::EndpointDiscovery }
            }
            Msg::Shutdown => {
                self.env.close_connection(known);
                match stage {
                    ConnectedStage::Confirming { pending, .. } => abort_all(pending, out),
                    ConnectedStage::Active(mut registry) => {
                        for exchange in registry.drain() {
                            out.push(Transmission::Recv(Err(BadNews::aborted(
                                exchange.correlation(),
                            ))));
                        }
                    }
                }
                DriverState::Closed
            }
            _ => DriverState::Connected { id: known, stage },
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn on_confirming_arrival(
        &mut self,
        known: ConnectionId,
        pending: Vec<Package>,
        started: std::time::Duration,
        correlation: Uuid,
        phase: HandshakePhase,
        pkg: Package,
        out: &mut Vec<Transmission>,
    ) -> DriverState {
        if pkg.correlation != correlation {
            return DriverState::Connected {
                id: known,
                stage: ConnectedStage::Confirming { pending, started, correlation, phase },
            };
        }
        match phase {
            HandshakePhase::Authentication
                if pkg.cmd == Cmd::AUTHENTICATED || pkg.cmd == Cmd::NOT_AUTHENTICATED =>
            {
                // A handshake-stage auth failure does not abort: the
                // operation layer reacts to later per-request failures.
                if pkg.cmd == Cmd::NOT_AUTHENTICATED {
                    warn!(connection = %known, "default credentials rejected");
                }
                let identify = self.identification_package();
                let correlation = identify.correlation;
                let started = self.env.elapsed();
                out.push(Transmission::Send(identify));
                DriverState::Connected {
                    id: known,
                    stage: ConnectedStage::Confirming {
                        pending,
                        started,
                        correlation,
                        phase: HandshakePhase::Identification,
                    },
                }
            }
            HandshakePhase::Identification if pkg.cmd == Cmd::CLIENT_IDENTIFIED => {
                info!(connection = %known, "client identified");
                let registry = self.drain_pending(pending, out);
                DriverState::Connected { id: known, stage: ConnectedStage::Active(registry) }
            }
            _ => DriverState::Connected {
                id: known,
                stage: ConnectedStage::Confirming { pending, started, correlation, phase },
            },
        }
    }

    fn on_active_arrival(
        &mut self,
        known: ConnectionId,
        mut registry: Registry,
        pkg: Package,
        out: &mut Vec<Transmission>,
    ) -> DriverState {
        let Some(exchange) = registry.remove(&pkg.correlation) else {
            debug!(correlation = %pkg.correlation, cmd = %pkg.cmd, "no matching exchange");
            out.push(Transmission::Ignored(pkg));
            return DriverState::Connected { id: known, stage: ConnectedStage::Active(registry) };
        };
        if pkg.cmd == Cmd::BAD_REQUEST {
            let reason = String::from_utf8_lossy(&pkg.payload).into_owned();
            warn!(correlation = %pkg.correlation, reason = %reason, "server rejected request");
            out.push(Transmission::Recv(Err(BadNews::new(
                pkg.correlation,
                OperationError::ServerError(reason),
            ))));
            DriverState::Connected { id: known, stage: ConnectedStage::Active(registry) }
        } else if pkg.cmd == Cmd::NOT_AUTHENTICATED {
            out.push(Transmission::Recv(Err(BadNews::new(
                pkg.correlation,
                OperationError::NotAuthenticated,
            ))));
            DriverState::Connected { id: known, stage: ConnectedStage::Active(registry) }
        } else if pkg.cmd == Cmd::NOT_HANDLED {
            self.on_not_handled(known, registry, exchange, &pkg, out)
        } else {
            out.push(Transmission::Recv(Ok(pkg)));
            DriverState::Connected { id: known, stage: ConnectedStage::Active(registry) }
        }
    }

    /// Temporary routing failure: master redirection when the payload says
    /// so, bounded retry otherwise. Malformed payloads take the retry
    /// branch.
    fn on_not_handled(
        &mut self,
        known: ConnectionId,
        mut registry: Registry,
        mut exchange: Exchange,
        pkg: &Package,
        out: &mut Vec<Transmission>,
    ) -> DriverState {
        if let Some(node) = decode_master(pkg) {
            let id = self.env.force_reconnect(pkg.correlation, &node);
            info!(
                correlation = %pkg.correlation,
                master = %node.tcp,
                connection = %id,
                "master redirection"
            );
            let mut pending = vec![exchange.request];
            pending.extend(self.surviving_requests(&mut registry, out));
            return DriverState::Awaiting {
                pending,
                stage: ConnectingStage::ConnectionEstablishing(id),
            };
        }

        if self.settings.operation_retry.exhausted(exchange.retry_count) {
            warn!(correlation = %pkg.correlation, retries = exchange.retry_count, "retry budget exhausted");
            out.push(Transmission::Recv(Err(BadNews::aborted(pkg.correlation))));
            return DriverState::Connected { id: known, stage: ConnectedStage::Active(registry) };
        }
        exchange.retry_count += 1;
        debug!(correlation = %pkg.correlation, retry = exchange.retry_count, "retrying exchange");
        out.push(Transmission::Send(exchange.request.clone()));
        registry.insert(exchange);
        DriverState::Connected { id: known, stage: ConnectedStage::Active(registry) }
    }

    // -- Closed ----------------------------------------------------------------

    fn on_closed(&mut self, msg: Msg, out: &mut Vec<Transmission>) -> DriverState {
        match msg {
            Msg::SendPackage(pkg) => {
                out.push(Transmission::Recv(Err(BadNews::aborted(pkg.correlation))));
            }
            Msg::PackageArrived(_, pkg) => out.push(Transmission::Ignored(pkg)),
            _ => {}
        }
        DriverState::Closed
    }

    // -- Shared ----------------------------------------------------------------

    /// Build the fresh registry for `Active` from buffered submissions,
    /// emitting their `Send`s in submission order.
    fn drain_pending(&mut self, pending: Vec<Package>, out: &mut Vec<Transmission>) -> Registry {
        let started = self.env.elapsed();
        let mut registry = Registry::new();
        for pkg in pending {
            registry.insert(Exchange::new(pkg.clone(), started));
            out.push(Transmission::Send(pkg));
        }
        registry
    }

    /// Empty the registry into a pending list, aborting every exchange
    /// whose retry budget is spent. Requests keep their correlations; retry
    /// counts reset when the list is re-drained.
    fn surviving_requests(
        &mut self,
        registry: &mut Registry,
        out: &mut Vec<Transmission>,
    ) -> Vec<Package> {
        let mut pending = Vec::new();
        for exchange in registry.drain() {
            if self.settings.operation_retry.exhausted(exchange.retry_count) {
                out.push(Transmission::Recv(Err(BadNews::aborted(exchange.correlation()))));
            } else {
                pending.push(exchange.request);
            }
        }
        pending
    }
}

fn abort_all(pending: Vec<Package>, out: &mut Vec<Transmission>) {
    for pkg in pending {
        out.push(Transmission::Recv(Err(BadNews::aborted(pkg.correlation))));
    }
}

/// Extract the redirection target from a `NotHandled` package. `None` for
/// any other reason or an undecodable payload.
fn decode_master(pkg: &Package) -> Option<NodeEndPoints> {
    let body = proto::NotHandled::decode(pkg.payload.as_ref()).ok()?;
    if !matches!(
        proto::NotHandledReason::try_from(body.reason),
        Ok(proto::NotHandledReason::NotMaster)
    ) {
        return None;
    }
    let info = proto::MasterInfo::decode(body.additional_info?.as_slice()).ok()?;
    let port = u16::try_from(info.external_tcp_port).ok()?;
    let secure_tcp = match (info.external_secure_tcp_address, info.external_secure_tcp_port) {
        (Some(host), Some(port)) => {
            u16::try_from(port).ok().map(|port| EndPoint::new(host, port))
        }
        _ => None,
    };
    Some(NodeEndPoints { tcp: EndPoint::new(info.external_tcp_address, port), secure_tcp })
}

#[cfg(test)]
#[path = "driver_tests.rs"]
mod driver_tests;
