//! /ws: one WebSocket per peer.
//!
//! The socket task owns the transport: it registers the peer, turns inbound
//! frames into coordinator commands, drains the peer's outbound channel onto
//! the socket, and unregisters on close. Location lookup runs as a separate
//! task so it never holds up matching.

use std::net::{IpAddr, SocketAddr};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use tandem_core::{ClientMessage, PeerId, ServerMessage};
use tandem_services::{Coordinator, CoordinatorError, PeerTx};

use super::{client_ip, rate_limited, ApiState};

pub async fn handle_ws_upgrade(
    State(state): State<ApiState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let addr = client_ip(&state, &headers, remote);
    if !state.limits.connections.check(addr) {
        return rate_limited("Too many chat connection attempts, please wait.");
    }
    ws.on_upgrade(move |socket| run_peer(socket, state, addr))
}

async fn run_peer(socket: WebSocket, state: ApiState, addr: IpAddr) {
    let id = PeerId::new();
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(state.config.limits.outbound_queue_len.max(1));
    let reply = tx.clone();
    state.coordinator.lock().await.register(id, addr, tx);
    tracing::info!(peer = %id, %addr, "peer connected");

    spawn_location_lookup(&state, id, addr);

    let (mut sink, mut stream) = socket.split();
    let mut shutdown = state.shutdown_tx.subscribe();

    loop {
        tokio::select! {
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => dispatch(&state, id, &reply, text.as_str()).await,
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(peer = %id, error = %e, "socket error");
                    break;
                }
            },
            outbound = rx.recv() => {
                let Some(message) = outbound else { break };
                let text = match serde_json::to_string(&message) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::warn!(peer = %id, error = %e, "failed to encode outbound message");
                        continue;
                    }
                };
                if sink.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            _ = shutdown.recv() => {
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
        }
    }

    // Closed before unregistering so a concurrent match skips this peer.
    drop(rx);
    state.coordinator.lock().await.unregister(&id);
    tracing::info!(peer = %id, "peer disconnected");
}

fn spawn_location_lookup(state: &ApiState, id: PeerId, addr: IpAddr) {
    if !state.config.geolocation.enabled {
        return;
    }
    let geo = state.geo.clone();
    let coordinator = state.coordinator.clone();
    tokio::spawn(async move {
        let location = geo.resolve(addr).await;
        coordinator.lock().await.set_location(&id, location);
    });
}

async fn dispatch(state: &ApiState, id: PeerId, reply: &PeerTx, text: &str) {
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::debug!(peer = %id, error = %e, "unparseable frame");
            let _ = reply.try_send(ServerMessage::error("invalid message"));
            return;
        }
    };

    let mut coordinator = state.coordinator.lock().await;
    if let Err(e) = apply(&mut coordinator, id, message) {
        tracing::debug!(peer = %id, error = %e, "command rejected");
        let _ = reply.try_send(ServerMessage::error(e.to_string()));
    }
}

fn apply(coordinator: &mut Coordinator, id: PeerId, message: ClientMessage) -> Result<(), CoordinatorError> {
    let message = match message.into_signal() {
        Ok((kind, payload)) => {
            coordinator.relay(&id, kind, payload);
            return Ok(());
        }
        Err(other) => other,
    };

    match message {
        ClientMessage::SetHobbyPreference(hobby) => {
            coordinator.set_hobby(&id, hobby.as_deref())?;
        }
        ClientMessage::FindMatch => {
            coordinator.find_match(&id)?;
        }
        ClientMessage::NextStranger => {
            coordinator.next(&id)?;
        }
        ClientMessage::ReportUser(request) => {
            let outcome = coordinator.report(&id, request)?;
            tracing::info!(
                reporter = %id,
                reported = %outcome.reported,
                report_id = %outcome.report_id,
                "peer reported"
            );
        }
        ClientMessage::Offer(_) | ClientMessage::Answer(_) | ClientMessage::IceCandidate(_) => {}
    }
    Ok(())
}
