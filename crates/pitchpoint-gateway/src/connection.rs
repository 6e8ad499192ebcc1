use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use pitchpoint_db::Database;
use pitchpoint_types::events::{GatewayCommand, GatewayEvent};
use pitchpoint_types::models::Role;

use crate::dispatcher::{Delivery, Dispatcher, Subscription};
use crate::session::{self, Identity};

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

const IDENTIFY_TIMEOUT: Duration = Duration::from_secs(10);

type WsSender = SplitSink<WebSocket, Message>;
type WsReceiver = SplitStream<WebSocket>;

const NOT_AUTHENTICATED: &str = "Not authenticated";
const NO_ROLE: &str = "No role assigned to this account";

/// Handle a single realtime connection. The client must send Identify with
/// its bearer token first; everything else waits for Ready.
pub async fn handle_connection(
    socket: WebSocket,
    dispatcher: Dispatcher,
    db: Arc<Database>,
    jwt_secret: String,
) {
    let (mut sender, mut receiver) = socket.split();

    let Some(token) = wait_for_identify(&mut receiver).await else {
        warn!("Realtime client did not identify, closing");
        let refused = GatewayEvent::Error {
            message: NOT_AUTHENTICATED.into(),
        };
        send_event(&mut sender, &refused).await;
        return;
    };

    let checked = tokio::task::spawn_blocking(move || identify(&db, &jwt_secret, &token)).await;
    let (identity, role) = match checked {
        Ok(Ok(found)) => found,
        Ok(Err(message)) => {
            warn!("Realtime identify refused: {}", message);
            let refused = GatewayEvent::Error {
                message: message.into(),
            };
            send_event(&mut sender, &refused).await;
            return;
        }
        Err(e) => {
            error!("Identify task panicked: {}", e);
            return;
        }
    };

    info!("{} ({}) connected to realtime gateway", identity.email, role);

    let ready = GatewayEvent::Ready {
        user_id: identity.user_id,
        role: Some(role),
    };
    if !send_event(&mut sender, &ready).await {
        return;
    }

    let subscription = dispatcher.subscribe(identity.user_id, role);
    run_connection_loop(sender, receiver, subscription, &identity).await;
}

/// The token from the first Identify command, if one arrives in time.
async fn wait_for_identify(receiver: &mut WsReceiver) -> Option<String> {
    tokio::time::timeout(IDENTIFY_TIMEOUT, async {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Text(text) = msg {
                if let Ok(GatewayCommand::Identify { token }) =
                    serde_json::from_str::<GatewayCommand>(&text)
                {
                    return Some(token);
                }
            }
        }
        None
    })
    .await
    .ok()
    .flatten()
}

/// Check an Identify token against the live session row. Blocking; call
/// from `spawn_blocking`. The error is the message sent before closing.
pub fn identify(
    db: &Database,
    jwt_secret: &str,
    token: &str,
) -> Result<(Identity, Role), &'static str> {
    let claims = session::decode_token(jwt_secret, token).ok_or(NOT_AUTHENTICATED)?;
    let identity = match session::resolve(db, &claims) {
        Ok(Some(identity)) => identity,
        Ok(None) => return Err(NOT_AUTHENTICATED),
        Err(e) => {
            error!("Session lookup failed during identify: {}", e);
            return Err(NOT_AUTHENTICATED);
        }
    };
    match identity.role {
        Some(role) => Ok((identity, role)),
        None => Err(NO_ROLE),
    }
}

async fn send_event(sender: &mut WsSender, event: &GatewayEvent) -> bool {
    let text = match serde_json::to_string(event) {
        Ok(text) => text,
        Err(e) => {
            error!("Failed to encode gateway event: {}", e);
            return false;
        }
    };
    sender.send(Message::Text(text.into())).await.is_ok()
}

async fn run_connection_loop(
    mut sender: WsSender,
    mut receiver: WsReceiver,
    mut subscription: Subscription,
    identity: &Identity,
) {
    let user_id = identity.user_id;

    // Commands are applied by the send task, which owns the subscription.
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<GatewayCommand>(32);

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                delivery = subscription.recv() => {
                    let event = match delivery {
                        Delivery::Change(change) => GatewayEvent::Change((*change).clone()),
                        Delivery::Resync(tables) => GatewayEvent::Resync { tables },
                        Delivery::Closed => break,
                    };
                    if !send_event(&mut sender, &event).await {
                        break;
                    }
                }
                cmd = cmd_rx.recv() => {
                    let Some(cmd) = cmd else { break };
                    let reply = apply_command(&mut subscription, cmd);
                    if !send_event(&mut sender, &reply).await {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("Heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<GatewayCommand>(&text) {
                    Ok(cmd) => {
                        if cmd_tx.send(cmd).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(
                            "{} bad command: {} -- raw: {}",
                            user_id,
                            e,
                            text.chars().take(200).collect::<String>()
                        );
                    }
                },
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Whichever side ends first tears the other down. The subscription is
    // dropped with the send task.
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    info!("{} disconnected from realtime gateway", identity.email);
}

fn apply_command(subscription: &mut Subscription, cmd: GatewayCommand) -> GatewayEvent {
    match cmd {
        GatewayCommand::Identify { .. } => GatewayEvent::Error {
            message: "Already identified".into(),
        },
        GatewayCommand::Subscribe { tables } => GatewayEvent::Subscribed {
            tables: subscription.follow(&tables),
        },
        GatewayCommand::Unsubscribe { tables } => GatewayEvent::Subscribed {
            tables: subscription.unfollow(&tables),
        },
    }
}
