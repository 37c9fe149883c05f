//! ConversationRelay WebSocket handler
//!
//! One connection carries one call. The reader loop decodes frames and drives
//! the [`CallSession`]; prompts are handed to a per-connection worker that
//! answers them one at a time, and a writer task owns the socket sink.

use axum::{
    Extension,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tokio::{select, time::Duration};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::core::{
    CallEvent, CallSession, PromptJob, SessionAction, SessionRegistry, SharedConversationBackend,
};
use crate::middleware::ClientIp;
use crate::state::AppState;

use super::messages::{RelayIncomingMessage, RelayMessageRoute, RelayOutgoingMessage};

/// Outbound frames waiting for the writer task
const CHANNEL_BUFFER_SIZE: usize = 64;

/// Maximum WebSocket frame size (64 KB)
const MAX_WS_FRAME_SIZE: usize = 64 * 1024;

/// Maximum WebSocket message size (64 KB)
const MAX_WS_MESSAGE_SIZE: usize = 64 * 1024;

/// How long the writer may take to flush a close frame
const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// Releases the connection-limit slot when the connection ends.
struct ConnectionGuard {
    state: Arc<AppState>,
    ip: IpAddr,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.state.release_connection(self.ip);
        debug!(ip = %self.ip, "Released relay connection slot");
    }
}

/// ConversationRelay WebSocket handler
///
/// Upgrades the HTTP connection to the relay protocol. When the
/// connection-limit middleware reserved a slot it passes the client IP along
/// and the slot is held until the socket task ends.
pub async fn relay_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    client_ip: Option<Extension<ClientIp>>,
) -> Response {
    let guard = client_ip.map(|Extension(ClientIp(ip))| ConnectionGuard {
        state: state.clone(),
        ip,
    });

    info!(
        ip = ?guard.as_ref().map(|g| g.ip),
        "Relay WebSocket connection upgrade requested"
    );

    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_relay_socket(socket, state, guard))
}

/// Idle limit of roughly five minutes, jittered so stale connections do not
/// all expire together.
fn idle_timeout() -> Duration {
    let base_idle_secs: u64 = 300;
    let jitter_range: u64 = 30;
    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64)
        .unwrap_or(0);
    let jitter_offset = (seed % (jitter_range * 2)) as i64 - jitter_range as i64;
    Duration::from_secs((base_idle_secs as i64 + jitter_offset).max(1) as u64)
}

/// Handle one relay connection
async fn handle_relay_socket(
    socket: WebSocket,
    app_state: Arc<AppState>,
    _guard: Option<ConnectionGuard>,
) {
    let connection_id = Uuid::new_v4();
    info!(%connection_id, "Relay WebSocket connection established");

    let (mut sender, mut receiver) = socket.split();
    let (message_tx, mut message_rx) = mpsc::channel::<RelayMessageRoute>(CHANNEL_BUFFER_SIZE);
    // Unbounded so the reader never waits on the backend; every prompt is answered
    let (prompt_tx, prompt_rx) = mpsc::unbounded_channel::<PromptJob>();

    // Sender task for outgoing messages
    let mut sender_task = tokio::spawn(async move {
        while let Some(route) = message_rx.recv().await {
            let result = match route {
                RelayMessageRoute::Outgoing(message) => match serde_json::to_string(&message) {
                    Ok(json_str) => sender.send(Message::Text(json_str.into())).await,
                    Err(e) => {
                        error!("Failed to serialize outgoing message: {}", e);
                        continue;
                    }
                },
                RelayMessageRoute::Close => {
                    info!("Closing relay WebSocket connection");
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            };

            if let Err(e) = result {
                error!("Failed to send WebSocket message: {}", e);
                break;
            }
        }
    });

    let prompt_worker = tokio::spawn(run_prompt_worker(
        prompt_rx,
        app_state.backend.clone(),
        app_state.sessions.clone(),
        message_tx.clone(),
        app_state.config.backend_error_reply.clone(),
    ));

    let mut session = CallSession::new(app_state.sessions.clone());

    // How often we check if the connection is stale
    let processing_timeout = Duration::from_secs(30);
    let idle_timeout = idle_timeout();
    let mut last_activity = std::time::Instant::now();
    let mut close_requested = false;

    loop {
        select! {
            msg_result = receiver.next() => {
                last_activity = std::time::Instant::now();

                match msg_result {
                    Some(Ok(msg)) => {
                        if !process_relay_message(msg, &mut session, &prompt_tx) {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        warn!("Relay WebSocket error: {}", e);
                        break;
                    }
                    None => {
                        info!("Relay WebSocket connection closed by provider");
                        break;
                    }
                }
            }
            _ = tokio::time::sleep(processing_timeout) => {
                if last_activity.elapsed() > idle_timeout {
                    warn!(
                        call_id = session.call_id().unwrap_or("<before setup>"),
                        "Relay WebSocket connection idle for {}s, closing stale connection",
                        last_activity.elapsed().as_secs()
                    );
                    close_requested = message_tx.try_send(RelayMessageRoute::Close).is_ok();
                    break;
                }
                debug!("Relay WebSocket connection idle check - still active");
            }
        }
    }

    // Release the registry entry first so an in-flight reply sees a dead session
    let _ = session.handle(CallEvent::Disconnect);
    prompt_worker.abort();

    if close_requested {
        let _ = tokio::time::timeout(CLOSE_FLUSH_TIMEOUT, &mut sender_task).await;
    }
    sender_task.abort();

    info!(%connection_id, "Relay WebSocket connection terminated");
}

/// Process one incoming WebSocket frame.
///
/// Returns `false` when the connection should end.
fn process_relay_message(
    msg: Message,
    session: &mut CallSession,
    prompt_tx: &mpsc::UnboundedSender<PromptJob>,
) -> bool {
    match msg {
        Message::Text(text) => {
            debug!("Received relay frame: {} bytes", text.len());

            let incoming = match RelayIncomingMessage::decode(text.as_str()) {
                Ok(msg) => msg,
                Err(e) if e.is_unknown_type() => {
                    debug!(error = %e, "Ignoring relay event");
                    return true;
                }
                Err(e) => {
                    warn!(error = %e, "Dropping malformed relay frame");
                    return true;
                }
            };

            if let RelayIncomingMessage::Setup(setup) = &incoming {
                info!(
                    call_id = %setup.call_id,
                    from = setup.from.as_deref().unwrap_or_default(),
                    to = setup.to.as_deref().unwrap_or_default(),
                    session_id = setup.session_id.as_deref().unwrap_or_default(),
                    "Relay setup received"
                );
            }

            dispatch_event(incoming.into_event(), session, prompt_tx);
            true
        }
        Message::Binary(data) => {
            debug!("Ignoring binary frame: {} bytes", data.len());
            true
        }
        Message::Ping(_) => {
            debug!("Received ping");
            true
        }
        Message::Pong(_) => {
            debug!("Received pong");
            true
        }
        Message::Close(_) => {
            info!(
                call_id = session.call_id().unwrap_or("<before setup>"),
                "Relay WebSocket close received"
            );
            false
        }
    }
}

/// Apply an event to the session and queue any resulting prompt.
fn dispatch_event(
    event: CallEvent,
    session: &mut CallSession,
    prompt_tx: &mpsc::UnboundedSender<PromptJob>,
) {
    let name = event.name();

    match session.handle(event) {
        Ok(SessionAction::None) => {}
        Ok(SessionAction::Respond(job)) => {
            if prompt_tx.send(job).is_err() {
                warn!(
                    call_id = session.call_id().unwrap_or_default(),
                    "Dropping prompt, worker has stopped"
                );
            }
        }
        Err(e) => {
            warn!(event = name, error = %e, "Rejected relay event");
        }
    }
}

/// Answer queued prompts one at a time, in arrival order.
///
/// A reply is only sent while its session is still registered; anything
/// finishing after the call ended is dropped.
async fn run_prompt_worker(
    mut jobs: mpsc::UnboundedReceiver<PromptJob>,
    backend: SharedConversationBackend,
    sessions: Arc<SessionRegistry>,
    message_tx: mpsc::Sender<RelayMessageRoute>,
    backend_error_reply: Option<String>,
) {
    while let Some(PromptJob { handle, utterance }) = jobs.recv().await {
        let result = {
            let mut context = handle.context().lock().await;
            backend.respond(&mut context, &utterance).await
        };

        let reply = match result {
            Ok(reply) => reply,
            Err(e) => {
                warn!(
                    call_id = %handle.call_id(),
                    provider = backend.provider_name(),
                    error = %e,
                    "Conversation backend failed"
                );
                match &backend_error_reply {
                    Some(text) => text.clone(),
                    None => continue,
                }
            }
        };

        if !sessions.is_live(&handle) {
            debug!(call_id = %handle.call_id(), "Discarding reply for ended call");
            continue;
        }

        debug!(call_id = %handle.call_id(), chars = reply.len(), "Sending reply");
        if message_tx
            .send(RelayMessageRoute::Outgoing(RelayOutgoingMessage::reply(reply)))
            .await
            .is_err()
        {
            break;
        }
    }
}
