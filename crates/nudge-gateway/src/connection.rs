use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, trace, warn};

use crate::registry::{SubscriberId, SubscriberRegistry};

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);
const MAX_MISSED_PONGS: u8 = 2;

/// Upper bound on one socket write before the client is considered gone.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Serve one upgraded WebSocket as a notification subscriber.
pub async fn handle_connection(
    socket: WebSocket,
    registry: SubscriberRegistry,
    shutdown: CancellationToken,
    write_timeout: Duration,
) {
    let (sender, receiver) = socket.split();
    serve_subscriber(sender, receiver, registry, shutdown, write_timeout).await;
}

/// Register, pump notifications until either direction ends, unregister.
///
/// Only called once the transport is ready to receive, so registration
/// happens after the handshake.
pub async fn serve_subscriber<S, R, E>(
    sender: S,
    receiver: R,
    registry: SubscriberRegistry,
    shutdown: CancellationToken,
    write_timeout: Duration,
) where
    S: Sink<Message> + Unpin + Send + 'static,
    R: Stream<Item = Result<Message, E>> + Unpin + Send + 'static,
    E: Send + 'static,
{
    let (subscriber_id, notifications) = registry.register().await;
    info!("Subscriber {} connected", subscriber_id);

    run_connection_loop(
        sender,
        receiver,
        subscriber_id,
        notifications,
        shutdown,
        write_timeout,
    )
    .await;

    registry.unregister(subscriber_id).await;
    info!("Subscriber {} disconnected", subscriber_id);
}

async fn run_connection_loop<S, R, E>(
    mut sender: S,
    mut receiver: R,
    subscriber_id: SubscriberId,
    mut notifications: mpsc::Receiver<Arc<str>>,
    shutdown: CancellationToken,
    write_timeout: Duration,
) where
    S: Sink<Message> + Unpin + Send + 'static,
    R: Stream<Item = Result<Message, E>> + Unpin + Send + 'static,
    E: Send + 'static,
{
    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received;

    // Forward notifications -> client, with heartbeat
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    write(&mut sender, Message::Close(None), write_timeout, subscriber_id).await;
                    break;
                }
                result = notifications.recv() => {
                    // None: the registry dropped us.
                    let Some(text) = result else { break };
                    let message = Message::Text(text.to_string().into());
                    if !write(&mut sender, message, write_timeout, subscriber_id).await {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= MAX_MISSED_PONGS {
                            warn!(
                                "Subscriber {} missed {} pongs, dropping connection",
                                subscriber_id, missed_heartbeats
                            );
                            break;
                        }
                    }
                    let ping = Message::Ping(Vec::new().into());
                    if !write(&mut sender, ping, write_timeout, subscriber_id).await {
                        break;
                    }
                }
            }
        }
    });

    // Client -> server traffic is only read to notice pongs and disconnects.
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                Message::Text(text) => {
                    trace!(
                        "Ignoring {} bytes of text from subscriber {}",
                        text.as_str().len(),
                        subscriber_id
                    );
                }
                _ => {}
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
}

/// Write one frame. False means the connection should end.
async fn write<S>(sender: &mut S, message: Message, limit: Duration, id: SubscriberId) -> bool
where
    S: Sink<Message> + Unpin,
{
    match tokio::time::timeout(limit, sender.send(message)).await {
        Ok(Ok(())) => true,
        Ok(Err(_)) => false,
        Err(_) => {
            warn!("Subscriber {} stopped reading for {:?}, dropping connection", id, limit);
            false
        }
    }
}
