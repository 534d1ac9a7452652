use super::{ServerMessage, SessionHandler};
use crate::live::ConnectionRegistry;
use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;

/// Drive one websocket session until the transport closes.
///
/// The connection is registered before `start` is sent, so a restart queued
/// meanwhile is delivered right after it.
pub async fn run_session(
    socket: WebSocket,
    registry: Arc<ConnectionRegistry>,
    handler: SessionHandler,
    start_url: String,
) {
    let (id, mut outbound) = registry.register();
    let (mut sink, mut stream) = socket.split();

    let start = ServerMessage::start(start_url);
    if sink.send(Message::Text(start.to_json().into())).await.is_err() {
        registry.unregister(id);
        return;
    }

    loop {
        tokio::select! {
            message = outbound.recv() => {
                let Some(message) = message else { break };
                if sink.send(Message::Text(message.to_json().into())).await.is_err() {
                    break;
                }
            }
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    handler.handle_text(text.as_str());
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(Message::Binary(_))) => {
                    tracing::debug!(connection = %id, "ignoring binary frame");
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(connection = %id, "websocket error: {e}");
                    break;
                }
            },
        }
    }

    registry.unregister(id);
}
