use crate::{AppState, Broadcast};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Extension,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use protocol::{ClientEvent, ServerEvent};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub async fn handle_websocket(ws: WebSocketUpgrade, Extension(state): Extension<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| websocket_handler(socket, state))
}

async fn websocket_handler(socket: WebSocket, state: AppState) {
    let conn_id = Uuid::new_v4().to_string();
    let (mut ws_sender, mut ws_receiver) = socket.split();
    info!("New chat connection: {}", conn_id);

    let (tx, mut rx) = mpsc::channel::<ServerEvent>(64);

    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    warn!("failed to encode event: {}", e);
                    continue;
                }
            };
            if ws_sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    // Typing indicators from other connections.
    let mut events = state.events.subscribe();
    let tx_events = tx.clone();
    let own_id = conn_id.clone();
    let fanout_task = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(Broadcast { from, event }) if from != own_id => {
                    if tx_events.send(event).await.is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!("connection {} skipped {} events", own_id, skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    while let Some(msg) = ws_receiver.next().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                warn!("WebSocket error: {}", e);
                break;
            }
        };

        match msg {
            Message::Text(text) => {
                let event = match serde_json::from_str::<ClientEvent>(&text) {
                    Ok(event) => event,
                    Err(e) => {
                        debug!("unreadable event from {}: {}", conn_id, e);
                        let _ = tx.send(ServerEvent::error("Unrecognised event")).await;
                        continue;
                    }
                };

                match event {
                    ClientEvent::ChatMessage(chat) => {
                        let session_id = chat.user_id.clone().unwrap_or_else(|| conn_id.clone());
                        let turn = state
                            .assistant
                            .process(&session_id, chat.user_id.as_deref(), chat.message.trim())
                            .await;

                        let reply = ServerEvent::bot_response(
                            turn.message,
                            turn.data,
                            turn.quick_replies,
                            turn.action.map(|a| a.as_str().to_string()),
                            chrono::Utc::now().to_rfc3339(),
                        );
                        if tx.send(reply).await.is_err() {
                            break;
                        }
                    }
                    ClientEvent::Typing(typing) => {
                        let _ = state.events.send(Broadcast {
                            from: conn_id.clone(),
                            event: ServerEvent::UserTyping(typing),
                        });
                    }
                    ClientEvent::StopTyping => {
                        let _ = state.events.send(Broadcast {
                            from: conn_id.clone(),
                            event: ServerEvent::UserStopTyping,
                        });
                    }
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    fanout_task.abort();
    send_task.abort();
    info!("Chat connection closed: {}", conn_id);
}
