use rocket::futures::{SinkExt, StreamExt};
use rocket::{get, State};
use rocket_ws::{Channel, Message, WebSocket};
use serde_json::json;
use tracing::{error, info};

use crate::server::AppState;

/// WebSocket chat endpoint
#[get("/chat")]
pub fn chat_websocket(ws: WebSocket, state: &State<AppState>) -> Channel<'static> {
    let session = state.session.clone();

    ws.channel(move |mut stream| {
        Box::pin(async move {
            info!("WebSocket connected");

            // Replay history so the page shows the previous conversation
            let history: Vec<Message> = {
                let session = session.lock().await;
                session
                    .history()
                    .turns()
                    .iter()
                    .map(|turn| {
                        frame(json!({
                            "type": "history",
                            "role": turn.role.as_str(),
                            "content": turn.content,
                        }))
                    })
                    .collect()
            };
            for msg in history {
                stream.send(msg).await?;
            }

            // Handle incoming messages
            while let Some(message) = stream.next().await {
                match message {
                    Ok(Message::Text(text)) => {
                        let user_message = parse_user_message(text);

                        // Exchanges are serialized through the session lock
                        let exchange = session.lock().await.handle(&user_message).await;
                        let Some(exchange) = exchange else {
                            continue;
                        };

                        let reply = frame(json!({
                            "type": "message",
                            "intent": exchange.intent,
                            "content": exchange.reply,
                        }));
                        if let Err(e) = stream.send(reply).await {
                            error!("Failed to send response: {}", e);
                            break;
                        }
                    }
                    Ok(Message::Close(_)) => {
                        info!("WebSocket closed");
                        break;
                    }
                    Err(e) => {
                        error!("WebSocket error: {}", e);
                        break;
                    }
                    _ => {}
                }
            }

            Ok(())
        })
    })
}

/// Accept either `{"message": "..."}` or the raw text
fn parse_user_message(text: String) -> String {
    match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(value) => match value.get("message").and_then(|m| m.as_str()) {
            Some(message) => message.to_string(),
            None => text,
        },
        Err(_) => text,
    }
}

fn frame(value: serde_json::Value) -> Message {
    Message::Text(value.to_string())
}
