//! WebSocket game route.
//!
//! Each inbound text frame is one event and produces exactly one outbound event.
//! A failed command becomes an `error` event; the socket stays open.

use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    response::IntoResponse,
    Extension,
};
use chess_core::{GameSnapshot, GameStatus};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, info};

use crate::commands::Hint;
use crate::error::AppError;
use crate::orchestrator::{AutomatedMove, Orchestrator, TurnOutcome};

// ---- Message types ----

/// Client → Server events
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    New {
        game_id: String,
    },
    Move {
        game_id: String,
        #[serde(rename = "move")]
        mv: String,
        position: Option<String>,
    },
    Analyze {
        game_id: String,
        position: Option<String>,
    },
    Chat {
        game_id: String,
        question: String,
        position: Option<String>,
    },
    Hint {
        game_id: String,
        position: Option<String>,
        limit: Option<usize>,
    },
}

impl ClientEvent {
    pub fn game_id(&self) -> &str {
        match self {
            ClientEvent::New { game_id }
            | ClientEvent::Move { game_id, .. }
            | ClientEvent::Analyze { game_id, .. }
            | ClientEvent::Chat { game_id, .. }
            | ClientEvent::Hint { game_id, .. } => game_id,
        }
    }
}

/// An inbound event with its optional correlation id.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inbound {
    pub request_id: Option<JsonValue>,
    #[serde(flatten)]
    pub event: ClientEvent,
}

/// Server → Client events
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    Move {
        game_id: String,
        human_move: Option<String>,
        reply: Option<AutomatedMove>,
        state: GameSnapshot,
    },
    Message {
        game_id: String,
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        recommended_move: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        hints: Option<Vec<Hint>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        state: Option<GameSnapshot>,
    },
    GameOver {
        game_id: String,
        status: GameStatus,
        reason: String,
        winner: Option<String>,
        human_move: Option<String>,
        reply: Option<AutomatedMove>,
        state: GameSnapshot,
    },
    Error {
        code: String,
        message: String,
    },
}

impl ServerEvent {
    fn from_turn(outcome: TurnOutcome) -> Self {
        let game_id = outcome.state.game_id.clone();
        match outcome.game_over {
            Some(over) => ServerEvent::GameOver {
                game_id,
                status: over.status,
                reason: over.reason,
                winner: over.winner,
                human_move: outcome.human_move,
                reply: outcome.reply,
                state: outcome.state,
            },
            None => ServerEvent::Move {
                game_id,
                human_move: outcome.human_move,
                reply: outcome.reply,
                state: outcome.state,
            },
        }
    }

    fn from_error(e: &AppError) -> Self {
        ServerEvent::Error {
            code: e.code().to_string(),
            message: e.client_message(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Outbound {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<JsonValue>,
    #[serde(flatten)]
    pub event: ServerEvent,
}

// ---- Dispatch ----

/// Run one inbound event against the orchestrator.
pub async fn handle_event(orchestrator: &Orchestrator, inbound: Inbound) -> Outbound {
    let event = match dispatch(orchestrator, inbound.event).await {
        Ok(event) => event,
        Err(e) => ServerEvent::from_error(&e),
    };
    Outbound {
        request_id: inbound.request_id,
        event,
    }
}

/// Parse and run one raw text frame.
pub async fn handle_text(orchestrator: &Orchestrator, text: &str) -> Outbound {
    match serde_json::from_str::<Inbound>(text) {
        Ok(inbound) => handle_event(orchestrator, inbound).await,
        Err(e) => {
            debug!(error = %e, "unparseable event");
            // Still echo the id when the frame is valid JSON
            let request_id = serde_json::from_str::<JsonValue>(text)
                .ok()
                .and_then(|v| v.get("requestId").cloned());
            Outbound {
                request_id,
                event: ServerEvent::from_error(&AppError::BadRequest(format!("Invalid event: {}", e))),
            }
        }
    }
}

async fn dispatch(orchestrator: &Orchestrator, event: ClientEvent) -> Result<ServerEvent, AppError> {
    info!(game_id = event.game_id(), "gateway event");
    let sessions = orchestrator.sessions();
    match event {
        ClientEvent::New { game_id } => {
            Ok(ServerEvent::from_turn(orchestrator.start_game(&game_id).await?))
        }
        ClientEvent::Move {
            game_id,
            mv,
            position,
        } => {
            let outcome = orchestrator
                .play_turn(&game_id, &mv, position.as_deref())
                .await?;
            Ok(ServerEvent::from_turn(outcome))
        }
        ClientEvent::Analyze { game_id, position } => {
            let analysis = sessions.analyze(&game_id, position.as_deref()).await?;
            Ok(ServerEvent::Message {
                game_id,
                text: analysis.commentary,
                recommended_move: analysis.recommended_move,
                hints: None,
                state: None,
            })
        }
        ClientEvent::Chat {
            game_id,
            question,
            position,
        } => {
            let text = sessions.chat(&game_id, &question, position.as_deref()).await?;
            Ok(ServerEvent::Message {
                game_id,
                text,
                recommended_move: None,
                hints: None,
                state: None,
            })
        }
        ClientEvent::Hint {
            game_id,
            position,
            limit,
        } => {
            let hints = sessions.hint(&game_id, position.as_deref(), limit).await?;
            let text = if hints.is_empty() {
                "No moves available.".to_string()
            } else {
                let labels: Vec<&str> = hints.iter().map(|h| h.label.as_str()).collect();
                format!("You could try: {}", labels.join(", "))
            };
            Ok(ServerEvent::Message {
                game_id,
                text,
                recommended_move: None,
                hints: Some(hints),
                state: None,
            })
        }
    }
}

// ---- WebSocket handler ----

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Extension(orchestrator): Extension<Arc<Orchestrator>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, orchestrator))
}

async fn handle_socket(socket: WebSocket, orchestrator: Arc<Orchestrator>) {
    let (mut sender, mut receiver) = socket.split();
    info!("game socket connected");

    while let Some(Ok(msg)) = receiver.next().await {
        let text = match msg {
            Message::Text(t) => t.to_string(),
            Message::Close(_) => break,
            _ => continue,
        };

        let outbound = handle_text(&orchestrator, &text).await;
        if let Err(e) = send_event(&mut sender, &outbound).await {
            debug!(error = %e, "failed to send event, closing socket");
            break;
        }
    }

    info!("game socket closed");
}

// ---- Helper: send event ----

async fn send_event(
    sender: &mut futures::stream::SplitSink<WebSocket, Message>,
    event: &Outbound,
) -> Result<()> {
    let json = serde_json::to_string(event)?;
    sender.send(Message::Text(json.into())).await?;
    Ok(())
}
