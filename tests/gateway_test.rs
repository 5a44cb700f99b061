/// Duplex gateway: one outbound event per inbound event, errors as events.
mod common;

use serde_json::{json, Value};
use server::config::HumanColor;
use server::orchestrator::Orchestrator;
use server::routes::game_ws::handle_text;

async fn send(orchestrator: &Orchestrator, event: Value) -> Value {
    let outbound = handle_text(orchestrator, &event.to_string()).await;
    serde_json::to_value(&outbound).unwrap()
}

#[tokio::test]
async fn test_new_and_move_events() {
    let orchestrator = common::orchestrator(&[r#"{"move": "c5", "commentary": "Sicilian."}"#]);

    let out = send(&orchestrator, json!({"type": "new", "gameId": "g1", "requestId": "r1"})).await;
    assert_eq!(out["type"], "move");
    assert_eq!(out["requestId"], "r1");
    assert_eq!(out["state"]["legalMoves"].as_array().unwrap().len(), 20);

    let out = send(&orchestrator, json!({"type": "move", "gameId": "g1", "move": "e4", "requestId": 2})).await;
    assert_eq!(out["type"], "move");
    assert_eq!(out["requestId"], 2);
    assert_eq!(out["humanMove"], "e4");
    assert_eq!(out["reply"]["move"], "c5");
    assert_eq!(out["reply"]["source"], "structured");
    assert_eq!(out["state"]["moveRecord"], json!(["e4", "c5"]));
}

#[tokio::test]
async fn test_errors_become_events_and_session_survives() {
    let orchestrator = common::orchestrator(&[]);
    send(&orchestrator, json!({"type": "new", "gameId": "g1"})).await;

    let out = send(&orchestrator, json!({"type": "move", "gameId": "g1", "move": "Ke2"})).await;
    assert_eq!(out["type"], "error");
    assert_eq!(out["code"], "illegal_move");
    assert!(out.get("requestId").is_none());

    let out = send(&orchestrator, json!({"type": "move", "gameId": "nope", "move": "e4"})).await;
    assert_eq!(out["type"], "error");
    assert_eq!(out["code"], "session_not_found");

    let out = send(&orchestrator, json!({"type": "move", "gameId": "g1", "move": "e4"})).await;
    assert_eq!(out["type"], "move");
    assert_eq!(out["state"]["moveRecord"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_unparseable_events() {
    let orchestrator = common::orchestrator(&[]);

    let out = serde_json::to_value(handle_text(&orchestrator, "not json").await).unwrap();
    assert_eq!(out["type"], "error");
    assert_eq!(out["code"], "bad_request");

    let out = send(&orchestrator, json!({"type": "resign", "gameId": "g1", "requestId": 7})).await;
    assert_eq!(out["type"], "error");
    assert_eq!(out["code"], "bad_request");
    assert_eq!(out["requestId"], 7);

    let out = send(&orchestrator, json!({"type": "move", "gameId": "g1"})).await;
    assert_eq!(out["code"], "bad_request");
}

#[tokio::test]
async fn test_analyze_chat_and_hint_events() {
    let orchestrator = common::orchestrator(&[
        "The centre is yours.\nMOVE: d4",
        "Develop your pieces and castle.",
    ]);
    send(&orchestrator, json!({"type": "new", "gameId": "g1"})).await;

    let out = send(&orchestrator, json!({"type": "analyze", "gameId": "g1"})).await;
    assert_eq!(out["type"], "message");
    assert_eq!(out["recommendedMove"], "d4");
    assert_eq!(out["text"], "The centre is yours.");

    let out = send(&orchestrator, json!({"type": "chat", "gameId": "g1", "question": "Plan?"})).await;
    assert_eq!(out["type"], "message");
    assert_eq!(out["text"], "Develop your pieces and castle.");

    let out = send(&orchestrator, json!({"type": "hint", "gameId": "g1", "limit": 3})).await;
    assert_eq!(out["type"], "message");
    assert_eq!(out["hints"].as_array().unwrap().len(), 3);
    assert_eq!(out["hints"][0]["move"], "e4");
}

#[tokio::test]
async fn test_analyze_with_position() {
    let orchestrator = common::orchestrator(&[]);
    send(&orchestrator, json!({"type": "new", "gameId": "g1"})).await;

    let fen = "4k3/8/8/8/8/8/8/R3K3 w - - 0 1";
    let out = send(&orchestrator, json!({"type": "analyze", "gameId": "g1", "position": fen})).await;
    assert_eq!(out["type"], "message");
    assert!(out["recommendedMove"].is_string());

    let out = send(&orchestrator, json!({"type": "analyze", "gameId": "g1", "position": "bogus"})).await;
    assert_eq!(out["code"], "invalid_position");
}

#[tokio::test]
async fn test_game_over_event() {
    let orchestrator = common::orchestrator_as(
        HumanColor::Black,
        &[r#"{"move": "f3"}"#, r#"{"move": "g4"}"#],
    );

    let out = send(&orchestrator, json!({"type": "new", "gameId": "g1"})).await;
    assert_eq!(out["reply"]["move"], "f3");

    let out = send(&orchestrator, json!({"type": "move", "gameId": "g1", "move": "e5"})).await;
    assert_eq!(out["reply"]["move"], "g4");

    let out = send(&orchestrator, json!({"type": "move", "gameId": "g1", "move": "Qh4"})).await;
    assert_eq!(out["type"], "game_over");
    assert_eq!(out["status"], "checkmate");
    assert_eq!(out["winner"], "black");
    assert_eq!(out["humanMove"], "Qh4");
}
