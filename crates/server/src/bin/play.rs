//! Play against the opponent from the terminal.
//!
//! Usage: cargo run --bin play
//!
//! Type a move in SAN or UCI (`e4`, `g1f3`) or one of:
//!   new | reply | hint | analyze | chat <question> | pgn | load <file> | moves | quit

use std::sync::Arc;

use anyhow::Context;
use chess_opponent::{OpponentConfig, Recommender};
use server::config::{Config, HumanColor};
use server::error::AppError;
use server::orchestrator::{Orchestrator, TurnOutcome};
use server::session::SessionManager;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Quiet by default so log lines don't interleave with the board
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let config = Config::from_env();
    let recommender = Recommender::from_config(&OpponentConfig::from_env())
        .context("Failed to configure the completion client")?;
    let sessions = SessionManager::new(Arc::new(recommender)).with_hint_limit(config.hint_limit);
    let orchestrator = Orchestrator::new(Arc::new(sessions)).with_human_color(config.human_color);

    let mut game_id = start(&orchestrator).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            prompt();
            continue;
        }

        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((c, r)) => (c, r.trim()),
            None => (line, ""),
        };

        let result = match command {
            "quit" | "exit" => break,
            "new" => start(&orchestrator).await.map(|id| game_id = id),
            "reply" => orchestrator.automated_turn(&game_id).await.map(|outcome| {
                if print_turn(&outcome) {
                    println!("Type 'new' to play again or 'quit' to leave.");
                }
            }),
            "hint" => show_hints(&orchestrator, &game_id).await,
            "analyze" => analyze(&orchestrator, &game_id).await,
            "chat" => chat(&orchestrator, &game_id, rest).await,
            "pgn" => show_pgn(&orchestrator, &game_id).await,
            "load" => load(&orchestrator, &game_id, rest).await,
            "moves" => show_moves(&orchestrator, &game_id).await,
            _ => match orchestrator.play_turn(&game_id, line, None).await {
                Ok(outcome) => {
                    if print_turn(&outcome) {
                        println!("Type 'new' to play again or 'quit' to leave.");
                    }
                    Ok(())
                }
                Err(e) => Err(e),
            },
        };

        if let Err(e) = result {
            println!("{}", describe_error(&e));
        }
        prompt();
    }

    Ok(())
}

fn prompt() {
    use std::io::Write;
    print!("> ");
    let _ = std::io::stdout().flush();
}

async fn start(orchestrator: &Orchestrator) -> Result<String, AppError> {
    let game_id = uuid::Uuid::new_v4().to_string();
    let outcome = orchestrator.start_game(&game_id).await?;
    println!(
        "New game {}. You play {}.",
        game_id,
        orchestrator.human_color().as_str()
    );
    if orchestrator.human_color() == HumanColor::Black {
        print_turn(&outcome);
    } else {
        println!("{}", outcome.state.fen);
    }
    Ok(game_id)
}

/// Print a turn. Returns true when the game is over.
fn print_turn(outcome: &TurnOutcome) -> bool {
    if let Some(reply) = &outcome.reply {
        if !reply.commentary.is_empty() {
            println!("{}", reply.commentary);
        }
        println!("Opponent plays {}", reply.mv);
    }
    println!("{}", outcome.state.fen);
    if outcome.state.in_check && outcome.game_over.is_none() {
        println!("Check!");
    }
    match &outcome.game_over {
        Some(over) => {
            match &over.winner {
                Some(winner) => println!("Game over: {} ({} wins)", over.reason, winner),
                None => println!("Game over: {}", over.reason),
            }
            true
        }
        None => false,
    }
}

async fn show_hints(orchestrator: &Orchestrator, game_id: &str) -> Result<(), AppError> {
    let hints = orchestrator.sessions().hint(game_id, None, None).await?;
    if hints.is_empty() {
        println!("No moves available.");
    }
    for hint in hints {
        println!("  {:<8} {}", hint.mv, hint.label);
    }
    Ok(())
}

async fn analyze(orchestrator: &Orchestrator, game_id: &str) -> Result<(), AppError> {
    let analysis = orchestrator.sessions().analyze(game_id, None).await?;
    println!("{}", analysis.commentary);
    if let Some(mv) = analysis.recommended_move {
        println!("Suggested: {}", mv);
    }
    Ok(())
}

async fn chat(orchestrator: &Orchestrator, game_id: &str, question: &str) -> Result<(), AppError> {
    let reply = orchestrator.sessions().chat(game_id, question, None).await?;
    println!("{}", reply);
    Ok(())
}

async fn show_pgn(orchestrator: &Orchestrator, game_id: &str) -> Result<(), AppError> {
    let (white, black) = match orchestrator.human_color() {
        HumanColor::White => ("Human", "Opponent"),
        HumanColor::Black => ("Opponent", "Human"),
    };
    let pgn = orchestrator.sessions().export_pgn(game_id, white, black).await?;
    println!("{}", pgn);
    Ok(())
}

async fn load(orchestrator: &Orchestrator, game_id: &str, path: &str) -> Result<(), AppError> {
    if path.is_empty() {
        return Err(AppError::BadRequest("usage: load <file>".into()));
    }
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| AppError::BadRequest(format!("could not read {}: {}", path, e)))?;
    let outcome = orchestrator.import_game(game_id, &text).await?;
    let loaded = outcome.state.move_record.len() - usize::from(outcome.reply.is_some());
    println!("Loaded {} moves.", loaded);
    if print_turn(&outcome) {
        println!("Type 'new' to play again or 'quit' to leave.");
    }
    Ok(())
}

async fn show_moves(orchestrator: &Orchestrator, game_id: &str) -> Result<(), AppError> {
    let state = orchestrator.sessions().snapshot(game_id).await?;
    if state.move_record.is_empty() {
        println!("No moves yet.");
    } else {
        let numbered: Vec<String> = state
            .move_record
            .chunks(2)
            .enumerate()
            .map(|(i, pair)| format!("{}. {}", i + 1, pair.join(" ")))
            .collect();
        println!("{}", numbered.join(" "));
    }
    println!("Legal: {}", state.legal_moves.join(" "));
    Ok(())
}

fn describe_error(e: &AppError) -> String {
    match e {
        AppError::IllegalMove(msg) => format!("{}. Type 'moves' to list legal moves.", msg),
        AppError::GameFinished(_) => "The game is over. Type 'new' to start another.".to_string(),
        AppError::NotYourTurn(_) => "It is the opponent's move. Type 'reply' to let it play.".to_string(),
        other => other.client_message(),
    }
}
