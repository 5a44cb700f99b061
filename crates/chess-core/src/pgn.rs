//! PGN import/export for game move records, using a lightweight regex-based parser.

use regex::Regex;
use shakmaty::san::SanPlus;
use shakmaty::Chess;

use crate::error::GameError;
use crate::game_data::{GameState, GameStatus};
use crate::oracle;

/// Result token for the PGN `Result` header and movetext terminator.
pub fn result_token(state: &GameState) -> &'static str {
    match state.status() {
        GameStatus::Checkmate => match state.winner() {
            Some("white") => "1-0",
            _ => "0-1",
        },
        GameStatus::Stalemate | GameStatus::Draw => "1/2-1/2",
        _ => "*",
    }
}

/// Render a game as PGN. Moves are replayed to restore check suffixes.
pub fn export_pgn(state: &GameState, white: &str, black: &str) -> String {
    let result = result_token(state);
    let mut pgn = String::new();
    pgn.push_str("[Event \"Casual game\"]\n");
    pgn.push_str("[Site \"?\"]\n");
    pgn.push_str(&format!("[Date \"{}\"]\n", state.created_at.format("%Y.%m.%d")));
    pgn.push_str(&format!("[White \"{}\"]\n", white));
    pgn.push_str(&format!("[Black \"{}\"]\n", black));
    pgn.push_str(&format!("[Result \"{}\"]\n", result));
    if let Some(reason) = state.end_reason() {
        pgn.push_str(&format!("[Termination \"{}\"]\n", reason));
    }
    pgn.push('\n');

    let mut pos = Chess::default();
    let mut movetext = Vec::new();
    for (ply, san) in state.move_record().iter().enumerate() {
        let mv = match oracle::resolve_move(&pos, san) {
            Ok(mv) => mv,
            Err(_) => break,
        };
        let san_plus = SanPlus::from_move_and_play_unchecked(&mut pos, mv);
        if ply % 2 == 0 {
            movetext.push(format!("{}. {}", ply / 2 + 1, san_plus));
        } else {
            movetext.push(san_plus.to_string());
        }
    }
    movetext.push(result.to_string());
    pgn.push_str(&movetext.join(" "));
    pgn.push('\n');
    pgn
}

/// Parse a PGN and replay its moves into a new game.
pub fn import_pgn(game_id: &str, pgn: &str) -> Result<GameState, GameError> {
    let moves = extract_moves(pgn);
    GameState::from_moves(game_id, &moves)
}

/// Extract SAN moves from PGN text (after removing headers, comments, variations).
pub fn extract_moves(pgn: &str) -> Vec<String> {
    // Remove headers
    let header_re = Regex::new(r"\[[^\]]*\]").unwrap();
    let no_headers = header_re.replace_all(pgn, "");

    // Remove comments
    let comment_re = Regex::new(r"\{[^}]*\}").unwrap();
    let no_comments = comment_re.replace_all(&no_headers, "");

    // Remove variations
    let variation_re = Regex::new(r"\([^)]*\)").unwrap();
    let no_variations = variation_re.replace_all(&no_comments, "");

    let move_re =
        Regex::new(r"O-O-O|O-O|[KQRBN]?[a-h]?[1-8]?x?[a-h][1-8](?:=[QRBN])?[+#]?").unwrap();

    move_re
        .find_iter(&no_variations)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Extract a string value from a PGN header.
pub fn extract_header(pgn: &str, header_name: &str) -> Option<String> {
    let pattern = format!(r#"\[{}\s+"([^"]*)"\]"#, regex::escape(header_name));
    let re = Regex::new(&pattern).ok()?;
    let value = re.captures(pgn)?.get(1)?.as_str().to_string();
    if value.is_empty() { None } else { Some(value) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_pgn_checkmate() {
        let game = GameState::from_moves("g1", &["f3", "e5", "g4", "Qh4"]).unwrap();
        let pgn = export_pgn(&game, "Human", "Opponent");

        assert_eq!(extract_header(&pgn, "Result").as_deref(), Some("0-1"));
        assert_eq!(extract_header(&pgn, "Termination").as_deref(), Some("checkmate"));
        assert!(pgn.contains("1. f3 e5 2. g4 Qh4# 0-1"));
    }

    #[test]
    fn test_import_pgn_basic() {
        let pgn = r#"[White "Player1"]
[Black "Player2"]
[Result "*"]

1. e4 {best by test} e5 2. Nf3 (2. f4 exf4) Nc6 3. Bb5 *"#;

        let game = import_pgn("g1", pgn).unwrap();
        assert_eq!(game.move_record(), &["e4", "e5", "Nf3", "Nc6", "Bb5"]);
        assert_eq!(game.turn(), "black");
    }

    #[test]
    fn test_import_pgn_rejects_illegal_sequence() {
        assert!(import_pgn("g1", "1. e4 e4").is_err());
    }

    #[test]
    fn test_extract_header_missing() {
        assert_eq!(extract_header("[White \"\"]", "White"), None);
        assert_eq!(extract_header("[White \"A\"]", "Black"), None);
    }
}
