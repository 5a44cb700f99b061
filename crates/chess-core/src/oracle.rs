//! Board oracle: a thin adapter over shakmaty.
//!
//! Everything rules-related (legal move generation, move application, terminal
//! detection) is delegated to shakmaty. This module only normalizes notation and
//! turns positions into the strings the rest of the system passes around.

use shakmaty::fen::Fen;
use shakmaty::san::San;
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, CastlingSide, Chess, Color, EnPassantMode, Move, Position, Role};

use crate::error::OracleError;

pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Halfmove clock value at which the fifty-move rule applies.
const FIFTY_MOVE_HALFMOVES: u32 = 100;

/// Terminal (or check) state of a position, in priority order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalState {
    Checkmate,
    Stalemate,
    Draw(DrawReason),
    Check,
    Ongoing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawReason {
    InsufficientMaterial,
    FiftyMoveRule,
    ThreefoldRepetition,
}

impl DrawReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DrawReason::InsufficientMaterial => "insufficient material",
            DrawReason::FiftyMoveRule => "fifty-move rule",
            DrawReason::ThreefoldRepetition => "threefold repetition",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    Opening,
    Middlegame,
    Endgame,
}

impl GamePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            GamePhase::Opening => "opening",
            GamePhase::Middlegame => "middlegame",
            GamePhase::Endgame => "endgame",
        }
    }
}

pub fn parse_fen(fen: &str) -> Result<Chess, OracleError> {
    let parsed: Fen = fen
        .trim()
        .parse()
        .map_err(|e| OracleError::InvalidPosition(format!("Invalid FEN '{}': {}", fen, e)))?;
    parsed
        .into_position::<Chess>(CastlingMode::Standard)
        .map_err(|e| OracleError::InvalidPosition(format!("Impossible position '{}': {}", fen, e)))
}

pub fn to_fen(pos: &Chess) -> String {
    Fen::from_position(pos, EnPassantMode::Legal).to_string()
}

/// Strips move counters from a FEN, keeping placement + side + castling + ep.
pub fn normalize_fen(fen: &str) -> String {
    fen.split_whitespace().take(4).collect::<Vec<_>>().join(" ")
}

/// Repetition key for a position.
pub fn position_key(pos: &Chess) -> String {
    normalize_fen(&to_fen(pos))
}

pub fn turn_name(pos: &Chess) -> &'static str {
    match pos.turn() {
        Color::White => "white",
        Color::Black => "black",
    }
}

/// All legal moves in SAN, without check suffixes, in generation order.
pub fn legal_moves(pos: &Chess) -> Vec<String> {
    pos.legal_moves()
        .iter()
        .map(|mv| San::from_move(pos, mv.clone()).to_string())
        .collect()
}

/// Strip annotations and fold alternative spellings into plain SAN/UCI.
fn clean_notation(text: &str) -> String {
    let trimmed = text
        .trim()
        .trim_end_matches(|c| matches!(c, '+' | '#' | '!' | '?'))
        .trim_end_matches('.');
    match trimmed {
        "0-0" | "o-o" => "O-O".to_string(),
        "0-0-0" | "o-o-o" => "O-O-O".to_string(),
        other => other.to_string(),
    }
}

/// Resolve a move written in SAN or UCI to a legal move in `pos`.
pub fn resolve_move(pos: &Chess, text: &str) -> Result<Move, OracleError> {
    let cleaned = clean_notation(text);
    if cleaned.is_empty() {
        return Err(OracleError::IllegalMove {
            mv: text.to_string(),
            reason: "empty move".into(),
        });
    }

    if let Ok(san) = cleaned.parse::<San>() {
        if let Ok(mv) = san.to_move(pos) {
            return Ok(mv);
        }
    }

    if let Ok(uci) = cleaned.to_ascii_lowercase().parse::<UciMove>() {
        if let Ok(mv) = uci.to_move(pos) {
            return Ok(mv);
        }
    }

    Err(OracleError::IllegalMove {
        mv: text.to_string(),
        reason: format!("not legal in {}", normalize_fen(&to_fen(pos))),
    })
}

/// SAN of `text` in `pos` if it names a legal move.
pub fn to_san(pos: &Chess, text: &str) -> Option<String> {
    let mv = resolve_move(pos, text).ok()?;
    Some(San::from_move(pos, mv).to_string())
}

/// Apply a move, returning the new position and the SAN that was played.
pub fn play(pos: &Chess, text: &str) -> Result<(Chess, String), OracleError> {
    let mv = resolve_move(pos, text)?;
    let san = San::from_move(pos, mv.clone()).to_string();
    let next = pos.clone().play(mv).map_err(|e| OracleError::IllegalMove {
        mv: text.to_string(),
        reason: e.to_string(),
    })?;
    Ok((next, san))
}

/// Classify a position. `history` holds repetition keys of every position reached
/// in the game, including `pos` itself.
pub fn terminal_state(pos: &Chess, history: &[String]) -> TerminalState {
    if pos.is_checkmate() {
        return TerminalState::Checkmate;
    }
    if pos.is_stalemate() {
        return TerminalState::Stalemate;
    }
    if pos.is_insufficient_material() {
        return TerminalState::Draw(DrawReason::InsufficientMaterial);
    }
    if pos.halfmoves() >= FIFTY_MOVE_HALFMOVES {
        return TerminalState::Draw(DrawReason::FiftyMoveRule);
    }
    let key = position_key(pos);
    if history.iter().filter(|k| **k == key).count() >= 3 {
        return TerminalState::Draw(DrawReason::ThreefoldRepetition);
    }
    if pos.is_check() {
        return TerminalState::Check;
    }
    TerminalState::Ongoing
}

fn role_value(role: Role) -> i32 {
    match role {
        Role::Pawn => 1,
        Role::Knight => 3,
        Role::Bishop => 3,
        Role::Rook => 5,
        Role::Queen => 9,
        Role::King => 0,
    }
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::Pawn => "Pawn",
        Role::Knight => "Knight",
        Role::Bishop => "Bishop",
        Role::Rook => "Rook",
        Role::Queen => "Queen",
        Role::King => "King",
    }
}

/// White material minus black material, in pawns.
pub fn material_balance(pos: &Chess) -> i32 {
    let board = pos.board();
    let mut score = 0i32;
    for sq in board.occupied() {
        if let Some(piece) = board.piece_at(sq) {
            let val = role_value(piece.role);
            if piece.color == Color::White {
                score += val;
            } else {
                score -= val;
            }
        }
    }
    score
}

/// Non-pawn material per side (white, black).
fn piece_material(pos: &Chess) -> (i32, i32) {
    let board = pos.board();
    let (mut white, mut black) = (0, 0);
    for sq in board.occupied() {
        if let Some(piece) = board.piece_at(sq) {
            if piece.role == Role::Pawn {
                continue;
            }
            match piece.color {
                Color::White => white += role_value(piece.role),
                Color::Black => black += role_value(piece.role),
            }
        }
    }
    (white, black)
}

pub fn game_phase(pos: &Chess, plies: usize) -> GamePhase {
    let (white, black) = piece_material(pos);
    let queens_on = !pos.board().by_role(Role::Queen).is_empty();

    if white + black <= 26 || (!queens_on && white <= 13 && black <= 13) {
        return GamePhase::Endgame;
    }
    // 31 per side at the start: 2N + 2B + 2R + Q
    if plies < 20 && (queens_on || white + black >= 56) {
        return GamePhase::Opening;
    }
    GamePhase::Middlegame
}

/// Human-readable label for a legal move, e.g. "Knight to f3".
pub fn describe_move(pos: &Chess, mv: &Move) -> String {
    if let Some(side) = mv.castling_side() {
        return match side {
            CastlingSide::KingSide => "Castle kingside".to_string(),
            CastlingSide::QueenSide => "Castle queenside".to_string(),
        };
    }

    let piece = role_name(mv.role());
    let verb = if mv.is_capture() { "takes" } else { "to" };
    let mut label = format!("{} {} {}", piece, verb, mv.to());
    if let Some(promo) = mv.promotion() {
        label.push_str(&format!(" promoting to {}", role_name(promo)));
    }
    if pos.clone().play(mv.clone()).map(|p| p.is_check()).unwrap_or(false) {
        label.push_str(" with check");
    }
    label
}

/// Every legal move as (SAN, label) in generation order.
pub fn labelled_moves(pos: &Chess) -> Vec<(String, String)> {
    pos.legal_moves()
        .iter()
        .map(|mv| {
            (
                San::from_move(pos, mv.clone()).to_string(),
                describe_move(pos, mv),
            )
        })
        .collect()
}
