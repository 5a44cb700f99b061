//! Prompt construction for the completion service.

use chess_core::oracle::{self, GamePhase};
use chess_core::GameState;
use shakmaty::Chess;

use crate::completion::CompletionPrompt;

/// Number of trailing moves quoted back to the model.
const RECENT_MOVES: usize = 10;

/// Line prefix the free-form shape asks the model to put its move on.
pub const MOVE_MARKER: &str = "MOVE:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptShape {
    /// Commentary followed by a `MOVE: <san>` line
    Analyze,
    /// A single JSON object with a `move` field
    Structured,
    /// Free-text answer to a question; no move required
    Chat,
}

/// Conversational and positional signals that accompany a position.
#[derive(Debug, Clone)]
pub struct AnalysisContext {
    pub question: Option<String>,
    pub recent_moves: Vec<String>,
    pub phase: GamePhase,
    pub material_balance: i32,
    pub style: Option<String>,
}

impl AnalysisContext {
    pub fn for_position(pos: &Chess, recent_moves: &[String], style: Option<String>) -> Self {
        let start = recent_moves.len().saturating_sub(RECENT_MOVES);
        Self {
            question: None,
            recent_moves: recent_moves[start..].to_vec(),
            phase: oracle::game_phase(pos, recent_moves.len()),
            material_balance: oracle::material_balance(pos),
            style,
        }
    }

    pub fn from_state(state: &GameState, style: Option<String>) -> Self {
        Self::for_position(state.position(), state.move_record(), style)
    }

    pub fn with_question(mut self, question: impl Into<String>) -> Self {
        self.question = Some(question.into());
        self
    }
}

fn describe_balance(balance: i32) -> String {
    match balance {
        0 => "material is level".to_string(),
        b if b > 0 => format!("white is up {} pawn(s) of material", b),
        b => format!("black is up {} pawn(s) of material", -b),
    }
}

fn system_prompt(ctx: &AnalysisContext) -> String {
    let mut system = String::from(
        "You are a chess player and coach. You only ever choose moves from the list of \
         legal moves you are given, written exactly as listed.",
    );
    if let Some(style) = &ctx.style {
        system.push_str(&format!(" Your playing style: {}.", style));
    }
    system
}

pub fn build_prompt(
    shape: PromptShape,
    pos: &Chess,
    legal_moves: &[String],
    ctx: &AnalysisContext,
) -> CompletionPrompt {
    let mut user = String::new();
    user.push_str(&format!("Position (FEN): {}\n", oracle::to_fen(pos)));
    user.push_str(&format!("Side to move: {}\n", oracle::turn_name(pos)));
    user.push_str(&format!(
        "Game phase: {}; {}.\n",
        ctx.phase.as_str(),
        describe_balance(ctx.material_balance)
    ));
    if ctx.recent_moves.is_empty() {
        user.push_str("No moves have been played yet.\n");
    } else {
        user.push_str(&format!("Recent moves: {}\n", ctx.recent_moves.join(" ")));
    }
    user.push_str(&format!("Legal moves: {}\n\n", legal_moves.join(", ")));

    if let Some(question) = &ctx.question {
        user.push_str(&format!("Question: {}\n\n", question));
    }

    match shape {
        PromptShape::Analyze => {
            user.push_str(
                "Briefly explain the key ideas in this position and pick the best move \
                 for the side to move. End your answer with a single line of the form\n",
            );
            user.push_str(&format!("{} <move>\n", MOVE_MARKER));
        }
        PromptShape::Structured => {
            user.push_str(
                "Choose the best move for the side to move. Respond with only a JSON object \
                 of the form {\"move\": \"<move from the legal list>\", \"commentary\": \
                 \"<one sentence>\"} and nothing else.\n",
            );
        }
        PromptShape::Chat => {
            user.push_str("Answer conversationally in a few sentences.\n");
        }
    }

    CompletionPrompt {
        system: system_prompt(ctx),
        user,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_position_and_moves() {
        let state = GameState::from_moves("g1", &["e4", "e5"]).unwrap();
        let ctx = AnalysisContext::from_state(&state, Some("aggressive".into()));
        let prompt = build_prompt(PromptShape::Analyze, state.position(), &state.legal_moves(), &ctx);

        assert!(prompt.user.contains(&state.fen()));
        assert!(prompt.user.contains("Recent moves: e4 e5"));
        assert!(prompt.user.contains("Nf3"));
        assert!(prompt.user.contains(MOVE_MARKER));
        assert!(prompt.system.contains("aggressive"));
    }

    #[test]
    fn test_structured_and_chat_shapes() {
        let state = GameState::new("g1");
        let ctx = AnalysisContext::from_state(&state, None).with_question("What should I aim for?");
        let legal = state.legal_moves();

        let structured = build_prompt(PromptShape::Structured, state.position(), &legal, &ctx);
        assert!(structured.user.contains("JSON object"));

        let chat = build_prompt(PromptShape::Chat, state.position(), &legal, &ctx);
        assert!(chat.user.contains("Question: What should I aim for?"));
        assert!(!chat.user.contains(MOVE_MARKER));
    }

    #[test]
    fn test_recent_moves_are_truncated() {
        let moves: Vec<String> = ["Nf3", "Nf6", "Ng1", "Ng8"]
            .iter()
            .cycle()
            .take(14)
            .map(|s| s.to_string())
            .collect();
        let ctx = AnalysisContext::for_position(&Chess::default(), &moves, None);
        assert_eq!(ctx.recent_moves.len(), RECENT_MOVES);
    }
}
