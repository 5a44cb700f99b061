//! Move extraction from completion output.
//!
//! Two stages: a structured parser that reads a `move` field from a JSON object,
//! and a lossy scanner that picks notation-shaped tokens out of prose. Neither
//! stage is trusted on its own; every candidate goes through `match_legal`.

use std::sync::LazyLock;

use chess_core::oracle;
use regex::Regex;
use serde_json::Value;
use shakmaty::Chess;

use crate::prompt::MOVE_MARKER;

const MOVE_FIELDS: &[&str] = &["move", "best_move", "bestMove", "recommendedMove"];

static MOVE_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:O-O-O|O-O|0-0-0|0-0|[a-h][1-8]-?[a-h][1-8][qrbnQRBN]?|[KQRBN]?[a-h]?[1-8]?x?[a-h][1-8](?:=?[QRBN])?)[+#]?",
    )
    .unwrap()
});

/// Raw move token from the first JSON object in `text` that carries one.
pub fn extract_structured(text: &str) -> Option<String> {
    for (start, _) in text.match_indices('{') {
        let Some(end) = matching_brace(&text[start..]) else {
            continue;
        };
        let Ok(value) = serde_json::from_str::<Value>(&text[start..start + end + 1]) else {
            continue;
        };
        for field in MOVE_FIELDS {
            if let Some(mv) = value.get(field).and_then(|v| v.as_str()) {
                let mv = mv.trim();
                if !mv.is_empty() {
                    return Some(mv.to_string());
                }
            }
        }
    }
    None
}

/// Commentary field of a structured reply, if any.
pub fn extract_commentary(text: &str) -> Option<String> {
    for (start, _) in text.match_indices('{') {
        let Some(end) = matching_brace(&text[start..]) else {
            continue;
        };
        if let Ok(value) = serde_json::from_str::<Value>(&text[start..start + end + 1]) {
            if let Some(c) = value.get("commentary").and_then(|v| v.as_str()) {
                return Some(c.trim().to_string());
            }
        }
    }
    None
}

/// Offset of the brace closing the object that opens at `text[0]`.
fn matching_brace(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Notation-shaped tokens from prose, best candidates first. Tokens on a
/// `MOVE:` line come before tokens anywhere else.
pub fn extract_free_text(text: &str) -> Vec<String> {
    let mut candidates = Vec::new();

    for line in text.lines() {
        let cleaned = line.replace(['*', '`'], "");
        let upper = cleaned.to_ascii_uppercase();
        if let Some(idx) = upper.find(MOVE_MARKER) {
            let rest = &cleaned[idx + MOVE_MARKER.len()..];
            candidates.extend(MOVE_TOKEN_RE.find_iter(rest).map(|m| m.as_str().to_string()));
        }
    }

    candidates.extend(MOVE_TOKEN_RE.find_iter(text).map(|m| m.as_str().to_string()));
    candidates
}

/// SAN of `token` if it names a move in `legal`.
pub fn match_legal(pos: &Chess, legal: &[String], token: &str) -> Option<String> {
    let token = token.trim();
    let bytes = token.as_bytes();
    // "e2-e4" long algebraic
    let token = if bytes.len() >= 5 && bytes[2] == b'-' && bytes[0].is_ascii_lowercase() {
        token.replacen('-', "", 1)
    } else {
        token.to_string()
    };

    let san = oracle::to_san(pos, &token)?;
    legal.contains(&san).then_some(san)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start() -> (Chess, Vec<String>) {
        let pos = Chess::default();
        let legal = oracle::legal_moves(&pos);
        (pos, legal)
    }

    #[test]
    fn test_structured_in_fence() {
        let text = "Sure!\n```json\n{\"move\": \"Nf3\", \"commentary\": \"Develop {quietly}.\"}\n```";
        assert_eq!(extract_structured(text).as_deref(), Some("Nf3"));
        assert_eq!(extract_commentary(text).as_deref(), Some("Develop {quietly}."));
    }

    #[test]
    fn test_structured_alternate_field_names() {
        assert_eq!(extract_structured(r#"{"bestMove":"e2e4"}"#).as_deref(), Some("e2e4"));
        assert_eq!(extract_structured(r#"{"best_move":" d4 "}"#).as_deref(), Some("d4"));
    }

    #[test]
    fn test_structured_malformed() {
        assert_eq!(extract_structured(r#"{"move": "e4""#), None);
        assert_eq!(extract_structured("no json here"), None);
        assert_eq!(extract_structured(r#"{"move": 42}"#), None);
    }

    #[test]
    fn test_free_text_prefers_marker_line() {
        let text = "After 1. e4 the centre is open, so d4 is natural.\n**MOVE:** Nc3";
        let candidates = extract_free_text(text);
        assert_eq!(candidates[0], "Nc3");
        assert!(candidates.contains(&"e4".to_string()));
    }

    #[test]
    fn test_match_legal_filters() {
        let (pos, legal) = start();
        assert_eq!(match_legal(&pos, &legal, "e2-e4").as_deref(), Some("e4"));
        assert_eq!(match_legal(&pos, &legal, "g1f3").as_deref(), Some("Nf3"));
        assert_eq!(match_legal(&pos, &legal, "Nf3+").as_deref(), Some("Nf3"));
        assert_eq!(match_legal(&pos, &legal, "Qh5"), None);
        assert_eq!(match_legal(&pos, &legal, "O-O"), None);
    }
}
