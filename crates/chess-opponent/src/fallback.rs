//! Default move policy used whenever the completion service gives nothing usable.

/// Canonical development moves, tried in order.
pub const DEVELOPMENT_MOVES: &[&str] = &[
    "e4", "d4", "Nf3", "c4", "Nc3", "e5", "d5", "Nf6", "c5", "Nc6", "e6", "Bc4", "Bb5", "Bc5",
    "Be7", "O-O",
];

/// First canonical move that is legal, else the first legal move.
/// None only when there are no legal moves at all.
pub fn default_move(legal: &[String]) -> Option<String> {
    DEVELOPMENT_MOVES
        .iter()
        .find(|candidate| legal.iter().any(|m| m == *candidate))
        .map(|m| m.to_string())
        .or_else(|| legal.first().cloned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moves(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_prefers_canonical_order() {
        assert_eq!(default_move(&moves(&["a3", "Nf3", "d4"])).as_deref(), Some("d4"));
        assert_eq!(default_move(&moves(&["Kh1", "O-O"])).as_deref(), Some("O-O"));
    }

    #[test]
    fn test_falls_back_to_first_legal() {
        assert_eq!(default_move(&moves(&["Kh1", "Kg2"])).as_deref(), Some("Kh1"));
        assert_eq!(default_move(&[]), None);
    }
}
