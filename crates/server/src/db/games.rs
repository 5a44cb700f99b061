use chess_core::{GameRecord, GameStatus};
use serde_json::Value as JsonValue;
use sqlx::{PgPool, Row};

use crate::error::AppError;

/// Insert or replace the stored record for a game.
pub async fn save_game(pool: &PgPool, record: &GameRecord) -> Result<(), AppError> {
    let move_record = serde_json::to_value(&record.move_record)
        .map_err(|e| AppError::Internal(format!("serialize move record: {e}")))?;
    let position_history = serde_json::to_value(&record.position_history)
        .map_err(|e| AppError::Internal(format!("serialize position history: {e}")))?;

    sqlx::query(
        r#"INSERT INTO game_sessions (
            game_id, fen, move_record, position_history, status, end_reason,
            created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (game_id) DO UPDATE SET
            fen = EXCLUDED.fen,
            move_record = EXCLUDED.move_record,
            position_history = EXCLUDED.position_history,
            status = EXCLUDED.status,
            end_reason = EXCLUDED.end_reason,
            created_at = EXCLUDED.created_at,
            updated_at = EXCLUDED.updated_at"#,
    )
    .bind(&record.game_id)
    .bind(&record.fen)
    .bind(move_record)
    .bind(position_history)
    .bind(record.status.as_str())
    .bind(&record.end_reason)
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(pool)
    .await
    .map_err(AppError::Sqlx)?;

    Ok(())
}

/// Load the stored record for a game, if any.
pub async fn load_game(pool: &PgPool, game_id: &str) -> Result<Option<GameRecord>, AppError> {
    let row = sqlx::query(
        r#"SELECT game_id, fen, move_record, position_history, status, end_reason,
                  created_at, updated_at
           FROM game_sessions
           WHERE game_id = $1"#,
    )
    .bind(game_id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let status: String = row.get("status");
    let move_record: JsonValue = row.get("move_record");
    let position_history: JsonValue = row.get("position_history");

    Ok(Some(GameRecord {
        game_id: row.get("game_id"),
        fen: row.get("fen"),
        move_record: string_list(&move_record),
        position_history: string_list(&position_history),
        status: status.parse::<GameStatus>()?,
        end_reason: row.get("end_reason"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }))
}

fn string_list(value: &JsonValue) -> Vec<String> {
    value
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_list_skips_non_strings() {
        assert_eq!(string_list(&json!(["e4", 5, "e5"])), vec!["e4", "e5"]);
        assert!(string_list(&json!(null)).is_empty());
    }
}
