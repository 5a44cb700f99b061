use std::env;

/// Which side the human plays. The opponent takes the other one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HumanColor {
    White,
    Black,
}

impl HumanColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            HumanColor::White => "white",
            HumanColor::Black => "black",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    /// Postgres URL; sessions live only in memory when unset
    pub database_url: Option<String>,
    pub host: String,
    pub port: u16,
    /// Default number of moves returned by `hint`
    pub hint_limit: usize,
    pub human_color: HumanColor,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL").ok().filter(|v| !v.trim().is_empty()),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8000),
            hint_limit: env::var("HINT_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            human_color: match env::var("HUMAN_COLOR").as_deref() {
                Ok("black") | Ok("b") => HumanColor::Black,
                _ => HumanColor::White,
            },
        }
    }
}
