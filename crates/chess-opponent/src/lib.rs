pub mod completion;
pub mod config;
pub mod error;
pub mod extract;
pub mod fallback;
pub mod pipeline;
pub mod prompt;

pub use completion::{Completion, CompletionPrompt, OfflineCompletion, OpenAiCompletion};
pub use config::OpponentConfig;
pub use error::AnalysisError;
pub use pipeline::{MoveSource, Recommendation, Recommender};
pub use prompt::{AnalysisContext, PromptShape};
