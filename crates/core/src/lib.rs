pub mod context;
pub mod dates;
pub mod intent;
pub mod lexicon;
pub mod models;
pub mod policy;
pub mod prompt;
pub mod sanitize;

pub use context::ConversationContext;
pub use intent::{
    classify_detailed, classify_intent, normalize_text, sanitize_input, score_intents,
    Classification, IntentScores,
};
pub use models::*;
pub use policy::{filter_tools, NamedTool, ToolPolicy};
pub use prompt::{compose_system_prompt, fill_context};
pub use sanitize::sanitize_response;
