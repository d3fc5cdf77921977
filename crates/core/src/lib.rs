pub mod intent;
pub mod models;
pub mod resolver;

pub use intent::{normalize_query, IntentCategory, Rule, RuleMatch, RuleTable, RuleTableError};
pub use models::*;
pub use resolver::{
    response_from_payload, unknown_response, FallbackClassifier, FallbackError, IntentResolver,
    Resolution, ResolutionSource, FALLBACK_INSTRUCTION, UNKNOWN_REPLY,
};
