use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::intent::{normalize_query, IntentCategory, RuleTable};
use crate::models::{IntentAction, IntentResponse, Language};

pub const UNKNOWN_REPLY: &str = "No entendí. ¿Quieres llamar, enviar WhatsApp o leer correos?";

/// Instruction sent to the external classifier ahead of the user query.
pub const FALLBACK_INSTRUCTION: &str = "Eres un NLU breve. Devuelve un JSON con action (say|call|whatsapp|emails_read|unknown), y campos pertinentes (call_contact, whatsapp_contact, whatsapp_message, say).";

#[derive(Debug, Error)]
pub enum FallbackError {
    #[error("fallback transport failed: {0}")]
    Transport(String),
    #[error("fallback returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("fallback response malformed: {0}")]
    Malformed(String),
}

/// External text-to-intent classifier consulted when no local rule matches.
///
/// Implementations return the raw JSON object they produced; field filtering
/// and validation belong to the resolver.
#[async_trait]
pub trait FallbackClassifier: Send + Sync {
    async fn classify(&self, query: &str) -> Result<Value, FallbackError>;

    fn model(&self) -> &str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    Rule {
        category: IntentCategory,
        language: Language,
    },
    Fallback,
    Unknown,
}

impl ResolutionSource {
    pub fn as_code(self) -> &'static str {
        match self {
            Self::Rule { .. } => "rule",
            Self::Fallback => "fallback",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub response: IntentResponse,
    pub source: ResolutionSource,
    /// Set when a configured fallback was called and its answer was discarded.
    pub fallback_failed: bool,
}

impl Resolution {
    pub fn fallback_attempted(&self) -> bool {
        self.source == ResolutionSource::Fallback || self.fallback_failed
    }
}

#[derive(Clone)]
pub struct IntentResolver {
    rules: Arc<RuleTable>,
    fallback: Option<Arc<dyn FallbackClassifier>>,
}

impl IntentResolver {
    pub fn new(rules: Arc<RuleTable>, fallback: Option<Arc<dyn FallbackClassifier>>) -> Self {
        Self { rules, fallback }
    }

    /// Standard rules and no external classifier.
    pub fn rules_only() -> Self {
        Self::new(Arc::new(RuleTable::standard()), None)
    }

    pub fn with_fallback(fallback: Arc<dyn FallbackClassifier>) -> Self {
        Self::new(Arc::new(RuleTable::standard()), Some(fallback))
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    pub fn fallback_model(&self) -> Option<&str> {
        self.fallback.as_deref().map(|fallback| fallback.model())
    }

    pub async fn resolve(&self, query: &str) -> IntentResponse {
        self.resolve_detailed(query).await.response
    }

    pub async fn resolve_detailed(&self, query: &str) -> Resolution {
        let normalized = normalize_query(query);

        if let Some(hit) = self.rules.match_query(&normalized) {
            return Resolution {
                response: hit.response,
                source: ResolutionSource::Rule {
                    category: hit.category,
                    language: hit.language,
                },
                fallback_failed: false,
            };
        }
        debug!("no local rule matched");

        let Some(fallback) = self.fallback.as_deref() else {
            return unknown_resolution(false);
        };

        match fallback.classify(&normalized).await {
            Ok(payload) => match response_from_payload(payload) {
                Ok(response) => Resolution {
                    response,
                    source: ResolutionSource::Fallback,
                    fallback_failed: false,
                },
                Err(err) => {
                    warn!(model = fallback.model(), error = %err, "discarding fallback answer");
                    unknown_resolution(true)
                }
            },
            Err(err) => {
                warn!(model = fallback.model(), error = %err, "fallback classifier failed");
                unknown_resolution(true)
            }
        }
    }
}

pub fn unknown_response() -> IntentResponse {
    IntentResponse::new(IntentAction::Unknown).with_say(UNKNOWN_REPLY)
}

/// Keeps only recognized fields of a classifier payload and decodes them.
///
/// No cross-field validation: a `whatsapp` action without a message is
/// returned as given.
pub fn response_from_payload(payload: Value) -> Result<IntentResponse, FallbackError> {
    let Value::Object(object) = payload else {
        return Err(FallbackError::Malformed(
            "expected a JSON object".to_string(),
        ));
    };

    let filtered: Map<String, Value> = object
        .into_iter()
        .filter(|(key, _)| IntentResponse::is_recognized_field(key))
        .collect();

    serde_json::from_value(Value::Object(filtered))
        .map_err(|err| FallbackError::Malformed(err.to_string()))
}

fn unknown_resolution(fallback_failed: bool) -> Resolution {
    Resolution {
        response: unknown_response(),
        source: ResolutionSource::Unknown,
        fallback_failed,
    }
}
