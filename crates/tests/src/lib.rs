//! Shared fixtures for the HTTP integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use ferro_api::{build_router, ApiState, ServiceConfig};
use ferro_core::{FallbackClassifier, FallbackError, IntentResolver};
use serde_json::Value;

/// Classifier double that replays a fixed answer and counts calls.
pub struct RecordingClassifier {
    answer: Result<Value, u16>,
    calls: AtomicUsize,
}

impl RecordingClassifier {
    pub fn answering(value: Value) -> Arc<Self> {
        Arc::new(Self {
            answer: Ok(value),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing_with_status(status: u16) -> Arc<Self> {
        Arc::new(Self {
            answer: Err(status),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FallbackClassifier for RecordingClassifier {
    async fn classify(&self, _query: &str) -> Result<Value, FallbackError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.answer {
            Ok(value) => Ok(value.clone()),
            Err(status) => Err(FallbackError::Status {
                status: *status,
                body: "upstream unavailable".to_string(),
            }),
        }
    }

    fn model(&self) -> &str {
        "recording-stub"
    }
}

pub fn test_config() -> ServiceConfig {
    ServiceConfig {
        app_name: "FerroAI Test".to_string(),
        ..ServiceConfig::default()
    }
}

pub fn rules_only_app() -> Router {
    build_router(ApiState::new(&test_config(), IntentResolver::rules_only()))
}

pub fn app_with_fallback(classifier: Arc<dyn FallbackClassifier>) -> Router {
    build_router(ApiState::new(
        &test_config(),
        IntentResolver::with_fallback(classifier),
    ))
}

/// `/mobile/intent` URI with the query form-encoded.
pub fn intent_uri(query: &str) -> String {
    let encoded = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("query", query)
        .finish();
    format!("/mobile/intent?{encoded}")
}

#[cfg(test)]
mod tests {
    use super::intent_uri;

    #[test]
    fn intent_uri_decodes_back_to_the_query() {
        let query = "whatsapp a María: llego tarde & ya";
        let uri = url::Url::parse(&format!("http://localhost{}", intent_uri(query))).unwrap();

        assert_eq!(uri.path(), "/mobile/intent");
        let pairs: Vec<(String, String)> = uri.query_pairs().into_owned().collect();
        assert_eq!(pairs, vec![("query".to_string(), query.to_string())]);
    }
}
