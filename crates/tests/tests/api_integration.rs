use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use ferro_api::{build_router, ApiState, ServiceConfig};
use ferro_core::{IntentResolver, UNKNOWN_REPLY};
use ferro_tests::{app_with_fallback, intent_uri, rules_only_app, test_config, RecordingClassifier};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let parsed = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, parsed)
}

async fn resolve(app: &Router, query: &str) -> Value {
    let (status, body) = get_json(app, &intent_uri(query)).await;
    assert_eq!(status, StatusCode::OK, "query {query:?} -> {body}");
    body
}

#[tokio::test]
async fn health_reports_app_and_disabled_fallback() {
    let app = rules_only_app();
    let (status, body) = get_json(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["app"], "FerroAI Test");
    assert_eq!(body["capabilities"]["fallback_classifier"], false);
    assert!(body["capabilities"]["fallback_model"].is_null());
    assert!(body["metrics"]["requests_total"].is_u64());
}

#[tokio::test]
async fn health_reports_configured_fallback_model() {
    let app = app_with_fallback(RecordingClassifier::answering(json!({})));
    let (_, body) = get_json(&app, "/health").await;

    assert_eq!(body["capabilities"]["fallback_classifier"], true);
    assert_eq!(body["capabilities"]["fallback_model"], "recording-stub");
}

#[tokio::test]
async fn whatsapp_scenario() {
    let body = resolve(&rules_only_app(), "whatsapp a Juan: llego tarde").await;

    assert_eq!(body["action"], "whatsapp");
    assert_eq!(body["whatsapp_contact"], "Juan");
    assert_eq!(body["whatsapp_message"], "llego tarde");
    assert_eq!(body["say"], "Ok, enviando WhatsApp a Juan.");
    assert!(body["call_contact"].is_null());
}

#[tokio::test]
async fn whatsapp_takes_precedence_over_call() {
    let body = resolve(&rules_only_app(), "whatsapp a Juan: hola").await;
    assert_eq!(body["action"], "whatsapp");
}

#[tokio::test]
async fn call_scenarios() {
    let app = rules_only_app();

    let body = resolve(&app, "llama a María").await;
    assert_eq!(body["action"], "call");
    assert_eq!(body["call_contact"], "María");
    assert_eq!(body["say"], "Llamando a María.");

    let body = resolve(&app, "call Peter").await;
    assert_eq!(body["action"], "call");
    assert_eq!(body["call_contact"], "Peter");
}

#[tokio::test]
async fn emails_read_scenario() {
    let body = resolve(&rules_only_app(), "lee mis correos").await;

    assert_eq!(body["action"], "emails_read");
    assert_eq!(
        body["emails"],
        json!([
            "Gmail: Mick — Confirmación de fecha para shutters",
            "Gmail: Anderson — Vauxhall next Wednesday"
        ])
    );
}

#[tokio::test]
async fn greeting_scenario() {
    let body = resolve(&rules_only_app(), "buenos dias").await;

    assert_eq!(body["action"], "say");
    assert_eq!(body["say"], "Hola, ¿qué necesitas?");
}

#[tokio::test]
async fn nonsense_without_fallback_is_unknown() {
    let body = resolve(&rules_only_app(), "xyz123 nonsense").await;

    assert_eq!(body["action"], "unknown");
    assert_eq!(body["say"], UNKNOWN_REPLY);
}

#[tokio::test]
async fn padded_queries_yield_the_same_payload() {
    let app = rules_only_app();
    let plain = resolve(&app, "whatsapp a Juan: llego tarde").await;
    let padded = resolve(&app, "   whatsapp a Juan: llego tarde \t ").await;
    assert_eq!(plain, padded);
}

#[tokio::test]
async fn missing_or_empty_query_is_rejected() {
    let app = rules_only_app();

    let (status, body) = get_json(&app, "/mobile/intent").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "invalid_query");

    let (status, _) = get_json(&app, "/mobile/intent?query=").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn repeated_query_parameter_is_rejected_as_json() {
    let app = rules_only_app();

    let (status, body) = get_json(&app, "/mobile/intent?query=hola&query=call%20Peter").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "invalid_query");
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn whitespace_only_query_resolves_to_unknown() {
    let body = resolve(&rules_only_app(), "   ").await;
    assert_eq!(body["action"], "unknown");
}

#[tokio::test]
async fn rule_match_never_consults_fallback() {
    let classifier = RecordingClassifier::answering(json!({ "action": "say", "say": "stub" }));
    let app = app_with_fallback(classifier.clone());

    let body = resolve(&app, "check my gmail").await;
    assert_eq!(body["action"], "emails_read");
    assert_eq!(classifier.calls(), 0);
}

#[tokio::test]
async fn fallback_answer_is_filtered_to_known_fields() {
    let classifier = RecordingClassifier::answering(json!({
        "action": "whatsapp",
        "whatsapp_contact": "Ana",
        "whatsapp_message": "voy en camino",
        "mood": "hurried",
        "confidence": 0.8
    }));
    let app = app_with_fallback(classifier.clone());

    let body = resolve(&app, "dile a Ana que voy en camino").await;
    assert_eq!(classifier.calls(), 1);
    assert_eq!(body["action"], "whatsapp");
    assert_eq!(body["whatsapp_contact"], "Ana");
    assert_eq!(body["whatsapp_message"], "voy en camino");
    assert!(body.get("mood").is_none());
    assert!(body.get("confidence").is_none());
}

#[tokio::test]
async fn fallback_failure_is_absorbed() {
    let classifier = RecordingClassifier::failing_with_status(503);
    let app = app_with_fallback(classifier.clone());

    let body = resolve(&app, "xyz123 nonsense").await;
    assert_eq!(classifier.calls(), 1);
    assert_eq!(body["action"], "unknown");
    assert_eq!(body["say"], UNKNOWN_REPLY);

    let (_, health) = get_json(&app, "/health").await;
    assert_eq!(health["metrics"]["fallback_attempts_total"], 1);
    assert_eq!(health["metrics"]["fallback_failures_total"], 1);
    assert_eq!(health["metrics"]["unknown_total"], 1);
}

#[tokio::test]
async fn fallback_unknown_answer_counts_as_unknown() {
    let classifier = RecordingClassifier::answering(json!({ "action": "unknown" }));
    let app = app_with_fallback(classifier.clone());

    let body = resolve(&app, "xyz123 nonsense").await;
    assert_eq!(classifier.calls(), 1);
    assert_eq!(body["action"], "unknown");

    let (_, health) = get_json(&app, "/health").await;
    assert_eq!(health["metrics"]["fallback_attempts_total"], 1);
    assert_eq!(health["metrics"]["fallback_answers_total"], 1);
    assert_eq!(health["metrics"]["fallback_failures_total"], 0);
    assert_eq!(health["metrics"]["unknown_total"], 1);
}

#[tokio::test]
async fn metrics_count_rule_matches() {
    let app = rules_only_app();
    resolve(&app, "hola").await;
    resolve(&app, "call Peter").await;
    resolve(&app, "qwerty").await;

    let (_, health) = get_json(&app, "/health").await;
    assert_eq!(health["metrics"]["requests_total"], 3);
    assert_eq!(health["metrics"]["rule_matches_total"], 2);
    assert_eq!(health["metrics"]["unknown_total"], 1);
    assert_eq!(health["metrics"]["fallback_attempts_total"], 0);
}

#[tokio::test]
async fn responses_carry_request_id() {
    let app = rules_only_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri(intent_uri("hola"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn rate_limit_applies_to_intents_but_not_health() {
    let config = ServiceConfig {
        rate_limit_window: Duration::from_secs(60),
        rate_limit_max: 2,
        ..test_config()
    };
    let app = build_router(ApiState::new(&config, IntentResolver::rules_only()));

    for _ in 0..2 {
        let (status, _) = get_json(&app, &intent_uri("hola")).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = get_json(&app, &intent_uri("hola")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "rate_limited");

    let rejected = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(intent_uri("hola"))
                .header("x-request-id", "client-supplied-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(rejected.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(rejected.headers()["x-request-id"], "client-supplied-42");

    let (status, _) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
}
