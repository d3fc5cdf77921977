mod config;
mod error;
mod rate_limit;

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{body::Body, Json, Router};
use ferro_core::{IntentAction, IntentResolver, IntentResponse, ResolutionSource, RuleTable};
use ferro_ml::load_fallback_from_env;
use ferro_observability::{AppMetrics, MetricsSnapshot};
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

pub use crate::config::ServiceConfig;
pub use crate::error::ApiError;
pub use crate::rate_limit::IpRateLimiter;

#[derive(Clone)]
pub struct ApiState {
    pub app_name: Arc<str>,
    pub resolver: IntentResolver,
    pub metrics: Arc<AppMetrics>,
    pub limiter: IpRateLimiter,
}

impl ApiState {
    pub fn new(config: &ServiceConfig, resolver: IntentResolver) -> Self {
        Self {
            app_name: Arc::from(config.app_name.as_str()),
            resolver,
            metrics: AppMetrics::shared(),
            limiter: IpRateLimiter::new(config.rate_limit_window, config.rate_limit_max),
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    app: String,
    timestamp_utc: String,
    metrics: MetricsSnapshot,
    capabilities: HealthCapabilities,
}

#[derive(Debug, Serialize)]
struct HealthCapabilities {
    fallback_classifier: bool,
    fallback_model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IntentQuery {
    query: Option<String>,
}

/// Wires the resolver with the environment-gated fallback classifier.
pub fn build_app(config: &ServiceConfig) -> Result<Router> {
    let fallback = load_fallback_from_env()?;
    let resolver = IntentResolver::new(Arc::new(RuleTable::standard()), fallback);
    Ok(build_router(ApiState::new(config, resolver)))
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/mobile/intent", get(mobile_intent))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(RequestBodyLimitLayer::new(16 * 1024))
        .with_state(state)
}

async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    let payload = HealthResponse {
        status: "ok",
        app: state.app_name.to_string(),
        timestamp_utc: chrono::Utc::now().to_rfc3339(),
        metrics: state.metrics.snapshot(),
        capabilities: HealthCapabilities {
            fallback_classifier: state.resolver.fallback_model().is_some(),
            fallback_model: state.resolver.fallback_model().map(ToString::to_string),
        },
    };
    (StatusCode::OK, Json(payload))
}

#[instrument(skip(state, params))]
async fn mobile_intent(
    State(state): State<ApiState>,
    params: Result<Query<IntentQuery>, QueryRejection>,
) -> Result<Json<IntentResponse>, ApiError> {
    let Query(params) =
        params.map_err(|rejection| ApiError::InvalidQuery(rejection.body_text()))?;
    let query = params
        .query
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::InvalidQuery("query must be at least 1 character".to_string()))?;

    let started = Instant::now();
    state.metrics.inc_request();

    let resolution = state.resolver.resolve_detailed(&query).await;

    if resolution.fallback_attempted() {
        state.metrics.inc_fallback_attempt();
    }
    if resolution.fallback_failed {
        state.metrics.inc_fallback_failure();
    }
    match resolution.source {
        ResolutionSource::Rule { category, language } => {
            state.metrics.inc_rule_match();
            info!(
                action = resolution.response.action.as_code(),
                category = category.as_code(),
                language = language.as_code(),
                "intent resolved by rule"
            );
        }
        ResolutionSource::Fallback => {
            state.metrics.inc_fallback_answer();
            info!(
                action = resolution.response.action.as_code(),
                "intent resolved by fallback classifier"
            );
        }
        ResolutionSource::Unknown => {
            info!(
                fallback_failed = resolution.fallback_failed,
                "intent unresolved"
            );
        }
    }
    if resolution.response.action == IntentAction::Unknown {
        state.metrics.inc_unknown();
    }
    state.metrics.observe_latency(started.elapsed());

    Ok(Json(resolution.response))
}

async fn rate_limit_middleware(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.uri().path() == "/health" {
        return next.run(request).await;
    }

    let ip = request_ip(&request);
    if !state.limiter.allow(&ip) {
        return ApiError::RateLimited.into_response();
    }

    next.run(request).await
}

fn request_ip(request: &Request<Body>) -> String {
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .map(|value| {
            value
                .split(',')
                .next()
                .unwrap_or("unknown")
                .trim()
                .to_string()
        })
        .unwrap_or_else(|| "local".to_string())
}
