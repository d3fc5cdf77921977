mod openai;

use std::sync::Arc;

use anyhow::Result;
use ferro_core::FallbackClassifier;
use tracing::info;

pub use openai::{OpenAiFallbackClassifier, OpenAiFallbackConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};

/// Builds the external classifier when a credential is configured.
///
/// Returns `Ok(None)` without touching the network when `OPENAI_API_KEY` is
/// absent, so the resolver goes straight to the unknown intent.
pub fn load_fallback_from_env() -> Result<Option<Arc<dyn FallbackClassifier>>> {
    let Some(config) = OpenAiFallbackConfig::from_env() else {
        info!("no OPENAI_API_KEY configured; fallback classifier disabled");
        return Ok(None);
    };

    info!(model = %config.model, "fallback classifier enabled");
    let classifier = OpenAiFallbackClassifier::new(config)?;
    Ok(Some(Arc::new(classifier)))
}
