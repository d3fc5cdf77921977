use std::env;
use std::time::Duration;

pub const DEFAULT_APP_NAME: &str = "FerroAI Cloud";
pub const DEFAULT_BIND: &str = "0.0.0.0:8080";

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub app_name: String,
    pub bind: String,
    pub rate_limit_window: Duration,
    pub rate_limit_max: usize,
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let app_name = lookup("APP_NAME")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_APP_NAME.to_string());
        let bind = lookup("FERRO_BIND")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_BIND.to_string());
        let rate_limit_window = Duration::from_secs(
            lookup("FERRO_RATE_LIMIT_WINDOW_SECONDS")
                .and_then(|value| value.trim().parse::<u64>().ok())
                .unwrap_or(60),
        );
        let rate_limit_max = lookup("FERRO_RATE_LIMIT_MAX")
            .and_then(|value| value.trim().parse::<usize>().ok())
            .unwrap_or(120);

        Self {
            app_name,
            bind,
            rate_limit_window,
            rate_limit_max,
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
