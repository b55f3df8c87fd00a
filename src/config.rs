use anyhow::Context;
use serde::Deserialize;

const DEFAULT_LOG_FILTER: &str = "usermgmt=debug,axum=info,tower_http=info";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub log_filter: String,
    pub json_logs: bool,
    pub cors_permissive: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let port = match get("APP_PORT") {
            Some(v) => v
                .parse::<u16>()
                .with_context(|| format!("APP_PORT must be a port number, got {v:?}"))?,
            None => 8080,
        };
        let cors_permissive = match get("CORS_PERMISSIVE") {
            Some(v) => v
                .parse::<bool>()
                .with_context(|| format!("CORS_PERMISSIVE must be true or false, got {v:?}"))?,
            None => true,
        };
        Ok(Self {
            host: get("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            log_filter: get("RUST_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.into()),
            json_logs: get("LOG_FORMAT").map(|v| v == "json").unwrap_or(false),
            cors_permissive,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
