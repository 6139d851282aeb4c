use std::time::Duration;

use motoaid_core::dispatch::DEFAULT_OFFER_TTL_SECS;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long an offer stays Pending before it may be skipped
    /// (default: `300`, i.e. 5 minutes).
    pub offer_ttl_secs: u64,
    /// How often the expiry sweep scans for lapsed offers (default: `30`).
    pub offer_sweep_interval_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default                    |
    /// |-----------------------------|----------------------------|
    /// | `HOST`                      | `0.0.0.0`                  |
    /// | `PORT`                      | `3000`                     |
    /// | `CORS_ORIGINS`              | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`      | `30`                       |
    /// | `OFFER_TTL_SECS`            | `300`                      |
    /// | `OFFER_SWEEP_INTERVAL_SECS` | `30`                       |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let offer_ttl_secs: u64 = std::env::var("OFFER_TTL_SECS")
            .unwrap_or_else(|_| DEFAULT_OFFER_TTL_SECS.to_string())
            .parse()
            .expect("OFFER_TTL_SECS must be a valid u64");

        let offer_sweep_interval_secs: u64 = std::env::var("OFFER_SWEEP_INTERVAL_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("OFFER_SWEEP_INTERVAL_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            offer_ttl_secs,
            offer_sweep_interval_secs,
        }
    }

    /// Offer TTL as a [`Duration`].
    pub fn offer_ttl(&self) -> Duration {
        Duration::from_secs(self.offer_ttl_secs)
    }

    /// Sweep interval as a [`Duration`].
    pub fn offer_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.offer_sweep_interval_secs)
    }
}
