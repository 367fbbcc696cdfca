use std::path::PathBuf;
use std::time::Duration;

use nanodc_client::api::{DEFAULT_BASE_URL, DEFAULT_DATA_PATH, DEFAULT_LOGIN_PATH};
use nanodc_client::{ClientConfig, Credentials};

/// Default location of the device settings file.
pub const DEFAULT_SETTINGS_PATH: &str = "nanodc-settings.json";

/// Process configuration loaded from environment variables.
///
/// Runtime-tunable values (active facility, refresh interval, fetch
/// timeout) live in the settings store instead, so they survive restarts
/// and can change while the process runs.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// Bound on one dashboard HTTP request in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Telemetry service base URL.
    pub api_url: String,
    pub login_path: String,
    pub data_path: String,
    pub credentials: Credentials,
    pub settings_path: PathBuf,
    /// Optional JSON file replacing the built-in override tables.
    pub overrides_path: Option<PathBuf>,
}

impl MonitorConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                        |
    /// |-------------------------|--------------------------------|
    /// | `HOST`                  | `0.0.0.0`                      |
    /// | `PORT`                  | `3000`                         |
    /// | `CORS_ORIGINS`          | `http://localhost:5173`        |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                           |
    /// | `NANODC_API_URL`        | `http://211.176.180.172:8080`  |
    /// | `NANODC_LOGIN_PATH`     | `/api/users/login`             |
    /// | `NANODC_DATA_PATH`      | `/api/users/data`              |
    /// | `NANODC_USER_ID`        | required                       |
    /// | `NANODC_PASSWORD`       | required                       |
    /// | `NANODC_SETTINGS_PATH`  | `nanodc-settings.json`         |
    /// | `NANODC_OVERRIDES_PATH` | unset                          |
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

        let api_url = std::env::var("NANODC_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
        let login_path =
            std::env::var("NANODC_LOGIN_PATH").unwrap_or_else(|_| DEFAULT_LOGIN_PATH.into());
        let data_path =
            std::env::var("NANODC_DATA_PATH").unwrap_or_else(|_| DEFAULT_DATA_PATH.into());

        let user_id = std::env::var("NANODC_USER_ID").expect("NANODC_USER_ID must be set");
        let password = std::env::var("NANODC_PASSWORD").expect("NANODC_PASSWORD must be set");

        let settings_path = std::env::var("NANODC_SETTINGS_PATH")
            .unwrap_or_else(|_| DEFAULT_SETTINGS_PATH.into())
            .into();
        let overrides_path = std::env::var("NANODC_OVERRIDES_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            api_url,
            login_path,
            data_path,
            credentials: Credentials::new(user_id, password),
            settings_path,
            overrides_path,
        }
    }

    /// Client settings derived from this configuration.
    ///
    /// `fetch_timeout` bounds each request; the scheduler additionally
    /// bounds the whole cycle.
    pub fn client_config(&self, fetch_timeout: Duration) -> ClientConfig {
        let mut config = ClientConfig::new(self.api_url.as_str());
        config.login_path = self.login_path.clone();
        config.data_path = self.data_path.clone();
        config.request_timeout = fetch_timeout;
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_config_carries_paths_and_timeout() {
        let config = MonitorConfig {
            host: "127.0.0.1".into(),
            port: 0,
            cors_origins: vec![],
            request_timeout_secs: 30,
            api_url: "http://telemetry.local/".into(),
            login_path: "/login".into(),
            data_path: "/data".into(),
            credentials: Credentials::new("u", "p"),
            settings_path: DEFAULT_SETTINGS_PATH.into(),
            overrides_path: None,
        };

        let client = config.client_config(Duration::from_secs(12));
        assert_eq!(client.base_url, "http://telemetry.local");
        assert_eq!(client.login_path, "/login");
        assert_eq!(client.data_path, "/data");
        assert_eq!(client.request_timeout, Duration::from_secs(12));
    }
}
