use std::time::Duration;

use hospital_directory::DirectoryConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
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
    /// Time allowed for running batch passes to finish on shutdown (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Directory service connection settings.
    pub directory: DirectoryConfig,
    /// Maximum data rows accepted in one CSV upload (default: `20`).
    pub max_csv_rows: usize,
    /// Interval between live progress frames in milliseconds (default: `1000`).
    pub progress_interval_ms: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                          | Default                    |
    /// |----------------------------------|----------------------------|
    /// | `HOST`                           | `0.0.0.0`                  |
    /// | `PORT`                           | `3000`                     |
    /// | `CORS_ORIGINS`                   | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`           | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`          | `30`                       |
    /// | `HOSPITAL_DIRECTORY_BASE_URL`    | `http://localhost:8000`    |
    /// | `DIRECTORY_CONNECT_TIMEOUT_SECS` | `10`                       |
    /// | `DIRECTORY_REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `MAX_CSV_ROWS`                   | `20`                       |
    /// | `PROGRESS_INTERVAL_MS`           | `1000`                     |
    ///
    /// Panics on unparseable numeric values so misconfiguration fails at
    /// startup.
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

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let base_url = std::env::var("HOSPITAL_DIRECTORY_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8000".into());

        let connect_timeout_secs: u64 = std::env::var("DIRECTORY_CONNECT_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".into())
            .parse()
            .expect("DIRECTORY_CONNECT_TIMEOUT_SECS must be a valid u64");

        let directory_timeout_secs: u64 = std::env::var("DIRECTORY_REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("DIRECTORY_REQUEST_TIMEOUT_SECS must be a valid u64");

        let max_csv_rows: usize = std::env::var("MAX_CSV_ROWS")
            .unwrap_or_else(|_| "20".into())
            .parse()
            .expect("MAX_CSV_ROWS must be a valid usize");

        let progress_interval_ms: u64 = std::env::var("PROGRESS_INTERVAL_MS")
            .unwrap_or_else(|_| "1000".into())
            .parse()
            .expect("PROGRESS_INTERVAL_MS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            directory: DirectoryConfig {
                base_url,
                connect_timeout: Duration::from_secs(connect_timeout_secs),
                request_timeout: Duration::from_secs(directory_timeout_secs),
            },
            max_csv_rows,
            progress_interval_ms,
        }
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }
}
