use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

const DEFAULT_RISK_API_BASE_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub prediction: PredictionServiceConfig,
    pub simulation: SimulationConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let base_url = PredictionServiceConfig::normalize_base_url(
            &env::var("RISK_API_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_RISK_API_BASE_URL.to_string()),
        )?;

        let debounce_ms = match env::var("SIMULATION_DEBOUNCE_MS") {
            Ok(raw) => match raw.trim().parse::<u64>() {
                Ok(value) if value > 0 => value,
                _ => return Err(ConfigError::InvalidDebounceWindow { value: raw }),
            },
            Err(_) => DEFAULT_DEBOUNCE_MS,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            prediction: PredictionServiceConfig { base_url },
            simulation: SimulationConfig {
                debounce: Duration::from_millis(debounce_ms),
            },
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Location of the remote prediction service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictionServiceConfig {
    pub base_url: String,
}

impl PredictionServiceConfig {
    /// Validates the scheme and strips trailing slashes so endpoint paths can be appended.
    pub fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
        let trimmed = raw.trim();
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(ConfigError::InvalidServiceUrl {
                value: raw.to_string(),
            });
        }
        Ok(trimmed.trim_end_matches('/').to_string())
    }
}

impl Default for PredictionServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_RISK_API_BASE_URL.to_string(),
        }
    }
}

/// What-if simulation tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationConfig {
    /// Quiescence window after the last edit before a light request is issued.
    pub debounce: Duration,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidServiceUrl { value: String },
    InvalidDebounceWindow { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidServiceUrl { value } => write!(
                f,
                "RISK_API_BASE_URL must be an http(s) URL, got '{}'",
                value
            ),
            ConfigError::InvalidDebounceWindow { value } => write!(
                f,
                "SIMULATION_DEBOUNCE_MS must be a positive integer, got '{}'",
                value
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidServiceUrl { .. }
            | ConfigError::InvalidDebounceWindow { .. } => None,
        }
    }
}
