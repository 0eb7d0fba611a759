use std::env;
use std::fmt;

const DEFAULT_EXPIRY_NOTICE_DAYS: u32 = 30;
const DEFAULT_LICENSE_ID_ATTEMPTS: u32 = 3;

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
    pub licensing: LicensingConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let expiry_notice_days =
            read_number("LICENSE_EXPIRY_NOTICE_DAYS", DEFAULT_EXPIRY_NOTICE_DAYS)?;
        let license_id_attempts =
            read_number("LICENSE_ID_MAX_ATTEMPTS", DEFAULT_LICENSE_ID_ATTEMPTS)?;
        if license_id_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            licensing: LicensingConfig {
                expiry_notice_days,
                license_id_attempts,
            },
            telemetry: TelemetryConfig {
                log_level,
                ansi: environment == AppEnvironment::Development,
            },
        })
    }
}

fn read_number(var: &'static str, default: u32) -> Result<u32, ConfigError> {
    match env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse::<u32>()
            .map_err(|_| ConfigError::InvalidNumber { var }),
        Err(_) => Ok(default),
    }
}

/// Knobs for the application lifecycle engine and the expiry scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LicensingConfig {
    pub expiry_notice_days: u32,
    pub license_id_attempts: u32,
}

impl Default for LicensingConfig {
    fn default() -> Self {
        Self {
            expiry_notice_days: DEFAULT_EXPIRY_NOTICE_DAYS,
            license_id_attempts: DEFAULT_LICENSE_ID_ATTEMPTS,
        }
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Bare level applied to the licensing crates, or a full `EnvFilter` directive.
    pub log_level: String,
    /// Colour and event targets for local terminals; off outside development.
    pub ansi: bool,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidNumber { var: &'static str },
    ZeroAttempts,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidNumber { var } => {
                write!(f, "{var} must be a non-negative whole number")
            }
            ConfigError::ZeroAttempts => {
                write!(f, "LICENSE_ID_MAX_ATTEMPTS must be at least 1")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
