use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use chrono::{NaiveDate, Weekday};

use crate::readiness::compliance::DEFAULT_TREND_MONTHS;
use crate::readiness::escalation::{
    EscalationPolicy, DEFAULT_LOOKBACK_MONTHS, DEFAULT_LOW_SCORE_THRESHOLD,
};
use crate::readiness::events::DEFAULT_COPY_FORWARD_DAYS;
use crate::readiness::report::ReportSettings;
use crate::readiness::rotation::{ParityRule, RotationSettings, WeekParity};

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

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub readiness: ReadinessConfig,
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
        let readiness = ReadinessConfig::from_lookup(|key| env::var(key).ok())?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            readiness,
        })
    }
}

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

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Unit-specific dials for the readiness engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadinessConfig {
    pub low_score_threshold: u8,
    pub lookback_months: usize,
    pub trend_months: usize,
    pub week_start: Weekday,
    pub entry_days: (Weekday, Weekday),
    pub week_a_parity: WeekParity,
    /// When set, weeks alternate strictly from this date instead of following ISO parity.
    pub rotation_anchor: Option<NaiveDate>,
    pub copy_forward_days: i64,
    pub sticky_suspension: bool,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            low_score_threshold: DEFAULT_LOW_SCORE_THRESHOLD,
            lookback_months: DEFAULT_LOOKBACK_MONTHS,
            trend_months: DEFAULT_TREND_MONTHS,
            week_start: Weekday::Sun,
            entry_days: (Weekday::Sun, Weekday::Mon),
            week_a_parity: WeekParity::Even,
            rotation_anchor: None,
            copy_forward_days: DEFAULT_COPY_FORWARD_DAYS,
            sticky_suspension: true,
        }
    }
}

impl ReadinessConfig {
    /// Build from `READINESS_*` keys; missing keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let read = |key: &'static str| lookup(key).map(|value| (key, value.trim().to_string()));

        let low_score_threshold = match read("READINESS_LOW_SCORE_THRESHOLD") {
            Some((key, value)) => match value.parse::<u8>() {
                Ok(threshold) if threshold <= 100 => threshold,
                _ => return Err(ConfigError::invalid(key, value)),
            },
            None => defaults.low_score_threshold,
        };
        let lookback_months = parse_positive(read("READINESS_SCORE_LOOKBACK_MONTHS"))?
            .unwrap_or(defaults.lookback_months);
        let trend_months =
            parse_positive(read("READINESS_TREND_MONTHS"))?.unwrap_or(defaults.trend_months);

        let week_start = match read("READINESS_WEEK_START") {
            Some((key, value)) => parse_weekday(key, &value)?,
            None => defaults.week_start,
        };
        let entry_days = match read("READINESS_ENTRY_DAYS") {
            Some((key, value)) => {
                let days: Vec<&str> = value.split(',').map(str::trim).collect();
                match days.as_slice() {
                    [first, second] => (parse_weekday(key, first)?, parse_weekday(key, second)?),
                    _ => return Err(ConfigError::invalid(key, value)),
                }
            }
            None => defaults.entry_days,
        };
        let week_a_parity = match read("READINESS_WEEK_A_PARITY") {
            Some((key, value)) => match value.to_ascii_lowercase().as_str() {
                "even" => WeekParity::Even,
                "odd" => WeekParity::Odd,
                _ => return Err(ConfigError::invalid(key, value)),
            },
            None => defaults.week_a_parity,
        };
        let rotation_anchor = match read("READINESS_ROTATION_ANCHOR") {
            Some((_, value)) if value.is_empty() => None,
            Some((key, value)) => Some(
                NaiveDate::parse_from_str(&value, "%Y-%m-%d")
                    .map_err(|_| ConfigError::invalid(key, value))?,
            ),
            None => None,
        };
        let copy_forward_days = match read("READINESS_COPY_FORWARD_DAYS") {
            Some((key, value)) => match value.parse::<i64>() {
                Ok(days) if days > 0 => days,
                _ => return Err(ConfigError::invalid(key, value)),
            },
            None => defaults.copy_forward_days,
        };
        let sticky_suspension = match read("READINESS_STICKY_SUSPENSION") {
            Some((key, value)) => match value.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                _ => return Err(ConfigError::invalid(key, value)),
            },
            None => defaults.sticky_suspension,
        };

        Ok(Self {
            low_score_threshold,
            lookback_months,
            trend_months,
            week_start,
            entry_days,
            week_a_parity,
            rotation_anchor,
            copy_forward_days,
            sticky_suspension,
        })
    }

    pub fn rotation_settings(&self) -> RotationSettings {
        let parity = match self.rotation_anchor {
            Some(anchor) => ParityRule::Anchored { anchor },
            None => ParityRule::IsoWeek {
                week_a: self.week_a_parity,
            },
        };
        RotationSettings {
            week_start: self.week_start,
            first_entry: self.entry_days.0,
            second_entry: self.entry_days.1,
            parity,
        }
    }

    pub fn escalation_policy(&self) -> EscalationPolicy {
        EscalationPolicy {
            low_score_threshold: self.low_score_threshold,
            lookback_months: self.lookback_months,
            sticky_suspension: self.sticky_suspension,
        }
    }

    pub fn report_settings(&self) -> ReportSettings {
        ReportSettings {
            rotation: self.rotation_settings(),
            policy: self.escalation_policy(),
            trend_months: self.trend_months,
            ..ReportSettings::default()
        }
    }
}

fn parse_positive(entry: Option<(&'static str, String)>) -> Result<Option<usize>, ConfigError> {
    match entry {
        Some((key, value)) => match value.parse::<usize>() {
            Ok(count) if count > 0 => Ok(Some(count)),
            _ => Err(ConfigError::invalid(key, value)),
        },
        None => Ok(None),
    }
}

fn parse_weekday(key: &'static str, value: &str) -> Result<Weekday, ConfigError> {
    value
        .parse::<Weekday>()
        .map_err(|_| ConfigError::invalid(key, value))
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidSetting { key: &'static str, value: String },
}

impl ConfigError {
    fn invalid(key: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidSetting {
            key,
            value: value.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidSetting { key, value } => {
                write!(f, "{key} has an invalid value '{value}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidSetting { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
