use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::num::NonZeroU64;
use std::time::Duration;

/// Completion threshold; the only required setting.
pub const TOTAL_REQUESTS: &str = "TOTAL_REQUESTS";
pub const AGGREGATOR_ADDR: &str = "AGGREGATOR_ADDR";
pub const REQUEST_TIMEOUT_SECS: &str = "REQUEST_TIMEOUT_SECS";
pub const SHUTDOWN_GRACE_SECS: &str = "SHUTDOWN_GRACE_SECS";

const DEFAULT_ADDR: SocketAddr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 8080));
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 5;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable is not set")]
    Missing(&'static str),
    #[error("invalid {var} value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Startup settings, read once from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub total_requests: NonZeroU64,
    pub bind_addr: SocketAddr,
    pub request_timeout: Duration,
    pub shutdown_grace: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Values are trimmed; an empty
    /// value counts as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        };

        let total = get(TOTAL_REQUESTS).ok_or(ConfigError::Missing(TOTAL_REQUESTS))?;
        let total_requests = parse_positive(TOTAL_REQUESTS, &total)?;

        let bind_addr = match get(AGGREGATOR_ADDR) {
            Some(raw) => raw.parse().map_err(|e: std::net::AddrParseError| {
                ConfigError::Invalid {
                    var: AGGREGATOR_ADDR,
                    value: raw.clone(),
                    reason: e.to_string(),
                }
            })?,
            None => DEFAULT_ADDR,
        };

        let request_timeout = seconds(
            REQUEST_TIMEOUT_SECS,
            get(REQUEST_TIMEOUT_SECS),
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?;
        let shutdown_grace = seconds(
            SHUTDOWN_GRACE_SECS,
            get(SHUTDOWN_GRACE_SECS),
            DEFAULT_SHUTDOWN_GRACE_SECS,
        )?;

        Ok(Self {
            total_requests,
            bind_addr,
            request_timeout,
            shutdown_grace,
        })
    }
}

fn parse_positive(var: &'static str, raw: &str) -> Result<NonZeroU64, ConfigError> {
    let invalid = |reason: &str| ConfigError::Invalid {
        var,
        value: raw.to_owned(),
        reason: reason.to_owned(),
    };

    // Parse signed first so "-5" reports as non-positive, not non-numeric.
    let n: i128 = raw.parse().map_err(|_| invalid("not an integer"))?;
    if n <= 0 {
        return Err(invalid("must be greater than zero"));
    }
    u64::try_from(n)
        .ok()
        .and_then(NonZeroU64::new)
        .ok_or_else(|| invalid("too large"))
}

fn seconds(
    var: &'static str,
    raw: Option<String>,
    default: u64,
) -> Result<Duration, ConfigError> {
    match raw {
        Some(raw) => Ok(Duration::from_secs(parse_positive(var, &raw)?.get())),
        None => Ok(Duration::from_secs(default)),
    }
}
