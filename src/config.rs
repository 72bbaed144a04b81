use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::packer::{PackingConfig, Strategy};

/// Complete application configuration, loaded from environment variables or default values.
#[derive(Clone, Debug, Default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub packer: PackerConfig,
    pub remote: RemoteConfig,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig::from_env(),
            packer: PackerConfig::from_env(),
            remote: RemoteConfig::from_env(),
        }
    }
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    bind_ip: IpAddr,
    display_host: String,
    port: u16,
}

impl ApiConfig {
    const DEFAULT_HOST: &'static str = "0.0.0.0";
    const DEFAULT_PORT: u16 = 8080;
    const HOST_VAR: &'static str = "FREIGHT_FIT_API_HOST";
    const PORT_VAR: &'static str = "FREIGHT_FIT_API_PORT";

    fn from_env() -> Self {
        let host_value =
            env_string(Self::HOST_VAR).unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let (bind_ip, effective_host) = match host_value.parse::<IpAddr>() {
            Ok(ip) => (ip, host_value),
            Err(err) => {
                warn!(
                    "Could not parse {} ('{}'): {}. Using {}.",
                    Self::HOST_VAR,
                    host_value,
                    err,
                    Self::DEFAULT_HOST
                );
                (
                    IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                    Self::DEFAULT_HOST.to_string(),
                )
            }
        };

        let port = match env_string(Self::PORT_VAR) {
            Some(raw) => parse_port(&raw).unwrap_or(Self::DEFAULT_PORT),
            None => Self::DEFAULT_PORT,
        };

        Self {
            bind_ip,
            display_host: effective_host,
            port,
        }
    }

    /// Socket address to bind the server to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    /// Visible hostname for logging and hints.
    pub fn display_host(&self) -> &str {
        &self.display_host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Indicates whether binding to all interfaces.
    pub fn binds_to_all_interfaces(&self) -> bool {
        match self.bind_ip {
            IpAddr::V4(addr) => addr == Ipv4Addr::UNSPECIFIED,
            IpAddr::V6(addr) => addr == Ipv6Addr::UNSPECIFIED,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            display_host: Self::DEFAULT_HOST.to_string(),
            port: Self::DEFAULT_PORT,
        }
    }
}

/// Strategy selection and tunables of the placement engine.
#[derive(Clone, Debug, Default)]
pub struct PackerConfig {
    default_strategy: Strategy,
    packing: PackingConfig,
}

impl PackerConfig {
    const STRATEGY_VAR: &'static str = "FREIGHT_FIT_DEFAULT_STRATEGY";
    const GRID_SUPPORT_VAR: &'static str = "FREIGHT_FIT_GRID_SUPPORT_RATIO";
    const ADJACENCY_SUPPORT_VAR: &'static str = "FREIGHT_FIT_ADJACENCY_SUPPORT_RATIO";
    const MIN_STEP_VAR: &'static str = "FREIGHT_FIT_MIN_FALLBACK_STEP";
    const MAX_POSITIONS_VAR: &'static str = "FREIGHT_FIT_MAX_FALLBACK_POSITIONS";

    fn from_env() -> Self {
        let default_strategy = env_string(Self::STRATEGY_VAR)
            .and_then(|raw| parse_strategy(&raw, Self::STRATEGY_VAR))
            .unwrap_or_default();

        let grid_support_ratio = load_f64_with_warning(
            Self::GRID_SUPPORT_VAR,
            PackingConfig::DEFAULT_GRID_SUPPORT_RATIO,
            valid_support_ratio,
            SUPPORT_RATIO_HINT,
            "Adjusted grid support may lead to unstable stacks",
        );

        let adjacency_support_ratio = load_f64_with_warning(
            Self::ADJACENCY_SUPPORT_VAR,
            PackingConfig::DEFAULT_ADJACENCY_SUPPORT_RATIO,
            valid_support_ratio,
            SUPPORT_RATIO_HINT,
            "Adjusted adjacency support may lead to unstable stacks",
        );

        let min_fallback_step = load_f64_with_warning(
            Self::MIN_STEP_VAR,
            PackingConfig::DEFAULT_MIN_FALLBACK_STEP,
            |value| value > 0.0,
            "must be greater than 0",
            "Adjusted fallback step changes search granularity and runtime",
        );

        let max_fallback_positions = env_string(Self::MAX_POSITIONS_VAR)
            .and_then(|raw| parse_positive_usize(&raw, Self::MAX_POSITIONS_VAR))
            .unwrap_or(PackingConfig::DEFAULT_MAX_FALLBACK_POSITIONS);

        let packing = PackingConfig::builder()
            .grid_support_ratio(grid_support_ratio)
            .adjacency_support_ratio(adjacency_support_ratio)
            .min_fallback_step(min_fallback_step)
            .max_fallback_positions(max_fallback_positions)
            .build();

        Self {
            default_strategy,
            packing,
        }
    }

    pub fn with_default_strategy(mut self, strategy: Strategy) -> Self {
        self.default_strategy = strategy;
        self
    }

    /// Strategy used when a request names none.
    pub fn default_strategy(&self) -> Strategy {
        self.default_strategy
    }

    pub fn packing_config(&self) -> PackingConfig {
        self.packing
    }
}

/// Optional remote fitting service.
#[derive(Clone, Debug)]
pub struct RemoteConfig {
    url: Option<String>,
    timeout: Duration,
}

impl RemoteConfig {
    const DEFAULT_TIMEOUT_SECS: u64 = 10;
    const URL_VAR: &'static str = "FREIGHT_FIT_REMOTE_URL";
    const TIMEOUT_VAR: &'static str = "FREIGHT_FIT_REMOTE_TIMEOUT_SECS";

    fn from_env() -> Self {
        let timeout_secs = env_string(Self::TIMEOUT_VAR)
            .and_then(|raw| parse_positive_usize(&raw, Self::TIMEOUT_VAR))
            .map(|secs| secs as u64)
            .unwrap_or(Self::DEFAULT_TIMEOUT_SECS);

        Self {
            url: env_string(Self::URL_VAR),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// Service endpoint; `None` disables remote fitting.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
        }
    }
}

const SUPPORT_RATIO_HINT: &str = "must be between 0.5 and 1";

/// Accepted range for the support-ratio variables.
fn valid_support_ratio(value: f64) -> bool {
    (0.5..=1.0).contains(&value)
}

fn env_string(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_owned())
            }
        }
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            warn!("Access to {} failed: {}. Using default value.", name, err);
            None
        }
    }
}

fn parse_port(raw: &str) -> Option<u16> {
    match raw.parse::<u16>() {
        Ok(0) => {
            warn!("{} must not be 0. Using default.", ApiConfig::PORT_VAR);
            None
        }
        Ok(value) => Some(value),
        Err(err) => {
            warn!(
                "Could not parse {} ('{}'): {}. Using default.",
                ApiConfig::PORT_VAR,
                raw,
                err
            );
            None
        }
    }
}

fn parse_strategy(raw: &str, var_name: &str) -> Option<Strategy> {
    match Strategy::from_str(raw) {
        Ok(strategy) => Some(strategy),
        Err(err) => {
            warn!("{} ('{}'): {}. Using default strategy.", var_name, raw, err);
            None
        }
    }
}

fn parse_positive_usize(raw: &str, var_name: &str) -> Option<usize> {
    match raw.trim().replace('_', "").parse::<usize>() {
        Ok(0) => {
            warn!("{} must be greater than 0. Using default value.", var_name);
            None
        }
        Ok(value) => Some(value),
        Err(err) => {
            warn!(
                "Could not parse {} ('{}') as integer: {}. Using default value.",
                var_name, raw, err
            );
            None
        }
    }
}

fn load_f64_with_warning(
    var_name: &str,
    default: f64,
    validator: impl Fn(f64) -> bool,
    invalid_hint: &str,
    warning: &str,
) -> f64 {
    match env_string(var_name) {
        Some(raw) => parse_f64_with_warning(&raw, var_name, default, validator, invalid_hint, warning),
        None => default,
    }
}

fn parse_f64_with_warning(
    raw: &str,
    var_name: &str,
    default: f64,
    validator: impl Fn(f64) -> bool,
    invalid_hint: &str,
    warning: &str,
) -> f64 {
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() && validator(value) => {
            let tolerance = (default.abs().max(1.0)) * 1e-9;
            if (value - default).abs() > tolerance {
                warn!("{} ({} = {}).", warning, var_name, value);
            }
            value
        }
        Ok(_) => {
            warn!(
                "{} contains invalid value '{}': {}. Using {}.",
                var_name, raw, invalid_hint, default
            );
            default
        }
        Err(err) => {
            warn!(
                "Could not parse {} ('{}') as number: {}. Using {}.",
                var_name, raw, err, default
            );
            default
        }
    }
}
