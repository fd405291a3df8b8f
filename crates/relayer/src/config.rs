//! Configuration types and validation for the relayer.

use std::time::Duration;

use alloy_primitives::{Address, U256};
use backon::ExponentialBuilder;
use thiserror::Error;
use url::Url;
use vote_relay_verifier::SlotLayout;

/// Default number of RPC retry attempts.
const DEFAULT_RPC_MAX_RETRIES: u32 = 5;
/// Default initial delay for exponential backoff.
const DEFAULT_RETRY_INITIAL_DELAY: Duration = Duration::from_millis(100);
/// Default maximum delay between retries.
const DEFAULT_RETRY_MAX_DELAY: Duration = Duration::from_secs(10);
/// Default per-request RPC timeout.
const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(30);
/// Default bound on concurrent per-voter proof verifications.
const DEFAULT_CONCURRENCY: usize = 16;

/// Errors that can occur during configuration validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid URL format.
    #[error("invalid {field} URL: {reason}")]
    InvalidUrl {
        /// The field name that contains the invalid URL.
        field: &'static str,
        /// The reason the URL is invalid.
        reason: String,
    },
    /// A field value is out of the allowed range.
    #[error("{field} must be {constraint}, got {value}")]
    OutOfRange {
        /// The field name that is out of range.
        field: &'static str,
        /// The constraint description.
        constraint: &'static str,
        /// The actual value.
        value: String,
    },
}

/// Validate that a URL has a scheme and host.
pub fn validate_url(url: &Url, field: &'static str) -> Result<(), ConfigError> {
    if url.scheme().is_empty() {
        return Err(ConfigError::InvalidUrl { field, reason: "missing scheme".to_string() });
    }

    if url.host().is_none() {
        return Err(ConfigError::InvalidUrl { field, reason: "missing host".to_string() });
    }

    Ok(())
}

/// Validated RPC retry configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts.
    pub max_attempts: u32,
    /// Initial delay for exponential backoff.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RPC_MAX_RETRIES,
            initial_delay: DEFAULT_RETRY_INITIAL_DELAY,
            max_delay: DEFAULT_RETRY_MAX_DELAY,
        }
    }
}

impl RetryConfig {
    /// Creates a `backon` [`ExponentialBuilder`] from this configuration.
    pub fn to_backoff_builder(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.initial_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_attempts as usize)
            .with_jitter()
    }
}

/// Validated relay configuration for one (token, destination) deployment.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address of the governance token on the source chain.
    pub token: Address,
    /// Address of the destination voting machine contract.
    pub voting_machine: Address,
    /// Balance-mapping layout of the token contract.
    pub slot_layout: SlotLayout,
    /// Explicit gas cap forwarded with relay submissions; never inferred.
    pub gas_budget: u64,
    /// Value attached to relay submissions (relay fee).
    pub relay_value: U256,
    /// Upper bound on the attached value.
    pub value_budget: U256,
    /// Bound on concurrent per-voter proof verifications.
    pub concurrency: usize,
    /// Timeout applied to every external call.
    pub rpc_timeout: Duration,
    /// RPC retry configuration.
    pub retry: RetryConfig,
}

impl RelayConfig {
    /// Creates a relay configuration with defaults for the ambient knobs.
    pub fn new(token: Address, voting_machine: Address, slot_layout: SlotLayout) -> Self {
        Self {
            token,
            voting_machine,
            slot_layout,
            gas_budget: 1_000_000,
            relay_value: U256::ZERO,
            value_budget: U256::ZERO,
            concurrency: DEFAULT_CONCURRENCY,
            rpc_timeout: DEFAULT_RPC_TIMEOUT,
            retry: RetryConfig::default(),
        }
    }

    /// Sets the gas budget forwarded with relay submissions.
    pub const fn with_gas_budget(mut self, gas_budget: u64) -> Self {
        self.gas_budget = gas_budget;
        self
    }

    /// Sets the attached relay value and its budget.
    pub const fn with_value(mut self, relay_value: U256, value_budget: U256) -> Self {
        self.relay_value = relay_value;
        self.value_budget = value_budget;
        self
    }

    /// Sets the per-voter verification concurrency bound.
    pub const fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Sets the timeout applied to external calls.
    pub const fn with_rpc_timeout(mut self, rpc_timeout: Duration) -> Self {
        self.rpc_timeout = rpc_timeout;
        self
    }

    /// Sets the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::OutOfRange {
                field: "concurrency",
                constraint: "greater than 0",
                value: self.concurrency.to_string(),
            });
        }
        if self.gas_budget == 0 {
            return Err(ConfigError::OutOfRange {
                field: "gas-budget",
                constraint: "greater than 0",
                value: self.gas_budget.to_string(),
            });
        }
        if self.rpc_timeout.is_zero() {
            return Err(ConfigError::OutOfRange {
                field: "rpc-timeout",
                constraint: "greater than 0",
                value: format!("{:?}", self.rpc_timeout),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> RelayConfig {
        RelayConfig::new(
            Address::repeat_byte(0x70),
            Address::repeat_byte(0xd0),
            SlotLayout::solidity(U256::ZERO),
        )
    }

    #[test]
    fn test_defaults_validate() {
        sample_config().validate().unwrap();
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let config = sample_config().with_concurrency(0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { field: "concurrency", .. })
        ));
    }

    #[test]
    fn test_zero_gas_budget_rejected() {
        let config = sample_config().with_gas_budget(0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { field: "gas-budget", .. })
        ));
    }

    #[test]
    fn test_builder_setters() {
        let config = sample_config()
            .with_gas_budget(500_000)
            .with_value(U256::from(1u64), U256::from(2u64))
            .with_rpc_timeout(Duration::from_secs(60));
        assert_eq!(config.gas_budget, 500_000);
        assert_eq!(config.relay_value, U256::from(1u64));
        assert_eq!(config.value_budget, U256::from(2u64));
        assert_eq!(config.rpc_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_url_without_host() {
        let url = Url::parse("file:///some/path").unwrap();
        let result = validate_url(&url, "source-rpc");
        assert!(matches!(result, Err(ConfigError::InvalidUrl { field: "source-rpc", .. })));
    }

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.initial_delay, Duration::from_millis(100));
        assert_eq!(config.max_delay, Duration::from_secs(10));
    }
}
