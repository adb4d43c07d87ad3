use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

use crate::types::{BotError, DexId, Result, TokenInfo, TokenPair};
use crate::utils::fixed_point::{DEFAULT_PRECISION, MAX_PRECISION};
use crate::utils::math::DEFAULT_FEE_PERCENT;

/// Prefix of environment overrides, eg `RATE_MONITOR__NETWORK__RPC_URL`
pub const ENV_PREFIX: &str = "RATE_MONITOR";

/// Process configuration, loaded once at startup and passed by value into
/// every component
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Network settings
    pub network: NetworkConfig,

    /// The token pair quoted on every pool
    pub tokens: TokenPair,

    /// Trade sizes and fees used for quoting
    pub trade: TradeConfig,

    /// Reserve feed settings
    pub sync: SyncConfig,

    /// Spread detection settings
    pub arbitrage: ArbitrageConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub rpc_url: String,
    pub ws_url: String,
    pub pools: Vec<PoolConfig>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://polygon-rpc.com".into(),
            ws_url: "wss://polygon-bor-rpc.publicnode.com".into(),
            pools: vec![],
        }
    }
}

/// One constant-product pair contract
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    pub dex: DexId,
    pub address: String,
    /// Whether the pair's token0 is the configured token A
    #[serde(default = "default_true")]
    pub token_a_is_token0: bool,
    /// Overrides the global fee for this exchange
    #[serde(default)]
    pub fee_percent: Option<Decimal>,
}

fn default_true() -> bool {
    true
}

impl Default for TokenPair {
    fn default() -> Self {
        Self::new(TokenInfo::new("JPYC", 18), TokenInfo::new("USDC", 6))
    }
}

/// Quoting parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TradeConfig {
    /// Amount of token A sold for the sell rate
    pub trade_size_token_a: Decimal,
    /// Amount of token B sold for the buy rate
    pub trade_size_token_b: Decimal,
    /// Fee in percent, 0.3 means 0.3%
    pub fee_percent: Decimal,
    /// Fractional digits kept when converting reserves
    pub precision: u32,
}

impl Default for TradeConfig {
    fn default() -> Self {
        Self {
            trade_size_token_a: Decimal::from(10000),
            trade_size_token_b: Decimal::from(100),
            fee_percent: DEFAULT_FEE_PERCENT,
            precision: DEFAULT_PRECISION,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    /// Full reserve poll interval, a fallback for missed events
    pub poll_interval_ms: u64,
    pub reconnect_delay_ms: u64,
    /// Snapshots older than this are not quoted; 0 disables the check
    pub max_snapshot_age_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 500,
            poll_interval_ms: 30_000,
            reconnect_delay_ms: 5_000,
            max_snapshot_age_ms: 0,
        }
    }
}

impl SyncConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArbitrageConfig {
    /// Minimum round-trip gain, in percent, worth reporting
    pub min_profit_percent: Decimal,
    pub report_interval_ms: u64,
}

impl Default for ArbitrageConfig {
    fn default() -> Self {
        Self {
            min_profit_percent: Decimal::from_parts(5, 0, 0, false, 1),
            report_interval_ms: 10_000,
        }
    }
}

impl ArbitrageConfig {
    pub fn report_interval(&self) -> Duration {
        Duration::from_millis(self.report_interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".into() }
    }
}

impl Config {
    pub fn network_config(&self) -> &NetworkConfig {
        &self.network
    }

    pub fn sync_config(&self) -> &SyncConfig {
        &self.sync
    }

    /// Load `config.toml` from the working directory when present, then
    /// apply environment overrides
    pub fn load() -> Result<Self> {
        Self::load_from("config")
    }

    pub fn load_from(path: &str) -> Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::with_name(path).required(false))
            .add_source(::config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| BotError::Config(e.to_string()))
    }

    pub fn pool(&self, dex: DexId) -> Option<&PoolConfig> {
        self.network.pools.iter().find(|p| p.dex == dex)
    }

    /// Fee charged by `dex`, falling back to the global fee
    pub fn fee_for(&self, dex: DexId) -> Decimal {
        self.pool(dex)
            .and_then(|p| p.fee_percent)
            .unwrap_or(self.trade.fee_percent)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.network.rpc_url.is_empty() {
            return Err(BotError::Config("RPC url is required".into()));
        }

        if self.network.pools.is_empty() {
            return Err(BotError::Config("No pools configured".into()));
        }

        let mut seen = HashSet::new();
        for pool in &self.network.pools {
            if !seen.insert(pool.dex) {
                return Err(BotError::Config(format!("Pool for {} configured twice", pool.dex)));
            }
            if pool.address.is_empty() {
                return Err(BotError::Config(format!("Pool address for {} is empty", pool.dex)));
            }
            if let Some(fee) = pool.fee_percent {
                validate_fee(fee, &format!("fee of {}", pool.dex))?;
            }
        }

        let precision = self.trade.precision;
        if precision > MAX_PRECISION {
            return Err(BotError::Config(format!(
                "Precision {} exceeds the maximum of {}",
                precision, MAX_PRECISION
            )));
        }
        for token in [&self.tokens.token_a, &self.tokens.token_b] {
            if u32::from(token.decimals) < precision {
                return Err(BotError::Config(format!(
                    "Token {} has {} decimals, fewer than the quoting precision {}",
                    token.symbol, token.decimals, precision
                )));
            }
        }

        if self.trade.trade_size_token_a <= Decimal::ZERO || self.trade.trade_size_token_b <= Decimal::ZERO {
            return Err(BotError::Config("Trade sizes must be positive".into()));
        }
        validate_fee(self.trade.fee_percent, "global fee")?;

        Ok(())
    }
}

fn validate_fee(fee: Decimal, what: &str) -> Result<()> {
    if fee < Decimal::ZERO || fee >= Decimal::ONE_HUNDRED {
        return Err(BotError::Config(format!("{} must be in [0, 100), got {}", what, fee)));
    }
    Ok(())
}
