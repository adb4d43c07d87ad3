use std::{sync::Arc, time::Duration};

use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{
    arbitrage::{
        calculator::{DefaultRateCalculator, RateCalculator},
        detector::{DefaultSpreadDetector, SpreadDetector},
    },
    sync::state::ReserveSource,
    types::{BotError, PoolSnapshots, RateReport, Result, SpreadOpportunity},
    utils::config::Config,
};

/// Answers rate queries from the latest published reserves. Holds no
/// mutable state, so any number of callers may query concurrently.
pub struct RateEngine {
    source: Arc<dyn ReserveSource>,
    calculator: Box<dyn RateCalculator>,
    detector: Box<dyn SpreadDetector>,
    max_snapshot_age_ms: u64,
    report_interval: Duration,
}

impl RateEngine {
    /// Latest snapshot per exchange, with stale snapshots treated as missing
    pub fn collect_snapshots(&self) -> PoolSnapshots {
        let mut snapshots = self.source.snapshots();
        for (dex_id, snapshot) in snapshots.iter_mut() {
            let stale_age = snapshot
                .as_ref()
                .filter(|reserves| reserves.is_stale(self.max_snapshot_age_ms))
                .map(|reserves| reserves.age_ms());
            if let Some(age_ms) = stale_age {
                warn!("{} reserves are {}ms old, not quoting", dex_id, age_ms);
                *snapshot = None;
            }
        }
        snapshots
    }

    pub fn current_report(&self) -> Result<RateReport> {
        self.calculator.compute_rates(&self.collect_snapshots())
    }

    /// Query surface: the report when at least one exchange is quotable
    pub fn query(&self) -> Result<RateReport> {
        let report = self.current_report()?;
        if report.all_failed() {
            return Err(BotError::AllUnquotable(report.summary()));
        }
        Ok(report)
    }

    /// Query surface payload, `{ "<EXCHANGE>": { "sell": .., "buy": .. }, .. }`
    pub fn report_json(&self) -> Result<Value> {
        Ok(serde_json::to_value(self.query()?)?)
    }

    pub fn opportunities(&self, report: &RateReport) -> Vec<SpreadOpportunity> {
        self.detector.find_opportunities(report)
    }

    /// Log rates and spreads periodically until shutdown
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        info!("Starting rate engine, reporting every {:?}", self.report_interval);
        let mut ticker = tokio::time::interval(self.report_interval);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => self.report_once(),
            }
        }

        info!("Rate engine stopped");
        Ok(())
    }

    fn report_once(&self) {
        match self.query() {
            Ok(report) => {
                info!("Rates: {}", report.summary());
                let opportunities = self.opportunities(&report);
                if opportunities.is_empty() {
                    debug!("No spread above threshold");
                }
                for opportunity in opportunities {
                    info!("Spread opportunity: {}", opportunity.summary());
                }
            }
            Err(e) => warn!("Rates unavailable: {}", e),
        }
    }
}

pub struct RateEngineBuilder {
    source: Option<Arc<dyn ReserveSource>>,
    calculator: Option<Box<dyn RateCalculator>>,
    detector: Option<Box<dyn SpreadDetector>>,
    max_snapshot_age_ms: u64,
    report_interval: Duration,
}

impl RateEngineBuilder {
    pub fn new() -> Self {
        Self {
            source: None,
            calculator: None,
            detector: None,
            max_snapshot_age_ms: 0,
            report_interval: Duration::from_secs(10),
        }
    }

    /// Calculator, detector and timings as described by `config`
    pub fn from_config(config: &Config) -> Self {
        let calculator = config.network.pools.iter().fold(
            DefaultRateCalculator::new(config.tokens.clone(), config.trade.clone()),
            |calculator, pool| calculator.with_fee(pool.dex, config.fee_for(pool.dex)),
        );

        Self::new()
            .with_calculator(Box::new(calculator))
            .with_detector(Box::new(DefaultSpreadDetector::new(config.arbitrage.clone())))
            .with_max_snapshot_age_ms(config.sync.max_snapshot_age_ms)
            .with_report_interval(config.arbitrage.report_interval())
    }

    pub fn with_source(mut self, source: Arc<dyn ReserveSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_calculator(mut self, calculator: Box<dyn RateCalculator>) -> Self {
        self.calculator = Some(calculator);
        self
    }

    pub fn with_detector(mut self, detector: Box<dyn SpreadDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    pub fn with_max_snapshot_age_ms(mut self, max_age_ms: u64) -> Self {
        self.max_snapshot_age_ms = max_age_ms;
        self
    }

    pub fn with_report_interval(mut self, interval: Duration) -> Self {
        self.report_interval = interval;
        self
    }

    pub fn build(self) -> Result<RateEngine> {
        let source = self
            .source
            .ok_or_else(|| BotError::Config("Reserve source is required".to_string()))?;
        let calculator = self
            .calculator
            .ok_or_else(|| BotError::Config("Rate calculator is required".to_string()))?;
        let detector = self
            .detector
            .ok_or_else(|| BotError::Config("Spread detector is required".to_string()))?;

        if self.report_interval.is_zero() {
            return Err(BotError::Config("Report interval must be positive".to_string()));
        }

        Ok(RateEngine {
            source,
            calculator,
            detector,
            max_snapshot_age_ms: self.max_snapshot_age_ms,
            report_interval: self.report_interval,
        })
    }
}

impl Default for RateEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
