//! Metrics collection for observability
//!
//! Prometheus counters for the engine's operation surface. Counters are
//! registered on a per-instance registry so several engines can coexist
//! in one process (tests run many).
//!
//! # Metrics
//!
//! - `token_transfers_total` - Completed transfers
//! - `token_mints_total` - Mint operations
//! - `token_forced_settlements_total` - Enforcer-driven settlements
//! - `token_inactivations_total` - Accounts transitioned to inactive
//! - `token_storage_fee_units_total` - Storage fee units collected
//! - `token_inactive_fee_units_total` - Inactivity fee units collected
//! - `token_transfer_fee_units_total` - Transfer fee units collected

use prometheus::{IntCounter, Opts, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Completed transfers
    pub transfers_total: IntCounter,

    /// Mint operations
    pub mints_total: IntCounter,

    /// Enforcer-driven settlements
    pub forced_settlements_total: IntCounter,

    /// Accounts transitioned to inactive
    pub inactivations_total: IntCounter,

    /// Storage fee units collected
    pub storage_fee_units_total: IntCounter,

    /// Inactivity fee units collected
    pub inactive_fee_units_total: IntCounter,

    /// Transfer fee units collected
    pub transfer_fee_units_total: IntCounter,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let transfers_total = IntCounter::with_opts(Opts::new(
            "token_transfers_total",
            "Completed transfers",
        ))?;
        registry.register(Box::new(transfers_total.clone()))?;

        let mints_total =
            IntCounter::with_opts(Opts::new("token_mints_total", "Mint operations"))?;
        registry.register(Box::new(mints_total.clone()))?;

        let forced_settlements_total = IntCounter::with_opts(Opts::new(
            "token_forced_settlements_total",
            "Enforcer-driven settlements",
        ))?;
        registry.register(Box::new(forced_settlements_total.clone()))?;

        let inactivations_total = IntCounter::with_opts(Opts::new(
            "token_inactivations_total",
            "Accounts transitioned to inactive",
        ))?;
        registry.register(Box::new(inactivations_total.clone()))?;

        let storage_fee_units_total = IntCounter::with_opts(Opts::new(
            "token_storage_fee_units_total",
            "Storage fee units collected",
        ))?;
        registry.register(Box::new(storage_fee_units_total.clone()))?;

        let inactive_fee_units_total = IntCounter::with_opts(Opts::new(
            "token_inactive_fee_units_total",
            "Inactivity fee units collected",
        ))?;
        registry.register(Box::new(inactive_fee_units_total.clone()))?;

        let transfer_fee_units_total = IntCounter::with_opts(Opts::new(
            "token_transfer_fee_units_total",
            "Transfer fee units collected",
        ))?;
        registry.register(Box::new(transfer_fee_units_total.clone()))?;

        Ok(Self {
            transfers_total,
            mints_total,
            forced_settlements_total,
            inactivations_total,
            storage_fee_units_total,
            inactive_fee_units_total,
            transfer_fee_units_total,
            registry,
        })
    }

    /// Record the fees realized by one settlement
    pub fn record_settlement(&self, storage_fee: u64, inactive_fee: u64) {
        if storage_fee > 0 {
            self.storage_fee_units_total.inc_by(storage_fee);
        }
        if inactive_fee > 0 {
            self.inactive_fee_units_total.inc_by(inactive_fee);
        }
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics")
    }
}
