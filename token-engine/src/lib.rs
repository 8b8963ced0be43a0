//! Auric Token Engine
//!
//! Supply and routing controller for a reserve-backed token: enforces
//! treasury transfer-flow rules, bounds minting by an external reserve
//! oracle, and exposes the transfer / settlement / simulation surface on
//! top of the account ledger.
//!
//! # Architecture
//!
//! Every externally visible mutating operation is intercepted here:
//!
//! 1. **Route check**: treasury flow legality, null/self-address rejection
//! 2. **Settle**: fees on all affected accounts, projected as a pure plan
//! 3. **Re-check**: post-settlement balance, supply cap, oracle bound
//! 4. **Commit**: the whole plan or nothing
//!
//! Simulation and execution consume the same planner, so a simulated
//! transfer is guaranteed to match the real one at the same instant.
//!
//! # Example
//!
//! ```
//! use token_engine::{Config, SharedVault, TokenEngine};
//! use chrono::{TimeZone, Utc};
//!
//! let vault = SharedVault::new();
//! vault.lock(1_000_000 * account_ledger::UNITS_PER_TOKEN).unwrap();
//!
//! let config = Config::default();
//! vault.bind_consumer(config.roles.engine_address.clone()).unwrap();
//! let mut engine = TokenEngine::new(config, vault.clone()).unwrap();
//!
//! let now = Utc.timestamp_opt(0, 0).unwrap();
//! let owner = engine.roles().owner.clone();
//! engine.mint(&owner, 1_000 * account_ledger::UNITS_PER_TOKEN, now).unwrap();
//! assert!(engine.check_conservation());
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod oracle;
pub mod routing;

// Re-exports
pub use config::{Config, RoleConfig};
pub use engine::{MintReceipt, SettlementReceipt, TokenEngine, TransferReceipt, TransferSimulation};
pub use error::{Error, Result};
pub use metrics::Metrics;
pub use oracle::{ReserveOracle, ReserveVault, SharedVault};
pub use routing::Roles;
