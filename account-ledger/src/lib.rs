//! Auric Account Ledger
//!
//! Per-account balance and fee-clock state for a reserve-backed token, with
//! lazy fee settlement: nothing accrues in the background, every fee is a
//! pure function of `(stored_state, now)` realized at the moment an account
//! is touched.
//!
//! # Architecture
//!
//! - **Settle on touch**: no scheduler and no per-block bookkeeping; the
//!   settlement routine projects what an account owes and commits it
//!   atomically with the surrounding balance change
//! - **Single writer**: the execution substrate serializes all mutating
//!   operations, so the ledger itself carries no locking
//! - **Conservation**: fees move value to the collector account, never
//!   destroy it; the sum of balances always equals total supply
//!
//! # Invariants
//!
//! - Σ(balances) == total supply at every observation point
//! - An inactivity snapshot exists if and only if the account is inactive
//! - Fees never exceed the balance they are charged against
//! - Settlement at an unchanged timestamp is idempotent

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod clock;
pub mod config;
pub mod error;
pub mod fees;
pub mod ledger;
pub mod types;

// Re-exports
pub use config::FeeConfig;
pub use error::{Error, Result};
pub use ledger::{Ledger, Settlement};
pub use types::{Account, AccountStatus, Address, UNITS_PER_TOKEN};
