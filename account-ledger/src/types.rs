//! Core types for the account ledger
//!
//! Amounts are unsigned integers in the token's smallest unit (10⁻⁸ of a
//! whole token). All fee arithmetic widens to u128 and floors, so results
//! are bit-exact regardless of balance size.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::clock;

/// Smallest units per whole token (8 decimal places).
pub const UNITS_PER_TOKEN: u64 = 100_000_000;

/// Days of dormancy after which an account becomes eligible for
/// inactivation and storage fees stop accruing.
pub const INACTIVE_THRESHOLD_DAYS: u64 = 1095;

/// Annual storage fee, in basis points of the held balance.
pub const STORAGE_FEE_ANNUAL_BPS: u64 = 25;

/// Annual inactivity fee, in basis points of the inactivity snapshot.
pub const INACTIVE_FEE_ANNUAL_BPS: u64 = 50;

/// Annual floor on the inactivity fee, so dust accounts clear in bounded
/// time instead of accruing never-collectible residue.
pub const MIN_INACTIVE_FEE_PER_YEAR: u64 = UNITS_PER_TOKEN;

/// Hard ceiling on the transfer fee an owner may configure.
pub const MAX_TRANSFER_FEE_BPS: u64 = 10;

/// Fee prorating uses a fixed 365-day year.
pub const DAYS_PER_YEAR: u64 = 365;

/// Account address
///
/// An opaque identifier assigned by the execution substrate. The empty
/// string is reserved as the null address and is never a legal destination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(String);

impl Address {
    /// Create new address
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    /// The reserved null address
    pub fn null() -> Self {
        Self(String::new())
    }

    /// Whether this is the reserved null address
    pub fn is_null(&self) -> bool {
        self.0.is_empty()
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Activity state of an account
///
/// The inactivity snapshot lives inside the `Inactive` variant, so a
/// snapshot exists exactly when the account is inactive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountStatus {
    /// Normal state; storage fees accrue against the live balance
    Active,
    /// Dormancy past the threshold was detected and finalized
    Inactive {
        /// Balance frozen at the moment of inactivation; the basis for
        /// all inactivity-fee computation
        snapshot: u64,
        /// Inactivity fee already realized against this snapshot, so
        /// repeated partial settlements never double-charge
        fee_paid: u64,
    },
}

/// Per-address ledger record
///
/// Created lazily on first credit and never deleted; a drained account
/// keeps its clocks so future fee computation stays meaningful.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Balance in smallest units
    pub balance: u64,

    /// Baseline for storage-fee accrual; `None` until the first credit.
    /// Rebased only when a storage fee is actually realized, on
    /// reactivation, or by the dust-reset rule.
    pub storage_fee_paid_at: Option<DateTime<Utc>>,

    /// Grace-period days captured when this account's clock was last
    /// established. Deliberately decoupled from the live global setting.
    pub grace_days: u64,

    /// Last operation this address itself authorized (send or approve).
    /// Passive receipt does not update it.
    pub last_activity_at: Option<DateTime<Utc>>,

    /// Active / inactive state
    pub status: AccountStatus,

    /// Exempt addresses accrue no storage or inactivity fees and cannot
    /// be marked inactive
    pub fee_exempt: bool,
}

impl Default for Account {
    fn default() -> Self {
        Self {
            balance: 0,
            storage_fee_paid_at: None,
            grace_days: 0,
            last_activity_at: None,
            status: AccountStatus::Active,
            fee_exempt: false,
        }
    }
}

impl Account {
    /// Whether the account is in the inactive state
    pub fn is_inactive(&self) -> bool {
        matches!(self.status, AccountStatus::Inactive { .. })
    }

    /// Whole days since the last self-authorized operation
    pub fn days_since_activity(&self, now: DateTime<Utc>) -> u64 {
        match self.last_activity_at {
            Some(at) => clock::days_between(at, now),
            None => 0,
        }
    }

    /// Whole days since the storage clock was last established, before
    /// any grace adjustment. Zero while inactive or never credited.
    pub fn days_since_paid_storage_fee(&self, now: DateTime<Utc>) -> u64 {
        if self.is_inactive() {
            return 0;
        }
        match self.storage_fee_paid_at {
            Some(at) => clock::days_between(at, now),
            None => 0,
        }
    }

    /// Days the storage fee actually charges for: raw days since the
    /// clock, less the grace window captured on this account.
    pub fn chargeable_storage_days(&self, now: DateTime<Utc>) -> u64 {
        self.days_since_paid_storage_fee(now)
            .saturating_sub(self.grace_days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(day: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(day * 86_400, 0).unwrap()
    }

    #[test]
    fn test_null_address() {
        assert!(Address::null().is_null());
        assert!(!Address::new("vault-1").is_null());
    }

    #[test]
    fn test_fresh_account_has_no_clocks() {
        let account = Account::default();
        assert_eq!(account.days_since_activity(ts(100)), 0);
        assert_eq!(account.days_since_paid_storage_fee(ts(100)), 0);
        assert!(!account.is_inactive());
    }

    #[test]
    fn test_chargeable_days_respect_grace() {
        let account = Account {
            storage_fee_paid_at: Some(ts(0)),
            grace_days: 30,
            ..Account::default()
        };
        assert_eq!(account.chargeable_storage_days(ts(20)), 0);
        assert_eq!(account.chargeable_storage_days(ts(30)), 0);
        assert_eq!(account.chargeable_storage_days(ts(45)), 15);
    }

    #[test]
    fn test_inactive_account_reports_zero_storage_days() {
        let account = Account {
            storage_fee_paid_at: Some(ts(0)),
            status: AccountStatus::Inactive {
                snapshot: 500,
                fee_paid: 0,
            },
            ..Account::default()
        };
        assert_eq!(account.days_since_paid_storage_fee(ts(400)), 0);
    }
}
