//! Account book and settlement state machine
//!
//! This module ties the fee formulas to per-account state. Settlement is
//! split into a pure projection ([`Ledger::project_settlement`]) and a
//! commit ([`Ledger::apply_settlement`]): operations project first, run
//! their post-settlement checks, and only then mutate, so every failure
//! is an all-or-nothing abort.
//!
//! # Example
//!
//! ```
//! use account_ledger::{Address, Ledger};
//! use chrono::{TimeZone, Utc};
//!
//! let mut ledger = Ledger::new(0);
//! let holder = Address::new("holder");
//! let collector = Address::new("collector");
//!
//! let t0 = Utc.timestamp_opt(0, 0).unwrap();
//! ledger.mint(&holder, 1_000 * account_ledger::UNITS_PER_TOKEN, t0).unwrap();
//!
//! let t1 = t0 + chrono::Duration::days(366);
//! let receipt = ledger.settle(&holder, &collector, t1);
//! assert_eq!(receipt.storage_fee, 250_684_931);
//! ```

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::{
    fees,
    types::{Account, AccountStatus, Address, INACTIVE_THRESHOLD_DAYS},
    Error, Result,
};

/// Outcome of settling one account at one instant
///
/// `account` is the post-settlement record; the fee fields say what was
/// (or would be) moved to the fee collector.
#[derive(Debug, Clone)]
pub struct Settlement {
    /// The account record after fees are deducted and clocks rebased
    pub account: Account,

    /// Storage fee realized by this settlement
    pub storage_fee: u64,

    /// Inactivity fee realized by this settlement
    pub inactive_fee: u64,
}

impl Settlement {
    /// Combined fee moved to the collector
    pub fn total_fees(&self) -> u64 {
        // Both fees are capped against the same starting balance, so the
        // sum cannot overflow
        self.storage_fee + self.inactive_fee
    }
}

/// The account book: every address's record plus total supply
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    /// Per-address records, created lazily on first credit
    accounts: HashMap<Address, Account>,

    /// Total minted supply in smallest units
    total_supply: u64,

    /// Live global default for the storage-fee grace period. Accounts
    /// capture this value when their clock is established; changing it
    /// never affects an existing clock.
    grace_period_days: u64,
}

impl Ledger {
    /// Create an empty ledger with the given grace-period default
    pub fn new(grace_period_days: u64) -> Self {
        Self {
            accounts: HashMap::new(),
            total_supply: 0,
            grace_period_days,
        }
    }

    /// Total minted supply
    pub fn total_supply(&self) -> u64 {
        self.total_supply
    }

    /// Current global grace-period default
    pub fn grace_period_days(&self) -> u64 {
        self.grace_period_days
    }

    /// Change the global grace-period default. Only accounts whose clock
    /// is established after this call observe the new value.
    pub fn set_grace_period_days(&mut self, days: u64) {
        self.grace_period_days = days;
    }

    /// Account record, if one was ever created
    pub fn account(&self, addr: &Address) -> Option<&Account> {
        self.accounts.get(addr)
    }

    /// Account record or the all-zero default for never-credited addresses
    pub fn account_or_default(&self, addr: &Address) -> Account {
        self.accounts.get(addr).cloned().unwrap_or_default()
    }

    /// Raw balance, ignoring any owed fees
    pub fn balance_of_no_fees(&self, addr: &Address) -> u64 {
        self.accounts.get(addr).map(|a| a.balance).unwrap_or(0)
    }

    /// Balance net of every fee settlement would realize right now
    pub fn balance_of(&self, addr: &Address, now: DateTime<Utc>) -> u64 {
        self.project_settlement(addr, now).account.balance
    }

    /// Whether the address is fee-exempt
    pub fn is_fee_exempt(&self, addr: &Address) -> bool {
        self.accounts.get(addr).map(|a| a.fee_exempt).unwrap_or(false)
    }

    /// Set or clear the fee exemption flag, creating the record if needed.
    ///
    /// Un-exempting resumes the account's old storage clock: accrual that
    /// happened while exempt becomes chargeable again.
    pub fn set_fee_exempt(&mut self, addr: &Address, exempt: bool) {
        let account = self.accounts.entry(addr.clone()).or_default();
        account.fee_exempt = exempt;
    }

    /// Whether the address is in the inactive state
    pub fn is_inactive(&self, addr: &Address) -> bool {
        self.accounts.get(addr).map(|a| a.is_inactive()).unwrap_or(false)
    }

    /// Whole days since the address last authorized an operation
    pub fn days_since_activity(&self, addr: &Address, now: DateTime<Utc>) -> u64 {
        self.account_or_default(addr).days_since_activity(now)
    }

    /// Whole days since the storage clock was established (0 when
    /// inactive or never credited)
    pub fn days_since_paid_storage_fee(&self, addr: &Address, now: DateTime<Utc>) -> u64 {
        self.account_or_default(addr).days_since_paid_storage_fee(now)
    }

    /// Storage fee settlement would realize right now
    pub fn owed_storage_fee(&self, addr: &Address, now: DateTime<Utc>) -> u64 {
        self.project_settlement(addr, now).storage_fee
    }

    /// Inactivity fee settlement would realize right now. For a dormant
    /// account not yet marked inactive this projects the snapshot the
    /// marking would freeze.
    pub fn owed_inactive_fee(&self, addr: &Address, now: DateTime<Utc>) -> u64 {
        self.project_settlement(addr, now).inactive_fee
    }

    /// Project settling `addr` at `now` without touching state.
    ///
    /// The state machine, in order:
    /// 1. Fee-exempt accounts settle to themselves, fee-free.
    /// 2. An active account pays its storage fee; a realized (non-zero)
    ///    fee rebases the clock to `now` and consumes the grace window.
    ///    A zero fee leaves the clock alone, so sub-day churn buys nothing.
    /// 3. An active account past the dormancy threshold is then marked
    ///    inactive, freezing the post-storage-fee balance as snapshot.
    /// 4. An inactive account pays the inactivity fee against its
    ///    snapshot, net of what was already paid, capped at balance.
    pub fn project_settlement(&self, addr: &Address, now: DateTime<Utc>) -> Settlement {
        let mut account = self.account_or_default(addr);
        let mut storage_fee = 0u64;
        let mut inactive_fee = 0u64;

        if !account.fee_exempt {
            let days_dormant = account.days_since_activity(now);

            if !account.is_inactive() {
                storage_fee = fees::storage_fee(
                    account.balance,
                    account.chargeable_storage_days(now),
                    days_dormant,
                );
                if storage_fee > 0 {
                    account.balance -= storage_fee;
                    account.storage_fee_paid_at = Some(now);
                    account.grace_days = 0;
                }
                if days_dormant >= INACTIVE_THRESHOLD_DAYS && account.balance > 0 {
                    account.status = AccountStatus::Inactive {
                        snapshot: account.balance,
                        fee_paid: 0,
                    };
                }
            }

            if let AccountStatus::Inactive { snapshot, fee_paid } = account.status {
                inactive_fee = fees::inactive_fee(account.balance, days_dormant, snapshot, fee_paid);
                if inactive_fee > 0 {
                    account.balance -= inactive_fee;
                    account.status = AccountStatus::Inactive {
                        snapshot,
                        fee_paid: fee_paid + inactive_fee,
                    };
                }
            }
        }

        Settlement {
            account,
            storage_fee,
            inactive_fee,
        }
    }

    /// Commit a previously projected settlement, crediting its fees to
    /// the collector in the same step (conservation holds throughout).
    pub fn apply_settlement(&mut self, addr: &Address, settlement: Settlement, fee_collector: &Address) {
        let total = settlement.total_fees();
        let newly_inactive = settlement.account.is_inactive() && !self.is_inactive(addr);
        self.accounts.insert(addr.clone(), settlement.account);
        if total > 0 {
            self.credit_fees(fee_collector, total);
        }
        if newly_inactive {
            tracing::info!(account = %addr, "account marked inactive");
        }
        if total > 0 {
            tracing::debug!(
                account = %addr,
                storage_fee = settlement.storage_fee,
                inactive_fee = settlement.inactive_fee,
                "fees settled"
            );
        }
    }

    /// Project and commit in one step
    pub fn settle(&mut self, addr: &Address, fee_collector: &Address, now: DateTime<Utc>) -> Settlement {
        let settlement = self.project_settlement(addr, now);
        self.apply_settlement(addr, settlement.clone(), fee_collector);
        settlement
    }

    /// Record a self-authorized operation on `addr`.
    ///
    /// Callers settle first. Reactivation re-establishes the storage
    /// clock and captures the current global grace period.
    pub fn touch(&mut self, addr: &Address, now: DateTime<Utc>) {
        let grace = self.grace_period_days;
        let account = self.accounts.entry(addr.clone()).or_default();
        account.last_activity_at = Some(now);
        if account.is_inactive() {
            account.status = AccountStatus::Active;
            account.storage_fee_paid_at = Some(now);
            account.grace_days = grace;
            tracing::info!(account = %addr, "account reactivated");
        }
    }

    /// Credit `amount` to `addr`.
    ///
    /// First credit establishes the storage clock (capturing the global
    /// grace period) and the activity baseline. Later credits apply the
    /// dust-reset rule: if whole chargeable days have elapsed but the
    /// unrealized fee on the pre-credit balance rounds to zero, the clock
    /// re-establishes at the credit time, so micro-fees never accumulate
    /// into unpayable liability.
    pub fn credit(&mut self, addr: &Address, amount: u64, now: DateTime<Utc>) -> Result<()> {
        let current = self.balance_of_no_fees(addr);
        let new_balance = current.checked_add(amount).ok_or_else(|| {
            Error::AmountOverflow(format!("credit of {} to {} overflows", amount, addr))
        })?;

        let grace = self.grace_period_days;
        let account = self.accounts.entry(addr.clone()).or_default();
        match account.storage_fee_paid_at {
            None => {
                account.storage_fee_paid_at = Some(now);
                account.grace_days = grace;
                if account.last_activity_at.is_none() {
                    account.last_activity_at = Some(now);
                }
            }
            Some(_) => {
                let chargeable = account.chargeable_storage_days(now);
                if !account.fee_exempt
                    && !account.is_inactive()
                    && chargeable > 0
                    && fees::storage_fee(account.balance, chargeable, account.days_since_activity(now)) == 0
                {
                    account.storage_fee_paid_at = Some(now);
                }
            }
        }
        account.balance = new_balance;
        Ok(())
    }

    /// Debit `amount` from `addr`
    pub fn debit(&mut self, addr: &Address, amount: u64) -> Result<()> {
        let account = self.accounts.get_mut(addr).ok_or_else(|| {
            Error::InsufficientBalance(format!("{} has no balance", addr))
        })?;
        if account.balance < amount {
            return Err(Error::InsufficientBalance(format!(
                "{} has {} of {} required",
                addr, account.balance, amount
            )));
        }
        account.balance -= amount;
        Ok(())
    }

    /// Mint new supply to `addr`
    pub fn mint(&mut self, addr: &Address, amount: u64, now: DateTime<Utc>) -> Result<()> {
        let new_supply = self.total_supply.checked_add(amount).ok_or_else(|| {
            Error::AmountOverflow(format!("minting {} overflows total supply", amount))
        })?;
        self.credit(addr, amount, now)?;
        self.total_supply = new_supply;
        Ok(())
    }

    /// Credit realized fees to the collector without running credit-clock
    /// logic (collectors are fee-exempt role addresses)
    pub fn credit_fees(&mut self, collector: &Address, amount: u64) {
        let account = self.accounts.entry(collector.clone()).or_default();
        account.balance = account.balance.saturating_add(amount);
    }

    /// Iterate over every account record ever created
    pub fn accounts(&self) -> impl Iterator<Item = (&Address, &Account)> {
        self.accounts.iter()
    }

    /// Verify the conservation invariant: the sum of all balances equals
    /// total supply. Fees only move value, they never destroy it.
    pub fn check_conservation(&self) -> bool {
        let sum: u128 = self.accounts.values().map(|a| a.balance as u128).sum();
        sum == self.total_supply as u128
    }
}
