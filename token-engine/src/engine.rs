//! Supply and routing controller
//!
//! The engine fronts the account ledger with the public operation
//! surface. Every mutating operation follows the same shape: check the
//! route, project settlement of all affected accounts as a pure plan,
//! re-check post-settlement constraints, then commit the plan whole.
//! [`TokenEngine::simulate_transfer`] consumes the same planner as
//! [`TokenEngine::transfer`], so a simulation at instant `t` is exactly
//! the transfer at instant `t`.

use account_ledger::types::{INACTIVE_THRESHOLD_DAYS, MAX_TRANSFER_FEE_BPS};
use account_ledger::{fees, Address, Ledger, Settlement};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

use crate::{
    config::Config,
    metrics::Metrics,
    oracle::ReserveOracle,
    routing::Roles,
    Error, Result,
};

/// Storage fees become force-collectable only after a full year of
/// accrual; dormant accounts past the inactivity threshold are always
/// enforceable.
const FORCE_SETTLE_MIN_DAYS: u64 = 365;

/// Outcome of a committed transfer
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TransferReceipt {
    /// Settlement fees realized on the sender (storage plus inactivity)
    pub from_fee: u64,

    /// Settlement fees realized on the recipient
    pub to_fee: u64,

    /// Transfer fee charged to the sender
    pub transfer_fee: u64,
}

/// Pure projection of a transfer at one instant
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TransferSimulation {
    /// Settlement fees the sender would pay
    pub from_fee: u64,

    /// Settlement fees the recipient would pay
    pub to_fee: u64,

    /// Transfer fee the sender would pay on top of the amount
    pub transfer_fee: u64,

    /// Sender balance after the transfer
    pub from_balance: u64,

    /// Recipient balance after the transfer
    pub to_balance: u64,
}

/// Fees realized by a forced settlement
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SettlementReceipt {
    /// Storage fee collected
    pub storage_fee: u64,

    /// Inactivity fee collected
    pub inactive_fee: u64,
}

/// Outcome of a mint operation
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MintReceipt {
    /// Units drained from the float treasury into the backed treasury
    pub drained_from_float: u64,

    /// Newly created units (the residual beyond available float)
    pub newly_minted: u64,
}

/// Everything a transfer will do, computed without mutating state
#[derive(Debug, Clone)]
struct TransferPlan {
    from: Address,
    to: Address,
    amount: u64,
    now: DateTime<Utc>,
    from_settled: Settlement,
    /// `None` when sending to self (single settlement, no transfer fee)
    to_settled: Option<Settlement>,
    transfer_fee: u64,
    from_balance_after: u64,
    to_balance_after: u64,
}

/// The supply & routing controller over the account ledger
pub struct TokenEngine<O: ReserveOracle> {
    ledger: Ledger,
    roles: Roles,
    transfer_fee_bps: u64,
    supply_cap_units: u64,
    allowances: HashMap<(Address, Address), u64>,
    oracle: O,
    metrics: Metrics,
}

impl<O: ReserveOracle> TokenEngine<O> {
    /// Build an engine from configuration and a reserve oracle.
    ///
    /// All role addresses become permanently fee-exempt.
    pub fn new(config: Config, oracle: O) -> Result<Self> {
        config.fees.validate()?;
        let roles = config.roles.into_roles()?;

        let mut ledger = Ledger::new(config.fees.storage_fee_grace_period_days);
        for addr in roles.exempt_addresses() {
            ledger.set_fee_exempt(addr, true);
        }

        let metrics =
            Metrics::new().map_err(|e| Error::Other(format!("metrics init failed: {}", e)))?;

        Ok(Self {
            ledger,
            roles,
            transfer_fee_bps: config.fees.transfer_fee_basis_points,
            supply_cap_units: config.fees.supply_cap_units(),
            allowances: HashMap::new(),
            oracle,
            metrics,
        })
    }

    // ---------------------------------------------------------------
    // Read surface
    // ---------------------------------------------------------------

    /// Role addresses
    pub fn roles(&self) -> &Roles {
        &self.roles
    }

    /// Read access to the underlying account ledger
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Total minted supply
    pub fn total_supply(&self) -> u64 {
        self.ledger.total_supply()
    }

    /// Supply minus the float treasury's (unbacked) holdings
    pub fn total_circulation(&self) -> u64 {
        self.ledger.total_supply()
            - self.ledger.balance_of_no_fees(&self.roles.unbacked_treasury)
    }

    /// Balance net of every fee that settlement would realize now
    pub fn balance_of(&self, addr: &Address, now: DateTime<Utc>) -> u64 {
        self.ledger.balance_of(addr, now)
    }

    /// Raw balance, ignoring owed fees
    pub fn balance_of_no_fees(&self, addr: &Address) -> u64 {
        self.ledger.balance_of_no_fees(addr)
    }

    /// Current transfer fee in basis points
    pub fn transfer_fee_basis_points(&self) -> u64 {
        self.transfer_fee_bps
    }

    /// Current global grace-period default in days
    pub fn storage_fee_grace_period_days(&self) -> u64 {
        self.ledger.grace_period_days()
    }

    /// Whether the address is fee-exempt
    pub fn is_fee_exempt(&self, addr: &Address) -> bool {
        self.ledger.is_fee_exempt(addr)
    }

    /// Whether the address is in the inactive state
    pub fn is_inactive(&self, addr: &Address) -> bool {
        self.ledger.is_inactive(addr)
    }

    /// Whole days since the address last authorized an operation
    pub fn days_since_activity(&self, addr: &Address, now: DateTime<Utc>) -> u64 {
        self.ledger.days_since_activity(addr, now)
    }

    /// Whole days since the address's storage clock was established
    pub fn days_since_paid_storage_fee(&self, addr: &Address, now: DateTime<Utc>) -> u64 {
        self.ledger.days_since_paid_storage_fee(addr, now)
    }

    /// Storage fee settlement would realize on `addr` right now
    pub fn calc_storage_fee(&self, addr: &Address, now: DateTime<Utc>) -> u64 {
        self.ledger.owed_storage_fee(addr, now)
    }

    /// Inactivity fee settlement would realize on `addr` right now
    pub fn calc_inactive_fee(&self, addr: &Address, now: DateTime<Utc>) -> u64 {
        self.ledger.owed_inactive_fee(addr, now)
    }

    /// Transfer fee `addr` would pay to send `amount`
    pub fn calc_transfer_fee(&self, addr: &Address, amount: u64) -> u64 {
        if self.ledger.is_fee_exempt(addr) {
            0
        } else {
            fees::transfer_fee(amount, self.transfer_fee_bps)
        }
    }

    /// Largest amount `addr` can send after settling all owed fees.
    ///
    /// Transferring exactly this amount drains the account: the residual
    /// is zero whenever integer fee divisibility allows, and never more
    /// than one smallest unit.
    pub fn calc_send_all_balance(&self, addr: &Address, now: DateTime<Utc>) -> Result<u64> {
        if addr.is_null() {
            return Err(Error::NullAddress(
                "cannot compute send-all for the null address".to_string(),
            ));
        }
        let settled = self.ledger.project_settlement(addr, now);
        if settled.account.fee_exempt {
            return Ok(settled.account.balance);
        }
        Ok(fees::max_sendable(settled.account.balance, self.transfer_fee_bps))
    }

    /// Remaining allowance from `owner` to `spender`
    pub fn allowance(&self, owner: &Address, spender: &Address) -> u64 {
        self.allowances
            .get(&(owner.clone(), spender.clone()))
            .copied()
            .unwrap_or(0)
    }

    /// Verify the conservation invariant
    pub fn check_conservation(&self) -> bool {
        self.ledger.check_conservation()
    }

    /// Project a transfer without mutating state.
    ///
    /// Runs the identical validation and planner as [`Self::transfer`].
    pub fn simulate_transfer(
        &self,
        from: &Address,
        to: &Address,
        amount: u64,
        now: DateTime<Utc>,
    ) -> Result<TransferSimulation> {
        let plan = self.plan_transfer(from, to, amount, now)?;
        Ok(TransferSimulation {
            from_fee: plan.from_settled.total_fees(),
            to_fee: plan.to_settled.as_ref().map(|s| s.total_fees()).unwrap_or(0),
            transfer_fee: plan.transfer_fee,
            from_balance: plan.from_balance_after,
            to_balance: plan.to_balance_after,
        })
    }

    // ---------------------------------------------------------------
    // Transfers
    // ---------------------------------------------------------------

    /// Move `amount` from the caller to `to`.
    ///
    /// Settles fees on both parties first; the transfer fee is charged to
    /// the caller on top of `amount` and the recipient receives `amount`
    /// in full. Sending to self (any amount, including zero) is the
    /// canonical way to pay one's own storage fee. The caller's activity
    /// clock updates; an inactive caller reactivates. The recipient is
    /// passive and neither.
    pub fn transfer(
        &mut self,
        caller: &Address,
        to: &Address,
        amount: u64,
        now: DateTime<Utc>,
    ) -> Result<TransferReceipt> {
        let plan = self.plan_transfer(caller, to, amount, now)?;
        let receipt = self.commit_transfer(plan)?;
        self.metrics.transfers_total.inc();
        Ok(receipt)
    }

    /// Approve `spender` to transfer up to `amount` on the caller's
    /// behalf. Counts as caller activity (reactivates if inactive), but
    /// does not settle storage fees on an active account.
    pub fn approve(
        &mut self,
        caller: &Address,
        spender: &Address,
        amount: u64,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.set_allowance(caller, spender, amount, now)
    }

    /// Raise an existing allowance
    pub fn increase_allowance(
        &mut self,
        caller: &Address,
        spender: &Address,
        added: u64,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let current = self.allowance(caller, spender);
        let next = current.checked_add(added).ok_or_else(|| {
            Error::Other(format!("allowance for {} overflows", spender))
        })?;
        self.set_allowance(caller, spender, next, now)
    }

    /// Lower an existing allowance
    pub fn decrease_allowance(
        &mut self,
        caller: &Address,
        spender: &Address,
        removed: u64,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let current = self.allowance(caller, spender);
        let next = current.checked_sub(removed).ok_or_else(|| {
            Error::InsufficientAllowance(format!(
                "cannot decrease allowance of {} by {}",
                current, removed
            ))
        })?;
        self.set_allowance(caller, spender, next, now)
    }

    /// Delegated transfer: move `amount` from `from` to `to` within the
    /// caller's allowance. The token owner (`from`) is the active party.
    pub fn transfer_from(
        &mut self,
        caller: &Address,
        from: &Address,
        to: &Address,
        amount: u64,
        now: DateTime<Utc>,
    ) -> Result<TransferReceipt> {
        let key = (from.clone(), caller.clone());
        let allowed = self.allowances.get(&key).copied().unwrap_or(0);
        if allowed < amount {
            return Err(Error::InsufficientAllowance(format!(
                "{} approved {} of {} requested",
                from, allowed, amount
            )));
        }
        let plan = self.plan_transfer(from, to, amount, now)?;
        let receipt = self.commit_transfer(plan)?;
        self.allowances.insert(key, allowed - amount);
        self.metrics.transfers_total.inc();
        Ok(receipt)
    }

    // ---------------------------------------------------------------
    // Supply
    // ---------------------------------------------------------------

    /// Add backed supply (owner only).
    ///
    /// Drains the float treasury into the backed treasury first and mints
    /// only the residual. The oracle is re-read on every call; the new
    /// supply must stay within both the attested reserve and the hard
    /// supply cap.
    pub fn mint(&mut self, caller: &Address, amount: u64, now: DateTime<Utc>) -> Result<MintReceipt> {
        self.require_owner(caller)?;

        let locked = self.oracle.locked_quantity(&self.roles.engine_address)?;
        let float = self.ledger.balance_of_no_fees(&self.roles.unbacked_treasury);
        let drained = amount.min(float);
        let minted = amount - drained;

        let new_supply = self
            .ledger
            .total_supply()
            .checked_add(minted)
            .ok_or_else(|| Error::SupplyCapExceeded("supply arithmetic overflow".to_string()))?;
        if new_supply > locked {
            return Err(Error::SupplyCapExceeded(format!(
                "supply {} would exceed attested reserve {}",
                new_supply, locked
            )));
        }
        if new_supply > self.supply_cap_units {
            return Err(Error::SupplyCapExceeded(format!(
                "supply {} would exceed hard cap {}",
                new_supply, self.supply_cap_units
            )));
        }

        if drained > 0 {
            self.ledger.debit(&self.roles.unbacked_treasury, drained)?;
            self.ledger.credit(&self.roles.backed_treasury, drained, now)?;
        }
        if minted > 0 {
            self.ledger.mint(&self.roles.backed_treasury, minted, now)?;
        }

        self.metrics.mints_total.inc();
        tracing::info!(
            amount,
            drained_from_float = drained,
            newly_minted = minted,
            total_supply = self.ledger.total_supply(),
            "backed tokens added"
        );
        Ok(MintReceipt {
            drained_from_float: drained,
            newly_minted: minted,
        })
    }

    // ---------------------------------------------------------------
    // Settlement enforcement
    // ---------------------------------------------------------------

    /// Forcibly settle `target`'s outstanding fees (enforcer only).
    ///
    /// Fails when the target is null, holds nothing, owes nothing, or has
    /// accrued less than a year since its last storage payment (dormant
    /// accounts past the inactivity threshold are always enforceable).
    /// An empty settlement must not burn the enforcer's effort.
    pub fn force_pay_fees(
        &mut self,
        caller: &Address,
        target: &Address,
        now: DateTime<Utc>,
    ) -> Result<SettlementReceipt> {
        if *caller != self.roles.fee_enforcer {
            return Err(Error::Unauthorized(
                "only the fee enforcer may force settlement".to_string(),
            ));
        }
        if target.is_null() {
            return Err(Error::NullAddress(
                "cannot force settlement on the null address".to_string(),
            ));
        }
        if self.ledger.balance_of_no_fees(target) == 0 {
            return Err(Error::NothingOwed(format!("{} holds no balance", target)));
        }
        let days_paid = self.ledger.days_since_paid_storage_fee(target, now);
        let dormant = self.ledger.days_since_activity(target, now);
        if days_paid < FORCE_SETTLE_MIN_DAYS && dormant < INACTIVE_THRESHOLD_DAYS {
            return Err(Error::NothingOwed(format!(
                "{} has accrued {} of {} days required for enforcement",
                target, days_paid, FORCE_SETTLE_MIN_DAYS
            )));
        }

        let settlement = self.ledger.project_settlement(target, now);
        if settlement.total_fees() == 0 {
            return Err(Error::NothingOwed(format!("{} owes no fees", target)));
        }

        let was_inactive = self.ledger.is_inactive(target);
        let storage_fee = settlement.storage_fee;
        let inactive_fee = settlement.inactive_fee;
        let now_inactive = settlement.account.is_inactive();
        self.ledger
            .apply_settlement(target, settlement, &self.roles.fee_collector);

        self.metrics.forced_settlements_total.inc();
        self.metrics.record_settlement(storage_fee, inactive_fee);
        if !was_inactive && now_inactive {
            self.metrics.inactivations_total.inc();
        }
        tracing::info!(
            account = %target,
            storage_fee,
            inactive_fee,
            "fees force-settled"
        );
        Ok(SettlementReceipt {
            storage_fee,
            inactive_fee,
        })
    }

    /// Mark a dormant account inactive, freezing its fee snapshot.
    ///
    /// Open to any caller; the 1095-day dormancy precondition gates it.
    pub fn set_account_inactive(&mut self, target: &Address, now: DateTime<Utc>) -> Result<()> {
        if self.ledger.is_fee_exempt(target) {
            return Err(Error::InactivationNotAllowed(format!(
                "{} is fee-exempt",
                target
            )));
        }
        if self.ledger.is_inactive(target) {
            return Err(Error::InactivationNotAllowed(format!(
                "{} is already inactive",
                target
            )));
        }
        let dormant = self.ledger.days_since_activity(target, now);
        if dormant < INACTIVE_THRESHOLD_DAYS {
            return Err(Error::InactivationNotAllowed(format!(
                "{} has been dormant {} of {} required days",
                target, dormant, INACTIVE_THRESHOLD_DAYS
            )));
        }

        let settlement = self.ledger.project_settlement(target, now);
        if !settlement.account.is_inactive() {
            // Nothing left to freeze once storage fees are taken
            return Err(Error::InactivationNotAllowed(format!(
                "{} has no balance to snapshot",
                target
            )));
        }
        let storage_fee = settlement.storage_fee;
        let inactive_fee = settlement.inactive_fee;
        self.ledger
            .apply_settlement(target, settlement, &self.roles.fee_collector);
        self.metrics.record_settlement(storage_fee, inactive_fee);
        self.metrics.inactivations_total.inc();
        Ok(())
    }

    // ---------------------------------------------------------------
    // Owner configuration
    // ---------------------------------------------------------------

    /// Replace the fee collector (owner only)
    pub fn set_fee_address(&mut self, caller: &Address, addr: Address) -> Result<()> {
        self.require_owner(caller)?;
        self.require_not_float("fee collector", &addr)?;
        self.ledger.set_fee_exempt(&addr, true);
        self.roles.fee_collector = addr;
        Ok(())
    }

    /// Replace the redemption sink (owner only)
    pub fn set_redeem_address(&mut self, caller: &Address, addr: Address) -> Result<()> {
        self.require_owner(caller)?;
        self.require_not_float("redemption sink", &addr)?;
        self.ledger.set_fee_exempt(&addr, true);
        self.roles.redemption_sink = addr;
        Ok(())
    }

    /// Replace the backed treasury (owner only)
    pub fn set_backed_address(&mut self, caller: &Address, addr: Address) -> Result<()> {
        self.require_owner(caller)?;
        self.require_not_float("backed treasury", &addr)?;
        self.ledger.set_fee_exempt(&addr, true);
        self.roles.backed_treasury = addr;
        Ok(())
    }

    /// Replace the float treasury (owner only). It may not coincide with
    /// the backed treasury, fee collector, or redemption sink.
    pub fn set_unbacked_address(&mut self, caller: &Address, addr: Address) -> Result<()> {
        self.require_owner(caller)?;
        self.require_real_address("unbacked treasury", &addr)?;
        if addr == self.roles.backed_treasury
            || addr == self.roles.fee_collector
            || addr == self.roles.redemption_sink
        {
            return Err(Error::DuplicateRole(format!(
                "{} already holds another treasury role",
                addr
            )));
        }
        self.ledger.set_fee_exempt(&addr, true);
        self.roles.unbacked_treasury = addr;
        Ok(())
    }

    /// Replace the fee enforcer (owner only)
    pub fn set_fee_enforcer(&mut self, caller: &Address, addr: Address) -> Result<()> {
        self.require_owner(caller)?;
        self.require_real_address("fee enforcer", &addr)?;
        self.ledger.set_fee_exempt(&addr, true);
        self.roles.fee_enforcer = addr;
        Ok(())
    }

    /// Hand ownership to a new address (owner only)
    pub fn transfer_ownership(&mut self, caller: &Address, addr: Address) -> Result<()> {
        self.require_owner(caller)?;
        self.require_real_address("owner", &addr)?;
        self.ledger.set_fee_exempt(&addr, true);
        self.roles.owner = addr;
        Ok(())
    }

    /// Exempt an address from storage and inactivity fees (owner only)
    pub fn set_fee_exempt(&mut self, caller: &Address, addr: &Address) -> Result<()> {
        self.require_owner(caller)?;
        self.require_real_address("exempt target", addr)?;
        self.ledger.set_fee_exempt(addr, true);
        Ok(())
    }

    /// Remove a fee exemption (owner only). The old storage clock
    /// resumes: accrual from before and during the exemption becomes
    /// chargeable again.
    pub fn unset_fee_exempt(&mut self, caller: &Address, addr: &Address) -> Result<()> {
        self.require_owner(caller)?;
        self.require_real_address("exempt target", addr)?;
        self.ledger.set_fee_exempt(addr, false);
        Ok(())
    }

    /// Change the transfer fee (owner only), capped at 10 bps
    pub fn set_transfer_fee_basis_points(&mut self, caller: &Address, bps: u64) -> Result<()> {
        self.require_owner(caller)?;
        if bps > MAX_TRANSFER_FEE_BPS {
            return Err(Error::Config(format!(
                "transfer fee {} bps exceeds maximum {}",
                bps, MAX_TRANSFER_FEE_BPS
            )));
        }
        self.transfer_fee_bps = bps;
        Ok(())
    }

    /// Change the global grace-period default (owner only). Existing
    /// accounts keep the grace they captured.
    pub fn set_storage_fee_grace_period_days(&mut self, caller: &Address, days: u64) -> Result<()> {
        self.require_owner(caller)?;
        self.ledger.set_grace_period_days(days);
        Ok(())
    }

    // ---------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------

    fn require_owner(&self, caller: &Address) -> Result<()> {
        if *caller != self.roles.owner {
            return Err(Error::Unauthorized(format!(
                "{} is not the contract owner",
                caller
            )));
        }
        Ok(())
    }

    fn require_real_address(&self, what: &str, addr: &Address) -> Result<()> {
        if addr.is_null() {
            return Err(Error::NullAddress(format!("{} must not be null", what)));
        }
        Ok(())
    }

    fn require_not_float(&self, what: &str, addr: &Address) -> Result<()> {
        self.require_real_address(what, addr)?;
        if *addr == self.roles.unbacked_treasury {
            return Err(Error::DuplicateRole(format!(
                "{} must not equal the unbacked treasury",
                what
            )));
        }
        Ok(())
    }

    fn set_allowance(
        &mut self,
        caller: &Address,
        spender: &Address,
        amount: u64,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if spender.is_null() {
            return Err(Error::NullAddress(
                "cannot approve the null address".to_string(),
            ));
        }
        if self.ledger.is_inactive(caller) {
            let settlement = self.ledger.settle(caller, &self.roles.fee_collector, now);
            self.metrics
                .record_settlement(settlement.storage_fee, settlement.inactive_fee);
        }
        self.ledger.touch(caller, now);
        self.allowances
            .insert((caller.clone(), spender.clone()), amount);
        Ok(())
    }

    fn plan_transfer(
        &self,
        from: &Address,
        to: &Address,
        amount: u64,
        now: DateTime<Utc>,
    ) -> Result<TransferPlan> {
        self.roles.check_transfer_route(from, to)?;

        let from_settled = self.ledger.project_settlement(from, now);
        let to_settled = if to != from {
            Some(self.ledger.project_settlement(to, now))
        } else {
            None
        };

        let transfer_fee = if to == from || self.ledger.is_fee_exempt(from) {
            0
        } else {
            fees::transfer_fee(amount, self.transfer_fee_bps)
        };
        let required = amount.checked_add(transfer_fee).ok_or_else(|| {
            Error::InsufficientBalance(format!("amount {} overflows with its fee", amount))
        })?;

        if from_settled.account.balance < required {
            return Err(Error::InsufficientBalance(format!(
                "{} has {} of {} required after settlement",
                from, from_settled.account.balance, required
            )));
        }

        let from_balance_after = if to == from {
            from_settled.account.balance
        } else {
            from_settled.account.balance - required
        };
        let to_balance_after = match &to_settled {
            Some(s) => s.account.balance.checked_add(amount).ok_or_else(|| {
                Error::Other(format!("credit to {} overflows", to))
            })?,
            None => from_balance_after,
        };

        Ok(TransferPlan {
            from: from.clone(),
            to: to.clone(),
            amount,
            now,
            from_settled,
            to_settled,
            transfer_fee,
            from_balance_after,
            to_balance_after,
        })
    }

    fn commit_transfer(&mut self, plan: TransferPlan) -> Result<TransferReceipt> {
        let collector = self.roles.fee_collector.clone();
        let receipt = TransferReceipt {
            from_fee: plan.from_settled.total_fees(),
            to_fee: plan.to_settled.as_ref().map(|s| s.total_fees()).unwrap_or(0),
            transfer_fee: plan.transfer_fee,
        };

        let from_was_inactive = self.ledger.is_inactive(&plan.from);
        let from_now_inactive = plan.from_settled.account.is_inactive();
        self.metrics
            .record_settlement(plan.from_settled.storage_fee, plan.from_settled.inactive_fee);
        self.ledger
            .apply_settlement(&plan.from, plan.from_settled, &collector);
        if !from_was_inactive && from_now_inactive {
            self.metrics.inactivations_total.inc();
        }

        if let Some(to_settled) = plan.to_settled {
            let to_was_inactive = self.ledger.is_inactive(&plan.to);
            let to_now_inactive = to_settled.account.is_inactive();
            self.metrics
                .record_settlement(to_settled.storage_fee, to_settled.inactive_fee);
            self.ledger.apply_settlement(&plan.to, to_settled, &collector);
            if !to_was_inactive && to_now_inactive {
                self.metrics.inactivations_total.inc();
            }
        }

        // Checked by the planner; debit and credit cannot fail here
        self.ledger
            .debit(&plan.from, plan.amount + plan.transfer_fee)?;
        self.ledger.credit(&plan.to, plan.amount, plan.now)?;
        if plan.transfer_fee > 0 {
            self.ledger.credit_fees(&collector, plan.transfer_fee);
            self.metrics
                .transfer_fee_units_total
                .inc_by(plan.transfer_fee);
        }
        self.ledger.touch(&plan.from, plan.now);

        tracing::info!(
            from = %plan.from,
            to = %plan.to,
            amount = plan.amount,
            transfer_fee = plan.transfer_fee,
            "transfer committed"
        );
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::SharedVault;
    use account_ledger::UNITS_PER_TOKEN;
    use chrono::{Duration, TimeZone};

    const TOKEN: u64 = UNITS_PER_TOKEN;

    fn t0() -> DateTime<Utc> {
        Utc.timestamp_opt(1_600_000_000, 0).unwrap()
    }

    fn day(n: i64) -> DateTime<Utc> {
        t0() + Duration::days(n)
    }

    fn engine() -> (TokenEngine<SharedVault>, SharedVault) {
        let vault = SharedVault::new();
        vault.lock(8_133_525_786 * TOKEN).unwrap();
        let config = Config::default();
        vault
            .bind_consumer(config.roles.engine_address.clone())
            .unwrap();
        let engine = TokenEngine::new(config, vault.clone()).unwrap();
        (engine, vault)
    }

    fn owner() -> Address {
        Address::new("owner")
    }

    fn backed() -> Address {
        Address::new("treasury-backed")
    }

    #[test]
    fn test_mint_credits_backed_treasury() {
        let (mut engine, _vault) = engine();
        let receipt = engine.mint(&owner(), 5000 * TOKEN, t0()).unwrap();
        assert_eq!(receipt.newly_minted, 5000 * TOKEN);
        assert_eq!(receipt.drained_from_float, 0);
        assert_eq!(engine.balance_of_no_fees(&backed()), 5000 * TOKEN);
        assert_eq!(engine.total_supply(), 5000 * TOKEN);
        assert!(engine.check_conservation());
    }

    #[test]
    fn test_mint_requires_owner() {
        let (mut engine, _vault) = engine();
        let result = engine.mint(&Address::new("ext1"), TOKEN, t0());
        assert!(matches!(result, Err(Error::Unauthorized(_))));
    }

    #[test]
    fn test_transfer_charges_sender_fee_on_top() {
        let (mut engine, _vault) = engine();
        engine.mint(&owner(), 1000 * TOKEN, t0()).unwrap();
        let ext1 = Address::new("ext1");
        let ext2 = Address::new("ext2");
        engine.transfer(&backed(), &ext1, 10 * TOKEN, t0()).unwrap();

        let receipt = engine.transfer(&ext1, &ext2, 5 * TOKEN, t0()).unwrap();
        assert_eq!(receipt.transfer_fee, 5 * TOKEN / 1000);
        assert_eq!(engine.balance_of_no_fees(&ext2), 5 * TOKEN);
        assert_eq!(
            engine.balance_of_no_fees(&ext1),
            10 * TOKEN - 5 * TOKEN - receipt.transfer_fee
        );
        assert!(engine.check_conservation());
    }

    #[test]
    fn test_exempt_sender_pays_no_transfer_fee() {
        let (mut engine, _vault) = engine();
        engine.mint(&owner(), 1000 * TOKEN, t0()).unwrap();
        let ext1 = Address::new("ext1");
        let receipt = engine.transfer(&backed(), &ext1, 10 * TOKEN, t0()).unwrap();
        assert_eq!(receipt.transfer_fee, 0);
        assert_eq!(engine.calc_transfer_fee(&backed(), 10 * TOKEN), 0);
    }

    #[test]
    fn test_insufficient_balance_is_atomic() {
        let (mut engine, _vault) = engine();
        engine.mint(&owner(), 1000 * TOKEN, t0()).unwrap();
        let ext1 = Address::new("ext1");
        let ext2 = Address::new("ext2");
        engine.transfer(&backed(), &ext1, 10 * TOKEN, t0()).unwrap();

        // A year of storage fees makes the exact balance unsendable
        let result = engine.transfer(&ext1, &ext2, 10 * TOKEN, day(365));
        assert!(matches!(result, Err(Error::InsufficientBalance(_))));
        // Failed transfer did not settle anything
        assert_eq!(engine.balance_of_no_fees(&ext1), 10 * TOKEN);
        assert!(engine.check_conservation());
    }

    #[test]
    fn test_simulation_matches_execution() {
        let (mut engine, _vault) = engine();
        engine.mint(&owner(), 1000 * TOKEN, t0()).unwrap();
        let ext1 = Address::new("ext1");
        let ext2 = Address::new("ext2");
        engine.transfer(&backed(), &ext1, 20 * TOKEN, t0()).unwrap();
        engine.transfer(&backed(), &ext2, 30 * TOKEN, t0()).unwrap();

        let sim = engine
            .simulate_transfer(&ext1, &ext2, 10 * TOKEN, day(90))
            .unwrap();
        let receipt = engine.transfer(&ext1, &ext2, 10 * TOKEN, day(90)).unwrap();
        assert_eq!(sim.from_fee, receipt.from_fee);
        assert_eq!(sim.to_fee, receipt.to_fee);
        assert_eq!(sim.transfer_fee, receipt.transfer_fee);
        assert_eq!(engine.balance_of_no_fees(&ext1), sim.from_balance);
        assert_eq!(engine.balance_of_no_fees(&ext2), sim.to_balance);
    }

    #[test]
    fn test_transfer_fee_cap() {
        let (mut engine, _vault) = engine();
        assert!(engine.set_transfer_fee_basis_points(&owner(), 11).is_err());
        assert!(engine.set_transfer_fee_basis_points(&owner(), 10).is_ok());
    }

    #[test]
    fn test_owner_setters_reject_non_owner() {
        let (mut engine, _vault) = engine();
        let ext1 = Address::new("ext1");
        assert!(engine.set_fee_address(&ext1, Address::new("x")).is_err());
        assert!(engine.set_fee_enforcer(&ext1, Address::new("x")).is_err());
        assert!(engine
            .set_storage_fee_grace_period_days(&ext1, 10)
            .is_err());
    }

    #[test]
    fn test_role_setters_reject_null_and_float_collision() {
        let (mut engine, _vault) = engine();
        assert!(matches!(
            engine.set_fee_address(&owner(), Address::null()),
            Err(Error::NullAddress(_))
        ));
        assert!(matches!(
            engine.set_fee_address(&owner(), Address::new("treasury-float")),
            Err(Error::DuplicateRole(_))
        ));
        assert!(matches!(
            engine.set_unbacked_address(&owner(), Address::new("fee-collector")),
            Err(Error::DuplicateRole(_))
        ));
    }

    #[test]
    fn test_new_role_addresses_become_exempt() {
        let (mut engine, _vault) = engine();
        let fresh = Address::new("fresh-enforcer");
        engine.set_fee_enforcer(&owner(), fresh.clone()).unwrap();
        assert!(engine.is_fee_exempt(&fresh));
    }
}
