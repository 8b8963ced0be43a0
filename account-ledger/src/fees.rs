//! Pure fee formulas
//!
//! All formulas take amounts in smallest units, widen to u128 internally,
//! and floor every division. A fee is never rounded up and never exceeds
//! the balance it is charged against.

use crate::types::{
    DAYS_PER_YEAR, INACTIVE_FEE_ANNUAL_BPS, INACTIVE_THRESHOLD_DAYS, MIN_INACTIVE_FEE_PER_YEAR,
    STORAGE_FEE_ANNUAL_BPS,
};

const BPS_DIVISOR: u128 = 10_000;

/// Storage fee on `balance` for `days_since_paid` chargeable days.
///
/// Once `days_since_activity` crosses the inactivity threshold, storage
/// accrual stops: only days prior to the crossing are charged, the rest
/// belongs to the inactivity-fee regime.
pub fn storage_fee(balance: u64, days_since_paid: u64, days_since_activity: u64) -> u64 {
    let mut days = days_since_paid;
    if days_since_activity >= INACTIVE_THRESHOLD_DAYS {
        days = days.saturating_sub(days_since_activity - INACTIVE_THRESHOLD_DAYS);
    }
    if days == 0 || balance == 0 {
        return 0;
    }
    let fee = balance as u128 * days as u128 * STORAGE_FEE_ANNUAL_BPS as u128
        / (DAYS_PER_YEAR as u128 * BPS_DIVISOR);
    if fee > balance as u128 {
        balance
    } else {
        fee as u64
    }
}

/// Inactivity fee owed by an account `days_inactive` days dormant.
///
/// Charged at 50 bps of the frozen `snapshot` per year with a one-token
/// annual floor, prorated over the days past the threshold, net of what
/// was `already_paid` against this snapshot, capped at `current_balance`.
pub fn inactive_fee(
    current_balance: u64,
    days_inactive: u64,
    snapshot: u64,
    already_paid: u64,
) -> u64 {
    if days_inactive < INACTIVE_THRESHOLD_DAYS {
        return 0;
    }
    let per_year = std::cmp::max(
        snapshot as u128 * INACTIVE_FEE_ANNUAL_BPS as u128 / BPS_DIVISOR,
        MIN_INACTIVE_FEE_PER_YEAR as u128,
    );
    let days_past = (days_inactive - INACTIVE_THRESHOLD_DAYS) as u128;
    let owed = (per_year * days_past / DAYS_PER_YEAR as u128).saturating_sub(already_paid as u128);
    std::cmp::min(owed, current_balance as u128) as u64
}

/// Transfer fee: `floor(amount * basis_points / 10_000)`.
///
/// At the default 10 bps anything under 1000 units rounds to zero.
pub fn transfer_fee(amount: u64, basis_points: u64) -> u64 {
    (amount as u128 * basis_points as u128 / BPS_DIVISOR) as u64
}

/// Largest amount whose fee-inclusive total fits in `balance`.
///
/// Inverse of [`transfer_fee`]: divide by `1 + bps/10_000`, round the
/// candidate up one unit, then step back if the fee-inclusive total
/// overshoots. The result plus its fee never exceeds `balance` and leaves
/// at most one unit behind.
pub fn max_sendable(balance: u64, basis_points: u64) -> u64 {
    if balance == 0 {
        return 0;
    }
    let candidate =
        (balance as u128 * BPS_DIVISOR / (BPS_DIVISOR + basis_points as u128)) as u64 + 1;
    let fee = transfer_fee(candidate, basis_points);
    if candidate as u128 + fee as u128 > balance as u128 {
        candidate - 1
    } else {
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UNITS_PER_TOKEN;

    const TOKEN: u64 = UNITS_PER_TOKEN;

    #[test]
    fn test_storage_fee_known_values() {
        // 89 971 tokens across a grid of day counts, hand-computed
        let balance = 8_997_100_000_000;
        for (days, expected) in [
            (1, 61_623_972),
            (128, 7_887_868_493),
            (365, 22_492_750_000),
            (366, 22_554_373_972),
            (730, 44_985_500_000),
            (731, 45_047_123_972),
            (1095, 67_478_250_000),
            (1096, 67_539_873_972),
        ] {
            assert_eq!(storage_fee(balance, days, 0), expected, "{} days", days);
        }
    }

    #[test]
    fn test_storage_fee_zero_days_zero_balance() {
        assert_eq!(storage_fee(1000 * TOKEN, 0, 0), 0);
        assert_eq!(storage_fee(0, 365, 0), 0);
    }

    #[test]
    fn test_storage_fee_stops_at_inactivity_threshold() {
        // 1460 days since paid, 1460 days dormant: only the 1095 days
        // before the crossing are chargeable
        assert_eq!(
            storage_fee(2000 * TOKEN, 1460, 1460),
            storage_fee(2000 * TOKEN, 1095, 0)
        );
        // Accrual fully consumed by the inactive regime
        assert_eq!(storage_fee(2000 * TOKEN, 365, 1095 + 365), 0);
    }

    #[test]
    fn test_storage_fee_caps_at_balance() {
        // 400+ years of 25 bps exceeds the principal
        assert_eq!(storage_fee(TOKEN, 365 * 401, 0), TOKEN);
    }

    #[test]
    fn test_storage_fee_dust_rounds_to_zero() {
        assert_eq!(storage_fee(10, 365, 0), 0);
        assert_eq!(storage_fee(1000, 365, 0), 2);
        assert_eq!(storage_fee(1000, 730, 0), 5);
    }

    #[test]
    fn test_inactive_fee_before_threshold_is_zero() {
        assert_eq!(inactive_fee(100 * TOKEN, 1094, 100 * TOKEN, 0), 0);
    }

    #[test]
    fn test_inactive_fee_fifty_bps_of_snapshot() {
        let snapshot = 198_500_000_000; // 1985 tokens
        assert_eq!(
            inactive_fee(snapshot, 1095 + 365, snapshot, 0),
            992_500_000
        );
        // Two years is exactly 1%
        assert_eq!(
            inactive_fee(snapshot, 1095 + 730, snapshot, 0),
            snapshot / 100
        );
    }

    #[test]
    fn test_inactive_fee_minimum_one_token_per_year() {
        // 10-token snapshot: 50 bps would be 0.05 token, floor kicks in
        let snapshot = 10 * TOKEN;
        assert_eq!(inactive_fee(snapshot, 1095 + 365, snapshot, 0), TOKEN);
        // ...so the account clears fully in ten years
        assert_eq!(
            inactive_fee(snapshot, 1095 + 365 * 10, snapshot, 0),
            10 * TOKEN
        );
    }

    #[test]
    fn test_inactive_fee_nets_out_already_paid() {
        let snapshot = 198_500_000_000;
        let year_one = inactive_fee(snapshot, 1095 + 365, snapshot, 0);
        assert_eq!(inactive_fee(snapshot, 1095 + 365, snapshot, year_one), 0);
        let remaining = snapshot - year_one;
        // Long dormancy caps at whatever balance is left
        assert_eq!(
            inactive_fee(remaining, 1095 + 365 * 300, snapshot, year_one),
            remaining
        );
    }

    #[test]
    fn test_transfer_fee_floor_rounding() {
        assert_eq!(transfer_fee(51_232_134_000, 10), 51_232_134);
        assert_eq!(transfer_fee(999, 10), 0);
        assert_eq!(transfer_fee(1000, 10), 1);
        assert_eq!(transfer_fee(5, 10), 0);
    }

    #[test]
    fn test_max_sendable_known_values() {
        assert_eq!(max_sendable(995, 10), 995);
        assert_eq!(max_sendable(123_456_789, 10), 123_333_456);
        assert_eq!(max_sendable(0, 10), 0);
    }

    #[test]
    fn test_max_sendable_fee_inclusive_total_never_overshoots() {
        for bps in 0..=10 {
            for balance in [1u64, 2, 999, 1000, 2001, 123_456_789, u64::MAX / 3] {
                let amount = max_sendable(balance, bps);
                let total = amount as u128 + transfer_fee(amount, bps) as u128;
                assert!(total <= balance as u128, "bps={} balance={}", bps, balance);
                // At most one residual unit
                assert!(balance as u128 - total <= 1, "bps={} balance={}", bps, balance);
            }
        }
    }

    #[test]
    fn test_max_sendable_zero_bps_is_identity() {
        assert_eq!(max_sendable(123_456_789, 0), 123_456_789);
    }
}
