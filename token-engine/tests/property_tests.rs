//! Property-based tests for engine invariants
//!
//! Random operation sequences against a live engine must preserve:
//! - Conservation: Σ(balances) == total supply at every observation point
//! - The snapshot invariant: a positive snapshot exists iff inactive
//! - View consistency: `balance_of` never exceeds the raw balance

use account_ledger::{AccountStatus, Address, UNITS_PER_TOKEN};
use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use token_engine::{Config, SharedVault, TokenEngine};

const TOKEN: u64 = UNITS_PER_TOKEN;

#[derive(Debug, Clone)]
enum Op {
    /// Owner adds backed supply
    Mint(u64),
    /// Holder-to-holder transfer (may legally fail)
    Transfer { from: usize, to: usize, amount: u64 },
    /// Zero self-transfer: pay own storage fee
    PayStorage(usize),
    /// Enforcer settles a target (may legally fail)
    ForcePay(usize),
    /// Anyone tries to mark a target inactive (may legally fail)
    MarkInactive(usize),
    /// Let whole days pass
    Advance(u64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1u64..10_000 * TOKEN).prop_map(Op::Mint),
        (0usize..4, 0usize..4, 0u64..2000 * TOKEN)
            .prop_map(|(from, to, amount)| Op::Transfer { from, to, amount }),
        (0usize..4).prop_map(Op::PayStorage),
        (0usize..4).prop_map(Op::ForcePay),
        (0usize..4).prop_map(Op::MarkInactive),
        (1u64..800).prop_map(Op::Advance),
    ]
}

fn holders() -> [Address; 4] {
    [
        Address::new("holder-a"),
        Address::new("holder-b"),
        Address::new("holder-c"),
        Address::new("holder-d"),
    ]
}

fn build_engine() -> TokenEngine<SharedVault> {
    let vault = SharedVault::new();
    vault.lock(8_133_525_786 * TOKEN).unwrap();
    let config = Config::default();
    vault
        .bind_consumer(config.roles.engine_address.clone())
        .unwrap();
    TokenEngine::new(config, vault).unwrap()
}

fn t0() -> DateTime<Utc> {
    Utc.timestamp_opt(1_600_000_000, 0).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: no operation sequence breaks conservation or the
    /// snapshot invariant
    #[test]
    fn prop_conservation_under_random_operations(
        ops in prop::collection::vec(op_strategy(), 1..48)
    ) {
        let mut engine = build_engine();
        let holders = holders();
        let owner = engine.roles().owner.clone();
        let enforcer = engine.roles().fee_enforcer.clone();
        let treasury = engine.roles().backed_treasury.clone();
        let mut now = t0();

        // Seed every holder so transfers have something to move
        engine.mint(&owner, 50_000 * TOKEN, now).unwrap();
        for holder in &holders {
            engine.transfer(&treasury, holder, 5_000 * TOKEN, now).unwrap();
        }

        for op in ops {
            // Individual operations may fail on routing, balances, or
            // preconditions; failures must be clean aborts
            match op {
                Op::Mint(amount) => {
                    let _ = engine.mint(&owner, amount, now);
                }
                Op::Transfer { from, to, amount } => {
                    let _ = engine.transfer(&holders[from], &holders[to], amount, now);
                }
                Op::PayStorage(who) => {
                    let _ = engine.transfer(&holders[who], &holders[who], 0, now);
                }
                Op::ForcePay(who) => {
                    let _ = engine.force_pay_fees(&enforcer, &holders[who], now);
                }
                Op::MarkInactive(who) => {
                    let _ = engine.set_account_inactive(&holders[who], now);
                }
                Op::Advance(days) => {
                    now = now + Duration::days(days as i64);
                }
            }

            prop_assert!(engine.check_conservation(), "conservation broken by {:?}", op);
        }

        // Snapshot invariant and view consistency at the end
        for (addr, account) in engine.ledger().accounts() {
            match account.status {
                AccountStatus::Inactive { snapshot, .. } => {
                    prop_assert!(snapshot > 0, "{} inactive with empty snapshot", addr);
                }
                AccountStatus::Active => {}
            }
            prop_assert!(engine.balance_of(addr, now) <= account.balance);
        }
    }

    /// Property: a simulation never mutates state and always matches the
    /// transfer executed right after it
    #[test]
    fn prop_simulation_is_pure_and_faithful(
        amount in 0u64..3_000 * TOKEN,
        days in 0u64..2000,
    ) {
        let mut engine = build_engine();
        let owner = engine.roles().owner.clone();
        let treasury = engine.roles().backed_treasury.clone();
        let alice = Address::new("alice");
        let bob = Address::new("bob");

        engine.mint(&owner, 10_000 * TOKEN, t0()).unwrap();
        engine.transfer(&treasury, &alice, 3_000 * TOKEN, t0()).unwrap();
        engine.transfer(&treasury, &bob, 1_000 * TOKEN, t0()).unwrap();

        let at = t0() + Duration::days(days as i64);
        let alice_before = engine.balance_of_no_fees(&alice);
        let bob_before = engine.balance_of_no_fees(&bob);

        let sim = engine.simulate_transfer(&alice, &bob, amount, at);

        // Pure: simulating changed nothing
        prop_assert_eq!(engine.balance_of_no_fees(&alice), alice_before);
        prop_assert_eq!(engine.balance_of_no_fees(&bob), bob_before);

        let real = engine.transfer(&alice, &bob, amount, at);
        match (sim, real) {
            (Ok(sim), Ok(receipt)) => {
                prop_assert_eq!(sim.from_fee, receipt.from_fee);
                prop_assert_eq!(sim.to_fee, receipt.to_fee);
                prop_assert_eq!(sim.transfer_fee, receipt.transfer_fee);
                prop_assert_eq!(engine.balance_of_no_fees(&alice), sim.from_balance);
                prop_assert_eq!(engine.balance_of_no_fees(&bob), sim.to_balance);
            }
            (Err(_), Err(_)) => {
                // Both rejected: state must be untouched
                prop_assert_eq!(engine.balance_of_no_fees(&alice), alice_before);
                prop_assert_eq!(engine.balance_of_no_fees(&bob), bob_before);
            }
            (sim, real) => {
                prop_assert!(
                    false,
                    "simulation and execution disagreed: {:?} vs {:?}",
                    sim.map(|s| s.from_balance),
                    real.map(|r| r.transfer_fee)
                );
            }
        }
    }
}
