//! Fee-schedule simulator binary
//!
//! Replays a scripted multi-year holding scenario against an in-process
//! engine and prints the resulting balances and collected fees. Useful
//! for sanity-checking a fee configuration before deployment.

use account_ledger::{Address, UNITS_PER_TOKEN};
use anyhow::Context;
use chrono::{DateTime, Duration, TimeZone, Utc};
use token_engine::{Config, SharedVault, TokenEngine};

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting fee-schedule simulator");

    // Load configuration (file path via arg, defaults otherwise)
    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_file(&path).with_context(|| format!("loading {}", path))?,
        None => Config::default(),
    };

    let vault = SharedVault::new();
    vault.lock(1_000_000 * UNITS_PER_TOKEN)?;
    vault.bind_consumer(config.roles.engine_address.clone())?;

    let owner = config.roles.owner.clone();
    let treasury = config.roles.backed_treasury.clone();
    let collector = config.roles.fee_collector.clone();
    let enforcer = config.roles.fee_enforcer.clone();
    let mut engine = TokenEngine::new(config, vault.clone())?;

    let start: DateTime<Utc> = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    let holder = Address::new("holder-1");
    let dormant = Address::new("holder-2");

    engine.mint(&owner, 100_000 * UNITS_PER_TOKEN, start)?;
    engine.transfer(&treasury, &holder, 10_000 * UNITS_PER_TOKEN, start)?;
    engine.transfer(&treasury, &dormant, 1_000 * UNITS_PER_TOKEN, start)?;

    // holder-1 pays storage every quarter for three years; holder-2 sleeps
    let mut now = start;
    for quarter in 1..=12 {
        now = start + Duration::days(91 * quarter);
        engine.transfer(&holder, &holder, 0, now)?;
    }

    // Five more years of silence push holder-2 deep into the inactive regime
    now = start + Duration::days(365 * 8);
    if let Err(e) = engine.force_pay_fees(&enforcer, &dormant, now) {
        tracing::warn!("forced settlement skipped: {e}");
    }

    let summary = serde_json::json!({
        "at": now.to_rfc3339(),
        "total_supply": engine.total_supply(),
        "total_circulation": engine.total_circulation(),
        "holder_1_balance": engine.balance_of(&holder, now),
        "holder_2_balance": engine.balance_of(&dormant, now),
        "holder_2_inactive": engine.is_inactive(&dormant),
        "fees_collected": engine.balance_of_no_fees(&collector),
        "conservation_holds": engine.check_conservation(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    tracing::info!("Simulation complete");
    Ok(())
}
