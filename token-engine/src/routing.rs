//! Role addresses and transfer-flow legality
//!
//! Addresses fall into five classes: backed treasury, unbacked (float)
//! treasury, fee collector, redemption sink, and external. The float
//! treasury holds value that is not yet reserve-backed, so flow in and
//! out of it is tightly restricted; the redemption sink only feeds the
//! treasuries.

use account_ledger::Address;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// The engine's role addresses, fixed at construction and owner-mutable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Roles {
    /// Contract owner: configuration and minting
    pub owner: Address,

    /// Sole address allowed to force fee settlement
    pub fee_enforcer: Address,

    /// Treasury holding reserve-backed supply
    pub backed_treasury: Address,

    /// Float treasury: may hold unbacked supply awaiting backing
    pub unbacked_treasury: Address,

    /// Collector credited with every realized fee
    pub fee_collector: Address,

    /// Sink receiving tokens surrendered for physical redemption
    pub redemption_sink: Address,

    /// The ledger's own address; never a legal transfer destination
    pub engine_address: Address,
}

impl Roles {
    /// Validate role constraints: no null addresses, and the float
    /// treasury may not coincide with the backed treasury, fee collector,
    /// or redemption sink.
    pub fn validate(&self) -> Result<()> {
        for (name, addr) in [
            ("owner", &self.owner),
            ("fee_enforcer", &self.fee_enforcer),
            ("backed_treasury", &self.backed_treasury),
            ("unbacked_treasury", &self.unbacked_treasury),
            ("fee_collector", &self.fee_collector),
            ("redemption_sink", &self.redemption_sink),
            ("engine_address", &self.engine_address),
        ] {
            if addr.is_null() {
                return Err(Error::NullAddress(format!("{} must not be null", name)));
            }
        }
        for (name, addr) in [
            ("backed_treasury", &self.backed_treasury),
            ("fee_collector", &self.fee_collector),
            ("redemption_sink", &self.redemption_sink),
        ] {
            if *addr == self.unbacked_treasury {
                return Err(Error::DuplicateRole(format!(
                    "{} must not equal the unbacked treasury",
                    name
                )));
            }
        }
        Ok(())
    }

    /// All fee-exempt role addresses
    pub fn exempt_addresses(&self) -> [&Address; 6] {
        [
            &self.owner,
            &self.fee_enforcer,
            &self.backed_treasury,
            &self.unbacked_treasury,
            &self.fee_collector,
            &self.redemption_sink,
        ]
    }

    /// Check a transfer route for legality.
    ///
    /// Rules:
    /// - only the backed treasury and the redemption sink may feed the
    ///   float treasury
    /// - only the float treasury and the redemption sink may feed the
    ///   backed treasury
    /// - the float treasury may send nowhere but the backed treasury
    /// - the redemption sink may send nowhere but the treasuries
    /// - the destination may not be the null address or the ledger itself
    pub fn check_transfer_route(&self, from: &Address, to: &Address) -> Result<()> {
        if to.is_null() {
            return Err(Error::NullAddress(
                "cannot transfer to the null address".to_string(),
            ));
        }
        if *to == self.engine_address {
            return Err(Error::RoutingViolation(
                "cannot transfer to the ledger's own address".to_string(),
            ));
        }
        if *to == self.unbacked_treasury
            && *from != self.backed_treasury
            && *from != self.redemption_sink
        {
            return Err(Error::RoutingViolation(format!(
                "{} may not send to the unbacked treasury",
                from
            )));
        }
        if *to == self.backed_treasury
            && *from != self.unbacked_treasury
            && *from != self.redemption_sink
        {
            return Err(Error::RoutingViolation(format!(
                "{} may not send to the backed treasury",
                from
            )));
        }
        if *from == self.unbacked_treasury && *to != self.backed_treasury {
            return Err(Error::RoutingViolation(format!(
                "the unbacked treasury may only send to the backed treasury, not {}",
                to
            )));
        }
        if *from == self.redemption_sink
            && *to != self.backed_treasury
            && *to != self.unbacked_treasury
        {
            return Err(Error::RoutingViolation(format!(
                "the redemption sink may only send to the treasuries, not {}",
                to
            )));
        }
        Ok(())
    }
}
