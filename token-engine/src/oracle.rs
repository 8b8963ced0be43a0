//! Reserve oracle seam
//!
//! The oracle attests how much of the physical reserve is locked and
//! therefore how much supply may exist. The engine consumes only the
//! reported quantity (custody bookkeeping on the oracle side is not its
//! concern) and re-reads it on every mint, never caching across calls.

use account_ledger::Address;
use parking_lot::RwLock;
use std::sync::Arc;

use crate::{Error, Result};

/// External attester bounding total mintable supply
pub trait ReserveOracle {
    /// Reserve quantity currently locked, in smallest token units.
    ///
    /// `consumer` identifies the ledger asking; implementations may
    /// restrict which address is allowed to consume the attestation.
    fn locked_quantity(&self, consumer: &Address) -> Result<u64>;
}

/// In-process reserve vault
///
/// Tracks the attested locked quantity and the single ledger address
/// bound as its consumer.
#[derive(Debug, Default)]
pub struct ReserveVault {
    locked: u64,
    consumer: Option<Address>,
}

impl ReserveVault {
    /// Create an empty vault with nothing locked
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the ledger address allowed to consume the attestation
    pub fn bind_consumer(&mut self, consumer: Address) -> Result<()> {
        if consumer.is_null() {
            return Err(Error::NullAddress(
                "oracle consumer must not be null".to_string(),
            ));
        }
        self.consumer = Some(consumer);
        Ok(())
    }

    /// The bound consumer, if any
    pub fn consumer(&self) -> Option<&Address> {
        self.consumer.as_ref()
    }

    /// Attest additional locked reserve
    pub fn lock(&mut self, amount: u64) -> Result<u64> {
        self.locked = self.locked.checked_add(amount).ok_or_else(|| {
            Error::Oracle(format!("locking {} overflows the attested quantity", amount))
        })?;
        tracing::debug!(amount, locked = self.locked, "reserve locked");
        Ok(self.locked)
    }

    /// Release previously attested reserve
    pub fn unlock(&mut self, amount: u64) -> Result<u64> {
        self.locked = self.locked.checked_sub(amount).ok_or_else(|| {
            Error::Oracle(format!(
                "cannot unlock {} of {} attested",
                amount, self.locked
            ))
        })?;
        tracing::debug!(amount, locked = self.locked, "reserve unlocked");
        Ok(self.locked)
    }

    /// Attested locked quantity
    pub fn locked(&self) -> u64 {
        self.locked
    }

    fn quantity_for(&self, consumer: &Address) -> Result<u64> {
        match &self.consumer {
            Some(bound) if bound == consumer => Ok(self.locked),
            Some(_) => Err(Error::Oracle(format!(
                "{} is not the bound oracle consumer",
                consumer
            ))),
            None => Err(Error::Oracle("no oracle consumer bound".to_string())),
        }
    }
}

/// Cloneable handle over a [`ReserveVault`]
///
/// Lets an operator (or a test) adjust the vault while the engine holds
/// its own handle as the oracle.
#[derive(Debug, Clone, Default)]
pub struct SharedVault(Arc<RwLock<ReserveVault>>);

impl SharedVault {
    /// Create a handle over an empty vault
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the consuming ledger address
    pub fn bind_consumer(&self, consumer: Address) -> Result<()> {
        self.0.write().bind_consumer(consumer)
    }

    /// Attest additional locked reserve
    pub fn lock(&self, amount: u64) -> Result<u64> {
        self.0.write().lock(amount)
    }

    /// Release previously attested reserve
    pub fn unlock(&self, amount: u64) -> Result<u64> {
        self.0.write().unlock(amount)
    }

    /// Attested locked quantity, unauthenticated (operator view)
    pub fn locked(&self) -> u64 {
        self.0.read().locked()
    }
}

impl ReserveOracle for SharedVault {
    fn locked_quantity(&self, consumer: &Address) -> Result<u64> {
        self.0.read().quantity_for(consumer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_and_unlock() {
        let mut vault = ReserveVault::new();
        vault.lock(1000).unwrap();
        vault.lock(1000).unwrap();
        assert_eq!(vault.locked(), 2000);
        vault.unlock(500).unwrap();
        assert_eq!(vault.locked(), 1500);
        assert!(vault.unlock(5000).is_err());
        assert_eq!(vault.locked(), 1500);
    }

    #[test]
    fn test_consumer_authorization() {
        let vault = SharedVault::new();
        vault.lock(1000).unwrap();

        let ledger = Address::new("ledger");
        let stranger = Address::new("stranger");

        // Nothing bound yet
        assert!(vault.locked_quantity(&ledger).is_err());

        vault.bind_consumer(ledger.clone()).unwrap();
        assert_eq!(vault.locked_quantity(&ledger).unwrap(), 1000);
        assert!(vault.locked_quantity(&stranger).is_err());
    }

    #[test]
    fn test_null_consumer_rejected() {
        let vault = SharedVault::new();
        assert!(vault.bind_consumer(Address::null()).is_err());
    }
}
