//! Fee configuration for the account ledger

use serde::{Deserialize, Serialize};

use crate::types::{MAX_TRANSFER_FEE_BPS, UNITS_PER_TOKEN};

/// Fee configuration
///
/// Storage and inactivity rates are protocol constants (see
/// [`crate::types`]); only the knobs an owner may turn at runtime live
/// here. The grace period is a process-wide default that accounts capture
/// when their storage clock is established, never a live reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeConfig {
    /// Transfer fee in basis points, charged to the sender on top of the
    /// transferred amount. Capped at [`MAX_TRANSFER_FEE_BPS`].
    pub transfer_fee_basis_points: u64,

    /// Fee-free days granted to a balance from the moment its storage
    /// clock is established
    pub storage_fee_grace_period_days: u64,

    /// Hard ceiling on total supply, in whole tokens
    pub supply_cap_tokens: u64,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            transfer_fee_basis_points: 10,      // 10 bps
            storage_fee_grace_period_days: 0,
            supply_cap_tokens: 8_133_525_786,   // attested reserve ceiling
        }
    }
}

impl FeeConfig {
    /// Supply cap in smallest units
    pub fn supply_cap_units(&self) -> u64 {
        self.supply_cap_tokens.saturating_mul(UNITS_PER_TOKEN)
    }

    /// Validate invariants
    pub fn validate(&self) -> crate::Result<()> {
        if self.transfer_fee_basis_points > MAX_TRANSFER_FEE_BPS {
            return Err(crate::Error::Config(format!(
                "Transfer fee {} bps exceeds maximum {}",
                self.transfer_fee_basis_points, MAX_TRANSFER_FEE_BPS
            )));
        }
        Ok(())
    }

    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: FeeConfig = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FeeConfig::default();
        assert_eq!(config.transfer_fee_basis_points, 10);
        assert_eq!(config.storage_fee_grace_period_days, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_transfer_fee_cap_enforced() {
        let config = FeeConfig {
            transfer_fee_basis_points: 11,
            ..FeeConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fees.toml");
        std::fs::write(
            &path,
            "transfer_fee_basis_points = 5\nstorage_fee_grace_period_days = 30\nsupply_cap_tokens = 1000000\n",
        )
        .unwrap();

        let config = FeeConfig::from_file(&path).unwrap();
        assert_eq!(config.transfer_fee_basis_points, 5);
        assert_eq!(config.storage_fee_grace_period_days, 30);
        assert_eq!(config.supply_cap_units(), 1_000_000 * UNITS_PER_TOKEN);
    }
}
