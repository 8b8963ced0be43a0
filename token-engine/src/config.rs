//! Configuration for the token engine

use account_ledger::{Address, FeeConfig};
use serde::{Deserialize, Serialize};

use crate::routing::Roles;

/// Token engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Role addresses
    pub roles: RoleConfig,

    /// Fee configuration
    pub fees: FeeConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "token-engine".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            roles: RoleConfig::default(),
            fees: FeeConfig::default(),
        }
    }
}

/// Role address configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleConfig {
    /// Contract owner
    pub owner: Address,

    /// Forced-settlement enforcer (distinct single-key role)
    pub fee_enforcer: Address,

    /// Reserve-backed treasury
    pub backed_treasury: Address,

    /// Float treasury (may hold unbacked supply)
    pub unbacked_treasury: Address,

    /// Fee collector
    pub fee_collector: Address,

    /// Redemption sink
    pub redemption_sink: Address,

    /// The ledger's own address
    pub engine_address: Address,
}

impl Default for RoleConfig {
    fn default() -> Self {
        Self {
            owner: Address::new("owner"),
            fee_enforcer: Address::new("fee-enforcer"),
            backed_treasury: Address::new("treasury-backed"),
            unbacked_treasury: Address::new("treasury-float"),
            fee_collector: Address::new("fee-collector"),
            redemption_sink: Address::new("redemption-sink"),
            engine_address: Address::new("token-ledger"),
        }
    }
}

impl RoleConfig {
    /// Convert into validated engine roles
    pub fn into_roles(self) -> crate::Result<Roles> {
        let roles = Roles {
            owner: self.owner,
            fee_enforcer: self.fee_enforcer,
            backed_treasury: self.backed_treasury,
            unbacked_treasury: self.unbacked_treasury,
            fee_collector: self.fee_collector,
            redemption_sink: self.redemption_sink,
            engine_address: self.engine_address,
        };
        roles.validate()?;
        Ok(roles)
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(owner) = std::env::var("TOKEN_ENGINE_OWNER") {
            config.roles.owner = Address::new(owner);
        }

        if let Ok(enforcer) = std::env::var("TOKEN_ENGINE_ENFORCER") {
            config.roles.fee_enforcer = Address::new(enforcer);
        }

        if let Ok(bps) = std::env::var("TOKEN_ENGINE_TRANSFER_FEE_BPS") {
            config.fees.transfer_fee_basis_points = bps
                .parse()
                .map_err(|e| crate::Error::Config(format!("Bad transfer fee bps: {}", e)))?;
        }

        Ok(config)
    }
}
