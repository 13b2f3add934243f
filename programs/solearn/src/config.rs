//! JSON configuration files.
//!
//! Identities are base58 strings; every other field mirrors
//! [`ProtocolConfig`]. Omitted optional fields take the protocol defaults.

use crate::errors::SolearnError;
use crate::state::{DaoTokenPercentage, ProtocolConfig};
use anchor_lang::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaoTokenPercentageFile {
    pub miner: u16,
    pub user: u16,
    pub referrer: u16,
    pub referee: u16,
    pub l2_owner: u16,
}

impl From<DaoTokenPercentageFile> for DaoTokenPercentage {
    fn from(file: DaoTokenPercentageFile) -> Self {
        Self {
            miner: file.miner,
            user: file.user,
            referrer: file.referrer,
            referee: file.referee,
            l2_owner: file.l2_owner,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub admin: String,
    pub treasury: String,
    /// Defaults to the treasury
    #[serde(default)]
    pub l2_owner: Option<String>,
    #[serde(default)]
    pub miner_minimum_stake: Option<u64>,
    #[serde(default)]
    pub min_fee_to_use: Option<u64>,
    #[serde(default)]
    pub miner_requirement: Option<u8>,
    #[serde(default)]
    pub submit_duration: Option<u64>,
    #[serde(default)]
    pub commit_duration: Option<u64>,
    #[serde(default)]
    pub reveal_duration: Option<u64>,
    #[serde(default)]
    pub unstake_delay: Option<u64>,
    #[serde(default)]
    pub penalty_duration: Option<u64>,
    #[serde(default)]
    pub fine_percentage: Option<u16>,
    #[serde(default)]
    pub fee_l2_percentage: Option<u16>,
    #[serde(default)]
    pub fee_treasury_percentage: Option<u16>,
    #[serde(default)]
    pub fee_ratio_miner_validator: Option<u16>,
    #[serde(default)]
    pub dao_token_reward: Option<u64>,
    #[serde(default)]
    pub dao_token_percentage: Option<DaoTokenPercentageFile>,
    #[serde(default)]
    pub epoch_duration: Option<u64>,
    #[serde(default)]
    pub reward_per_epoch: Option<u64>,
}

fn parse_pubkey(field: &str, value: &str) -> Result<Pubkey> {
    Pubkey::from_str(value).map_err(|_| {
        warn!(field, value, "invalid base58 identity in config");
        SolearnError::ConfigInvalid.into()
    })
}

impl TryFrom<ConfigFile> for ProtocolConfig {
    type Error = anchor_lang::error::Error;

    fn try_from(file: ConfigFile) -> Result<Self> {
        let admin = parse_pubkey("admin", &file.admin)?;
        let treasury = parse_pubkey("treasury", &file.treasury)?;
        let l2_owner = match &file.l2_owner {
            Some(value) => parse_pubkey("l2_owner", value)?,
            None => treasury,
        };

        let mut config = ProtocolConfig::with_admin(admin, treasury, l2_owner);
        macro_rules! apply {
            ($($field:ident),*) => {
                $(if let Some(value) = file.$field {
                    config.$field = value;
                })*
            };
        }
        apply!(
            miner_minimum_stake,
            min_fee_to_use,
            miner_requirement,
            submit_duration,
            commit_duration,
            reveal_duration,
            unstake_delay,
            penalty_duration,
            fine_percentage,
            fee_l2_percentage,
            fee_treasury_percentage,
            fee_ratio_miner_validator,
            dao_token_reward,
            epoch_duration,
            reward_per_epoch
        );
        if let Some(percentage) = file.dao_token_percentage {
            config.dao_token_percentage = percentage.into();
        }

        config.validate()?;
        Ok(config)
    }
}

impl ProtocolConfig {
    /// Parses and validates a JSON [`ConfigFile`].
    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: ConfigFile = serde_json::from_str(json).map_err(|e| {
            warn!(error = %e, "malformed config file");
            SolearnError::ConfigInvalid
        })?;
        Self::try_from(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADMIN: &str = "7MHr6ZPGTWZkRk6m52GfEWoMxSV7EoDjYyoXAYf3MBwS";
    const TREASURY: &str = "11111111111111111111111111111111";

    #[test]
    fn test_minimal_file_uses_defaults() {
        let json = format!(r#"{{"admin": "{ADMIN}", "treasury": "{TREASURY}"}}"#);
        let config = ProtocolConfig::from_json_str(&json).unwrap();
        assert_eq!(config.admin.to_string(), ADMIN);
        assert_eq!(config.l2_owner, config.treasury);
        assert_eq!(
            config,
            ProtocolConfig::with_admin(config.admin, config.treasury, config.treasury)
        );
    }

    #[test]
    fn test_overrides_applied() {
        let json = format!(
            r#"{{
                "admin": "{ADMIN}",
                "treasury": "{TREASURY}",
                "miner_requirement": 5,
                "fine_percentage": 2500,
                "dao_token_reward": 77,
                "reward_per_epoch": 5,
                "dao_token_percentage": {{
                    "miner": 1000, "user": 1000, "referrer": 1000,
                    "referee": 1000, "l2_owner": 1000
                }}
            }}"#
        );
        let config = ProtocolConfig::from_json_str(&json).unwrap();
        assert_eq!(config.miner_requirement, 5);
        assert_eq!(config.fine_percentage, 2500);
        assert_eq!(config.dao_token_reward, 77);
        assert_eq!(config.reward_per_epoch, 5);
        assert_eq!(config.dao_token_percentage.l2_owner, 1000);
    }

    #[test]
    fn test_invalid_pubkey_rejected() {
        let json = format!(r#"{{"admin": "not-a-key", "treasury": "{TREASURY}"}}"#);
        assert_eq!(
            ProtocolConfig::from_json_str(&json).unwrap_err(),
            SolearnError::ConfigInvalid.into()
        );
    }

    #[test]
    fn test_out_of_range_percentage_rejected() {
        let json = format!(
            r#"{{"admin": "{ADMIN}", "treasury": "{TREASURY}", "fee_treasury_percentage": 10001}}"#
        );
        assert!(ProtocolConfig::from_json_str(&json).is_err());
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(ProtocolConfig::from_json_str("{").is_err());
    }
}
