//! Selector configuration stored in TOML format
//!
//! A [`SelectorConfig`] names the fee rate, the change destination, the spending-script
//! profile, the dust policy and the logging setup. Every field except the change
//! destination has a default.
//!
//! ```toml
//! fee_rate = "2.5"
//! change_destination = "bc1q..."
//!
//! [profile]
//! script_type = "p2sh-p2wsh"
//! signatures = 2
//!
//! [dust]
//! multiplier = "1.1"
//! reference_fee_rate = "1"
//! # threshold = 546   # fixed threshold, overrides the derived one
//!
//! [logging]
//! level = "Info"
//! ```

use crate::error::SelectorResult;
use crate::logging::{log_event, log_params, sanitize_for_logging, LogConfig, LogContext, LogLevel};
use crate::math::Satoshi;
use crate::types::{FeeRate, TxOutput, DEFAULT_DUST_MULTIPLIER};
use crate::utxo_selection::{CostModel, DustPolicy, ScriptType, SelectorProps, Utxo, UtxoSelector};
use anyhow::{anyhow, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectorConfig {
    /// Satoshis per virtual byte
    #[serde(default = "default_fee_rate")]
    pub fee_rate: FeeRate,

    pub change_destination: String,

    #[serde(default)]
    pub profile: ProfileConfig,

    #[serde(default)]
    pub dust: DustConfig,

    #[serde(default)]
    pub logging: LogConfig,
}

/// Which cost profile to price inputs with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileConfig {
    #[serde(default = "default_script_type")]
    pub script_type: ScriptType,

    /// Signature threshold `m`, multisig profiles only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signatures: Option<u8>,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            script_type: default_script_type(),
            signatures: None,
        }
    }
}

/// Dust threshold settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DustConfig {
    #[serde(default = "default_dust_multiplier")]
    pub multiplier: Decimal,

    #[serde(default = "default_fee_rate")]
    pub reference_fee_rate: FeeRate,

    /// Fixed threshold in satoshis; takes precedence over the derived one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<u64>,
}

impl Default for DustConfig {
    fn default() -> Self {
        Self {
            multiplier: default_dust_multiplier(),
            reference_fee_rate: default_fee_rate(),
            threshold: None,
        }
    }
}

impl DustConfig {
    pub fn policy(&self) -> DustPolicy {
        match self.threshold {
            Some(sats) => DustPolicy::Fixed(Satoshi::from_sat(sats)),
            None => DustPolicy::Derived {
                multiplier: self.multiplier,
                reference_rate: self.reference_fee_rate,
            },
        }
    }
}

impl SelectorConfig {
    /// Default settings paying change to `change_destination`
    pub fn new(change_destination: impl Into<String>) -> Self {
        Self {
            fee_rate: default_fee_rate(),
            change_destination: change_destination.into(),
            profile: ProfileConfig::default(),
            dust: DustConfig::default(),
            logging: LogConfig::default(),
        }
    }

    /// Load and validate configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path.display(), e))?;

        let config = Self::from_toml_str(&content)?;

        log_event(
            LogLevel::Debug,
            LogContext::Config,
            "configuration loaded",
            Some(log_params(vec![
                ("path", path.display().to_string()),
                ("fee_rate", config.fee_rate.to_string()),
                ("script_type", config.profile.script_type.to_string()),
                ("change_destination", sanitize_for_logging(&config.change_destination)),
            ])),
        );

        Ok(config)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SelectorConfig =
            toml::from_str(content).map_err(|e| anyhow!("Failed to parse config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| anyhow!("Failed to serialize config: {}", e))
    }

    /// Save configuration to file, creating parent directories as needed
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = self.to_toml_string()?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .map_err(|e| anyhow!("Failed to create config directory: {}", e))?;
            }
        }

        fs::write(path, content)
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path.display(), e))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.change_destination.trim().is_empty() {
            return Err(anyhow!("Invalid change destination: must not be empty"));
        }

        if self.dust.multiplier.is_sign_negative() {
            anyhow::bail!("Invalid dust multiplier: {}", self.dust.multiplier);
        }

        if !self.profile.script_type.is_multisig() && self.profile.signatures.is_some() {
            anyhow::bail!(
                "Invalid profile: {} does not take a signature threshold",
                self.profile.script_type
            );
        }

        self.cost_model()
            .map_err(|e| anyhow!("Invalid profile: {}", e))?;

        Ok(())
    }

    pub fn fee_rate(&self) -> FeeRate {
        self.fee_rate
    }

    /// Cost model for the configured profile and dust policy
    pub fn cost_model(&self) -> SelectorResult<CostModel> {
        let model = CostModel::for_script(self.profile.script_type, self.profile.signatures)?;
        Ok(model.with_dust_policy(self.dust.policy()))
    }

    /// Request props for one selection under this configuration
    pub fn selector_props(&self, utxos: Vec<Utxo>, outputs: Vec<TxOutput>) -> SelectorProps {
        SelectorProps::new(utxos, outputs, self.fee_rate, self.change_destination.clone())
    }

    /// Selector for one request under this configuration
    pub fn selector(&self, utxos: Vec<Utxo>, outputs: Vec<TxOutput>) -> SelectorResult<UtxoSelector> {
        UtxoSelector::new(self.selector_props(utxos, outputs), self.cost_model()?)
    }
}

// Default value functions

fn default_fee_rate() -> FeeRate {
    FeeRate::ONE_SAT_PER_VB
}

fn default_script_type() -> ScriptType {
    ScriptType::P2wpkh
}

fn default_dust_multiplier() -> Decimal {
    DEFAULT_DUST_MULTIPLIER
}
