
use anyhow::Result;
use rust_decimal::Decimal;
use std::fs;
use tempfile::TempDir;
use test_utils::*;
use utxo_select::config::SelectorConfig;
use utxo_select::logging::LogLevel;
use utxo_select::{CostModel, DustPolicy, Satoshi, ScriptType};

// Helper function to create a temporary directory and config file for testing
fn setup_test_config(content: &str) -> (TempDir, std::path::PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("selector.toml");
    fs::write(&config_path, content).expect("Failed to write test config");
    assert!(config_path.exists(), "Failed to create config file");
    (temp_dir, config_path)
}

#[test]
fn test_load_full_config() -> Result<()> {
    let (_dir, path) = setup_test_config(
        r#"
        fee_rate = "2.5"
        change_destination = "bc1qchange"

        [profile]
        script_type = "p2sh-p2wsh"
        signatures = 2

        [dust]
        multiplier = "3"
        reference_fee_rate = "2"

        [logging]
        level = "Debug"
        include_timestamps = false
        "#,
    );

    let config = SelectorConfig::load(&path)?;
    assert_eq!(config.fee_rate.as_sat_per_vb(), Decimal::new(25, 1));
    assert_eq!(config.change_destination, "bc1qchange");
    assert_eq!(config.profile.script_type, ScriptType::P2shP2wsh);
    assert_eq!(config.profile.signatures, Some(2));
    assert_eq!(config.logging.level, LogLevel::Debug);
    assert!(!config.logging.include_timestamps);

    let model = config.cost_model()?;
    assert_eq!(model, CostModel::p2sh_p2wsh_multisig(2)?.with_dust_policy(config.dust.policy()));
    // (266 + 65) × 3, input and output priced at the 2 sat/vB reference
    assert_eq!(model.dust_threshold()?, Satoshi::from_sat(993));
    Ok(())
}

#[test]
fn test_minimal_config_uses_defaults() -> Result<()> {
    let config = SelectorConfig::from_toml_str(r#"change_destination = "bc1qchange""#)?;
    assert_eq!(config, SelectorConfig::new("bc1qchange"));
    assert_eq!(config.fee_rate(), rate(1));
    assert_eq!(config.cost_model()?, CostModel::p2wpkh());
    Ok(())
}

#[test]
fn test_fixed_dust_threshold() -> Result<()> {
    let config = SelectorConfig::from_toml_str(
        r#"
        change_destination = "bc1qchange"
        [dust]
        threshold = 546
        "#,
    )?;
    assert_eq!(config.dust.policy(), DustPolicy::Fixed(Satoshi::from_sat(546)));
    assert_eq!(config.cost_model()?.dust_threshold()?, Satoshi::from_sat(546));
    Ok(())
}

#[test]
fn test_invalid_configs_are_rejected() {
    // Missing change destination
    assert!(SelectorConfig::from_toml_str("fee_rate = \"1\"").is_err());

    // Zero fee rate
    assert!(SelectorConfig::from_toml_str(
        "fee_rate = \"0\"\nchange_destination = \"bc1qchange\""
    )
    .is_err());

    // Multisig without a threshold
    assert!(SelectorConfig::from_toml_str(
        "change_destination = \"bc1qchange\"\n[profile]\nscript_type = \"p2sh\""
    )
    .is_err());

    // Threshold out of range
    assert!(SelectorConfig::from_toml_str(
        "change_destination = \"bc1qchange\"\n[profile]\nscript_type = \"p2sh\"\nsignatures = 16"
    )
    .is_err());

    // Threshold on a single-key profile
    assert!(SelectorConfig::from_toml_str(
        "change_destination = \"bc1qchange\"\n[profile]\nscript_type = \"p2wpkh\"\nsignatures = 1"
    )
    .is_err());

    // Unknown script type
    assert!(SelectorConfig::from_toml_str(
        "change_destination = \"bc1qchange\"\n[profile]\nscript_type = \"p2tr\""
    )
    .is_err());
}

#[test]
fn test_save_and_reload() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("nested").join("selector.toml");

    let mut config = SelectorConfig::new("bc1qchange");
    config.fee_rate = rate(7);
    config.profile.script_type = ScriptType::P2sh;
    config.profile.signatures = Some(3);
    config.dust.threshold = Some(1_000);
    config.save(&path)?;

    let reloaded = SelectorConfig::load(&path)?;
    assert_eq!(reloaded, config);
    Ok(())
}

#[test]
fn test_load_missing_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let result = SelectorConfig::load(temp_dir.path().join("missing.toml"));
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("Failed to read config file"));
}

#[test]
fn test_selector_from_config() -> Result<()> {
    setup();
    let config = SelectorConfig::from_toml_str(
        r#"
        fee_rate = "1"
        change_destination = "bc1qchange"
        "#,
    )?;

    let selector = config.selector(witness_pool(&[10_000]), payments(&[5_000]))?;
    let change = selector.change_output()?.expect("change above dust");
    assert_eq!(change.destination, "bc1qchange");
    assert_eq!(change.value, Satoshi::from_sat(4_853));
    Ok(())
}
