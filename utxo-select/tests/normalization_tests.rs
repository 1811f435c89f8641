//! Resolving candidate values from witness outputs and prior transactions


use bitcoin::consensus::serialize;
use test_utils::*;
use utxo_select::types::MAX_BITCOIN_SUPPLY;
use utxo_select::{CostModel, SelectorError, SelectorProps, UtxoSelector, Utxo, WitnessUtxo};

fn build(utxos: Vec<Utxo>) -> Result<UtxoSelector, SelectorError> {
    setup();
    let props = SelectorProps::new(utxos, payments(&[1_000]), rate(1), "change-address");
    UtxoSelector::new(props, CostModel::p2wpkh())
}

#[test]
fn test_witness_candidate_used_as_is() {
    let selector = build(witness_pool(&[8_000])).unwrap();
    let input = &selector.normalized_inputs()[0];
    assert_eq!(input.value, sats(8_000));
    assert_eq!(input.script_pubkey, p2wpkh_script(0));
    assert!(input.prior_transaction.is_none());
}

#[test]
fn test_prior_transaction_resolves_value_and_script() {
    let tx = prior_transaction(&[3_000, 7_000]);
    let selector = build(vec![Utxo::from_prior_transaction(1, serialize(&tx))]).unwrap();

    let input = &selector.normalized_inputs()[0];
    assert_eq!(input.value, sats(7_000));
    assert_eq!(input.script_pubkey, p2wpkh_script(1));
    assert_eq!(input.outpoint.txid, tx.txid());
    assert_eq!(input.prior_transaction.as_ref(), Some(&tx));
}

#[test]
fn test_prior_transaction_from_hex() {
    let tx = prior_transaction(&[4_000]);
    let utxo = Utxo::from_prior_transaction_hex(0, &hex::encode(serialize(&tx))).unwrap();
    let selector = build(vec![utxo]).unwrap();
    assert_eq!(selector.normalized_inputs()[0].value, sats(4_000));

    assert!(Utxo::from_prior_transaction_hex(0, "not hex").is_err());
}

#[test]
fn test_prior_transaction_wins_over_witness() {
    let tx = prior_transaction(&[9_000]);
    let utxo = Utxo::from_prior_transaction(0, serialize(&tx)).with_witness_utxo(WitnessUtxo {
        script_pubkey: p2wpkh_script(9),
        value: sats(1),
    });
    let selector = build(vec![utxo]).unwrap();
    assert_eq!(selector.normalized_inputs()[0].value, sats(9_000));
}

#[test]
fn test_candidate_without_value_is_discarded() {
    let mut utxos = witness_pool(&[8_000, 9_000]);
    utxos.insert(1, Utxo::new(Some(txid(42)), 3));
    assert!(!utxos[1].has_value_source());
    assert!(utxos[0].has_value_source());
    assert_eq!(utxos[1].normalize().unwrap(), None);

    let selector = build(utxos).unwrap();
    let normalized = selector.normalized_inputs();
    assert_eq!(normalized.len(), 2);
    assert_eq!(normalized[0].value, sats(8_000));
    assert_eq!(normalized[1].value, sats(9_000));
}

#[test]
fn test_unresolvable_prior_transaction_is_rejected() {
    let tx = prior_transaction(&[5_000]);

    let out_of_range = Utxo::from_prior_transaction(1, serialize(&tx));
    assert!(matches!(build(vec![out_of_range]), Err(SelectorError::InvalidConfiguration(_))));

    let garbage = Utxo::from_prior_transaction(0, vec![0xde, 0xad, 0xbe, 0xef]);
    assert!(matches!(build(vec![garbage]), Err(SelectorError::InvalidConfiguration(_))));

    let wrong_txid = Utxo::from_prior_transaction(0, serialize(&tx)).with_txid(txid(7));
    assert!(matches!(build(vec![wrong_txid]), Err(SelectorError::InvalidConfiguration(_))));

    let right_txid = Utxo::from_prior_transaction(0, serialize(&tx)).with_txid(tx.txid());
    assert!(build(vec![right_txid]).is_ok());
}

#[test]
fn test_witness_candidate_needs_txid() {
    let utxo = Utxo::new(None, 0).with_witness_utxo(WitnessUtxo {
        script_pubkey: p2wpkh_script(0),
        value: sats(5_000),
    });
    assert!(matches!(build(vec![utxo]), Err(SelectorError::InvalidConfiguration(_))));
}

#[test]
fn test_scripts_pass_through() {
    let redeem = p2wpkh_script(0xaa);
    let witness = p2wpkh_script(0xbb);
    let utxo = witness_pool(&[6_000])
        .remove(0)
        .with_redeem_script(redeem.clone())
        .with_witness_script(witness.clone());

    let selector = build(vec![utxo]).unwrap();
    let input = &selector.input_utxos().unwrap()[0];
    assert_eq!(input.redeem_script.as_ref(), Some(&redeem));
    assert_eq!(input.witness_script.as_ref(), Some(&witness));
}

#[test]
fn test_values_beyond_bitcoin_supply_are_rejected() {
    let over_supply = MAX_BITCOIN_SUPPLY + 1;

    let witness = build(witness_pool(&[over_supply]));
    assert!(matches!(witness, Err(SelectorError::InvalidConfiguration(_))));

    let tx = prior_transaction(&[over_supply]);
    let prior = build(vec![Utxo::from_prior_transaction(0, serialize(&tx))]);
    assert!(matches!(prior, Err(SelectorError::InvalidConfiguration(_))));

    let at_supply = build(witness_pool(&[MAX_BITCOIN_SUPPLY])).unwrap();
    assert_eq!(at_supply.normalized_inputs()[0].value, sats(MAX_BITCOIN_SUPPLY));
}
