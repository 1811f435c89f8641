//! Greedy UTXO selector with exact change settlement
//!
//! # Overview
//!
//! The fee of a transaction depends on how many inputs it has, and how many inputs are
//! needed depends on the fee. [`UtxoSelector`] resolves this in two passes:
//!
//! 1. A greedy pass picks inputs one at a time. Each round computes the shortfall between
//!    the requested output total and the value available so far (net of per-input cost),
//!    then takes the smallest unselected candidate that closes the gap on its own, or the
//!    largest remaining candidate when none does. After each pick, outputs are funded in
//!    order, each charged its value plus one output's cost. A synthetic placeholder output
//!    budgets for change from the start. The pass ends once every output including the
//!    placeholder is funded, or the pool is exhausted.
//! 2. A settlement pass recomputes the fee exactly from the selected set. Change that would
//!    exceed the dust threshold becomes an output; anything else is left to the fee.
//!
//! Both passes run once per selector, on first access, and the result is cached.
//!
//! # Usage
//!
//! ```
//! use utxo_select::utxo_selection::{CostModel, SelectorProps, UtxoSelector, Utxo};
//! use utxo_select::types::{FeeRate, TxOutput};
//! use utxo_select::math::Satoshi;
//! use bitcoin::{ScriptBuf, Txid};
//! use rust_decimal_macros::dec;
//! use std::str::FromStr;
//!
//! let txid = Txid::from_str("7967a5185e907a25225574544c31f7b059c1a191d65b53dcc1554d339c4f9efc").unwrap();
//! let props = SelectorProps::new(
//!     vec![Utxo::from_witness(txid, 0, Satoshi::from_sat(10_000), ScriptBuf::new())],
//!     vec![TxOutput::from_sat("payee", 9_741)],
//!     FeeRate::from_sat_per_vb(dec!(1)).unwrap(),
//!     "change",
//! );
//!
//! let selector = UtxoSelector::new(props, CostModel::p2wpkh()).unwrap();
//! assert_eq!(selector.change_value().unwrap(), Satoshi::from_sat(112));
//! assert_eq!(selector.outputs().unwrap().len(), 2);
//! assert_eq!(selector.fee().unwrap(), Satoshi::from_sat(147));
//! ```

use crate::error::{insufficient_funds, invalid_configuration, SelectorError, SelectorResult};
use crate::logging::{log_event, sanitize_for_logging, LogContext, LogLevel};
use crate::math::{RoundingStrategy, Satoshi};
use crate::types::{is_valid_bitcoin_value, FeeRate, TxOutput};
use crate::utxo_selection::cost_model::CostModel;
use crate::utxo_selection::types::{SelectionLog, SelectorProps, SpendableUtxo};
use log::debug;
use once_cell::sync::OnceCell;
use rust_decimal::Decimal;
use serde_json::json;

/// Downstream component that turns a selection into a transaction
///
/// The selector hands over its inputs and final outputs verbatim. Script assembly, signing
/// and serialization are entirely the builder's business.
pub trait TransactionBuilder {
    /// What the builder produces, e.g. an unsigned transaction or a PSBT
    type Output;
    type Error: From<SelectorError>;

    fn build(
        &self,
        inputs: &[SpendableUtxo],
        outputs: &[TxOutput],
    ) -> Result<Self::Output, Self::Error>;
}

/// What happened to the value left over after outputs and fees
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeSettlement {
    /// Above dust: paid back to the change destination
    Output(Satoshi),
    /// At or below dust: left to the fee
    AbsorbedIntoFee(Satoshi),
}

impl ChangeSettlement {
    pub fn value(&self) -> Satoshi {
        match self {
            ChangeSettlement::Output(value) | ChangeSettlement::AbsorbedIntoFee(value) => *value,
        }
    }

    pub fn creates_output(&self) -> bool {
        matches!(self, ChangeSettlement::Output(_))
    }
}

/// Outcome of a successful selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Selected inputs in selection order
    pub inputs: Vec<SpendableUtxo>,

    /// Positions of the selected inputs in the normalized pool
    pub selected_indices: Vec<usize>,

    /// Desired outputs, followed by the change output if one was created
    pub outputs: Vec<TxOutput>,

    pub change: ChangeSettlement,

    pub total_inputs: Satoshi,
    pub total_outputs: Satoshi,

    /// Always `total_inputs - total_outputs`
    pub fee: Satoshi,

    pub costs: SelectionCosts,
}

impl Selection {
    pub fn change_output(&self) -> Option<&TxOutput> {
        if self.change.creates_output() {
            self.outputs.last()
        } else {
            None
        }
    }
}

/// Per-item costs at the requested fee rate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionCosts {
    pub per_input: Satoshi,
    pub per_output: Satoshi,
    pub header: Satoshi,
    pub dust_threshold: Satoshi,
}

/// Funding state of one output during the greedy pass
#[derive(Debug, Clone, Copy)]
struct OutputFunding {
    /// Value plus one output's cost
    charge: Satoshi,
    funded: bool,
}

impl OutputFunding {
    fn new(value: Satoshi, cost_per_output: Satoshi) -> SelectorResult<Self> {
        Ok(Self {
            charge: value.checked_add(cost_per_output)?,
            funded: false,
        })
    }
}

/// Coin selector for one request
///
/// Construction validates the request and resolves every candidate. Selection itself runs
/// on the first query and is cached for the lifetime of the selector.
#[derive(Debug)]
pub struct UtxoSelector {
    props: SelectorProps,
    cost_model: CostModel,
    costs: SelectionCosts,
    normalized: Vec<SpendableUtxo>,
    selection: OnceCell<Selection>,
}

impl UtxoSelector {
    /// Create a selector for one request
    ///
    /// # Arguments
    /// * `props` - Candidate pool, desired outputs, fee rate and change destination
    /// * `cost_model` - Byte costs of the script type being spent
    ///
    /// # Returns
    /// The selector, or `InvalidConfiguration` when the request is malformed or a candidate
    /// cannot be resolved
    pub fn new(props: SelectorProps, cost_model: CostModel) -> SelectorResult<Self> {
        validate_props(&props)?;

        let fee_rate = props.fee_rate;
        let costs = SelectionCosts {
            per_input: cost_model.cost_per_input(fee_rate)?,
            per_output: cost_model.cost_per_output(fee_rate)?,
            header: cost_model.header_cost(fee_rate)?,
            dust_threshold: cost_model.dust_threshold()?,
        };

        let mut normalized = Vec::with_capacity(props.utxos.len());
        for (index, utxo) in props.utxos.iter().enumerate() {
            match utxo.normalize()? {
                Some(spendable) => normalized.push(spendable),
                None => {
                    log_event(
                        LogLevel::Warn,
                        LogContext::Normalization,
                        "candidate discarded: no witness output or prior transaction",
                        Some(json!({ "position": index, "vout": utxo.vout })),
                    );
                }
            }
        }

        debug!(
            "Selector ready: {} of {} candidates usable, {} outputs at {} sat/vB",
            normalized.len(),
            props.utxos.len(),
            props.outputs.len(),
            fee_rate
        );

        Ok(Self {
            props,
            cost_model,
            costs,
            normalized,
            selection: OnceCell::new(),
        })
    }

    pub fn fee_rate(&self) -> FeeRate {
        self.props.fee_rate
    }

    pub fn cost_model(&self) -> &CostModel {
        &self.cost_model
    }

    pub fn cost_per_input(&self) -> Satoshi {
        self.costs.per_input
    }

    pub fn cost_per_output(&self) -> Satoshi {
        self.costs.per_output
    }

    pub fn header_cost(&self) -> Satoshi {
        self.costs.header
    }

    pub fn dust_threshold(&self) -> Satoshi {
        self.costs.dust_threshold
    }

    /// The resolved candidate pool, in the caller's order
    pub fn normalized_inputs(&self) -> &[SpendableUtxo] {
        &self.normalized
    }

    /// Run selection if it has not run yet and return the cached result
    pub fn selection(&self) -> SelectorResult<&Selection> {
        self.selection.get_or_try_init(|| self.compute_selection())
    }

    /// Selected inputs in selection order
    pub fn input_utxos(&self) -> SelectorResult<&[SpendableUtxo]> {
        Ok(&self.selection()?.inputs)
    }

    /// Desired outputs, plus the change output when change exceeds dust
    pub fn outputs(&self) -> SelectorResult<&[TxOutput]> {
        Ok(&self.selection()?.outputs)
    }

    /// Settled change, whether it became an output or was left to the fee
    pub fn change_value(&self) -> SelectorResult<Satoshi> {
        Ok(self.selection()?.change.value())
    }

    pub fn change_output(&self) -> SelectorResult<Option<&TxOutput>> {
        Ok(self.selection()?.change_output())
    }

    pub fn total_inputs(&self) -> SelectorResult<Satoshi> {
        Ok(self.selection()?.total_inputs)
    }

    pub fn total_outputs(&self) -> SelectorResult<Satoshi> {
        Ok(self.selection()?.total_outputs)
    }

    pub fn fee(&self) -> SelectorResult<Satoshi> {
        Ok(self.selection()?.fee)
    }

    /// One `txid:vout => value` line per selected input
    pub fn input_log(&self) -> SelectorResult<Vec<String>> {
        Ok(self
            .selection()?
            .inputs
            .iter()
            .map(ToString::to_string)
            .collect())
    }

    /// One `destination => value` line per final output
    pub fn output_log(&self) -> SelectorResult<Vec<String>> {
        Ok(self
            .selection()?
            .outputs
            .iter()
            .map(ToString::to_string)
            .collect())
    }

    pub fn log(&self) -> SelectorResult<SelectionLog> {
        let selection = self.selection()?;
        let size = self
            .cost_model
            .estimated_size(selection.inputs.len(), selection.outputs.len())?;
        let effective_fee_rate = selection
            .fee
            .magnitude()
            .checked_div(size.magnitude())
            .map(|rate| rate.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero));

        Ok(SelectionLog {
            inputs: self.input_log()?,
            outputs: self.output_log()?,
            fee: selection.fee,
            fee_rate: self.props.fee_rate,
            effective_fee_rate,
        })
    }

    /// Hand the selection to a transaction builder
    pub fn build_with<B: TransactionBuilder>(&self, builder: &B) -> Result<B::Output, B::Error> {
        let selection = self.selection()?;
        builder.build(&selection.inputs, &selection.outputs)
    }

    fn compute_selection(&self) -> SelectorResult<Selection> {
        let selected_indices = self.select_inputs()?;
        self.settle(selected_indices)
    }

    /// Greedy pass: returns positions into the normalized pool in selection order
    fn select_inputs(&self) -> SelectorResult<Vec<usize>> {
        let cost_per_input = self.costs.per_input;
        let cost_per_output = self.costs.per_output;
        let total_output_needed = Satoshi::checked_sum(self.props.outputs.iter().map(|o| o.value))?;

        // Stable, so equal values keep pool order
        let mut candidates: Vec<usize> = (0..self.normalized.len()).collect();
        candidates.sort_by_key(|&index| self.normalized[index].value);

        let mut funding: Vec<OutputFunding> = self
            .props
            .outputs
            .iter()
            .map(|output| OutputFunding::new(output.value, cost_per_output))
            .collect::<SelectorResult<_>>()?;
        // Change placeholder, valued at one output's cost
        funding.push(OutputFunding::new(cost_per_output, cost_per_output)?);

        let mut input_available = Satoshi::zero();
        let mut input_consumed = Satoshi::zero();
        let mut selected = Vec::new();

        while !candidates.is_empty() && funding.iter().any(|record| !record.funded) {
            let shortfall = total_output_needed.checked_sub(input_available)?;
            let target = shortfall.checked_add(cost_per_input)?;

            let position = candidates
                .iter()
                .position(|&index| self.normalized[index].value >= target)
                .unwrap_or(candidates.len() - 1);
            let index = candidates.remove(position);
            let value = self.normalized[index].value;

            input_available = input_available.checked_add(value.checked_sub(cost_per_input)?)?;
            selected.push(index);

            for record in funding.iter_mut().filter(|record| !record.funded) {
                let consumed = input_consumed.checked_add(record.charge)?;
                if input_available < consumed {
                    break;
                }
                record.funded = true;
                input_consumed = consumed;
            }

            debug!(
                "Round {}: shortfall {}, picked {} ({}), available {}, consumed {}, unfunded {}",
                selected.len(),
                shortfall,
                self.normalized[index].outpoint,
                value,
                input_available,
                input_consumed,
                funding.iter().filter(|record| !record.funded).count()
            );
        }

        let shortfall = total_output_needed.checked_sub(input_available)?;
        if shortfall.is_positive() {
            log_event(
                LogLevel::Warn,
                LogContext::Selection,
                "insufficient funds",
                Some(json!({
                    "needed": total_output_needed.to_string(),
                    "available": input_available.to_string(),
                    "shortfall": shortfall.to_string(),
                })),
            );
            return Err(insufficient_funds(shortfall));
        }

        Ok(selected)
    }

    /// Exact pass: fee and change from the selected set alone
    fn settle(&self, selected_indices: Vec<usize>) -> SelectorResult<Selection> {
        let costs = self.costs;
        let inputs: Vec<SpendableUtxo> = selected_indices
            .iter()
            .map(|&index| self.normalized[index].clone())
            .collect();

        let total_inputs = Satoshi::checked_sum(inputs.iter().map(|input| input.value))?;
        let desired_total = Satoshi::checked_sum(self.props.outputs.iter().map(|o| o.value))?;
        let desired_count = self.props.outputs.len();

        let fee_for_inputs = costs.per_input.multiply_by_scalar(Decimal::from(inputs.len()))?;
        let fee_for_outputs_with_change = costs
            .per_output
            .multiply_by_scalar(Decimal::from(desired_count + 1))?;
        let before_output_fees = total_inputs
            .checked_sub(desired_total)?
            .checked_sub(fee_for_inputs)?
            .checked_sub(costs.header)?;

        let candidate_change = before_output_fees
            .checked_sub(fee_for_outputs_with_change)?
            .floor();

        let mut outputs = self.props.outputs.clone();
        let change = if candidate_change > costs.dust_threshold {
            outputs.push(TxOutput::new(
                self.props.change_destination.clone(),
                candidate_change,
            ));
            ChangeSettlement::Output(candidate_change)
        } else {
            let fee_for_outputs = fee_for_outputs_with_change.checked_sub(costs.per_output)?;
            let final_change = before_output_fees.checked_sub(fee_for_outputs)?.floor();
            if final_change.is_negative() {
                let shortfall = -final_change;
                log_event(
                    LogLevel::Warn,
                    LogContext::Settlement,
                    "selected inputs cannot pay the exact fee",
                    Some(json!({ "shortfall": shortfall.to_string() })),
                );
                return Err(insufficient_funds(shortfall));
            }
            ChangeSettlement::AbsorbedIntoFee(final_change)
        };

        let total_outputs = Satoshi::checked_sum(outputs.iter().map(|o| o.value))?;
        let fee = total_inputs.checked_sub(total_outputs)?;

        log_event(
            LogLevel::Info,
            LogContext::Settlement,
            "selection complete",
            Some(json!({
                "inputs": inputs.len(),
                "total_inputs": total_inputs.to_string(),
                "outputs": outputs.len(),
                "fee": fee.to_string(),
                "change": change.value().to_string(),
                "change_created": change.creates_output(),
                "change_destination": sanitize_for_logging(&self.props.change_destination),
            })),
        );

        Ok(Selection {
            inputs,
            selected_indices,
            outputs,
            change,
            total_inputs,
            total_outputs,
            fee,
            costs,
        })
    }
}

fn validate_props(props: &SelectorProps) -> SelectorResult<()> {
    if props.outputs.is_empty() {
        return Err(invalid_configuration("at least one desired output is required"));
    }
    if props.change_destination.trim().is_empty() {
        return Err(invalid_configuration("change destination must not be empty"));
    }
    for (index, output) in props.outputs.iter().enumerate() {
        if !is_valid_bitcoin_value(output.value) {
            return Err(invalid_configuration(format!(
                "output #{} ({}) is not a whole number of satoshis within the bitcoin supply",
                index, output
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utxo_selection::types::Utxo;
    use bitcoin::hashes::Hash;
    use bitcoin::{ScriptBuf, Txid};
    use rust_decimal_macros::dec;

    fn txid(n: u8) -> Txid {
        Txid::from_byte_array([n; 32])
    }

    fn pool(values: &[u64]) -> Vec<Utxo> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| Utxo::from_witness(txid(i as u8 + 1), 0, Satoshi::from_sat(v), ScriptBuf::new()))
            .collect()
    }

    fn selector(values: &[u64], outputs: &[u64]) -> UtxoSelector {
        let outputs = outputs
            .iter()
            .enumerate()
            .map(|(i, &v)| TxOutput::from_sat(format!("dest-{}", i), v))
            .collect();
        let props = SelectorProps::new(
            pool(values),
            outputs,
            FeeRate::from_sat_per_vb(dec!(1)).unwrap(),
            "change",
        );
        UtxoSelector::new(props, CostModel::p2wpkh()).unwrap()
    }

    #[test]
    fn test_selection_is_cached() {
        let selector = selector(&[10_000], &[9_000]);
        let first = selector.selection().unwrap() as *const Selection;
        let second = selector.selection().unwrap() as *const Selection;
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_outputs_rejected() {
        let props = SelectorProps::new(
            pool(&[10_000]),
            Vec::new(),
            FeeRate::from_sat_per_vb(dec!(1)).unwrap(),
            "change",
        );
        let err = UtxoSelector::new(props, CostModel::p2wpkh()).unwrap_err();
        assert!(matches!(err, SelectorError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_fractional_output_rejected() {
        let props = SelectorProps::new(
            pool(&[10_000]),
            vec![TxOutput::new("dest", Satoshi::new(dec!(10.5)))],
            FeeRate::from_sat_per_vb(dec!(1)).unwrap(),
            "change",
        );
        assert!(UtxoSelector::new(props, CostModel::p2wpkh()).is_err());
    }

    #[test]
    fn test_placeholder_forces_second_input() {
        // 5100 closes the shortfall but not the payment's charge, so 1000 is taken as well
        let selector = selector(&[5_100, 1_000], &[5_000]);
        let selection = selector.selection().unwrap();
        assert_eq!(selection.selected_indices, vec![0, 1]);
    }

    #[test]
    fn test_change_output_is_last() {
        let selector = selector(&[10_000], &[5_000]);
        let change = selector.change_output().unwrap().unwrap();
        assert_eq!(change.destination, "change");
        assert_eq!(change.value, Satoshi::from_sat(10_000 - 5_000 - 68 - 13 - 66));
    }

    #[test]
    fn test_effective_rate_in_log() {
        let selector = selector(&[10_000], &[5_000]);
        let log = selector.log().unwrap();
        // fee 147 over 13 + 67.9 + 2 × 32.2 = 145.3 bytes
        assert_eq!(log.effective_fee_rate, Some(dec!(1.01)));
        assert_eq!(log.outputs.len(), 2);
    }
}
