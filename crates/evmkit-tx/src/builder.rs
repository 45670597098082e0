//! Transaction assembly: nonce, gas limit and fee fields.
//!
//! The builder turns a [`TransactionIntent`] plus a [`FeeQuote`] into an
//! [`UnsignedTx`]. It decides nothing about pricing; the quote's populated
//! family picks the transaction type. Gas comes from the caller's override
//! or from node estimation with a fixed safety margin.

use alloy::consensus::{TxEip1559, TxLegacy};
use alloy::primitives::{Address, TxKind};
use evmkit_types::{FeeQuote, TransactionIntent, UnsignedTx};
use tracing::debug;

use crate::connection::ChainRpc;
use crate::TxError;

/// Safety margin applied on top of node gas estimates, in percent.
const GAS_MARGIN_PERCENT: u64 = 20;

/// Assembles unsigned transactions for one endpoint.
#[derive(Debug, Clone, Default)]
pub struct TransactionBuilder;

impl TransactionBuilder {
	pub fn new() -> Self {
		Self
	}

	/// Builds an unsigned transaction from an intent and a fee quote.
	///
	/// When `nonce` is `None` the pending account nonce is fetched, so
	/// consecutive sends from one account chain correctly. An explicit
	/// nonce is used for same-nonce fee replacement.
	pub async fn build(
		&self,
		rpc: &dyn ChainRpc,
		from: Address,
		intent: &TransactionIntent,
		quote: &FeeQuote,
		nonce: Option<u64>,
	) -> Result<UnsignedTx, TxError> {
		let nonce = match nonce {
			Some(n) => n,
			None => rpc.pending_nonce(from).await?,
		};
		let gas_limit = match intent.gas_limit_override {
			Some(limit) => limit,
			None => {
				let estimate = rpc
					.estimate_gas(from, intent.to, intent.value, intent.data.clone())
					.await?;
				apply_gas_margin(estimate)
			}
		};

		let chain_id = rpc.endpoint().chain_id;
		let to = TxKind::Call(intent.to);
		let input = intent.data.clone().unwrap_or_default();

		let unsigned = if quote.is_fee_market() {
			UnsignedTx::Eip1559(TxEip1559 {
				chain_id,
				nonce,
				gas_limit,
				max_fee_per_gas: quote.max_fee_per_gas.unwrap_or_default(),
				max_priority_fee_per_gas: quote.max_priority_fee_per_gas.unwrap_or_default(),
				to,
				value: intent.value,
				input,
				..Default::default()
			})
		} else {
			UnsignedTx::Legacy(TxLegacy {
				chain_id: Some(chain_id),
				nonce,
				gas_price: quote.legacy_gas_price.unwrap_or_default(),
				gas_limit,
				to,
				value: intent.value,
				input,
			})
		};

		debug!(chain_id, nonce, gas_limit, kind = ?intent.kind, "Assembled transaction");
		Ok(unsigned)
	}
}

/// Pads a node gas estimate so boundary-accurate estimates do not run out
/// of gas when state shifts between estimation and inclusion.
pub(crate) fn apply_gas_margin(estimate: u64) -> u64 {
	estimate.saturating_add(estimate / (100 / GAS_MARGIN_PERCENT))
}
