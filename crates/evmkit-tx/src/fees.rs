//! Fee pricing for legacy and fee-market chains.
//!
//! The strategy reads current conditions from the node and produces a
//! [`FeeQuote`] the builder consumes verbatim. Fee-market pricing follows
//! the double-base-fee rule: `max_fee = 2 * base_fee + priority_fee`, which
//! keeps a transaction includable through several consecutive full blocks
//! without overpaying (the surplus above base fee plus tip is refunded).

use evmkit_types::FeeQuote;
use tracing::{debug, warn};

use crate::connection::ChainRpc;
use crate::TxError;

/// Default miner tip when the node gives no suggestion: 0.01 gwei.
pub const DEFAULT_PRIORITY_FEE_WEI: u128 = 10_000_000;

/// Prices transactions for one endpoint.
#[derive(Debug, Clone)]
pub struct FeeStrategy {
	default_priority_fee: u128,
	base_fee_cap: Option<u128>,
}

impl Default for FeeStrategy {
	fn default() -> Self {
		Self {
			default_priority_fee: DEFAULT_PRIORITY_FEE_WEI,
			base_fee_cap: None,
		}
	}
}

impl FeeStrategy {
	/// Creates a strategy with default tip and no standing base-fee cap.
	pub fn new() -> Self {
		Self::default()
	}

	/// Overrides the fallback miner tip, in wei.
	pub fn with_priority_fee(mut self, priority_fee: u128) -> Self {
		self.default_priority_fee = priority_fee;
		self
	}

	/// Sets a standing base-fee cap carried on every quote. Submission
	/// fails fast when the current base fee exceeds it.
	pub fn with_base_fee_cap(mut self, cap: u128) -> Self {
		self.base_fee_cap = Some(cap);
		self
	}

	/// Produces a quote for the endpoint's pricing family.
	///
	/// On a fee-market endpoint whose node reports no base fee, falls back
	/// to legacy pricing and flags the mismatch instead of failing. The
	/// per-call `ceiling` bounds the worst-case unit price; breaking it is
	/// [`TxError::FeeExceedsCeiling`] and nothing is broadcast.
	pub async fn quote(
		&self,
		rpc: &dyn ChainRpc,
		ceiling: Option<u128>,
	) -> Result<FeeQuote, TxError> {
		let chain_id = rpc.endpoint().chain_id;
		let quote = if rpc.endpoint().supports_fee_market {
			match rpc.latest_base_fee().await? {
				Some(base_fee) => {
					let priority_fee = match rpc.suggest_priority_fee().await {
						Ok(tip) => tip,
						Err(e) => {
							debug!(chain_id, error = %e, "Node gave no priority fee suggestion, using default tip");
							self.default_priority_fee
						}
					};
					quote_fee_market(base_fee, priority_fee, ceiling)?
				}
				None => {
					warn!(
						chain_id,
						"Endpoint declares fee-market support but node reports no base fee, falling back to legacy pricing"
					);
					let gas_price = rpc.gas_price().await?;
					quote_legacy(gas_price, ceiling)?.with_capability_mismatch()
				}
			}
		} else {
			let gas_price = rpc.gas_price().await?;
			quote_legacy(gas_price, ceiling)?
		};

		debug!(chain_id, unit_price = quote.unit_price(), fee_market = quote.is_fee_market(), "Priced transaction");
		Ok(match self.base_fee_cap {
			Some(cap) => quote.with_base_fee_cap(cap),
			None => quote,
		})
	}
}

/// Prices a fee-market transaction from the observed base fee and tip.
pub(crate) fn quote_fee_market(
	base_fee: u128,
	priority_fee: u128,
	ceiling: Option<u128>,
) -> Result<FeeQuote, TxError> {
	let max_fee = base_fee.saturating_mul(2).saturating_add(priority_fee);
	if let Some(ceiling) = ceiling {
		if max_fee > ceiling {
			return Err(TxError::FeeExceedsCeiling {
				quoted: max_fee,
				ceiling,
			});
		}
	}
	Ok(FeeQuote::fee_market(max_fee, priority_fee))
}

/// Prices a legacy transaction from the node's gas price suggestion.
pub(crate) fn quote_legacy(gas_price: u128, ceiling: Option<u128>) -> Result<FeeQuote, TxError> {
	if let Some(ceiling) = ceiling {
		if gas_price > ceiling {
			return Err(TxError::FeeExceedsCeiling {
				quoted: gas_price,
				ceiling,
			});
		}
	}
	Ok(FeeQuote::legacy(gas_price))
}
