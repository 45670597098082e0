//! Fee quote types for legacy and fee-market pricing.
//!
//! A [`FeeQuote`] is produced by the fee strategy and consumed verbatim by
//! the transaction builder; the builder never recomputes fees itself. Exactly
//! one pricing family is populated, matching the endpoint's fee-market flag
//! (or the observed node behavior when the two disagree).

use serde::{Deserialize, Serialize};

/// Gas pricing for a single transaction, in wei per gas unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeQuote {
	/// Single gas price for legacy transactions.
	pub legacy_gas_price: Option<u128>,
	/// Maximum total fee per gas for EIP-1559 transactions.
	pub max_fee_per_gas: Option<u128>,
	/// Miner tip per gas for EIP-1559 transactions.
	pub max_priority_fee_per_gas: Option<u128>,
	/// Standing upper limit on the network base fee. When set, submission
	/// fails fast if the current base fee exceeds it, so a stale quote is
	/// never reused against a more expensive network.
	pub base_fee_cap: Option<u128>,
	/// True when the endpoint claimed fee-market support but the node
	/// returned no base fee, forcing the legacy fallback path.
	pub capability_mismatch: bool,
}

impl FeeQuote {
	/// Creates a legacy single-gas-price quote.
	pub fn legacy(gas_price: u128) -> Self {
		Self {
			legacy_gas_price: Some(gas_price),
			max_fee_per_gas: None,
			max_priority_fee_per_gas: None,
			base_fee_cap: None,
			capability_mismatch: false,
		}
	}

	/// Creates an EIP-1559 fee-market quote.
	pub fn fee_market(max_fee_per_gas: u128, max_priority_fee_per_gas: u128) -> Self {
		Self {
			legacy_gas_price: None,
			max_fee_per_gas: Some(max_fee_per_gas),
			max_priority_fee_per_gas: Some(max_priority_fee_per_gas),
			base_fee_cap: None,
			capability_mismatch: false,
		}
	}

	/// Sets the standing base-fee cap checked at submission time.
	pub fn with_base_fee_cap(mut self, cap: u128) -> Self {
		self.base_fee_cap = Some(cap);
		self
	}

	/// Marks the quote as produced by the legacy fallback on an endpoint
	/// whose fee-market flag disagreed with the node.
	pub fn with_capability_mismatch(mut self) -> Self {
		self.capability_mismatch = true;
		self
	}

	/// True when the quote carries EIP-1559 fee fields.
	pub fn is_fee_market(&self) -> bool {
		self.max_fee_per_gas.is_some()
	}

	/// The worst-case price per gas unit the caller would pay.
	pub fn unit_price(&self) -> u128 {
		self.max_fee_per_gas
			.or(self.legacy_gas_price)
			.unwrap_or_default()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn exactly_one_pricing_family_is_populated() {
		let legacy = FeeQuote::legacy(5);
		assert!(legacy.legacy_gas_price.is_some());
		assert!(legacy.max_fee_per_gas.is_none());
		assert!(legacy.max_priority_fee_per_gas.is_none());
		assert!(!legacy.is_fee_market());

		let market = FeeQuote::fee_market(100, 2);
		assert!(market.legacy_gas_price.is_none());
		assert!(market.max_fee_per_gas.is_some());
		assert!(market.max_priority_fee_per_gas.is_some());
		assert!(market.is_fee_market());
	}

	#[test]
	fn unit_price_prefers_populated_family() {
		assert_eq!(FeeQuote::legacy(7).unit_price(), 7);
		assert_eq!(FeeQuote::fee_market(42, 1).unit_price(), 42);
	}
}
