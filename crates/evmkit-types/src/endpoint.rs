//! RPC endpoint configuration for a single EVM-compatible chain.
//!
//! A [`ChainEndpoint`] captures everything a component needs to talk to one
//! chain: where to send requests, which chain id to embed in signatures, and
//! how the chain prices transactions.

use serde::{Deserialize, Serialize};

/// Connection configuration for one EVM chain.
///
/// Immutable after construction. Components needing network access hold a
/// clone (or share one behind an `Arc`); nothing takes exclusive ownership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainEndpoint {
	/// EIP-155 chain id, embedded in every signed transaction.
	pub chain_id: u64,
	/// HTTP(S) JSON-RPC endpoint for request/response calls.
	pub rpc_url: String,
	/// WebSocket endpoint; required only for subscriptions.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub ws_url: Option<String>,
	/// Whether the chain prices transactions with EIP-1559 fee-market
	/// fields rather than a single legacy gas price.
	pub supports_fee_market: bool,
}

impl ChainEndpoint {
	/// Creates an endpoint for a fee-market (EIP-1559) chain.
	pub fn fee_market(chain_id: u64, rpc_url: impl Into<String>) -> Self {
		Self {
			chain_id,
			rpc_url: rpc_url.into(),
			ws_url: None,
			supports_fee_market: true,
		}
	}

	/// Creates an endpoint for a legacy-priced chain.
	pub fn legacy(chain_id: u64, rpc_url: impl Into<String>) -> Self {
		Self {
			chain_id,
			rpc_url: rpc_url.into(),
			ws_url: None,
			supports_fee_market: false,
		}
	}

	/// Sets the WebSocket URL used for subscriptions.
	pub fn with_ws_url(mut self, ws_url: impl Into<String>) -> Self {
		self.ws_url = Some(ws_url.into());
		self
	}
}
