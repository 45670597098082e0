//! JSON-RPC connection to a single chain endpoint.
//!
//! [`EndpointConnection`] wraps the HTTP provider and exposes the narrow set
//! of node queries the engine needs. Everything returns crate-local types;
//! provider types do not leak upward.

use std::time::{SystemTime, UNIX_EPOCH};

use alloy::eips::BlockNumberOrTag;
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::providers::{Provider, RootProvider};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use evmkit_types::{ChainEndpoint, NetworkState, Receipt, ReceiptStatus, SignedTx};

use crate::{RejectionReason, TxError};

/// Node operations the transaction engine depends on.
///
/// [`EndpointConnection`] is the live implementation; the pricing, building
/// and submission paths all go through this trait so their decision logic
/// can be driven by scripted nodes in tests.
#[async_trait]
pub trait ChainRpc: Send + Sync {
	/// The endpoint being talked to.
	fn endpoint(&self) -> &ChainEndpoint;
	/// Next nonce for the address, counting pool-pending transactions.
	async fn pending_nonce(&self, address: Address) -> Result<u64, TxError>;
	/// Node gas price suggestion, in wei.
	async fn gas_price(&self) -> Result<u128, TxError>;
	/// Node priority fee suggestion, in wei.
	async fn suggest_priority_fee(&self) -> Result<u128, TxError>;
	/// Base fee of the latest block, absent on legacy chains.
	async fn latest_base_fee(&self) -> Result<Option<u128>, TxError>;
	/// Estimated gas for a call, without the safety margin.
	async fn estimate_gas(
		&self,
		from: Address,
		to: Address,
		value: U256,
		data: Option<Bytes>,
	) -> Result<u64, TxError>;
	/// Broadcasts a signed transaction.
	async fn submit_raw(&self, signed: &SignedTx) -> Result<B256, TxError>;
	/// Receipt for a hash, if mined.
	async fn receipt(&self, hash: B256) -> Result<Option<Receipt>, TxError>;
	/// Snapshot of current network conditions.
	async fn network_state(&self) -> Result<NetworkState, TxError>;
}

/// Connection to one chain's JSON-RPC endpoint.
///
/// Cheap to share behind an `Arc`; the underlying provider pools HTTP
/// connections internally.
#[derive(Debug)]
pub struct EndpointConnection {
	endpoint: ChainEndpoint,
	provider: RootProvider,
}

impl EndpointConnection {
	/// Creates a connection for the given endpoint.
	///
	/// No request is issued here; the first RPC call surfaces reachability
	/// problems.
	pub fn connect(endpoint: ChainEndpoint) -> Result<Self, TxError> {
		let url = endpoint
			.rpc_url
			.parse()
			.map_err(|e| TxError::Network(format!("invalid RPC URL '{}': {}", endpoint.rpc_url, e)))?;
		let provider = RootProvider::new_http(url);
		Ok(Self { endpoint, provider })
	}

	/// The endpoint this connection targets.
	pub fn endpoint(&self) -> &ChainEndpoint {
		&self.endpoint
	}

	/// Next nonce for the address, counting pool-pending transactions.
	pub async fn pending_nonce(&self, address: Address) -> Result<u64, TxError> {
		self.provider
			.get_transaction_count(address)
			.pending()
			.await
			.map_err(|e| TxError::Network(e.to_string()))
	}

	/// Node gas price suggestion, in wei.
	pub async fn gas_price(&self) -> Result<u128, TxError> {
		self.provider
			.get_gas_price()
			.await
			.map_err(|e| TxError::Network(e.to_string()))
	}

	/// Node priority fee suggestion, in wei.
	pub async fn suggest_priority_fee(&self) -> Result<u128, TxError> {
		self.provider
			.get_max_priority_fee_per_gas()
			.await
			.map_err(|e| TxError::Network(e.to_string()))
	}

	/// Base fee of the latest block, or `None` when the node does not
	/// report one (pre-fee-market chains).
	pub async fn latest_base_fee(&self) -> Result<Option<u128>, TxError> {
		let block = self
			.provider
			.get_block_by_number(BlockNumberOrTag::Latest)
			.await
			.map_err(|e| TxError::Network(e.to_string()))?
			.ok_or_else(|| TxError::Network("node returned no latest block".to_string()))?;
		Ok(block.header.base_fee_per_gas.map(u128::from))
	}

	/// Latest block number.
	pub async fn block_number(&self) -> Result<u64, TxError> {
		self.provider
			.get_block_number()
			.await
			.map_err(|e| TxError::Network(e.to_string()))
	}

	/// Estimates the gas an intent would consume, without the safety margin.
	pub async fn estimate_gas(
		&self,
		from: Address,
		to: Address,
		value: U256,
		data: Option<Bytes>,
	) -> Result<u64, TxError> {
		let mut request = TransactionRequest::default().from(from).to(to).value(value);
		if let Some(data) = data {
			request = request.input(data.into());
		}
		self.provider
			.estimate_gas(request)
			.await
			.map_err(|e| TxError::GasEstimationFailed(e.to_string()))
	}

	/// Executes a read-only contract call against the latest state.
	pub async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, TxError> {
		let request = TransactionRequest::default().to(to).input(data.into());
		self.provider
			.call(request)
			.await
			.map_err(|e| TxError::Network(e.to_string()))
	}

	/// Native coin balance of the address, in wei.
	pub async fn balance(&self, address: Address) -> Result<U256, TxError> {
		self.provider
			.get_balance(address)
			.await
			.map_err(|e| TxError::Network(e.to_string()))
	}

	/// Broadcasts a signed transaction.
	///
	/// Node refusals become [`TxError::RejectedByNode`] with a classified
	/// reason; the raw node message is preserved for diagnostics.
	pub async fn submit_raw(&self, signed: &SignedTx) -> Result<B256, TxError> {
		match self.provider.send_raw_transaction(&signed.raw).await {
			Ok(pending) => Ok(*pending.tx_hash()),
			Err(e) => {
				let message = e.to_string();
				Err(TxError::RejectedByNode {
					reason: RejectionReason::classify(&message),
					message,
					chain_id: self.endpoint.chain_id,
					nonce: signed.nonce,
				})
			}
		}
	}

	/// Fetches the receipt for a hash, if the transaction has been mined.
	pub async fn receipt(&self, hash: B256) -> Result<Option<Receipt>, TxError> {
		let receipt = self
			.provider
			.get_transaction_receipt(hash)
			.await
			.map_err(|e| TxError::Network(e.to_string()))?;
		Ok(receipt.map(|r| Receipt {
			hash,
			status: if r.status() {
				ReceiptStatus::Success
			} else {
				ReceiptStatus::Reverted
			},
			block_number: r.block_number.unwrap_or_default(),
			gas_used: r.gas_used,
		}))
	}

	/// Snapshots current network conditions for retry predicates.
	pub async fn network_state(&self) -> Result<NetworkState, TxError> {
		let gas_price = self.gas_price().await?;
		let block = self
			.provider
			.get_block_by_number(BlockNumberOrTag::Latest)
			.await
			.map_err(|e| TxError::Network(e.to_string()))?
			.ok_or_else(|| TxError::Network("node returned no latest block".to_string()))?;
		Ok(NetworkState {
			chain_id: self.endpoint.chain_id,
			base_fee_per_gas: block.header.base_fee_per_gas.map(u128::from),
			gas_price,
			block_number: block.header.number,
			timestamp: current_timestamp(),
		})
	}
}

#[async_trait]
impl ChainRpc for EndpointConnection {
	fn endpoint(&self) -> &ChainEndpoint {
		&self.endpoint
	}

	async fn pending_nonce(&self, address: Address) -> Result<u64, TxError> {
		EndpointConnection::pending_nonce(self, address).await
	}

	async fn gas_price(&self) -> Result<u128, TxError> {
		EndpointConnection::gas_price(self).await
	}

	async fn suggest_priority_fee(&self) -> Result<u128, TxError> {
		EndpointConnection::suggest_priority_fee(self).await
	}

	async fn latest_base_fee(&self) -> Result<Option<u128>, TxError> {
		EndpointConnection::latest_base_fee(self).await
	}

	async fn estimate_gas(
		&self,
		from: Address,
		to: Address,
		value: U256,
		data: Option<Bytes>,
	) -> Result<u64, TxError> {
		EndpointConnection::estimate_gas(self, from, to, value, data).await
	}

	async fn submit_raw(&self, signed: &SignedTx) -> Result<B256, TxError> {
		EndpointConnection::submit_raw(self, signed).await
	}

	async fn receipt(&self, hash: B256) -> Result<Option<Receipt>, TxError> {
		EndpointConnection::receipt(self, hash).await
	}

	async fn network_state(&self) -> Result<NetworkState, TxError> {
		EndpointConnection::network_state(self).await
	}
}

fn current_timestamp() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|d| d.as_secs())
		.unwrap_or_default()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn local_endpoint() -> ChainEndpoint {
		ChainEndpoint::fee_market(31337, "http://localhost:8545")
	}

	#[test]
	fn connect_does_not_dial() {
		let conn = EndpointConnection::connect(local_endpoint()).unwrap();
		assert_eq!(conn.endpoint().chain_id, 31337);
	}

	#[test]
	fn invalid_url_is_a_network_error() {
		let endpoint = ChainEndpoint::fee_market(1, "not a url");
		assert!(matches!(
			EndpointConnection::connect(endpoint),
			Err(TxError::Network(_))
		));
	}
}
