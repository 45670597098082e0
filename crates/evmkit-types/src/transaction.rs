//! Transaction intents, unsigned/signed transactions and receipts.
//!
//! An intent is a logical description of what the caller wants ("send value
//! here", "call this contract"); the builder turns it into an [`UnsignedTx`]
//! carrying concrete nonce, gas and fee fields, and the signer turns that
//! into an immutable [`SignedTx`]. A submitted transaction is tracked through
//! a [`TransactionHandle`] until it resolves to a [`Receipt`].

use alloy::consensus::{TxEip1559, TxLegacy};
use alloy::primitives::{Address, Bytes, B256, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Discriminates the two kinds of transactions this layer issues.
///
/// Resolved once at intent construction time; everything downstream treats
/// the two uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntentKind {
	/// Transfer of the chain's native coin.
	NativeTransfer,
	/// Call into a smart contract (including ERC-20 transfers).
	ContractCall,
}

/// A logical transaction request, prior to fee pricing and assembly.
///
/// Created per call and consumed on submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionIntent {
	/// What kind of transaction this is.
	pub kind: IntentKind,
	/// Recipient: an account for native transfers, a contract otherwise.
	pub to: Address,
	/// Value to attach, in wei.
	pub value: U256,
	/// Calldata for contract calls; `None` for plain transfers.
	pub data: Option<Bytes>,
	/// Caller-supplied gas limit, skipping on-chain estimation.
	pub gas_limit_override: Option<u64>,
}

impl TransactionIntent {
	/// Creates an intent transferring `value` wei of the native coin.
	pub fn native_transfer(to: Address, value: U256) -> Self {
		Self {
			kind: IntentKind::NativeTransfer,
			to,
			value,
			data: None,
			gas_limit_override: None,
		}
	}

	/// Creates an intent calling a contract with the given calldata.
	pub fn contract_call(to: Address, data: Bytes) -> Self {
		Self {
			kind: IntentKind::ContractCall,
			to,
			value: U256::ZERO,
			data: Some(data),
			gas_limit_override: None,
		}
	}

	/// Attaches value to a contract call (for payable functions).
	pub fn with_value(mut self, value: U256) -> Self {
		self.value = value;
		self
	}

	/// Skips gas estimation and uses this limit as-is.
	pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
		self.gas_limit_override = Some(gas_limit);
		self
	}
}

/// A fully assembled transaction awaiting a signature.
///
/// The variant matches the pricing family of the fee quote it was built
/// from, not the endpoint flag alone: a fee-market endpoint can fall back
/// to legacy pricing when the node disagrees.
#[derive(Debug, Clone)]
pub enum UnsignedTx {
	/// EIP-1559 fee-market transaction.
	Eip1559(TxEip1559),
	/// Legacy single-gas-price transaction.
	Legacy(TxLegacy),
}

impl UnsignedTx {
	/// The chain id the transaction is bound to.
	pub fn chain_id(&self) -> u64 {
		match self {
			UnsignedTx::Eip1559(tx) => tx.chain_id,
			UnsignedTx::Legacy(tx) => tx.chain_id.unwrap_or_default(),
		}
	}

	/// The sender nonce.
	pub fn nonce(&self) -> u64 {
		match self {
			UnsignedTx::Eip1559(tx) => tx.nonce,
			UnsignedTx::Legacy(tx) => tx.nonce,
		}
	}

	/// The gas limit.
	pub fn gas_limit(&self) -> u64 {
		match self {
			UnsignedTx::Eip1559(tx) => tx.gas_limit,
			UnsignedTx::Legacy(tx) => tx.gas_limit,
		}
	}

	/// Human-readable fee fields, for error context and logs.
	pub fn fee_summary(&self) -> String {
		match self {
			UnsignedTx::Eip1559(tx) => format!(
				"max_fee_per_gas={} max_priority_fee_per_gas={}",
				tx.max_fee_per_gas, tx.max_priority_fee_per_gas
			),
			UnsignedTx::Legacy(tx) => format!("gas_price={}", tx.gas_price),
		}
	}
}

/// A signed transaction, ready for broadcast.
///
/// Immutable by construction: signing consumes the unsigned form and the
/// raw bytes are never rewritten.
#[derive(Debug, Clone)]
pub struct SignedTx {
	/// EIP-2718 encoded bytes as accepted by `eth_sendRawTransaction`.
	pub raw: Bytes,
	/// Transaction hash (keccak of the raw bytes).
	pub hash: B256,
	/// Address of the signing credential.
	pub signer: Address,
	/// Chain id embedded in the signature.
	pub chain_id: u64,
	/// Sender nonce, kept for rejection diagnostics and replacement.
	pub nonce: u64,
	/// Fee fields as submitted, for diagnostics.
	pub fee_summary: String,
}

/// Handle to a submitted transaction.
///
/// Created on successful submission and resolved to a [`Receipt`] on
/// confirmation, or to a terminal failure if never mined in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionHandle {
	/// Transaction hash to poll for.
	pub hash: B256,
	/// When the node accepted the submission.
	pub submitted_at: DateTime<Utc>,
}

impl TransactionHandle {
	/// Creates a handle stamped with the current time.
	pub fn new(hash: B256) -> Self {
		Self {
			hash,
			submitted_at: Utc::now(),
		}
	}
}

/// Post-inclusion outcome of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReceiptStatus {
	/// The transaction executed successfully.
	Success,
	/// The transaction was mined but reverted.
	Reverted,
}

/// Post-inclusion record of a transaction's outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
	/// Hash of the mined transaction.
	pub hash: B256,
	/// Execution outcome.
	pub status: ReceiptStatus,
	/// Block the transaction was included in.
	pub block_number: u64,
	/// Gas consumed by execution.
	pub gas_used: u64,
}

impl Receipt {
	/// True when the transaction executed successfully.
	pub fn is_success(&self) -> bool {
		self.status == ReceiptStatus::Success
	}
}

/// Snapshot of current network conditions.
///
/// Fed to retry predicates so replacement decisions can react to fee
/// movements without issuing their own RPC calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkState {
	/// Chain the snapshot was taken from.
	pub chain_id: u64,
	/// Base fee of the latest block, absent on legacy chains.
	pub base_fee_per_gas: Option<u128>,
	/// Node gas price suggestion, in wei.
	pub gas_price: u128,
	/// Latest block number.
	pub block_number: u64,
	/// Unix timestamp when the snapshot was fetched.
	pub timestamp: u64,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn native_transfer_has_no_calldata() {
		let intent = TransactionIntent::native_transfer(Address::ZERO, U256::from(1u64));
		assert_eq!(intent.kind, IntentKind::NativeTransfer);
		assert!(intent.data.is_none());
		assert!(intent.gas_limit_override.is_none());
	}

	#[test]
	fn contract_call_defaults_to_zero_value() {
		let intent = TransactionIntent::contract_call(Address::ZERO, Bytes::from(vec![1, 2]))
			.with_gas_limit(100_000);
		assert_eq!(intent.kind, IntentKind::ContractCall);
		assert_eq!(intent.value, U256::ZERO);
		assert_eq!(intent.gas_limit_override, Some(100_000));
	}

	#[test]
	fn unsigned_tx_accessors_cover_both_variants() {
		let eip1559 = UnsignedTx::Eip1559(TxEip1559 {
			chain_id: 1,
			nonce: 7,
			gas_limit: 21_000,
			max_fee_per_gas: 100,
			max_priority_fee_per_gas: 2,
			..Default::default()
		});
		assert_eq!(eip1559.chain_id(), 1);
		assert_eq!(eip1559.nonce(), 7);
		assert_eq!(eip1559.gas_limit(), 21_000);
		assert!(eip1559.fee_summary().contains("max_fee_per_gas=100"));

		let legacy = UnsignedTx::Legacy(TxLegacy {
			chain_id: Some(56),
			nonce: 3,
			gas_price: 5,
			gas_limit: 21_000,
			..Default::default()
		});
		assert_eq!(legacy.chain_id(), 56);
		assert!(legacy.fee_summary().contains("gas_price=5"));
	}
}
