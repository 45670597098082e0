//! Chain event and subscription lifecycle types.
//!
//! Events are what the subscription core delivers to caller handlers:
//! pending-transaction hashes and new-block headers, in arrival order.

use alloy::primitives::B256;
use serde::{Deserialize, Serialize};

/// The notification streams a subscription can attach to.
///
/// Mirrors the `eth_subscribe` notification types the node exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubscriptionKind {
	/// Transactions entering the mempool (`newPendingTransactions`).
	PendingTx,
	/// New block headers (`newHeads`).
	NewBlock,
}

impl SubscriptionKind {
	/// The `eth_subscribe` parameter name, for logs and diagnostics.
	pub fn rpc_name(&self) -> &'static str {
		match self {
			SubscriptionKind::PendingTx => "newPendingTransactions",
			SubscriptionKind::NewBlock => "newHeads",
		}
	}
}

/// Summary of a block header as delivered by a `newHeads` subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
	/// Block hash.
	pub hash: B256,
	/// Block number.
	pub number: u64,
	/// Parent block hash.
	pub parent_hash: B256,
	/// Block timestamp (Unix seconds).
	pub timestamp: u64,
	/// Base fee per gas, absent on legacy chains.
	pub base_fee_per_gas: Option<u64>,
}

/// A single notification delivered to a subscription handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChainEvent {
	/// A transaction entered the mempool.
	PendingTx(B256),
	/// A new block was produced.
	NewBlock(BlockHeader),
}

/// Lifecycle state of a subscription.
///
/// `Created → Active → {Paused, Closed}`; `Active` is entered when the
/// node acknowledges the subscription, `Paused` while reconnecting after a
/// transport drop, and `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubscriptionState {
	/// Requested but not yet acknowledged by the node.
	Created,
	/// Receiving events.
	Active,
	/// Transport lost; reconnection in progress.
	Paused,
	/// Terminal: unsubscribed, shut down, or reconnection exhausted.
	Closed,
}
