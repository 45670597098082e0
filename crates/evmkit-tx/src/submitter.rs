//! Broadcast, confirmation tracking and fee replacement.
//!
//! [`Submitter`] drives the full lifecycle: price, build, sign, broadcast,
//! then poll for a receipt until confirmation or timeout. A caller-supplied
//! [`RetryPredicate`] can trigger a same-nonce fee replacement while
//! waiting; both the original and the replacement hash stay watched, since
//! either may be the one that lands. Every node interaction goes through
//! [`ChainRpc`], so the retry and replacement decisions are testable
//! against scripted nodes.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::B256;
use evmkit_signer::Signer;
use evmkit_types::{
	FeeQuote, NetworkState, Receipt, SignedTx, TransactionHandle, TransactionIntent,
};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::builder::TransactionBuilder;
use crate::connection::{ChainRpc, EndpointConnection};
use crate::fees::FeeStrategy;
use crate::{RejectionReason, TxError};

/// Decides whether a pending transaction should be fee-replaced.
///
/// Evaluated against a fresh [`NetworkState`] on every idle poll tick, so
/// implementations need no RPC access of their own. Any `Fn(&NetworkState)
/// -> bool` closure qualifies.
pub trait RetryPredicate: Send + Sync {
	fn should_replace(&self, state: &NetworkState) -> bool;
}

impl<F> RetryPredicate for F
where
	F: Fn(&NetworkState) -> bool + Send + Sync,
{
	fn should_replace(&self, state: &NetworkState) -> bool {
		self(state)
	}
}

/// Confirmation-wait parameters.
#[derive(Clone)]
pub struct ConfirmOptions {
	/// Total time to wait before giving up with a timeout error.
	pub timeout: Duration,
	/// Delay between receipt polls.
	pub poll_interval: Duration,
	/// Optional trigger for same-nonce fee replacement while waiting.
	pub retry: Option<Arc<dyn RetryPredicate>>,
}

impl Default for ConfirmOptions {
	fn default() -> Self {
		Self {
			timeout: Duration::from_secs(120),
			poll_interval: Duration::from_secs(7),
			retry: None,
		}
	}
}

impl ConfirmOptions {
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;
		self
	}

	pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
		self.poll_interval = poll_interval;
		self
	}

	pub fn with_retry(mut self, retry: Arc<dyn RetryPredicate>) -> Self {
		self.retry = Some(retry);
		self
	}
}

/// A broadcast transaction being tracked to confirmation.
///
/// Carries everything needed to rebuild at the same nonce for fee
/// replacement. All hashes ever broadcast for this nonce stay in the
/// watched set.
#[derive(Debug, Clone)]
pub struct PendingTransaction {
	/// Handle for the most recently broadcast variant.
	pub handle: TransactionHandle,
	/// Chain the transaction was sent on.
	pub chain_id: u64,
	/// Sender nonce, shared by the original and any replacement.
	pub nonce: u64,
	intent: TransactionIntent,
	ceiling: Option<u128>,
	fee_summary: String,
	watched: Vec<B256>,
	replaced: bool,
}

impl PendingTransaction {
	/// All hashes broadcast for this nonce, oldest first.
	pub fn watched_hashes(&self) -> &[B256] {
		&self.watched
	}
}

/// Drives transactions from intent to confirmed receipt on one endpoint.
pub struct Submitter {
	conn: Arc<EndpointConnection>,
	fees: FeeStrategy,
	builder: TransactionBuilder,
}

impl Submitter {
	pub fn new(conn: Arc<EndpointConnection>, fees: FeeStrategy) -> Self {
		Self {
			conn,
			fees,
			builder: TransactionBuilder::new(),
		}
	}

	/// The connection this submitter broadcasts through.
	pub fn connection(&self) -> &Arc<EndpointConnection> {
		&self.conn
	}

	/// Broadcasts an already-signed transaction.
	pub async fn submit(&self, signed: &SignedTx) -> Result<TransactionHandle, TxError> {
		self.submit_via(self.conn.as_ref(), signed).await
	}

	/// Prices, builds, signs and broadcasts an intent.
	///
	/// A `ceiling` bounds the unit gas price; breaking it fails before
	/// anything is signed. A nonce-too-low rejection, which happens when
	/// another transaction consumed the cached nonce first, is retried
	/// once with a freshly fetched nonce.
	pub async fn send(
		&self,
		signer: &Signer,
		intent: &TransactionIntent,
		ceiling: Option<u128>,
	) -> Result<PendingTransaction, TxError> {
		self.send_via(self.conn.as_ref(), signer, intent, ceiling)
			.await
	}

	/// Waits until any watched hash is mined, or the timeout passes.
	///
	/// When a retry predicate is configured it is evaluated on every idle
	/// tick; a true result triggers at most one same-nonce fee
	/// replacement. Replacement failures are logged and polling continues,
	/// since the original transaction may still land.
	pub async fn confirm(
		&self,
		signer: &Signer,
		pending: &mut PendingTransaction,
		opts: &ConfirmOptions,
	) -> Result<Receipt, TxError> {
		self.confirm_via(self.conn.as_ref(), signer, pending, opts)
			.await
	}

	/// Convenience path: [`Submitter::send`] then [`Submitter::confirm`].
	pub async fn send_and_confirm(
		&self,
		signer: &Signer,
		intent: &TransactionIntent,
		ceiling: Option<u128>,
		opts: &ConfirmOptions,
	) -> Result<Receipt, TxError> {
		let mut pending = self.send(signer, intent, ceiling).await?;
		self.confirm(signer, &mut pending, opts).await
	}

	async fn submit_via(
		&self,
		rpc: &dyn ChainRpc,
		signed: &SignedTx,
	) -> Result<TransactionHandle, TxError> {
		let hash = rpc.submit_raw(signed).await?;
		info!(
			tx_hash = %hash,
			chain_id = signed.chain_id,
			nonce = signed.nonce,
			"Transaction accepted by node"
		);
		Ok(TransactionHandle::new(hash))
	}

	async fn send_via(
		&self,
		rpc: &dyn ChainRpc,
		signer: &Signer,
		intent: &TransactionIntent,
		ceiling: Option<u128>,
	) -> Result<PendingTransaction, TxError> {
		let quote = self.fees.quote(rpc, ceiling).await?;
		self.enforce_base_fee_cap(rpc, &quote).await?;

		let unsigned = self
			.builder
			.build(rpc, signer.address(), intent, &quote, None)
			.await?;
		let nonce = unsigned.nonce();
		let fee_summary = unsigned.fee_summary();
		let signed = signer.sign(unsigned).await?;

		let handle = match self.submit_via(rpc, &signed).await {
			Ok(handle) => handle,
			Err(TxError::RejectedByNode {
				reason: RejectionReason::NonceTooLow,
				message,
				..
			}) => {
				warn!(nonce, message, "Stale nonce, rebuilding with fresh account state");
				let fresh = rpc.pending_nonce(signer.address()).await?;
				let unsigned = self
					.builder
					.build(rpc, signer.address(), intent, &quote, Some(fresh))
					.await?;
				let signed = signer.sign(unsigned).await?;
				let handle = self.submit_via(rpc, &signed).await?;
				return Ok(PendingTransaction {
					chain_id: signed.chain_id,
					nonce: fresh,
					intent: intent.clone(),
					ceiling,
					fee_summary: signed.fee_summary.clone(),
					watched: vec![handle.hash],
					replaced: false,
					handle,
				});
			}
			Err(e) => return Err(e),
		};

		Ok(PendingTransaction {
			chain_id: signed.chain_id,
			nonce,
			intent: intent.clone(),
			ceiling,
			fee_summary,
			watched: vec![handle.hash],
			replaced: false,
			handle,
		})
	}

	async fn confirm_via(
		&self,
		rpc: &dyn ChainRpc,
		signer: &Signer,
		pending: &mut PendingTransaction,
		opts: &ConfirmOptions,
	) -> Result<Receipt, TxError> {
		let started = Instant::now();
		loop {
			for hash in pending.watched.clone() {
				if let Some(receipt) = rpc.receipt(hash).await? {
					info!(
						tx_hash = %receipt.hash,
						block_number = receipt.block_number,
						status = ?receipt.status,
						"Transaction confirmed"
					);
					return Ok(receipt);
				}
			}

			if started.elapsed() >= opts.timeout {
				return Err(TxError::ConfirmationTimeout {
					chain_id: pending.chain_id,
					nonce: pending.nonce,
					waited_secs: started.elapsed().as_secs(),
					fee_summary: pending.fee_summary.clone(),
				});
			}

			if let Some(retry) = &opts.retry {
				let state = rpc.network_state().await?;
				if retry.should_replace(&state) {
					if pending.replaced {
						debug!(
							nonce = pending.nonce,
							"Replacement already in flight, keeping all hashes watched"
						);
					} else if let Err(e) = self.replace_via(rpc, signer, pending).await {
						warn!(
							nonce = pending.nonce,
							error = %e,
							"Fee replacement failed, continuing to poll the original"
						);
					}
				}
			}

			sleep(opts.poll_interval).await;
		}
	}

	/// Rebuilds the intent at the same nonce with a fresh quote and
	/// broadcasts it as a replacement.
	async fn replace_via(
		&self,
		rpc: &dyn ChainRpc,
		signer: &Signer,
		pending: &mut PendingTransaction,
	) -> Result<(), TxError> {
		let quote = self.fees.quote(rpc, pending.ceiling).await?;
		self.enforce_base_fee_cap(rpc, &quote).await?;
		let unsigned = self
			.builder
			.build(
				rpc,
				signer.address(),
				&pending.intent,
				&quote,
				Some(pending.nonce),
			)
			.await?;
		let fee_summary = unsigned.fee_summary();
		let signed = signer.sign(unsigned).await?;
		let handle = self.submit_via(rpc, &signed).await?;
		info!(
			nonce = pending.nonce,
			old_tx_hash = %pending.handle.hash,
			new_tx_hash = %handle.hash,
			"Broadcast fee replacement"
		);
		pending.watched.push(handle.hash);
		pending.handle = handle;
		pending.fee_summary = fee_summary;
		pending.replaced = true;
		Ok(())
	}

	/// Fails fast when the network base fee exceeds the quote's standing
	/// cap, so a stale cap never silently overpays. Legacy quotes compare
	/// the gas price instead, since no base fee exists there.
	async fn enforce_base_fee_cap(
		&self,
		rpc: &dyn ChainRpc,
		quote: &FeeQuote,
	) -> Result<(), TxError> {
		let Some(cap) = quote.base_fee_cap else {
			return Ok(());
		};
		let current = if quote.is_fee_market() {
			rpc.latest_base_fee().await?.unwrap_or_default()
		} else {
			rpc.gas_price().await?
		};
		if current > cap {
			return Err(TxError::FeeExceedsCeiling {
				quoted: current,
				ceiling: cap,
			});
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy::primitives::{Address, Bytes, U256};
	use async_trait::async_trait;
	use evmkit_signer::Credential;
	use evmkit_types::{ChainEndpoint, ReceiptStatus, SecretString};
	use std::collections::VecDeque;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::sync::Mutex;

	const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

	// Scripted node: fixed gas data, receipt responses consumed one per
	// poll tick, and a configurable run of nonce-too-low rejections.
	struct ScriptedNode {
		endpoint: ChainEndpoint,
		receipts: Mutex<VecDeque<Option<Receipt>>>,
		nonces: Mutex<VecDeque<u64>>,
		reject_nonces_below: u64,
		submitted: Mutex<Vec<u64>>,
		state_calls: AtomicUsize,
	}

	impl ScriptedNode {
		fn new() -> Self {
			Self {
				endpoint: ChainEndpoint::fee_market(31337, "http://localhost:8545"),
				receipts: Mutex::new(VecDeque::new()),
				nonces: Mutex::new(VecDeque::new()),
				reject_nonces_below: 0,
				submitted: Mutex::new(Vec::new()),
				state_calls: AtomicUsize::new(0),
			}
		}

		fn with_receipts(receipts: Vec<Option<Receipt>>) -> Self {
			Self {
				receipts: Mutex::new(receipts.into()),
				..Self::new()
			}
		}

		fn with_nonces(nonces: Vec<u64>, reject_below: u64) -> Self {
			Self {
				nonces: Mutex::new(nonces.into()),
				reject_nonces_below: reject_below,
				..Self::new()
			}
		}
	}

	#[async_trait]
	impl ChainRpc for ScriptedNode {
		fn endpoint(&self) -> &ChainEndpoint {
			&self.endpoint
		}

		async fn pending_nonce(&self, _address: Address) -> Result<u64, TxError> {
			self.nonces
				.lock()
				.unwrap()
				.pop_front()
				.ok_or_else(|| TxError::Network("no scripted nonce".to_string()))
		}

		async fn gas_price(&self) -> Result<u128, TxError> {
			Ok(1_010_000_000)
		}

		async fn suggest_priority_fee(&self) -> Result<u128, TxError> {
			Ok(10_000_000)
		}

		async fn latest_base_fee(&self) -> Result<Option<u128>, TxError> {
			Ok(Some(1_000_000_000))
		}

		async fn estimate_gas(
			&self,
			_from: Address,
			_to: Address,
			_value: U256,
			_data: Option<Bytes>,
		) -> Result<u64, TxError> {
			Ok(21_000)
		}

		async fn submit_raw(&self, signed: &SignedTx) -> Result<B256, TxError> {
			self.submitted.lock().unwrap().push(signed.nonce);
			if signed.nonce < self.reject_nonces_below {
				return Err(TxError::RejectedByNode {
					reason: RejectionReason::NonceTooLow,
					message: "nonce too low".to_string(),
					chain_id: signed.chain_id,
					nonce: signed.nonce,
				});
			}
			Ok(signed.hash)
		}

		async fn receipt(&self, _hash: B256) -> Result<Option<Receipt>, TxError> {
			Ok(self.receipts.lock().unwrap().pop_front().flatten())
		}

		async fn network_state(&self) -> Result<NetworkState, TxError> {
			self.state_calls.fetch_add(1, Ordering::SeqCst);
			Ok(NetworkState {
				chain_id: 31337,
				base_fee_per_gas: Some(1_000_000_000),
				gas_price: 1_010_000_000,
				block_number: 100,
				timestamp: 0,
			})
		}
	}

	fn test_submitter() -> Submitter {
		let endpoint = ChainEndpoint::fee_market(31337, "http://localhost:8545");
		let conn = Arc::new(EndpointConnection::connect(endpoint).unwrap());
		Submitter::new(conn, FeeStrategy::new())
	}

	fn test_signer() -> Signer {
		Signer::new(Credential::from_secret(&SecretString::from(DEV_KEY), 31337).unwrap())
	}

	fn pending_with_hash(hash: B256) -> PendingTransaction {
		PendingTransaction {
			handle: TransactionHandle::new(hash),
			chain_id: 31337,
			nonce: 4,
			intent: TransactionIntent::native_transfer(Address::ZERO, U256::from(1u64)),
			ceiling: None,
			fee_summary: "max_fee_per_gas=100 max_priority_fee_per_gas=1".to_string(),
			watched: vec![hash],
			replaced: false,
		}
	}

	fn mined(hash: B256) -> Receipt {
		Receipt {
			hash,
			status: ReceiptStatus::Success,
			block_number: 101,
			gas_used: 21_000,
		}
	}

	#[tokio::test]
	async fn stale_nonce_is_refetched_once_and_the_caller_sees_only_success() {
		let submitter = test_submitter();
		let signer = test_signer();
		// First build resolves nonce 3, which the node rejects as already
		// consumed; the refetch resolves 5.
		let node = ScriptedNode::with_nonces(vec![3, 5], 5);
		let intent = TransactionIntent::native_transfer(Address::ZERO, U256::from(1u64));

		let pending = submitter
			.send_via(&node, &signer, &intent, None)
			.await
			.unwrap();

		assert_eq!(pending.nonce, 5);
		assert_eq!(pending.watched_hashes().len(), 1);
		assert_eq!(pending.watched_hashes()[0], pending.handle.hash);
		// Exactly two broadcast attempts, and the rejection never
		// surfaced to the caller.
		assert_eq!(*node.submitted.lock().unwrap(), vec![3, 5]);
	}

	#[tokio::test]
	async fn other_rejections_are_not_retried() {
		let submitter = test_submitter();
		let signer = test_signer();
		// Nonce 3 is rejected, and the fresh-nonce pool is empty; if the
		// rejection were retried more than once this would be a Network
		// error from the exhausted pool instead.
		let node = ScriptedNode::with_nonces(vec![3, 3], 5);
		let intent = TransactionIntent::native_transfer(Address::ZERO, U256::from(1u64));

		let err = submitter
			.send_via(&node, &signer, &intent, None)
			.await
			.unwrap_err();
		assert!(matches!(
			err,
			TxError::RejectedByNode {
				reason: RejectionReason::NonceTooLow,
				..
			}
		));
		assert_eq!(*node.submitted.lock().unwrap(), vec![3, 3]);
	}

	#[tokio::test(start_paused = true)]
	async fn confirm_returns_receipt_found_on_a_later_poll() {
		let submitter = test_submitter();
		let signer = test_signer();
		let hash = B256::with_last_byte(1);
		let mut pending = pending_with_hash(hash);

		let node = ScriptedNode::with_receipts(vec![None, None, Some(mined(hash))]);
		let opts = ConfirmOptions::default()
			.with_poll_interval(Duration::from_secs(1))
			.with_timeout(Duration::from_secs(60));

		let receipt = submitter
			.confirm_via(&node, &signer, &mut pending, &opts)
			.await
			.unwrap();
		assert_eq!(receipt.hash, hash);
		assert!(receipt.is_success());
	}

	#[tokio::test(start_paused = true)]
	async fn confirm_times_out_at_or_after_the_deadline() {
		let submitter = test_submitter();
		let signer = test_signer();
		let mut pending = pending_with_hash(B256::with_last_byte(2));

		let node = ScriptedNode::new();
		let opts = ConfirmOptions::default()
			.with_poll_interval(Duration::from_secs(1))
			.with_timeout(Duration::from_secs(5));

		let err = submitter
			.confirm_via(&node, &signer, &mut pending, &opts)
			.await
			.unwrap_err();
		match err {
			TxError::ConfirmationTimeout {
				nonce, waited_secs, ..
			} => {
				assert_eq!(nonce, 4);
				assert!(waited_secs >= 5);
			}
			other => panic!("unexpected error: {:?}", other),
		}
	}

	#[tokio::test(start_paused = true)]
	async fn retry_predicate_sees_fresh_state_on_every_idle_tick() {
		let submitter = test_submitter();
		let signer = test_signer();
		let mut pending = pending_with_hash(B256::with_last_byte(3));

		let node = ScriptedNode::new();
		// Predicate declines every time, so no replacement is attempted.
		let opts = ConfirmOptions::default()
			.with_poll_interval(Duration::from_secs(1))
			.with_timeout(Duration::from_secs(3))
			.with_retry(Arc::new(|state: &NetworkState| {
				assert_eq!(state.chain_id, 31337);
				false
			}));

		let err = submitter
			.confirm_via(&node, &signer, &mut pending, &opts)
			.await
			.unwrap_err();
		assert!(matches!(err, TxError::ConfirmationTimeout { .. }));
		assert!(node.state_calls.load(Ordering::SeqCst) >= 3);
		assert_eq!(pending.watched_hashes().len(), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn replacement_broadcasts_once_and_watches_both_hashes() {
		let submitter = test_submitter();
		let signer = test_signer();
		let original = B256::with_last_byte(4);
		let mut pending = pending_with_hash(original);

		let node = ScriptedNode::new();
		// Predicate fires on every tick; only one replacement may go out.
		let opts = ConfirmOptions::default()
			.with_poll_interval(Duration::from_secs(1))
			.with_timeout(Duration::from_secs(4))
			.with_retry(Arc::new(|_: &NetworkState| true));

		let err = submitter
			.confirm_via(&node, &signer, &mut pending, &opts)
			.await
			.unwrap_err();
		assert!(matches!(err, TxError::ConfirmationTimeout { .. }));
		assert_eq!(node.submitted.lock().unwrap().len(), 1);
		assert_eq!(*node.submitted.lock().unwrap(), vec![pending.nonce]);
		assert_eq!(pending.watched_hashes().len(), 2);
		assert_eq!(pending.watched_hashes()[0], original);
		assert_eq!(pending.watched_hashes()[1], pending.handle.hash);
	}
}
