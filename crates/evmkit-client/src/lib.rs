//! High-level chain client: one type for native coin and ERC-20 operations.
//!
//! [`ChainClient`] ties the registry, the transaction engine and the
//! subscription core together. Transfers of the native coin and of ERC-20
//! tokens share one submission path; the only difference is who the
//! recipient of the underlying transaction is (an account, or the token
//! contract with transfer calldata). Read helpers cover the common ERC-20
//! views without a full contract-binding layer.

pub mod erc20;

use std::sync::Arc;

use alloy::primitives::{Address, B256, U256};
use evmkit_config::{ConfigError, Registry};
use evmkit_signer::{Credential, Signer, SignerError};
use evmkit_stream::{ErrorSink, EventHandler, EventSubscriber, StreamError, Subscription};
use evmkit_tx::{
	ConfirmOptions, EndpointConnection, FeeStrategy, PendingTransaction, Submitter, TxError,
};
use evmkit_types::{
	ChainEndpoint, NetworkState, Receipt, SecretString, SubscriptionKind, TransactionIntent,
};
use thiserror::Error;
use tracing::info;

pub use evmkit_tx::RetryPredicate;

/// Errors surfaced by the client facade.
#[derive(Debug, Error)]
pub enum ClientError {
	/// Error that occurs while resolving registry entries.
	#[error("Configuration error: {0}")]
	Config(#[from] ConfigError),
	/// Error from the transaction engine.
	#[error(transparent)]
	Tx(#[from] TxError),
	/// Error from the subscription core.
	#[error(transparent)]
	Stream(#[from] StreamError),
	/// Error while preparing the signing credential.
	#[error("Signer error: {0}")]
	Signer(#[from] SignerError),
	/// Error that occurs when decoding a contract return value.
	#[error("ABI decode error: {0}")]
	Decode(String),
	/// Error that occurs when a write operation is attempted on a
	/// read-only client.
	#[error("No signing credential configured")]
	MissingCredential,
}

/// Client for one chain, optionally able to sign and send.
///
/// Without a credential the client is read-only; write operations fail
/// with [`ClientError::MissingCredential`] before touching the network.
pub struct ChainClient {
	endpoint: ChainEndpoint,
	conn: Arc<EndpointConnection>,
	submitter: Submitter,
	subscriber: EventSubscriber,
	signer: Option<Signer>,
	confirm_options: ConfirmOptions,
}

impl ChainClient {
	/// Creates a read-only client for the endpoint.
	pub fn connect(endpoint: ChainEndpoint) -> Result<Self, ClientError> {
		let conn = Arc::new(EndpointConnection::connect(endpoint.clone())?);
		let submitter = Submitter::new(conn.clone(), FeeStrategy::new());
		let subscriber = EventSubscriber::new(endpoint.clone());
		info!(chain_id = endpoint.chain_id, "Chain client connected");
		Ok(Self {
			endpoint,
			conn,
			submitter,
			subscriber,
			signer: None,
			confirm_options: ConfirmOptions::default(),
		})
	}

	/// Creates a client for a named chain in the registry.
	pub fn from_registry(registry: &Registry, chain: &str) -> Result<Self, ClientError> {
		Self::connect(registry.endpoint(chain)?)
	}

	/// Attaches a signing credential, enabling write operations.
	pub fn with_credential(mut self, secret: &SecretString) -> Result<Self, ClientError> {
		let credential = Credential::from_secret(secret, self.endpoint.chain_id)?;
		self.signer = Some(Signer::new(credential));
		Ok(self)
	}

	/// Replaces the default fee strategy.
	pub fn with_fee_strategy(mut self, fees: FeeStrategy) -> Self {
		self.submitter = Submitter::new(self.conn.clone(), fees);
		self
	}

	/// Replaces the default confirmation options used by the transfer
	/// helpers.
	pub fn with_confirm_options(mut self, opts: ConfirmOptions) -> Self {
		self.confirm_options = opts;
		self
	}

	/// The endpoint this client targets.
	pub fn endpoint(&self) -> &ChainEndpoint {
		&self.endpoint
	}

	/// The signing address, when a credential is configured.
	pub fn address(&self) -> Option<Address> {
		self.signer.as_ref().map(|s| s.address())
	}

	/// The underlying submitter, for callers needing send/confirm split
	/// control or custom retry predicates.
	pub fn submitter(&self) -> &Submitter {
		&self.submitter
	}

	fn signer(&self) -> Result<&Signer, ClientError> {
		self.signer.as_ref().ok_or(ClientError::MissingCredential)
	}

	/// Transfers native coin and waits for confirmation.
	pub async fn transfer_native(
		&self,
		to: Address,
		amount_wei: U256,
		fee_ceiling: Option<u128>,
	) -> Result<Receipt, ClientError> {
		let signer = self.signer()?;
		let intent = TransactionIntent::native_transfer(to, amount_wei);
		Ok(self
			.submitter
			.send_and_confirm(signer, &intent, fee_ceiling, &self.confirm_options)
			.await?)
	}

	/// Transfers ERC-20 tokens and waits for confirmation. `amount` is in
	/// the token's smallest unit.
	pub async fn transfer_token(
		&self,
		token: Address,
		to: Address,
		amount: U256,
		fee_ceiling: Option<u128>,
	) -> Result<Receipt, ClientError> {
		let signer = self.signer()?;
		let intent = TransactionIntent::contract_call(token, erc20::transfer_calldata(to, amount));
		Ok(self
			.submitter
			.send_and_confirm(signer, &intent, fee_ceiling, &self.confirm_options)
			.await?)
	}

	/// Approves a spender for an ERC-20 allowance and waits for
	/// confirmation.
	pub async fn approve(
		&self,
		token: Address,
		spender: Address,
		amount: U256,
		fee_ceiling: Option<u128>,
	) -> Result<Receipt, ClientError> {
		let signer = self.signer()?;
		let intent =
			TransactionIntent::contract_call(token, erc20::approve_calldata(spender, amount));
		Ok(self
			.submitter
			.send_and_confirm(signer, &intent, fee_ceiling, &self.confirm_options)
			.await?)
	}

	/// Broadcasts an arbitrary intent without waiting for confirmation.
	pub async fn send(
		&self,
		intent: &TransactionIntent,
		fee_ceiling: Option<u128>,
	) -> Result<PendingTransaction, ClientError> {
		let signer = self.signer()?;
		Ok(self.submitter.send(signer, intent, fee_ceiling).await?)
	}

	/// Waits for a previously sent transaction to confirm.
	pub async fn confirm(&self, pending: &mut PendingTransaction) -> Result<Receipt, ClientError> {
		let signer = self.signer()?;
		Ok(self
			.submitter
			.confirm(signer, pending, &self.confirm_options)
			.await?)
	}

	/// Native coin balance of an address, in wei.
	pub async fn native_balance(&self, address: Address) -> Result<U256, ClientError> {
		Ok(self.conn.balance(address).await?)
	}

	/// ERC-20 balance of an owner, in the token's smallest unit.
	pub async fn token_balance(&self, token: Address, owner: Address) -> Result<U256, ClientError> {
		let data = self.conn.call(token, erc20::balance_of_calldata(owner)).await?;
		erc20::decode_uint(&data)
	}

	/// Remaining ERC-20 allowance from owner to spender.
	pub async fn allowance(
		&self,
		token: Address,
		owner: Address,
		spender: Address,
	) -> Result<U256, ClientError> {
		let data = self
			.conn
			.call(token, erc20::allowance_calldata(owner, spender))
			.await?;
		erc20::decode_uint(&data)
	}

	/// Decimal places of an ERC-20 token.
	pub async fn token_decimals(&self, token: Address) -> Result<u8, ClientError> {
		let data = self.conn.call(token, erc20::decimals_calldata()).await?;
		erc20::decode_decimals(&data)
	}

	/// Symbol of an ERC-20 token.
	pub async fn token_symbol(&self, token: Address) -> Result<String, ClientError> {
		let data = self.conn.call(token, erc20::symbol_calldata()).await?;
		erc20::decode_symbol(&data)
	}

	/// Full name of an ERC-20 token.
	pub async fn token_name(&self, token: Address) -> Result<String, ClientError> {
		let data = self.conn.call(token, erc20::name_calldata()).await?;
		erc20::decode_name(&data)
	}

	/// Total supply of an ERC-20 token, in its smallest unit.
	pub async fn token_total_supply(&self, token: Address) -> Result<U256, ClientError> {
		let data = self.conn.call(token, erc20::total_supply_calldata()).await?;
		erc20::decode_total_supply(&data)
	}

	/// Latest block number.
	pub async fn block_number(&self) -> Result<u64, ClientError> {
		Ok(self.conn.block_number().await?)
	}

	/// Snapshot of current gas conditions.
	pub async fn network_state(&self) -> Result<NetworkState, ClientError> {
		Ok(self.conn.network_state().await?)
	}

	/// Receipt for an arbitrary hash, if mined.
	pub async fn receipt(&self, hash: B256) -> Result<Option<Receipt>, ClientError> {
		Ok(self.conn.receipt(hash).await?)
	}

	/// Subscribes to pending transaction hashes. Requires a `ws_url` on
	/// the endpoint.
	pub fn subscribe_pending_txs(
		&self,
		handler: Arc<dyn EventHandler>,
		errors: ErrorSink,
	) -> Result<Subscription, ClientError> {
		Ok(self
			.subscriber
			.subscribe(SubscriptionKind::PendingTx, handler, errors)?)
	}

	/// Subscribes to new block headers. Requires a `ws_url` on the
	/// endpoint.
	pub fn subscribe_new_blocks(
		&self,
		handler: Arc<dyn EventHandler>,
		errors: ErrorSink,
	) -> Result<Subscription, ClientError> {
		Ok(self
			.subscriber
			.subscribe(SubscriptionKind::NewBlock, handler, errors)?)
	}
}
