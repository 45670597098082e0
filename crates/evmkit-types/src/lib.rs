//! Common types for the evmkit chain client.
//!
//! This crate defines the data model shared by every evmkit component:
//! endpoint descriptions, transaction intents and their signed forms, fee
//! quotes, receipts, and the event types produced by chain subscriptions.
//! Keeping them in one place ensures the builder, signer, submitter and
//! subscriber all agree on the same representations.

/// RPC endpoint description for a single chain.
pub mod endpoint;
/// Chain event and subscription lifecycle types.
pub mod events;
/// Fee quote types for legacy and fee-market pricing.
pub mod fees;
/// Secure string type for private keys.
pub mod secret_string;
/// Transaction intents, unsigned/signed transactions and receipts.
pub mod transaction;

pub use endpoint::ChainEndpoint;
pub use events::{BlockHeader, ChainEvent, SubscriptionKind, SubscriptionState};
pub use fees::FeeQuote;
pub use secret_string::SecretString;
pub use transaction::{
	IntentKind, NetworkState, Receipt, ReceiptStatus, SignedTx, TransactionHandle,
	TransactionIntent, UnsignedTx,
};
