//! Transaction lifecycle engine for the evmkit chain client.
//!
//! This crate owns the path from a [`TransactionIntent`] to a confirmed
//! receipt: fee pricing ([`FeeStrategy`]), nonce and gas assembly
//! ([`TransactionBuilder`]), broadcast and confirmation tracking
//! ([`Submitter`]). Signing stays in `evmkit-signer`; this crate only calls
//! into it. All node access goes through [`EndpointConnection`] so the
//! higher layers never hold a raw provider.
//!
//! [`TransactionIntent`]: evmkit_types::TransactionIntent

pub mod builder;
pub mod connection;
pub mod fees;
pub mod submitter;

pub use builder::TransactionBuilder;
pub use connection::{ChainRpc, EndpointConnection};
pub use fees::FeeStrategy;
pub use submitter::{ConfirmOptions, PendingTransaction, RetryPredicate, Submitter};

use evmkit_signer::SignerError;
use thiserror::Error;

/// Errors that can occur during transaction processing.
#[derive(Debug, Error)]
pub enum TxError {
	/// Error that occurs when communicating with the node.
	#[error("Network error: {0}")]
	Network(String),
	/// Error that occurs when a computed fee breaks the caller's ceiling.
	/// No transaction is built or broadcast in this case.
	#[error("Quoted fee {quoted} wei/gas exceeds ceiling {ceiling} wei/gas")]
	FeeExceedsCeiling { quoted: u128, ceiling: u128 },
	/// Error that occurs when the node cannot estimate gas for an intent,
	/// usually because the call would revert.
	#[error("Gas estimation failed: {0}")]
	GasEstimationFailed(String),
	/// Error raised while parsing or using the signing credential; the
	/// inner error already says whether the credential or the signing
	/// operation is at fault.
	#[error(transparent)]
	Signer(#[from] SignerError),
	/// Error that occurs when the node refuses a broadcast transaction.
	#[error("Transaction rejected by node ({reason:?}) on chain {chain_id}, nonce {nonce}: {message}")]
	RejectedByNode {
		reason: RejectionReason,
		message: String,
		chain_id: u64,
		nonce: u64,
	},
	/// Error that occurs when no watched transaction is mined in time.
	/// The transaction may still land later; the nonce stays consumed.
	#[error("No receipt after {waited_secs}s on chain {chain_id}, nonce {nonce} ({fee_summary})")]
	ConfirmationTimeout {
		chain_id: u64,
		nonce: u64,
		waited_secs: u64,
		fee_summary: String,
	},
}

/// Coarse classification of node rejection messages.
///
/// Node error strings are not standardized; classification is by substring
/// and falls back to [`RejectionReason::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
	/// The nonce was already consumed by a mined transaction.
	NonceTooLow,
	/// The sender balance cannot cover value plus max gas cost.
	InsufficientFunds,
	/// The fee is below the node's acceptance or replacement floor.
	Underpriced,
	/// The exact transaction is already in the node's pool.
	AlreadyKnown,
	/// Anything the patterns above do not cover.
	Other,
}

impl RejectionReason {
	/// Classifies a node error message.
	pub fn classify(message: &str) -> Self {
		let lower = message.to_lowercase();
		if lower.contains("nonce too low") || lower.contains("nonce is too low") {
			RejectionReason::NonceTooLow
		} else if lower.contains("insufficient funds") {
			RejectionReason::InsufficientFunds
		} else if lower.contains("underpriced") {
			RejectionReason::Underpriced
		} else if lower.contains("already known") || lower.contains("known transaction") {
			RejectionReason::AlreadyKnown
		} else {
			RejectionReason::Other
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn signer_errors_render_without_a_credential_prefix() {
		let failed = TxError::from(SignerError::SigningFailed("hardware fault".to_string()));
		assert_eq!(failed.to_string(), "Signing failed: hardware fault");

		let invalid = TxError::from(SignerError::InvalidCredential("bad key".to_string()));
		assert_eq!(invalid.to_string(), "Invalid credential: bad key");
	}

	#[test]
	fn rejection_messages_classify_by_substring() {
		assert_eq!(
			RejectionReason::classify("nonce too low: next nonce 5, tx nonce 3"),
			RejectionReason::NonceTooLow
		);
		assert_eq!(
			RejectionReason::classify("INSUFFICIENT FUNDS for gas * price + value"),
			RejectionReason::InsufficientFunds
		);
		assert_eq!(
			RejectionReason::classify("replacement transaction underpriced"),
			RejectionReason::Underpriced
		);
		assert_eq!(
			RejectionReason::classify("already known"),
			RejectionReason::AlreadyKnown
		);
		assert_eq!(
			RejectionReason::classify("execution aborted"),
			RejectionReason::Other
		);
	}
}
