//! Transaction signing for the evmkit chain client.
//!
//! This crate turns an assembled [`UnsignedTx`] into an immutable
//! [`SignedTx`] using a local private credential. Signing is a pure function
//! of the transaction and the key; no shared state is involved. Signatures
//! are chain-id bound (EIP-155 for legacy transactions, the explicit chain
//! id field for typed ones), which prevents cross-chain replay.

use alloy::consensus::{SignableTransaction, TxEnvelope};
use alloy::eips::eip2718::Encodable2718;
use alloy::network::TxSigner;
use alloy::primitives::{Address, Signature};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer as _;
use evmkit_types::{SecretString, SignedTx, UnsignedTx};
use thiserror::Error;

/// Errors that can occur during signing operations.
#[derive(Debug, Error)]
pub enum SignerError {
	/// The credential cannot produce a valid signature for the declared
	/// chain id: the key is malformed, or it is bound to another chain.
	#[error("Invalid credential: {0}")]
	InvalidCredential(String),
	/// The signing operation itself failed.
	#[error("Signing failed: {0}")]
	SigningFailed(String),
}

/// A private credential bound to one chain id.
///
/// Parsed once from a [`SecretString`]; the derived address is available
/// without exposing the key again.
#[derive(Debug, Clone)]
pub struct Credential {
	inner: PrivateKeySigner,
}

impl Credential {
	/// Parses a hex-encoded secp256k1 private key and binds it to the
	/// given chain id.
	pub fn from_secret(secret: &SecretString, chain_id: u64) -> Result<Self, SignerError> {
		let signer: PrivateKeySigner = secret.with_exposed(|key| {
			key.parse().map_err(|_| {
				SignerError::InvalidCredential(
					"private key is not a valid secp256k1 hex string".to_string(),
				)
			})
		})?;
		Ok(Self {
			inner: signer.with_chain_id(Some(chain_id)),
		})
	}

	/// The address derived from the private key.
	pub fn address(&self) -> Address {
		self.inner.address()
	}

	/// The chain id the credential is bound to.
	pub fn chain_id(&self) -> Option<u64> {
		self.inner.chain_id()
	}
}

/// Signs transactions and messages with a local credential.
///
/// Stateless given the credential; a single instance can be shared freely
/// across tasks.
#[derive(Debug, Clone)]
pub struct Signer {
	credential: Credential,
}

impl Signer {
	/// Creates a signer from a parsed credential.
	pub fn new(credential: Credential) -> Self {
		Self { credential }
	}

	/// The signing address.
	pub fn address(&self) -> Address {
		self.credential.address()
	}

	/// Signs a transaction, producing the broadcast-ready form.
	///
	/// Fails with [`SignerError::InvalidCredential`] when the transaction
	/// declares a chain id the credential is not bound to.
	pub async fn sign(&self, unsigned: UnsignedTx) -> Result<SignedTx, SignerError> {
		if let Some(bound) = self.credential.chain_id() {
			if unsigned.chain_id() != bound {
				return Err(SignerError::InvalidCredential(format!(
					"credential is bound to chain {} but transaction declares chain {}",
					bound,
					unsigned.chain_id()
				)));
			}
		}

		let fee_summary = unsigned.fee_summary();
		let chain_id = unsigned.chain_id();
		let nonce = unsigned.nonce();

		let (hash, envelope) = match unsigned {
			UnsignedTx::Eip1559(mut tx) => {
				let signature = self.sign_signable(&mut tx).await?;
				let signed = tx.into_signed(signature);
				(*signed.hash(), TxEnvelope::from(signed))
			}
			UnsignedTx::Legacy(mut tx) => {
				let signature = self.sign_signable(&mut tx).await?;
				let signed = tx.into_signed(signature);
				(*signed.hash(), TxEnvelope::from(signed))
			}
		};

		let raw = envelope.encoded_2718();
		tracing::debug!(tx_hash = %hash, chain_id, nonce, "Signed transaction");

		Ok(SignedTx {
			raw: raw.into(),
			hash,
			signer: self.address(),
			chain_id,
			nonce,
			fee_summary,
		})
	}

	/// Signs an arbitrary message with EIP-191 personal-sign encoding.
	pub async fn sign_message(&self, message: &[u8]) -> Result<Signature, SignerError> {
		self.credential
			.inner
			.sign_message(message)
			.await
			.map_err(|e| SignerError::SigningFailed(e.to_string()))
	}

	/// Returns true if the EIP-191 signature over `message` was produced
	/// by this signer's credential.
	pub fn is_message_signed_by_me(&self, message: &[u8], signature: &Signature) -> bool {
		signature
			.recover_address_from_msg(message)
			.map(|addr| addr == self.address())
			.unwrap_or(false)
	}

	async fn sign_signable<T>(&self, tx: &mut T) -> Result<Signature, SignerError>
	where
		T: SignableTransaction<Signature> + Send,
	{
		TxSigner::sign_transaction(&self.credential.inner, tx)
			.await
			.map_err(|e| SignerError::SigningFailed(e.to_string()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy::consensus::{TxEip1559, TxLegacy};
	use alloy::eips::eip2718::Decodable2718;
	use alloy::primitives::{TxKind, U256};

	// Well-known development key (anvil account 0); never funded on mainnet.
	const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
	const DEV_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

	fn dev_signer(chain_id: u64) -> Signer {
		let credential =
			Credential::from_secret(&SecretString::from(DEV_KEY), chain_id).unwrap();
		Signer::new(credential)
	}

	fn sample_eip1559(chain_id: u64) -> TxEip1559 {
		TxEip1559 {
			chain_id,
			nonce: 0,
			gas_limit: 21_000,
			max_fee_per_gas: 50_000_000_000,
			max_priority_fee_per_gas: 1_000_000_000,
			to: TxKind::Call(Address::ZERO),
			value: U256::from(1u64),
			..Default::default()
		}
	}

	#[test]
	fn credential_derives_expected_address() {
		let signer = dev_signer(1);
		assert_eq!(
			signer.address(),
			DEV_ADDRESS.parse::<Address>().unwrap()
		);
	}

	#[test]
	fn malformed_key_is_invalid_credential() {
		let err = Credential::from_secret(&SecretString::from("not-a-key"), 1).unwrap_err();
		assert!(matches!(err, SignerError::InvalidCredential(_)));
	}

	#[tokio::test]
	async fn signature_recovers_to_signing_address() {
		let signer = dev_signer(1);
		let tx = sample_eip1559(1);
		let sig_hash = tx.signature_hash();

		let signed = signer.sign(UnsignedTx::Eip1559(tx)).await.unwrap();
		assert_eq!(signed.chain_id, 1);
		assert_eq!(signed.signer, signer.address());

		let envelope = TxEnvelope::decode_2718(&mut signed.raw.as_ref()).unwrap();
		match envelope {
			TxEnvelope::Eip1559(inner) => {
				let recovered = inner
					.signature()
					.recover_address_from_prehash(&sig_hash)
					.unwrap();
				assert_eq!(recovered, signer.address());
			}
			other => panic!("unexpected envelope variant: {:?}", other),
		}
	}

	#[tokio::test]
	async fn chain_id_mismatch_is_rejected() {
		let signer = dev_signer(1);
		let tx = sample_eip1559(137);
		let err = signer.sign(UnsignedTx::Eip1559(tx)).await.unwrap_err();
		assert!(matches!(err, SignerError::InvalidCredential(_)));
	}

	#[tokio::test]
	async fn different_chains_produce_different_raw_bytes() {
		let mainnet = dev_signer(1);
		let polygon = dev_signer(137);

		let a = mainnet.sign(UnsignedTx::Eip1559(sample_eip1559(1))).await.unwrap();
		let b = polygon.sign(UnsignedTx::Eip1559(sample_eip1559(137))).await.unwrap();
		assert_ne!(a.raw, b.raw);
		assert_ne!(a.hash, b.hash);
	}

	#[tokio::test]
	async fn legacy_transactions_sign_and_carry_gas_price() {
		let signer = dev_signer(56);
		let tx = TxLegacy {
			chain_id: Some(56),
			nonce: 3,
			gas_price: 5_000_000_000,
			gas_limit: 21_000,
			to: TxKind::Call(Address::ZERO),
			value: U256::from(7u64),
			..Default::default()
		};

		let signed = signer.sign(UnsignedTx::Legacy(tx)).await.unwrap();
		assert_eq!(signed.nonce, 3);
		assert!(signed.fee_summary.contains("gas_price=5000000000"));
		assert!(!signed.raw.is_empty());
	}

	#[tokio::test]
	async fn message_signature_verifies_for_signer_only() {
		let signer = dev_signer(1);
		let message = b"delegate voting power";
		let signature = signer.sign_message(message).await.unwrap();

		assert!(signer.is_message_signed_by_me(message, &signature));
		assert!(!signer.is_message_signed_by_me(b"another message", &signature));
	}
}
