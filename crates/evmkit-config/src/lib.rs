//! Chain and token registry for the evmkit client.
//!
//! This crate holds the configuration side of the system: named chain
//! entries (RPC endpoints, chain ids, fee-market flags) and ERC-20 token
//! entries (contract address and decimals per chain). Registries load from
//! TOML files or come built in via [`presets::default_registry`]. The core
//! engine never parses registry files itself; it only consumes the resolved
//! [`ChainEndpoint`] and address values produced here.

pub mod presets;

use alloy::primitives::Address;
use evmkit_types::ChainEndpoint;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while loading or querying a registry.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
	/// Error that occurs when a chain name is not in the registry.
	#[error("Chain '{0}' not supported")]
	ChainNotFound(String),
	/// Error that occurs when a token is not in the registry.
	#[error("Token '{symbol}' on chain '{chain}' not supported")]
	TokenNotFound { symbol: String, chain: String },
	/// Error that occurs when a token lookup matches more than one entry.
	#[error("Found {count} registry entries for token '{symbol}' on chain '{chain}'")]
	TokenNotUnique {
		symbol: String,
		chain: String,
		count: usize,
	},
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		ConfigError::Parse(err.message().to_string())
	}
}

/// One named chain in the registry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChainEntry {
	/// EIP-155 chain id.
	pub chain_id: u64,
	/// HTTP(S) JSON-RPC endpoint.
	pub rpc_url: String,
	/// WebSocket endpoint for subscriptions.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub ws_url: Option<String>,
	/// Whether the chain uses EIP-1559 fee-market pricing.
	pub supports_fee_market: bool,
}

impl ChainEntry {
	/// Resolves the entry into the endpoint value the engine consumes.
	pub fn to_endpoint(&self) -> ChainEndpoint {
		ChainEndpoint {
			chain_id: self.chain_id,
			rpc_url: self.rpc_url.clone(),
			ws_url: self.ws_url.clone(),
			supports_fee_market: self.supports_fee_market,
		}
	}
}

/// One ERC-20 token entry in the registry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenEntry {
	/// Token symbol, e.g. "USDC".
	pub symbol: String,
	/// Registry name of the chain the contract lives on.
	pub chain: String,
	/// Token contract address.
	pub address: Address,
	/// Number of decimal places of the token.
	pub decimals: u8,
}

/// A registry of named chains and tokens.
///
/// Chains are keyed by name in TOML (`[chains.eth]`); tokens are an array
/// of tables (`[[tokens]]`).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Registry {
	/// Chain entries keyed by registry name.
	#[serde(default)]
	pub chains: HashMap<String, ChainEntry>,
	/// Token entries; a (symbol, chain) pair is expected to be unique.
	#[serde(default)]
	pub tokens: Vec<TokenEntry>,
}

impl Registry {
	/// Loads and validates a registry from a TOML file.
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let contents = std::fs::read_to_string(path)?;
		Self::from_toml_str(&contents)
	}

	/// Parses and validates a registry from TOML text.
	pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
		let registry: Registry = toml::from_str(contents)?;
		registry.validate()?;
		Ok(registry)
	}

	/// Checks internal consistency of the registry.
	pub fn validate(&self) -> Result<(), ConfigError> {
		for (name, chain) in &self.chains {
			if chain.chain_id == 0 {
				return Err(ConfigError::Validation(format!(
					"Chain '{}' has chain_id 0",
					name
				)));
			}
			if !chain.rpc_url.starts_with("http://") && !chain.rpc_url.starts_with("https://") {
				return Err(ConfigError::Validation(format!(
					"Chain '{}': rpc_url must start with http:// or https://",
					name
				)));
			}
			if let Some(ws) = &chain.ws_url {
				if !ws.starts_with("ws://") && !ws.starts_with("wss://") {
					return Err(ConfigError::Validation(format!(
						"Chain '{}': ws_url must start with ws:// or wss://",
						name
					)));
				}
			}
		}
		for token in &self.tokens {
			if !self.chains.contains_key(&token.chain) {
				return Err(ConfigError::Validation(format!(
					"Token '{}' references unknown chain '{}'",
					token.symbol, token.chain
				)));
			}
			if token.symbol.is_empty() {
				return Err(ConfigError::Validation(
					"Token with empty symbol".to_string(),
				));
			}
		}
		Ok(())
	}

	/// Looks up a chain entry by registry name.
	pub fn chain(&self, name: &str) -> Result<&ChainEntry, ConfigError> {
		self.chains
			.get(name)
			.ok_or_else(|| ConfigError::ChainNotFound(name.to_string()))
	}

	/// Resolves a chain name to the endpoint value the engine consumes.
	pub fn endpoint(&self, name: &str) -> Result<ChainEndpoint, ConfigError> {
		Ok(self.chain(name)?.to_endpoint())
	}

	/// Looks up a token by symbol and chain name.
	///
	/// Fails if the chain is unknown, the token is missing, or the pair
	/// matches more than one entry.
	pub fn token(&self, symbol: &str, chain: &str) -> Result<&TokenEntry, ConfigError> {
		if !self.chains.contains_key(chain) {
			return Err(ConfigError::ChainNotFound(chain.to_string()));
		}
		let matches: Vec<&TokenEntry> = self
			.tokens
			.iter()
			.filter(|t| t.symbol == symbol && t.chain == chain)
			.collect();
		match matches.len() {
			0 => Err(ConfigError::TokenNotFound {
				symbol: symbol.to_string(),
				chain: chain.to_string(),
			}),
			1 => Ok(matches[0]),
			count => Err(ConfigError::TokenNotUnique {
				symbol: symbol.to_string(),
				chain: chain.to_string(),
				count,
			}),
		}
	}

	/// True if the chain name is in the registry.
	pub fn is_chain_supported(&self, name: &str) -> bool {
		self.chains.contains_key(name)
	}

	/// True if the (symbol, chain) pair resolves to exactly one token.
	pub fn is_token_supported(&self, symbol: &str, chain: &str) -> bool {
		self.token(symbol, chain).is_ok()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	const SAMPLE: &str = r#"
[chains.testnet]
chain_id = 31337
rpc_url = "http://localhost:8545"
ws_url = "ws://localhost:8546"
supports_fee_market = true

[[tokens]]
symbol = "TST"
chain = "testnet"
address = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"
decimals = 6
"#;

	#[test]
	fn parses_and_resolves_endpoint() {
		let registry = Registry::from_toml_str(SAMPLE).unwrap();
		let endpoint = registry.endpoint("testnet").unwrap();
		assert_eq!(endpoint.chain_id, 31337);
		assert!(endpoint.supports_fee_market);
		assert_eq!(endpoint.ws_url.as_deref(), Some("ws://localhost:8546"));
	}

	#[test]
	fn loads_from_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		file.write_all(SAMPLE.as_bytes()).unwrap();
		let registry = Registry::from_file(file.path()).unwrap();
		assert!(registry.is_chain_supported("testnet"));
	}

	#[test]
	fn unknown_chain_is_an_error() {
		let registry = Registry::from_toml_str(SAMPLE).unwrap();
		assert!(matches!(
			registry.endpoint("nope"),
			Err(ConfigError::ChainNotFound(_))
		));
	}

	#[test]
	fn token_lookup_requires_exactly_one_match() {
		let mut registry = Registry::from_toml_str(SAMPLE).unwrap();
		assert!(registry.is_token_supported("TST", "testnet"));
		assert!(matches!(
			registry.token("NOPE", "testnet"),
			Err(ConfigError::TokenNotFound { .. })
		));

		let duplicate = registry.tokens[0].clone();
		registry.tokens.push(duplicate);
		assert!(matches!(
			registry.token("TST", "testnet"),
			Err(ConfigError::TokenNotUnique { count: 2, .. })
		));
	}

	#[test]
	fn validation_rejects_bad_urls_and_dangling_tokens() {
		let bad_rpc = SAMPLE.replace("http://localhost:8545", "ftp://localhost");
		assert!(matches!(
			Registry::from_toml_str(&bad_rpc),
			Err(ConfigError::Validation(_))
		));

		let dangling = SAMPLE.replace("chain = \"testnet\"", "chain = \"ghost\"");
		assert!(matches!(
			Registry::from_toml_str(&dangling),
			Err(ConfigError::Validation(_))
		));
	}
}
