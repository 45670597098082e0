//! Built-in chain and token registry entries.
//!
//! A small set of well-known public chains and tokens so the client is
//! usable without writing a registry file. Callers with their own nodes or
//! tokens load a TOML registry instead, or extend the default one.

use crate::{ChainEntry, Registry, TokenEntry};
use alloy::primitives::address;

/// Returns the built-in registry of public chains and well-known tokens.
pub fn default_registry() -> Registry {
	let mut registry = Registry::default();

	registry.chains.insert(
		"eth".to_string(),
		ChainEntry {
			chain_id: 1,
			rpc_url: "https://cloudflare-eth.com".to_string(),
			ws_url: None,
			supports_fee_market: true,
		},
	);
	registry.chains.insert(
		"bnb".to_string(),
		ChainEntry {
			chain_id: 56,
			rpc_url: "https://bsc-dataseed.binance.org".to_string(),
			ws_url: None,
			supports_fee_market: false,
		},
	);
	registry.chains.insert(
		"avax".to_string(),
		ChainEntry {
			chain_id: 43114,
			rpc_url: "https://api.avax.network/ext/bc/C/rpc".to_string(),
			ws_url: None,
			supports_fee_market: true,
		},
	);
	registry.chains.insert(
		"arb".to_string(),
		ChainEntry {
			chain_id: 42161,
			rpc_url: "https://arb1.arbitrum.io/rpc".to_string(),
			ws_url: None,
			supports_fee_market: true,
		},
	);
	registry.chains.insert(
		"era".to_string(),
		ChainEntry {
			chain_id: 324,
			rpc_url: "https://mainnet.era.zksync.io".to_string(),
			ws_url: None,
			supports_fee_market: true,
		},
	);

	registry.tokens = vec![
		TokenEntry {
			symbol: "USDC".to_string(),
			chain: "eth".to_string(),
			address: address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"),
			decimals: 6,
		},
		TokenEntry {
			symbol: "BUSD".to_string(),
			chain: "bnb".to_string(),
			address: address!("e9e7CEA3DedcA5984780Bafc599bD69ADd087D56"),
			decimals: 18,
		},
		TokenEntry {
			symbol: "BETH".to_string(),
			chain: "bnb".to_string(),
			address: address!("2170Ed0880ac9A755fd29B2688956BD959F933F8"),
			decimals: 18,
		},
		TokenEntry {
			symbol: "USDC".to_string(),
			chain: "avax".to_string(),
			address: address!("B97EF9Ef8734C71904D8002F8b6Bc66Dd9c48a6E"),
			decimals: 6,
		},
	];

	registry
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_registry_is_valid() {
		let registry = default_registry();
		registry.validate().unwrap();
	}

	#[test]
	fn known_chains_resolve() {
		let registry = default_registry();
		assert_eq!(registry.endpoint("eth").unwrap().chain_id, 1);
		assert!(!registry.endpoint("bnb").unwrap().supports_fee_market);
		assert_eq!(registry.endpoint("arb").unwrap().chain_id, 42161);
	}

	#[test]
	fn usdc_is_unique_per_chain() {
		let registry = default_registry();
		let eth_usdc = registry.token("USDC", "eth").unwrap();
		let avax_usdc = registry.token("USDC", "avax").unwrap();
		assert_ne!(eth_usdc.address, avax_usdc.address);
		assert_eq!(eth_usdc.decimals, 6);
	}
}
