//! ERC-20 call encoding and return decoding.
//!
//! Calldata is produced with `sol!`-generated types; the transaction
//! engine treats it as opaque bytes.

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol;
use alloy::sol_types::SolCall;

use crate::ClientError;

sol! {
	/// Minimal ERC-20 surface used by the client.
	interface IERC20 {
		function transfer(address to, uint256 amount) external returns (bool);
		function approve(address spender, uint256 amount) external returns (bool);
		function balanceOf(address owner) external view returns (uint256);
		function allowance(address owner, address spender) external view returns (uint256);
		function decimals() external view returns (uint8);
		function symbol() external view returns (string);
		function name() external view returns (string);
		function totalSupply() external view returns (uint256);
	}
}

pub fn transfer_calldata(to: Address, amount: U256) -> Bytes {
	IERC20::transferCall { to, amount }.abi_encode().into()
}

pub fn approve_calldata(spender: Address, amount: U256) -> Bytes {
	IERC20::approveCall { spender, amount }.abi_encode().into()
}

pub fn balance_of_calldata(owner: Address) -> Bytes {
	IERC20::balanceOfCall { owner }.abi_encode().into()
}

pub fn allowance_calldata(owner: Address, spender: Address) -> Bytes {
	IERC20::allowanceCall { owner, spender }.abi_encode().into()
}

pub fn decimals_calldata() -> Bytes {
	IERC20::decimalsCall {}.abi_encode().into()
}

pub fn symbol_calldata() -> Bytes {
	IERC20::symbolCall {}.abi_encode().into()
}

pub fn name_calldata() -> Bytes {
	IERC20::nameCall {}.abi_encode().into()
}

pub fn total_supply_calldata() -> Bytes {
	IERC20::totalSupplyCall {}.abi_encode().into()
}

pub fn decode_uint(data: &[u8]) -> Result<U256, ClientError> {
	IERC20::balanceOfCall::abi_decode_returns(data)
		.map_err(|e| ClientError::Decode(e.to_string()))
}

pub fn decode_decimals(data: &[u8]) -> Result<u8, ClientError> {
	IERC20::decimalsCall::abi_decode_returns(data)
		.map_err(|e| ClientError::Decode(e.to_string()))
}

pub fn decode_symbol(data: &[u8]) -> Result<String, ClientError> {
	IERC20::symbolCall::abi_decode_returns(data)
		.map_err(|e| ClientError::Decode(e.to_string()))
}

pub fn decode_name(data: &[u8]) -> Result<String, ClientError> {
	IERC20::nameCall::abi_decode_returns(data)
		.map_err(|e| ClientError::Decode(e.to_string()))
}

pub fn decode_total_supply(data: &[u8]) -> Result<U256, ClientError> {
	IERC20::totalSupplyCall::abi_decode_returns(data)
		.map_err(|e| ClientError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn calldata_carries_the_canonical_selectors() {
		assert_eq!(IERC20::transferCall::SELECTOR, [0xa9, 0x05, 0x9c, 0xbb]);
		assert_eq!(IERC20::approveCall::SELECTOR, [0x09, 0x5e, 0xa7, 0xb3]);
		assert_eq!(IERC20::balanceOfCall::SELECTOR, [0x70, 0xa0, 0x82, 0x31]);
		assert_eq!(IERC20::allowanceCall::SELECTOR, [0xdd, 0x62, 0xed, 0x3e]);
		assert_eq!(IERC20::decimalsCall::SELECTOR, [0x31, 0x3c, 0xe5, 0x67]);
		assert_eq!(IERC20::symbolCall::SELECTOR, [0x95, 0xd8, 0x9b, 0x41]);
		assert_eq!(IERC20::nameCall::SELECTOR, [0x06, 0xfd, 0xde, 0x03]);
		assert_eq!(IERC20::totalSupplyCall::SELECTOR, [0x18, 0x16, 0x0d, 0xdd]);
	}

	#[test]
	fn transfer_calldata_is_selector_plus_two_words() {
		let to = Address::with_last_byte(0x42);
		let data = transfer_calldata(to, U256::from(7u64));
		assert_eq!(data.len(), 4 + 32 + 32);
		assert_eq!(&data[..4], &IERC20::transferCall::SELECTOR);
		// Address is right-aligned in its word.
		assert_eq!(data[4 + 31], 0x42);
		assert_eq!(data[4 + 63], 7);
	}

	#[test]
	fn uint_returns_round_trip_through_the_decoder() {
		use alloy::sol_types::SolValue;
		let encoded = U256::from(1_000_000u64).abi_encode();
		assert_eq!(decode_uint(&encoded).unwrap(), U256::from(1_000_000u64));
		assert_eq!(
			decode_total_supply(&encoded).unwrap(),
			U256::from(1_000_000u64)
		);
	}

	#[test]
	fn string_returns_round_trip_through_the_decoder() {
		use alloy::sol_types::SolValue;
		let encoded = "Wrapped Ether".to_string().abi_encode();
		assert_eq!(decode_name(&encoded).unwrap(), "Wrapped Ether");
		assert_eq!(decode_symbol(&encoded).unwrap(), "Wrapped Ether");
	}
}
