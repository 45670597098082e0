//! Sends a small native transfer on a local node and waits for the receipt.
//!
//! Expects a dev node (e.g. `anvil`) on localhost:8545 and reads the
//! sender key from `EVMKIT_PRIVATE_KEY`.

use alloy::primitives::{Address, U256};
use evmkit_client::ChainClient;
use evmkit_types::{ChainEndpoint, SecretString};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| "info".into()),
		)
		.init();

	let key = SecretString::from(std::env::var("EVMKIT_PRIVATE_KEY")?);
	let endpoint = ChainEndpoint::fee_market(31337, "http://localhost:8545");
	let client = ChainClient::connect(endpoint)?.with_credential(&key)?;

	let to: Address = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8".parse()?;
	let receipt = client
		.transfer_native(to, U256::from(1_000_000_000_000_000u64), None)
		.await?;

	println!(
		"mined in block {} ({:?}), gas used {}",
		receipt.block_number, receipt.status, receipt.gas_used
	);
	Ok(())
}
