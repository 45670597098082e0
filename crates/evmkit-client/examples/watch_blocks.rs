//! Streams new block headers from a local node until interrupted.
//!
//! Expects a dev node with WebSocket enabled on localhost:8546.

use std::sync::Arc;

use async_trait::async_trait;
use evmkit_client::ChainClient;
use evmkit_stream::EventHandler;
use evmkit_types::{ChainEndpoint, ChainEvent};
use tokio::sync::mpsc;

struct PrintBlocks;

#[async_trait]
impl EventHandler for PrintBlocks {
	async fn on_event(&self, event: ChainEvent) -> anyhow::Result<()> {
		if let ChainEvent::NewBlock(header) = event {
			println!(
				"block {} hash {} base_fee {:?}",
				header.number, header.hash, header.base_fee_per_gas
			);
		}
		Ok(())
	}
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| "info".into()),
		)
		.init();

	let endpoint = ChainEndpoint::fee_market(31337, "http://localhost:8545")
		.with_ws_url("ws://localhost:8546");
	let client = ChainClient::connect(endpoint)?;

	let (err_tx, mut err_rx) = mpsc::unbounded_channel();
	let mut subscription = client.subscribe_new_blocks(Arc::new(PrintBlocks), err_tx)?;

	tokio::select! {
		_ = tokio::signal::ctrl_c() => {}
		Some(err) = err_rx.recv() => eprintln!("stream error: {err}"),
	}

	subscription.unsubscribe();
	subscription.closed().await;
	Ok(())
}
