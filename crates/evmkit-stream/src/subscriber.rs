//! Subscription lifecycle: receive loop, dispatch and reconnection.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::B256;
use alloy::providers::{DynProvider, Provider, ProviderBuilder, WsConnect};
use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use evmkit_types::{BlockHeader, ChainEndpoint, ChainEvent, SubscriptionKind, SubscriptionState};
use futures::{Stream, StreamExt};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::{ErrorSink, EventHandler, StreamError};

/// Default bound on the receive-to-dispatch channel.
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Initial delay between reconnection attempts.
const RECONNECT_BASE: Duration = Duration::from_secs(1);

/// Upper bound on the delay between reconnection attempts.
const RECONNECT_CAP: Duration = Duration::from_secs(30);

/// Total time to keep retrying before the subscription closes.
const RECONNECT_BUDGET: Duration = Duration::from_secs(300);

type EventStream = Pin<Box<dyn Stream<Item = ChainEvent> + Send>>;

/// Creates subscriptions against one chain endpoint.
#[derive(Debug, Clone)]
pub struct EventSubscriber {
	endpoint: ChainEndpoint,
	channel_capacity: usize,
}

impl EventSubscriber {
	pub fn new(endpoint: ChainEndpoint) -> Self {
		Self {
			endpoint,
			channel_capacity: DEFAULT_CHANNEL_CAPACITY,
		}
	}

	/// Overrides the receive-to-dispatch channel bound.
	pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
		self.channel_capacity = capacity.max(1);
		self
	}

	/// Starts a subscription of the given kind.
	///
	/// Spawns the receive loop and the dispatch task; the returned handle
	/// owns their shutdown. Fails immediately when the endpoint has no
	/// WebSocket URL; connection problems after that go through the
	/// reconnect policy instead.
	pub fn subscribe(
		&self,
		kind: SubscriptionKind,
		handler: Arc<dyn EventHandler>,
		errors: ErrorSink,
	) -> Result<Subscription, StreamError> {
		let ws_url = self
			.endpoint
			.ws_url
			.clone()
			.ok_or(StreamError::MissingWsEndpoint)?;

		let (event_tx, event_rx) = mpsc::channel(self.channel_capacity);
		let (state_tx, state_rx) = watch::channel(SubscriptionState::Created);
		let (stop_tx, stop_rx) = oneshot::channel();

		tokio::spawn(run_dispatch(event_rx, handler, errors.clone()));
		tokio::spawn(run_receive_loop(
			ws_url, kind, event_tx, errors, state_tx, stop_rx,
		));

		info!(
			chain_id = self.endpoint.chain_id,
			stream = kind.rpc_name(),
			"Subscription started"
		);
		Ok(Subscription {
			kind,
			state: state_rx,
			stop: Some(stop_tx),
		})
	}
}

/// Handle to a running subscription.
///
/// Dropping the handle without unsubscribing leaves the tasks running;
/// call [`Subscription::unsubscribe`] for an orderly close.
pub struct Subscription {
	kind: SubscriptionKind,
	state: watch::Receiver<SubscriptionState>,
	stop: Option<oneshot::Sender<()>>,
}

impl Subscription {
	/// What this subscription listens for.
	pub fn kind(&self) -> SubscriptionKind {
		self.kind
	}

	/// Current lifecycle state.
	pub fn state(&self) -> SubscriptionState {
		*self.state.borrow()
	}

	/// Requests an orderly close. Idempotent; repeated calls are no-ops.
	pub fn unsubscribe(&mut self) {
		if let Some(stop) = self.stop.take() {
			let _ = stop.send(());
		}
	}

	/// Waits until the subscription reaches [`SubscriptionState::Closed`].
	pub async fn closed(&mut self) {
		while *self.state.borrow() != SubscriptionState::Closed {
			if self.state.changed().await.is_err() {
				break;
			}
		}
	}
}

/// Drains the bounded channel and calls the handler one event at a time.
///
/// Handler errors go to the sink; the loop never stops for them.
async fn run_dispatch(
	mut events: mpsc::Receiver<ChainEvent>,
	handler: Arc<dyn EventHandler>,
	errors: ErrorSink,
) {
	while let Some(event) = events.recv().await {
		if let Err(e) = handler.on_event(event).await {
			let _ = errors.send(StreamError::Handler(e));
		}
	}
	debug!("Dispatch task finished");
}

/// Receives events from the node and forwards them into the channel,
/// reconnecting on transport drops until the backoff budget runs out.
///
/// Reconnection resubscribes from "now"; events missed while disconnected
/// are not replayed, so delivery is at-most-once.
async fn run_receive_loop(
	ws_url: String,
	kind: SubscriptionKind,
	events: mpsc::Sender<ChainEvent>,
	errors: ErrorSink,
	state: watch::Sender<SubscriptionState>,
	mut stop: oneshot::Receiver<()>,
) {
	let mut policy = reconnect_policy();
	// Lives across reconnects: a node often redelivers the last pending
	// hash first thing after a resubscription, and that repeat must be
	// suppressed like any other consecutive duplicate.
	let mut last_pending: Option<B256> = None;
	loop {
		match open_stream(&ws_url, kind).await {
			Ok((_provider, mut stream)) => {
				let _ = state.send(SubscriptionState::Active);
				policy.reset();
				loop {
					tokio::select! {
						_ = &mut stop => {
							let _ = state.send(SubscriptionState::Closed);
							return;
						}
						item = stream.next() => match item {
							Some(event) => {
								if !should_dispatch(&mut last_pending, &event) {
									continue;
								}
								// Blocks when the channel is full; backpressure
								// instead of dropped events.
								if events.send(event).await.is_err() {
									let _ = state.send(SubscriptionState::Closed);
									return;
								}
							}
							None => break,
						}
					}
				}
				let _ = state.send(SubscriptionState::Paused);
				warn!(kind = ?kind, "Subscription transport dropped, reconnecting");
			}
			Err(e) => {
				warn!(kind = ?kind, error = %e, "Subscription attempt failed");
			}
		}

		match policy.next_backoff() {
			Some(delay) => {
				tokio::select! {
					_ = &mut stop => {
						let _ = state.send(SubscriptionState::Closed);
						return;
					}
					_ = sleep(delay) => {}
				}
			}
			None => {
				let _ = errors.send(StreamError::Transport(
					"reconnect budget exhausted".to_string(),
				));
				let _ = state.send(SubscriptionState::Closed);
				return;
			}
		}
	}
}

/// Connects over WebSocket and opens the node-side subscription.
///
/// The provider is returned alongside the stream; dropping it would tear
/// the connection down.
async fn open_stream(
	ws_url: &str,
	kind: SubscriptionKind,
) -> Result<(DynProvider, EventStream), StreamError> {
	let provider = ProviderBuilder::new()
		.connect_ws(WsConnect::new(ws_url))
		.await
		.map_err(|e| StreamError::Transport(e.to_string()))?
		.erased();

	let stream: EventStream = match kind {
		SubscriptionKind::NewBlock => {
			let subscription = provider
				.subscribe_blocks()
				.await
				.map_err(|e| StreamError::SubscriptionFailed(e.to_string()))?;
			Box::pin(subscription.into_stream().map(|header| {
				ChainEvent::NewBlock(BlockHeader {
					hash: header.hash,
					number: header.number,
					parent_hash: header.parent_hash,
					timestamp: header.timestamp,
					base_fee_per_gas: header.base_fee_per_gas,
				})
			}))
		}
		SubscriptionKind::PendingTx => {
			let subscription = provider
				.subscribe_pending_transactions()
				.await
				.map_err(|e| StreamError::SubscriptionFailed(e.to_string()))?;
			Box::pin(subscription.into_stream().map(ChainEvent::PendingTx))
		}
	};
	Ok((provider, stream))
}

fn reconnect_policy() -> ExponentialBackoff {
	ExponentialBackoffBuilder::new()
		.with_initial_interval(RECONNECT_BASE)
		.with_max_interval(RECONNECT_CAP)
		.with_max_elapsed_time(Some(RECONNECT_BUDGET))
		.build()
}

/// Filters one received event against the dedup state. Block headers
/// always pass; pending hashes pass unless they repeat the previous one.
fn should_dispatch(last_pending: &mut Option<B256>, event: &ChainEvent) -> bool {
	match event {
		ChainEvent::PendingTx(hash) => !is_consecutive_duplicate(last_pending, *hash),
		ChainEvent::NewBlock(_) => true,
	}
}

/// Nodes occasionally notify the same pending hash twice in a row; only
/// back-to-back repeats are suppressed.
fn is_consecutive_duplicate(last: &mut Option<B256>, hash: B256) -> bool {
	if *last == Some(hash) {
		true
	} else {
		*last = Some(hash);
		false
	}
}
