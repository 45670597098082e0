//! Event subscription core for the evmkit chain client.
//!
//! One WebSocket receive loop per subscription feeds a bounded channel; a
//! dispatch task drains it and calls the caller's [`EventHandler`] strictly
//! in arrival order. Transport drops trigger resubscription with exponential
//! backoff; handler failures go to the caller's error sink without closing
//! the stream. A full channel blocks the receive loop rather than dropping
//! events.

pub mod subscriber;

pub use subscriber::{EventSubscriber, Subscription};

use async_trait::async_trait;
use evmkit_types::ChainEvent;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors that can occur on a subscription.
#[derive(Debug, Error)]
pub enum StreamError {
	/// Error that occurs on the WebSocket transport.
	#[error("Subscription transport error: {0}")]
	Transport(String),
	/// Error that occurs when the node refuses the subscription request.
	#[error("Subscription setup failed: {0}")]
	SubscriptionFailed(String),
	/// Error that occurs when subscribing on an endpoint with no
	/// WebSocket URL configured.
	#[error("Endpoint has no WebSocket URL configured")]
	MissingWsEndpoint,
	/// Error returned by the caller's event handler. Reported to the
	/// sink; the stream keeps running.
	#[error("Event handler failed: {0}")]
	Handler(anyhow::Error),
}

/// Receives non-fatal handler errors and the terminal close error.
///
/// Unbounded so a slow error consumer can never stall event dispatch.
pub type ErrorSink = mpsc::UnboundedSender<StreamError>;

/// Processes chain events delivered by a subscription.
///
/// Called sequentially per subscription; a slow handler applies
/// backpressure upstream instead of being overtaken by later events.
#[async_trait]
pub trait EventHandler: Send + Sync {
	async fn on_event(&self, event: ChainEvent) -> anyhow::Result<()>;
}
