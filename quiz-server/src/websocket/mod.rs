use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use warp::ws::{Message, WebSocket};

use crate::broadcast::BroadcastHub;

pub mod connection;

pub use connection::{SubscriberId, Subscription};

/// Forwards every event published on `channel` to the socket as a JSON text
/// frame until either side goes away. Inbound frames are ignored.
pub async fn handle_subscription(websocket: WebSocket, channel: String, hub: Arc<BroadcastHub>) {
    let mut subscription = Subscription::new(channel);
    let mut events = hub.subscribe(&subscription.channel);
    info!(
        "Subscriber {} listening on {}",
        subscription.id, subscription.channel
    );

    let (mut ws_sender, mut ws_receiver) = websocket.split();
    let subscriber_id = subscription.id;

    let incoming_handler = async move {
        while let Some(result) = ws_receiver.next().await {
            match result {
                Ok(msg) if msg.is_close() => break,
                Ok(_) => {}
                Err(e) => {
                    warn!("WebSocket error for {}: {}", subscriber_id, e);
                    break;
                }
            }
        }
    };

    let outgoing_handler = async {
        loop {
            match events.recv().await {
                Ok(payload) => {
                    if let Err(e) = ws_sender.send(Message::text(payload.as_ref())).await {
                        warn!("Failed to send event to {}: {:?}", subscription.id, e);
                        break;
                    }
                    subscription.record_delivery();
                }
                Err(RecvError::Lagged(missed)) => {
                    debug!("Subscriber {} lagged, skipped {} events", subscription.id, missed);
                    subscription.record_lag(missed);
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    tokio::select! {
        _ = incoming_handler => {},
        _ = outgoing_handler => {},
    }

    info!(
        "Subscriber {} left {} after {} events ({} skipped, {:?})",
        subscription.id,
        subscription.channel,
        subscription.delivered,
        subscription.skipped,
        subscription.connected_at.elapsed()
    );
}
