//! Cart event publishing over NATS

use crate::domain::events::CartEvent;

/// Publishes committed cart changes. Without a NATS client this is a no-op.
#[derive(Clone, Default)]
pub struct EventPublisher {
    nats: Option<async_nats::Client>,
}

impl EventPublisher {
    pub fn new(nats: Option<async_nats::Client>) -> Self { Self { nats } }

    pub fn disabled() -> Self { Self::default() }

    pub fn is_enabled(&self) -> bool { self.nats.is_some() }

    /// The mutation is already committed when this runs, so failures are logged only.
    pub async fn publish(&self, event: CartEvent) {
        let Some(client) = &self.nats else { return };
        let payload = match serde_json::to_vec(&event) {
            Ok(p) => p,
            Err(e) => { tracing::warn!(error = %e, kind = event.kind(), "failed to encode cart event"); return; }
        };
        if let Err(e) = client.publish(event.subject(), payload.into()).await {
            tracing::warn!(error = %e, subject = %event.subject(), "failed to publish cart event");
        }
    }
}
