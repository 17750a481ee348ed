//! Telemetry event types for the NOVA event system
//!
//! Provides the wire catalog of telemetry event names, the message envelope
//! carried to subscribers, and the TelemetryBus used for in-process delivery.

// Sub-modules (supporting types)
mod subscribers;

pub use subscribers::{SubscriberMetadata, SubscriberRegistry, NOVA_TELEMETRY_FEATURE};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

/// NOVA telemetry event catalog
///
/// The string form of each variant is part of the wire contract with
/// subscribers and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TelemetryEvent {
    /// Aggregate stream plan for one execution
    #[serde(rename = "telemetry.nova_plan")]
    Plan,

    /// Prompt graph was rewritten by auto-optimization
    #[serde(rename = "telemetry.nova_auto_optimized")]
    AutoOptimized,

    /// Video window decomposition, only when the graph contains video nodes
    #[serde(rename = "telemetry.output.partial.video_plan")]
    PartialVideoPlan,

    /// Audio segment decomposition, only when the graph contains audio nodes
    #[serde(rename = "telemetry.output.partial.audio_plan")]
    PartialAudioPlan,

    /// Residency table snapshot after the delegate executor returned
    #[serde(rename = "telemetry.nova_residency_snapshot")]
    ResidencySnapshot,
}

impl TelemetryEvent {
    /// All catalog entries
    pub const ALL: [TelemetryEvent; 5] = [
        TelemetryEvent::Plan,
        TelemetryEvent::AutoOptimized,
        TelemetryEvent::PartialVideoPlan,
        TelemetryEvent::PartialAudioPlan,
        TelemetryEvent::ResidencySnapshot,
    ];

    /// Wire name of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            TelemetryEvent::Plan => "telemetry.nova_plan",
            TelemetryEvent::AutoOptimized => "telemetry.nova_auto_optimized",
            TelemetryEvent::PartialVideoPlan => "telemetry.output.partial.video_plan",
            TelemetryEvent::PartialAudioPlan => "telemetry.output.partial.audio_plan",
            TelemetryEvent::ResidencySnapshot => "telemetry.nova_residency_snapshot",
        }
    }
}

impl std::fmt::Display for TelemetryEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Envelope delivered to telemetry subscribers
///
/// `event` is a free-form name so that ad-hoc events (for example the
/// start/end pair of a tracked duration) travel alongside the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryMessage {
    /// Event name
    pub event: String,
    /// Event payload, always a JSON object carrying `timestamp`
    pub payload: Value,
    /// Destination subscriber
    pub subscriber_id: String,
}

// ========================================
// TelemetryBus Implementation
// ========================================

/// In-process telemetry distribution bus
///
/// Uses tokio::broadcast internally:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use nova_common::events::{TelemetryBus, TelemetryMessage};
///
/// let bus = TelemetryBus::new(16);
/// let mut rx = bus.subscribe();
///
/// bus.emit(TelemetryMessage {
///     event: "telemetry.nova_plan".to_string(),
///     payload: serde_json::json!({"timestamp": 0}),
///     subscriber_id: "sid".to_string(),
/// })
/// .unwrap();
///
/// assert_eq!(rx.try_recv().unwrap().event, "telemetry.nova_plan");
/// ```
#[derive(Clone)]
pub struct TelemetryBus {
    tx: broadcast::Sender<TelemetryMessage>,
}

impl TelemetryBus {
    /// Creates a new TelemetryBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of messages to buffer before dropping old ones
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to all future messages
    ///
    /// Messages emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<TelemetryMessage> {
        self.tx.subscribe()
    }

    /// Emit a message to all receivers
    ///
    /// Returns `Ok(receiver_count)` if at least one receiver exists.
    /// Returns `Err` if nobody is listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        message: TelemetryMessage,
    ) -> Result<usize, broadcast::error::SendError<TelemetryMessage>> {
        self.tx.send(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(event: &str) -> TelemetryMessage {
        TelemetryMessage {
            event: event.to_string(),
            payload: json!({"timestamp": 1}),
            subscriber_id: "sid".to_string(),
        }
    }

    #[test]
    fn test_wire_names_match_serde() {
        for event in TelemetryEvent::ALL {
            let serialized = serde_json::to_value(event).unwrap();
            assert_eq!(serialized, json!(event.as_str()));
        }
    }

    #[test]
    fn test_display_uses_wire_name() {
        assert_eq!(
            TelemetryEvent::PartialVideoPlan.to_string(),
            "telemetry.output.partial.video_plan"
        );
    }

    #[test]
    fn test_bus_zero_capacity_is_raised() {
        let bus = TelemetryBus::new(0);
        let mut rx = bus.subscribe();
        assert_eq!(bus.emit(message("telemetry.nova_plan")).unwrap(), 1);
        assert_eq!(rx.try_recv().unwrap().event, "telemetry.nova_plan");
    }

    #[test]
    fn test_bus_emit_without_subscribers_errors() {
        let bus = TelemetryBus::new(4);
        assert!(bus.emit(message("telemetry.nova_plan")).is_err());
    }

    #[tokio::test]
    async fn test_bus_multiple_subscribers() {
        let bus = TelemetryBus::new(10);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        let receivers = bus
            .emit(message("telemetry.nova_residency_snapshot"))
            .expect("emit should succeed");
        assert_eq!(receivers, 2);

        let r1 = rx1.recv().await.expect("rx1 should receive");
        let r2 = rx2.recv().await.expect("rx2 should receive");
        assert_eq!(r1.event, "telemetry.nova_residency_snapshot");
        assert_eq!(r1, r2);
    }
}
