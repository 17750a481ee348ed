//! Host composition: subscriber registry, telemetry bus and plan store
//!
//! `BroadcastHost` is the in-process stand-in for a server: it knows which
//! subscriber the current job reports to, what each subscriber supports, and
//! delivers events over a `TelemetryBus`. It also owns the job-id → stream
//! plan store that the façade writes into through a `PlanStore` handle.

use crate::scheduler::StreamPlan;
use crate::telemetry::{TelemetryError, TelemetryHost};
use nova_common::config::TelemetryConfig;
use nova_common::events::{SubscriberMetadata, NOVA_TELEMETRY_FEATURE};
use nova_common::{SubscriberRegistry, TelemetryBus, TelemetryMessage};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Shared handle to the job-id → stream plan table
///
/// The table itself is created on the first insert.
#[derive(Debug, Clone, Default)]
pub struct PlanStore {
    inner: Arc<Mutex<Option<HashMap<String, StreamPlan>>>>,
}

impl PlanStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<HashMap<String, StreamPlan>>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Store `plan` for `job_id`, replacing any earlier plan for that job
    pub fn insert(&self, job_id: &str, plan: StreamPlan) {
        self.lock()
            .get_or_insert_with(HashMap::new)
            .insert(job_id.to_string(), plan);
    }

    pub fn get(&self, job_id: &str) -> Option<StreamPlan> {
        self.lock().as_ref().and_then(|plans| plans.get(job_id).cloned())
    }

    /// Whether anything has been stored yet
    pub fn is_initialized(&self) -> bool {
        self.lock().is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().as_ref().map_or(0, HashMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-process telemetry host backed by a broadcast bus
pub struct BroadcastHost {
    client_id: RwLock<Option<String>>,
    registry: RwLock<SubscriberRegistry>,
    bus: TelemetryBus,
    plans: PlanStore,
}

impl BroadcastHost {
    pub fn new(capacity: usize) -> Self {
        Self {
            client_id: RwLock::new(None),
            registry: RwLock::new(SubscriberRegistry::new()),
            bus: TelemetryBus::new(capacity),
            plans: PlanStore::new(),
        }
    }

    /// Host with one local subscriber described by `config`, already current
    pub fn from_config(config: &TelemetryConfig) -> Self {
        let host = Self::new(config.channel_capacity);
        host.register_subscriber(
            &config.subscriber_id,
            SubscriberMetadata::with_feature(NOVA_TELEMETRY_FEATURE, config.enabled),
        );
        host.set_client_id(Some(config.subscriber_id.clone()));
        info!(
            "Telemetry subscriber {} registered (nova telemetry {})",
            config.subscriber_id,
            if config.enabled { "on" } else { "off" }
        );
        host
    }

    /// Select the subscriber subsequent jobs report to
    pub fn set_client_id(&self, client_id: Option<String>) {
        match self.client_id.write() {
            Ok(mut guard) => *guard = client_id,
            Err(poisoned) => *poisoned.into_inner() = client_id,
        }
    }

    pub fn register_subscriber(&self, subscriber_id: &str, metadata: SubscriberMetadata) {
        match self.registry.write() {
            Ok(mut registry) => registry.register(subscriber_id, metadata),
            Err(poisoned) => poisoned.into_inner().register(subscriber_id, metadata),
        }
    }

    pub fn unregister_subscriber(&self, subscriber_id: &str) -> Option<SubscriberMetadata> {
        match self.registry.write() {
            Ok(mut registry) => registry.unregister(subscriber_id),
            Err(poisoned) => poisoned.into_inner().unregister(subscriber_id),
        }
    }

    /// Receive every message sent after this call
    pub fn subscribe(&self) -> broadcast::Receiver<TelemetryMessage> {
        self.bus.subscribe()
    }

    /// Handle to the plan store the façade writes into
    pub fn plans(&self) -> PlanStore {
        self.plans.clone()
    }
}

impl TelemetryHost for BroadcastHost {
    fn client_id(&self) -> Option<String> {
        match self.client_id.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn supports_feature(&self, subscriber_id: &str, feature: &str) -> Result<bool, TelemetryError> {
        let registry = self
            .registry
            .read()
            .map_err(|_| TelemetryError::FeatureLookup("subscriber registry poisoned".to_string()))?;
        Ok(registry.supports_feature(subscriber_id, feature))
    }

    fn send_event(&self, event: &str, payload: Value, subscriber_id: &str) -> Result<(), TelemetryError> {
        let message = TelemetryMessage {
            event: event.to_string(),
            payload,
            subscriber_id: subscriber_id.to_string(),
        };
        match self.bus.emit(message) {
            Ok(receivers) => {
                debug!("Telemetry {} -> {} ({} receivers)", event, subscriber_id, receivers);
                Ok(())
            }
            Err(_) => Err(TelemetryError::Send(format!("no receivers for {}", event))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::ExecutionTelemetry;
    use serde_json::json;

    #[test]
    fn test_plan_store_lazy_creation() {
        let store = PlanStore::new();
        assert!(!store.is_initialized());
        assert!(store.get("p1").is_none());

        store.insert("p1", StreamPlan::default());
        assert!(store.is_initialized());
        assert_eq!(store.len(), 1);
        assert!(store.get("p1").is_some());
    }

    #[test]
    fn test_plan_store_handles_share_table() {
        let store = PlanStore::new();
        let handle = store.clone();
        handle.insert("job", StreamPlan::default());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_from_config_registers_current_subscriber() {
        let host = BroadcastHost::from_config(&TelemetryConfig::default());
        assert_eq!(host.client_id().as_deref(), Some("cli"));
        assert_eq!(host.supports_feature("cli", NOVA_TELEMETRY_FEATURE), Ok(true));
        assert_eq!(host.supports_feature("other", NOVA_TELEMETRY_FEATURE), Ok(false));
    }

    #[test]
    fn test_disabled_config_gates_emitter() {
        let config = TelemetryConfig {
            enabled: false,
            ..TelemetryConfig::default()
        };
        let host = Arc::new(BroadcastHost::from_config(&config));
        let mut rx = host.subscribe();
        ExecutionTelemetry::new(host.clone()).emit("telemetry.nova_plan", &json!({}));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_emitter_delivers_over_bus() {
        let host = Arc::new(BroadcastHost::from_config(&TelemetryConfig::default()));
        let mut rx = host.subscribe();

        ExecutionTelemetry::new(host.clone()).emit("telemetry.nova_plan", &json!({"prompt_id": "p1"}));

        let message = rx.recv().await.expect("message should arrive");
        assert_eq!(message.event, "telemetry.nova_plan");
        assert_eq!(message.subscriber_id, "cli");
        assert_eq!(message.payload["prompt_id"], "p1");
        assert!(message.payload.get("timestamp").is_some());
    }

    #[test]
    fn test_send_without_receivers_is_error() {
        let host = BroadcastHost::from_config(&TelemetryConfig::default());
        assert!(matches!(
            host.send_event("e", json!({}), "cli"),
            Err(TelemetryError::Send(_))
        ));
    }

    #[test]
    fn test_switching_client() {
        let host = BroadcastHost::new(8);
        host.register_subscriber("a", SubscriberMetadata::with_feature(NOVA_TELEMETRY_FEATURE, true));
        assert!(host.client_id().is_none());
        host.set_client_id(Some("a".to_string()));
        assert_eq!(host.client_id().as_deref(), Some("a"));
        assert!(host.unregister_subscriber("a").is_some());
        assert_eq!(host.supports_feature("a", NOVA_TELEMETRY_FEATURE), Ok(false));
    }
}
