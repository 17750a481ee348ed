//! Subscriber metadata and feature negotiation

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Feature flag a subscriber must advertise to receive NOVA telemetry
pub const NOVA_TELEMETRY_FEATURE: &str = "supports_nova_telemetry";

/// Metadata advertised by one connected subscriber
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscriberMetadata {
    /// Feature flags negotiated at connect time (name -> value)
    #[serde(default)]
    pub feature_flags: HashMap<String, Value>,
}

impl SubscriberMetadata {
    /// Metadata advertising a single boolean feature
    pub fn with_feature(feature: &str, enabled: bool) -> Self {
        let mut feature_flags = HashMap::new();
        feature_flags.insert(feature.to_string(), Value::Bool(enabled));
        Self { feature_flags }
    }
}

/// Table of connected subscribers keyed by subscriber id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscriberRegistry {
    subscribers: HashMap<String, SubscriberMetadata>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a subscriber's metadata
    pub fn register(&mut self, subscriber_id: impl Into<String>, metadata: SubscriberMetadata) {
        self.subscribers.insert(subscriber_id.into(), metadata);
    }

    /// Remove a subscriber, returning its metadata if it was known
    pub fn unregister(&mut self, subscriber_id: &str) -> Option<SubscriberMetadata> {
        self.subscribers.remove(subscriber_id)
    }

    pub fn get(&self, subscriber_id: &str) -> Option<&SubscriberMetadata> {
        self.subscribers.get(subscriber_id)
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Whether `subscriber_id` advertises `feature` as literally `true`
    ///
    /// Unknown subscribers, missing flags and non-boolean values all count
    /// as unsupported.
    pub fn supports_feature(&self, subscriber_id: &str, feature: &str) -> bool {
        self.subscribers
            .get(subscriber_id)
            .and_then(|meta| meta.feature_flags.get(feature))
            .map(|value| matches!(value, Value::Bool(true)))
            .unwrap_or(false)
    }
}
