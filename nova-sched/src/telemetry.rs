//! Capability-gated execution telemetry
//!
//! Telemetry never alters execution: events are only sent when the current
//! subscriber advertises `supports_nova_telemetry`, and every failure on the
//! way (feature lookup, serialization, send) is logged and dropped.

use nova_common::events::NOVA_TELEMETRY_FEATURE;
use nova_common::time::{duration_to_ms, now_ms};
use nova_common::TelemetryEvent;
use serde::Serialize;
use serde_json::{Map, Value};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, warn};

/// Telemetry collaborator failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TelemetryError {
    /// Feature negotiation could not be answered
    #[error("Feature lookup failed: {0}")]
    FeatureLookup(String),

    /// Transport refused or lost the event
    #[error("Transport send failed: {0}")]
    Send(String),
}

/// Host side of telemetry: who is listening, what they support, and how to
/// reach them
pub trait TelemetryHost: Send + Sync {
    /// Subscriber the current job reports to, if any
    fn client_id(&self) -> Option<String>;

    /// Feature negotiation lookup; unknown subscribers answer `Ok(false)`
    fn supports_feature(&self, subscriber_id: &str, feature: &str) -> Result<bool, TelemetryError>;

    /// Deliver one event
    fn send_event(&self, event: &str, payload: Value, subscriber_id: &str) -> Result<(), TelemetryError>;
}

/// Telemetry emitter bound to one host
#[derive(Clone)]
pub struct ExecutionTelemetry {
    host: Arc<dyn TelemetryHost>,
}

impl ExecutionTelemetry {
    pub fn new(host: Arc<dyn TelemetryHost>) -> Self {
        Self { host }
    }

    /// Subscriber id if it may receive telemetry right now
    fn telemetry_target(&self) -> Option<String> {
        let subscriber_id = self.host.client_id()?;
        match self.host.supports_feature(&subscriber_id, NOVA_TELEMETRY_FEATURE) {
            Ok(true) => Some(subscriber_id),
            Ok(false) => None,
            Err(e) => {
                debug!("Telemetry disabled for {}: {}", subscriber_id, e);
                None
            }
        }
    }

    /// Whether the current subscriber would receive events
    pub fn enabled(&self) -> bool {
        self.telemetry_target().is_some()
    }

    /// Emit `event` with `payload` plus a `timestamp` (epoch ms)
    ///
    /// Silent no-op when no subscriber is set or it lacks the capability.
    /// A caller-supplied `timestamp` is overwritten.
    pub fn emit<P: Serialize + ?Sized>(&self, event: &str, payload: &P) {
        let Some(subscriber_id) = self.telemetry_target() else {
            return;
        };
        let mut message = match payload_object(payload) {
            Some(map) => map,
            None => return,
        };
        message.insert("timestamp".to_string(), Value::from(now_ms()));

        if let Err(e) = self.host.send_event(event, Value::Object(message), &subscriber_id) {
            debug!("Dropped telemetry event {}: {}", event, e);
        }
    }

    /// Emit a catalog event
    pub fn emit_event<P: Serialize + ?Sized>(&self, event: TelemetryEvent, payload: &P) {
        self.emit(event.as_str(), payload);
    }

    /// Emit `start_event` now and `end_event` (with `duration_ms`) when the
    /// returned guard drops
    ///
    /// The end event fires on every exit path of the enclosing scope,
    /// including early returns and unwinding panics.
    pub fn track_duration<P: Serialize + ?Sized>(
        &self,
        start_event: &str,
        end_event: &str,
        payload: &P,
    ) -> DurationGuard {
        let payload = payload_object(payload).unwrap_or_default();
        let started = Instant::now();
        self.emit(start_event, &payload);
        DurationGuard {
            telemetry: self.clone(),
            end_event: end_event.to_string(),
            payload,
            started,
        }
    }

    /// Run `op` inside a tracked duration
    pub fn track<P, T, F>(&self, start_event: &str, end_event: &str, payload: &P, op: F) -> T
    where
        P: Serialize + ?Sized,
        F: FnOnce() -> T,
    {
        let _guard = self.track_duration(start_event, end_event, payload);
        op()
    }
}

/// Serialize a payload into a JSON object; non-objects are wrapped as `data`
fn payload_object<P: Serialize + ?Sized>(payload: &P) -> Option<Map<String, Value>> {
    match serde_json::to_value(payload) {
        Ok(Value::Object(map)) => Some(map),
        Ok(Value::Null) => Some(Map::new()),
        Ok(other) => {
            let mut map = Map::new();
            map.insert("data".to_string(), other);
            Some(map)
        }
        Err(e) => {
            warn!("Telemetry payload could not be serialized: {}", e);
            None
        }
    }
}

/// Pending end event of a tracked duration
///
/// Measures with a monotonic clock; the end event carries `duration_ms`
/// rounded to three decimals.
#[must_use = "the end event fires when the guard is dropped"]
pub struct DurationGuard {
    telemetry: ExecutionTelemetry,
    end_event: String,
    payload: Map<String, Value>,
    started: Instant,
}

impl DurationGuard {
    /// Elapsed time so far, in milliseconds
    pub fn elapsed_ms(&self) -> f64 {
        duration_to_ms(self.started.elapsed())
    }
}

impl Drop for DurationGuard {
    fn drop(&mut self) {
        let mut payload = std::mem::take(&mut self.payload);
        payload.insert("duration_ms".to_string(), Value::from(self.elapsed_ms()));

        if !std::thread::panicking() {
            self.telemetry.emit(&self.end_event, &payload);
            return;
        }
        // A host panic here would abort the process
        let sent = panic::catch_unwind(AssertUnwindSafe(|| {
            self.telemetry.emit(&self.end_event, &payload);
        }));
        if sent.is_err() {
            warn!("Telemetry host panicked sending {} during unwind", self.end_event);
        }
    }
}
