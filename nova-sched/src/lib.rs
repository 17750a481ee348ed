//! # NOVA Scheduling Library (nova-sched)
//!
//! Planning and instrumentation layer in front of an opaque graph executor.
//!
//! **Purpose:** Classify the device into an execution profile, derive tuning
//! hints, decompose image/video/audio workloads into bounded work units,
//! optionally clamp prompt-graph parameters, track asset residency, and emit
//! capability-gated telemetry, all without changing execution outcomes.
//!
//! **Architecture:** `scheduler::NovaPromptExecutor` wraps a `JobExecutor`
//! and runs profile → optimize → plan → residency → telemetry → execute →
//! snapshot for every job.

pub mod graph;
pub mod host;
pub mod logging;
pub mod media;
pub mod node_abi;
pub mod profile;
pub mod residency;
pub mod scheduler;
pub mod telemetry;

pub use host::{BroadcastHost, PlanStore};
pub use profile::{ExecutionProfile, ProfileHints};
pub use scheduler::{JobExecutor, NovaPromptExecutor, StreamPlan};
pub use telemetry::{ExecutionTelemetry, TelemetryHost};
