//! Scheduling façade
//!
//! **Purpose:** Wrap an existing job executor with profile detection,
//! optional graph optimization, stream planning, residency observation and
//! telemetry, without changing what the executor does.
//!
//! Per execution the façade runs:
//!
//! ```text
//! DETECT_PROFILE → (OPTIMIZE?) → PLAN → TOUCH_RESIDENCY → EMIT_PLAN_EVENTS
//!     → DELEGATE_EXECUTE → EMIT_SNAPSHOT
//! ```
//!
//! Delegate failures are returned unchanged and skip the snapshot.
//!
//! **Concurrency:** `execute` takes `&mut self`, so one façade runs one job
//! at a time. The residency table and plan store are mutex-guarded and may
//! be shared with other readers.

pub mod plan;

pub use plan::{AudioPlan, ImagePlan, StreamPlan, StreamPlanner, VideoPlan};

use crate::graph::{ExtraData, PromptGraph};
use crate::host::PlanStore;
use crate::profile::{detect_profile, optimize_prompt_graph, ExecutionProfile, HardwareProbe, OptimizationSummary};
use crate::residency::{AssetUpdate, ResidencyGraph, ResidencySnapshot};
use crate::telemetry::{ExecutionTelemetry, TelemetryHost};
use nova_common::TelemetryEvent;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{debug, info};

/// `extra` key that requests graph optimization
pub const AUTO_OPTIMIZE_KEY: &str = "nova_auto_optimize";

/// Residency key prefix for graph nodes
pub const NODE_ASSET_PREFIX: &str = "node:";

// ========================================
// Delegate executor
// ========================================

/// Cache configuration handed to the delegate at construction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheSettings {
    /// Cache strategy name; `None` means the delegate's default
    pub kind: Option<String>,
    pub args: Value,
}

/// `(event, data)` status entry reported by a delegate
pub type StatusMessage = (String, Value);

/// The executor that actually runs prompt graphs
pub trait JobExecutor {
    type Error;

    fn init(host: Arc<dyn TelemetryHost>, cache: CacheSettings) -> Self
    where
        Self: Sized;

    fn reset(&mut self);

    fn execute(
        &mut self,
        graph: &PromptGraph,
        job_id: &str,
        extra: &ExtraData,
        outputs: &[String],
    ) -> Result<(), Self::Error>;

    fn success(&self) -> bool;

    fn status_messages(&self) -> &[StatusMessage];

    fn history_result(&self) -> &Map<String, Value>;
}

// ========================================
// Façade
// ========================================

#[derive(Serialize)]
struct SnapshotPayload<'a> {
    prompt_id: &'a str,
    #[serde(flatten)]
    snapshot: ResidencySnapshot,
}

/// Planning and telemetry wrapper around a `JobExecutor`
pub struct NovaPromptExecutor<E: JobExecutor> {
    executor: E,
    telemetry: ExecutionTelemetry,
    residency: ResidencyGraph,
    planner: StreamPlanner,
    probe: Arc<dyn HardwareProbe>,
    plans: PlanStore,
    profile_override: Option<ExecutionProfile>,
}

impl<E: JobExecutor> NovaPromptExecutor<E> {
    /// Construct the delegate through `JobExecutor::init` and wrap it
    pub fn new(
        host: Arc<dyn TelemetryHost>,
        cache: CacheSettings,
        probe: Arc<dyn HardwareProbe>,
        plans: PlanStore,
    ) -> Self {
        let executor = E::init(host.clone(), cache);
        Self::with_executor(executor, host, probe, plans)
    }

    /// Wrap an already constructed delegate
    pub fn with_executor(
        executor: E,
        host: Arc<dyn TelemetryHost>,
        probe: Arc<dyn HardwareProbe>,
        plans: PlanStore,
    ) -> Self {
        Self {
            executor,
            telemetry: ExecutionTelemetry::new(host),
            residency: ResidencyGraph::new(),
            planner: StreamPlanner::new(),
            probe,
            plans,
            profile_override: None,
        }
    }

    /// Use `profile` instead of probing the hardware
    pub fn with_profile_override(mut self, profile: Option<ExecutionProfile>) -> Self {
        self.profile_override = profile;
        self
    }

    pub fn success(&self) -> bool {
        self.executor.success()
    }

    pub fn status_messages(&self) -> &[StatusMessage] {
        self.executor.status_messages()
    }

    pub fn history_result(&self) -> &Map<String, Value> {
        self.executor.history_result()
    }

    pub fn reset(&mut self) {
        self.executor.reset();
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn residency(&self) -> &ResidencyGraph {
        &self.residency
    }

    pub fn plans(&self) -> &PlanStore {
        &self.plans
    }

    fn current_profile(&self) -> ExecutionProfile {
        self.profile_override
            .unwrap_or_else(|| detect_profile(self.probe.as_ref()))
    }

    /// Plan, observe and report `graph`, then run it on the delegate
    ///
    /// Optimization runs only when `extra["nova_auto_optimize"]` is `true`;
    /// the optimized copy is then what gets planned and executed.
    pub fn execute(
        &mut self,
        graph: &PromptGraph,
        job_id: &str,
        extra: &ExtraData,
        outputs: &[String],
    ) -> Result<(), E::Error> {
        let profile = self.current_profile();
        let hints = profile.hints();
        info!("Executing {} with profile {}", job_id, profile);

        let wants_optimize = extra
            .get(AUTO_OPTIMIZE_KEY)
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let (graph, optimization): (Cow<'_, PromptGraph>, OptimizationSummary) = if wants_optimize {
            let (optimized, summary) = optimize_prompt_graph(graph, &hints);
            self.telemetry.emit_event(
                TelemetryEvent::AutoOptimized,
                &json!({
                    "prompt_id": job_id,
                    "changed_node_count": summary.changed_node_count,
                }),
            );
            (Cow::Owned(optimized), summary)
        } else {
            (Cow::Borrowed(graph), OptimizationSummary::default())
        };

        let mut plan = self.planner.build(&graph, hints.tile_size);
        plan.optimization = optimization;
        debug!(
            "Plan for {}: {} tiles, {} windows, {} segments",
            job_id, plan.image.tile_count, plan.video.window_count, plan.audio.segment_count
        );
        self.plans.insert(job_id, plan.clone());

        for node_id in graph.keys() {
            self.residency
                .touch(&format!("{}{}", NODE_ASSET_PREFIX, node_id), AssetUpdate::default());
        }

        self.telemetry.emit_event(
            TelemetryEvent::Plan,
            &json!({
                "prompt_id": job_id,
                "profile": profile,
                "tile_size": hints.tile_size,
                "micro_batch": hints.micro_batch,
                "quantization": hints.quantization,
                "image_tile_count": plan.image.tile_count,
                "video_window_count": plan.video.window_count,
                "audio_segment_count": plan.audio.segment_count,
                "optimized": plan.optimization.changed_node_count > 0,
            }),
        );
        if plan.video.enabled {
            self.telemetry.emit_event(
                TelemetryEvent::PartialVideoPlan,
                &json!({"prompt_id": job_id, "windows": plan.video.windows}),
            );
        }
        if plan.audio.enabled {
            self.telemetry.emit_event(
                TelemetryEvent::PartialAudioPlan,
                &json!({"prompt_id": job_id, "segments": plan.audio.segments}),
            );
        }

        self.executor.execute(&graph, job_id, extra, outputs)?;

        self.telemetry.emit_event(
            TelemetryEvent::ResidencySnapshot,
            &SnapshotPayload {
                prompt_id: job_id,
                snapshot: self.residency.snapshot(),
            },
        );
        Ok(())
    }
}
