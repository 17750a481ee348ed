//! nova-plan - Command-line front end for the NOVA scheduling layer
//!
//! Prints profile hints and recommendations, and dry-runs the scheduling
//! façade against a prompt graph file so its stream plan and telemetry can
//! be inspected without a real executor.

use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use nova_common::config::NovaConfig;
use nova_common::TelemetryMessage;
use nova_sched::graph::{ExtraData, PromptGraph};
use nova_sched::logging;
use nova_sched::profile::{auto_optimize_hint, get_profile_hints, HardwareProbe, StaticProbe};
use nova_sched::scheduler::{CacheSettings, StatusMessage, AUTO_OPTIMIZE_KEY};
use nova_sched::{BroadcastHost, ExecutionProfile, JobExecutor, NovaPromptExecutor, StreamPlan, TelemetryHost};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{info, warn};
use tracing_subscriber::util::SubscriberInitExt;
use uuid::Uuid;

/// Command-line arguments for nova-plan
#[derive(Parser, Debug)]
#[command(name = "nova-plan")]
#[command(about = "Profile hints and stream planning for NOVA")]
#[command(version)]
struct Args {
    /// Configuration file (overrides NOVA_CONFIG and the platform default)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the hint record for a profile (detected when omitted)
    Hints {
        #[arg(short, long)]
        profile: Option<String>,
    },

    /// Print the profile and recommendation for a job size
    Recommend {
        #[arg(long, default_value_t = 1024)]
        width: i64,
        #[arg(long, default_value_t = 1024)]
        height: i64,
        #[arg(long, default_value_t = 20)]
        steps: i64,
        #[arg(short, long)]
        profile: Option<String>,
    },

    /// Dry-run a prompt graph through the scheduler
    Plan {
        /// JSON file holding the prompt graph
        graph: PathBuf,

        /// Clamp graph parameters to the profile before planning
        #[arg(long)]
        optimize: bool,

        /// Job id (random when omitted)
        #[arg(long)]
        job_id: Option<String>,
    },
}

/// Delegate that records calls instead of running anything
struct DryRunExecutor {
    messages: Vec<StatusMessage>,
    history: Map<String, Value>,
    success: bool,
}

impl JobExecutor for DryRunExecutor {
    type Error = Infallible;

    fn init(_host: Arc<dyn TelemetryHost>, cache: CacheSettings) -> Self {
        info!("Dry-run executor (cache: {})", cache.kind.as_deref().unwrap_or("default"));
        Self {
            messages: Vec::new(),
            history: Map::new(),
            success: false,
        }
    }

    fn reset(&mut self) {
        self.messages.clear();
        self.history.clear();
        self.success = false;
    }

    fn execute(
        &mut self,
        graph: &PromptGraph,
        job_id: &str,
        _extra: &ExtraData,
        outputs: &[String],
    ) -> Result<(), Infallible> {
        self.messages
            .push(("execution_start".to_string(), json!({"prompt_id": job_id})));
        self.history.insert(
            "meta".to_string(),
            json!({"dry_run": true, "node_count": graph.len(), "outputs": outputs}),
        );
        self.messages
            .push(("execution_success".to_string(), json!({"prompt_id": job_id})));
        self.success = true;
        Ok(())
    }

    fn success(&self) -> bool {
        self.success
    }

    fn status_messages(&self) -> &[StatusMessage] {
        &self.messages
    }

    fn history_result(&self) -> &Map<String, Value> {
        &self.history
    }
}

#[derive(Serialize)]
struct PlanReport {
    job_id: String,
    success: bool,
    plan: Option<StreamPlan>,
    events: Vec<TelemetryMessage>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing before config so resolution warnings are visible
    let (subscriber, filter_handle) =
        logging::subscriber(logging::env_or_default_filter(logging::BOOTSTRAP_LEVEL), std::io::stderr);
    subscriber.init();

    let config = NovaConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    logging::apply_configured_level(&filter_handle, &config.logging.level)
        .context("Failed to apply configured log level")?;

    let probe: Arc<dyn HardwareProbe> = Arc::new(StaticProbe::from_config(&config.hardware));

    match args.command {
        Command::Hints { profile } => {
            let profile = resolve_profile(profile.as_deref().or(config.profile_override.as_deref()));
            let hints = get_profile_hints(profile, probe.as_ref());
            print_json(&hints)
        }
        Command::Recommend {
            width,
            height,
            steps,
            profile,
        } => {
            let mut payload = Map::new();
            if let Some(name) = profile.or_else(|| config.profile_override.clone()) {
                payload.insert("profile".to_string(), Value::String(name));
            }
            payload.insert("width".to_string(), json!(width));
            payload.insert("height".to_string(), json!(height));
            payload.insert("steps".to_string(), json!(steps));
            print_json(&auto_optimize_hint(&payload, probe.as_ref()))
        }
        Command::Plan {
            graph,
            optimize,
            job_id,
        } => {
            let report = run_plan(&config, probe, graph, optimize, job_id).await?;
            print_json(&report)
        }
    }
}

/// Parse a profile name, warning and falling back to detection when unknown
fn resolve_profile(name: Option<&str>) -> Option<ExecutionProfile> {
    let name = name?;
    match name.parse() {
        Ok(profile) => Some(profile),
        Err(e) => {
            warn!("{}, detecting profile instead", e);
            None
        }
    }
}

async fn run_plan(
    config: &NovaConfig,
    probe: Arc<dyn HardwareProbe>,
    graph_path: PathBuf,
    optimize: bool,
    job_id: Option<String>,
) -> Result<PlanReport> {
    let content = tokio::fs::read_to_string(&graph_path)
        .await
        .with_context(|| format!("Failed to read {}", graph_path.display()))?;
    let graph = match serde_json::from_str::<Value>(&content)
        .with_context(|| format!("Failed to parse {}", graph_path.display()))?
    {
        Value::Object(graph) => graph,
        _ => bail!("{} does not contain a JSON object", graph_path.display()),
    };

    let job_id = job_id.unwrap_or_else(|| Uuid::new_v4().to_string());
    let mut extra = Map::new();
    extra.insert(AUTO_OPTIMIZE_KEY.to_string(), Value::Bool(optimize));

    let host = Arc::new(BroadcastHost::from_config(&config.telemetry));
    let mut receiver = host.subscribe();
    let plans = host.plans();
    let profile = resolve_profile(config.profile_override.as_deref());

    let mut executor = NovaPromptExecutor::<DryRunExecutor>::new(host.clone(), CacheSettings::default(), probe, plans.clone())
        .with_profile_override(profile);

    info!("Planning job {} from {}", job_id, graph_path.display());
    let success = tokio::task::spawn_blocking({
        let job_id = job_id.clone();
        move || -> Result<bool> {
            executor.execute(&graph, &job_id, &extra, &[])?;
            Ok(executor.success())
        }
    })
    .await
    .context("Planning task failed")??;

    let mut events = Vec::new();
    while let Ok(message) = receiver.try_recv() {
        events.push(message);
    }

    Ok(PlanReport {
        plan: plans.get(&job_id),
        job_id,
        success,
        events,
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", text);
    Ok(())
}
