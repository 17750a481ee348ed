//! Tracing setup for the `nova-plan` binary
//!
//! The subscriber is installed before configuration is read so that config
//! resolution messages are not lost. Its filter sits behind a reload layer;
//! once the config is known, `apply_configured_level` swaps in the
//! configured level unless `RUST_LOG` was given.

use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, reload, EnvFilter, Registry};

/// Level used until the configuration has been loaded
pub const BOOTSTRAP_LEVEL: &str = "info";

/// Handle for replacing the active filter
pub type FilterHandle = reload::Handle<EnvFilter, Registry>;

/// `level` for both NOVA crates
pub fn default_filter(level: &str) -> EnvFilter {
    EnvFilter::new(format!("nova_sched={0},nova_common={0}", level))
}

/// `RUST_LOG` if set and valid, else `default_filter(level)`
pub fn env_or_default_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(level))
}

/// Registry with a reloadable filter and a fmt layer writing to `make_writer`
pub fn subscriber<W>(filter: EnvFilter, make_writer: W) -> (impl Subscriber + Send + Sync + 'static, FilterHandle)
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let (filter, handle) = reload::Layer::new(filter);
    let subscriber = Registry::default()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(make_writer));
    (subscriber, handle)
}

/// Switch to the configured level; an explicit `RUST_LOG` keeps precedence
pub fn apply_configured_level(handle: &FilterHandle, level: &str) -> Result<(), reload::Error> {
    if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
        return Ok(());
    }
    handle.reload(default_filter(level))
}
