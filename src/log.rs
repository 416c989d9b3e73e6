use serde::Deserialize;
use tracing_subscriber::{fmt::Subscriber, EnvFilter};

/// Environment variable carrying a tracing filter directive, e.g. `todolist=debug`.
pub const LOG_ENV: &str = "TODOLIST_LOG";

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct Log {
    pub level: String,
    /// Emit one JSON object per event instead of human readable lines.
    pub structured: bool,
    pub ansi: Option<bool>,
}

/// setup log from an optional environment filter and the config file
///
/// if the environment filter is present, then the config level is not used.
/// Without either, no subscriber is installed.
pub fn setup(
    env_filter: Result<EnvFilter, tracing_subscriber::filter::FromEnvError>,
    config: &Option<Log>,
) -> anyhow::Result<()> {
    let env_filter = match (env_filter, config) {
        (Ok(env_filter), _) => env_filter,
        (Err(_), Some(log)) => EnvFilter::try_new(&log.level)?,
        (Err(_), None) => return Ok(()),
    };
    let structured = config.as_ref().map(|log| log.structured).unwrap_or(false);
    let ansi = config.as_ref().and_then(|log| log.ansi).unwrap_or(true);

    let sbuilder = Subscriber::builder()
        .with_timer(tracing_subscriber::fmt::time::ChronoUtc::rfc3339())
        .with_level(true)
        .with_env_filter(env_filter);
    if structured {
        let ss = sbuilder.json().finish();
        tracing::subscriber::set_global_default(ss)?;
    } else {
        let ss = sbuilder.with_ansi(ansi).finish();
        tracing::subscriber::set_global_default(ss)?;
    }
    Ok(())
}
