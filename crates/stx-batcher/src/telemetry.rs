use std::io::IsTerminal as _;

use color_eyre::eyre::{
    self,
    WrapErr as _,
};
use tracing_subscriber::{
    filter::{
        EnvFilter,
        LevelFilter,
    },
    fmt::{
        self,
        MakeWriter,
    },
    layer::SubscriberExt as _,
    registry,
    util::SubscriberInitExt as _,
};

/// Register a global tracing subscriber writing to `sink`.
///
/// Output is human readable if stderr is a tty or `force_stdout` is set, and flattened JSON
/// otherwise. The binary passes stderr as `sink`, leaving stdout to the run's progress lines
/// and summary.
///
/// # Errors
/// Returns an error if `filter_directives` do not parse, or a global subscriber was already
/// installed.
pub fn init<S>(sink: S, filter_directives: &str, force_stdout: bool) -> eyre::Result<()>
where
    S: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let env_filter =
        init_env_filter(filter_directives).wrap_err("failed initializing telemetry env filter")?;
    let (json_log, human_log) = if force_stdout || std::io::stderr().is_terminal() {
        (None, Some(fmt::layer().with_writer(sink)))
    } else {
        (
            Some(fmt::layer().json().flatten_event(true).with_writer(sink)),
            None,
        )
    };

    registry()
        .with(human_log)
        .with(json_log)
        .with(env_filter)
        .try_init()
        .wrap_err("failed initializing telemetry stack")
}

fn init_env_filter(dirs: &str) -> eyre::Result<EnvFilter> {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .parse(dirs)
        .wrap_err("failed parsing configured filter directives")
}
