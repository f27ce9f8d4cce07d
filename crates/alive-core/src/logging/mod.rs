use tracing_subscriber::filter::Directive;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Target prefix shared by the `alive` binary and `alive_core`.
const LOG_TARGET: &str = "alive";

fn log_directive(quiet: bool) -> String {
    let level = if quiet { "error" } else { "info" };
    format!("{LOG_TARGET}={level}")
}

/// Initialize logging with optional quiet mode.
///
/// When `quiet` is true, only error-level events are emitted.
/// When `quiet` is false, info-level and above events are emitted.
/// Logs go to stderr as JSON so stdout stays free for board updates.
pub fn init_logging(quiet: bool) {
    let directive: Directive = log_directive(quiet)
        .parse()
        .expect("Invalid log directive");

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_current_span(false)
                .with_span_list(false),
        )
        .with(EnvFilter::from_default_env().add_directive(directive))
        .init();
}
