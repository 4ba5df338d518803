use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber. Logs go to stderr so stdout only
/// carries job results. `RUST_LOG` wins over `verbose` when set.
pub fn init(verbose: bool) {
    let default_filter = if verbose {
        "comfy_relay=debug"
    } else {
        "comfy_relay=info"
    };

    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}
