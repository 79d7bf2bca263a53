pub mod build_info;

use tracing_subscriber::{fmt, EnvFilter};

/// Directive used when neither `RUST_LOG` nor the configuration supplies one.
pub const DEFAULT_LOG_DIRECTIVE: &str = "fintrack=info";

/// Installs the global subscriber. `RUST_LOG` wins over `directive`; events go to
/// stderr so command output on stdout stays parseable.
///
/// Returns `false` when another subscriber was already installed, for example by
/// an application embedding this crate. That subscriber keeps receiving events.
pub fn init_tracing(directive: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directive))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVE));

    match fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
    {
        Ok(()) => true,
        Err(err) => {
            tracing::debug!(error = %err, "global tracing subscriber already installed");
            false
        }
    }
}
