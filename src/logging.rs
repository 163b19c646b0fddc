//! Log output on stderr via `tracing`.

use std::io::IsTerminal;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber.
///
/// `--verbose` wins over `--quiet`; with neither, `RUST_LOG` is honoured and
/// falls back to info.
pub fn init(verbose: bool, quiet: bool) {
    let filter = if verbose {
        EnvFilter::new("luadoc=debug")
    } else if quiet {
        EnvFilter::new("luadoc=error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("luadoc=info"))
    };

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .with_ansi(use_colors())
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

/// Colors only on a terminal, and never with `NO_COLOR` set.
fn use_colors() -> bool {
    std::env::var_os("NO_COLOR").is_none() && std::io::stderr().is_terminal()
}
