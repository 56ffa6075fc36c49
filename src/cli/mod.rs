//! Command-line interface.

pub mod commands;
pub mod types;

pub use types::{Cli, Commands};

/// Print `err` with its context chain and exit with status 1.
pub fn handle_error(err: anyhow::Error) -> ! {
    eprintln!("Error: {err}");
    for cause in err.chain().skip(1) {
        eprintln!("  caused by: {cause}");
    }
    std::process::exit(1);
}

/// Stderr-only tracing for one-shot commands, so stdout carries just the result.
pub fn init_cli_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
