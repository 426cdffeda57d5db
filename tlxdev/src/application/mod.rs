pub mod handlers;

use crate::presentation::cli::{Cli, Commands};
use clap::Parser;
use tlx_core::error::Result;
use tracing_subscriber::EnvFilter;

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.debug);

    match cli.command {
        Commands::Extract {
            selector,
            dst,
            overwrite,
            workers,
            no_preflight,
        } => handlers::handle_extract(selector, dst, overwrite, workers, no_preflight),
        Commands::Query { selector } => handlers::handle_query(selector),
        Commands::DecryptIndex { meta, out, lib_dir } => {
            handlers::handle_decrypt_index(meta, out, lib_dir)
        }
        Commands::Decode { input, out, key } => handlers::handle_decode(input, out, key),
    }
}

/// `RUST_LOG` wins; otherwise the flags pick the level.
fn init_logging(verbose: bool, debug: bool) {
    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
