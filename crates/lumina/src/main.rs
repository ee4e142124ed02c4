mod app;
mod cli;
mod commands;
mod commentary;
mod config;
mod gemini;
mod model;
mod render;
mod resolver;
mod store;
mod sync;
mod theme;
mod transport;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use cli::Cli;

/// `RUST_LOG` wins; otherwise the level follows `-v`/`-q`.
fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "lumina=debug,info",
        (false, _) => "lumina=trace,debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }
    init_logging(cli.verbose, cli.quiet);

    if let Err(e) = cli.run() {
        eprintln!("{} {e:#}", "Error:".red().bold());
        std::process::exit(1);
    }
}
