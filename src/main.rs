use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use bag2csv::cli::Cli;
use bag2csv::convert;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_writer(std::io::stderr).with_env_filter(filter).init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let options = cli.export_options()?;
    let summary = convert::export_bag(&options)?;
    summary.print_table();
    if summary.capacity_exceeded > 0 {
        tracing::warn!(
            "{} obstacle samples were dropped because more than {} distinct ids appeared",
            summary.capacity_exceeded,
            options.capacity
        );
    }
    Ok(())
}
