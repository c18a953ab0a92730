use clap::Parser;
use color_eyre::Result;

use skuctl::cli::args::Args;
use skuctl::cli::commands;
use skuctl::config::{AppConfig, ConfigSource};

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(args.log_level()))
        .format_timestamp(None)
        .init();

    let (config, source) = AppConfig::load(&args)?;
    match &source {
        ConfigSource::File(path) => log::info!("Using config {}", path.display()),
        ConfigSource::Defaults => log::info!("No config file found, using defaults"),
    }

    if let Err(e) = commands::run(&args, &config) {
        eprintln!("Error: {e}");
        std::process::exit(e.exit_code());
    }
    Ok(())
}
