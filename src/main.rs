mod cli;
mod config;
mod audio;
mod fingerprint;
mod transcode;
mod discover;
mod matcher;

use anyhow::{Context, Result};
use std::process::ExitCode;

use cli::{Invocation, OutputFormat};
use config::{Config, Settings};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let invocation = cli::parse_from(std::env::args_os()).unwrap_or_else(|e| e.exit());

    // NO MATCH is a completed comparison; only failures exit non-zero.
    match run(&invocation) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("ERROR {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(invocation: &Invocation) -> Result<()> {
    let cli = &invocation.cli;
    let config = match config::find_config(cli.config.as_deref()) {
        Some(path) => match config::load_config(&path) {
            Ok(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            Err(err) => {
                log::warn!("{:#}; using defaults", err);
                Config::default()
            }
        },
        None => Config::default(),
    };
    let settings = Settings::resolve(cli, config);

    if settings.jobs > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(settings.jobs)
            .build_global()
            .context("Failed to configure worker threads")?;
    }

    let first = discover::expand(&invocation.first)?;
    let second = discover::expand(&invocation.second)?;
    log::info!(
        "Comparing {} x {} files (transcoder: {:?})",
        first.len(),
        second.len(),
        settings.transcoder.backend
    );

    let results = matcher::compare_sets(&first, &second, &settings.transcoder)?;

    for result in &results {
        match settings.format {
            OutputFormat::Text => println!("{}", result),
            OutputFormat::Json => println!("{}", serde_json::to_string(result)?),
        }
    }

    let matches = results.iter().filter(|r| r.is_match()).count();
    log::info!("Done: {} of {} comparisons matched", matches, results.len());
    Ok(())
}
