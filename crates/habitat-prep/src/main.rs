//! habitat-prep CLI.
//!
//! ```text
//! habitat-prep --config prep.yaml tiles
//! habitat-prep --bbox=-105.3,39.5,-104.1,40.2 soil --variable clay
//! habitat-prep -v climate
//! habitat-prep srtm
//! ```

use clap::{Parser, Subcommand};
use habitat_fetch::{HttpRasterSource, NetcdfClimateSource};
use habitat_grid::BoundingBox;
use habitat_prep::{parse_bbox, run_climate, run_soil, run_srtm, run_tiles, PrepConfig, Result};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Prepare soil, climate and elevation inputs for habitat modeling.
#[derive(Parser, Debug)]
#[command(name = "habitat-prep")]
#[command(about = "Prepare soil, climate and elevation inputs for habitat modeling")]
struct Cli {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Data directory (overrides config)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Region as west,south,east,north (overrides config)
    #[arg(long, value_parser = parse_bbox, allow_hyphen_values = true)]
    bbox: Option<BoundingBox>,

    /// HTTP timeout in seconds (overrides config)
    #[arg(long)]
    timeout: Option<u64>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the soil tile URLs covering the region as JSON
    Tiles,

    /// Fetch, merge and write the soil layer for the region
    Soil {
        #[arg(long)]
        variable: Option<String>,
        #[arg(long)]
        statistic: Option<String>,
        #[arg(long)]
        depth: Option<String>,
        /// Output GeoTIFF (default: data_dir/soil/{variable}_{statistic}_{depth}.tif)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Clip climate projections for each configured site
    Climate {
        /// Output directory (default: data_dir/climate)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Find or download SRTM elevation archives
    Srtm,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Config file (or defaults) with command-line overrides applied.
fn resolve_config(cli: &Cli) -> Result<PrepConfig> {
    let mut config = match &cli.config {
        Some(path) => PrepConfig::load(path)?,
        None => PrepConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(bbox) = cli.bbox {
        config.bbox = Some(bbox);
    }
    if let Some(secs) = cli.timeout {
        config.http_timeout_secs = secs;
    }
    if let Command::Soil {
        variable,
        statistic,
        depth,
        ..
    } = &cli.command
    {
        if let Some(v) = variable {
            config.soil.variable = v.clone();
        }
        if let Some(s) = statistic {
            config.soil.statistic = s.clone();
        }
        if let Some(d) = depth {
            config.soil.depth = d.clone();
        }
    }
    config.validate()?;
    Ok(config)
}

fn run(cli: &Cli) -> Result<()> {
    let config = resolve_config(cli)?;

    match &cli.command {
        Command::Tiles => {
            println!("{}", run_tiles(&config)?);
        }
        Command::Soil { output, .. } => {
            let source = HttpRasterSource::new(config.http_timeout())?;
            run_soil(&config, &source, output.as_deref())?;
            let stats = source.fetcher().download_stats();
            info!(
                "Fetched {} tiles ({} bytes)",
                stats.files_downloaded, stats.bytes_downloaded
            );
        }
        Command::Climate { output_dir } => {
            run_climate(&config, &NetcdfClimateSource, output_dir.as_deref())?;
        }
        Command::Srtm => {
            let archives = run_srtm(&config)?;
            info!("{} SRTM archives ready", archives.len());
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(&cli) {
        error!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prep.yaml");
        std::fs::write(
            &path,
            "data_dir: /srv/habitat\nhttp_timeout_secs: 30\nsoil:\n  variable: clay\n",
        )
        .unwrap();

        let cli = Cli::parse_from([
            "habitat-prep",
            "--config",
            path.to_str().unwrap(),
            "--bbox=-105.3,39.5,-104.1,40.2",
            "--timeout",
            "10",
            "soil",
            "--depth",
            "0_5",
        ]);
        let config = resolve_config(&cli).unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/srv/habitat"));
        assert_eq!(config.http_timeout_secs, 10);
        assert_eq!(config.soil.variable, "clay");
        assert_eq!(config.soil.depth, "0_5");
        assert_eq!(
            config.bbox.map(|b| b.total_bounds()),
            Some([-105.3, 39.5, -104.1, 40.2])
        );
    }

    #[test]
    fn test_zero_timeout_override_is_rejected() {
        let cli = Cli::parse_from(["habitat-prep", "--timeout", "0", "tiles"]);
        let err = resolve_config(&cli).unwrap_err();
        assert!(
            matches!(err, habitat_prep::PrepError::InvalidConfig(_)),
            "unexpected {:?}",
            err
        );
    }

    #[test]
    fn test_defaults_without_config() {
        let cli = Cli::parse_from(["habitat-prep", "-vv", "tiles"]);
        assert_eq!(cli.verbose, 2);
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert!(config.bbox.is_none());
    }
}
