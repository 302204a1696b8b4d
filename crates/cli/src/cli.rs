//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Sim Bridge - drive a simulated vehicle through the world adapter
#[derive(Parser, Debug)]
#[command(
    name = "sim-bridge",
    author,
    version,
    about = "Driving simulator bridge",
    long_about = "Runs the simulator bridge against the built-in kinematic engine.\n\n\
                  Builds the engine and cameras from configuration, then drives the \n\
                  vehicle at a fixed rate while reading state and camera frames."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "SIM_BRIDGE_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "SIM_BRIDGE_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the driving loop
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display the resolved engine configuration
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON); built-in defaults when omitted
    #[arg(short, long, env = "SIM_BRIDGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Maximum number of loop iterations (0 = unlimited)
    #[arg(long, default_value = "0", env = "SIM_BRIDGE_MAX_FRAMES")]
    pub max_frames: u64,

    /// Run timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "SIM_BRIDGE_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without running
    #[arg(long)]
    pub dry_run: bool,

    /// Target speed for the built-in speed controller (m/s)
    #[arg(long, default_value = "8.0", env = "SIM_BRIDGE_TARGET_SPEED")]
    pub target_speed: f64,

    /// Override loop rate from configuration (Hz)
    #[arg(long, env = "SIM_BRIDGE_RATE_HZ")]
    pub rate_hz: Option<f64>,

    /// Capture the wide camera too
    #[arg(long)]
    pub dual_camera: bool,

    /// Disable the render window
    #[arg(long)]
    pub headless: bool,

    /// Override the kinematic engine episode horizon (steps)
    #[arg(long, env = "SIM_BRIDGE_HORIZON")]
    pub horizon: Option<u64>,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "9000", env = "SIM_BRIDGE_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "bridge.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file; built-in defaults when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show detailed camera information
    #[arg(long)]
    pub cameras: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_defaults() {
        let cli = Cli::try_parse_from(["sim-bridge", "run"]).unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert!(args.config.is_none());
        assert_eq!(args.max_frames, 0);
        assert_eq!(args.target_speed, 8.0);
        assert_eq!(args.metrics_port, 9000);
        assert!(!args.dual_camera);
    }

    #[test]
    fn test_run_overrides() {
        let cli = Cli::try_parse_from([
            "sim-bridge",
            "-v",
            "run",
            "--config",
            "bridge.toml",
            "--max-frames",
            "200",
            "--rate-hz",
            "20",
            "--dual-camera",
            "--headless",
            "--horizon",
            "50",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 1);
        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.config, Some(PathBuf::from("bridge.toml")));
        assert_eq!(args.max_frames, 200);
        assert_eq!(args.rate_hz, Some(20.0));
        assert!(args.dual_camera && args.headless);
        assert_eq!(args.horizon, Some(50));
    }

    #[test]
    fn test_log_format_maps_to_observability() {
        let cli = Cli::try_parse_from(["sim-bridge", "--log-format", "json", "info"]).unwrap();
        assert_eq!(
            observability::LogFormat::from(cli.log_format),
            observability::LogFormat::Json
        );
        assert_eq!(
            observability::LogFormat::from(LogFormat::default()),
            observability::LogFormat::Pretty
        );
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["sim-bridge", "-q", "-v", "info"]).is_err());
    }
}
