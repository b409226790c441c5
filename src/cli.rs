use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ratecard", version, about = "Storage pricing catalog rate card")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "ratecard.toml", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Ingest every configured catalog and print a summary (default)
    Check,

    /// List regions known to the rate card
    Regions,

    /// Show every rate published for a storage type
    Lookup {
        region: String,

        /// Storage type, e.g. ebsGPSSD or storage
        storage_type: String,

        /// Volume tier for tiered catalogs
        #[arg(short, long)]
        tier: Option<String>,
    },

    /// Print a single price
    Rate {
        region: String,

        storage_type: String,

        /// Rate tag, e.g. perGBmoProvStorage
        rate_kind: String,

        #[arg(short, long)]
        tier: Option<String>,

        #[arg(long, default_value = "USD")]
        currency: String,
    },

    /// Estimate a monthly storage bill
    Estimate {
        region: String,

        storage_type: String,

        /// Stored or provisioned size in GB
        #[arg(short, long)]
        size_gb: String,

        /// Provisioned IOPS (volume estimates only)
        #[arg(short, long, default_value = "0")]
        iops: String,

        /// Walk volume tiers instead of pricing a single volume
        #[arg(long)]
        tiered: bool,

        #[arg(long, default_value = "USD")]
        currency: String,
    },

    /// Write the rate card as JSON
    Export {
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Keep refreshing the rate card until interrupted
    Watch {
        /// Override refresh.interval_seconds
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// Show version information
    Version,
}

impl Cli {
    /// Get the command to execute, defaulting to Check if none provided
    pub fn get_command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Check)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_check() {
        let cli = Cli {
            config: PathBuf::from("ratecard.toml"),
            command: None,
        };

        assert!(matches!(cli.get_command(), Commands::Check));
    }

    #[test]
    fn test_cli_parsing_rate_defaults() {
        let args = vec!["ratecard", "rate", "eu-west-1", "ebsGPSSD", "perGBmoProvStorage"];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.get_command() {
            Commands::Rate {
                region,
                rate_kind,
                tier,
                currency,
                ..
            } => {
                assert_eq!(region, "eu-west-1");
                assert_eq!(rate_kind, "perGBmoProvStorage");
                assert!(tier.is_none());
                assert_eq!(currency, "USD");
            }
            _ => panic!("Expected Rate command"),
        }
    }

    #[test]
    fn test_cli_parsing_estimate_tiered() {
        let args = vec![
            "ratecard", "estimate", "eu-west-1", "storage", "--size-gb", "2048", "--tiered",
        ];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.get_command() {
            Commands::Estimate {
                size_gb, iops, tiered, ..
            } => {
                assert_eq!(size_gb, "2048");
                assert_eq!(iops, "0");
                assert!(tiered);
            }
            _ => panic!("Expected Estimate command"),
        }
    }

    #[test]
    fn test_global_config_flag() {
        let args = vec!["ratecard", "regions", "--config", "/etc/ratecard.toml"];
        let cli = Cli::try_parse_from(args).unwrap();

        assert_eq!(cli.config, PathBuf::from("/etc/ratecard.toml"));
        assert!(matches!(cli.get_command(), Commands::Regions));
    }
}
