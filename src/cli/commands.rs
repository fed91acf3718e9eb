//! CLI arguments

use clap::Parser;
use std::path::PathBuf;

/// Eloqua source connector
#[derive(Parser, Debug)]
#[command(name = "solidafy-eloqua")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (JSON). Rotated credentials are written back here.
    #[arg(short, long)]
    pub config: PathBuf,

    /// State file (JSON) to resume from
    #[arg(short, long)]
    pub state: Option<PathBuf>,

    /// Catalog file (JSON) with stream selections
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Print the discovered catalog and exit
    #[arg(short, long)]
    pub discover: bool,

    /// Use the access token stored in the config instead of refreshing
    #[arg(long)]
    pub dev: bool,

    /// File rewritten with the state after every bookmark change
    #[arg(long)]
    pub output_state: Option<PathBuf>,
}

impl Cli {
    /// Which mode this invocation runs in
    pub fn mode(&self) -> Mode {
        if self.discover {
            Mode::Discover
        } else {
            Mode::Sync
        }
    }
}

/// Run mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Print the catalog
    Discover,
    /// Sync the selected streams
    Sync,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sync_args() {
        let cli = Cli::try_parse_from([
            "solidafy-eloqua",
            "--config",
            "config.json",
            "--state",
            "state.json",
            "--catalog",
            "catalog.json",
            "--output-state",
            "out.json",
        ])
        .unwrap();

        assert_eq!(cli.mode(), Mode::Sync);
        assert_eq!(cli.config, PathBuf::from("config.json"));
        assert_eq!(cli.state, Some(PathBuf::from("state.json")));
        assert_eq!(cli.catalog, Some(PathBuf::from("catalog.json")));
        assert_eq!(cli.output_state, Some(PathBuf::from("out.json")));
        assert!(!cli.dev);
    }

    #[test]
    fn test_parse_discover_args() {
        let cli = Cli::try_parse_from(["solidafy-eloqua", "-c", "config.json", "--discover", "--dev"])
            .unwrap();
        assert_eq!(cli.mode(), Mode::Discover);
        assert!(cli.dev);
    }

    #[test]
    fn test_config_is_required() {
        assert!(Cli::try_parse_from(["solidafy-eloqua", "--discover"]).is_err());
    }
}
