use clap::{Parser, Subcommand};

use super::constants::{ENV_DATABASE_URL, ENV_HOST, ENV_PORT};

#[derive(Parser)]
#[command(name = "hikari")]
#[command(version, about = "LLM pipeline cost collector", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Server host address
    #[arg(long, short = 'H', global = true, env = ENV_HOST)]
    pub host: Option<String>,

    /// Server port
    #[arg(long, short = 'p', global = true, env = ENV_PORT)]
    pub port: Option<u16>,

    /// TimescaleDB connection URL
    #[arg(long, global = true, env = ENV_DATABASE_URL)]
    pub database_url: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the collector (default when no command is given)
    Start,
}

/// Resolved CLI overrides, separated from the clap surface so config
/// loading does not depend on clap types.
#[derive(Debug, Default, Clone)]
pub struct CliConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database_url: Option<String>,
}

pub fn parse() -> (CliConfig, Option<Commands>) {
    let cli = Cli::parse();
    let config = CliConfig {
        host: cli.host,
        port: cli.port,
        database_url: cli.database_url,
    };
    (config, cli.command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_no_command() {
        let cli = Cli::try_parse_from(["hikari"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.host.is_none());
    }

    #[test]
    fn test_start_with_overrides() {
        let cli = Cli::try_parse_from([
            "hikari",
            "start",
            "--host",
            "127.0.0.1",
            "--port",
            "9000",
            "--database-url",
            "postgres://localhost/hikari",
        ])
        .unwrap();

        assert!(matches!(cli.command, Some(Commands::Start)));
        assert_eq!(cli.host.as_deref(), Some("127.0.0.1"));
        assert_eq!(cli.port, Some(9000));
        assert_eq!(
            cli.database_url.as_deref(),
            Some("postgres://localhost/hikari")
        );
    }
}
