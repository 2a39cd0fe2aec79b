pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::AppConfig;

#[derive(Parser)]
#[command(name = "clientdb")]
#[command(about = "Client directory API - clients, services and contacts")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP API (default)")]
    Serve {
        #[arg(long, help = "Port to listen on, overrides CLIENTDB_API_PORT")]
        port: Option<u16>,
    },

    #[command(about = "Load clients, services and contacts from a JSON fixture")]
    Seed {
        #[arg(long, help = "Fixture file", default_value = "fixtures/seed.json")]
        file: PathBuf,
    },
}

pub async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<()> {
    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => commands::serve::handle(config, port).await,
        Commands::Seed { file } => commands::seed::handle(config, file).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default() {
        let cli = Cli::try_parse_from(["clientdb"]).unwrap();
        assert!(cli.command.is_none());

        let cli = Cli::try_parse_from(["clientdb", "serve", "--port", "9000"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Serve { port: Some(9000) })));
    }

    #[test]
    fn seed_defaults_to_bundled_fixture() {
        let cli = Cli::try_parse_from(["clientdb", "seed"]).unwrap();
        match cli.command {
            Some(Commands::Seed { file }) => assert_eq!(file, PathBuf::from("fixtures/seed.json")),
            _ => panic!("expected seed command"),
        }
    }
}
