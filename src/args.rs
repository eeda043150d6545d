use crate::config::AppConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "reveal_chat",
    version = env!("CARGO_PKG_VERSION"),
    about = "Practice reflective listening against a scripted conversation partner"
)]
pub struct Cli {
    /// Port for the HTTP server (overrides REVEAL_PORT)
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// SQLite file for archived conversations (overrides REVEAL_DB_PATH)
    #[arg(long, global = true)]
    pub db_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Serve the HTTP API (default)
    Serve,
    /// Hold one conversation in this terminal
    Chat,
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.unwrap_or(Command::Serve)
    }

    /// Flags win over the environment
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(path) = &self.db_path {
            config.db_path.clone_from(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_serve() {
        let cli = Cli::try_parse_from(["reveal_chat"]).unwrap();
        assert_eq!(cli.command(), Command::Serve);
    }

    #[test]
    fn test_chat_with_overrides() {
        let cli =
            Cli::try_parse_from(["reveal_chat", "chat", "--db-path", "/tmp/r.db", "--port", "9001"])
                .unwrap();
        assert_eq!(cli.command(), Command::Chat);

        let mut config = AppConfig::default();
        cli.apply(&mut config);
        assert_eq!(config.port, 9001);
        assert_eq!(config.db_path, PathBuf::from("/tmp/r.db"));
    }

    #[test]
    fn test_unknown_subcommand_rejected() {
        let err = Cli::try_parse_from(["reveal_chat", "chta"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidSubcommand);
    }

    #[test]
    fn test_help_is_not_a_server_start() {
        let err = Cli::try_parse_from(["reveal_chat", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }
}
