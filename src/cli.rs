//! CLI argument parsing for the royal-worker binary.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "royal-worker", about = "Royal Paints website backend worker")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the worker server (default if no subcommand given)
    Serve,
    /// Run database migrations and exit
    Migrate,
    /// Create an admin account or reset its password interactively
    CreateAdmin {
        /// Admin email address
        #[arg(long)]
        email: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_migrate_command_parses() {
        let cli = Cli::parse_from(["royal-worker", "migrate"]);
        assert!(matches!(cli.command, Some(Command::Migrate)));
    }

    #[test]
    fn test_cli_no_command_defaults_to_none() {
        let cli = Cli::parse_from(["royal-worker"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_create_admin_takes_email() {
        let cli = Cli::parse_from(["royal-worker", "create-admin", "--email", "owner@royalpaints.com"]);
        match cli.command {
            Some(Command::CreateAdmin { email }) => assert_eq!(email, "owner@royalpaints.com"),
            _ => panic!("expected create-admin"),
        }
    }

    #[test]
    fn test_cli_create_admin_requires_email() {
        assert!(Cli::try_parse_from(["royal-worker", "create-admin"]).is_err());
    }
}
