use clap::{Args, Parser, Subcommand, ValueEnum};

/// Maintenance tools for DynamoDB tables.
#[derive(Debug, Parser)]
#[command(name = "ddbtools", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Delete every item of a table while keeping the table itself
    Purge(PurgeArgs),
}

#[derive(Debug, Args)]
pub struct PurgeArgs {
    /// Table to empty
    #[arg(short = 't', long)]
    pub table_name: Option<String>,

    /// Maximum number of bulk-delete requests in flight
    #[arg(long)]
    pub max_concurrency: Option<usize>,

    /// Keys per bulk-delete request (1-25)
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Custom DynamoDB endpoint, e.g. DynamoDB Local
    #[arg(long)]
    pub endpoint_url: Option<String>,

    /// AWS region override
    #[arg(long)]
    pub region: Option<String>,

    /// Result format written to stdout
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use super::{Cli, Command, OutputFormat};

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn purge_accepts_short_table_flag() {
        let cli = Cli::try_parse_from(["ddbtools", "purge", "-t", "orders", "--output", "json"]);
        assert!(cli.is_ok());
        let Command::Purge(args) = cli.unwrap_or_else(|_| unreachable!()).command;
        assert_eq!(args.table_name.as_deref(), Some("orders"));
        assert_eq!(args.output, OutputFormat::Json);
    }

    #[test]
    fn purge_parses_without_table_name() {
        let cli = Cli::try_parse_from(["ddbtools", "purge"]);
        assert!(cli.is_ok());
        let Command::Purge(args) = cli.unwrap_or_else(|_| unreachable!()).command;
        assert!(args.table_name.is_none());
    }

    #[test]
    fn unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["ddbtools", "truncate"]).is_err());
    }
}
