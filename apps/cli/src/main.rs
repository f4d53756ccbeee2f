//! ddbtools command-line entry point.

#![forbid(unsafe_code)]

mod cli;
mod cli_config;

use std::process::ExitCode;
use std::sync::Arc;

use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::config::Region;
use clap::Parser;
use ddbtools_application::PurgeService;
use ddbtools_core::{AppError, AppResult, TableName};
use ddbtools_domain::PurgeReport;
use ddbtools_infrastructure::DynamoDbTableProvider;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, OutputFormat, PurgeArgs};
use crate::cli_config::CliConfig;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Purge(args) => purge(args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{error}");
            ExitCode::FAILURE
        }
    }
}

async fn purge(args: PurgeArgs) -> AppResult<()> {
    // Fail on a missing name before any AWS configuration is loaded.
    let table_name = TableName::new(args.table_name.as_deref())?;
    let config = CliConfig::load()?.with_overrides(&args)?;

    info!(
        table_name = %table_name,
        max_concurrency = config.max_concurrency,
        batch_size = config.batch_size.get(),
        endpoint_url = config.endpoint_url.as_deref().unwrap_or("default"),
        "starting purge"
    );

    let client = build_client(&config).await;
    let service = PurgeService::new(Arc::new(DynamoDbTableProvider::new(client)))
        .with_batch_size(config.batch_size)
        .with_max_concurrency(config.max_concurrency);

    let report = service.purge(Some(table_name.as_str())).await?;
    write_report(&report, args.output)
}

async fn build_client(config: &CliConfig) -> aws_sdk_dynamodb::Client {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = &config.region {
        loader = loader.region(Region::new(region.clone()));
    }
    if let Some(endpoint_url) = &config.endpoint_url {
        loader = loader.endpoint_url(endpoint_url);
    }

    let sdk_config = loader.load().await;
    aws_sdk_dynamodb::Client::new(&sdk_config)
}

fn write_report(report: &PurgeReport, output: OutputFormat) -> AppResult<()> {
    match output {
        OutputFormat::Text => println!("Deleted {} items", report.observed_items()),
        OutputFormat::Json => {
            let rendered = serde_json::to_string_pretty(report).map_err(|error| {
                AppError::Internal(format!("failed to render purge report: {error}"))
            })?;
            println!("{rendered}");
        }
    }

    let deletion = report.deletion();
    if !deletion.is_complete() {
        warn!(
            table_name = report.table_name(),
            items_remaining = deletion.items_remaining(),
            batches_failed = deletion.batches_failed,
            "purge finished with items left behind"
        );
        eprintln!(
            "warning: {} of {} items may remain in '{}' ({} of {} batches failed)",
            deletion.items_remaining(),
            report.observed_items(),
            report.table_name(),
            deletion.batches_failed,
            deletion.batches_total
        );
    }

    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}
