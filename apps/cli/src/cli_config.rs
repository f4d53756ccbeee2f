use std::env;

use ddbtools_application::{DEFAULT_MAX_CONCURRENCY, MAX_CONCURRENCY_LIMIT};
use ddbtools_core::{AppError, AppResult};
use ddbtools_domain::{BatchSize, MAX_BATCH_DELETE_ITEMS};

use crate::cli::PurgeArgs;

/// Runtime settings for a purge, read from the environment and overridden by flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliConfig {
    pub max_concurrency: usize,
    pub batch_size: BatchSize,
    pub endpoint_url: Option<String>,
    pub region: Option<String>,
}

impl CliConfig {
    /// Loads settings from process environment variables.
    pub fn load() -> AppResult<Self> {
        Self::from_source(|name| env::var(name).ok())
    }

    fn from_source(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let max_concurrency = parse_usize(
            &lookup,
            "DDBTOOLS_MAX_CONCURRENCY",
            DEFAULT_MAX_CONCURRENCY,
        )?;
        let batch_size = parse_usize(&lookup, "DDBTOOLS_BATCH_SIZE", MAX_BATCH_DELETE_ITEMS)?;
        let endpoint_url = optional(&lookup, "DDBTOOLS_ENDPOINT_URL");

        Self::validated(max_concurrency, batch_size, endpoint_url, None)
    }

    /// Applies command-line overrides on top of the environment settings.
    pub fn with_overrides(self, args: &PurgeArgs) -> AppResult<Self> {
        Self::validated(
            args.max_concurrency.unwrap_or(self.max_concurrency),
            args.batch_size.unwrap_or(self.batch_size.get()),
            args.endpoint_url.clone().or(self.endpoint_url),
            args.region.clone().or(self.region),
        )
    }

    fn validated(
        max_concurrency: usize,
        batch_size: usize,
        endpoint_url: Option<String>,
        region: Option<String>,
    ) -> AppResult<Self> {
        if max_concurrency == 0 || max_concurrency > MAX_CONCURRENCY_LIMIT {
            return Err(AppError::Configuration(format!(
                "max concurrency must be between 1 and {MAX_CONCURRENCY_LIMIT}, got {max_concurrency}"
            )));
        }

        let batch_size =
            BatchSize::new(batch_size).map_err(|error| AppError::Configuration(error.to_string()))?;

        Ok(Self {
            max_concurrency,
            batch_size,
            endpoint_url,
            region,
        })
    }
}

fn optional(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn parse_usize(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: usize,
) -> AppResult<usize> {
    match optional(lookup, name) {
        Some(value) => value.parse::<usize>().map_err(|error| {
            AppError::Configuration(format!("invalid {name} value '{value}': {error}"))
        }),
        None => Ok(default),
    }
}
