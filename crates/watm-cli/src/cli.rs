use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use watm_core::{parse_filters, Filters, TimeWindow};
use watm_ts::SensitivityMetric;

use crate::common::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "watm", author, version, about = "Query WATM scenario simulation outputs", long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info", global = true)]
    pub log_level: tracing::Level,

    /// Config file (defaults to ~/.watm/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Dataset directory, overriding the config file
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// General cache tier size, overriding the config file
    #[arg(long, global = true)]
    pub cache_size: Option<usize>,

    /// Skip filling the default cache tier at startup
    #[arg(long, global = true)]
    pub no_prewarm: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table, global = true)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List available variables
    Variables,
    /// List each parameter's distinct values
    Params,
    /// Print the scenario ids matching a filter
    Resolve {
        /// JSON object of parameter filters, e.g. '{"P1": 1, "P2": ["A", "B"]}'
        #[arg(long)]
        filters: String,
    },
    /// Summarize the parameter space
    Summary {
        #[arg(long)]
        filters: Option<String>,
    },
    /// Long-form series rows for one or more variables
    Series {
        #[arg(required = true)]
        variables: Vec<String>,
        #[command(flatten)]
        query: QueryArgs,
        /// Omit parameter columns
        #[arg(long)]
        no_params: bool,
        /// Write rows to a .csv or .parquet file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Per-step ensemble statistics across the selected scenarios
    Aggregate {
        #[arg(required = true)]
        variables: Vec<String>,
        #[command(flatten)]
        query: QueryArgs,
    },
    /// Wide table indexed by time
    Pivot {
        variable: String,
        #[command(flatten)]
        query: QueryArgs,
        /// Parameter whose levels become columns (default: one column per scenario)
        #[arg(long)]
        by: Option<String>,
    },
    /// Trajectory statistics for one scenario
    Stats {
        variable: String,
        #[arg(long)]
        scenario: String,
        #[arg(long, allow_negative_numbers = true)]
        start: Option<f64>,
        #[arg(long, allow_negative_numbers = true)]
        end: Option<f64>,
    },
    /// Rank variables by their response to one parameter
    Sensitivity {
        /// Parameter to vary
        #[arg(long)]
        vary: String,
        /// JSON filters on the other parameters
        #[arg(long)]
        fixed: Option<String>,
        /// Comma-separated variables (default: all)
        #[arg(long, value_delimiter = ',')]
        variables: Option<Vec<String>>,
        #[arg(long, default_value = "cv")]
        metric: SensitivityMetric,
        /// Keep only the N most sensitive variables
        #[arg(long)]
        top: Option<usize>,
        #[arg(long, allow_negative_numbers = true)]
        start: Option<f64>,
        #[arg(long, allow_negative_numbers = true)]
        end: Option<f64>,
    },
    /// Time repeated queries to exercise the cache
    Warmup {
        #[arg(required = true)]
        variables: Vec<String>,
        #[arg(long, default_value_t = 3)]
        rounds: usize,
    },
}

/// Filter and time window flags shared by series-style commands.
#[derive(Args, Debug, Clone, Default)]
pub struct QueryArgs {
    /// JSON object of parameter filters
    #[arg(long)]
    pub filters: Option<String>,
    /// Inclusive lower time bound
    #[arg(long, allow_negative_numbers = true)]
    pub start: Option<f64>,
    /// Inclusive upper time bound
    #[arg(long, allow_negative_numbers = true)]
    pub end: Option<f64>,
}

impl QueryArgs {
    pub fn filters(&self) -> Result<Filters> {
        parse_filter_arg(self.filters.as_deref())
    }

    pub fn window(&self) -> Result<Option<TimeWindow>> {
        window(self.start, self.end)
    }
}

pub fn parse_filter_arg(raw: Option<&str>) -> Result<Filters> {
    match raw {
        Some(raw) => parse_filters(raw).with_context(|| format!("parsing filters '{raw}'")),
        None => Ok(Filters::new()),
    }
}

pub fn window(start: Option<f64>, end: Option<f64>) -> Result<Option<TimeWindow>> {
    Ok(TimeWindow::from_bounds(start, end)?)
}
