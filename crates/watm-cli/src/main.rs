use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::FmtSubscriber;
use watm_cli::cli::{Cli, Commands};
use watm_cli::commands::{self, catalog, sensitivity, series, warmup};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = commands::load_config(&cli)?;
    let engine = commands::open_engine(&config)?;
    let format = cli.format;

    match &cli.command {
        Commands::Variables => catalog::variables(&engine, format),
        Commands::Params => catalog::params(&engine, format),
        Commands::Resolve { filters } => catalog::resolve(&engine, filters, format),
        Commands::Summary { filters } => catalog::summary(&engine, filters.as_deref(), format),
        Commands::Series {
            variables,
            query,
            no_params,
            out,
        } => series::series(&engine, variables, query, *no_params, out.as_deref(), format),
        Commands::Aggregate { variables, query } => {
            series::aggregate(&engine, variables, query, format)
        }
        Commands::Pivot {
            variable,
            query,
            by,
        } => series::pivot(&engine, variable, query, by.as_deref(), format),
        Commands::Stats {
            variable,
            scenario,
            start,
            end,
        } => series::stats(&engine, variable, scenario, *start, *end, format),
        Commands::Sensitivity {
            vary,
            fixed,
            variables,
            metric,
            top,
            start,
            end,
        } => sensitivity::handle(
            &engine,
            sensitivity::SensitivityArgs {
                vary,
                fixed: fixed.as_deref(),
                variables: variables.as_deref(),
                metric: *metric,
                top: *top,
                start: *start,
                end: *end,
            },
            format,
        ),
        Commands::Warmup { variables, rounds } => {
            info!(rounds, variables = variables.len(), "running warmup");
            warmup::handle(&engine, variables, *rounds, format)
        }
    }
}
