//! wrdskit CLI: build S&P 500 constituent datasets from exported Compustat tables.
//!
//! Commands:
//! - `sp500`: resolve constituents for an observation window, optionally
//!   enriched with identifiers and industry classifiers
//! - `industries`: same, then keep only companies in the given industries
//! - `tables`: list the library tables available under the data directory

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use wrdskit_core::data::{FileTableSource, TableSource};
use wrdskit_core::{
    ClassificationSystem, CompustatSession, DuplicatePolicy, ObservationWindow, WrdsConfig,
};

#[derive(Parser)]
#[command(
    name = "wrdskit",
    about = "wrdskit CLI: S&P 500 constituents and company data from Compustat tables"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by the dataset-building commands.
#[derive(clap::Args)]
struct BuildArgs {
    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding `{library}/{table}.parquet|csv`. Overrides the config.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// First day of the observation period (YYYY-MM-DD).
    #[arg(long)]
    start: Option<String>,

    /// End of the observation period, exclusive (YYYY-MM-DD). Companies
    /// joining on this day are not included.
    #[arg(long)]
    end: Option<String>,

    /// Keep the membership date columns instead of only `gvkey`.
    #[arg(long, default_value_t = false)]
    keep_columns: bool,

    /// Fail when a company has several membership spells with different dates.
    #[arg(long, default_value_t = false)]
    strict_duplicates: bool,

    /// Columns to add, comma separated.
    #[arg(long, value_enum, value_delimiter = ',')]
    with: Vec<Enrichment>,

    /// Write the dataset as CSV instead of printing its head.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Rows to print when no output file is given.
    #[arg(long, default_value_t = 10)]
    rows: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Enrichment {
    Names,
    Ticker,
    Cusip,
    Cik,
    ExitYear,
    IpoDate,
    Industries,
    Gics,
    Sp,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the S&P 500 constituent list for an observation period.
    Sp500 {
        #[command(flatten)]
        build: BuildArgs,
    },
    /// Build the constituent list and keep only the given industries.
    Industries {
        #[command(flatten)]
        build: BuildArgs,

        /// Classification system: SIC, NAICS, GICS_group, GICS_industry,
        /// GICS_sector, GICS_subindustry, SP_industry, SP_sector.
        #[arg(long)]
        system: ClassificationSystem,

        /// Industry codes to keep.
        #[arg(long = "code", required = true)]
        codes: Vec<String>,
    },
    /// List tables available under the data directory.
    Tables {
        /// Data directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Sp500 { build } => run_build(build, None),
        Commands::Industries {
            build,
            system,
            codes,
        } => run_build(build, Some((system, codes))),
        Commands::Tables { data_dir } => run_tables(&data_dir),
    }
}

fn parse_date(value: Option<&str>) -> Result<Option<NaiveDate>> {
    value
        .map(|s| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .with_context(|| format!("invalid date '{s}', expected YYYY-MM-DD"))
        })
        .transpose()
}

/// Merge the config file (if any) with command-line overrides.
fn resolve_config(args: &BuildArgs) -> Result<WrdsConfig> {
    let mut config = match &args.config {
        Some(path) => WrdsConfig::from_file(path)?,
        None => WrdsConfig::default(),
    };

    if let Some(dir) = &args.data_dir {
        config.source.root = dir.clone();
    }
    if let Some(start) = parse_date(args.start.as_deref())? {
        config.window.start = Some(start);
    }
    if let Some(end) = parse_date(args.end.as_deref())? {
        config.window.end = Some(end);
    }
    if let (Some(start), Some(end)) = (config.window.start, config.window.end) {
        if start > end {
            bail!("--start {start} is after --end {end}");
        }
    }
    if args.keep_columns {
        config.sp500.drop_uninformative = false;
    }
    if args.strict_duplicates {
        config.sp500.duplicate_policy = DuplicatePolicy::RejectDivergent;
    }
    Ok(config)
}

fn run_build(args: BuildArgs, filter: Option<(ClassificationSystem, Vec<String>)>) -> Result<()> {
    let config = resolve_config(&args)?;
    tracing::info!(
        root = %config.source.root.display(),
        window = %config.window,
        "building S&P 500 constituents"
    );

    let source = FileTableSource::new(&config.source.root);
    let mut session = CompustatSession::new(source, config.window);
    session.build_sp500(&config.sp500)?;

    apply_enrichments(&mut session, &args.with)?;

    if let Some((system, codes)) = filter {
        session.filter_by_industry(codes.as_slice(), system)?;
    }

    let mut dataset = session.into_dataset()?;
    match &args.output {
        Some(path) => {
            write_csv(&mut dataset, path)?;
            println!("Wrote {} rows to {}", dataset.height(), path.display());
        }
        None => print_summary(&dataset, &config.window, args.rows),
    }

    Ok(())
}

fn apply_enrichments(session: &mut CompustatSession, with: &[Enrichment]) -> Result<()> {
    let gics = with.contains(&Enrichment::Gics);
    let sp = with.contains(&Enrichment::Sp);

    for enrichment in with {
        match enrichment {
            Enrichment::Names => session.add_names()?,
            Enrichment::Ticker => session.add_ticker()?,
            Enrichment::Cusip => session.add_cusip()?,
            Enrichment::Cik => session.add_cik()?,
            Enrichment::ExitYear => session.add_exit_year()?,
            Enrichment::IpoDate => session.add_ipo_date()?,
            Enrichment::Industries | Enrichment::Gics | Enrichment::Sp => {
                session.add_industry_classifiers(gics, sp)?
            }
        }
    }
    Ok(())
}

fn write_csv(dataset: &mut DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("create output file {}", path.display()))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(dataset)?;
    Ok(())
}

fn run_tables(data_dir: &Path) -> Result<()> {
    if !data_dir.exists() {
        println!("Data directory does not exist: {}", data_dir.display());
        return Ok(());
    }

    let tables = FileTableSource::new(data_dir).list_tables()?;
    if tables.is_empty() {
        println!("No tables found under {}", data_dir.display());
        return Ok(());
    }

    println!("Data directory: {}", data_dir.display());
    println!("Tables: {}", tables.len());
    println!();
    for table in &tables {
        println!("  {table}");
    }
    Ok(())
}

fn print_summary(dataset: &DataFrame, window: &ObservationWindow, rows: usize) {
    println!();
    println!("=== S&P 500 Constituents ===");
    println!("Window:     {window}");
    println!("Companies:  {}", dataset.height());
    println!("Columns:    {}", dataset.width());
    println!();
    println!("{}", dataset.head(Some(rows)));
}
