//! pkt-index: FidoNet packet indexer, store inspector and area reporter.

mod commands;
mod render;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use pkt_index_core::report::{Period, RangePreset};
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "pkt-index")]
#[command(version, about = "Index FidoNet .pkt files into SQLite and report on them", long_about = None)]
struct Cli {
    /// SQLite store file
    #[arg(short, long, global = true, env = "PKT_INDEX_DB", default_value = "pkt_index.db")]
    db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON (check and report)
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode packets from a folder and store their messages
    Import {
        /// Folder holding *.pkt files
        #[arg(short, long, default_value = ".")]
        folder: PathBuf,

        /// Decode and list messages without touching the store or the files
        #[arg(long)]
        test: bool,

        /// Delete each packet once all of its messages were newly stored
        #[arg(long, conflicts_with = "test")]
        delete: bool,

        /// Scan the folder recursively
        #[arg(short, long)]
        recursive: bool,
    },

    /// Describe a store without modifying it
    Check {
        /// Number of sample rows to show
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },

    /// Per-area message counts, or top posters and subjects for one area
    Report(ReportArgs),
}

#[derive(clap::Args)]
struct ReportArgs {
    /// Start date/time (e.g. 2025-12-12)
    #[arg(long)]
    from: Option<String>,

    /// End date/time (e.g. 2025-12-17); a bare date covers the whole day
    #[arg(long)]
    to: Option<String>,

    /// Preset range relative to the newest stored date
    #[arg(long, value_enum, ignore_case = true, conflicts_with_all = ["from", "to", "days"])]
    date: Option<DatePreset>,

    /// Last N days ending at the newest stored date
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    days: Option<u32>,

    /// Column buckets
    #[arg(long, value_enum, default_value = "auto")]
    period: PeriodArg,

    /// File of areas always listed, even with no traffic
    #[arg(long)]
    known_areas: Option<PathBuf>,

    /// File of the only areas to report
    #[arg(long)]
    only_areas: Option<PathBuf>,

    /// File of areas to leave out
    #[arg(long)]
    exclude_areas: Option<PathBuf>,

    /// Show top posters and subjects for a single area instead of the summary
    #[arg(long, value_name = "AREA")]
    top: Option<String>,

    /// Width of the area column
    #[arg(long, default_value = "34")]
    area_width: usize,
}

#[derive(Clone, Copy, ValueEnum)]
enum DatePreset {
    /// Last 7 days
    Week,
    /// Previous calendar month
    Month,
    /// Current month so far
    Cmonth,
}

#[derive(Clone, Copy, ValueEnum)]
enum PeriodArg {
    Auto,
    Month,
    Day,
}

fn main() {
    if let Err(e) = run() {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Import {
            folder,
            test,
            delete,
            recursive,
        } => {
            let options = commands::ImportArgs {
                folder,
                db: cli.db,
                test,
                delete,
                recursive,
            };
            commands::cmd_import(&options)
        }
        Commands::Check { limit } => commands::cmd_check(&cli.db, limit, cli.json),
        Commands::Report(args) => {
            let options = commands::ReportOptions {
                from: args.from,
                to: args.to,
                preset: args.date.map(|d| match d {
                    DatePreset::Week => RangePreset::Week,
                    DatePreset::Month => RangePreset::Month,
                    DatePreset::Cmonth => RangePreset::CurrentMonth,
                }),
                days: args.days,
                period: match args.period {
                    PeriodArg::Auto => Period::Auto,
                    PeriodArg::Month => Period::Month,
                    PeriodArg::Day => Period::Day,
                },
                known_areas: args.known_areas,
                only_areas: args.only_areas,
                exclude_areas: args.exclude_areas,
                top: args.top,
                area_width: args.area_width,
            };
            commands::cmd_report(&cli.db, &options, cli.json)
        }
    }
}
