//! SectorPulse CLI — collection, scoring, report delivery and drill-downs.
//!
//! Commands:
//! - `collect` — fetch, screen and aggregate one or more markets for a date
//! - `report` — score the date, render the daily report and deliver it
//! - `trending` / `abnormal` — print one section of the daily report
//! - `sector` / `country` — print a single-sector or single-country view
//! - `init-config` — write the default configuration as TOML
//!
//! Logs go to stderr (`RUST_LOG`, default `sectorpulse=info`); report text
//! goes to stdout.

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use sectorpulse_core::domain::{Market, MarketSelection, Sector};
use sectorpulse_runner::reporting::resolve_date;
use sectorpulse_runner::{
    collect_markets, deliver, render_abnormal_report, render_country_detail, render_daily_report,
    render_sector_detail, render_trending, run_scoring, AppConfig, ConfiguredSources, Notifier,
    RunReport, StdoutNotifier, Store, TargetResult, TelegramNotifier,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "sectorpulse",
    about = "SectorPulse — cross-country sector momentum tracker"
)]
struct Cli {
    /// Path to a TOML config file. Defaults are used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect one or more markets into the store.
    Collect {
        /// Market code, comma list (e.g. US,KR,BENCHMARK) or ALL.
        #[arg(long, default_value = "ALL")]
        market: String,

        /// Trading date (YYYY-MM-DD). Defaults to today (UTC).
        #[arg(long)]
        date: Option<String>,
    },
    /// Score the date, render the daily report and deliver it.
    Report {
        /// Report date (YYYY-MM-DD). Defaults to the latest collected date.
        #[arg(long)]
        date: Option<String>,

        /// Render from the trend scores already stored.
        #[arg(long, default_value_t = false)]
        skip_scoring: bool,

        /// Print to stdout even when Telegram is configured.
        #[arg(long, default_value_t = false)]
        stdout: bool,
    },
    /// Show the trend summary: top sectors and weak sectors.
    Trending {
        #[arg(long)]
        date: Option<String>,
    },
    /// Show abnormal movers. Defaults to the latest date that has any.
    Abnormal {
        #[arg(long)]
        date: Option<String>,
    },
    /// Show one sector across every collected country.
    Sector {
        /// Sector name, e.g. "Information Technology" or energy.
        name: String,

        #[arg(long)]
        date: Option<String>,
    },
    /// Show every sector of one country.
    Country {
        /// Market code: US, KR, CN, JP, VN, IN, DE.
        code: String,

        #[arg(long)]
        date: Option<String>,
    },
    /// Write the default configuration as TOML.
    InitConfig {
        /// Output file. Prints to stdout when omitted.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Overwrite an existing file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::InitConfig { output, force } => run_init_config(output.as_deref(), force),
        Commands::Collect { market, date } => {
            let config = load_config(cli.config.as_deref())?;
            run_collect(&config, &market, date.as_deref())
        }
        Commands::Report {
            date,
            skip_scoring,
            stdout,
        } => {
            let config = load_config(cli.config.as_deref())?;
            run_report(&config, date.as_deref(), skip_scoring, stdout)
        }
        Commands::Trending { date } => {
            let config = load_config(cli.config.as_deref())?;
            let store = open_store(&config)?;
            println!("{}", render_trending(&store, parse_date(date.as_deref())?)?);
            Ok(())
        }
        Commands::Abnormal { date } => {
            let config = load_config(cli.config.as_deref())?;
            let store = open_store(&config)?;
            println!("{}", render_abnormal_report(&store, parse_date(date.as_deref())?)?);
            Ok(())
        }
        Commands::Sector { name, date } => {
            let config = load_config(cli.config.as_deref())?;
            let sector: Sector = name.parse()?;
            let store = open_store(&config)?;
            let text = render_sector_detail(&store, sector, parse_date(date.as_deref())?)?;
            println!("{text}");
            Ok(())
        }
        Commands::Country { code, date } => {
            let config = load_config(cli.config.as_deref())?;
            let market: Market = code.parse()?;
            let store = open_store(&config)?;
            let text = render_country_detail(&store, market, parse_date(date.as_deref())?)?;
            println!("{text}");
            Ok(())
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sectorpulse=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = AppConfig::load(path).with_context(|| match path {
        Some(p) => format!("loading config from {}", p.display()),
        None => "loading default config".to_string(),
    })?;
    Ok(config)
}

fn open_store(config: &AppConfig) -> Result<Store> {
    Store::open(&config.database.path)
        .with_context(|| format!("opening store at {}", config.database.path.display()))
}

fn parse_date(date: Option<&str>) -> Result<Option<NaiveDate>> {
    date.map(|s| {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("invalid date '{s}', expected YYYY-MM-DD"))
    })
    .transpose()
}

fn run_collect(config: &AppConfig, market: &str, date: Option<&str>) -> Result<()> {
    let selection = MarketSelection::parse(market);
    if selection.targets.is_empty() {
        bail!("no known market in '{market}'. Valid: ALL, BENCHMARK, US, KR, CN, JP, VN, IN, DE");
    }
    let date = parse_date(date)?.unwrap_or_else(|| Utc::now().date_naive());

    let store = open_store(config)?;
    let sources = ConfiguredSources::new(config).context("building data sources")?;

    let report = collect_markets(&selection, date, config, &sources, &store)?;
    print_collect_summary(&report);
    Ok(())
}

fn print_collect_summary(report: &RunReport) {
    println!();
    println!("{:<10} {:<10} {:>7} {:>9} {:>9} {:>8}", "Target", "Status", "Total", "Filtered", "Abnormal", "Sectors");
    println!("{}", "-".repeat(58));
    for (target, result) in &report.results {
        match result {
            TargetResult::Collected(s) => println!(
                "{:<10} {:<10} {:>7} {:>9} {:>9} {:>8}",
                target.to_string(),
                "ok",
                s.filter.total,
                s.filter.filtered,
                s.filter.abnormal,
                s.sectors
            ),
            TargetResult::Empty => println!("{:<10} {:<10}", target.to_string(), "no data"),
            TargetResult::Benchmarks(b) => {
                println!("{:<10} {:<10} {:>7}", target.to_string(), "ok", b.collected);
                if !b.failed.is_empty() {
                    println!("           skipped: {}", b.failed.join(", "));
                }
            }
            TargetResult::Failed(msg) => println!("{:<10} {:<10} {msg}", target.to_string(), "failed"),
        }
    }
    for code in &report.unknown {
        println!("{code:<10} {:<10}", "unknown");
    }
    println!();
}

fn run_report(config: &AppConfig, date: Option<&str>, skip_scoring: bool, stdout: bool) -> Result<()> {
    let store = open_store(config)?;
    let date = resolve_date(&store, parse_date(date)?)?;

    if skip_scoring {
        info!(%date, "scoring skipped");
    } else {
        let scores = run_scoring(date, &config.trend, &store).context("trend scoring")?;
        info!(%date, sectors = scores.len(), "scoring pass done");
    }

    let blocks = render_daily_report(&store, Some(date))?;

    let telegram = match (stdout, config.telegram()) {
        (false, Some(t)) => Some(TelegramNotifier::new(t)?),
        (false, None) => {
            warn!("telegram not configured, printing report");
            None
        }
        (true, _) => None,
    };
    let notifier: &dyn Notifier = match &telegram {
        Some(t) => t,
        None => &StdoutNotifier,
    };

    let sent = deliver(notifier, &blocks).context("delivering report")?;
    info!(%date, blocks = sent, "report delivered");
    Ok(())
}

fn run_init_config(output: Option<&Path>, force: bool) -> Result<()> {
    let toml = AppConfig::default().to_toml()?;
    match output {
        None => {
            print!("{toml}");
            Ok(())
        }
        Some(path) => {
            if path.exists() && !force {
                bail!("{} already exists (pass --force to overwrite)", path.display());
            }
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            std::fs::write(path, toml).with_context(|| format!("writing {}", path.display()))?;
            println!("Config written to: {}", path.display());
            Ok(())
        }
    }
}
