use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use chrono::Datelike;
use clap::{Parser, Subcommand, ValueEnum};
use kickstat::league::LeagueTable;
use kickstat::runner::{BatchRunner, RunnerConfig};
use kickstat::scraper::{Fetch, ScraperConfig, WebScraper};
use kickstat::store::Store;
use kickstat::types::{RecordKind, Tier, WorkItem};
use log::LevelFilter;

const FIRST_SEASON: i32 = 2005;

#[derive(Parser)]
#[command(name = "kickstat")]
#[command(about = "A transfermarkt league standings and market value scraper", long_about = None)]
struct Cli {
    #[arg(
        short = 'l',
        long = "log-level",
        value_enum,
        default_value = "info",
        global = true,
        help = "Set the logging level"
    )]
    log_level: LogLevel,

    #[arg(
        long,
        value_name = "CSV",
        default_value = "league_info.csv",
        global = true,
        help = "League table with the columns Country, Code, Tier 1, Tier 2"
    )]
    leagues: PathBuf,

    #[arg(
        long,
        value_name = "SECONDS",
        default_value_t = 30,
        global = true,
        help = "Timeout of a single request"
    )]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a single league season and print its table
    Fetch {
        #[arg(value_parser = parse_kind, help = "standings or market-values")]
        kind: RecordKind,

        #[arg(help = "Country as listed in the league table")]
        country: String,

        #[arg(value_parser = season_year(), help = "Year in which the season ends")]
        year: i32,

        #[arg(value_parser = parse_tier, help = "League tier (1 or 2)")]
        tier: Tier,

        #[arg(
            short = 'o',
            long = "output",
            value_enum,
            default_value = "text",
            help = "Output format"
        )]
        format: OutputFormat,
    },
    /// Fetch every country, season and tier combination, retrying failures, and write one CSV per season
    Batch {
        #[arg(value_parser = parse_kind, help = "standings or market-values")]
        kind: RecordKind,

        #[arg(
            long = "country",
            help = "Restrict to these countries (repeatable, defaults to all)"
        )]
        countries: Vec<String>,

        #[arg(
            long,
            value_parser = season_year(),
            help = "First season-end year [default: 2005]"
        )]
        from: Option<i32>,

        #[arg(
            long,
            value_parser = season_year(),
            help = "Last season-end year [default: 2023 for standings, 2024 for market values]"
        )]
        to: Option<i32>,

        #[arg(
            long = "tier",
            value_parser = parse_tier,
            help = "Restrict to these tiers (repeatable, defaults to 1 and 2)"
        )]
        tiers: Vec<Tier>,

        #[arg(
            long,
            default_value_t = 20,
            help = "Attempts per season before giving up"
        )]
        max_attempts: u32,

        #[arg(
            long,
            value_name = "MS",
            default_value_t = 2000,
            help = "Pause between retry rounds"
        )]
        retry_delay_ms: u64,

        #[arg(
            long,
            default_value = ".",
            help = "Directory the standings/ and market_values/ folders are written to"
        )]
        out: PathBuf,

        #[arg(
            short = 'o',
            long = "output",
            value_enum,
            default_value = "text",
            help = "Output format of the summary"
        )]
        format: OutputFormat,
    },
    /// List the leagues of the league table
    Leagues,
}

fn season_year() -> clap::builder::RangedI64ValueParser<i32> {
    clap::value_parser!(i32).range(1900..)
}

fn parse_kind(s: &str) -> Result<RecordKind, String> {
    s.parse().map_err(|e: kickstat::types::RecordKindParseError| e.to_string())
}

fn parse_tier(s: &str) -> Result<Tier, String> {
    s.parse().map_err(|e: kickstat::types::TierParseError| e.to_string())
}

fn serialize_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            log::error!("Error serializing to JSON: {}", e);
            process::exit(1);
        }
    }
}

fn default_last_season(kind: RecordKind) -> i32 {
    match kind {
        RecordKind::Standings => 2023,
        RecordKind::MarketValues => 2024,
    }
}

fn season_range(kind: RecordKind, from: Option<i32>, to: Option<i32>) -> Result<Vec<i32>, String> {
    let from = from.unwrap_or(FIRST_SEASON);
    let to = to.unwrap_or_else(|| default_last_season(kind));
    let latest = chrono::Local::now().year() + 1;

    if from > to {
        return Err(format!("First season ({from}) cannot be after last season ({to})"));
    }
    if to > latest {
        return Err(format!("Last season ({to}) cannot be after {latest}"));
    }
    Ok((from..=to).collect())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level.clone().into())
        .init();

    let leagues = LeagueTable::from_path(&cli.leagues).unwrap_or_else(|e| {
        log::error!("Error loading {}: {}", cli.leagues.display(), e);
        process::exit(1);
    });
    let leagues = Arc::new(leagues);

    let config = ScraperConfig {
        timeout: Duration::from_secs(cli.timeout),
        ..ScraperConfig::default()
    };
    let scraper = WebScraper::new(Arc::clone(&leagues), &config).unwrap_or_else(|e| {
        log::error!("Error creating scraper: {}", e);
        process::exit(1);
    });

    match cli.command {
        Commands::Fetch {
            kind,
            country,
            year,
            tier,
            format,
        } => {
            let item = WorkItem::new(country, year, tier);
            let records = scraper.fetch(kind, &item).await.unwrap_or_else(|e| {
                log::error!("Error fetching {}: {}", item, e);
                process::exit(1);
            });

            match format {
                OutputFormat::Json => serialize_json(&records),
                OutputFormat::Text => {
                    println!("{} of {}:", kind, item);
                    print!("{}", records);
                }
            }
        }

        Commands::Batch {
            kind,
            countries,
            from,
            to,
            tiers,
            max_attempts,
            retry_delay_ms,
            out,
            format,
        } => {
            let years = season_range(kind, from, to).unwrap_or_else(|e| {
                log::error!("Invalid args: {e}");
                process::exit(1);
            });

            let countries: Vec<String> = if countries.is_empty() {
                leagues.countries().map(str::to_string).collect()
            } else {
                countries
            };
            if let Some(unknown) = countries.iter().find(|c| leagues.get(c).is_err()) {
                log::error!("Invalid args: unknown country '{unknown}'");
                process::exit(1);
            }

            let tiers = if tiers.is_empty() {
                Tier::ALL.to_vec()
            } else {
                tiers
            };

            let runner = BatchRunner::new(
                scraper,
                Arc::clone(&leagues),
                Store::new(out),
                RunnerConfig {
                    max_attempts,
                    retry_delay: Duration::from_millis(retry_delay_ms),
                },
            );

            log::info!(
                "Writing {} to {}",
                kind.dir_name(),
                runner.store().root().display()
            );

            let report = runner.run_batch(kind, &countries, &years, &tiers).await;

            match format {
                OutputFormat::Json => serialize_json(&report),
                OutputFormat::Text => {
                    print!("{}", report);
                    if report.is_complete() {
                        println!("Success -- downloaded all!");
                    }
                }
            }

            if !report.is_complete() {
                process::exit(1);
            }
        }

        Commands::Leagues => {
            if leagues.is_empty() {
                println!("No leagues to display.");
            }
            for (i, league) in leagues.iter().enumerate() {
                println!("{:>3}. {}", i + 1, league);
            }
        }
    }
}
