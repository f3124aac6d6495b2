use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::{Local, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

use leaderscrap::process::{record_history, save_snapshot, scrape, Paths};
use leaderscrap::request::PageSource;
use leaderscrap::{info_time, Result, Rules, DEFAULT_URL, HISTORY_DIR, MAX_TABLE_ROWS};

#[derive(Parser, Debug)]
#[command(name = "leaderscrap", version, about = "Scrape leaderboard rankings and keep a daily history")]
struct Cli {
    /// Directory holding the snapshot and counts documents
    #[arg(long, global = true, default_value = ".")]
    out_dir: PathBuf,

    /// Directory holding the ledger and trend series (default: <out-dir>/history)
    #[arg(long, global = true)]
    history_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract a snapshot from the leaderboard page
    Scrape(ScrapeArgs),
    /// Append the persisted snapshot to the ledger and trend series
    History(HistoryArgs),
    /// Scrape, then append to history
    Run {
        #[command(flatten)]
        scrape: ScrapeArgs,
        #[command(flatten)]
        history: HistoryArgs,
    },
}

#[derive(Args, Debug)]
struct ScrapeArgs {
    /// Page to fetch; also the base for relative links
    #[arg(long, env = "LEADERBOARD_URL", default_value = DEFAULT_URL)]
    url: String,

    /// Pre-rendered HTML file to read instead of fetching `--url`
    #[arg(long)]
    html: Option<PathBuf>,

    /// Extraction rules (JSON) replacing the built-in ones
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Maximum number of table rows to keep
    #[arg(long, default_value_t = MAX_TABLE_ROWS)]
    max_rows: usize,
}

#[derive(Args, Debug)]
struct HistoryArgs {
    /// Day to record, YYYY-MM-DD (default: today, UTC)
    #[arg(long)]
    date: Option<NaiveDate>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let start_time = Local::now();
    match run(cli).await {
        Ok(()) => {
            info_time!(start_time, "Full program time:");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let paths = Paths {
        history_dir: cli
            .history_dir
            .clone()
            .unwrap_or_else(|| cli.out_dir.join(HISTORY_DIR)),
        out_dir: cli.out_dir,
    };

    match cli.command {
        Command::Scrape(args) => scrape_stage(&args, &paths).await,
        Command::History(args) => history_stage(&args, &paths).await,
        Command::Run { scrape, history } => {
            scrape_stage(&scrape, &paths).await?;
            history_stage(&history, &paths).await
        }
    }
}

async fn scrape_stage(args: &ScrapeArgs, paths: &Paths) -> Result<()> {
    let rules = match &args.rules {
        Some(path) => Rules::from_path(path)?,
        None => Rules::builtin()?,
    };
    let source = match &args.html {
        Some(path) => PageSource::File {
            path: path.clone(),
            base: Some(args.url.clone()),
        },
        None => PageSource::Url(args.url.clone()),
    };

    let snapshot = scrape(&source, Arc::new(rules), args.max_rows).await?;
    let counts = save_snapshot(snapshot, paths).await?;
    println!("COUNTS: {}", serde_json::to_string(&counts)?);
    Ok(())
}

async fn history_stage(args: &HistoryArgs, paths: &Paths) -> Result<()> {
    let date = args.date.unwrap_or_else(|| Utc::now().date_naive());
    record_history(paths, date).await?;
    println!("OK: history updated for {date}");
    Ok(())
}
