//! LEADERBOARD SCRAPER
//! Extracts the ranked sections and the main results table of a rendered
//! leaderboard page into a snapshot, then folds each day's snapshot into an
//! append-only CSV ledger and per-entity trend series.

mod error;
pub mod ledger;
mod macros;
pub mod numeric;
pub mod page;
pub mod process;
pub mod request;
pub mod rules;
pub mod section;
pub mod snapshot;
pub mod store;
pub mod table;
pub mod trends;

pub use error::{Error, Result};
pub use page::{HtmlPage, PageModel, Role};
pub use rules::Rules;
pub use snapshot::{Category, Counts, Entry, EntryKind, Snapshot, TableRow};

pub const DEFAULT_URL: &str = "https://llm-stats.com/";
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                              (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
/// Entries kept per category.
pub const MAX_ENTRIES: usize = 5;
pub const MAX_TABLE_ROWS: usize = 30;
pub const SNAPSHOT_FILE: &str = "top-leaderboards.json";
pub const COUNTS_FILE: &str = "counts.json";
pub const HISTORY_DIR: &str = "history";
pub const LEDGER_FILE: &str = "history.csv";
pub const TRENDS_FILE: &str = "trends.json";
