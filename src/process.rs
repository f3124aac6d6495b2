use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Local, NaiveDate, Utc};
use tokio::task::{spawn_blocking, JoinSet};

use crate::ledger::update_ledger;
use crate::page::HtmlPage;
use crate::request::{load_page, PageSource};
use crate::rules::Rules;
use crate::section::{locate_section, parse_card};
use crate::snapshot::{Category, Counts, Entry, Snapshot, TableRow};
use crate::table::extract_table;
use crate::trends::update_trends;
use crate::{info_time, Result, COUNTS_FILE, LEDGER_FILE, SNAPSHOT_FILE, TRENDS_FILE};

/// Where a run reads and writes its documents.
#[derive(Debug, Clone)]
pub struct Paths {
    pub out_dir: PathBuf,
    pub history_dir: PathBuf,
}

impl Paths {
    pub fn snapshot(&self) -> PathBuf {
        self.out_dir.join(SNAPSHOT_FILE)
    }

    pub fn counts(&self) -> PathBuf {
        self.out_dir.join(COUNTS_FILE)
    }

    pub fn ledger(&self) -> PathBuf {
        self.history_dir.join(LEDGER_FILE)
    }

    pub fn trends(&self) -> PathBuf {
        self.history_dir.join(TRENDS_FILE)
    }
}

/// What one extraction task produced.
enum Extracted {
    Category(Category, Vec<Entry>),
    Table(Vec<TableRow>),
}

/// Loads the page and extracts a [`Snapshot`] from it.
pub async fn scrape(source: &PageSource, rules: Arc<Rules>, max_rows: usize) -> Result<Snapshot> {
    let start_time = Local::now();
    let html = Arc::new(load_page(source).await?);
    let base = source.base_url().map(str::to_string);

    let mut snapshot = extract_snapshot(html, base.clone(), rules, max_rows).await?;
    snapshot.source = base;
    snapshot.last_updated = Some(Utc::now());
    info_time!(start_time, "Extracted snapshot: {:?}", snapshot.counts());
    Ok(snapshot)
}

/// Extracts every category and the table concurrently, then assembles the snapshot.
///
/// The parsed document can't cross threads, so every task parses its own copy
/// of the page.
pub async fn extract_snapshot(
    html: Arc<String>,
    base: Option<String>,
    rules: Arc<Rules>,
    max_rows: usize,
) -> Result<Snapshot> {
    let mut tasks = JoinSet::new();

    for category in Category::ALL {
        let (html, base, rules) = (html.clone(), base.clone(), rules.clone());
        tasks.spawn_blocking(move || {
            let page = HtmlPage::parse(&html, base.as_deref(), &rules);
            let card = locate_section(&page, &rules, category);
            Extracted::Category(category, parse_card(&page, card, category.kind()))
        });
    }
    tasks.spawn_blocking(move || {
        let page = HtmlPage::parse(&html, base.as_deref(), &rules);
        Extracted::Table(extract_table(&page, &rules, max_rows))
    });

    let mut snapshot = Snapshot::default();
    while let Some(task) = tasks.join_next().await {
        match task? {
            Extracted::Category(category, entries) => snapshot.set_entries(category, entries),
            Extracted::Table(rows) => snapshot.table = rows,
        }
    }
    Ok(snapshot)
}

/// Persists the snapshot document and its counts summary.
pub async fn save_snapshot(snapshot: Snapshot, paths: &Paths) -> Result<Counts> {
    let (snapshot_path, counts_path) = (paths.snapshot(), paths.counts());
    spawn_blocking(move || snapshot.save(&snapshot_path, &counts_path)).await?
}

/// Merges the persisted snapshot into the ledger and the series store.
pub async fn record_history(paths: &Paths, date: NaiveDate) -> Result<(usize, usize)> {
    let paths = paths.clone();
    spawn_blocking(move || append_history(&paths, date)).await?
}

/// Ledger first, then trends, so a failing trend write leaves a complete ledger behind.
pub fn append_history(paths: &Paths, date: NaiveDate) -> Result<(usize, usize)> {
    let start_time = Local::now();
    let snapshot = Snapshot::load(&paths.snapshot())?;
    let rows = update_ledger(&paths.ledger(), &snapshot, date)?;
    let points = update_trends(&paths.trends(), &snapshot, date)?;
    info_time!(start_time, "History updated for {date}: {rows} ledger rows, {points} trend points");
    Ok((rows, points))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <div class="p-6"><h3>Best LLM - Code</h3>
            <div class="justify-between"><div class="min-w-0 flex-1"><a>A</a></div><span class="tabular-nums">90</span></div>
          </div>
          <div class="p-6"><h3>Fastest API Provider</h3>
            <div class="justify-between"><div class="min-w-0 flex-1"><span>Groq</span></div><span class="tabular-nums">812 t/s</span></div>
          </div>
          <table>
            <thead><tr><th>Organization</th><th>Model</th></tr></thead>
            <tbody><tr><td><img src="/logos/meta.png"></td><td>Llama</td></tr></tbody>
          </table>
        </body></html>"#;

    #[tokio::test]
    async fn concurrent_extraction_matches_sequential() {
        let rules = Arc::new(Rules::builtin().unwrap());
        let base = Some("https://llm-stats.com/".to_string());

        let concurrent = extract_snapshot(Arc::new(PAGE.to_string()), base.clone(), rules.clone(), 30)
            .await
            .unwrap();
        let sequential = Snapshot::extract(&HtmlPage::parse(PAGE, base.as_deref(), &rules), &rules, 30);

        assert_eq!(concurrent, sequential);
        assert_eq!(concurrent.code, vec![Entry::scored("A", 90.0)]);
        assert_eq!(concurrent.fastest, vec![Entry::valued("Groq", "812 t/s")]);
        assert_eq!(concurrent.table[0].organization, "Meta");
        assert_eq!(concurrent.table[0].organization_logo, "https://llm-stats.com/logos/meta.png");
        assert!(concurrent.multimodal.is_empty());
    }
}
