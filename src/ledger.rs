//! Append-only CSV ledger of the daily top entries, one row per `(date, category)`.
//!
//! ```text
//! date,section,rank1_name,rank1_value,...,rank5_name,rank5_value
//! "2025-01-02","code","A","90","B","85","","","","","",""
//! ```

use std::collections::HashMap;
use std::path::Path;

use chrono::NaiveDate;
use csv::{QuoteStyle, ReaderBuilder, StringRecord, Terminator, WriterBuilder};
use tracing::{debug, info};

use crate::snapshot::{Category, Entry, Snapshot};
use crate::{store, Result, MAX_ENTRIES};

/// Ledger header line, without the line break.
pub fn header() -> String {
    let mut columns = vec!["date".to_string(), "section".to_string()];
    for rank in 1..=MAX_ENTRIES {
        columns.push(format!("rank{rank}_name"));
        columns.push(format!("rank{rank}_value"));
    }
    columns.join(",")
}

/// One ledger line: a category's ranked entries on one day.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRow {
    pub date: NaiveDate,
    pub category: Category,
    /// `(name, value)` per rank; ranks without an entry are empty strings.
    pub ranks: Vec<(String, String)>,
}

impl HistoryRow {
    pub fn new(date: NaiveDate, category: Category, entries: &[Entry]) -> Self {
        let ranks = (0..MAX_ENTRIES)
            .map(|i| match entries.get(i) {
                Some(entry) => (entry.name.clone(), entry.display_value()),
                None => (String::new(), String::new()),
            })
            .collect();
        Self {
            date,
            category,
            ranks,
        }
    }

    pub fn fields(&self) -> Vec<String> {
        let mut fields = vec![self.date.to_string(), self.category.key().to_string()];
        for (name, value) in &self.ranks {
            fields.push(name.clone());
            fields.push(value.clone());
        }
        fields
    }
}

/// Encodes rows as CSV lines with every field quoted.
pub fn encode_rows(rows: &[HistoryRow]) -> Result<String> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    for row in rows {
        writer.write_record(row.fields())?;
    }
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Data records of a ledger document, header excluded.
pub fn read_records(text: &str) -> Result<Vec<StringRecord>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());
    let mut records = Vec::new();
    for record in reader.records() {
        records.push(record?);
    }
    Ok(records)
}

/// The most recent recorded date of every section.
fn latest_dates(text: &str) -> Result<HashMap<String, NaiveDate>> {
    let mut latest: HashMap<String, NaiveDate> = HashMap::new();
    for record in read_records(text)? {
        let (Some(date), Some(section)) = (record.get(0), record.get(1)) else {
            continue;
        };
        let Ok(date) = date.parse::<NaiveDate>() else {
            debug!(date, section, "unparsable ledger date, ignoring row");
            continue;
        };
        let slot = latest.entry(section.to_string()).or_insert(date);
        *slot = (*slot).max(date);
    }
    Ok(latest)
}

/// Appends rows for `date` to `existing` ledger text.
///
/// Categories without entries are left out, and so is every category whose last
/// row is dated `date` or later. Existing text is kept as is. Returns the new text
/// and the number of rows appended.
pub fn append_snapshot(
    existing: Option<&str>,
    snapshot: &Snapshot,
    date: NaiveDate,
) -> Result<(String, usize)> {
    let mut text = match existing {
        Some(text) if !text.trim().is_empty() => text.to_string(),
        _ => format!("{}\n", header()),
    };
    if !text.ends_with('\n') {
        text.push('\n');
    }

    let latest = latest_dates(&text)?;
    let rows: Vec<HistoryRow> = Category::ALL
        .into_iter()
        .filter(|&category| !snapshot.entries(category).is_empty())
        .filter(|&category| match latest.get(category.key()) {
            Some(last) if *last >= date => {
                debug!(%category, %date, %last, "ledger already covers this day");
                false
            }
            _ => true,
        })
        .map(|category| HistoryRow::new(date, category, snapshot.entries(category)))
        .collect();

    text.push_str(&encode_rows(&rows)?);
    Ok((text, rows.len()))
}

/// Merges a snapshot into the ledger file, rewriting it as a whole.
pub fn update_ledger(path: &Path, snapshot: &Snapshot, date: NaiveDate) -> Result<usize> {
    let existing = store::read_optional(path)?;
    let (text, appended) = append_snapshot(existing.as_deref(), snapshot, date)?;
    if appended > 0 || existing.is_none() {
        store::write_atomic(path, text.as_bytes())?;
    }
    info!(path = %path.display(), appended, "ledger updated");
    Ok(appended)
}
