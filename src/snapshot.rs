//! The structured result of one scrape: the main results table plus the six
//! ranked categories, and its JSON document form.

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::numeric::parse_number;
use crate::page::PageModel;
use crate::rules::Rules;
use crate::section::{locate_section, parse_card};
use crate::table::extract_table;
use crate::{store, Error, Result, MAX_ENTRIES};

/// One of the fixed leaderboard dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Code,
    Multimodal,
    Knowledge,
    LongestContext,
    Cheapest,
    Fastest,
}

/// Whether a category ranks by a numeric score or by a free-text value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Score,
    Text,
}

impl Category {
    /// All categories, in document order.
    pub const ALL: [Category; 6] = [
        Category::Code,
        Category::Multimodal,
        Category::Knowledge,
        Category::LongestContext,
        Category::Cheapest,
        Category::Fastest,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Category::Code => "code",
            Category::Multimodal => "multimodal",
            Category::Knowledge => "knowledge",
            Category::LongestContext => "longest_context",
            Category::Cheapest => "cheapest",
            Category::Fastest => "fastest",
        }
    }

    pub fn kind(self) -> EntryKind {
        match self {
            Category::Code | Category::Multimodal | Category::Knowledge => EntryKind::Score,
            Category::LongestContext | Category::Cheapest | Category::Fastest => EntryKind::Text,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A single ranked `(name, value)` pair. Exactly one of `score`/`value` is set,
/// depending on the category kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Entry {
    pub fn scored(name: impl Into<String>, score: f64) -> Self {
        Self {
            name: name.into(),
            score: Some(score),
            value: None,
        }
    }

    pub fn valued(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            score: None,
            value: Some(value.into()),
        }
    }

    /// The value as it is written to the ledger: the score if there is one, else the text.
    pub fn display_value(&self) -> String {
        match (&self.score, &self.value) {
            (Some(score), _) => score.to_string(),
            (None, Some(value)) => value.clone(),
            (None, None) => String::new(),
        }
    }

    /// The number plotted for this entry in the series store.
    pub fn numeric(&self, kind: EntryKind) -> Option<f64> {
        let number = match kind {
            EntryKind::Score => self.score,
            EntryKind::Text => parse_number(self.value.as_deref()),
        };
        number.filter(|n| n.is_finite())
    }
}

/// A row of the main results table. Every field is kept as presented on the page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRow {
    pub organization: String,
    pub organization_logo: String,
    pub model: String,
    pub license: String,
    pub parameters_b: String,
    pub context: String,
    pub input_per_m: String,
    pub output_per_m: String,
    pub gpqa: String,
    pub mmlu: String,
    pub mmlu_pro: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub table: Vec<TableRow>,
    #[serde(default)]
    pub code: Vec<Entry>,
    #[serde(default)]
    pub multimodal: Vec<Entry>,
    #[serde(default)]
    pub knowledge: Vec<Entry>,
    #[serde(default)]
    pub longest_context: Vec<Entry>,
    #[serde(default)]
    pub cheapest: Vec<Entry>,
    #[serde(default)]
    pub fastest: Vec<Entry>,
}

/// Element count of every array in a [`Snapshot`], for external health checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    pub table: usize,
    pub code: usize,
    pub multimodal: usize,
    pub knowledge: usize,
    pub longest_context: usize,
    pub cheapest: usize,
    pub fastest: usize,
}

impl Snapshot {
    /// Runs every extractor over one page and assembles the results.
    pub fn extract<P: PageModel>(page: &P, rules: &Rules, max_rows: usize) -> Self {
        let mut snapshot = Snapshot {
            table: extract_table(page, rules, max_rows),
            ..Default::default()
        };
        for category in Category::ALL {
            let card = locate_section(page, rules, category);
            snapshot.set_entries(category, parse_card(page, card, category.kind()));
        }
        snapshot
    }

    pub fn entries(&self, category: Category) -> &[Entry] {
        match category {
            Category::Code => &self.code,
            Category::Multimodal => &self.multimodal,
            Category::Knowledge => &self.knowledge,
            Category::LongestContext => &self.longest_context,
            Category::Cheapest => &self.cheapest,
            Category::Fastest => &self.fastest,
        }
    }

    /// Replaces a category's entries, keeping at most [`MAX_ENTRIES`].
    pub fn set_entries(&mut self, category: Category, mut entries: Vec<Entry>) {
        entries.truncate(MAX_ENTRIES);
        let slot = match category {
            Category::Code => &mut self.code,
            Category::Multimodal => &mut self.multimodal,
            Category::Knowledge => &mut self.knowledge,
            Category::LongestContext => &mut self.longest_context,
            Category::Cheapest => &mut self.cheapest,
            Category::Fastest => &mut self.fastest,
        };
        *slot = entries;
    }

    pub fn counts(&self) -> Counts {
        Counts {
            table: self.table.len(),
            code: self.code.len(),
            multimodal: self.multimodal.len(),
            knowledge: self.knowledge.len(),
            longest_context: self.longest_context.len(),
            cheapest: self.cheapest.len(),
            fastest: self.fastest.len(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Loads a persisted snapshot. An absent or unparsable document is fatal for the caller.
    pub fn load(path: &Path) -> Result<Self> {
        let text = store::read_optional(path)
            .map_err(|e| Error::missing_source(path, e))?
            .ok_or_else(|| Error::missing_source(path, "file not found"))?;
        serde_json::from_str(&text).map_err(|e| Error::missing_source(path, e))
    }

    /// Replaces the snapshot document and writes the counts summary next to it.
    pub fn save(&self, snapshot_path: &Path, counts_path: &Path) -> Result<Counts> {
        let counts = self.counts();
        store::write_atomic(snapshot_path, self.to_json()?.as_bytes())?;
        store::write_atomic(counts_path, serde_json::to_string(&counts)?.as_bytes())?;
        Ok(counts)
    }
}
