//! Per-category, per-entity numeric time series.
//!
//! Series are keyed by entity display name, so a renamed entity starts a new series.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::snapshot::{Category, Snapshot};
use crate::{store, Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// `category -> entity name -> points`, as stored in `trends.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrendStore {
    series: BTreeMap<String, BTreeMap<String, Vec<TrendPoint>>>,
}

impl TrendStore {
    pub fn series(&self, category: Category, name: &str) -> &[TrendPoint] {
        self.series
            .get(category.key())
            .and_then(|entities| entities.get(name))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn entities(&self, category: Category) -> impl Iterator<Item = &str> {
        self.series
            .get(category.key())
            .into_iter()
            .flat_map(|entities| entities.keys().map(String::as_str))
    }

    /// Adds one point per entity of `snapshot` dated `date`.
    ///
    /// A point is only added when every point already in the entity's series is
    /// older than `date`, so a backfill never lands behind newer data. Entries
    /// without a usable number are skipped. Returns the number of points added.
    pub fn record(&mut self, snapshot: &Snapshot, date: NaiveDate) -> usize {
        let mut added = 0;
        for category in Category::ALL {
            let entries = snapshot.entries(category);
            if entries.is_empty() {
                continue;
            }
            let entities = self.series.entry(category.key().to_string()).or_default();
            for entry in entries {
                let Some(value) = entry.numeric(category.kind()) else {
                    debug!(%category, name = %entry.name, "no numeric value, skipping point");
                    continue;
                };
                if entry.name.is_empty() {
                    continue;
                }
                let points = entities.entry(entry.name.clone()).or_default();
                if points.iter().all(|p| p.date < date) {
                    points.push(TrendPoint { date, value });
                    added += 1;
                } else {
                    debug!(%category, name = %entry.name, %date, "series already covers this day");
                }
            }
        }
        added
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Loads the store; an absent file is an empty store.
    pub fn load(path: &Path) -> Result<Self> {
        match store::read_optional(path)? {
            Some(text) => serde_json::from_str(&text).map_err(|e| {
                Error::persistence(path, std::io::Error::new(std::io::ErrorKind::InvalidData, e))
            }),
            None => Ok(Self::default()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        store::write_atomic(path, self.to_json()?.as_bytes())
    }
}

/// Merges a snapshot into the series store file, replacing the document as a whole.
pub fn update_trends(path: &Path, snapshot: &Snapshot, date: NaiveDate) -> Result<usize> {
    let mut trends = TrendStore::load(path)?;
    let added = trends.record(snapshot, date);
    trends.save(path)?;
    info!(path = %path.display(), added, "trends updated");
    Ok(added)
}
