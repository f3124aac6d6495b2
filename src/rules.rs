//! Extraction rules: which headings introduce which category, which markup plays
//! which [`Role`], which header names map to which table column, and how logo
//! slugs map to organization names.
//!
//! The rules are plain JSON data. A default set is embedded in the binary; a
//! replacement can be loaded from disk. Either way they are compiled once at
//! start-up and shared read-only afterwards.

use std::collections::HashMap;
use std::path::Path;

use regex::{Regex, RegexBuilder};
use scraper::Selector;
use serde::Deserialize;

use crate::page::Role;
use crate::snapshot::Category;
use crate::table::{normalize_header, Column};
use crate::{Error, Result};

const BUILTIN_RULES_JSON: &str = include_str!("../data/rules.json");

fn default_ancestor_limit() -> usize {
    6
}

/// Markup for every [`Role`]. `S` is a CSS selector string before compilation.
#[derive(Debug, Clone, Deserialize)]
pub struct Markers<S = String> {
    pub heading: S,
    pub card: S,
    pub card_row: S,
    pub label_container: S,
    pub label_link: S,
    pub label_text: S,
    pub value: S,
    pub table: S,
    pub header_cell: S,
    pub body_row: S,
    pub cell: S,
    pub image: S,
    pub link: S,
}

impl<S> Markers<S> {
    pub fn get(&self, role: Role) -> &S {
        match role {
            Role::Heading => &self.heading,
            Role::Card => &self.card,
            Role::CardRow => &self.card_row,
            Role::LabelContainer => &self.label_container,
            Role::LabelLink => &self.label_link,
            Role::LabelText => &self.label_text,
            Role::Value => &self.value,
            Role::Table => &self.table,
            Role::HeaderCell => &self.header_cell,
            Role::BodyRow => &self.body_row,
            Role::Cell => &self.cell,
            Role::Image => &self.image,
            Role::Link => &self.link,
        }
    }

    fn try_map<T>(self, f: impl Fn(S) -> Result<T>) -> Result<Markers<T>> {
        Ok(Markers {
            heading: f(self.heading)?,
            card: f(self.card)?,
            card_row: f(self.card_row)?,
            label_container: f(self.label_container)?,
            label_link: f(self.label_link)?,
            label_text: f(self.label_text)?,
            value: f(self.value)?,
            table: f(self.table)?,
            header_cell: f(self.header_cell)?,
            body_row: f(self.body_row)?,
            cell: f(self.cell)?,
            image: f(self.image)?,
            link: f(self.link)?,
        })
    }
}

/// Rules as written in the JSON document.
#[derive(Debug, Clone, Deserialize)]
pub struct RulesConfig {
    pub headings: HashMap<Category, Vec<String>>,
    pub markers: Markers,
    #[serde(default = "default_ancestor_limit")]
    pub card_ancestor_limit: usize,
    pub columns: HashMap<Column, Vec<String>>,
    #[serde(default)]
    pub organizations: HashMap<String, String>,
    #[serde(default)]
    pub organization_aliases: HashMap<String, String>,
}

/// Compiled, immutable extraction rules.
#[derive(Debug)]
pub struct Rules {
    headings: HashMap<Category, Vec<Regex>>,
    markers: Markers<Selector>,
    card_ancestor_limit: usize,
    columns: HashMap<Column, Vec<String>>,
    organizations: HashMap<String, String>,
    organization_aliases: HashMap<String, String>,
}

impl Rules {
    /// Compiles the rules embedded in the binary.
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_RULES_JSON)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: RulesConfig = serde_json::from_str(text)?;
        Self::compile(config)
    }

    pub fn compile(config: RulesConfig) -> Result<Self> {
        let mut headings = HashMap::new();
        for category in Category::ALL {
            let patterns = config.headings.get(&category).ok_or_else(|| {
                Error::InvalidRules(format!("no heading patterns for `{category}`"))
            })?;
            let compiled = patterns
                .iter()
                .map(|p| {
                    RegexBuilder::new(p)
                        .case_insensitive(true)
                        .build()
                        .map_err(|e| Error::InvalidRules(format!("heading pattern `{p}`: {e}")))
                })
                .collect::<Result<Vec<_>>>()?;
            headings.insert(category, compiled);
        }

        let markers = config.markers.try_map(|s| create_selector(&s))?;

        let mut columns = HashMap::new();
        for column in Column::ALL {
            let synonyms = config.columns.get(&column).ok_or_else(|| {
                Error::InvalidRules(format!("no header names for column `{}`", column.key()))
            })?;
            columns.insert(column, synonyms.iter().map(|s| normalize_header(s)).collect());
        }

        let lowercase_keys = |map: HashMap<String, String>| {
            map.into_iter()
                .map(|(k, v)| (k.to_lowercase(), v))
                .collect::<HashMap<_, _>>()
        };

        Ok(Self {
            headings,
            markers,
            card_ancestor_limit: config.card_ancestor_limit,
            columns,
            organizations: lowercase_keys(config.organizations),
            organization_aliases: lowercase_keys(config.organization_aliases),
        })
    }

    pub fn heading_patterns(&self, category: Category) -> &[Regex] {
        self.headings
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn marker(&self, role: Role) -> &Selector {
        self.markers.get(role)
    }

    /// How many ancestors of a heading are searched for a card container.
    pub fn card_ancestor_limit(&self) -> usize {
        self.card_ancestor_limit
    }

    /// Normalized header names for `column`, in priority order.
    pub fn column_names(&self, column: Column) -> &[String] {
        self.columns
            .get(&column)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Canonical organization name for a logo slug.
    pub fn organization(&self, slug: &str) -> Option<&str> {
        self.organizations
            .get(&slug.to_lowercase())
            .map(String::as_str)
    }

    /// Canonical form of an organization written out as text.
    pub fn organization_alias(&self, text: &str) -> Option<&str> {
        self.organization_aliases
            .get(&text.to_lowercase())
            .map(String::as_str)
    }
}

#[inline]
fn create_selector(sel_str: &str) -> Result<Selector> {
    Selector::parse(sel_str).map_err(|_| Error::Selector(sel_str.into()))
}
