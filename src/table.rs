//! Extraction of the main results table.
//!
//! Each data cell is captured as a [`CellSources`] record first; everything after
//! that (header synonyms, value priority, organization names) works on plain data.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::page::{collapse_whitespace, PageModel, Role};
use crate::rules::Rules;
use crate::snapshot::TableRow;

static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"));
static LOGO_SLUG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)/([^/?#]+)\.(?:svg|png|jpe?g|webp)(?:\?[^#]*)?(?:#.*)?$").expect("valid regex")
});
static SLUG_SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[-_]+").expect("valid regex"));
static LOGO_WORDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:system\s+)?logo\b|\bicon\b").expect("valid regex"));

/// Logical column of the results table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Organization,
    Model,
    License,
    ParametersB,
    Context,
    InputPerM,
    OutputPerM,
    Gpqa,
    Mmlu,
    MmluPro,
}

impl Column {
    pub const ALL: [Column; 10] = [
        Column::Organization,
        Column::Model,
        Column::License,
        Column::ParametersB,
        Column::Context,
        Column::InputPerM,
        Column::OutputPerM,
        Column::Gpqa,
        Column::Mmlu,
        Column::MmluPro,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Column::Organization => "organization",
            Column::Model => "model",
            Column::License => "license",
            Column::ParametersB => "parameters_b",
            Column::Context => "context",
            Column::InputPerM => "input_per_m",
            Column::OutputPerM => "output_per_m",
            Column::Gpqa => "gpqa",
            Column::Mmlu => "mmlu",
            Column::MmluPro => "mmlu_pro",
        }
    }
}

/// Lowercases, collapses non-alphanumeric runs into one space and trims.
/// `"Input $/M"` becomes `"input m"`.
pub fn normalize_header(header: &str) -> String {
    NON_ALNUM
        .replace_all(&header.to_lowercase(), " ")
        .trim()
        .to_string()
}

/// Everything a cell can tell us, captured once from the page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellSources {
    pub text: String,
    pub aria_label: String,
    pub alt: String,
    pub title: String,
    pub content: String,
    /// Absolute URL of the cell's image, if any.
    pub logo: String,
    pub href: String,
}

impl CellSources {
    pub fn capture<'a, P: PageModel>(page: &'a P, cell: P::Node<'a>) -> Self {
        let image = page.first_in(cell, Role::Image);
        let logo = image
            .and_then(|img| page.attr(img, "src"))
            .filter(|src| !src.trim().is_empty())
            .map(|src| page.resolve_url(src.trim()))
            .unwrap_or_default();

        Self {
            text: page.text(cell),
            aria_label: page.attr(cell, "aria-label").unwrap_or_default(),
            alt: image.and_then(|img| page.attr(img, "alt")).unwrap_or_default(),
            title: page.attr(cell, "title").unwrap_or_default(),
            content: page.raw_text(cell),
            logo,
            href: page
                .first_in(cell, Role::Link)
                .and_then(|a| page.attr(a, "href"))
                .unwrap_or_default(),
        }
    }

    /// First non-empty of: text, accessibility label, image alt, title, raw content.
    pub fn value(&self) -> String {
        [
            &self.text,
            &self.aria_label,
            &self.alt,
            &self.title,
            &self.content,
        ]
        .into_iter()
        .map(|s| s.trim())
        .find(|s| !s.is_empty())
        .unwrap_or_default()
        .to_string()
    }
}

/// Resolution of logical columns to header positions.
#[derive(Debug, Clone, Default)]
pub struct ColumnMap {
    index: HashMap<String, usize>,
    resolved: HashMap<Column, Vec<usize>>,
}

impl ColumnMap {
    pub fn from_headers<S: AsRef<str>>(headers: &[S], rules: &Rules) -> Self {
        let mut index = HashMap::new();
        for (i, header) in headers.iter().enumerate() {
            index.insert(normalize_header(header.as_ref()), i);
        }

        let mut resolved = HashMap::new();
        for column in Column::ALL {
            let positions: Vec<usize> = rules
                .column_names(column)
                .iter()
                .filter_map(|name| index.get(name).copied())
                .collect();
            if !positions.is_empty() {
                resolved.insert(column, positions);
            }
        }
        Self { index, resolved }
    }

    /// Columns that resolved to at least one header.
    pub fn columns(&self) -> HashSet<Column> {
        self.resolved.keys().copied().collect()
    }

    pub fn has(&self, column: Column) -> bool {
        self.resolved.contains_key(&column)
    }

    pub fn header_count(&self) -> usize {
        self.index.len()
    }

    /// The first of `column`'s cells (synonym order) in `row`.
    pub fn cell<'r>(&self, row: &'r [CellSources], column: Column) -> Option<&'r CellSources> {
        self.resolved
            .get(&column)?
            .iter()
            .find_map(|&i| row.get(i))
    }

    /// The first non-empty value among `column`'s synonyms in `row`.
    pub fn value(&self, row: &[CellSources], column: Column) -> String {
        self.resolved
            .get(&column)
            .into_iter()
            .flatten()
            .filter_map(|&i| row.get(i))
            .map(CellSources::value)
            .find(|v| !v.is_empty())
            .unwrap_or_default()
    }
}

/// Extracts up to `max_rows` rows from the first table whose header row
/// names both an organization and a model column.
pub fn extract_table<P: PageModel>(page: &P, rules: &Rules, max_rows: usize) -> Vec<TableRow> {
    let target = page.query(Role::Table).into_iter().find_map(|table| {
        let headers: Vec<String> = page
            .query_in(table, Role::HeaderCell)
            .into_iter()
            .map(|th| page.text(th))
            .collect();
        let columns = ColumnMap::from_headers(headers.as_slice(), rules);
        (columns.has(Column::Organization) && columns.has(Column::Model)).then_some((table, columns))
    });
    let Some((table, columns)) = target else {
        warn!("no table with organization and model columns, table left empty");
        return Vec::new();
    };

    let rows: Vec<TableRow> = page
        .query_in(table, Role::BodyRow)
        .into_iter()
        .take(max_rows)
        .map(|tr| {
            let cells: Vec<CellSources> = page
                .query_in(tr, Role::Cell)
                .into_iter()
                .map(|td| CellSources::capture(page, td))
                .collect();
            build_row(&cells, &columns, rules)
        })
        .collect();
    debug!(rows = rows.len(), headers = columns.header_count(), "extracted table");
    rows
}

fn build_row(cells: &[CellSources], columns: &ColumnMap, rules: &Rules) -> TableRow {
    let org_cell = columns.cell(cells, Column::Organization);
    let organization_logo = org_cell.map(|c| c.logo.clone()).unwrap_or_default();

    TableRow {
        organization: organization_name(org_cell, rules),
        organization_logo,
        model: columns.value(cells, Column::Model),
        license: columns.value(cells, Column::License),
        parameters_b: columns.value(cells, Column::ParametersB),
        context: columns.value(cells, Column::Context),
        input_per_m: columns.value(cells, Column::InputPerM),
        output_per_m: columns.value(cells, Column::OutputPerM),
        gpqa: columns.value(cells, Column::Gpqa),
        mmlu: columns.value(cells, Column::Mmlu),
        mmlu_pro: columns.value(cells, Column::MmluPro),
    }
}

/// Organization of a row: from the logo slug when there is a logo, else from the text.
pub fn organization_name(cell: Option<&CellSources>, rules: &Rules) -> String {
    let Some(cell) = cell else {
        return String::new();
    };
    logo_slug(&cell.logo)
        .map(|slug| organization_from_slug(&slug, rules))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| organization_from_text(&cell.value(), rules))
}

/// Lowercased filename stem of an image URL: `.../logos/xai.svg` gives `xai`.
pub fn logo_slug(url: &str) -> Option<String> {
    LOGO_SLUG
        .captures(url)
        .map(|caps| caps[1].to_lowercase())
}

pub fn organization_from_slug(slug: &str, rules: &Rules) -> String {
    if let Some(name) = rules.organization(slug) {
        return name.to_string();
    }
    title_case(&SLUG_SEPARATORS.replace_all(&slug.to_lowercase(), " "))
}

pub fn organization_from_text(text: &str, rules: &Rules) -> String {
    let cleaned = collapse_whitespace(&LOGO_WORDS.replace_all(text, ""));
    if let Some(alias) = rules.organization_alias(&cleaned) {
        return alias.to_string();
    }
    title_case(&cleaned)
}

/// Uppercases the first character of every word, leaving the rest untouched.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for ch in s.chars() {
        if at_word_start && ch.is_alphanumeric() {
            out.extend(ch.to_uppercase());
        } else {
            out.push(ch);
        }
        at_word_start = !(ch.is_alphanumeric() || ch == '_');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::HtmlPage;
    use pretty_assertions::assert_eq;

    fn cell(text: &str) -> CellSources {
        CellSources {
            text: text.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn normalizes_headers() {
        assert_eq!(normalize_header("  Input $/M "), "input m");
        assert_eq!(normalize_header("Parameters (B)"), "parameters b");
        assert_eq!(normalize_header("MMLU-Pro"), "mmlu pro");
    }

    #[test]
    fn header_synonyms_resolve_to_same_columns() {
        let rules = Rules::builtin().unwrap();
        let canonical = ColumnMap::from_headers(&["Organization", "Model", "Context"], &rules);
        let synonyms = ColumnMap::from_headers(&["Org", "Model Name", "Max Input Tokens"], &rules);

        let expected: HashSet<Column> = [Column::Organization, Column::Model, Column::Context].into();
        assert_eq!(canonical.columns(), expected);
        assert_eq!(synonyms.columns(), expected);
    }

    #[test]
    fn value_priority_order() {
        let mut sources = CellSources {
            text: "  ".into(),
            aria_label: String::new(),
            alt: "alt".into(),
            title: "title".into(),
            content: "content".into(),
            ..Default::default()
        };
        assert_eq!(sources.value(), "alt");

        sources.aria_label = " aria ".into();
        assert_eq!(sources.value(), "aria");

        sources.text = "text".into();
        assert_eq!(sources.value(), "text");

        assert_eq!(CellSources::default().value(), "");
        assert_eq!(
            CellSources {
                content: "\n raw \n".into(),
                ..Default::default()
            }
            .value(),
            "raw"
        );
    }

    #[test]
    fn synonym_fallback_skips_empty_values() {
        let rules = Rules::builtin().unwrap();
        let columns = ColumnMap::from_headers(&["Organization", "Model", "Parameters (B)", "Parameters"], &rules);
        let row = vec![cell("Meta"), cell("Llama"), cell(""), cell("405")];
        assert_eq!(columns.value(&row, Column::ParametersB), "405");
        assert_eq!(columns.value(&row, Column::License), "");
    }

    #[test]
    fn organization_from_known_logo() {
        let rules = Rules::builtin().unwrap();
        assert_eq!(logo_slug("https://llm-stats.com/logos/xai.svg").as_deref(), Some("xai"));
        assert_eq!(logo_slug("/img/OpenAI.PNG?v=2").as_deref(), Some("openai"));
        assert_eq!(logo_slug("/img/logo"), None);

        let cell = CellSources {
            logo: "https://llm-stats.com/logos/xai.svg".into(),
            text: "whatever".into(),
            ..Default::default()
        };
        assert_eq!(organization_name(Some(&cell), &rules), "xAI");
    }

    #[test]
    fn organization_from_unknown_slug() {
        let rules = Rules::builtin().unwrap();
        assert_eq!(organization_from_slug("acme-labs", &rules), "Acme Labs");
        assert_eq!(organization_from_slug("big__model_co", &rules), "Big Model Co");
    }

    #[test]
    fn organization_from_text_fallback() {
        let rules = Rules::builtin().unwrap();
        assert_eq!(organization_name(Some(&cell("Meta Logo")), &rules), "Meta");
        assert_eq!(organization_from_text("XAI logo", &rules), "xAI");
        assert_eq!(organization_from_text("moonshot system logo icon", &rules), "Moonshot");
        assert_eq!(organization_name(None, &rules), "");
    }

    #[test]
    fn extracts_first_matching_table() {
        let html = r#"
            <html><body>
              <table><thead><tr><th>Rank</th><th>Model</th></tr></thead>
                <tbody><tr><td>1</td><td>Decoy</td></tr></tbody></table>
              <table>
                <thead><tr><th>Organization</th><th>Model</th><th>Input $/M</th><th>GPQA</th></tr></thead>
                <tbody>
                  <tr>
                    <td><img src="/logos/xai.svg" alt="xAI logo"></td>
                    <td><a href="/models/grok">Grok 4</a></td>
                    <td title="per million">$3.00</td>
                    <td aria-label="87.5 percent"></td>
                  </tr>
                  <tr>
                    <td>acme logo</td>
                    <td>Acme One</td>
                    <td></td>
                    <td>70</td>
                  </tr>
                </tbody>
              </table>
            </body></html>"#;
        let rules = Rules::builtin().unwrap();
        let page = HtmlPage::parse(html, Some("https://llm-stats.com/"), &rules);

        let rows = extract_table(&page, &rules, 30);
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0],
            TableRow {
                organization: "xAI".into(),
                organization_logo: "https://llm-stats.com/logos/xai.svg".into(),
                model: "Grok 4".into(),
                input_per_m: "$3.00".into(),
                gpqa: "87.5 percent".into(),
                ..Default::default()
            }
        );
        assert_eq!(rows[1].organization, "Acme");
        assert_eq!(rows[1].organization_logo, "");
        assert_eq!(rows[1].input_per_m, "");

        assert_eq!(extract_table(&page, &rules, 1).len(), 1);
    }

    #[test]
    fn missing_table_is_empty() {
        let rules = Rules::builtin().unwrap();
        let page = HtmlPage::parse("<table><tr><td>x</td></tr></table>", None, &rules);
        assert!(extract_table(&page, &rules, 30).is_empty());
    }
}
