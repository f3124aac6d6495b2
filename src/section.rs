use tracing::{debug, warn};

use crate::numeric::first_decimal;
use crate::page::{collapse_whitespace, PageModel, Role};
use crate::rules::Rules;
use crate::snapshot::{Category, Entry, EntryKind};
use crate::MAX_ENTRIES;

/// Finds the card holding `category`.
///
/// The first heading (document order) whose text matches one of the category's
/// patterns wins. From there the heading and up to `card_ancestor_limit` ancestors
/// are checked for a card container; without one, the heading's parent is used.
pub fn locate_section<'a, P: PageModel>(
    page: &'a P,
    rules: &Rules,
    category: Category,
) -> Option<P::Node<'a>> {
    let patterns = rules.heading_patterns(category);
    let heading = page.query(Role::Heading).into_iter().find(|&h| {
        let text = page.text(h);
        patterns.iter().any(|re| re.is_match(&text))
    });
    let Some(heading) = heading else {
        warn!(%category, "no heading matched, section left empty");
        return None;
    };

    let mut node = Some(heading);
    for _ in 0..=rules.card_ancestor_limit() {
        match node {
            Some(n) if page.has_role(n, Role::Card) => return Some(n),
            Some(n) => node = page.parent(n),
            None => break,
        }
    }
    debug!(%category, "no card container found, using heading parent");
    page.parent(heading)
}

/// Reads up to [`MAX_ENTRIES`] ranked entries out of a card.
///
/// Rows without a label are skipped. In [`EntryKind::Score`] mode, rows whose value
/// holds no number are dropped.
pub fn parse_card<'a, P: PageModel>(
    page: &'a P,
    card: Option<P::Node<'a>>,
    kind: EntryKind,
) -> Vec<Entry> {
    let Some(card) = card else {
        return Vec::new();
    };

    let mut entries = Vec::with_capacity(MAX_ENTRIES);
    for row in page.query_in(card, Role::CardRow) {
        let name = row_label(page, row);
        if name.is_empty() {
            continue;
        }
        let value = page
            .first_in(row, Role::Value)
            .map(|v| page.text(v))
            .unwrap_or_default();

        match kind {
            EntryKind::Score => match first_decimal(&value) {
                Some(score) => entries.push(Entry::scored(name, score)),
                None => debug!(%name, %value, "no score in row value, dropping row"),
            },
            EntryKind::Text => entries.push(Entry::valued(name, value)),
        }

        if entries.len() == MAX_ENTRIES {
            break;
        }
    }
    entries
}

/// Label of a row: a link in the deepest label container, else its text element.
fn row_label<'a, P: PageModel>(page: &'a P, row: P::Node<'a>) -> String {
    let Some(container) = page.query_in(row, Role::LabelContainer).pop() else {
        return String::new();
    };
    page.first_in(container, Role::LabelLink)
        .or_else(|| page.first_in(container, Role::LabelText))
        .map(|label| collapse_whitespace(&page.raw_text(label)))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::HtmlPage;
    use pretty_assertions::assert_eq;

    fn row(name: &str, value: &str) -> String {
        format!(
            r#"<div class="flex items-center justify-between">
                 <div class="min-w-0 flex-1"><a href="/m">{name}</a></div>
                 <span class="tabular-nums">{value}</span>
               </div>"#
        )
    }

    fn card(title: &str, rows: &[String]) -> String {
        format!(
            r#"<div class="rounded border p-6">
                 <div class="header"><h3>{title}</h3></div>
                 <div class="space-y-3">{}</div>
               </div>"#,
            rows.concat()
        )
    }

    fn page_html(cards: &[String]) -> String {
        format!("<html><body><main>{}</main></body></html>", cards.concat())
    }

    #[test]
    fn locates_card_by_any_pattern() {
        let html = page_html(&[
            card("Best Multimodal LLM", &[row("Gemini", "81.0")]),
            card("Aider Polyglot", &[row("Claude", "72.0")]),
        ]);
        let rules = Rules::builtin().unwrap();
        let page = HtmlPage::parse(&html, None, &rules);

        let code = locate_section(&page, &rules, Category::Code).unwrap();
        assert!(page.has_role(code, Role::Card));
        let entries = parse_card(&page, Some(code), EntryKind::Score);
        assert_eq!(entries, vec![Entry::scored("Claude", 72.0)]);
    }

    #[test]
    fn missing_heading_is_empty() {
        let html = page_html(&[card("Something else", &[row("A", "1")])]);
        let rules = Rules::builtin().unwrap();
        let page = HtmlPage::parse(&html, None, &rules);

        let card = locate_section(&page, &rules, Category::Fastest);
        assert!(card.is_none());
        assert!(parse_card(&page, card, EntryKind::Text).is_empty());
    }

    #[test]
    fn falls_back_to_heading_parent() {
        let html = format!(
            r#"<html><body><section id="plain"><h2>Longest Context Model</h2>{}</section></body></html>"#,
            row("Llama 4 Scout", "10M")
        );
        let rules = Rules::builtin().unwrap();
        let page = HtmlPage::parse(&html, None, &rules);

        let section = locate_section(&page, &rules, Category::LongestContext).unwrap();
        assert_eq!(page.attr(section, "id").as_deref(), Some("plain"));
        let entries = parse_card(&page, Some(section), EntryKind::Text);
        assert_eq!(entries, vec![Entry::valued("Llama 4 Scout", "10M")]);
    }

    #[test]
    fn caps_at_five_entries() {
        let rows: Vec<String> = (1..=8).map(|i| row(&format!("m{i}"), &format!("{i}0"))).collect();
        let html = page_html(&[card("Best LLM - Knowledge", &rows)]);
        let rules = Rules::builtin().unwrap();
        let page = HtmlPage::parse(&html, None, &rules);

        let section = locate_section(&page, &rules, Category::Knowledge);
        let entries = parse_card(&page, section, EntryKind::Score);
        assert_eq!(entries.len(), 5);
        assert_eq!(entries[4], Entry::scored("m5", 50.0));
    }

    #[test]
    fn skips_unlabeled_and_unscored_rows() {
        let rows = vec![
            row("", "90"),
            row("NoScore", "—"),
            row("  Spaced \n  Name ", " 88.5 % "),
        ];
        let html = page_html(&[card("Best LLM - Code", &rows)]);
        let rules = Rules::builtin().unwrap();
        let page = HtmlPage::parse(&html, None, &rules);

        let section = locate_section(&page, &rules, Category::Code);
        let entries = parse_card(&page, section, EntryKind::Score);
        assert_eq!(entries, vec![Entry::scored("Spaced Name", 88.5)]);
    }

    #[test]
    fn label_falls_back_to_span() {
        let html = page_html(&[card(
            "Cheapest API Provider",
            &[r#"<div class="justify-between">
                   <div class="min-w-0 flex-1"><span> Groq </span></div>
                   <span class="tabular-nums">$0.11</span>
                 </div>"#
                .to_string()],
        )]);
        let rules = Rules::builtin().unwrap();
        let page = HtmlPage::parse(&html, None, &rules);

        let section = locate_section(&page, &rules, Category::Cheapest);
        let entries = parse_card(&page, section, EntryKind::Text);
        assert_eq!(entries, vec![Entry::valued("Groq", "$0.11")]);
    }
}
