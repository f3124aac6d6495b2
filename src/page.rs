//! Read-only access to a rendered page, queried by semantic role.
//!
//! Extraction code only ever asks for "headings", "card rows" or "table cells";
//! which markup those roles correspond to lives in the [`Rules`] markers.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::rules::Rules;

/// Semantic role of an element on a leaderboard page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Section title candidates.
    Heading,
    /// Container holding one ranked section.
    Card,
    /// One ranked row inside a card.
    CardRow,
    /// Block holding the entry label inside a row.
    LabelContainer,
    /// Preferred label element.
    LabelLink,
    /// Fallback label element.
    LabelText,
    /// Tabular-numeral value element.
    Value,
    Table,
    HeaderCell,
    BodyRow,
    Cell,
    Image,
    Link,
}

/// Capability interface over a rendered page.
pub trait PageModel {
    type Node<'a>: Copy
    where
        Self: 'a;

    /// All elements with `role`, in document order.
    fn query(&self, role: Role) -> Vec<Self::Node<'_>>;

    /// All descendants of `scope` with `role`, in document order.
    fn query_in<'a>(&'a self, scope: Self::Node<'a>, role: Role) -> Vec<Self::Node<'a>>;

    fn first_in<'a>(&'a self, scope: Self::Node<'a>, role: Role) -> Option<Self::Node<'a>> {
        self.query_in(scope, role).into_iter().next()
    }

    fn parent<'a>(&'a self, node: Self::Node<'a>) -> Option<Self::Node<'a>>;

    fn has_role<'a>(&'a self, node: Self::Node<'a>, role: Role) -> bool;

    /// Rendered text: whitespace runs collapsed to one space, trimmed.
    fn text<'a>(&'a self, node: Self::Node<'a>) -> String;

    /// Raw text content of the subtree.
    fn raw_text<'a>(&'a self, node: Self::Node<'a>) -> String;

    fn attr<'a>(&'a self, node: Self::Node<'a>, name: &str) -> Option<String>;

    /// Resolves `href` against the document base. Unresolvable input is returned as is.
    fn resolve_url(&self, href: &str) -> String;
}

/// [`PageModel`] over a parsed HTML document.
pub struct HtmlPage<'r> {
    doc: Html,
    base: Option<Url>,
    rules: &'r Rules,
}

impl<'r> HtmlPage<'r> {
    pub fn parse(html: &str, base: Option<&str>, rules: &'r Rules) -> Self {
        Self {
            doc: Html::parse_document(html),
            base: base.and_then(|b| Url::parse(b).ok()),
            rules,
        }
    }

    fn selector(&self, role: Role) -> &Selector {
        self.rules.marker(role)
    }
}

impl PageModel for HtmlPage<'_> {
    type Node<'a> = ElementRef<'a>
    where
        Self: 'a;

    fn query(&self, role: Role) -> Vec<ElementRef<'_>> {
        self.doc.select(self.selector(role)).collect()
    }

    fn query_in<'a>(&'a self, scope: ElementRef<'a>, role: Role) -> Vec<ElementRef<'a>> {
        scope.select(self.selector(role)).collect()
    }

    fn parent<'a>(&'a self, node: ElementRef<'a>) -> Option<ElementRef<'a>> {
        node.parent().and_then(ElementRef::wrap)
    }

    fn has_role<'a>(&'a self, node: ElementRef<'a>, role: Role) -> bool {
        self.selector(role).matches(&node)
    }

    fn text<'a>(&'a self, node: ElementRef<'a>) -> String {
        collapse_whitespace(&self.raw_text(node))
    }

    fn raw_text<'a>(&'a self, node: ElementRef<'a>) -> String {
        node.text().collect()
    }

    fn attr<'a>(&'a self, node: ElementRef<'a>, name: &str) -> Option<String> {
        node.value().attr(name).map(str::to_string)
    }

    fn resolve_url(&self, href: &str) -> String {
        match &self.base {
            Some(base) => base
                .join(href)
                .map(String::from)
                .unwrap_or_else(|_| href.to_string()),
            None => href.to_string(),
        }
    }
}

/// Collapses whitespace runs into single spaces and trims.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
