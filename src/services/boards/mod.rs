//! Site-specific knowledge: search URLs, selectors and identifiers.
//!
//! Parsing is synchronous because `scraper::Html` is not `Send`; callers
//! parse a fetched body to owned values before the next `.await`.

pub mod jora;
pub mod seek;

use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{Error, Result};
use crate::services::normalizer::RawDetail;

pub use jora::Jora;
pub use seek::Seek;

lazy_static! {
    static ref APPLY_TEXT_RE: Regex = Regex::new(r"(?i)apply").unwrap();
}

/// One result card, before its detail page is fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingStub {
    pub id: String,
    pub title: String,
    pub url: String,
    /// Location printed on the card, when the board shows one.
    pub location: Option<String>,
    /// Fragments available on the card itself; the detail page overrides them.
    pub card: RawDetail,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultsPage {
    pub no_results: bool,
    pub listings: Vec<ListingStub>,
    /// Upper bound on the number of pages, when the board reports a total.
    pub page_cap: Option<u32>,
}

impl ResultsPage {
    /// Pagination ends after this page.
    pub fn is_last(&self) -> bool {
        self.no_results || self.listings.is_empty()
    }
}

pub trait JobBoard: Send + Sync {
    /// Value stored in `ListingRecord::source`.
    fn source(&self) -> &'static str;

    fn base_url(&self) -> &Url;

    /// Search URL for a 1-based page number.
    fn search_url(&self, keyword: &str, location: &str, page: u32) -> String;

    fn parse_results(&self, html: &str) -> Result<ResultsPage>;

    fn parse_detail(&self, html: &str) -> Result<RawDetail>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum BoardKind {
    Jora,
    Seek,
}

impl BoardKind {
    pub fn build(self) -> Result<Arc<dyn JobBoard>> {
        let board: Arc<dyn JobBoard> = match self {
            BoardKind::Jora => Arc::new(Jora::new()?),
            BoardKind::Seek => Arc::new(Seek::new()?),
        };
        Ok(board)
    }
}

pub(crate) fn create_selector(sel_str: &str) -> Result<Selector> {
    Selector::parse(sel_str).map_err(|_| Error::Selector(sel_str.into()))
}

/// Whitespace-normalized text of an element, `None` when blank.
pub(crate) fn element_text(element: ElementRef<'_>) -> Option<String> {
    let text = element.text().collect::<Vec<_>>().join(" ");
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!collapsed.is_empty()).then_some(collapsed)
}

pub(crate) fn select_text(root: ElementRef<'_>, selector: &Selector) -> Option<String> {
    root.select(selector).find_map(element_text)
}

pub(crate) fn select_attr(root: ElementRef<'_>, selector: &Selector, attr: &str) -> Option<String> {
    root.select(selector)
        .find_map(|el| el.value().attr(attr))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Inner HTML and plain text of the first element matching `selector`.
pub(crate) fn select_description(
    doc: &Html,
    selector: &Selector,
) -> (Option<String>, Option<String>) {
    match doc.select(selector).next() {
        Some(block) => (
            Some(block.inner_html().trim().to_string()),
            Some(block.text().collect::<Vec<_>>().join(" ")),
        ),
        None => (None, None),
    }
}

/// The structural apply button first, then any anchor whose text mentions
/// "apply".
pub(crate) fn find_apply_href(doc: &Html, marker: &Selector) -> Result<Option<String>> {
    if let Some(href) = select_attr(doc.root_element(), marker, "href") {
        return Ok(Some(href));
    }
    let anchors = create_selector("a[href]")?;
    Ok(doc
        .select(&anchors)
        .filter(|a| APPLY_TEXT_RE.is_match(&a.text().collect::<String>()))
        .find_map(|a| a.value().attr("href"))
        .map(|href| href.trim().to_string())
        .filter(|href| !href.is_empty()))
}

/// Lowercased words joined by `-`, as used in Seek paths.
pub(crate) fn dashed(value: &str) -> String {
    value
        .split_whitespace()
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>()
        .join("-")
}
