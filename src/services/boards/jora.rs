use std::collections::HashSet;

use scraper::{Html, Selector};
use url::Url;

use super::{
    create_selector, element_text, find_apply_href, select_description, select_text, JobBoard,
    ListingStub, ResultsPage,
};
use crate::error::Result;
use crate::services::normalizer::RawDetail;
use crate::utils::identifier::listing_id;

const BASE_URL: &str = "https://au.jora.com";
const SOURCE: &str = "Jora Australia";
const WORK_TYPE_WORDS: [&str; 6] = ["full", "part", "contract", "casual", "temporary", "permanent"];

/// au.jora.com. Results carry no native id, so it comes from the job path.
pub struct Jora {
    base: Url,
    no_results: Selector,
    card: Selector,
    title: Selector,
    link: Selector,
    employer: Selector,
    badge: Selector,
    badge_content: Selector,
    posted: Selector,
    description: Selector,
    apply_button: Selector,
}

impl Jora {
    pub fn new() -> Result<Self> {
        Ok(Self {
            base: Url::parse(BASE_URL)?,
            no_results: create_selector("div.no-results, div.empty-state, div.no-jobs-found")?,
            card: create_selector(
                "div.result, div.job-card, article.job-result, div.job-item, div.job",
            )?,
            title: create_selector("h3.job-title, a.job-title, h2.title, a.job-link, div.job-title")?,
            link: create_selector("a[href]")?,
            employer: create_selector("span.company, div.company-name, a.company, span.employer-name")?,
            badge: create_selector("div.badge.-default-badge")?,
            badge_content: create_selector("div.content")?,
            posted: create_selector("time.date, span.date-posted, div.posted-date")?,
            description: create_selector(
                "div#job-description-container, div.description, div.job-details",
            )?,
            apply_button: create_selector(r#"a[data-automation="job-detail-apply-button"]"#)?,
        })
    }
}

/// The last `-` separated token of a `/job/<slug>` path.
fn native_id(url: &Url) -> Option<String> {
    let mut segments = url.path_segments()?;
    if segments.next()? != "job" {
        return None;
    }
    let slug = segments.next_back()?;
    slug.rsplit('-')
        .next()
        .filter(|token| !token.is_empty() && token.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_string)
}

impl JobBoard for Jora {
    fn source(&self) -> &'static str {
        SOURCE
    }

    fn base_url(&self) -> &Url {
        &self.base
    }

    fn search_url(&self, keyword: &str, location: &str, page: u32) -> String {
        let mut url = self.base.clone();
        url.set_path("/j");
        url.query_pairs_mut()
            .append_pair("q", keyword)
            .append_pair("l", location)
            .append_pair("p", &page.to_string());
        url.to_string()
    }

    fn parse_results(&self, html: &str) -> Result<ResultsPage> {
        let doc = Html::parse_document(html);
        let no_results = doc.select(&self.no_results).next().is_some();

        let mut seen = HashSet::new();
        let mut listings = Vec::new();
        for card in doc.select(&self.card) {
            let Some(title_el) = card.select(&self.title).next() else {
                continue;
            };
            let Some(title) = element_text(title_el) else {
                continue;
            };
            let href = title_el
                .value()
                .attr("href")
                .or_else(|| title_el.select(&self.link).find_map(|a| a.value().attr("href")));
            let Some(url) = href.and_then(|href| self.base.join(href.trim()).ok()) else {
                continue;
            };
            if !seen.insert(url.to_string()) {
                continue;
            }

            let id = native_id(&url).unwrap_or_else(|| listing_id(url.as_str()));
            listings.push(ListingStub {
                id,
                title,
                url: url.to_string(),
                location: None,
                card: RawDetail::default(),
            });
        }

        Ok(ResultsPage {
            no_results,
            listings,
            page_cap: None,
        })
    }

    fn parse_detail(&self, html: &str) -> Result<RawDetail> {
        let doc = Html::parse_document(html);
        let root = doc.root_element();

        let mut salary = None;
        let mut work_type = None;
        for badge in doc.select(&self.badge) {
            let Some(text) = select_text(badge, &self.badge_content) else {
                continue;
            };
            let lowered = text.to_lowercase();
            if text.contains('$') {
                salary = Some(text);
            } else if WORK_TYPE_WORDS.iter().any(|word| lowered.contains(word)) {
                work_type = Some(text);
            }
        }

        let (description_html, description_text) = select_description(&doc, &self.description);

        Ok(RawDetail {
            employer: select_text(root, &self.employer),
            salary,
            work_type,
            posted: select_text(root, &self.posted),
            description_html,
            description_text,
            apply_href: find_apply_href(&doc, &self.apply_button)?,
        })
    }
}
