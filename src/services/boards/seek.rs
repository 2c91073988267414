use scraper::{Html, Selector};
use url::Url;

use super::{
    create_selector, dashed, find_apply_href, select_attr, select_description, select_text,
    JobBoard, ListingStub, ResultsPage,
};
use crate::error::Result;
use crate::services::normalizer::RawDetail;

const BASE_URL: &str = "https://www.seek.com.au";
const SOURCE: &str = "Seek Australia";
/// Cards rendered per results page.
const PAGE_SIZE: u32 = 22;

/// www.seek.com.au. Cards carry their id in `data-job-id`.
pub struct Seek {
    base: Url,
    no_results: Selector,
    total_jobs: Selector,
    card: Selector,
    title_link: Selector,
    location: Selector,
    employer: Selector,
    salary: Selector,
    posted: Selector,
    detail_employer: Selector,
    detail_salary: Selector,
    detail_work_type: Selector,
    description: Selector,
    apply_button: Selector,
}

impl Seek {
    pub fn new() -> Result<Self> {
        Ok(Self {
            base: Url::parse(BASE_URL)?,
            no_results: create_selector(r#"[data-automation="searchZeroResults"]"#)?,
            total_jobs: create_selector(r#"[data-automation="totalJobsCount"]"#)?,
            card: create_selector("article[data-job-id]")?,
            title_link: create_selector(r#"a[data-automation="jobTitle"]"#)?,
            location: create_selector(r#"[data-automation="jobLocation"]"#)?,
            employer: create_selector(r#"a[data-automation="jobCompany"]"#)?,
            salary: create_selector(r#"[data-automation="jobSalary"]"#)?,
            posted: create_selector(r#"[data-automation="jobListingDate"]"#)?,
            detail_employer: create_selector(r#"[data-automation="advertiser-name"]"#)?,
            detail_salary: create_selector(r#"[data-automation="job-detail-salary"]"#)?,
            detail_work_type: create_selector(r#"[data-automation="job-detail-work-type"]"#)?,
            description: create_selector(r#"[data-automation="jobAdDetails"]"#)?,
            apply_button: create_selector(r#"a[data-automation="job-detail-apply"]"#)?,
        })
    }

    fn page_cap(&self, doc: &Html) -> Option<u32> {
        let text = select_text(doc.root_element(), &self.total_jobs)?;
        let digits: String = text.chars().filter(char::is_ascii_digit).collect();
        let total = digits.parse::<u32>().ok()?;
        Some(total / PAGE_SIZE + 1)
    }
}

impl JobBoard for Seek {
    fn source(&self) -> &'static str {
        SOURCE
    }

    fn base_url(&self) -> &Url {
        &self.base
    }

    fn search_url(&self, keyword: &str, location: &str, page: u32) -> String {
        let mut path = format!("/{}-jobs", dashed(keyword));
        let location = dashed(location);
        if !location.is_empty() {
            path.push_str("/in-");
            path.push_str(&location);
        }

        let mut url = self.base.clone();
        url.set_path(&path);
        if page > 1 {
            url.query_pairs_mut()
                .append_pair("page", &page.to_string());
        }
        url.to_string()
    }

    fn parse_results(&self, html: &str) -> Result<ResultsPage> {
        let doc = Html::parse_document(html);
        let no_results = doc.select(&self.no_results).next().is_some();

        let mut listings = Vec::new();
        for card in doc.select(&self.card) {
            let Some(id) = card
                .value()
                .attr("data-job-id")
                .map(str::trim)
                .filter(|id| !id.is_empty())
            else {
                continue;
            };
            let Some(url) = select_attr(card, &self.title_link, "href")
                .and_then(|href| self.base.join(&href).ok())
            else {
                continue;
            };
            let title = card
                .value()
                .attr("aria-label")
                .map(|label| label.trim().to_string())
                .filter(|label| !label.is_empty())
                .or_else(|| select_text(card, &self.title_link))
                .unwrap_or_default();

            listings.push(ListingStub {
                id: id.to_string(),
                title,
                url: url.to_string(),
                location: select_text(card, &self.location),
                card: RawDetail {
                    employer: select_text(card, &self.employer),
                    salary: select_text(card, &self.salary),
                    posted: select_text(card, &self.posted),
                    ..RawDetail::default()
                },
            });
        }

        Ok(ResultsPage {
            no_results,
            listings,
            page_cap: self.page_cap(&doc),
        })
    }

    fn parse_detail(&self, html: &str) -> Result<RawDetail> {
        let doc = Html::parse_document(html);
        let root = doc.root_element();
        let (description_html, description_text) = select_description(&doc, &self.description);

        Ok(RawDetail {
            employer: select_text(root, &self.detail_employer),
            salary: select_text(root, &self.detail_salary),
            work_type: select_text(root, &self.detail_work_type),
            posted: None,
            description_html,
            description_text,
            apply_href: find_apply_href(&doc, &self.apply_button)?,
        })
    }
}
