use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::config::ScrapeSettings;
use crate::models::listing::ListingRecord;
use crate::services::boards::{JobBoard, ListingStub};
use crate::services::fetcher::PageFetcher;
use crate::services::normalizer::{normalize, ListingDetails, RawDetail};
use crate::utils::{concurrency::map_bounded, time};

#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeOptions {
    pub max_pages: u32,
    pub workers: usize,
    /// Random pause between result pages is drawn from this window.
    pub page_delay: (Duration, Duration),
    /// Follow apply links to their final landing URL.
    pub resolve_apply_urls: bool,
    /// Keep only listings whose description contains an email address.
    pub require_email: bool,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self::from(&ScrapeSettings::default())
    }
}

impl From<&ScrapeSettings> for ScrapeOptions {
    fn from(settings: &ScrapeSettings) -> Self {
        Self {
            max_pages: settings.max_pages,
            workers: settings.workers,
            page_delay: settings.page_delay(),
            resolve_apply_urls: settings.resolve_apply_urls,
            require_email: false,
        }
    }
}

/// State of one scrape run: the fetcher, the options and everything
/// collected so far.
pub struct ScrapeContext {
    fetcher: Arc<dyn PageFetcher>,
    options: ScrapeOptions,
    known_ids: Option<HashSet<String>>,
    listings: Vec<ListingRecord>,
}

/// Everything a detail task needs, shared by the tasks of one page.
struct PageScope {
    board: Arc<dyn JobBoard>,
    fetcher: Arc<dyn PageFetcher>,
    keyword: String,
    location: String,
    resolve_apply_urls: bool,
    require_email: bool,
}

impl ScrapeContext {
    pub fn new(fetcher: Arc<dyn PageFetcher>, options: ScrapeOptions) -> Self {
        Self {
            fetcher,
            options,
            known_ids: None,
            listings: Vec::new(),
        }
    }

    /// Skip result cards whose id is in `ids` or was already collected in
    /// this run.
    pub fn with_known_ids(mut self, ids: HashSet<String>) -> Self {
        self.known_ids = Some(ids);
        self
    }

    pub fn listings(&self) -> &[ListingRecord] {
        &self.listings
    }

    pub fn into_listings(self) -> Vec<ListingRecord> {
        self.listings
    }

    /// Every keyword against every location, one pair at a time. An empty
    /// location list searches without a location.
    pub async fn scrape_all(
        &mut self,
        board: Arc<dyn JobBoard>,
        keywords: &[String],
        locations: &[String],
    ) -> usize {
        let no_location = [String::new()];
        let locations = if locations.is_empty() {
            &no_location[..]
        } else {
            locations
        };

        let mut total = 0;
        for keyword in keywords {
            for location in locations {
                total += self.scrape(board.clone(), keyword, location).await;
            }
        }
        total
    }

    /// Walks the result pages for one keyword and location, returning how
    /// many listings were added.
    #[instrument(skip(self, board), fields(source = board.source()))]
    pub async fn scrape(&mut self, board: Arc<dyn JobBoard>, keyword: &str, location: &str) -> usize {
        info!("Starting scrape");
        let before = self.listings.len();
        let mut last_page = self.options.max_pages;
        let mut page = 1;

        while page <= last_page {
            if page > 1 {
                let (min, max) = self.options.page_delay;
                tokio::time::sleep(time::jittered(min, max)).await;
            }

            let url = board.search_url(keyword, location, page);
            info!(page, url = %url, "Scraping results page");

            let body = match self.fetcher.fetch(&url).await {
                Ok(fetched) => fetched.body,
                Err(err) => {
                    warn!(page, error = %err, "Failed to fetch results page");
                    break;
                }
            };
            let results = match board.parse_results(&body) {
                Ok(results) => results,
                Err(err) => {
                    warn!(page, error = %err, "Failed to parse results page");
                    break;
                }
            };

            if let Some(cap) = results.page_cap {
                last_page = last_page.min(cap);
            }
            let is_last = results.is_last();
            let stubs = self.unseen(results.listings);

            let scope = Arc::new(PageScope {
                board: board.clone(),
                fetcher: self.fetcher.clone(),
                keyword: keyword.to_string(),
                location: location.to_string(),
                resolve_apply_urls: self.options.resolve_apply_urls,
                require_email: self.options.require_email,
            });
            let records = map_bounded(stubs, self.options.workers, move |stub| {
                let scope = scope.clone();
                async move { scope.build_record(stub).await }
            })
            .await;

            let found = self.collect(records.into_iter().flatten());
            info!(page, found, "Finished results page");

            if is_last {
                info!(page, "No more listings");
                break;
            }
            page += 1;
        }

        let added = self.listings.len() - before;
        info!(added, "Completed scrape");
        added
    }

    fn unseen(&self, stubs: Vec<ListingStub>) -> Vec<ListingStub> {
        match &self.known_ids {
            Some(known) => stubs
                .into_iter()
                .filter(|stub| !known.contains(&stub.id))
                .collect(),
            None => stubs,
        }
    }

    fn collect(&mut self, records: impl Iterator<Item = ListingRecord>) -> usize {
        let mut found = 0;
        for record in records {
            if let Some(known) = self.known_ids.as_mut() {
                if !known.insert(record.id.clone()) {
                    continue;
                }
            }
            self.listings.push(record);
            found += 1;
        }
        found
    }
}

impl PageScope {
    /// Fetches and normalizes one listing. A failed detail fetch keeps the
    /// listing with placeholder fields.
    async fn build_record(&self, stub: ListingStub) -> Option<ListingRecord> {
        let now = time::now();

        let (details, apply_target) = match self.fetch_detail(&stub.url).await {
            Some(raw) => {
                let mut details = normalize(raw.or(stub.card.clone()), self.board.base_url(), now);
                let target = details
                    .apply_url
                    .take()
                    .map(|url| url.to_string())
                    .unwrap_or_else(|| stub.url.clone());
                (details, Some(target))
            }
            None => (ListingDetails::placeholder(now.date_naive()), None),
        };

        if self.require_email && details.emails.is_empty() {
            debug!(url = %stub.url, "Skipping listing without email");
            return None;
        }

        let apply_url = match apply_target {
            Some(target) => self.resolve_apply_url(target).await,
            None => String::new(),
        };

        Some(ListingRecord {
            id: stub.id,
            search_keyword: self.keyword.clone(),
            location: stub.location.unwrap_or_else(|| self.location.clone()),
            title: stub.title,
            employer: details.employer,
            work_type: details.work_type,
            salary: details.salary,
            min_salary: details.salary_range.min,
            max_salary: details.salary_range.max,
            pay_period: details.salary_range.period,
            date_posted: details.date_posted,
            summary: details.summary,
            description_html: details.description_html,
            listing_url: stub.url,
            apply_url,
            emails: details.emails,
            source: self.board.source().to_string(),
            scraped_at: now,
        })
    }

    async fn fetch_detail(&self, url: &str) -> Option<RawDetail> {
        let fetched = match self.fetcher.fetch(url).await {
            Ok(fetched) => fetched,
            Err(err) => {
                warn!(url = %url, error = %err, "Failed to fetch listing detail");
                return None;
            }
        };
        match self.board.parse_detail(&fetched.body) {
            Ok(raw) => Some(raw),
            Err(err) => {
                warn!(url = %url, error = %err, "Failed to parse listing detail");
                None
            }
        }
    }

    /// Final landing URL of `target`, or `target` itself when it cannot be
    /// followed.
    async fn resolve_apply_url(&self, target: String) -> String {
        if !self.resolve_apply_urls {
            return target;
        }
        match self.fetcher.fetch(&target).await {
            Ok(landing) => landing.url,
            Err(err) => {
                debug!(url = %target, error = %err, "Keeping unresolved apply URL");
                target
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::services::boards::Jora;
    use crate::services::fetcher::{FetchedPage, MockPageFetcher};
    use crate::services::normalizer::{
        DESCRIPTION_PLACEHOLDER, EMPLOYER_PLACEHOLDER, SALARY_PLACEHOLDER, SUMMARY_PLACEHOLDER,
    };
    use std::io;

    const SEARCH: &str = "https://au.jora.com/j?q=Bartender&l=Sydney&p=";

    fn results_page(slugs: &[&str]) -> String {
        let cards: String = slugs
            .iter()
            .map(|slug| {
                format!(
                    r#"<div class="result"><a class="job-title" href="/job/{slug}">{slug}</a></div>"#
                )
            })
            .collect();
        format!("<html><body>{cards}</body></html>")
    }

    fn detail_page(email: Option<&str>) -> String {
        let contact = email.map(|e| format!(" Send CV to {e}")).unwrap_or_default();
        format!(
            r#"<html><body>
                 <span class="company">Harbour Bar</span>
                 <div class="badge -default-badge"><div class="content">$30 per hour</div></div>
                 <div class="description"><p>Cocktail bartender wanted.{contact}</p></div>
                 <a data-automation="job-detail-apply-button" href="/job/rd/apply">Apply</a>
               </body></html>"#
        )
    }

    fn page(url: &str, body: String) -> crate::error::Result<FetchedPage> {
        Ok(FetchedPage {
            url: url.to_string(),
            body,
        })
    }

    fn options() -> ScrapeOptions {
        ScrapeOptions {
            max_pages: 4,
            workers: 2,
            page_delay: (Duration::ZERO, Duration::ZERO),
            resolve_apply_urls: false,
            require_email: false,
        }
    }

    fn jora() -> Arc<dyn JobBoard> {
        Arc::new(Jora::new().unwrap())
    }

    #[tokio::test]
    async fn pagination_stops_on_first_empty_page() {
        let mut fetcher = MockPageFetcher::new();
        fetcher.expect_fetch().returning(|url: &str| {
            let body = if url == format!("{SEARCH}1") {
                results_page(&["Bartender-a1"])
            } else if url == format!("{SEARCH}2") {
                results_page(&["Bartender-b2", "Barista-c3"])
            } else if url.starts_with(SEARCH) {
                results_page(&[])
            } else {
                detail_page(None)
            };
            page(url, body)
        });

        let mut ctx = ScrapeContext::new(Arc::new(fetcher), options());
        let added = ctx.scrape(jora(), "Bartender", "Sydney").await;

        assert_eq!(added, 3);
        let ids: Vec<_> = ctx.listings().iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "b2", "c3"]);
        let first = &ctx.listings()[0];
        assert_eq!(first.employer, "Harbour Bar");
        assert_eq!(first.min_salary, Some(30.0));
        assert_eq!(first.search_keyword, "Bartender");
        assert_eq!(first.location, "Sydney");
        assert_eq!(first.source, "Jora Australia");
        assert_eq!(first.apply_url, "https://au.jora.com/job/rd/apply");
    }

    #[tokio::test]
    async fn page_cap_limits_requests() {
        let mut fetcher = MockPageFetcher::new();
        fetcher
            .expect_fetch()
            .withf(|url: &str| url.starts_with(SEARCH))
            .times(2)
            .returning(|url: &str| {
                let slug = format!("x-{}", &url[url.len() - 1..]);
                page(url, results_page(&[slug.as_str()]))
            });
        fetcher
            .expect_fetch()
            .returning(|url: &str| page(url, detail_page(None)));

        let mut ctx = ScrapeContext::new(
            Arc::new(fetcher),
            ScrapeOptions {
                max_pages: 2,
                ..options()
            },
        );
        assert_eq!(ctx.scrape(jora(), "Bartender", "Sydney").await, 2);
    }

    #[tokio::test]
    async fn transport_error_on_detail_yields_placeholders() {
        let mut fetcher = MockPageFetcher::new();
        fetcher.expect_fetch().returning(|url: &str| {
            if url.starts_with(SEARCH) {
                let slugs: &[&str] = if url.ends_with("p=1") { &["ok-1", "down-2"] } else { &[] };
                page(url, results_page(slugs))
            } else if url.contains("down-2") {
                Err(Error::Io(io::Error::new(io::ErrorKind::ConnectionReset, "reset")))
            } else {
                page(url, detail_page(None))
            }
        });

        let mut ctx = ScrapeContext::new(Arc::new(fetcher), options());
        ctx.scrape(jora(), "Bartender", "Sydney").await;

        let listings = ctx.into_listings();
        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].employer, "Harbour Bar");

        let failed = &listings[1];
        assert_eq!(failed.id, "2");
        assert_eq!(failed.employer, EMPLOYER_PLACEHOLDER);
        assert_eq!(failed.salary, SALARY_PLACEHOLDER);
        assert_eq!(failed.summary, SUMMARY_PLACEHOLDER);
        assert_eq!(failed.description_html, DESCRIPTION_PLACEHOLDER);
        assert_eq!(failed.work_type, None);
        assert_eq!((failed.min_salary, failed.max_salary), (None, None));
        assert_eq!(failed.pay_period, None);
        assert_eq!(failed.apply_url, "");
        assert_eq!(failed.date_posted, failed.scraped_at.date_naive());
        assert!(listings
            .iter()
            .all(|l| l.scraped_at.timestamp_subsec_nanos() % 1_000 == 0));
    }

    #[tokio::test]
    async fn results_fetch_failure_ends_the_run() {
        let mut fetcher = MockPageFetcher::new();
        fetcher.expect_fetch().times(1).returning(|url: &str| {
            Err(Error::UnexpectedStatus {
                url: url.to_string(),
                status: 403,
            })
        });

        let mut ctx = ScrapeContext::new(Arc::new(fetcher), options());
        assert_eq!(ctx.scrape(jora(), "Bartender", "Sydney").await, 0);
        assert!(ctx.listings().is_empty());
    }

    #[tokio::test]
    async fn known_ids_are_skipped_across_pairs() {
        let mut fetcher = MockPageFetcher::new();
        fetcher.expect_fetch().returning(|url: &str| {
            if url.contains("/j?") {
                let slugs: &[&str] = if url.ends_with("p=1") { &["old-1", "new-2"] } else { &[] };
                page(url, results_page(slugs))
            } else {
                page(url, detail_page(None))
            }
        });

        let known = HashSet::from(["1".to_string()]);
        let mut ctx = ScrapeContext::new(Arc::new(fetcher), options()).with_known_ids(known);
        let added = ctx
            .scrape_all(
                jora(),
                &["Bartender".to_string()],
                &["Sydney".to_string(), "Perth".to_string()],
            )
            .await;

        assert_eq!(added, 1);
        assert_eq!(ctx.listings()[0].id, "2");
        assert_eq!(ctx.listings()[0].location, "Sydney");
    }

    #[tokio::test]
    async fn email_mode_drops_listings_without_address() {
        let mut fetcher = MockPageFetcher::new();
        fetcher.expect_fetch().returning(|url: &str| {
            if url.starts_with(SEARCH) {
                let slugs: &[&str] = if url.ends_with("p=1") {
                    &["mail-1", "nomail-2", "down-3"]
                } else {
                    &[]
                };
                page(url, results_page(slugs))
            } else if url.contains("down-3") {
                Err(Error::Io(io::Error::new(io::ErrorKind::TimedOut, "timeout")))
            } else if url.contains("nomail") {
                page(url, detail_page(None))
            } else {
                page(url, detail_page(Some("bar@harbour.com.au")))
            }
        });

        let mut ctx = ScrapeContext::new(
            Arc::new(fetcher),
            ScrapeOptions {
                require_email: true,
                ..options()
            },
        );
        ctx.scrape(jora(), "Bartender", "Sydney").await;

        let listings = ctx.into_listings();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].emails, vec!["bar@harbour.com.au"]);
    }

    #[tokio::test]
    async fn apply_link_is_followed_to_its_landing_page() {
        let mut fetcher = MockPageFetcher::new();
        fetcher.expect_fetch().returning(|url: &str| {
            if url.starts_with(SEARCH) {
                let slugs: &[&str] = if url.ends_with("p=1") { &["job-1"] } else { &[] };
                page(url, results_page(slugs))
            } else if url.ends_with("/job/rd/apply") {
                page("https://careers.harbour.com.au/apply/77", String::new())
            } else {
                page(url, detail_page(None))
            }
        });

        let mut ctx = ScrapeContext::new(
            Arc::new(fetcher),
            ScrapeOptions {
                resolve_apply_urls: true,
                ..options()
            },
        );
        ctx.scrape(jora(), "Bartender", "Sydney").await;
        assert_eq!(
            ctx.listings()[0].apply_url,
            "https://careers.harbour.com.au/apply/77"
        );
    }
}
