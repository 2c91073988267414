//! Turns the raw text fragments of a listing into typed fields.
//!
//! Everything here is pure: the caller supplies "now" and the site base URL,
//! so the same input always normalizes to the same output.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

use crate::models::listing::{PayPeriod, WorkType};

pub const EMPLOYER_PLACEHOLDER: &str = "Employer not specified";
pub const SALARY_PLACEHOLDER: &str = "Salary not specified";
pub const SUMMARY_PLACEHOLDER: &str = "Summary not available";
pub const DESCRIPTION_PLACEHOLDER: &str = "No description available";

const SIGN_IN_PATH: &str = "/users/sign_in";
const RETURN_TO_PARAM: &str = "return_to";
const SUMMARY_FALLBACK_CHARS: usize = 200;
const CURRENCY_SYMBOLS: [char; 5] = ['$', '€', '£', '¥', '₹'];

/// Fragment → category pairs, evaluated in order against the normalized
/// badge text. First match wins.
pub const WORK_TYPE_PATTERNS: &[(&str, WorkType)] = &[
    ("FULL", WorkType::FullTime),
    ("PERMANENT", WorkType::FullTime),
    ("PART", WorkType::PartTime),
    ("CONTRACT", WorkType::Contract),
    ("FIXED_TERM", WorkType::Contract),
    ("CASUAL", WorkType::Casual),
    ("INTERN", WorkType::Internship),
    ("FREELANCE", WorkType::Freelance),
    ("SELF_EMPLOYED", WorkType::Freelance),
];

/// Phrase → pay period pairs, evaluated in order against lowercased salary text.
pub const PAY_PERIOD_PATTERNS: &[(&str, PayPeriod)] = &[
    ("per hour", PayPeriod::Hourly),
    ("an hour", PayPeriod::Hourly),
    ("per day", PayPeriod::Daily),
    ("a day", PayPeriod::Daily),
    ("per week", PayPeriod::Weekly),
    ("a week", PayPeriod::Weekly),
    ("per month", PayPeriod::Monthly),
    ("a month", PayPeriod::Monthly),
    ("per year", PayPeriod::Yearly),
    ("a year", PayPeriod::Yearly),
    ("annual", PayPeriod::Yearly),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AgeUnit {
    Hour,
    Day,
    Week,
    Month,
}

impl AgeUnit {
    fn span(self, count: i64) -> Option<Duration> {
        match self {
            AgeUnit::Hour => Duration::try_hours(count),
            AgeUnit::Day => Duration::try_days(count),
            AgeUnit::Week => Duration::try_weeks(count),
            // Calendar months are approximated as 30 days.
            AgeUnit::Month => count.checked_mul(30).and_then(Duration::try_days),
        }
    }
}

lazy_static! {
    static ref NUMBER_RE: Regex = Regex::new(r"\d+(?:\.\d+)?").unwrap();
    static ref FIRST_INTEGER_RE: Regex = Regex::new(r"\d+").unwrap();
    static ref EMAIL_RE: Regex =
        Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").unwrap();

    // Priority order: hour, day, week, month.
    static ref AGE_UNITS: Vec<(Regex, AgeUnit)> = vec![
        (Regex::new(r"(?:\b|\d)(?:hours?|hrs?)\b|\d\s*h\b").unwrap(), AgeUnit::Hour),
        (Regex::new(r"(?:\b|\d)days?\b|\d\s*d\b").unwrap(), AgeUnit::Day),
        (Regex::new(r"(?:\b|\d)weeks?\b|\d\s*w\b").unwrap(), AgeUnit::Week),
        (Regex::new(r"(?:\b|\d)months?\b|\d\s*mo\b").unwrap(), AgeUnit::Month),
    ];
}

/// Raw fragments pulled off a detail page or a result card.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawDetail {
    pub employer: Option<String>,
    pub salary: Option<String>,
    pub work_type: Option<String>,
    pub posted: Option<String>,
    pub description_html: Option<String>,
    pub description_text: Option<String>,
    pub apply_href: Option<String>,
}

impl RawDetail {
    /// Fills every missing fragment from `fallback`.
    pub fn or(self, fallback: RawDetail) -> RawDetail {
        RawDetail {
            employer: self.employer.or(fallback.employer),
            salary: self.salary.or(fallback.salary),
            work_type: self.work_type.or(fallback.work_type),
            posted: self.posted.or(fallback.posted),
            description_html: self.description_html.or(fallback.description_html),
            description_text: self.description_text.or(fallback.description_text),
            apply_href: self.apply_href.or(fallback.apply_href),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SalaryRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub period: Option<PayPeriod>,
}

/// Normalized detail fields of one listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingDetails {
    pub employer: String,
    pub work_type: Option<WorkType>,
    pub salary: String,
    pub salary_range: SalaryRange,
    pub date_posted: NaiveDate,
    pub summary: String,
    pub description_html: String,
    /// Apply target resolved against the site, before any redirect is followed.
    pub apply_url: Option<Url>,
    pub emails: Vec<String>,
}

impl ListingDetails {
    /// Sentinel values used when the detail page could not be fetched.
    pub fn placeholder(today: NaiveDate) -> Self {
        Self {
            employer: EMPLOYER_PLACEHOLDER.to_string(),
            work_type: None,
            salary: SALARY_PLACEHOLDER.to_string(),
            salary_range: SalaryRange::default(),
            date_posted: today,
            summary: SUMMARY_PLACEHOLDER.to_string(),
            description_html: DESCRIPTION_PLACEHOLDER.to_string(),
            apply_url: None,
            emails: Vec::new(),
        }
    }
}

pub fn normalize(raw: RawDetail, base: &Url, now: DateTime<Utc>) -> ListingDetails {
    let employer = non_empty(raw.employer).unwrap_or_else(|| EMPLOYER_PLACEHOLDER.to_string());
    let salary_text = non_empty(raw.salary);
    let salary_range = salary_text
        .as_deref()
        .map(parse_salary)
        .unwrap_or_default();
    let date_posted = raw
        .posted
        .as_deref()
        .map(|text| parse_posted_date(text, now))
        .unwrap_or_else(|| now.date_naive());
    let description_text = raw.description_text.unwrap_or_default();
    let summary = summarize(&description_text);
    let description_html =
        non_empty(raw.description_html).unwrap_or_else(|| DESCRIPTION_PLACEHOLDER.to_string());
    let apply_url = raw
        .apply_href
        .as_deref()
        .and_then(|href| resolve_apply_url(href, base));

    ListingDetails {
        employer,
        work_type: normalize_work_type(raw.work_type.as_deref()),
        salary: salary_text.unwrap_or_else(|| SALARY_PLACEHOLDER.to_string()),
        salary_range,
        date_posted,
        summary,
        description_html,
        apply_url,
        emails: extract_emails(&description_text),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn normalize_work_type(raw: Option<&str>) -> Option<WorkType> {
    let normalized = raw?
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
        .to_uppercase();
    if normalized.is_empty() {
        return None;
    }
    if let Ok(exact) = normalized.parse::<WorkType>() {
        return Some(exact);
    }
    WORK_TYPE_PATTERNS
        .iter()
        .find(|(pattern, _)| normalized.contains(pattern))
        .map(|(_, work_type)| *work_type)
}

pub fn parse_salary(text: &str) -> SalaryRange {
    let lowered = text.to_lowercase();
    if lowered.trim().is_empty() || lowered.contains("not specified") {
        return SalaryRange::default();
    }

    let cleaned: String = lowered
        .chars()
        .filter(|c| *c != ',' && !CURRENCY_SYMBOLS.contains(c))
        .collect();

    let period = PAY_PERIOD_PATTERNS
        .iter()
        .find(|(phrase, _)| cleaned.contains(phrase))
        .map(|(_, period)| *period);

    let numbers: Option<Vec<f64>> = NUMBER_RE
        .find_iter(&cleaned)
        .take(2)
        .map(|m| m.as_str().parse::<f64>().ok().filter(|n| n.is_finite()))
        .collect();

    let (min, max) = match numbers.as_deref() {
        Some([only]) => (Some(*only), Some(*only)),
        Some([first, second]) if first <= second => (Some(*first), Some(*second)),
        Some([first, second]) => (Some(*second), Some(*first)),
        _ => (None, None),
    };

    SalaryRange { min, max, period }
}

/// Converts "3 days ago" style text into a calendar date relative to `now`.
/// Text without a recognised unit, or with a unit but no usable number,
/// resolves to today.
pub fn parse_posted_date(text: &str, now: DateTime<Utc>) -> NaiveDate {
    let today = now.date_naive();
    let lowered = text.to_lowercase();

    let Some(unit) = AGE_UNITS
        .iter()
        .find(|(pattern, _)| pattern.is_match(&lowered))
        .map(|(_, unit)| *unit)
    else {
        return today;
    };

    let Some(count) = FIRST_INTEGER_RE
        .find(&lowered)
        .and_then(|m| m.as_str().parse::<i64>().ok())
    else {
        return today;
    };

    unit.span(count)
        .and_then(|span| now.checked_sub_signed(span))
        .map(|posted| posted.date_naive())
        .unwrap_or(today)
}

pub fn summarize(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return SUMMARY_PLACEHOLDER.to_string();
    }
    match collapsed.find('.') {
        Some(idx) => format!("{}.", collapsed[..idx].trim()),
        None => {
            let head: String = collapsed.chars().take(SUMMARY_FALLBACK_CHARS).collect();
            format!("{}...", head)
        }
    }
}

pub fn extract_emails(text: &str) -> Vec<String> {
    EMAIL_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Resolves an apply link against the site. Sign-in redirects are unwrapped
/// to their `return_to` target.
pub fn resolve_apply_url(href: &str, base: &Url) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    let joined = base.join(href).ok()?;
    if joined.path().starts_with(SIGN_IN_PATH) {
        let target = joined
            .query_pairs()
            .find(|(key, _)| key == RETURN_TO_PARAM)
            .map(|(_, value)| value.into_owned());
        if let Some(target) = target {
            return base.join(&target).ok();
        }
    }
    Some(joined)
}
