use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, Row};
use utoipa::ToSchema;

#[derive(Debug, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkType {
    FullTime,
    PartTime,
    Contract,
    Casual,
    Internship,
    Freelance,
    Other,
}

impl WorkType {
    pub const ALL: [WorkType; 7] = [
        WorkType::FullTime,
        WorkType::PartTime,
        WorkType::Contract,
        WorkType::Casual,
        WorkType::Internship,
        WorkType::Freelance,
        WorkType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkType::FullTime => "FULL_TIME",
            WorkType::PartTime => "PART_TIME",
            WorkType::Contract => "CONTRACT",
            WorkType::Casual => "CASUAL",
            WorkType::Internship => "INTERNSHIP",
            WorkType::Freelance => "FREELANCE",
            WorkType::Other => "OTHER",
        }
    }
}

impl fmt::Display for WorkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WorkType::ALL
            .into_iter()
            .find(|wt| wt.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "work type",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PayPeriod {
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl PayPeriod {
    pub const ALL: [PayPeriod; 5] = [
        PayPeriod::Hourly,
        PayPeriod::Daily,
        PayPeriod::Weekly,
        PayPeriod::Monthly,
        PayPeriod::Yearly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PayPeriod::Hourly => "hourly",
            PayPeriod::Daily => "daily",
            PayPeriod::Weekly => "weekly",
            PayPeriod::Monthly => "monthly",
            PayPeriod::Yearly => "yearly",
        }
    }
}

impl fmt::Display for PayPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PayPeriod {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PayPeriod::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "pay period",
                value: s.to_string(),
            })
    }
}

/// One scraped job posting. The same shape is written to every sink and
/// served by the listings route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ListingRecord {
    pub id: String,
    pub search_keyword: String,
    pub location: String,
    pub title: String,
    pub employer: String,
    pub work_type: Option<WorkType>,
    pub salary: String,
    pub min_salary: Option<f64>,
    pub max_salary: Option<f64>,
    pub pay_period: Option<PayPeriod>,
    pub date_posted: NaiveDate,
    pub summary: String,
    pub description_html: String,
    pub listing_url: String,
    pub apply_url: String,
    #[serde(default)]
    pub emails: Vec<String>,
    pub source: String,
    pub scraped_at: DateTime<Utc>,
}

impl ListingRecord {
    /// True when no field is empty or absent. Used by the strict sink filter.
    pub fn is_complete(&self) -> bool {
        let texts = [
            &self.id,
            &self.search_keyword,
            &self.location,
            &self.title,
            &self.employer,
            &self.salary,
            &self.summary,
            &self.description_html,
            &self.listing_url,
            &self.apply_url,
            &self.source,
        ];
        texts.iter().all(|t| !t.trim().is_empty())
            && self.work_type.is_some()
            && self.min_salary.is_some()
            && self.max_salary.is_some()
            && self.pay_period.is_some()
    }
}

fn decode_column<T>(row: &PgRow, column: &str) -> sqlx::Result<Option<T>>
where
    T: FromStr<Err = UnknownVariant>,
{
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|value| value.parse::<T>())
        .transpose()
        .map_err(|e| sqlx::Error::ColumnDecode {
            index: column.to_string(),
            source: Box::new(e),
        })
}

impl<'r> FromRow<'r, PgRow> for ListingRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            search_keyword: row.try_get("search_keyword")?,
            location: row.try_get("location")?,
            title: row.try_get("title")?,
            employer: row.try_get("employer")?,
            work_type: decode_column(row, "work_type")?,
            salary: row.try_get("salary")?,
            min_salary: row.try_get("min_salary")?,
            max_salary: row.try_get("max_salary")?,
            pay_period: decode_column(row, "pay_period")?,
            date_posted: row.try_get("date_posted")?,
            summary: row.try_get("summary")?,
            description_html: row.try_get("description_html")?,
            listing_url: row.try_get("listing_url")?,
            apply_url: row.try_get("apply_url")?,
            emails: row.try_get("emails")?,
            source: row.try_get("source")?,
            scraped_at: row.try_get("scraped_at")?,
        })
    }
}
