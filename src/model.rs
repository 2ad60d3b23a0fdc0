use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: u64,
    pub name: String,
    #[serde(deserialize_with = "number_or_string")]
    pub price: f64,
    #[serde(deserialize_with = "number_or_string")]
    pub quantity: f64,
    #[serde(default, deserialize_with = "string_or_null")]
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub current_page: u32,
    pub last_page: u32,
    pub per_page: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Pagination {
            current_page: 1,
            last_page: 1,
            per_page: 10,
        }
    }
}

impl Pagination {
    /// Servers report `last_page: 0` for an empty result; the UI always has
    /// at least one page to show.
    pub fn normalized(self) -> Self {
        let last_page = self.last_page.max(1);
        Pagination {
            current_page: self.current_page.clamp(1, last_page),
            last_page,
            per_page: self.per_page,
        }
    }

    pub fn contains(&self, page: u32) -> bool {
        page >= 1 && page <= self.last_page
    }

    pub fn is_first(&self) -> bool {
        self.current_page <= 1
    }

    pub fn is_last(&self) -> bool {
        self.current_page >= self.last_page
    }
}

/// Body of `GET /api/products/list`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProductPage {
    pub data: Vec<Product>,
    pub current_page: u32,
    pub last_page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn default_per_page() -> u32 {
    Pagination::default().per_page
}

impl ProductPage {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            current_page: self.current_page,
            last_page: self.last_page,
            per_page: self.per_page,
        }
        .normalized()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    #[serde(default, deserialize_with = "number_or_string")]
    pub total_products: f64,
    #[serde(default, deserialize_with = "number_or_string")]
    pub total_quantity: f64,
    #[serde(default, deserialize_with = "number_or_string")]
    pub average_price: f64,
}

/// Time granularity of the dashboard line chart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Filter {
    #[default]
    Day,
    Month,
    Year,
}

impl Filter {
    pub const ALL: [Filter; 3] = [Filter::Day, Filter::Month, Filter::Year];

    pub fn as_query(&self) -> &'static str {
        match self {
            Filter::Day => "day",
            Filter::Month => "month",
            Filter::Year => "year",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Filter::Day => "Day",
            Filter::Month => "Month",
            Filter::Year => "Year",
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_query())
    }
}

/// One point of the line chart. The server decides ordering and spacing.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "RawPoint")]
pub struct SeriesPoint {
    pub at: DateTime<Utc>,
    pub value: f64,
}

impl SeriesPoint {
    pub fn new(at: DateTime<Utc>, value: f64) -> Self {
        SeriesPoint { at, value }
    }

    /// X coordinate used by the chart: seconds since the Unix epoch.
    pub fn x(&self) -> f64 {
        self.at.timestamp_millis() as f64 / 1000.0
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPoint {
    Object { x: RawTime, y: RawNumber },
    Pair(RawTime, RawNumber),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTime {
    Millis(i64),
    Fractional(f64),
    Text(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Number(f64),
    Text(String),
    Null(()),
}

impl TryFrom<RawPoint> for SeriesPoint {
    type Error = String;

    fn try_from(raw: RawPoint) -> Result<Self, Self::Error> {
        let (x, y) = match raw {
            RawPoint::Object { x, y } => (x, y),
            RawPoint::Pair(x, y) => (x, y),
        };
        let at = match x {
            RawTime::Millis(year @ 1000..=9999) => parse_timestamp(&year.to_string())?,
            RawTime::Millis(ms) => millis_to_utc(ms)?,
            RawTime::Fractional(ms) => millis_to_utc(ms.round() as i64)?,
            RawTime::Text(text) => parse_timestamp(&text)?,
        };
        Ok(SeriesPoint {
            at,
            value: y.into_f64()?,
        })
    }
}

impl RawNumber {
    fn into_f64(self) -> Result<f64, String> {
        match self {
            RawNumber::Number(n) => Ok(n),
            RawNumber::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("invalid number: {s:?}")),
            RawNumber::Null(()) => Ok(0.0),
        }
    }
}

fn millis_to_utc(ms: i64) -> Result<DateTime<Utc>, String> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| format!("timestamp out of range: {ms}"))
}

/// Accepts epoch milliseconds as text, RFC 3339, `YYYY-MM-DD HH:MM:SS`,
/// `YYYY-MM-DD`, `YYYY-MM` and `YYYY`.
pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, String> {
    let text = text.trim();

    if let Ok(ms) = text.parse::<i64>() {
        // A bare 4-digit value is a year bucket, not milliseconds
        if text.len() != 4 {
            return millis_to_utc(ms);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, fmt) {
            return Ok(naive.and_utc());
        }
    }

    let padded = match text.len() {
        4 => format!("{text}-01-01"),
        7 => format!("{text}-01"),
        _ => text.to_string(),
    };
    NaiveDate::parse_from_str(&padded, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("unrecognized timestamp: {text:?}"))
}

// Decimal columns often arrive as JSON strings ("9.99").
fn number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    RawNumber::deserialize(deserializer)?
        .into_f64()
        .map_err(serde::de::Error::custom)
}

fn string_or_null<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
