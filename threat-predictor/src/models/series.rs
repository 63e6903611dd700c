//! Per-type time series derived from a prediction request

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use super::ThreatRecord;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub count: u64,
}

/// Chronologically ordered observations for one threat type
#[derive(Debug, Clone)]
pub struct ThreatSeries {
    pub threat_type: String,
    pub points: Vec<SeriesPoint>,
    /// Dates were fabricated because at least one input date was unparseable
    pub synthetic_dates: bool,
}

impl ThreatSeries {
    /// Build a series from the records of a single group.
    ///
    /// If any date fails to parse, every date in the group is replaced by a
    /// daily sequence starting at `today`, in record order.
    pub fn from_records(threat_type: &str, records: &[&ThreatRecord], today: NaiveDate) -> Self {
        let parsed: Option<Vec<NaiveDate>> = records
            .iter()
            .map(|r| parse_date(&r.date))
            .collect();

        let synthetic_dates = parsed.is_none();
        let dates = parsed.unwrap_or_else(|| synthetic_dates_from(today, records.len()));

        let mut points: Vec<SeriesPoint> = records
            .iter()
            .zip(dates)
            .map(|(r, date)| SeriesPoint { date, count: r.count })
            .collect();

        // Stable: equal dates keep input order
        points.sort_by_key(|p| p.date);

        Self {
            threat_type: threat_type.to_string(),
            points,
            synthetic_dates,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn counts(&self) -> Vec<u64> {
        self.points.iter().map(|p| p.count).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// Days between the first and last observation
    pub fn span_days(&self) -> i64 {
        match (self.first_date(), self.last_date()) {
            (Some(first), Some(last)) => (last - first).num_days(),
            _ => 0,
        }
    }
}

/// Parse a calendar date from the formats clients send in practice
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
}

fn synthetic_dates_from(start: NaiveDate, len: usize) -> Vec<NaiveDate> {
    start.iter_days().take(len).collect()
}
