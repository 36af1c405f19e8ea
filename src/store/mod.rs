//! Visit table access.
//!
//! [`VisitStore`] is the seam between the handler and DynamoDB. Scans are
//! exposed one page at a time; [`scan_all`] drives the cursor loop.

mod dynamo;
#[cfg(test)]
pub(crate) mod memory;

pub use dynamo::DynamoVisitStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::VisitorRecord;

pub const KEY_ATTR: &str = "visitor_ip";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("get_item failed for {ip}: {message}")]
    Get { ip: String, message: String },
    #[error("update_item failed for {ip}: {message}")]
    Update { ip: String, message: String },
    #[error("scan failed: {0}")]
    Scan(String),
    #[error("count scan failed: {0}")]
    Count(String),
    #[error("malformed item: {0}")]
    Malformed(String),
}

/// Attributes of a visitor row that a scan can project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    VisitorIp,
    VisitCount,
    FirstVisit,
    LastVisit,
}

impl Attribute {
    pub fn name(self) -> &'static str {
        match self {
            Attribute::VisitorIp => KEY_ATTR,
            Attribute::VisitCount => "visit_count",
            Attribute::FirstVisit => "first_visit",
            Attribute::LastVisit => "last_visit",
        }
    }
}

/// A scanned row restricted to the projected attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialVisitor {
    pub visitor_ip: Option<String>,
    pub visit_count: Option<u64>,
    pub first_visit: Option<String>,
    pub last_visit: Option<String>,
}

/// Continuation cursor: the key of the last row the previous page returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanCursor(pub String);

#[derive(Debug, Default)]
pub struct ScanPage {
    pub items: Vec<PartialVisitor>,
    pub next: Option<ScanCursor>,
}

#[derive(Debug, Default)]
pub struct CountPage {
    pub count: u64,
    pub next: Option<ScanCursor>,
}

#[async_trait]
pub trait VisitStore: Send + Sync {
    /// Point lookup. `Ok(None)` when the IP was never recorded.
    async fn fetch(&self, ip: &str) -> Result<Option<VisitorRecord>, StoreError>;

    /// Atomically bump `visit_count`, stamp `last_visit` with `now` and set
    /// `first_visit` on creation. Returns the row as written.
    async fn upsert_increment(
        &self,
        ip: &str,
        now: DateTime<Utc>,
    ) -> Result<VisitorRecord, StoreError>;

    async fn scan_page(
        &self,
        projection: &[Attribute],
        cursor: Option<ScanCursor>,
    ) -> Result<ScanPage, StoreError>;

    /// One page of a count-only scan.
    async fn count_page(&self, cursor: Option<ScanCursor>) -> Result<CountPage, StoreError>;
}

/// Full-table scan, following continuation cursors until the last page.
pub async fn scan_all(
    store: &dyn VisitStore,
    projection: &[Attribute],
) -> Result<Vec<PartialVisitor>, StoreError> {
    let mut items = Vec::new();
    let mut cursor = None;
    loop {
        let page = store.scan_page(projection, cursor.take()).await?;
        items.extend(page.items);
        match page.next {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }
    Ok(items)
}

/// Timestamp format stored in `first_visit` / `last_visit`: RFC 3339 with a
/// `+00:00` offset, microseconds only when non-zero.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    let precision = if ts.timestamp_subsec_micros() == 0 {
        chrono::SecondsFormat::Secs
    } else {
        chrono::SecondsFormat::Micros
    };
    ts.to_rfc3339_opts(precision, false)
}

/// Reads a DynamoDB number as a count. Fractional values keep their integer
/// part; negative or non-numeric values are rejected.
pub fn parse_count(n: &str) -> Option<u64> {
    let n = n.trim();
    if let Ok(v) = n.parse::<u64>() {
        return Some(v);
    }
    match n.parse::<f64>() {
        Ok(f) if f.is_finite() && f >= 0.0 => Some(f.trunc() as u64),
        _ => None,
    }
}
