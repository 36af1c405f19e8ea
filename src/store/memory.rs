//! In-memory [`VisitStore`] for tests: paged scans, failure switches and
//! per-operation call counters.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{
    format_timestamp, Attribute, CountPage, PartialVisitor, ScanCursor, ScanPage, StoreError,
    VisitStore,
};
use crate::model::VisitorRecord;

pub(crate) struct MemoryVisitStore {
    rows: Mutex<BTreeMap<String, VisitorRecord>>,
    page_size: usize,
    fail_fetch: AtomicBool,
    fail_upsert: AtomicBool,
    fail_scan: AtomicBool,
    fail_count: AtomicBool,
    fetch_calls: AtomicUsize,
    upsert_calls: AtomicUsize,
    scan_calls: AtomicUsize,
    count_calls: AtomicUsize,
}

impl MemoryVisitStore {
    pub(crate) fn new() -> Self {
        Self::with_page_size(100)
    }

    pub(crate) fn with_page_size(page_size: usize) -> Self {
        Self {
            rows: Mutex::new(BTreeMap::new()),
            page_size: page_size.max(1),
            fail_fetch: AtomicBool::new(false),
            fail_upsert: AtomicBool::new(false),
            fail_scan: AtomicBool::new(false),
            fail_count: AtomicBool::new(false),
            fetch_calls: AtomicUsize::new(0),
            upsert_calls: AtomicUsize::new(0),
            scan_calls: AtomicUsize::new(0),
            count_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn insert(&self, ip: &str, visit_count: u64) {
        let ts = "2026-01-01T10:00:00+00:00".to_string();
        self.rows.lock().unwrap().insert(
            ip.to_string(),
            VisitorRecord {
                visitor_ip: ip.to_string(),
                visit_count,
                first_visit: Some(ts.clone()),
                last_visit: Some(ts),
            },
        );
    }

    pub(crate) fn get(&self, ip: &str) -> Option<VisitorRecord> {
        self.rows.lock().unwrap().get(ip).cloned()
    }

    pub(crate) fn fail_fetches(&self, on: bool) {
        self.fail_fetch.store(on, Ordering::SeqCst);
    }

    pub(crate) fn fail_upserts(&self, on: bool) {
        self.fail_upsert.store(on, Ordering::SeqCst);
    }

    pub(crate) fn fail_scans(&self, on: bool) {
        self.fail_scan.store(on, Ordering::SeqCst);
    }

    pub(crate) fn fail_counts(&self, on: bool) {
        self.fail_count.store(on, Ordering::SeqCst);
    }

    pub(crate) fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn upsert_calls(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn scan_calls(&self) -> usize {
        self.scan_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn count_calls(&self) -> usize {
        self.count_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.fetch_calls() + self.upsert_calls() + self.scan_calls() + self.count_calls()
    }

    /// Rows of the page starting after `cursor`, plus the next cursor.
    fn page(&self, cursor: Option<ScanCursor>) -> (Vec<VisitorRecord>, Option<ScanCursor>) {
        let rows = self.rows.lock().unwrap();
        let start = match cursor {
            Some(ScanCursor(ip)) => Bound::Excluded(ip),
            None => Bound::Unbounded,
        };
        let mut iter = rows.range((start, Bound::Unbounded)).map(|(_, r)| r.clone());
        let page: Vec<_> = iter.by_ref().take(self.page_size).collect();
        let next = match (iter.next(), page.last()) {
            (Some(_), Some(last)) => Some(ScanCursor(last.visitor_ip.clone())),
            _ => None,
        };
        (page, next)
    }
}

fn project(rec: &VisitorRecord, projection: &[Attribute]) -> PartialVisitor {
    let want = |a: Attribute| projection.is_empty() || projection.contains(&a);
    PartialVisitor {
        visitor_ip: want(Attribute::VisitorIp).then(|| rec.visitor_ip.clone()),
        visit_count: want(Attribute::VisitCount).then_some(rec.visit_count),
        first_visit: rec.first_visit.clone().filter(|_| want(Attribute::FirstVisit)),
        last_visit: rec.last_visit.clone().filter(|_| want(Attribute::LastVisit)),
    }
}

#[async_trait]
impl VisitStore for MemoryVisitStore {
    async fn fetch(&self, ip: &str) -> Result<Option<VisitorRecord>, StoreError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(StoreError::Get {
                ip: ip.to_string(),
                message: "injected failure".into(),
            });
        }
        Ok(self.get(ip))
    }

    async fn upsert_increment(
        &self,
        ip: &str,
        now: DateTime<Utc>,
    ) -> Result<VisitorRecord, StoreError> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_upsert.load(Ordering::SeqCst) {
            return Err(StoreError::Update {
                ip: ip.to_string(),
                message: "injected failure".into(),
            });
        }
        let now = format_timestamp(now);
        let mut rows = self.rows.lock().unwrap();
        let rec = rows.entry(ip.to_string()).or_insert_with(|| VisitorRecord {
            visitor_ip: ip.to_string(),
            visit_count: 0,
            first_visit: None,
            last_visit: None,
        });
        rec.visit_count += 1;
        rec.last_visit = Some(now.clone());
        rec.first_visit.get_or_insert(now);
        Ok(rec.clone())
    }

    async fn scan_page(
        &self,
        projection: &[Attribute],
        cursor: Option<ScanCursor>,
    ) -> Result<ScanPage, StoreError> {
        self.scan_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_scan.load(Ordering::SeqCst) {
            return Err(StoreError::Scan("injected failure".into()));
        }
        let (rows, next) = self.page(cursor);
        Ok(ScanPage {
            items: rows.iter().map(|r| project(r, projection)).collect(),
            next,
        })
    }

    async fn count_page(&self, cursor: Option<ScanCursor>) -> Result<CountPage, StoreError> {
        self.count_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_count.load(Ordering::SeqCst) {
            return Err(StoreError::Count("injected failure".into()));
        }
        let (rows, next) = self.page(cursor);
        Ok(CountPage {
            count: rows.len() as u64,
            next,
        })
    }
}
