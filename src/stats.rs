//! Site-wide aggregates, computed by scanning the whole table on demand.
//!
//! Both aggregates fail soft: a backend error is logged and reported as 0 so
//! the per-visitor part of a response still goes out.

use tracing::error;

use crate::store::{scan_all, Attribute, VisitStore};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    pub total_visits: u64,
    pub unique_visitors: u64,
}

/// Sum of `visit_count` over every row. Rows without a count add nothing.
pub async fn total_visits(store: &dyn VisitStore) -> u64 {
    match scan_all(store, &[Attribute::VisitCount]).await {
        Ok(items) => items
            .iter()
            .filter_map(|i| i.visit_count)
            .fold(0u64, u64::saturating_add),
        Err(e) => {
            error!(error = %e, "error getting total visits");
            0
        }
    }
}

/// Number of rows, via count-only scans.
pub async fn unique_visitors(store: &dyn VisitStore) -> u64 {
    let mut count = 0;
    let mut cursor = None;
    loop {
        match store.count_page(cursor.take()).await {
            Ok(page) => {
                count = u64::saturating_add(count, page.count);
                match page.next {
                    Some(next) => cursor = Some(next),
                    None => return count,
                }
            }
            Err(e) => {
                error!(error = %e, "error getting unique visitors");
                return 0;
            }
        }
    }
}

pub async fn snapshot(store: &dyn VisitStore) -> Totals {
    let total_visits = total_visits(store).await;
    let unique_visitors = unique_visitors(store).await;
    Totals {
        total_visits,
        unique_visitors,
    }
}
