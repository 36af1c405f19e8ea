use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_dynamodb as ddb;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use chrono::{DateTime, Utc};
use ddb::types::{AttributeValue as Av, ReturnValue, Select};
use std::collections::HashMap;
use tokio::sync::OnceCell;

use super::{
    format_timestamp, parse_count, Attribute, CountPage, PartialVisitor, ScanCursor, ScanPage,
    StoreError, VisitStore, KEY_ATTR,
};
use crate::model::VisitorRecord;

type Item = HashMap<String, Av>;

const INCREMENT_EXPR: &str = "SET visit_count = if_not_exists(visit_count, :zero) + :inc, \
     last_visit = :now, first_visit = if_not_exists(first_visit, :now)";

/// DynamoDB-backed store. The SDK client is built on first use and reused for
/// the lifetime of the execution environment.
pub struct DynamoVisitStore {
    table: String,
    client: OnceCell<ddb::Client>,
}

impl DynamoVisitStore {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            client: OnceCell::new(),
        }
    }

    pub fn with_client(table: impl Into<String>, client: ddb::Client) -> Self {
        Self {
            table: table.into(),
            client: OnceCell::new_with(Some(client)),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub async fn client(&self) -> &ddb::Client {
        self.client
            .get_or_init(|| async {
                let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
                tracing::debug!("dynamodb client initialized");
                ddb::Client::new(&config)
            })
            .await
    }
}

fn sdk_err<E>(e: &E) -> String
where
    E: std::error::Error,
{
    DisplayErrorContext(e).to_string()
}

fn get_s(item: &Item, attr: &str) -> Option<String> {
    item.get(attr).and_then(|v| v.as_s().ok()).cloned()
}

fn get_count(item: &Item) -> Option<u64> {
    item.get("visit_count")
        .and_then(|v| v.as_n().ok())
        .and_then(|n| parse_count(n))
}

fn item_to_record(ip: &str, item: &Item, missing_count: u64) -> VisitorRecord {
    VisitorRecord {
        visitor_ip: get_s(item, KEY_ATTR).unwrap_or_else(|| ip.to_string()),
        visit_count: get_count(item).unwrap_or(missing_count),
        first_visit: get_s(item, "first_visit"),
        last_visit: get_s(item, "last_visit"),
    }
}

fn item_to_partial(item: &Item) -> PartialVisitor {
    PartialVisitor {
        visitor_ip: get_s(item, KEY_ATTR),
        visit_count: get_count(item),
        first_visit: get_s(item, "first_visit"),
        last_visit: get_s(item, "last_visit"),
    }
}

fn start_key(cursor: Option<ScanCursor>) -> Option<Item> {
    cursor.map(|c| HashMap::from([(KEY_ATTR.to_string(), Av::S(c.0))]))
}

fn next_cursor(lek: Option<&Item>) -> Result<Option<ScanCursor>, StoreError> {
    match lek {
        Some(key) if !key.is_empty() => get_s(key, KEY_ATTR)
            .map(|ip| Some(ScanCursor(ip)))
            .ok_or_else(|| StoreError::Malformed(format!("last evaluated key {key:?}"))),
        _ => Ok(None),
    }
}

#[async_trait]
impl VisitStore for DynamoVisitStore {
    async fn fetch(&self, ip: &str) -> Result<Option<VisitorRecord>, StoreError> {
        let out = self
            .client()
            .await
            .get_item()
            .table_name(&self.table)
            .key(KEY_ATTR, Av::S(ip.to_string()))
            .send()
            .await
            .map_err(|e| StoreError::Get {
                ip: ip.to_string(),
                message: sdk_err(&e),
            })?;

        Ok(out.item().map(|item| item_to_record(ip, item, 0)))
    }

    async fn upsert_increment(
        &self,
        ip: &str,
        now: DateTime<Utc>,
    ) -> Result<VisitorRecord, StoreError> {
        let out = self
            .client()
            .await
            .update_item()
            .table_name(&self.table)
            .key(KEY_ATTR, Av::S(ip.to_string()))
            .update_expression(INCREMENT_EXPR)
            .expression_attribute_values(":inc", Av::N("1".into()))
            .expression_attribute_values(":zero", Av::N("0".into()))
            .expression_attribute_values(":now", Av::S(format_timestamp(now)))
            .return_values(ReturnValue::AllNew)
            .send()
            .await
            .map_err(|e| StoreError::Update {
                ip: ip.to_string(),
                message: sdk_err(&e),
            })?;

        let attrs = out.attributes().cloned().unwrap_or_default();
        Ok(item_to_record(ip, &attrs, 1))
    }

    async fn scan_page(
        &self,
        projection: &[Attribute],
        cursor: Option<ScanCursor>,
    ) -> Result<ScanPage, StoreError> {
        let mut scan = self
            .client()
            .await
            .scan()
            .table_name(&self.table)
            .set_exclusive_start_key(start_key(cursor));
        if !projection.is_empty() {
            let expr = projection
                .iter()
                .map(|a| a.name())
                .collect::<Vec<_>>()
                .join(", ");
            scan = scan.projection_expression(expr);
        }

        let out = scan
            .send()
            .await
            .map_err(|e| StoreError::Scan(sdk_err(&e)))?;

        Ok(ScanPage {
            items: out.items().iter().map(item_to_partial).collect(),
            next: next_cursor(out.last_evaluated_key())?,
        })
    }

    async fn count_page(&self, cursor: Option<ScanCursor>) -> Result<CountPage, StoreError> {
        let out = self
            .client()
            .await
            .scan()
            .table_name(&self.table)
            .select(Select::Count)
            .set_exclusive_start_key(start_key(cursor))
            .send()
            .await
            .map_err(|e| StoreError::Count(sdk_err(&e)))?;

        Ok(CountPage {
            count: out.count().max(0) as u64,
            next: next_cursor(out.last_evaluated_key())?,
        })
    }
}
