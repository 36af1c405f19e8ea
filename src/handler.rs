use chrono::Utc;
use lambda_runtime::Error;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

use crate::{
    client_ip,
    config::Config,
    cors::OriginPolicy,
    model::{ErrorBody, MessageBody, VisitEvent, VisitRegistered, VisitStats},
    response::{encode_body, ApiResponse},
    stats,
    store::{DynamoVisitStore, VisitStore},
};

pub const REGISTERED_MESSAGE: &str = "Visit registered successfully";
pub const REGISTER_FAILED: &str = "Failed to register visit";

#[derive(Clone)]
pub struct Ctx {
    pub store: Arc<dyn VisitStore>,
    pub origins: OriginPolicy,
}

impl Ctx {
    pub fn new(config: &Config) -> Self {
        Self::with_store(
            Arc::new(DynamoVisitStore::new(config.table.clone())),
            OriginPolicy::new(config.allowed_origins.clone()),
        )
    }

    pub fn with_store(store: Arc<dyn VisitStore>, origins: OriginPolicy) -> Self {
        Self { store, origins }
    }
}

pub async fn router(evt: VisitEvent, ctx: &Ctx) -> Result<ApiResponse, Error> {
    let method = evt.method().to_string();
    info!(method = %method, "visit request");
    tracing::debug!(event = ?evt, "event");

    match method.as_str() {
        // CORS preflight
        "OPTIONS" => respond(200, &MessageBody { message: "OK" }, &evt, ctx),
        "GET" => get_visits(&evt, ctx).await,
        "POST" => register_visit(&evt, ctx).await,
        other => respond(
            405,
            &ErrorBody {
                error: format!("Method {other} not allowed"),
            },
            &evt,
            ctx,
        ),
    }
}

async fn get_visits(evt: &VisitEvent, ctx: &Ctx) -> Result<ApiResponse, Error> {
    let visitor_ip = client_ip::resolve(evt);

    let visitor = match ctx.store.fetch(&visitor_ip).await {
        Ok(v) => v,
        Err(e) => {
            error!(error = %e, "error getting visitor data");
            None
        }
    };
    let totals = stats::snapshot(ctx.store.as_ref()).await;

    let (visitor_visits, first_visit, last_visit) = match visitor {
        Some(v) => (v.visit_count, v.first_visit, v.last_visit),
        None => (0, None, None),
    };
    let body = VisitStats {
        total_visits: totals.total_visits,
        unique_visitors: totals.unique_visitors,
        visitor_ip,
        visitor_visits,
        first_visit,
        last_visit,
    };
    respond(200, &body, evt, ctx)
}

async fn register_visit(evt: &VisitEvent, ctx: &Ctx) -> Result<ApiResponse, Error> {
    let visitor_ip = client_ip::resolve(evt);

    let record = match ctx.store.upsert_increment(&visitor_ip, Utc::now()).await {
        Ok(r) => r,
        Err(e) => {
            error!(error = %e, visitor_ip = %visitor_ip, "error registering visit");
            return respond(
                500,
                &ErrorBody {
                    error: REGISTER_FAILED.to_string(),
                },
                evt,
                ctx,
            );
        }
    };
    let totals = stats::snapshot(ctx.store.as_ref()).await;

    let body = VisitRegistered {
        message: REGISTERED_MESSAGE,
        visitor_ip,
        visitor_visits: record.visit_count,
        total_visits: totals.total_visits,
        unique_visitors: totals.unique_visitors,
    };
    respond(200, &body, evt, ctx)
}

fn respond<T: Serialize>(
    status: u16,
    body: &T,
    evt: &VisitEvent,
    ctx: &Ctx,
) -> Result<ApiResponse, Error> {
    Ok(ApiResponse {
        status_code: status,
        headers: ctx.origins.headers(evt.header("origin")),
        body: encode_body(body)?,
    })
}
