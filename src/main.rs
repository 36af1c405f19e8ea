use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use tracing_subscriber::EnvFilter;
use visit_counter::{
    config::Config,
    handler::{self, Ctx},
    model::VisitEvent,
};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .without_time()
        .init();

    let config = Config::from_env();
    tracing::info!(table = %config.table, origins = ?config.allowed_origins, "starting");

    // DynamoDB client is built lazily on the first store call
    let ctx = Ctx::new(&config);

    run(service_fn(move |event: LambdaEvent<VisitEvent>| {
        let ctx = ctx.clone();
        async move { handler::router(event.payload, &ctx).await }
    }))
    .await
}
