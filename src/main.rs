mod dto;
mod error;
mod event_log;
mod pool;
mod relay;
mod resolver;
mod routes;
mod scheduler;
mod sql_stmt;
mod store;
mod submitter;

use dto::TxRequest;
use pool::{Db, ServiceConfig};
use relay::RelayClient;
use rocket::fairing::{self, AdHoc};
use rocket::{Build, Config, Orbit, Rocket};
use sea_orm_rocket::Database;
use store::{TableName, TxStore};
use submitter::ResolverOpts;
use tracing::{error, info};
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

#[macro_use]
extern crate rocket;

#[get("/")]
async fn health_ping() -> &'static str {
    ""
}

#[catch(400)]
async fn invalid_payload() -> &'static str {
    "Invalid payload"
}

#[catch(404)]
async fn not_found(req: &rocket::Request<'_>) -> String {
    format!("Couldn't find '{}'", req.uri())
}

#[catch(422)]
async fn unprocessable() -> &'static str {
    "Invalid payload"
}

#[catch(500)]
async fn internal_error() -> &'static str {
    "Internal Server Error"
}

#[launch]
async fn rocket() -> _ {
    let service_config = Config::figment().extract::<ServiceConfig>().unwrap();
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", &service_config.rust_log);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(
                format!("kalp_latency_service={}", &service_config.service_log)
                    .parse()
                    .expect("Error parsing directive"),
            ),
        )
        .with_span_events(FmtSpan::FULL)
        .init();

    info!("Starting {}", service_config.service_name);

    let table = TableName::parse(&service_config.table_name)
        .expect("table_name is not a valid identifier");

    rocket::build()
        .attach(Db::init())
        .manage(service_config)
        .manage(table)
        .attach(AdHoc::try_on_ignite("Ensure Schema", ensure_schema))
        .attach(AdHoc::on_liftoff("Periodic Submitter", |rocket| {
            Box::pin(async move {
                spawn_scheduler(rocket);
            })
        }))
        .register(
            "/",
            catchers![invalid_payload, not_found, unprocessable, internal_error],
        )
        .attach(routes::mount())
        .mount("/", routes![health_ping])
}

/// Create-if-absent of the latency table before any traffic flows. A failure
/// here aborts the launch: nothing may run against a missing table.
async fn ensure_schema(rocket: Rocket<Build>) -> fairing::Result {
    let db = &rocket
        .state::<Db>()
        .expect("database pool not initialized")
        .conn;
    let table = rocket.state::<TableName>().unwrap().clone();
    let store = TxStore::new(db.clone(), table);
    match store.ensure_table().await {
        Ok(()) => {
            info!("Table {} is ready", store.table());
            Ok(rocket)
        }
        Err(db_error) => {
            error!("Failed to initialize DB schema: {}", db_error);
            Err(rocket)
        }
    }
}

fn spawn_scheduler(rocket: &Rocket<Orbit>) {
    let db = Db::fetch(rocket)
        .expect("database pool not initialized")
        .conn
        .clone();
    let config = rocket.state::<ServiceConfig>().unwrap().clone();
    let table = rocket.state::<TableName>().unwrap().clone();

    let relay = RelayClient::new(&config).expect("Reqwest client failed to initialize!");
    let store = TxStore::new(db, table);
    let body = TxRequest::new(&config);
    let opts = ResolverOpts {
        max_attempts: match config.resolver_max_attempts {
            Some(v) => v,
            None => resolver::DEFAULT_MAX_ATTEMPTS,
        },
        delay_ms: match config.resolver_delay_ms {
            Some(v) => v,
            None => resolver::DEFAULT_DELAY_MS,
        },
    };
    let chain = config.chain.to_owned();
    let interval_ms = config.time_interval_ms;

    rocket::tokio::task::spawn(async move {
        scheduler::run_periodic(interval_ms, move || {
            let store = store.clone();
            let relay = relay.clone();
            let body = body.clone();
            let chain = chain.to_owned();
            rocket::tokio::task::spawn(async move {
                submitter::submit_once(&store, &relay, &body, opts, &chain).await;
            });
        })
        .await;
    });
}
