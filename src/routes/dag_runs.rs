use crate::dto::DagRunPayload;
use crate::event_log;
use crate::pool::{Db, ServiceConfig};
use crate::store::{TableName, TxStore};
use chrono::Utc;
use rocket::http::Status;
use rocket::{serde::json::Json, State};
use sea_orm_rocket::Connection;
use std::path::Path;
use tracing::{error, info};

// One handler, one route per target network; the paths differ only for the
// upstream dispatcher's sake.

#[post("/kalpService/dagRuns", format = "application/json", data = "<payload>")]
pub async fn mainnet(
    conn: Connection<'_, Db>,
    config: &State<ServiceConfig>,
    table: &State<TableName>,
    payload: Json<DagRunPayload>,
) -> (Status, &'static str) {
    handle(conn, config, table, payload).await
}

#[post(
    "/kalpService/devnet/dagRuns",
    format = "application/json",
    data = "<payload>"
)]
pub async fn devnet(
    conn: Connection<'_, Db>,
    config: &State<ServiceConfig>,
    table: &State<TableName>,
    payload: Json<DagRunPayload>,
) -> (Status, &'static str) {
    handle(conn, config, table, payload).await
}

#[post(
    "/kalpService/loadnet/dagRuns",
    format = "application/json",
    data = "<payload>"
)]
pub async fn loadnet(
    conn: Connection<'_, Db>,
    config: &State<ServiceConfig>,
    table: &State<TableName>,
    payload: Json<DagRunPayload>,
) -> (Status, &'static str) {
    handle(conn, config, table, payload).await
}

async fn handle(
    conn: Connection<'_, Db>,
    config: &State<ServiceConfig>,
    table: &State<TableName>,
    payload: Json<DagRunPayload>,
) -> (Status, &'static str) {
    // reject before touching the log file or the database
    let conf = match payload.into_inner().conf {
        Some(conf) => conf,
        None => return (Status::BadRequest, "Invalid payload"),
    };

    if let Ok(raw) = serde_json::to_string(&conf) {
        info!("{}", raw);
    }

    let dir = match &config.event_log_dir {
        Some(dir) => dir.as_str(),
        None => ".",
    };
    if let Err(io_error) = event_log::append(Path::new(dir), &config.chain, conf.event_data.as_ref())
    {
        error!("Webhook error: {}", io_error);
        return (Status::InternalServerError, "Internal Server Error");
    }

    let db = conn.into_inner();
    let store = TxStore::new(db.clone(), table.inner().clone());
    let result = store
        .insert_or_update_event(
            &conf.transaction_id,
            conf.block_number,
            conf.event_name.as_deref(),
            conf.event_data,
            Utc::now(),
        )
        .await;

    match result {
        Ok(()) => (Status::Ok, "Received Event!"),
        Err(db_error) => {
            error!(
                "Error inserting/updating DB for {}: {}",
                conf.transaction_id, db_error
            );
            (Status::InternalServerError, "Internal Server Error")
        }
    }
}
