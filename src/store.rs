use crate::sql_stmt;
use chrono::{DateTime, Utc};
use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, QueryResult, Statement, Value};
use serde_json::Value as Json;
use std::fmt;
use tracing::{info, warn};

/// Table identifier validated once at startup. Deployment config picks the
/// table, but nothing unvalidated ever reaches query text.
#[derive(Clone, Debug, PartialEq)]
pub struct TableName(String);

impl TableName {
    pub fn parse(name: &str) -> Result<TableName, DbErr> {
        let valid = !name.is_empty()
            && name.len() <= 63
            && name
                .chars()
                .next()
                .map(|c| c.is_ascii_alphabetic() || c == '_')
                .unwrap_or(false)
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if valid {
            Ok(TableName(name.to_owned()))
        } else {
            Err(DbErr::Custom(format!("invalid table name: {:?}", name)))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One row of the latency table; either side of the correlation may have
/// created it, so everything except the hash is nullable.
#[derive(Clone, Debug, PartialEq)]
pub struct TxRecord {
    pub queue_id: Option<String>,
    pub transaction_hash: String,
    pub block_number: Option<i64>,
    pub transaction_sent_time: Option<DateTime<Utc>>,
    pub event_name: Option<String>,
    pub event_data: Option<Json>,
    pub event_received_time: Option<DateTime<Utc>>,
    pub time_taken_ms: Option<i64>,
}

impl TxRecord {
    fn from_row(row: &QueryResult) -> Result<TxRecord, DbErr> {
        Ok(TxRecord {
            queue_id: row.try_get("", "queue_id")?,
            transaction_hash: row.try_get("", "transaction_hash")?,
            block_number: row.try_get("", "block_number")?,
            transaction_sent_time: row.try_get("", "transaction_sent_time")?,
            event_name: row.try_get("", "event_name")?,
            event_data: row.try_get("", "event_data")?,
            event_received_time: row.try_get("", "event_received_time")?,
            time_taken_ms: row.try_get("", "time_taken_ms")?,
        })
    }
}

pub fn time_taken_between(sent: DateTime<Utc>, received: DateTime<Utc>) -> i64 {
    (received - sent).num_milliseconds()
}

/// Gateway over the latency table. Both the submitter and the webhook side
/// write through this; the `transaction_hash` UNIQUE constraint is what keeps
/// concurrent first-sight inserts from duplicating a row.
#[derive(Clone, Debug)]
pub struct TxStore {
    db: DatabaseConnection,
    table: TableName,
}

impl TxStore {
    pub fn new(db: DatabaseConnection, table: TableName) -> TxStore {
        TxStore { db, table }
    }

    pub fn table(&self) -> &TableName {
        &self.table
    }

    /// Create-if-absent of the latency table. Callers treat failure as fatal,
    /// nothing is allowed to run against a possibly-missing table.
    pub async fn ensure_table(&self) -> Result<(), DbErr> {
        self.db
            .execute(Statement::from_string(
                sql_stmt::DB_BACKEND,
                sql_stmt::create_table(self.table.as_str()),
            ))
            .await?;
        Ok(())
    }

    pub async fn find_by_hash(&self, hash: &str) -> Result<Option<TxRecord>, DbErr> {
        let row = self
            .db
            .query_one(Statement::from_sql_and_values(
                sql_stmt::DB_BACKEND,
                &sql_stmt::select_by_hash(self.table.as_str()),
                vec![hash.into()],
            ))
            .await?;
        match row {
            Some(row) => Ok(Some(TxRecord::from_row(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn insert_submission(
        &self,
        queue_id: Option<&str>,
        hash: &str,
        sent_time: DateTime<Utc>,
    ) -> Result<u64, DbErr> {
        let values: Vec<Value> = vec![
            queue_id.map(|id| id.to_owned()).into(),
            hash.into(),
            sent_time.into(),
        ];
        self.insert_with_drift_fallback(
            sql_stmt::insert_submission(self.table.as_str()),
            sql_stmt::insert_submission_unguarded(self.table.as_str()),
            values,
            hash,
        )
        .await
    }

    pub async fn update_submission(
        &self,
        queue_id: Option<&str>,
        sent_time: DateTime<Utc>,
        time_taken_ms: Option<i64>,
        hash: &str,
    ) -> Result<u64, DbErr> {
        let result = self
            .db
            .execute(Statement::from_sql_and_values(
                sql_stmt::DB_BACKEND,
                &sql_stmt::update_submission(self.table.as_str()),
                vec![
                    queue_id.map(|id| id.to_owned()).into(),
                    sent_time.into(),
                    time_taken_ms.into(),
                    hash.into(),
                ],
            ))
            .await?;
        Ok(result.rows_affected())
    }

    /// Webhook-side reconciliation: first sight of the hash inserts an event
    /// row, otherwise the event fields are merged into the existing row and
    /// the latency is computed once the submission timestamp is known.
    pub async fn insert_or_update_event(
        &self,
        hash: &str,
        block_number: Option<i64>,
        event_name: Option<&str>,
        event_data: Option<Json>,
        received_time: DateTime<Utc>,
    ) -> Result<(), DbErr> {
        let existing = self.find_by_hash(hash).await?;

        match existing {
            None => {
                let values: Vec<Value> = vec![
                    hash.into(),
                    block_number.into(),
                    event_name.map(|name| name.to_owned()).into(),
                    event_data.into(),
                    received_time.into(),
                ];
                self.insert_with_drift_fallback(
                    sql_stmt::insert_event(self.table.as_str()),
                    sql_stmt::insert_event_unguarded(self.table.as_str()),
                    values,
                    hash,
                )
                .await?;
                Ok(())
            }
            Some(record) => {
                let time_taken = record
                    .transaction_sent_time
                    .map(|sent| time_taken_between(sent, received_time));
                let result = self
                    .db
                    .execute(Statement::from_sql_and_values(
                        sql_stmt::DB_BACKEND,
                        &sql_stmt::update_event(self.table.as_str()),
                        vec![
                            block_number.into(),
                            event_name.map(|name| name.to_owned()).into(),
                            event_data.into(),
                            received_time.into(),
                            time_taken.into(),
                            hash.into(),
                        ],
                    ))
                    .await?;
                if result.rows_affected() == 0 {
                    warn!("Failed to update record for {}", hash);
                } else {
                    info!("Updated record for {}", hash);
                }
                Ok(())
            }
        }
    }

    /// Guarded insert relying on the UNIQUE constraint; a conflict is a
    /// duplicate and a no-op. A table created outside `ensure_table` may lack
    /// the constraint, in which case ON CONFLICT itself errors and the insert
    /// is retried unguarded.
    async fn insert_with_drift_fallback(
        &self,
        guarded: String,
        unguarded: String,
        values: Vec<Value>,
        hash: &str,
    ) -> Result<u64, DbErr> {
        let result = self
            .db
            .execute(Statement::from_sql_and_values(
                sql_stmt::DB_BACKEND,
                &guarded,
                values.clone(),
            ))
            .await;
        match result {
            Ok(result) => {
                if result.rows_affected() == 0 {
                    info!("Duplicate ignored for {}", hash);
                } else {
                    info!("Inserted record for {}", hash);
                }
                Ok(result.rows_affected())
            }
            Err(error) if is_missing_unique_constraint(&error) => {
                warn!(
                    "UNIQUE constraint missing on {}, falling back insert for {}",
                    self.table, hash
                );
                let result = self
                    .db
                    .execute(Statement::from_sql_and_values(
                        sql_stmt::DB_BACKEND,
                        &unguarded,
                        values,
                    ))
                    .await?;
                info!("Inserted record (fallback) for {}", hash);
                Ok(result.rows_affected())
            }
            Err(error) => Err(error),
        }
    }
}

fn is_missing_unique_constraint(error: &DbErr) -> bool {
    error
        .to_string()
        .contains("no unique or exclusion constraint")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn table_name_accepts_plain_identifiers() {
        assert!(TableName::parse("txn_latency").is_ok());
        assert!(TableName::parse("_internal").is_ok());
        assert!(TableName::parse("t42").is_ok());
    }

    #[test]
    fn table_name_rejects_injection_shapes() {
        assert!(TableName::parse("").is_err());
        assert!(TableName::parse("42table").is_err());
        assert!(TableName::parse("txn latency").is_err());
        assert!(TableName::parse("txn;drop table users;--").is_err());
        assert!(TableName::parse("public.txn_latency").is_err());
        assert!(TableName::parse(&"x".repeat(64)).is_err());
    }

    #[test]
    fn time_taken_is_signed_milliseconds() {
        let sent = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let received = sent + chrono::Duration::milliseconds(2_500);
        assert_eq!(time_taken_between(sent, received), 2_500);
        // event observed before the submission timestamp
        assert_eq!(time_taken_between(received, sent), -2_500);
    }

    #[test]
    fn create_table_carries_unique_hash_constraint() {
        let sql = sql_stmt::create_table("txn_latency");
        assert!(sql.contains("CREATE TABLE IF NOT EXISTS txn_latency"));
        assert!(sql.contains("transaction_hash TEXT UNIQUE"));
        assert!(sql.contains("event_data JSONB"));
    }

    async fn get_store(table: &str) -> TxStore {
        let config = rocket::Config::figment()
            .extract::<crate::pool::ServiceConfig>()
            .unwrap();
        let db = sea_orm::Database::connect(config.database_url.as_str())
            .await
            .unwrap();
        let store = TxStore::new(db.clone(), TableName::parse(table).unwrap());
        store.ensure_table().await.unwrap();
        db.execute(Statement::from_string(
            sql_stmt::DB_BACKEND,
            format!("DELETE FROM {}", table),
        ))
        .await
        .unwrap();
        store
    }

    #[tokio::test]
    #[ignore = "needs the postgres from Rocket.toml"]
    async fn drifted_table_without_constraint_falls_back_to_plain_insert() {
        let config = rocket::Config::figment()
            .extract::<crate::pool::ServiceConfig>()
            .unwrap();
        let db = sea_orm::Database::connect(config.database_url.as_str())
            .await
            .unwrap();
        let table = TableName::parse("txn_latency_test_drift").unwrap();

        // a legacy table with the same columns but no UNIQUE on the hash
        db.execute(Statement::from_string(
            sql_stmt::DB_BACKEND,
            format!("DROP TABLE IF EXISTS {}", table),
        ))
        .await
        .unwrap();
        db.execute(Statement::from_string(
            sql_stmt::DB_BACKEND,
            format!(
                r#"CREATE TABLE {} (
    queue_id TEXT,
    transaction_hash TEXT,
    block_number BIGINT,
    transaction_sent_time TIMESTAMPTZ,
    event_name TEXT,
    event_data JSONB,
    event_received_time TIMESTAMPTZ,
    time_taken_ms BIGINT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )"#,
                table
            ),
        ))
        .await
        .unwrap();

        let store = TxStore::new(db, table);
        let sent = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();

        // ON CONFLICT errors on this table; the insert must land anyway
        let rows = store
            .insert_submission(Some("q-d"), "0xddd", sent)
            .await
            .unwrap();
        assert_eq!(rows, 1);

        let received = Utc.timestamp_millis_opt(1_700_000_001_000).unwrap();
        store
            .insert_or_update_event("0xeee", Some(3), Some("Mined"), None, received)
            .await
            .unwrap();

        assert!(store.find_by_hash("0xddd").await.unwrap().is_some());
        assert!(store.find_by_hash("0xeee").await.unwrap().is_some());
    }

    #[tokio::test]
    #[ignore = "needs the postgres from Rocket.toml"]
    async fn submission_then_event_yields_single_row_with_latency() {
        let store = get_store("txn_latency_test_submit_first").await;

        // millisecond precision survives the TIMESTAMPTZ round trip intact
        let sent = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        store
            .insert_submission(Some("q-1"), "0xaaa", sent)
            .await
            .unwrap();

        let received = sent + chrono::Duration::milliseconds(1_200);
        store
            .insert_or_update_event("0xaaa", Some(7), Some("Mined"), None, received)
            .await
            .unwrap();
        // a second delivery of the same event must not create a second row
        store
            .insert_or_update_event("0xaaa", Some(7), Some("Mined"), None, received)
            .await
            .unwrap();

        let record = store.find_by_hash("0xaaa").await.unwrap().unwrap();
        assert_eq!(record.queue_id.as_deref(), Some("q-1"));
        assert_eq!(record.block_number, Some(7));
        assert_eq!(record.time_taken_ms, Some(1_200));
    }

    #[tokio::test]
    #[ignore = "needs the postgres from Rocket.toml"]
    async fn event_then_submission_yields_single_row_with_latency() {
        let store = get_store("txn_latency_test_event_first").await;

        let received = Utc.timestamp_millis_opt(1_700_000_060_000).unwrap();
        store
            .insert_or_update_event("0xbbb", Some(9), Some("Mined"), None, received)
            .await
            .unwrap();

        // the submitter observes the row second and computes the latency
        let sent = received - chrono::Duration::milliseconds(800);
        let record = store.find_by_hash("0xbbb").await.unwrap().unwrap();
        let time_taken = record
            .event_received_time
            .map(|r| time_taken_between(sent, r));
        let rows = store
            .update_submission(Some("q-2"), sent, time_taken, "0xbbb")
            .await
            .unwrap();
        assert_eq!(rows, 1);

        let record = store.find_by_hash("0xbbb").await.unwrap().unwrap();
        assert_eq!(record.queue_id.as_deref(), Some("q-2"));
        assert_eq!(record.time_taken_ms, Some(800));
    }
}
