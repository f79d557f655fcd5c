use sea_orm::DbBackend;

pub const DB_BACKEND: DbBackend = DbBackend::Postgres;

// The table name is interpolated, never bound: Postgres does not take
// identifiers as parameters. Callers only ever pass a validated `TableName`.

pub fn create_table(table: &str) -> String {
    format!(
        r#"CREATE TABLE IF NOT EXISTS {table} (
    queue_id TEXT,
    transaction_hash TEXT UNIQUE,
    block_number BIGINT,
    transaction_sent_time TIMESTAMPTZ,
    event_name TEXT,
    event_data JSONB,
    event_received_time TIMESTAMPTZ,
    time_taken_ms BIGINT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )"#
    )
}

pub fn select_by_hash(table: &str) -> String {
    format!(
        r#"SELECT queue_id,
    transaction_hash,
    block_number,
    transaction_sent_time,
    event_name,
    event_data,
    event_received_time,
    time_taken_ms
    FROM {table}
    WHERE transaction_hash = $1"#
    )
}

pub fn insert_submission(table: &str) -> String {
    format!(
        r#"INSERT INTO {table} (queue_id, transaction_hash, transaction_sent_time)
    VALUES ($1, $2, $3)
    ON CONFLICT (transaction_hash) DO NOTHING"#
    )
}

pub fn insert_submission_unguarded(table: &str) -> String {
    format!(
        r#"INSERT INTO {table} (queue_id, transaction_hash, transaction_sent_time)
    VALUES ($1, $2, $3)"#
    )
}

pub fn update_submission(table: &str) -> String {
    format!(
        r#"UPDATE {table}
    SET queue_id = $1, transaction_sent_time = $2, time_taken_ms = $3
    WHERE transaction_hash = $4"#
    )
}

pub fn insert_event(table: &str) -> String {
    format!(
        r#"INSERT INTO {table} (transaction_hash, block_number, event_name, event_data, event_received_time)
    VALUES ($1, $2, $3, $4, $5)
    ON CONFLICT (transaction_hash) DO NOTHING"#
    )
}

pub fn insert_event_unguarded(table: &str) -> String {
    format!(
        r#"INSERT INTO {table} (transaction_hash, block_number, event_name, event_data, event_received_time)
    VALUES ($1, $2, $3, $4, $5)"#
    )
}

pub fn update_event(table: &str) -> String {
    format!(
        r#"UPDATE {table}
    SET block_number = $1, event_name = $2, event_data = $3, event_received_time = $4, time_taken_ms = $5
    WHERE transaction_hash = $6"#
    )
}
