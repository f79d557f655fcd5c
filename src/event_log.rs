use serde_json::Value as Json;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Append-only audit trail of raw event payloads, one line per event, one
/// file per chain. Never read back by this service.
pub fn append(dir: &Path, chain: &str, event_data: Option<&Json>) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path(dir, chain))?;
    let line = match event_data {
        Some(data) => data.to_string(),
        None => "null".to_owned(),
    };
    writeln!(file, "{}", line)
}

pub fn log_path(dir: &Path, chain: &str) -> PathBuf {
    dir.join(format!("event_data_{}.log", chain))
}
