use crate::dto::TxRequest;
use crate::error::RelayError;
use crate::relay::RelayClient;
use crate::resolver;
use crate::store::{time_taken_between, TxStore};
use chrono::Utc;
use tracing::{info, warn};

/// Resolver knobs carried from config into every submission.
#[derive(Copy, Clone, Debug)]
pub struct ResolverOpts {
    pub max_attempts: u32,
    pub delay_ms: u64,
}

impl Default for ResolverOpts {
    fn default() -> ResolverOpts {
        ResolverOpts {
            max_attempts: resolver::DEFAULT_MAX_ATTEMPTS,
            delay_ms: resolver::DEFAULT_DELAY_MS,
        }
    }
}

/// One scheduled submission, fire-and-forget: every outcome is logged here
/// and nothing propagates to the scheduler loop.
pub async fn submit_once(
    store: &TxStore,
    relay: &RelayClient,
    body: &TxRequest,
    opts: ResolverOpts,
    chain: &str,
) {
    match try_submit(store, relay, body, opts).await {
        Ok(tx_hash) => info!("tx sent {} for {}", tx_hash, chain),
        Err(error) => warn!("Error sending request for {}: {}", chain, error),
    }
}

async fn try_submit(
    store: &TxStore,
    relay: &RelayClient,
    body: &TxRequest,
    opts: ResolverOpts,
) -> Result<String, RelayError> {
    let ack = relay.send_transaction(body).await?;
    let sent_time = Utc::now();

    let tx_hash = match ack.tx_hash {
        Some(tx_hash) => tx_hash,
        None => {
            let queue_id = match &ack.queue_id {
                Some(queue_id) => queue_id.as_str(),
                None => "",
            };
            resolver::resolve_hash(relay, queue_id, opts.max_attempts, opts.delay_ms).await?
        }
    };

    let queue_id = ack.queue_id.as_deref();
    match store.find_by_hash(&tx_hash).await? {
        Some(record) => {
            // the event got here first; close the loop from this side
            let time_taken = record
                .event_received_time
                .map(|received| time_taken_between(sent_time, received));
            let rows = store
                .update_submission(queue_id, sent_time, time_taken, &tx_hash)
                .await?;
            if rows == 0 {
                warn!(
                    "Failed to update record for {} with queue_id {:?}",
                    tx_hash, queue_id
                );
            } else {
                info!(
                    "Record updated for {} with queue_id {:?}",
                    tx_hash, queue_id
                );
            }
        }
        None => {
            store
                .insert_submission(queue_id, &tx_hash, sent_time)
                .await?;
        }
    }
    Ok(tx_hash)
}
