use crate::error::RelayError;
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;
pub const DEFAULT_DELAY_MS: u64 = 3000;

/// Status endpoint of the relay, seamed out so retry behavior is testable
/// without a live relay.
#[async_trait]
pub trait StatusApi: Send + Sync {
    /// `Ok(None)` means the relay answered but the hash is not available yet.
    async fn transaction_status(&self, queue_id: &str) -> Result<Option<String>, RelayError>;
}

/// Polls the status endpoint until the queue id resolves to a transaction
/// hash, waiting `delay_ms` between attempts, `max_attempts` total. A queue
/// id the relay never answers for is a timeout; a queue id whose every
/// attempt fails outright is a resolution error.
pub async fn resolve_hash<S: StatusApi + ?Sized>(
    api: &S,
    queue_id: &str,
    max_attempts: u32,
    delay_ms: u64,
) -> Result<String, RelayError> {
    if queue_id.is_empty() {
        return Err(RelayError::InvalidQueueId);
    }

    let mut last_error: Option<RelayError> = None;
    let mut answered = false;
    for attempt in 1..=max_attempts {
        match api.transaction_status(queue_id).await {
            Ok(Some(tx_hash)) => {
                info!(
                    "Resolved {} to {} on attempt {}",
                    queue_id, tx_hash, attempt
                );
                return Ok(tx_hash);
            }
            Ok(None) => {
                answered = true;
            }
            Err(error) => {
                warn!(
                    "Status attempt {} for {} failed: {}",
                    attempt, queue_id, error
                );
                last_error = Some(error);
            }
        }
        if attempt < max_attempts {
            sleep(Duration::from_millis(delay_ms)).await;
        }
    }

    if answered {
        Err(RelayError::ResolutionTimeout {
            attempts: max_attempts,
        })
    } else {
        Err(RelayError::ResolutionError {
            attempts: max_attempts,
            last: match last_error {
                Some(error) => error.to_string(),
                None => "no attempts made".to_owned(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Scripted {
        calls: AtomicUsize,
        ready_after: Option<usize>,
        fail: bool,
    }

    impl Scripted {
        fn never_ready() -> Scripted {
            Scripted {
                calls: AtomicUsize::new(0),
                ready_after: None,
                fail: false,
            }
        }

        fn ready_after(n: usize) -> Scripted {
            Scripted {
                calls: AtomicUsize::new(0),
                ready_after: Some(n),
                fail: false,
            }
        }

        fn always_failing() -> Scripted {
            Scripted {
                calls: AtomicUsize::new(0),
                ready_after: None,
                fail: true,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StatusApi for Scripted {
        async fn transaction_status(
            &self,
            _queue_id: &str,
        ) -> Result<Option<String>, RelayError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail {
                return Err(RelayError::Rejected {
                    status: 503,
                    body: "relay down".to_owned(),
                });
            }
            match self.ready_after {
                Some(n) if call >= n => Ok(Some("0xhash".to_owned())),
                _ => Ok(None),
            }
        }
    }

    #[tokio::test]
    async fn empty_queue_id_fails_fast_without_calls() {
        let api = Scripted::never_ready();
        let result = resolve_hash(&api, "", 10, 0).await;
        assert!(matches!(result, Err(RelayError::InvalidQueueId)));
        assert_eq!(api.calls(), 0);
    }

    #[tokio::test]
    async fn immediate_hash_resolves_on_first_attempt() {
        let api = Scripted::ready_after(1);
        let hash = resolve_hash(&api, "q-1", 10, 0).await.unwrap();
        assert_eq!(hash, "0xhash");
        assert_eq!(api.calls(), 1);
    }

    #[tokio::test]
    async fn late_hash_resolves_without_exhausting_attempts() {
        let api = Scripted::ready_after(4);
        let hash = resolve_hash(&api, "q-1", 10, 0).await.unwrap();
        assert_eq!(hash, "0xhash");
        assert_eq!(api.calls(), 4);
    }

    #[tokio::test]
    async fn never_ready_times_out_after_exact_attempt_count() {
        let api = Scripted::never_ready();
        let result = resolve_hash(&api, "q-1", 10, 0).await;
        assert!(matches!(
            result,
            Err(RelayError::ResolutionTimeout { attempts: 10 })
        ));
        assert_eq!(api.calls(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn sleeps_only_between_attempts() {
        let api = Scripted::never_ready();
        let started = tokio::time::Instant::now();
        let result = resolve_hash(&api, "q-1", 10, 3000).await;
        assert!(matches!(
            result,
            Err(RelayError::ResolutionTimeout { attempts: 10 })
        ));
        assert_eq!(api.calls(), 10);
        // 10 attempts, 9 delays: no sleep before the first or after the last
        assert_eq!(started.elapsed(), Duration::from_millis(9 * 3000));
    }

    #[tokio::test]
    async fn all_transport_failures_surface_as_resolution_error() {
        let api = Scripted::always_failing();
        let result = resolve_hash(&api, "q-1", 3, 0).await;
        match result {
            Err(RelayError::ResolutionError { attempts, last }) => {
                assert_eq!(attempts, 3);
                assert!(last.contains("503"));
            }
            other => panic!("expected ResolutionError, got {:?}", other),
        }
        assert_eq!(api.calls(), 3);
    }
}
