use std::time::Duration;
use tokio::time::interval;
use tracing::info;

/// Fires `tick` immediately, then every `interval_ms` measured from tick
/// start. The tick itself spawns the submission task, so a slow submission
/// never pushes the next one back and overlap is accepted. Runs until the
/// process exits; there is no cancellation path.
pub async fn run_periodic<F>(interval_ms: u64, mut tick: F)
where
    F: FnMut(),
{
    info!("Next request will be sent in: {} seconds", interval_ms / 1000);
    let mut ticker = interval(Duration::from_millis(interval_ms.max(1)));
    loop {
        ticker.tick().await;
        tick();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::time::sleep;

    #[tokio::test]
    async fn fires_immediately_then_on_the_interval() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let task = tokio::spawn(run_periodic(100, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        sleep(Duration::from_millis(40)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        sleep(Duration::from_millis(300)).await;
        let fired = hits.load(Ordering::SeqCst);
        assert!(fired >= 3, "expected at least 3 ticks, saw {}", fired);

        task.abort();
    }
}
