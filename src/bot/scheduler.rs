//! Tick scheduler for the reconciliation passes
//!
//! Each feature runs as its own loop driven by this module: one pass per
//! tick, no overlapping passes for the same feature, failures isolated to
//! the tick that produced them. Passes are plain async objects, so tests
//! drive them directly without a scheduler or wall-clock delays.

use crate::bot::backoff::Backoff;
use crate::error::{JellycordError, Result};

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

/// One feature's reconciliation pass
#[async_trait]
pub trait Pass: Send {
    /// Feature name used in log lines
    fn name(&self) -> &'static str;

    /// Run one reconciliation pass
    ///
    /// # Errors
    ///
    /// Any error leaves the display state unchanged; the scheduler logs
    /// it and retries on a later tick. A non-retryable Discord error
    /// suspends the feature for the rest of the session.
    async fn run(&mut self) -> Result<()>;
}

/// Drive a pass on a fixed interval until shutdown
///
/// Failed ticks apply a bounded exponential backoff before the next
/// attempt; a fatal (non-retryable) Discord error logs once and ends the
/// loop, suspending the feature until the process is restarted.
pub async fn drive(mut pass: impl Pass, period: Duration, mut shutdown: watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut backoff = Backoff::new();

    tracing::info!("Starting {} loop (every {:?})", pass.name(), period);

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = shutdown.changed() => {
                tracing::debug!("Stopping {} loop", pass.name());
                return;
            }
        }

        match pass.run().await {
            Ok(()) => backoff.reset(),
            Err(e) => {
                if e.downcast_ref::<JellycordError>()
                    .is_some_and(JellycordError::is_fatal_for_feature)
                {
                    tracing::error!(
                        "{} suspended for this session (fix permissions and restart): {}",
                        pass.name(),
                        e
                    );
                    return;
                }

                let delay = backoff.next();
                tracing::warn!("{} pass failed, backing off {:?}: {}", pass.name(), delay, e);
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = shutdown.changed() => return,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingPass {
        runs: Arc<AtomicUsize>,
        fail_with: Option<fn() -> anyhow::Error>,
    }

    #[async_trait]
    impl Pass for CountingPass {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn run(&mut self) -> Result<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            match self.fail_with {
                Some(make_err) => Err(make_err()),
                None => Ok(()),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_drive_ticks_repeatedly() {
        let runs = Arc::new(AtomicUsize::new(0));
        let pass = CountingPass {
            runs: runs.clone(),
            fail_with: None,
        };
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(drive(pass, Duration::from_secs(5), rx));

        // First tick fires immediately; advance through two more periods.
        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);

        tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_drive_survives_transient_errors() {
        let runs = Arc::new(AtomicUsize::new(0));
        let pass = CountingPass {
            runs: runs.clone(),
            fail_with: Some(|| {
                JellycordError::SourceUnavailable("down".to_string()).into()
            }),
        };
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(drive(pass, Duration::from_secs(5), rx));

        tokio::time::sleep(Duration::from_secs(30)).await;
        // Still ticking despite every pass failing
        assert!(runs.load(Ordering::SeqCst) >= 3);

        tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_drive_stops_on_fatal_error() {
        let runs = Arc::new(AtomicUsize::new(0));
        let pass = CountingPass {
            runs: runs.clone(),
            fail_with: Some(|| {
                JellycordError::ChatApi {
                    status: 403,
                    retryable: false,
                    message: "missing permissions".to_string(),
                }
                .into()
            }),
        };
        let (_tx, rx) = watch::channel(false);

        let handle = tokio::spawn(drive(pass, Duration::from_secs(5), rx));
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert!(handle.is_finished());
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }
}
