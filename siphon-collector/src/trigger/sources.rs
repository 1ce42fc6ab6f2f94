//! Event sources feeding the trigger listener

use siphon_core::domain::schedule::TriggerReason;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{SignalKind, signal};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::TriggerListener;

/// Fires a `Signal` event on every SIGUSR1 until shutdown
pub fn spawn_signal_trigger(
    listener: Arc<TriggerListener>,
    shutdown: CancellationToken,
) -> std::io::Result<JoinHandle<()>> {
    let mut sigusr1 = signal(SignalKind::user_defined1())?;

    Ok(tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                received = sigusr1.recv() => {
                    if received.is_none() {
                        break;
                    }
                    info!("Received SIGUSR1, requesting collection");
                    listener.on_event(TriggerReason::Signal);
                }
            }
        }
        debug!("Signal trigger stopped");
    }))
}

/// Fires a `Timer` event every `period` until shutdown
///
/// The first event comes one full period after the call.
pub fn spawn_timer_trigger(
    listener: Arc<TriggerListener>,
    period: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval_at(time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => listener.on_event(TriggerReason::Timer),
            }
        }
        debug!("Timer trigger stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trigger::tests::RecordingSubmitter;
    use siphon_core::domain::schedule::Constraints;

    #[tokio::test]
    async fn test_timer_trigger_fires_until_shutdown() {
        let submitter = Arc::new(RecordingSubmitter::default());
        let listener = Arc::new(TriggerListener::new(
            submitter.clone(),
            Constraints::default(),
        ));
        let shutdown = CancellationToken::new();

        let task = spawn_timer_trigger(listener, Duration::from_millis(20), shutdown.clone());
        time::sleep(Duration::from_millis(110)).await;
        shutdown.cancel();
        task.await.unwrap();

        let fired = submitter.requests.lock().unwrap().len();
        assert!(fired >= 1, "timer never fired");
        assert!(
            submitter
                .requests
                .lock()
                .unwrap()
                .iter()
                .all(|r| r.reason == TriggerReason::Timer)
        );

        // Nothing fires after shutdown
        time::sleep(Duration::from_millis(60)).await;
        assert_eq!(submitter.requests.lock().unwrap().len(), fired);
    }

    #[tokio::test]
    async fn test_signal_trigger_stops_on_shutdown() {
        let submitter = Arc::new(RecordingSubmitter::default());
        let listener = Arc::new(TriggerListener::new(
            submitter.clone(),
            Constraints::default(),
        ));
        let shutdown = CancellationToken::new();

        let task = spawn_signal_trigger(listener, shutdown.clone()).unwrap();
        shutdown.cancel();

        time::timeout(Duration::from_secs(5), task)
            .await
            .expect("signal trigger should stop")
            .unwrap();
        assert!(submitter.requests.lock().unwrap().is_empty());
    }
}
