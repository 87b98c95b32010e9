//! Cancellable timers that post events back to the session actor.
//!
//! A `Timer` owns the spawned task; dropping it aborts the task. Storing
//! timers in `Option` fields means replacing or clearing the field is the
//! cancellation.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio::time::{Instant, MissedTickBehavior};

pub(crate) struct Timer {
    handle: AbortHandle,
}

impl Timer {
    /// Post `event` once after `delay`.
    pub(crate) fn once<E>(delay: Duration, events: &mpsc::UnboundedSender<E>, event: E) -> Self
    where
        E: Send + 'static,
    {
        let events = events.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(event);
        })
        .abort_handle();

        Self { handle }
    }

    /// Post `make()` every `period`, starting one period from now.
    pub(crate) fn every<E, F>(period: Duration, events: &mpsc::UnboundedSender<E>, mut make: F) -> Self
    where
        E: Send + 'static,
        F: FnMut() -> E + Send + 'static,
    {
        // interval() panics on a zero period
        let period = period.max(Duration::from_millis(1));
        let events = events.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if events.send(make()).is_err() {
                    break;
                }
            }
        })
        .abort_handle();

        Self { handle }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_once_fires_after_delay() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _timer = Timer::once(Duration::from_secs(2), &tx, 7u32);

        tokio::time::sleep(Duration::from_millis(1_999)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(rx.try_recv().ok(), Some(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_timer_cancels_it() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let timer = Timer::once(Duration::from_secs(1), &tx, 1u32);

        drop(timer);
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_repeats_until_dropped() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut count = 0u32;
        let timer = Timer::every(Duration::from_secs(10), &tx, move || {
            count += 1;
            count
        });

        tokio::time::sleep(Duration::from_secs(35)).await;
        drop(timer);
        tokio::time::sleep(Duration::from_secs(30)).await;

        let mut ticks = Vec::new();
        while let Ok(tick) = rx.try_recv() {
            ticks.push(tick);
        }
        assert_eq!(ticks, vec![1, 2, 3]);
    }
}
