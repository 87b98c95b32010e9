//! Reconnection Scheduler.
//!
//! A fixed, finite schedule of delays indexed by attempt number. Running off
//! the end of the schedule means "give up": the session moves to `Failed` and
//! waits for an explicit reconnect.

use std::time::Duration;

/// Default schedule: short first retry, capped at 10 seconds, four attempts.
pub const DEFAULT_RECONNECT_DELAYS_MS: [u64; 4] = [1_000, 2_000, 5_000, 10_000];

/// Ordered reconnect delays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPlan {
    delays: Vec<Duration>,
}

impl ReconnectPlan {
    pub fn new(delays: Vec<Duration>) -> Self {
        Self { delays }
    }

    /// Delay to wait before reconnect attempt `attempt` (0-based).
    ///
    /// `None` once the schedule is exhausted.
    pub fn delay(&self, attempt: u32) -> Option<Duration> {
        let index = usize::try_from(attempt).ok()?;
        self.delays.get(index).copied()
    }

    /// Number of reconnect attempts before giving up.
    pub fn len(&self) -> usize {
        self.delays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.delays.is_empty()
    }
}

impl Default for ReconnectPlan {
    fn default() -> Self {
        Self::new(
            DEFAULT_RECONNECT_DELAYS_MS
                .iter()
                .copied()
                .map(Duration::from_millis)
                .collect(),
        )
    }
}

/// Attempt counter walking a [`ReconnectPlan`].
#[derive(Debug, Clone)]
pub struct Backoff {
    plan: ReconnectPlan,
    attempts: u32,
}

impl Backoff {
    pub fn new(plan: ReconnectPlan) -> Self {
        Self { plan, attempts: 0 }
    }

    /// Back to attempt 0. Called on every successful connect and on forced reconnects.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_exhausted(&self) -> bool {
        self.plan.delay(self.attempts).is_none()
    }

    /// Advance to the next attempt.
    ///
    /// Returns the delay to wait *before* performing this attempt, or `None`
    /// when no attempts remain (the counter is left untouched).
    pub fn next_delay_and_advance(&mut self) -> Option<Duration> {
        let delay = self.plan.delay(self.attempts)?;
        self.attempts += 1;
        Some(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan_ms(delays: &[u64]) -> ReconnectPlan {
        ReconnectPlan::new(delays.iter().copied().map(Duration::from_millis).collect())
    }

    #[test]
    fn test_default_schedule_escalates_and_caps() {
        let plan = ReconnectPlan::default();

        let delays: Vec<_> = (0..plan.len() as u32)
            .filter_map(|attempt| plan.delay(attempt))
            .collect();

        assert_eq!(delays.len(), 4);
        assert!(delays.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(delays.last().copied(), Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_delay_beyond_schedule_is_none() {
        let plan = plan_ms(&[100, 200]);

        assert_eq!(plan.delay(1), Some(Duration::from_millis(200)));
        assert_eq!(plan.delay(2), None);
        assert_eq!(plan.delay(u32::MAX), None);
    }

    #[test]
    fn test_backoff_walks_then_exhausts() {
        let mut backoff = Backoff::new(plan_ms(&[100, 200, 300]));

        assert_eq!(backoff.next_delay_and_advance(), Some(Duration::from_millis(100)));
        assert_eq!(backoff.next_delay_and_advance(), Some(Duration::from_millis(200)));
        assert_eq!(backoff.next_delay_and_advance(), Some(Duration::from_millis(300)));
        assert!(backoff.is_exhausted());
        assert_eq!(backoff.next_delay_and_advance(), None);
        assert_eq!(backoff.attempts(), 3);
    }

    #[test]
    fn test_reset_restarts_from_first_delay() {
        let mut backoff = Backoff::new(plan_ms(&[100, 200, 300]));
        backoff.next_delay_and_advance();
        backoff.next_delay_and_advance();

        backoff.reset();

        assert_eq!(backoff.attempts(), 0);
        assert_eq!(backoff.next_delay_and_advance(), Some(Duration::from_millis(100)));
    }

    #[test]
    fn test_empty_plan_never_retries() {
        let mut backoff = Backoff::new(ReconnectPlan::new(Vec::new()));

        assert!(backoff.is_exhausted());
        assert_eq!(backoff.next_delay_and_advance(), None);
    }
}
