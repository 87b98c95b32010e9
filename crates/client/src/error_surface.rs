//! Error Surface.
//!
//! Errors may be shown immediately or after a debounce window. A debounced
//! error only becomes visible if nothing supersedes or clears it before the
//! window elapses, so a reconnect blip never flashes a scary banner.
//!
//! The debounce timer posts [`SessionEvent::ErrorDue`] back to the session
//! instead of writing the signal itself; every mutation stays on the session
//! task.

use std::time::Duration;

use tokio::sync::{mpsc, watch};

use crate::session::SessionEvent;
use crate::timer::Timer;

struct PendingError {
    token: u64,
    message: String,
    _timer: Timer,
}

pub(crate) struct ErrorSurface {
    visible: watch::Sender<Option<String>>,
    pending: Option<PendingError>,
    next_token: u64,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl ErrorSurface {
    pub(crate) fn new(
        visible: watch::Sender<Option<String>>,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            visible,
            pending: None,
            next_token: 0,
            events,
        }
    }

    /// Show `message` now (`delay == 0`) or once `delay` has elapsed.
    ///
    /// Any earlier pending error is superseded.
    pub(crate) fn set(&mut self, message: impl Into<String>, delay: Duration) {
        let message = message.into();

        if delay.is_zero() {
            self.pending = None;
            self.show(Some(message));
            return;
        }

        self.next_token += 1;
        let token = self.next_token;
        let timer = Timer::once(delay, &self.events, SessionEvent::ErrorDue { token });
        self.pending = Some(PendingError {
            token,
            message,
            _timer: timer,
        });
    }

    /// Debounce window for `token` elapsed.
    pub(crate) fn elapsed(&mut self, token: u64) {
        match self.pending.take() {
            Some(pending) if pending.token == token => self.show(Some(pending.message)),
            other => {
                tracing::trace!(token, "Ignoring superseded error timer");
                self.pending = other;
            }
        }
    }

    /// Hide the visible error and cancel any pending one.
    pub(crate) fn clear(&mut self) {
        self.pending = None;
        self.show(None);
    }

    #[cfg(test)]
    pub(crate) fn current(&self) -> Option<String> {
        self.visible.borrow().clone()
    }

    fn show(&self, value: Option<String>) {
        self.visible.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        surface: ErrorSurface,
        rx: watch::Receiver<Option<String>>,
        events: mpsc::UnboundedReceiver<SessionEvent>,
    }

    fn fixture() -> Fixture {
        let (visible, rx) = watch::channel(None);
        let (tx, events) = mpsc::unbounded_channel();
        Fixture {
            surface: ErrorSurface::new(visible, tx),
            rx,
            events,
        }
    }

    /// Feed due timers back into the surface, as the session does.
    fn pump(fixture: &mut Fixture) {
        while let Ok(event) = fixture.events.try_recv() {
            if let SessionEvent::ErrorDue { token } = event {
                fixture.surface.elapsed(token);
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_delay_is_visible_immediately() {
        let mut f = fixture();

        f.surface.set("Not connected", Duration::ZERO);

        assert_eq!(f.rx.borrow().as_deref(), Some("Not connected"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_error_appears_after_window() {
        let mut f = fixture();
        f.surface.set("slow mode", Duration::from_secs(1));

        tokio::time::sleep(Duration::from_millis(900)).await;
        pump(&mut f);
        assert_eq!(f.surface.current(), None);

        tokio::time::sleep(Duration::from_millis(200)).await;
        pump(&mut f);
        assert_eq!(f.surface.current().as_deref(), Some("slow mode"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_cancels_pending_error() {
        let mut f = fixture();
        f.surface.set("connection lost", Duration::from_secs(5));

        tokio::time::sleep(Duration::from_secs(1)).await;
        f.surface.clear();
        tokio::time::sleep(Duration::from_secs(10)).await;
        pump(&mut f);

        assert_eq!(f.surface.current(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_error_supersedes_pending() {
        let mut f = fixture();
        f.surface.set("first", Duration::from_secs(1));
        f.surface.set("second", Duration::from_secs(3));

        tokio::time::sleep(Duration::from_secs(2)).await;
        pump(&mut f);
        assert_eq!(f.surface.current(), None);

        tokio::time::sleep(Duration::from_secs(2)).await;
        pump(&mut f);
        assert_eq!(f.surface.current().as_deref(), Some("second"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_token_is_ignored() {
        let mut f = fixture();
        f.surface.set("pending", Duration::from_secs(5));

        f.surface.elapsed(99);

        assert_eq!(f.surface.current(), None);
        tokio::time::sleep(Duration::from_secs(6)).await;
        pump(&mut f);
        assert_eq!(f.surface.current().as_deref(), Some("pending"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_error_replaces_pending() {
        let mut f = fixture();
        f.surface.set("connection lost", Duration::from_secs(5));

        f.surface.set("connection failed", Duration::ZERO);
        tokio::time::sleep(Duration::from_secs(10)).await;
        pump(&mut f);

        assert_eq!(f.surface.current().as_deref(), Some("connection failed"));
    }
}
