//! Heartbeat Timer.
//!
//! While a transport is connected the session writes a `ping` frame every
//! `heartbeat_interval`. The tick is bound to one transport generation, so a
//! tick that races a reconnect is recognised as stale and dropped.

use std::time::Duration;

use racechat_shared::{encode_command, CodecError, OutboundCommand};
use tokio::sync::mpsc;

use crate::session::SessionEvent;
use crate::timer::Timer;
use crate::transport::Generation;

pub(crate) struct Heartbeat {
    generation: Generation,
    _timer: Timer,
}

impl Heartbeat {
    pub(crate) fn start(
        interval: Duration,
        generation: Generation,
        events: &mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        let timer = Timer::every(interval, events, move || SessionEvent::HeartbeatDue { generation });
        Self {
            generation,
            _timer: timer,
        }
    }

    pub(crate) fn generation(&self) -> Generation {
        self.generation
    }
}

/// Wire form of the keepalive.
pub(crate) fn ping_frame() -> Result<String, CodecError> {
    encode_command(&OutboundCommand::Ping)
}
