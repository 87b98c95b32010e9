//! Viewer identity and session key tracking.

use std::fmt;

/// Authenticated viewer. Anonymous viewers have no identity.
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    /// Bearer token appended to the connection URL
    pub token: String,
}

impl Identity {
    pub fn new(user_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            token: token.into(),
        }
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("user_id", &self.user_id)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Everything that decides which chat session a connection belongs to.
///
/// A change in any part invalidates the live connection and the message
/// history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionKey {
    pub channel_id: String,
    pub identity: Option<Identity>,
}

impl SessionKey {
    pub fn new(channel_id: impl Into<String>, identity: Option<Identity>) -> Self {
        Self {
            channel_id: channel_id.into(),
            identity,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.identity.as_ref().map(|identity| identity.token.as_str())
    }
}

/// Holds the last observed session key and reports changes.
#[derive(Debug)]
pub(crate) struct IdentityWatcher {
    current: SessionKey,
}

impl IdentityWatcher {
    pub(crate) fn new(initial: SessionKey) -> Self {
        Self { current: initial }
    }

    pub(crate) fn current(&self) -> &SessionKey {
        &self.current
    }

    /// Record `key`; returns `true` if it differs from the held one.
    pub(crate) fn observe(&mut self, key: SessionKey) -> bool {
        if key == self.current {
            return false;
        }
        self.current = key;
        true
    }

    pub(crate) fn observe_identity(&mut self, identity: Option<Identity>) -> bool {
        let key = SessionKey {
            channel_id: self.current.channel_id.clone(),
            identity,
        };
        self.observe(key)
    }

    pub(crate) fn observe_channel(&mut self, channel_id: String) -> bool {
        let key = SessionKey {
            channel_id,
            identity: self.current.identity.clone(),
        };
        self.observe(key)
    }
}
