//! Anonymous work tracking.
//!
//! While a session has no bound project, its transcript and files are kept in
//! an [`AnonWorkStore`] so they survive until sign-in. The store is passed
//! explicitly to whoever writes or consumes it; there is no global slot.

use std::sync::Mutex;

use crate::models::{AnonWorkBuffer, ChatMessage, ProjectSnapshot};

/// Holder of at most one [`AnonWorkBuffer`].
pub trait AnonWorkStore: Send + Sync {
    /// Current buffer, if any.
    fn get(&self) -> Option<AnonWorkBuffer>;

    /// Record the latest anonymous work. Empty transcripts are not recorded.
    fn set(&self, messages: Vec<ChatMessage>, snapshot: ProjectSnapshot);

    /// Drop the buffer.
    fn clear(&self);
}

/// In-memory store scoped to one session.
///
/// Writes are last-write-wins by timestamp: a buffer older than the one
/// already held is discarded.
#[derive(Debug, Default)]
pub struct SessionAnonStore {
    slot: Mutex<Option<AnonWorkBuffer>>,
}

impl SessionAnonStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a prepared buffer unless a newer one is already held.
    ///
    /// Returns whether the buffer was kept.
    pub fn put(&self, buffer: AnonWorkBuffer) -> bool {
        if buffer.messages.is_empty() {
            return false;
        }
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        if slot
            .as_ref()
            .is_some_and(|current| current.updated_at > buffer.updated_at)
        {
            tracing::debug!("discarding stale anonymous work");
            return false;
        }
        *slot = Some(buffer);
        true
    }
}

impl AnonWorkStore for SessionAnonStore {
    fn get(&self) -> Option<AnonWorkBuffer> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn set(&self, messages: Vec<ChatMessage>, snapshot: ProjectSnapshot) {
        self.put(AnonWorkBuffer::new(messages, snapshot));
    }

    fn clear(&self) {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn test_set_get_clear() {
        let store = SessionAnonStore::new();
        assert!(store.get().is_none());

        store.set(
            vec![ChatMessage::user("make a button")],
            ProjectSnapshot::from_files([("/App.jsx", "x")]),
        );
        let buffer = store.get().unwrap();
        assert_eq!(buffer.messages.len(), 1);
        assert_eq!(buffer.file_system_data.get("/App.jsx"), Some("x"));

        store.clear();
        assert!(store.get().is_none());
    }

    #[test]
    fn test_empty_transcript_is_not_recorded() {
        let store = SessionAnonStore::new();
        store.set(Vec::new(), ProjectSnapshot::from_files([("/App.jsx", "x")]));
        assert!(store.get().is_none());
    }

    #[test]
    fn test_stale_write_loses() {
        let store = SessionAnonStore::new();
        let newer = AnonWorkBuffer::new(vec![ChatMessage::user("newer")], ProjectSnapshot::new());
        let mut older =
            AnonWorkBuffer::new(vec![ChatMessage::user("older")], ProjectSnapshot::new());
        older.updated_at = Utc::now() - Duration::seconds(60);

        assert!(store.put(newer));
        assert!(!store.put(older));
        assert_eq!(store.get().unwrap().messages[0].text(), "newer");
    }
}
