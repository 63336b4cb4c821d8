//! Shared storage area
//!
//! One backend shared by several contexts (dashboards). A write made through
//! one context is announced to every *other* context as a [`StorageEvent`];
//! the writer itself is never notified. This mirrors the platform storage
//! event and is the only cross-context signal in the system.

use super::backend::{FileBackend, MemoryBackend, Result, StorageBackend};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Identifies one context attached to a storage area
pub type ContextId = u64;

const EVENT_CAPACITY: usize = 256;

/// Change made to the area by some context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    /// New raw value, `None` when the key was removed
    pub new_value: Option<String>,
    pub origin: ContextId,
}

/// What a context's event stream yields
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AreaNotice {
    Changed(StorageEvent),
    /// The receiver fell behind and dropped this many events
    Missed(u64),
}

pub struct StorageArea {
    backend: Box<dyn StorageBackend>,
    events: broadcast::Sender<StorageEvent>,
    next_context: AtomicU64,
}

impl StorageArea {
    pub fn new(backend: Box<dyn StorageBackend>) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Arc::new(Self {
            backend,
            events,
            next_context: AtomicU64::new(1),
        })
    }

    /// Area backed by process memory
    pub fn in_memory() -> Arc<Self> {
        Self::new(Box::new(MemoryBackend::new()))
    }

    /// Area backed by a JSON file
    pub fn open_file(path: impl AsRef<Path>) -> Result<Arc<Self>> {
        Ok(Self::new(Box::new(FileBackend::open(path)?)))
    }

    /// Attach a new context. Its event stream starts now.
    pub fn attach(self: &Arc<Self>) -> StorageContext {
        let id = self.next_context.fetch_add(1, Ordering::Relaxed);
        debug!("Attached storage context {}", id);
        StorageContext {
            id,
            area: Arc::clone(self),
        }
    }

    fn publish(&self, event: StorageEvent) {
        // No receivers is fine: nobody else is attached
        let _ = self.events.send(event);
    }
}

/// One context's handle on a shared [`StorageArea`]
#[derive(Clone)]
pub struct StorageContext {
    id: ContextId,
    area: Arc<StorageArea>,
}

impl StorageContext {
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// Synchronous read, sees this context's own writes immediately
    pub fn get(&self, key: &str) -> Option<String> {
        self.area.backend.get(key)
    }

    /// Replace the value under `key` and notify the other contexts
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.area.backend.set(key, value)?;
        self.area.publish(StorageEvent {
            key: key.to_string(),
            new_value: Some(value.to_string()),
            origin: self.id,
        });
        Ok(())
    }

    /// Write several keys, then notify the other contexts in order.
    ///
    /// If any write fails, keys already written get their previous values
    /// back and no event is published.
    pub fn set_all(&self, entries: &[(&str, &str)]) -> Result<()> {
        let backend = &self.area.backend;
        let mut written: Vec<(&str, Option<String>)> = Vec::with_capacity(entries.len());

        for (key, value) in entries {
            let previous = backend.get(key);
            if let Err(e) = backend.set(key, value) {
                for (key, previous) in written.into_iter().rev() {
                    let restored = match previous {
                        Some(previous) => backend.set(key, &previous),
                        None => backend.remove(key),
                    };
                    if let Err(restore) = restored {
                        warn!("Failed to restore '{}' after partial write: {}", key, restore);
                    }
                }
                return Err(e);
            }
            written.push((key, previous));
        }

        for (key, value) in entries {
            self.area.publish(StorageEvent {
                key: key.to_string(),
                new_value: Some(value.to_string()),
                origin: self.id,
            });
        }
        Ok(())
    }

    /// Remove `key` and notify the other contexts
    pub fn remove(&self, key: &str) -> Result<()> {
        self.area.backend.remove(key)?;
        self.area.publish(StorageEvent {
            key: key.to_string(),
            new_value: None,
            origin: self.id,
        });
        Ok(())
    }

    /// Stream of changes made by other contexts
    pub fn events(&self) -> AreaEvents {
        AreaEvents {
            own_id: self.id,
            receiver: self.area.events.subscribe(),
        }
    }
}

/// Receiver half of a context's change stream
pub struct AreaEvents {
    own_id: ContextId,
    receiver: broadcast::Receiver<StorageEvent>,
}

impl AreaEvents {
    /// Next notice from another context; `None` once the area is gone
    pub async fn recv(&mut self) -> Option<AreaNotice> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.origin == self.own_id => continue,
                Ok(event) => return Some(AreaNotice::Changed(event)),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!("Storage context {} missed {} events", self.own_id, missed);
                    return Some(AreaNotice::Missed(missed));
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant used when draining after a burst
    pub fn try_recv(&mut self) -> Option<AreaNotice> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if event.origin == self.own_id => continue,
                Ok(event) => return Some(AreaNotice::Changed(event)),
                Err(broadcast::error::TryRecvError::Lagged(missed)) => {
                    return Some(AreaNotice::Missed(missed))
                }
                Err(_) => return None,
            }
        }
    }
}
