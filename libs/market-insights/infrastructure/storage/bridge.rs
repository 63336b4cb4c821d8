//! Persistence bridge
//!
//! Mirrors dashboard state into the shared storage area and turns raw
//! storage changes into de-duplicated [`ChangeEvent`]s.
//!
//! Every key has a "last observed" raw value. Local writes and events from
//! other contexts both go through [`PersistenceBridge::observe`]; a value equal
//! to the last observed one is swallowed, anything else is recorded and
//! broadcast to subscribers.

use super::area::{AreaEvents, AreaNotice, ContextId, StorageContext, StorageEvent};
use super::backend::{PersistenceError, Result};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Storage key holding the JSON-serialized selection
pub const SELECTION_KEY: &str = "forecastSelection";

/// Storage key holding the JSON-serialized forecast snapshot
pub const FORECAST_KEY: &str = "forecastData";

const CHANGE_CAPACITY: usize = 64;

/// Where a change came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOrigin {
    /// Written through this bridge
    Local,
    /// Written by another context on the same area
    External(ContextId),
    /// Re-read after the event stream lagged
    Resync,
}

/// A real (non-duplicate) change to a persisted key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub key: String,
    pub new_value: Option<String>,
    pub origin: ChangeOrigin,
}

pub struct PersistenceBridge {
    storage: StorageContext,
    last_observed: Mutex<HashMap<String, Option<String>>>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl PersistenceBridge {
    pub fn new(storage: StorageContext) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            storage,
            last_observed: Mutex::new(HashMap::new()),
            changes,
        }
    }

    pub fn context_id(&self) -> ContextId {
        self.storage.id()
    }

    /// Subscribe to de-duplicated change events
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }

    /// Serialize `value` and store it under `key`.
    ///
    /// The write is visible to reads from this context as soon as this
    /// returns; subscribers of this bridge see a local change event if the
    /// stored text differs from what was last observed.
    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let raw = encode(key, value)?;
        self.save_raw(key, Some(&raw))
    }

    /// Store (or with `None`, remove) a raw value under `key`
    pub fn save_raw(&self, key: &str, raw: Option<&str>) -> Result<()> {
        match raw {
            Some(raw) => self.storage.set(key, raw)?,
            None => self.storage.remove(key)?,
        }
        self.observe(key, raw.map(str::to_string), ChangeOrigin::Local);
        Ok(())
    }

    /// Store several pre-encoded records, all or none.
    ///
    /// Nothing is announced, locally or to other contexts, unless every
    /// record was written. Change events follow the order of `records`.
    pub fn save_all(&self, records: &[(&str, String)]) -> Result<()> {
        let entries: Vec<(&str, &str)> = records
            .iter()
            .map(|(key, raw)| (*key, raw.as_str()))
            .collect();
        self.storage.set_all(&entries)?;
        for (key, raw) in records {
            self.observe(key, Some(raw.clone()), ChangeOrigin::Local);
        }
        Ok(())
    }

    /// Raw stored text for `key`.
    ///
    /// Reads never touch the last-observed table: a value read here before
    /// its storage event is handled must still propagate as a change.
    pub fn load_raw(&self, key: &str) -> Option<String> {
        self.storage.get(key)
    }

    /// Read `key` and record the value as observed. Used once per key at mount.
    pub fn seed(&self, key: &str) -> Option<String> {
        let raw = self.storage.get(key);
        self.last_observed
            .lock()
            .insert(key.to_string(), raw.clone());
        raw
    }

    /// Parse the record under `key`
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.load_raw(key) {
            None => Ok(None),
            Some(raw) => parse_record(key, &raw).map(Some),
        }
    }

    /// Parse the record under `key`, treating a malformed record as absent
    pub fn load_or_absent<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.load(key) {
            Ok(value) => value,
            Err(e) => {
                warn!("{}; treating record as absent", e);
                None
            }
        }
    }

    /// Run a raw value through the idempotence guard.
    ///
    /// Returns the propagated event, or `None` when the value matches the
    /// last observed one for `key`.
    pub fn observe(
        &self,
        key: &str,
        new_value: Option<String>,
        origin: ChangeOrigin,
    ) -> Option<ChangeEvent> {
        {
            let mut last_observed = self.last_observed.lock();
            if last_observed.get(key) == Some(&new_value) {
                debug!("Suppressed duplicate change on '{}' ({:?})", key, origin);
                return None;
            }
            last_observed.insert(key.to_string(), new_value.clone());
        }

        let event = ChangeEvent {
            key: key.to_string(),
            new_value,
            origin,
        };
        debug!("Change on '{}' ({:?})", key, origin);
        let _ = self.changes.send(event.clone());
        Some(event)
    }

    /// Feed a storage event from another context through the guard
    pub fn handle_external(&self, event: StorageEvent) -> Option<ChangeEvent> {
        self.observe(&event.key, event.new_value, ChangeOrigin::External(event.origin))
    }

    /// Re-read every key this bridge has seen, after missed events
    pub fn resync(&self) -> Vec<ChangeEvent> {
        let keys: Vec<String> = self.last_observed.lock().keys().cloned().collect();
        keys.into_iter()
            .filter_map(|key| {
                let raw = self.storage.get(&key);
                self.observe(&key, raw, ChangeOrigin::Resync)
            })
            .collect()
    }

    /// Forward the area's events into this bridge until the area closes
    pub fn spawn_listener(self: &Arc<Self>, mut events: AreaEvents) -> JoinHandle<()> {
        let bridge = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(notice) = events.recv().await {
                match notice {
                    AreaNotice::Changed(event) => {
                        bridge.handle_external(event);
                    }
                    AreaNotice::Missed(_) => {
                        bridge.resync();
                    }
                }
            }
            debug!("Storage area closed, listener for context {} done", bridge.context_id());
        })
    }
}

/// Serialize a record the way it is stored under `key`
pub fn encode<T: Serialize>(key: &str, value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| PersistenceError::Serialize {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

fn parse_record<T: DeserializeOwned>(key: &str, raw: &str) -> Result<T> {
    serde_json::from_str(raw).map_err(|e| PersistenceError::MalformedRecord {
        key: key.to_string(),
        reason: e.to_string(),
    })
}
