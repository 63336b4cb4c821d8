//! Durable storage shared between dashboard contexts

pub mod area;
pub mod backend;
pub mod bridge;

pub use area::{AreaEvents, AreaNotice, ContextId, StorageArea, StorageContext, StorageEvent};
pub use backend::{FileBackend, MemoryBackend, PersistenceError, StorageBackend};
pub use bridge::{encode, ChangeEvent, ChangeOrigin, PersistenceBridge, FORECAST_KEY, SELECTION_KEY};
