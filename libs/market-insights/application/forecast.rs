//! Forecast generation
//!
//! Sends a complete selection to the backend and commits the selection and
//! the returned snapshot to storage, selection first. Either both records
//! change and are announced or neither is.
//!
//! Requests carry monotonically increasing ids. A response is committed only
//! if no newer request has been committed already, so a slow first request
//! can't overwrite the result of a faster second one.

use crate::domain::{ForecastSnapshot, Selection, SelectionField};
use crate::infrastructure::client::{AnalyticsApi, ApiError, ForecastRequest};
use crate::infrastructure::storage::{
    encode, PersistenceBridge, PersistenceError, FORECAST_KEY, SELECTION_KEY,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("Selection incomplete, missing: {}", join_fields(.missing))]
    IncompleteSelection { missing: Vec<SelectionField> },

    #[error("Forecast generation failed: {0}")]
    Generation(#[from] ApiError),

    #[error("Forecast request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Failed to persist forecast: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Forecast request #{request_id} superseded by #{committed}")]
    Superseded { request_id: u64, committed: u64 },
}

fn join_fields(fields: &[SelectionField]) -> String {
    fields
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, ForecastError>;

pub struct ForecastGenerator {
    api: Arc<dyn AnalyticsApi>,
    bridge: Arc<PersistenceBridge>,
    timeout: Duration,
    next_request: AtomicU64,
    /// Id of the last request whose result reached storage (0 = none)
    last_committed: Mutex<u64>,
}

impl ForecastGenerator {
    pub fn new(api: Arc<dyn AnalyticsApi>, bridge: Arc<PersistenceBridge>, timeout: Duration) -> Self {
        Self {
            api,
            bridge,
            timeout,
            next_request: AtomicU64::new(1),
            last_committed: Mutex::new(0),
        }
    }

    pub fn last_committed_request(&self) -> u64 {
        *self.last_committed.lock()
    }

    /// Request a forecast for `selection` and persist it.
    ///
    /// Fails without touching the network when the selection is incomplete.
    pub async fn generate(&self, selection: &Selection) -> Result<ForecastSnapshot> {
        let request = ForecastRequest::from_selection(selection).ok_or_else(|| {
            ForecastError::IncompleteSelection {
                missing: selection.missing_fields(),
            }
        })?;

        let request_id = self.next_request.fetch_add(1, Ordering::Relaxed);
        info!("Forecast request #{} for {}", request_id, selection.label());

        let snapshot = match tokio::time::timeout(self.timeout, self.api.generate_forecast(&request)).await {
            Err(_) => {
                warn!("Forecast request #{} timed out after {:?}", request_id, self.timeout);
                return Err(ForecastError::Timeout(self.timeout));
            }
            Ok(Err(e)) => {
                warn!("Forecast request #{} failed: {}", request_id, e);
                return Err(e.into());
            }
            Ok(Ok(snapshot)) => snapshot,
        };

        self.commit(request_id, selection, &snapshot)?;
        Ok(snapshot)
    }

    fn commit(&self, request_id: u64, selection: &Selection, snapshot: &ForecastSnapshot) -> Result<()> {
        let mut last_committed = self.last_committed.lock();
        if request_id < *last_committed {
            warn!(
                "Dropping forecast #{}: #{} already committed",
                request_id, *last_committed
            );
            return Err(ForecastError::Superseded {
                request_id,
                committed: *last_committed,
            });
        }

        // Selection first: listeners triggered by it may read the snapshot next
        let records = [
            (SELECTION_KEY, encode(SELECTION_KEY, selection)?),
            (FORECAST_KEY, encode(FORECAST_KEY, snapshot)?),
        ];
        if let Err(e) = self.bridge.save_all(&records) {
            warn!("Forecast #{} not persisted: {}", request_id, e);
            return Err(e.into());
        }

        *last_committed = request_id;
        info!("Forecast #{} committed for {}", request_id, selection.label());
        Ok(())
    }
}
