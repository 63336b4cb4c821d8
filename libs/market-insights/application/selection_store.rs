//! In-memory selection being edited by the user.
//!
//! Writes never touch storage or the network; incomplete selections are
//! legal intermediate states.

use crate::domain::{Selection, SelectionField, SelectionPatch};
use parking_lot::RwLock;
use tracing::debug;

#[derive(Debug, Default)]
pub struct SelectionStore {
    selection: RwLock<Selection>,
}

impl SelectionStore {
    /// Empty selection
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_selection(&self) -> Selection {
        self.selection.read().clone()
    }

    /// Merge `patch` into the current selection
    pub fn set_selection(&self, patch: SelectionPatch) {
        let mut selection = self.selection.write();
        selection.apply(patch);
        debug!("Selection edited: {}", selection.label());
    }

    /// Replace the whole selection (reload from storage)
    pub fn replace(&self, selection: Selection) {
        debug!("Selection replaced: {}", selection.label());
        *self.selection.write() = selection;
    }

    pub fn is_complete(&self) -> bool {
        self.selection.read().is_complete()
    }

    pub fn missing_fields(&self) -> Vec<SelectionField> {
        self.selection.read().missing_fields()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ForecastRange;

    #[test]
    fn test_progressive_fill() {
        let store = SelectionStore::new();
        assert!(!store.is_complete());
        assert_eq!(store.missing_fields().len(), 6);

        store.set_selection(SelectionPatch::new().state("DL"));
        store.set_selection(SelectionPatch::new().city("Delhi").market("Azadpur"));
        store.set_selection(SelectionPatch::new().category("Vegetable"));
        store.set_selection(SelectionPatch::new().product("Potato"));
        assert!(!store.is_complete());
        assert_eq!(store.missing_fields(), vec![SelectionField::ForecastRange]);

        store.set_selection(SelectionPatch::new().forecast_range(ForecastRange::Week));
        assert!(store.is_complete());
        assert_eq!(store.get_selection().state.as_deref(), Some("DL"));
    }

    #[test]
    fn test_replace_discards_previous() {
        let store = SelectionStore::new();
        store.set_selection(SelectionPatch::new().state("DL").product("Potato"));

        store.replace(Selection {
            market: Some("Vashi".to_string()),
            ..Default::default()
        });

        let selection = store.get_selection();
        assert!(selection.state.is_none());
        assert!(selection.product.is_none());
        assert_eq!(selection.market.as_deref(), Some("Vashi"));
    }
}
