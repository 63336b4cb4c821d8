//! Two dashboards on one storage area, like two browser tabs

mod common;

use common::*;
use market_insights::domain::{AnalysisQuery, SelectionPatch};
use market_insights::{ChangeOrigin, Dashboard, StorageArea, FORECAST_KEY, SELECTION_KEY};
use std::sync::Arc;
use tokio::sync::broadcast::error::TryRecvError;

#[tokio::test]
async fn test_generate_in_one_tab_refreshes_the_other() {
    let area = StorageArea::in_memory();
    let api = Arc::new(ScriptedApi::new());

    let tab_a = Dashboard::mount(&area, api.clone(), TIMEOUT).await;
    let tab_b = Dashboard::mount(&area, api.clone(), TIMEOUT).await;
    let mut b_changes = tab_b.subscribe_changes();

    tab_a.set_selection(SelectionPatch::from(delhi_potato()));
    tab_a.generate().await.unwrap();

    wait_until("tab B analysis", || {
        tab_b.analysis().selection == Some(delhi_potato())
    })
    .await;
    wait_until("tab A analysis", || {
        tab_a.analysis().selection == Some(delhi_potato())
    })
    .await;
    settle().await;

    let mut selection_changes = 0;
    let mut forecast_changes = 0;
    loop {
        match b_changes.try_recv() {
            Ok(change) => {
                assert_eq!(change.origin, ChangeOrigin::External(tab_a.bridge().context_id()));
                if change.key == SELECTION_KEY {
                    selection_changes += 1;
                } else if change.key == FORECAST_KEY {
                    forecast_changes += 1;
                }
            }
            Err(TryRecvError::Empty) => break,
            Err(e) => panic!("unexpected change stream error: {}", e),
        }
    }
    assert_eq!(selection_changes, 1);
    assert_eq!(forecast_changes, 1);

    // B's in-memory selection follows the persisted one
    assert_eq!(tab_b.selection(), delhi_potato());
    assert!(tab_b.persisted_forecast().is_some());

    // Two mount fetches, then one refresh per tab
    let queries = api.queries();
    assert_eq!(queries.len(), 4);
    assert_eq!(&queries[..2], &[AnalysisQuery::default(), AnalysisQuery::default()]);
    assert!(queries[2..]
        .iter()
        .all(|q| *q == query("Potato", "Azadpur", 7)));
}

#[tokio::test]
async fn test_writer_is_not_notified_of_its_own_write() {
    let area = StorageArea::in_memory();
    let api = Arc::new(ScriptedApi::new());
    let tab = Dashboard::mount(&area, api.clone(), TIMEOUT).await;
    let mut changes = tab.subscribe_changes();

    tab.set_selection(SelectionPatch::from(delhi_potato()));
    tab.generate().await.unwrap();
    wait_until("refresh", || tab.analysis().revision == 2).await;
    settle().await;

    let mut origins = Vec::new();
    while let Ok(change) = changes.try_recv() {
        origins.push(change.origin);
    }
    // Only the local writes, no echo from the area
    assert_eq!(origins, vec![ChangeOrigin::Local, ChangeOrigin::Local]);
    assert_eq!(api.queries().len(), 2);
}

#[tokio::test]
async fn test_tab_mounted_later_starts_from_persisted_state() {
    let area = StorageArea::in_memory();
    let api = Arc::new(ScriptedApi::new());

    let tab_a = Dashboard::mount(&area, api.clone(), TIMEOUT).await;
    tab_a.set_selection(SelectionPatch::from(delhi_potato()));
    tab_a.generate().await.unwrap();

    let tab_b = Dashboard::mount(&area, api.clone(), TIMEOUT).await;
    assert_eq!(tab_b.selection(), delhi_potato());
    assert_eq!(tab_b.analysis().selection, Some(delhi_potato()));
    assert_eq!(tab_b.persisted_forecast(), tab_a.persisted_forecast());
}

#[tokio::test]
async fn test_reading_persisted_state_early_does_not_hide_the_change() {
    let area = StorageArea::in_memory();
    let api = Arc::new(ScriptedApi::new());

    let tab_a = Dashboard::mount(&area, api.clone(), TIMEOUT).await;
    let tab_b = Dashboard::mount(&area, api.clone(), TIMEOUT).await;
    let mut b_changes = tab_b.subscribe_changes();

    tab_a.set_selection(SelectionPatch::from(delhi_potato()));
    tab_a.generate().await.unwrap();
    // B reads both records before its listener has seen the writes
    assert_eq!(tab_b.persisted_selection(), Some(delhi_potato()));
    assert!(tab_b.persisted_forecast().is_some());

    wait_until("tab B analysis", || {
        tab_b.analysis().selection == Some(delhi_potato())
    })
    .await;
    settle().await;

    assert_eq!(tab_b.selection(), delhi_potato());
    let mut selection_changes = 0;
    while let Ok(change) = b_changes.try_recv() {
        if change.key == SELECTION_KEY {
            selection_changes += 1;
        }
    }
    assert_eq!(selection_changes, 1);
}
