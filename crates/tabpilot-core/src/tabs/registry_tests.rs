use super::*;
use crate::testing::{wait_until, MockEngine};
use std::sync::Arc;

use serde_json::json;
use tabpilot_protocols::{TabError, TabId, ViewEvent};

fn registry() -> (Arc<MockEngine>, TabRegistry) {
    let engine = Arc::new(MockEngine::new());
    let tabs = TabRegistry::new(engine.clone());
    (engine, tabs)
}

#[tokio::test]
async fn test_ids_are_unique_and_increasing() {
    let (_engine, tabs) = registry();
    let a = tabs.create_tab("https://a.example", false).await.unwrap();
    let b = tabs.create_tab("https://b.example", false).await.unwrap();
    tabs.close_tab(b).await.unwrap();
    let c = tabs.create_tab("https://c.example", false).await.unwrap();

    assert_eq!(a, 1);
    assert!(b > a);
    assert!(c > b);
}

#[tokio::test]
async fn test_create_without_focus_stays_hidden() {
    let (engine, tabs) = registry();
    let id = tabs.create_tab("https://a.example", false).await.unwrap();

    assert!(tabs.contains(id));
    assert_eq!(tabs.current_tab_id(), None);
    assert_eq!(engine.visible_count(), 0);
}

#[tokio::test]
async fn test_create_with_focus_becomes_current() {
    let (engine, tabs) = registry();
    let first = tabs.create_tab("https://a.example", true).await.unwrap();
    let second = tabs.create_tab("https://b.example", true).await.unwrap();

    assert_eq!(tabs.current_tab_id(), Some(second));
    assert_eq!(engine.visible_count(), 1);
    assert!(!engine.view(0).unwrap().is_visible());
    assert!(engine.view(1).unwrap().is_visible());
    assert_ne!(first, second);
}

#[tokio::test]
async fn test_switch_shows_exactly_one() {
    let (engine, tabs) = registry();
    let a = tabs.create_tab("https://a.example", true).await.unwrap();
    let _b = tabs.create_tab("https://b.example", true).await.unwrap();
    let _c = tabs.create_tab("https://c.example", false).await.unwrap();

    tabs.switch_to(a).await.unwrap();

    assert_eq!(tabs.current_tab_id(), Some(a));
    assert_eq!(engine.visible_count(), 1);
    assert!(engine.view(0).unwrap().is_visible());
}

#[tokio::test]
async fn test_switch_unknown_tab() {
    let (engine, tabs) = registry();
    let a = tabs.create_tab("https://a.example", true).await.unwrap();

    let err = tabs.switch_to(42).await.unwrap_err();
    assert!(matches!(err, TabError::UnknownTab(42)));
    assert_eq!(tabs.current_tab_id(), Some(a));
    assert_eq!(engine.visible_count(), 1);
}

#[tokio::test]
async fn test_create_with_focus_returns_id_when_show_fails() {
    let (engine, tabs) = registry();
    let a = tabs.create_tab("https://a.example", true).await.unwrap();
    engine.fail_show(true);

    let b = tabs.create_tab("https://b.example", true).await.unwrap();

    assert!(tabs.contains(b));
    assert_eq!(tabs.get_tab_info().len(), 2);
    assert_eq!(tabs.current_tab_id(), Some(a));
    assert!(engine.view(0).unwrap().is_visible());
    assert_eq!(engine.visible_count(), 1);

    tabs.close_tab(b).await.unwrap();
    assert!(tabs.get_tab_info().iter().all(|t| t.id == a));
}

#[tokio::test]
async fn test_failed_switch_keeps_previous_tab_visible() {
    let (engine, tabs) = registry();
    let a = tabs.create_tab("https://a.example", true).await.unwrap();
    let b = tabs.create_tab("https://b.example", false).await.unwrap();
    engine.view(1).unwrap().fail_show(true);

    let err = tabs.switch_to(b).await.unwrap_err();

    assert!(matches!(err, TabError::Engine(_)));
    assert_eq!(tabs.current_tab_id(), Some(a));
    assert!(engine.view(0).unwrap().is_visible());
    assert_eq!(engine.visible_count(), 1);
}

#[tokio::test]
async fn test_close_unknown_tab() {
    let (_engine, tabs) = registry();
    let err = tabs.close_tab(7).await.unwrap_err();
    assert!(matches!(err, TabError::UnknownTab(7)));
}

#[tokio::test]
async fn test_close_current_switches_to_lowest_remaining() {
    let (engine, tabs) = registry();
    let a = tabs.create_tab("https://a.example", false).await.unwrap();
    let b = tabs.create_tab("https://b.example", false).await.unwrap();
    let c = tabs.create_tab("https://c.example", true).await.unwrap();

    tabs.close_tab(c).await.unwrap();

    assert_eq!(tabs.current_tab_id(), Some(a));
    assert!(engine.view(0).unwrap().is_visible());
    assert!(engine.view(2).unwrap().is_destroyed());
    assert_eq!(engine.visible_count(), 1);
    assert!(tabs.contains(b));
}

#[tokio::test]
async fn test_close_background_keeps_current() {
    let (engine, tabs) = registry();
    let a = tabs.create_tab("https://a.example", true).await.unwrap();
    let b = tabs.create_tab("https://b.example", false).await.unwrap();

    tabs.close_tab(b).await.unwrap();

    assert_eq!(tabs.current_tab_id(), Some(a));
    assert!(engine.view(1).unwrap().is_destroyed());
    assert_eq!(tabs.len(), 1);
}

#[tokio::test]
async fn test_close_last_tab_clears_current() {
    let (_engine, tabs) = registry();
    let a = tabs.create_tab("https://a.example", true).await.unwrap();

    tabs.close_tab(a).await.unwrap();

    assert_eq!(tabs.current_tab_id(), None);
    assert!(tabs.is_empty());
}

#[tokio::test]
async fn test_close_all() {
    let (engine, tabs) = registry();
    tabs.create_tab("https://a.example", true).await.unwrap();
    tabs.create_tab("https://b.example", false).await.unwrap();

    tabs.close_all().await;

    assert!(tabs.is_empty());
    assert_eq!(tabs.current_tab_id(), None);
    assert!(engine.views().iter().all(|v| v.is_destroyed()));
}

#[tokio::test]
async fn test_get_tab_info_ordered_by_id() {
    let (_engine, tabs) = registry();
    tabs.create_tab("https://b.example", false).await.unwrap();
    tabs.create_tab("https://a.example", false).await.unwrap();

    let info = tabs.get_tab_info();
    let ids: Vec<_> = info.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(info[0].url, "https://b.example");
    assert_eq!(info[0].title, None);
}

#[tokio::test]
async fn test_execute_script_result() {
    let (_engine, tabs) = registry();
    let id = tabs.create_tab("https://a.example", false).await.unwrap();

    let value = tabs.execute_script(id, "2+2").await.unwrap();
    assert_eq!(value, json!(4));
}

#[tokio::test]
async fn test_execute_script_exception() {
    let (_engine, tabs) = registry();
    let id = tabs.create_tab("https://a.example", false).await.unwrap();

    let err = tabs.execute_script(id, "throw new Error('x')").await.unwrap_err();
    assert!(matches!(err, TabError::ScriptExecution { tab_id, .. } if tab_id == id));
}

#[tokio::test]
async fn test_execute_script_unknown_tab() {
    let (_engine, tabs) = registry();
    let err = tabs.execute_script(3, "1+1").await.unwrap_err();
    assert!(matches!(err, TabError::UnknownTab(3)));
}

#[tokio::test]
async fn test_navigate_updates_url() {
    let (engine, tabs) = registry();
    let id = tabs.create_tab("https://a.example", false).await.unwrap();

    tabs.navigate(id, "https://next.example").await.unwrap();

    assert_eq!(tabs.tab_info(id).unwrap().url, "https://next.example");
    assert_eq!(engine.view(0).unwrap().url(), "https://next.example");
}

#[tokio::test]
async fn test_load_failure_is_recorded_not_returned() {
    let (_engine, tabs) = registry();
    let id = tabs.create_tab("bad://nowhere", false).await.unwrap();

    let info = tabs.tab_info(id).unwrap();
    assert!(info.last_error.is_some());
    assert_eq!(info.url, "bad://nowhere");
}

#[tokio::test]
async fn test_create_fails_when_engine_unavailable() {
    let (engine, tabs) = registry();
    engine.fail_create(true);

    let err = tabs.create_tab("https://a.example", true).await.unwrap_err();
    assert!(matches!(err, TabError::Engine(_)));
    assert!(tabs.is_empty());
}

#[tokio::test]
async fn test_view_events_update_record() {
    let (engine, tabs) = registry();
    let id = tabs.create_tab("https://a.example", false).await.unwrap();
    let view = engine.view(0).unwrap();

    view.emit(ViewEvent::TitleChanged("Example".to_string()));
    assert!(wait_until(|| tabs.tab_info(id).unwrap().title.as_deref() == Some("Example")).await);

    view.emit(ViewEvent::UrlChanged("https://a.example/landing".to_string()));
    assert!(wait_until(|| tabs.tab_info(id).unwrap().url == "https://a.example/landing").await);

    view.emit(ViewEvent::TitleChanged(String::new()));
    assert!(wait_until(|| tabs.tab_info(id).unwrap().title.is_none()).await);
}

#[tokio::test]
async fn test_load_failed_event_cleared_by_next_url() {
    let (engine, tabs) = registry();
    let id = tabs.create_tab("https://a.example", false).await.unwrap();
    let view = engine.view(0).unwrap();

    view.emit(ViewEvent::LoadFailed {
        url: "https://a.example".to_string(),
        code: -105,
        description: "ERR_NAME_NOT_RESOLVED".to_string(),
    });
    assert!(wait_until(|| tabs.tab_info(id).unwrap().last_error.is_some()).await);
    let error = tabs.tab_info(id).unwrap().last_error.unwrap();
    assert!(error.contains("ERR_NAME_NOT_RESOLVED"));

    view.emit(ViewEvent::UrlChanged("https://b.example".to_string()));
    assert!(wait_until(|| tabs.tab_info(id).unwrap().last_error.is_none()).await);
}

#[tokio::test]
async fn test_close_hook_runs() {
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<TabId>>);

    #[async_trait]
    impl TabCloseHook for Recorder {
        async fn on_tab_closed(&self, tab_id: TabId) {
            self.0.lock().push(tab_id);
        }
    }

    let (_engine, tabs) = registry();
    let recorder = Arc::new(Recorder::default());
    let hook: Arc<dyn TabCloseHook> = recorder.clone();
    tabs.add_close_hook(Arc::downgrade(&hook));

    let id = tabs.create_tab("https://a.example", false).await.unwrap();
    tabs.close_tab(id).await.unwrap();

    assert_eq!(*recorder.0.lock(), vec![id]);
}
