use super::*;
use crate::testing::{wait_until, MockEngine};
use std::time::Duration;

use serde_json::json;

async fn bridge_with_tabs(count: usize) -> (Arc<MockEngine>, Arc<TabRegistry>, Arc<DebugBridge>) {
    let engine = Arc::new(MockEngine::new());
    let tabs = Arc::new(TabRegistry::new(engine.clone()));
    for i in 0..count {
        tabs.create_tab(&format!("https://{}.example", i), false)
            .await
            .unwrap();
    }
    let bridge = Arc::new(DebugBridge::new(tabs.clone()));
    let hook: Arc<dyn TabCloseHook> = bridge.clone();
    tabs.add_close_hook(Arc::downgrade(&hook));
    (engine, tabs, bridge)
}

#[tokio::test]
async fn test_first_command_attaches_once() {
    let (engine, _tabs, bridge) = bridge_with_tabs(1).await;
    let channel = engine.view(0).unwrap().debug_channel();

    bridge.send(1, "DOM.getDocument", json!({})).await.unwrap();
    bridge.send(1, "DOM.getDocument", json!({})).await.unwrap();

    assert_eq!(channel.attach_count(), 1);
    assert!(bridge.is_attached(1));
}

#[tokio::test]
async fn test_result_returned_verbatim() {
    let (engine, _tabs, bridge) = bridge_with_tabs(1).await;
    let channel = engine.view(0).unwrap().debug_channel();
    channel.respond("DOM.getDocument", json!({"root": {"nodeId": 1}}));

    let result = bridge.send(1, "DOM.getDocument", json!({})).await.unwrap();
    assert_eq!(result, json!({"root": {"nodeId": 1}}));
}

#[tokio::test]
async fn test_engine_error_passed_through() {
    let (engine, _tabs, bridge) = bridge_with_tabs(1).await;
    let channel = engine.view(0).unwrap().debug_channel();
    channel.fail("DOM.querySelector", "No node with given id found");

    let err = bridge
        .send(1, "DOM.querySelector", json!({"nodeId": 99, "selector": "a"}))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "No node with given id found");
}

#[tokio::test]
async fn test_unknown_tab() {
    let (_engine, _tabs, bridge) = bridge_with_tabs(0).await;
    let err = bridge.send(5, "Page.enable", json!({})).await.unwrap_err();
    assert!(matches!(err, DebugError::UnknownTab(5)));
    assert!(!bridge.is_attached(5));
}

#[tokio::test]
async fn test_same_tab_commands_are_serialized() {
    let (engine, _tabs, bridge) = bridge_with_tabs(1).await;
    let channel = engine.view(0).unwrap().debug_channel();
    channel.set_delay(Duration::from_millis(20));

    let mut handles = Vec::new();
    for i in 0..4 {
        let bridge = bridge.clone();
        handles.push(tokio::spawn(async move {
            bridge.send(1, "Runtime.evaluate", json!({"n": i})).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(channel.max_in_flight(), 1);
    assert_eq!(channel.calls().len(), 4);
    assert_eq!(channel.attach_count(), 1);
}

#[tokio::test]
async fn test_tab_close_detaches() {
    let (engine, tabs, bridge) = bridge_with_tabs(2).await;
    let channel = engine.view(0).unwrap().debug_channel();
    bridge.send(1, "Page.enable", json!({})).await.unwrap();

    tabs.close_tab(1).await.unwrap();

    assert!(!bridge.is_attached(1));
    assert_eq!(channel.detach_count(), 1);
    assert!(!channel.is_attached());
}

#[tokio::test]
async fn test_detach_failure_still_clears_state() {
    let (engine, _tabs, bridge) = bridge_with_tabs(1).await;
    let channel = engine.view(0).unwrap().debug_channel();
    bridge.send(1, "Page.enable", json!({})).await.unwrap();
    channel.fail_detach(true);

    assert!(bridge.detach(1).await);
    assert!(!bridge.is_attached(1));
    assert!(bridge.detach_all().await.is_empty());
}

#[tokio::test]
async fn test_detach_unattached_is_noop() {
    let (engine, _tabs, bridge) = bridge_with_tabs(1).await;
    assert!(!bridge.detach(1).await);
    assert_eq!(engine.view(0).unwrap().debug_channel().detach_count(), 0);
}

#[tokio::test]
async fn test_reattach_after_detach() {
    let (engine, _tabs, bridge) = bridge_with_tabs(1).await;
    let channel = engine.view(0).unwrap().debug_channel();

    bridge.send(1, "Page.enable", json!({})).await.unwrap();
    bridge.detach(1).await;
    bridge.send(1, "Page.enable", json!({})).await.unwrap();

    assert_eq!(channel.attach_count(), 2);
    assert!(bridge.is_attached(1));
}

#[tokio::test]
async fn test_detach_all() {
    let (engine, _tabs, bridge) = bridge_with_tabs(3).await;
    bridge.send(1, "Page.enable", json!({})).await.unwrap();
    bridge.send(3, "Page.enable", json!({})).await.unwrap();

    assert_eq!(bridge.detach_all().await, vec![1, 3]);
    assert!(!bridge.is_attached(1));
    assert!(!bridge.is_attached(3));
    assert!(!engine.view(0).unwrap().debug_channel().is_attached());
    assert!(!engine.view(2).unwrap().debug_channel().is_attached());
}

#[tokio::test]
async fn test_withdraw_during_attach_reports_withdrawn_session() {
    let (engine, tabs, bridge) = bridge_with_tabs(1).await;
    let channel = engine.view(0).unwrap().debug_channel();
    channel.set_attach_delay(Duration::from_millis(100));

    let pending = {
        let bridge = bridge.clone();
        tokio::spawn(async move { bridge.send(1, "Page.enable", json!({})).await })
    };
    assert!(wait_until(|| channel.attach_count() == 1).await);
    assert!(bridge.detach_all().await.is_empty());

    let err = pending.await.unwrap().unwrap_err();
    assert!(matches!(err, DebugError::SessionWithdrawn(1)));
    assert!(tabs.contains(1));
    assert!(!channel.is_attached());

    // The next command starts a fresh session.
    bridge.send(1, "Page.enable", json!({})).await.unwrap();
    assert!(bridge.is_attached(1));
    assert_eq!(channel.attach_count(), 2);
}

#[tokio::test]
async fn test_close_during_attach_reports_unknown_tab() {
    let (engine, tabs, bridge) = bridge_with_tabs(1).await;
    let channel = engine.view(0).unwrap().debug_channel();
    channel.set_attach_delay(Duration::from_millis(100));

    let pending = {
        let bridge = bridge.clone();
        tokio::spawn(async move { bridge.send(1, "Page.enable", json!({})).await })
    };
    assert!(wait_until(|| channel.attach_count() == 1).await);
    tabs.close_tab(1).await.unwrap();

    let err = pending.await.unwrap().unwrap_err();
    assert!(matches!(err, DebugError::UnknownTab(1)));
}
