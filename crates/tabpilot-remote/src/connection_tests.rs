use super::*;
use tabpilot_core::testing::{wait_until, MockEngine};
use tabpilot_core::ShellOptions;
use tabpilot_protocols::StatusKind;

/// Nothing listens on port 1, so every connect fails fast.
const UNREACHABLE: &str = "ws://127.0.0.1:1/ws";

fn connection(policy: ReconnectPolicy) -> Arc<RemoteConnection> {
    let engine = Arc::new(MockEngine::new());
    let ctx = Arc::new(ShellContext::new(engine, None, ShellOptions::default()).unwrap());
    let config = ConnectionConfig {
        endpoint: UNREACHABLE.to_string(),
        heartbeat_interval_secs: 0,
        connect_timeout_secs: 2,
        ..ConnectionConfig::default()
    };
    RemoteConnection::with_policy(config, policy, ctx)
}

fn slow_policy() -> ReconnectPolicy {
    ReconnectPolicy::fixed(Duration::from_secs(60))
}

/// Pretend a session of the current generation is live.
fn live_generation(conn: &RemoteConnection, token: &str) -> u64 {
    let mut lifecycle = conn.lifecycle.lock();
    lifecycle.generation += 1;
    lifecycle.token = Some(token.to_string());
    conn.state.send_replace(ConnectionState::Connected);
    lifecycle.generation
}

async fn seed_status(conn: &RemoteConnection) -> u64 {
    let ctx = conn.context();
    let id = ctx.tabs().create_tab("https://a.example", true).await.unwrap();
    ctx.status().set_status(id, StatusKind::InProgress, None);
    id
}

#[tokio::test]
async fn test_connect_without_credential_stays_disconnected() {
    let conn = connection(slow_policy());
    conn.connect(None).await;

    assert_eq!(conn.state(), ConnectionState::Disconnected);
    assert!(!conn.reconnect_pending());
    assert!(!conn.has_credential());
}

#[tokio::test]
async fn test_failed_connect_schedules_one_reconnect() {
    let conn = connection(slow_policy());
    conn.connect(Some("token".to_string())).await;

    assert!(wait_until(|| conn.reconnect_pending()).await);
    assert_eq!(conn.state(), ConnectionState::Disconnected);
    assert_eq!(conn.attempts(), 1);

    conn.disconnect().await;
    assert!(!conn.reconnect_pending());
}

#[tokio::test]
async fn test_connect_while_active_is_noop() {
    let conn = connection(slow_policy());
    let generation = live_generation(&conn, "first");

    conn.connect(Some("second".to_string())).await;

    let lifecycle = conn.lifecycle.lock();
    assert_eq!(lifecycle.generation, generation);
    assert_eq!(lifecycle.token.as_deref(), Some("first"));
    assert!(lifecycle.session.is_none());
}

#[tokio::test]
async fn test_normal_close_does_not_reconnect() {
    let conn = connection(slow_policy());
    let tab = seed_status(&conn).await;
    let generation = live_generation(&conn, "token");

    conn.handle_closed(generation, CloseReason::from_code(1000, "bye"))
        .await;

    assert_eq!(conn.state(), ConnectionState::Disconnected);
    assert!(!conn.reconnect_pending());
    assert!(conn.context().status().get_status(tab).is_none());
}

#[tokio::test]
async fn test_auth_rejection_is_terminal() {
    let conn = connection(slow_policy());
    let tab = seed_status(&conn).await;
    let generation = live_generation(&conn, "bad-token");
    let mut states = conn.subscribe_state();
    states.mark_unchanged();

    conn.handle_closed(generation, CloseReason::from_code(4001, "invalid token"))
        .await;

    assert_eq!(conn.state(), ConnectionState::Disconnected);
    assert!(!conn.reconnect_pending());
    assert!(!conn.has_credential());
    assert_eq!(conn.attempts(), 0);
    assert!(conn.context().status().get_status(tab).is_none());
    assert!(states.has_changed().unwrap());
}

#[tokio::test]
async fn test_abnormal_close_reconnects_once() {
    let conn = connection(slow_policy());
    let tab = seed_status(&conn).await;
    let generation = live_generation(&conn, "token");

    conn.handle_closed(generation, CloseReason::abnormal()).await;

    assert_eq!(conn.state(), ConnectionState::Disconnected);
    assert!(conn.reconnect_pending());
    assert_eq!(conn.attempts(), 1);
    assert!(conn.context().status().get_status(tab).is_none());

    // A second failure report for the same session must not arm another timer.
    conn.schedule_reconnect(generation);
    assert_eq!(conn.attempts(), 1);

    conn.disconnect().await;
}

#[tokio::test]
async fn test_socket_failure_reconnects() {
    let conn = connection(slow_policy());
    let generation = live_generation(&conn, "token");

    conn.handle_closed(
        generation,
        CloseReason::Failed(ConnectionError::WebSocket("reset".to_string())),
    )
    .await;

    assert!(conn.reconnect_pending());
    conn.disconnect().await;
}

#[tokio::test]
async fn test_server_going_away_reconnects() {
    let conn = connection(slow_policy());
    let tab = seed_status(&conn).await;
    let generation = live_generation(&conn, "token");

    conn.handle_closed(generation, CloseReason::from_code(1001, "restarting"))
        .await;

    assert_eq!(conn.state(), ConnectionState::Disconnected);
    assert!(conn.reconnect_pending());
    assert!(conn.has_credential());
    assert!(conn.context().status().get_status(tab).is_none());
    conn.disconnect().await;
}

#[tokio::test]
async fn test_stale_session_ignored() {
    let conn = connection(slow_policy());
    let generation = live_generation(&conn, "token");
    live_generation(&conn, "token");

    conn.handle_closed(generation, CloseReason::abnormal()).await;

    assert_eq!(conn.state(), ConnectionState::Connected);
    assert!(!conn.reconnect_pending());
}

#[tokio::test]
async fn test_reconnect_budget_exhausted() {
    let mut policy = slow_policy();
    policy.max_attempts = 1;
    let conn = connection(policy);

    let generation = live_generation(&conn, "token");
    conn.handle_closed(generation, CloseReason::abnormal()).await;
    assert!(conn.reconnect_pending());
    if let Some(timer) = conn.lifecycle.lock().reconnect.take() {
        timer.abort();
    }

    let generation = live_generation(&conn, "token");
    conn.handle_closed(generation, CloseReason::abnormal()).await;
    assert!(!conn.reconnect_pending());
    assert_eq!(conn.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_explicit_connect_cancels_pending_timer() {
    let conn = connection(slow_policy());
    let generation = live_generation(&conn, "token");
    conn.handle_closed(generation, CloseReason::abnormal()).await;
    assert!(conn.reconnect_pending());

    conn.connect(Some("fresh".to_string())).await;

    // The old timer is gone; the new attempt fails and arms exactly one new timer.
    assert!(wait_until(|| conn.reconnect_pending()).await);
    assert_eq!(conn.attempts(), 1);
    conn.disconnect().await;
}

#[tokio::test]
async fn test_disconnect_withdraws_automation() {
    let conn = connection(slow_policy());
    let ctx = conn.context().clone();
    let a = ctx.tabs().create_tab("https://a.example", true).await.unwrap();
    let b = ctx.tabs().create_tab("https://b.example", false).await.unwrap();
    ctx.status().set_status(a, StatusKind::InProgress, None);
    ctx.status().set_status(b, StatusKind::InProgress, None);
    ctx.debug().send(a, "Page.enable", serde_json::json!({})).await.unwrap();

    conn.disconnect().await;

    assert!(ctx.status().get_status(a).is_none());
    assert!(ctx.status().get_status(b).is_none());
    assert!(!ctx.debug().is_attached(a));
    assert_eq!(conn.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_registration_resets_attempts() {
    let conn = connection(slow_policy());
    conn.attempts.store(4, Ordering::SeqCst);

    conn.on_registered(Some("user-1".to_string()));

    assert_eq!(conn.attempts(), 0);
    assert_eq!(conn.user_id().as_deref(), Some("user-1"));
}
