use super::*;

fn response(value: Value) -> CdpResponse {
    serde_json::from_value(value).unwrap()
}

#[test]
fn test_session_events_route_by_session() {
    let resp = response(json!({
        "method": "Page.frameNavigated",
        "sessionId": "S1",
        "params": {"frame": {"id": "T1", "url": "https://a.example/"}}
    }));
    assert_eq!(Route::of(&resp), Some(Route::Session("S1".to_string())));
}

#[test]
fn test_target_events_route_by_target() {
    let resp = response(json!({
        "method": "Target.targetInfoChanged",
        "params": {"targetInfo": {"targetId": "T7", "type": "page", "title": "A", "url": "about:blank"}}
    }));
    assert_eq!(Route::of(&resp), Some(Route::Target("T7".to_string())));

    let destroyed = response(json!({
        "method": "Target.targetDestroyed",
        "params": {"targetId": "T7"}
    }));
    assert_eq!(Route::of(&destroyed), Some(Route::Target("T7".to_string())));
}

#[test]
fn test_other_browser_events_are_unrouted() {
    let resp = response(json!({"method": "Browser.downloadWillBegin", "params": {}}));
    assert_eq!(Route::of(&resp), None);
}

#[test]
fn test_reply_resolves_pending_request() {
    let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
    let routes: Routes = Arc::new(Mutex::new(HashMap::new()));
    let (tx, mut rx) = oneshot::channel();
    pending.lock().insert(3, PendingRequest { tx });

    CdpClient::handle_message(
        response(json!({"id": 3, "error": {"code": -32601, "message": "'Foo.bar' wasn't found"}})),
        &pending,
        &routes,
    );

    match rx.try_recv().unwrap() {
        Err(CdpError::Protocol { code, message }) => {
            assert_eq!(code, -32601);
            assert_eq!(message, "'Foo.bar' wasn't found");
        }
        other => panic!("unexpected reply: {:?}", other),
    }
    assert!(pending.lock().is_empty());
}

#[test]
fn test_event_is_delivered_and_dead_route_dropped() {
    let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
    let routes: Routes = Arc::new(Mutex::new(HashMap::new()));
    let (tx, mut rx) = mpsc::unbounded_channel();
    routes.lock().insert(Route::Session("S1".to_string()), tx);

    let event = || {
        response(json!({"method": "Runtime.consoleAPICalled", "sessionId": "S1", "params": {"type": "log"}}))
    };
    CdpClient::handle_message(event(), &pending, &routes);
    let received = rx.try_recv().unwrap();
    assert_eq!(received.method, "Runtime.consoleAPICalled");
    assert_eq!(received.params["type"], "log");

    drop(rx);
    CdpClient::handle_message(event(), &pending, &routes);
    assert!(routes.lock().is_empty());
}
