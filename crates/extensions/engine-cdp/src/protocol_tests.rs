use super::*;
use serde_json::json;

#[test]
fn test_cdp_request_serialize() {
    let req = CdpRequest {
        id: 1,
        method: "Page.navigate".to_string(),
        params: Some(json!({"url": "https://example.com"})),
        session_id: Some("S1".to_string()),
    };
    let json = serde_json::to_value(&req).unwrap();
    assert_eq!(
        json,
        json!({"id": 1, "method": "Page.navigate", "params": {"url": "https://example.com"}, "sessionId": "S1"})
    );
}

#[test]
fn test_cdp_request_omits_empty_fields() {
    let req = CdpRequest {
        id: 2,
        method: "Target.getTargets".to_string(),
        params: None,
        session_id: None,
    };
    let json = serde_json::to_string(&req).unwrap();
    assert!(!json.contains("params"));
    assert!(!json.contains("sessionId"));
}

#[test]
fn test_cdp_response_deserialize() {
    let resp: CdpResponse =
        serde_json::from_str(r#"{"id": 1, "result": {"frameId": "abc"}}"#).unwrap();
    assert_eq!(resp.id, Some(1));
    assert!(resp.result.is_some());
    assert!(resp.method.is_none());
}

#[test]
fn test_browser_version_deserialize() {
    let version: BrowserVersion = serde_json::from_str(
        r#"{
            "Browser": "Chrome/120.0.0.0",
            "Protocol-Version": "1.3",
            "User-Agent": "Mozilla/5.0",
            "webSocketDebuggerUrl": "ws://127.0.0.1:9222/devtools/browser/abc"
        }"#,
    )
    .unwrap();
    assert_eq!(version.protocol_version, "1.3");
    assert!(version.web_socket_debugger_url.ends_with("/abc"));
}

#[test]
fn test_frame_full_url_appends_fragment() {
    let frame = Frame {
        id: "F".to_string(),
        parent_id: None,
        url: "https://a.example/doc".to_string(),
        url_fragment: Some("#top".to_string()),
    };
    assert_eq!(frame.full_url(), "https://a.example/doc#top");
}

#[test]
fn test_exception_summary_uses_first_description_line() {
    let details: ExceptionDetails = serde_json::from_value(json!({
        "exceptionId": 1,
        "text": "Uncaught",
        "lineNumber": 0,
        "columnNumber": 6,
        "exception": {"type": "object", "subtype": "error", "description": "Error: boom\n    at <anonymous>:1:7"}
    }))
    .unwrap();
    assert_eq!(details.summary(), "Uncaught Error: boom");
}

#[test]
fn test_exception_summary_for_thrown_primitive() {
    let details: ExceptionDetails = serde_json::from_value(json!({
        "text": "Uncaught",
        "exception": {"type": "string", "value": "nope"}
    }))
    .unwrap();
    assert_eq!(details.summary(), "Uncaught nope");

    let bare: ExceptionDetails = serde_json::from_value(json!({"text": "SyntaxError"})).unwrap();
    assert_eq!(bare.summary(), "SyntaxError");
}
