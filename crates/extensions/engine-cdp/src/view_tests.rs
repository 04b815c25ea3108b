use super::*;

fn event(method: &str, params: Value) -> CdpEvent {
    CdpEvent {
        method: method.to_string(),
        params,
    }
}

fn translator() -> EventTranslator {
    EventTranslator::new("T1")
}

#[test]
fn test_top_frame_navigation_changes_url() {
    let mut t = translator();
    let out = t.translate(&event(
        "Page.frameNavigated",
        json!({"frame": {"id": "T1", "loaderId": "L1", "url": "https://a.example/", "urlFragment": "#x"}}),
    ));
    assert_eq!(out, Some(ViewEvent::UrlChanged("https://a.example/#x".to_string())));
}

#[test]
fn test_subframe_navigation_is_ignored() {
    let mut t = translator();
    let out = t.translate(&event(
        "Page.frameNavigated",
        json!({"frame": {"id": "F2", "parentId": "T1", "url": "https://ads.example/"}}),
    ));
    assert_eq!(out, None);
}

#[test]
fn test_same_document_navigation_of_main_frame() {
    let mut t = translator();
    assert_eq!(
        t.translate(&event(
            "Page.navigatedWithinDocument",
            json!({"frameId": "T1", "url": "https://a.example/#section"}),
        )),
        Some(ViewEvent::UrlChanged("https://a.example/#section".to_string()))
    );
    assert_eq!(
        t.translate(&event(
            "Page.navigatedWithinDocument",
            json!({"frameId": "F9", "url": "https://b.example/#y"}),
        )),
        None
    );
}

#[test]
fn test_title_change_reported_once() {
    let mut t = translator();
    let info = json!({"targetInfo": {"targetId": "T1", "type": "page", "title": "Example", "url": "https://a.example/"}});

    assert_eq!(
        t.translate(&event("Target.targetInfoChanged", info.clone())),
        Some(ViewEvent::TitleChanged("Example".to_string()))
    );
    assert_eq!(t.translate(&event("Target.targetInfoChanged", info)), None);
}

#[test]
fn test_failed_document_load() {
    let mut t = translator();
    t.translate(&event(
        "Network.requestWillBeSent",
        json!({"requestId": "R1", "frameId": "T1", "type": "Document", "request": {"url": "https://nowhere.invalid/"}}),
    ));
    let out = t.translate(&event(
        "Network.loadingFailed",
        json!({"requestId": "R1", "type": "Document", "errorText": "net::ERR_NAME_NOT_RESOLVED", "canceled": false}),
    ));

    assert_eq!(
        out,
        Some(ViewEvent::LoadFailed {
            url: "https://nowhere.invalid/".to_string(),
            code: -105,
            description: "net::ERR_NAME_NOT_RESOLVED".to_string(),
        })
    );
}

#[test]
fn test_canceled_and_subresource_failures_ignored() {
    let mut t = translator();
    t.translate(&event(
        "Network.requestWillBeSent",
        json!({"requestId": "R1", "frameId": "T1", "type": "Document", "request": {"url": "https://a.example/"}}),
    ));
    assert_eq!(
        t.translate(&event(
            "Network.loadingFailed",
            json!({"requestId": "R1", "type": "Document", "errorText": "net::ERR_ABORTED", "canceled": true}),
        )),
        None
    );

    t.translate(&event(
        "Network.requestWillBeSent",
        json!({"requestId": "R2", "frameId": "T1", "type": "Image", "request": {"url": "https://a.example/x.png"}}),
    ));
    assert_eq!(
        t.translate(&event(
            "Network.loadingFailed",
            json!({"requestId": "R2", "type": "Image", "errorText": "net::ERR_FAILED"}),
        )),
        None
    );
}

#[test]
fn test_finished_document_is_forgotten() {
    let mut t = translator();
    t.translate(&event(
        "Network.requestWillBeSent",
        json!({"requestId": "R1", "frameId": "T1", "type": "Document", "request": {"url": "https://a.example/"}}),
    ));
    t.translate(&event("Network.loadingFinished", json!({"requestId": "R1"})));
    assert!(t.documents.is_empty());
}

#[test]
fn test_malformed_event_is_ignored() {
    let mut t = translator();
    assert_eq!(t.translate(&event("Page.frameNavigated", json!({"nope": 1}))), None);
    assert_eq!(t.translate(&event("Runtime.consoleAPICalled", json!({}))), None);
}

#[test]
fn test_net_error_codes() {
    assert_eq!(net_error_code("net::ERR_CONNECTION_REFUSED"), -102);
    assert_eq!(net_error_code("ERR_NAME_NOT_RESOLVED"), -105);
    assert_eq!(net_error_code("net::ERR_SOMETHING_NEW"), -2);
}
