use super::*;

#[test]
fn test_cdp_request_serialize() {
    let req = CdpRequest {
        id: 1,
        method: "Target.closeTarget".to_string(),
        params: Some(serde_json::json!({"targetId": "ABC"})),
        session_id: None,
    };
    let json = serde_json::to_string(&req).unwrap();
    assert!(json.contains("Target.closeTarget"));
    assert!(!json.contains("sessionId"));
}

#[test]
fn test_cdp_request_with_session() {
    let req = CdpRequest {
        id: 2,
        method: "Page.captureScreenshot".to_string(),
        params: None,
        session_id: Some("S1".to_string()),
    };
    let json = serde_json::to_value(&req).unwrap();
    assert_eq!(json["sessionId"], "S1");
    assert!(json.get("params").is_none());
}

#[test]
fn test_cdp_response_deserialize() {
    let json = r#"{"id": 1, "result": {"sessionId": "abc"}}"#;
    let resp: CdpResponse = serde_json::from_str(json).unwrap();
    assert_eq!(resp.id, Some(1));
    assert_eq!(resp.result.unwrap()["sessionId"], "abc");
}

#[test]
fn test_cdp_error_response() {
    let json = r#"{"id": 3, "error": {"code": -32000, "message": "No target"}}"#;
    let resp: CdpResponse = serde_json::from_str(json).unwrap();
    let error = resp.error.unwrap();
    assert_eq!(error.code, -32000);
    assert_eq!(error.message, "No target");
}

#[test]
fn test_page_info_deserialize() {
    let json = r#"[
        {
            "id": "page123",
            "type": "page",
            "title": "Test",
            "url": "https://example.com",
            "faviconUrl": "https://example.com/favicon.ico",
            "webSocketDebuggerUrl": "ws://localhost:9222/devtools/page/page123"
        },
        {
            "id": "worker1",
            "type": "service_worker",
            "url": "https://example.com/sw.js"
        }
    ]"#;
    let pages: Vec<PageInfo> = serde_json::from_str(json).unwrap();
    assert_eq!(pages[0].id, "page123");
    assert!(pages[0].is_tab());
    assert_eq!(
        pages[0].favicon_url.as_deref(),
        Some("https://example.com/favicon.ico")
    );
    assert!(!pages[1].is_tab());
    assert_eq!(pages[1].title, "");
}

#[test]
fn test_browser_version_deserialize() {
    let json = r#"{
        "Browser": "Chrome/126.0.0.0",
        "Protocol-Version": "1.3",
        "webSocketDebuggerUrl": "ws://localhost:9222/devtools/browser/xyz"
    }"#;
    let version: BrowserVersion = serde_json::from_str(json).unwrap();
    assert_eq!(version.browser, "Chrome/126.0.0.0");
    assert!(version.web_socket_debugger_url.ends_with("/xyz"));
}

#[test]
fn test_window_for_target_deserialize() {
    let json = r#"{"windowId": 7, "bounds": {"left": 0, "windowState": "minimized"}}"#;
    let window: WindowForTarget = serde_json::from_str(json).unwrap();
    assert_eq!(window.window_id, 7);
    assert_eq!(window.bounds.window_state, Some(WindowState::Minimized));
}

#[test]
fn test_screenshot_format() {
    assert_eq!(serde_json::to_string(&ScreenshotFormat::Jpeg).unwrap(), "\"jpeg\"");
    assert_eq!(ScreenshotFormat::Png.mime(), "image/png");
}
