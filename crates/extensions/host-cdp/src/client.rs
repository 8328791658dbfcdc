//! CDP WebSocket client.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, trace, warn};

use crate::error::CdpError;
use crate::protocol::{
    BrowserVersion, CdpRequest, CdpResponse, PageInfo, ScreenshotFormat, WindowForTarget,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;
type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value, CdpError>>>>>;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetch the page targets listed by the HTTP discovery endpoint.
///
/// The browser lists pages most recently activated first.
pub async fn fetch_pages(http_endpoint: &str) -> Result<Vec<PageInfo>, CdpError> {
    let url = format!("{}/json/list", http_endpoint.trim_end_matches('/'));
    let pages: Vec<PageInfo> = reqwest::get(&url).await?.error_for_status()?.json().await?;
    Ok(pages)
}

/// Browser-level CDP connection.
pub struct CdpClient {
    /// HTTP endpoint for page discovery.
    http_endpoint: String,
    ws_tx: tokio::sync::Mutex<WsSink>,
    request_id: AtomicU64,
    /// Requests waiting for their response.
    pending: PendingMap,
    recv_task: tokio::task::JoinHandle<()>,
}

impl CdpClient {
    /// Connect to the browser at `endpoint` (e.g. "http://localhost:9222").
    pub async fn connect(endpoint: &str) -> Result<Self, CdpError> {
        let http_endpoint = endpoint.trim_end_matches('/').to_string();
        url::Url::parse(&http_endpoint)?;

        let version_url = format!("{}/json/version", http_endpoint);
        debug!("Fetching browser version from {}", version_url);
        let version: BrowserVersion = reqwest::get(&version_url)
            .await
            .map_err(|e| CdpError::BrowserNotAvailable(format!("{}: {}", endpoint, e)))?
            .json()
            .await
            .map_err(|e| CdpError::BrowserNotAvailable(format!("{}: {}", endpoint, e)))?;
        debug!("Connected to browser: {}", version.browser);

        let (ws_stream, _) = tokio_tungstenite::connect_async(&version.web_socket_debugger_url)
            .await
            .map_err(|e| CdpError::ConnectionFailed(format!("WebSocket: {}", e)))?;
        let (ws_sink, ws_source) = ws_stream.split();

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let recv_task = tokio::spawn(Self::receive_loop(ws_source, pending.clone()));

        Ok(Self {
            http_endpoint,
            ws_tx: tokio::sync::Mutex::new(ws_sink),
            request_id: AtomicU64::new(1),
            pending,
            recv_task,
        })
    }

    async fn receive_loop(mut ws_source: WsSource, pending: PendingMap) {
        while let Some(msg) = ws_source.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    trace!("CDP recv: {}", text);
                    let resp = match serde_json::from_str::<CdpResponse>(&text) {
                        Ok(resp) => resp,
                        Err(e) => {
                            warn!("Failed to parse CDP message: {}", e);
                            continue;
                        }
                    };
                    // Events carry no id and are not subscribed to.
                    let Some(id) = resp.id else {
                        continue;
                    };
                    let Some(tx) = pending.lock().remove(&id) else {
                        continue;
                    };
                    let result = match resp.error {
                        Some(error) => Err(CdpError::Protocol {
                            code: error.code,
                            message: error.message,
                        }),
                        None => Ok(resp.result.unwrap_or(Value::Null)),
                    };
                    let _ = tx.send(result);
                }
                Ok(Message::Close(_)) => {
                    debug!("CDP WebSocket closed");
                    break;
                }
                Err(e) => {
                    error!("CDP WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }

        for (_, tx) in pending.lock().drain() {
            let _ = tx.send(Err(CdpError::SessionClosed));
        }
    }

    /// The receive loop has ended; every further call fails.
    pub fn is_closed(&self) -> bool {
        self.recv_task.is_finished()
    }

    pub fn http_endpoint(&self) -> &str {
        &self.http_endpoint
    }

    /// Send a CDP command and wait for its response.
    pub async fn call(
        &self,
        method: &str,
        params: Option<Value>,
        session_id: Option<&str>,
    ) -> Result<Value, CdpError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let request = CdpRequest {
            id,
            method: method.to_string(),
            params,
            session_id: session_id.map(|s| s.to_string()),
        };
        let json = serde_json::to_string(&request)?;
        trace!("CDP send: {}", json);

        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);

        {
            let mut ws = self.ws_tx.lock().await;
            if let Err(e) = ws.send(Message::Text(json.into())).await {
                self.pending.lock().remove(&id);
                return Err(e.into());
            }
        }

        match tokio::time::timeout(REQUEST_TIMEOUT, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(CdpError::SessionClosed),
            Err(_) => {
                self.pending.lock().remove(&id);
                Err(CdpError::Timeout(format!("Request {} timed out", method)))
            }
        }
    }

    pub async fn list_pages(&self) -> Result<Vec<PageInfo>, CdpError> {
        fetch_pages(&self.http_endpoint).await
    }

    pub async fn window_for_target(&self, target_id: &str) -> Result<WindowForTarget, CdpError> {
        let result = self
            .call(
                "Browser.getWindowForTarget",
                Some(json!({ "targetId": target_id })),
                None,
            )
            .await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Attach to a page and return the flat-mode session id.
    pub async fn attach(&self, target_id: &str) -> Result<String, CdpError> {
        let result = self
            .call(
                "Target.attachToTarget",
                Some(json!({
                    "targetId": target_id,
                    "flatten": true
                })),
                None,
            )
            .await?;

        result["sessionId"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| CdpError::InvalidResponse("Missing sessionId".to_string()))
    }

    pub async fn detach(&self, session_id: &str) -> Result<(), CdpError> {
        self.call(
            "Target.detachFromTarget",
            Some(json!({ "sessionId": session_id })),
            None,
        )
        .await?;
        Ok(())
    }

    /// Run `f` against a temporary session on `target_id`.
    ///
    /// The session is detached whether or not `f` succeeds.
    async fn with_session<T, F, Fut>(&self, target_id: &str, f: F) -> Result<T, CdpError>
    where
        F: FnOnce(String) -> Fut,
        Fut: std::future::Future<Output = Result<T, CdpError>>,
    {
        let session_id = self.attach(target_id).await?;
        let result = f(session_id.clone()).await;
        if let Err(e) = self.detach(&session_id).await {
            debug!("Detach from {} failed: {}", target_id, e);
        }
        result
    }

    /// Screenshot of the page's viewport as raw base64.
    pub async fn capture_screenshot(
        &self,
        target_id: &str,
        format: ScreenshotFormat,
        quality: u8,
    ) -> Result<String, CdpError> {
        self.with_session(target_id, |session_id| async move {
            let result = self
                .call(
                    "Page.captureScreenshot",
                    Some(json!({
                        "format": format,
                        "quality": quality,
                    })),
                    Some(&session_id),
                )
                .await?;
            result["data"]
                .as_str()
                .map(|s| s.to_string())
                .ok_or_else(|| CdpError::InvalidResponse("Missing screenshot data".to_string()))
        })
        .await
    }

    /// Evaluate a JavaScript expression in the page and return its value.
    pub async fn evaluate(&self, target_id: &str, expression: &str) -> Result<Value, CdpError> {
        self.with_session(target_id, |session_id| async move {
            let result = self
                .call(
                    "Runtime.evaluate",
                    Some(json!({
                        "expression": expression,
                        "returnByValue": true,
                        "awaitPromise": true,
                    })),
                    Some(&session_id),
                )
                .await?;

            if let Some(exception) = result.get("exceptionDetails") {
                let text = exception["text"].as_str().unwrap_or("Unknown error");
                return Err(CdpError::JavaScript(text.to_string()));
            }
            Ok(result["result"]["value"].clone())
        })
        .await
    }

    /// Close a page. Fails when the browser reports nothing was closed.
    pub async fn close_target(&self, target_id: &str) -> Result<(), CdpError> {
        let result = self
            .call(
                "Target.closeTarget",
                Some(json!({ "targetId": target_id })),
                None,
            )
            .await?;
        // Older browsers report `success`; newer ones return an empty object.
        if result.get("success").and_then(Value::as_bool) == Some(false) {
            return Err(CdpError::InvalidResponse(format!(
                "Target {} was not closed",
                target_id
            )));
        }
        Ok(())
    }
}

impl Drop for CdpClient {
    fn drop(&mut self) {
        self.recv_task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_pages() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json/list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "A", "type": "page", "title": "One", "url": "https://one.example"},
                {"id": "B", "type": "iframe", "title": "", "url": "https://ads.example"}
            ])))
            .mount(&server)
            .await;

        let pages = fetch_pages(&format!("{}/", server.uri())).await.unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].id, "A");
        assert!(!pages[1].is_tab());
    }

    #[tokio::test]
    async fn test_fetch_pages_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json/list"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = fetch_pages(&server.uri()).await.unwrap_err();
        assert!(matches!(err, CdpError::Http(_)));
    }

    #[tokio::test]
    async fn test_connect_without_browser() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json/version"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = CdpClient::connect(&server.uri()).await.err().unwrap();
        assert!(matches!(err, CdpError::BrowserNotAvailable(_)));
    }

    #[tokio::test]
    async fn test_connect_invalid_endpoint() {
        let err = CdpClient::connect("not a url").await.err().unwrap();
        assert!(matches!(err, CdpError::ConnectionFailed(_)));
    }
}
