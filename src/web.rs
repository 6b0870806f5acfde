//! HTTP callback server for the settings page.
//!
//! The page redirects to `/close?response=<encoded JSON>` when the user is
//! done, and `/configure` lets anything on the local network start a
//! configuration round. Both only enqueue events for the sync controller.

use std::net::SocketAddr;

use axum::{
    Router,
    extract::{RawQuery, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::controller::BridgeEvent;

const RESPONSE_PARAM: &str = "response";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 8080,
        }
    }
}

#[derive(Clone)]
struct AppState {
    events: mpsc::Sender<BridgeEvent>,
}

pub fn router(events: mpsc::Sender<BridgeEvent>) -> Router {
    Router::new()
        .route("/configure", get(configure_handler))
        .route("/close", get(close_handler))
        .route("/health", get(health_handler))
        .with_state(AppState { events })
}

/// Binds the callback server and serves it in the background. Returns the
/// bound address, or `None` when the server is disabled.
pub async fn start_web_server(
    config: &WebConfig,
    events: mpsc::Sender<BridgeEvent>,
) -> Result<Option<SocketAddr>, std::io::Error> {
    if !config.enabled {
        info!("Settings callback server is disabled");
        return Ok(None);
    }

    let listener = TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], config.port))).await?;
    let addr = listener.local_addr()?;
    info!("Starting settings callback server on http://{}", addr);

    let app = router(events);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Callback server error: {}", e);
        }
    });

    Ok(Some(addr))
}

/// Pulls the raw `response` parameter out of a query string without decoding
/// it; the controller decodes the payload itself.
fn raw_response(query: Option<&str>) -> Option<String> {
    query?
        .split('&')
        .find_map(|pair| match pair.split_once('=') {
            Some((RESPONSE_PARAM, value)) => Some(value.to_string()),
            Some(_) => None,
            None if pair == RESPONSE_PARAM => Some(String::new()),
            None => None,
        })
        .filter(|value| !value.is_empty())
}

async fn enqueue(state: &AppState, event: BridgeEvent) -> Result<(), Response> {
    state.events.send(event).await.map_err(|_| {
        warn!("Sync controller is not running");
        (StatusCode::SERVICE_UNAVAILABLE, "Bridge is shutting down").into_response()
    })
}

async fn configure_handler(State(state): State<AppState>) -> Response {
    match enqueue(&state, BridgeEvent::ShowConfiguration).await {
        Ok(()) => (StatusCode::ACCEPTED, "Opening settings").into_response(),
        Err(response) => response,
    }
}

async fn close_handler(State(state): State<AppState>, RawQuery(query): RawQuery) -> Response {
    let response = raw_response(query.as_deref());
    match enqueue(&state, BridgeEvent::WebviewClosed(response)).await {
        Ok(()) => Html("<html><body><p>Settings received, you can close this window.</p></body></html>")
            .into_response(),
        Err(response) => response,
    }
}

async fn health_handler() -> Response {
    (StatusCode::OK, "OK").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn start() -> (SocketAddr, mpsc::Receiver<BridgeEvent>) {
        let (sender, receiver) = mpsc::channel(8);
        let config = WebConfig {
            enabled: true,
            port: 0,
        };
        let addr = start_web_server(&config, sender).await.unwrap().unwrap();
        (SocketAddr::from(([127, 0, 0, 1], addr.port())), receiver)
    }

    #[test]
    fn test_response_param_stays_encoded() {
        assert_eq!(
            raw_response(Some("response=%7B%22hourVibrate%22%3A1%7D")).as_deref(),
            Some("%7B%22hourVibrate%22%3A1%7D")
        );
        assert_eq!(
            raw_response(Some("x=1&response=CANCELLED")).as_deref(),
            Some("CANCELLED")
        );
        assert_eq!(raw_response(Some("response=")), None);
        assert_eq!(raw_response(Some("response")), None);
        assert_eq!(raw_response(Some("other=1")), None);
        assert_eq!(raw_response(None), None);
    }

    #[tokio::test]
    async fn test_close_enqueues_raw_response() {
        let (addr, mut events) = start().await;
        let resp = reqwest::get(format!(
            "http://{addr}/close?response=%7B%22hourVibrate%22%3A1%7D"
        ))
        .await
        .unwrap();
        assert!(resp.status().is_success());
        assert_eq!(
            events.recv().await.unwrap(),
            BridgeEvent::WebviewClosed(Some("%7B%22hourVibrate%22%3A1%7D".to_string()))
        );
    }

    #[tokio::test]
    async fn test_close_without_response_is_absent() {
        let (addr, mut events) = start().await;
        reqwest::get(format!("http://{addr}/close")).await.unwrap();
        assert_eq!(events.recv().await.unwrap(), BridgeEvent::WebviewClosed(None));
    }

    #[tokio::test]
    async fn test_configure_enqueues_show_configuration() {
        let (addr, mut events) = start().await;
        let resp = reqwest::get(format!("http://{addr}/configure")).await.unwrap();
        assert_eq!(resp.status().as_u16(), 202);
        assert_eq!(events.recv().await.unwrap(), BridgeEvent::ShowConfiguration);
    }

    #[tokio::test]
    async fn test_health() {
        let (addr, _events) = start().await;
        let resp = reqwest::get(format!("http://{addr}/health")).await.unwrap();
        assert!(resp.status().is_success());
        assert_eq!(resp.text().await.unwrap(), "OK");
    }

    #[tokio::test]
    async fn test_disabled_server_does_not_bind() {
        let (sender, _receiver) = mpsc::channel(1);
        let config = WebConfig {
            enabled: false,
            port: 0,
        };
        assert_eq!(start_web_server(&config, sender).await.unwrap(), None);
    }
}
