//! HTTP transport for the news backend.
//!
//! `NewsApi` is the seam the sync controller talks through; `HttpNewsApi` is the
//! reqwest-backed implementation used by the binary.

use crate::model::{NewsPayload, StatusPayload, SyncConfig};
use serde::de::DeserializeOwned;
use std::future::Future;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ApiError {
    /// The request never completed (connect failure, timeout, reset).
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("{url} returned {status}: {body}")]
    Http {
        url: String,
        status: u16,
        body: String,
    },
    #[error("malformed response from {url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// The three backend calls the client makes.
pub trait NewsApi: Send + Sync + 'static {
    /// `GET /api/news`: full snapshot plus run status.
    fn fetch_news(&self) -> impl Future<Output = Result<NewsPayload, ApiError>> + Send;

    /// `POST /api/refresh`: ask the backend to start a classification run.
    fn request_refresh(&self) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// `GET /api/status`: run status only, no articles.
    fn fetch_status(&self) -> impl Future<Output = Result<StatusPayload, ApiError>> + Send;
}

pub struct HttpNewsApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpNewsApi {
    pub fn new(cfg: &SyncConfig) -> Result<Self, ApiError> {
        let base_url = cfg.base_url.trim_end_matches('/').to_string();
        let client = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(cfg.request_timeout)
            .build()
            .map_err(|e| ApiError::Transport {
                url: base_url.clone(),
                source: Box::new(e),
            })?;
        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, req: reqwest::RequestBuilder, url: &str) -> Result<String, ApiError> {
        let resp = req.send().await.map_err(|e| ApiError::Transport {
            url: url.to_string(),
            source: Box::new(e),
        })?;
        let status = resp.status();
        let body = resp.text().await.map_err(|e| ApiError::Transport {
            url: url.to_string(),
            source: Box::new(e),
        })?;
        if !status.is_success() {
            return Err(ApiError::Http {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path);
        debug!(url = %url, "GET");
        let body = self.send(self.client.get(&url), &url).await?;
        decode(&url, &body)
    }
}

fn decode<T: DeserializeOwned>(url: &str, body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|source| ApiError::Parse {
        url: url.to_string(),
        source,
    })
}

impl NewsApi for HttpNewsApi {
    async fn fetch_news(&self) -> Result<NewsPayload, ApiError> {
        self.get_json("/api/news").await
    }

    async fn request_refresh(&self) -> Result<(), ApiError> {
        let url = self.url("/api/refresh");
        debug!(url = %url, "POST");
        // Only acceptance matters; the body is ignored.
        self.send(self.client.post(&url), &url).await.map(|_| ())
    }

    async fn fetch_status(&self) -> Result<StatusPayload, ApiError> {
        self.get_json("/api/status").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let cfg = SyncConfig {
            base_url: "http://localhost:8000/".into(),
            ..Default::default()
        };
        let api = HttpNewsApi::new(&cfg).unwrap();
        assert_eq!(api.url("/api/status"), "http://localhost:8000/api/status");
    }

    #[test]
    fn decode_reports_parse_error_with_url() {
        let err = decode::<StatusPayload>("http://x/api/status", "<html>").unwrap_err();
        assert!(matches!(err, ApiError::Parse { .. }));
        assert!(err.to_string().contains("http://x/api/status"));
    }

    #[test]
    fn decode_status_body() {
        let s: StatusPayload = decode(
            "u",
            r#"{"running": true, "lastUpdated": null, "error": null, "progress": {"processed": 1, "total": 4}}"#,
        )
        .unwrap();
        assert!(s.running);
        assert_eq!(s.progress.map(|p| p.total), Some(4));
    }

    #[test]
    fn http_error_display_includes_status() {
        let err = ApiError::Http {
            url: "http://x/api/news".into(),
            status: 503,
            body: "busy".into(),
        };
        assert_eq!(err.to_string(), "http://x/api/news returned 503: busy");
    }

    fn api_for(addr: std::net::SocketAddr, timeout: std::time::Duration) -> HttpNewsApi {
        HttpNewsApi::new(&SyncConfig {
            base_url: format!("http://{addr}"),
            request_timeout: timeout,
            ..Default::default()
        })
        .unwrap()
    }

    /// Serve a single canned response on an ephemeral port.
    async fn one_shot_server(response: &'static str) -> std::net::SocketAddr {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let _ = sock.read(&mut buf).await;
            sock.write_all(response.as_bytes()).await.unwrap();
            let _ = sock.shutdown().await;
        });
        addr
    }

    #[tokio::test]
    async fn non_success_status_maps_to_http_error_with_body() {
        let addr = one_shot_server(
            "HTTP/1.1 503 Service Unavailable\r\nContent-Length: 4\r\nConnection: close\r\n\r\nbusy",
        )
        .await;
        let err = api_for(addr, std::time::Duration::from_secs(5))
            .fetch_status()
            .await
            .unwrap_err();
        match err {
            ApiError::Http { status, body, url } => {
                assert_eq!(status, 503);
                assert_eq!(body, "busy");
                assert!(url.ends_with("/api/status"));
            }
            other => panic!("expected Http error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn refused_connection_maps_to_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = api_for(addr, std::time::Duration::from_secs(5))
            .fetch_status()
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Transport { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn request_timeout_maps_to_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept and hold the connection without ever answering.
        let server = tokio::spawn(async move {
            let (sock, _) = listener.accept().await.unwrap();
            tokio::time::sleep(std::time::Duration::from_secs(5)).await;
            drop(sock);
        });

        let err = api_for(addr, std::time::Duration::from_millis(200))
            .fetch_news()
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Transport { .. }), "{err:?}");
        server.abort();
    }

    #[tokio::test]
    async fn refresh_accepts_any_success_body() {
        let addr = one_shot_server(
            "HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok",
        )
        .await;
        api_for(addr, std::time::Duration::from_secs(5))
            .request_refresh()
            .await
            .unwrap();
    }
}
