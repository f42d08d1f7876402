use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;

use crate::error::ForwardError;
use crate::forwarder::CollectorSink;

/// How long one POST may take, connect to response, before it is abandoned.
pub const DEFAULT_COLLECTOR_TIMEOUT: Duration = Duration::from_secs(10);

/// POSTs each record to an HTTP collector endpoint.
#[derive(Debug, Clone)]
pub struct HttpCollectorSink {
    url: String,
    client: Client,
}

impl HttpCollectorSink {
    pub fn new(url: &str) -> anyhow::Result<Self> {
        Self::with_timeout(url, DEFAULT_COLLECTOR_TIMEOUT)
    }

    pub fn with_timeout(url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| anyhow::anyhow!("Invalid collector URL '{url}': {e}"))?;
        if !matches!(parsed.host_str(), Some(host) if !host.is_empty()) {
            anyhow::bail!("Collector URL has no host: {url}");
        }

        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.to_string(),
            client,
        })
    }
}

#[async_trait]
impl CollectorSink for HttpCollectorSink {
    fn name(&self) -> &str {
        &self.url
    }

    async fn submit(&self, payload: String) -> Result<(), ForwardError> {
        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await
            .map_err(|e| {
                ForwardError::Transport(format!("Failed to post to collector at '{}': {e}", self.url))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ForwardError::Status(status.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio_test::{assert_err, assert_ok};

    /// Accept one connection, capture the request and answer with `status_line`.
    async fn one_shot_server(status_line: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 64 * 1024];
            let mut request = Vec::new();
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request).to_string();
                if let Some(split) = text.find("\r\n\r\n") {
                    let length = text[..split]
                        .lines()
                        .find_map(|l| {
                            let (name, value) = l.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())?
                        })
                        .unwrap_or(0);
                    if request.len() >= split + 4 + length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            let response = format!("{status_line}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8(request).unwrap()
        });
        (format!("http://{addr}/records"), handle)
    }

    #[tokio::test]
    async fn test_posts_json_body() {
        let (url, server) = one_shot_server("HTTP/1.1 200 OK").await;
        let sink = HttpCollectorSink::new(&url).unwrap();

        assert_ok!(sink.submit(r#"{"TestRun":"abc"}"#.to_string()).await);

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /records HTTP/1.1\r\n"));
        assert!(request
            .to_ascii_lowercase()
            .contains("content-type: application/json"));
        assert!(request.ends_with(r#"{"TestRun":"abc"}"#));
    }

    #[tokio::test]
    async fn test_accepted_counts_as_success() {
        let (url, server) = one_shot_server("HTTP/1.1 202 Accepted").await;
        let sink = HttpCollectorSink::new(&url).unwrap();

        assert_ok!(sink.submit("{}".to_string()).await);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let (url, server) = one_shot_server("HTTP/1.1 500 Internal Server Error").await;
        let sink = HttpCollectorSink::new(&url).unwrap();

        match assert_err!(sink.submit("{}".to_string()).await) {
            ForwardError::Status(status) => assert_eq!(status, "500 Internal Server Error"),
            other => panic!("unexpected error: {other}"),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_silent_collector_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            // Hold the connection open without ever answering.
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(socket);
        });

        let sink =
            HttpCollectorSink::with_timeout(&format!("http://{addr}/records"), Duration::from_millis(200))
                .unwrap();
        let submitted = tokio::time::timeout(Duration::from_secs(5), sink.submit("{}".to_string())).await;

        let err = assert_err!(assert_ok!(submitted));
        assert!(matches!(err, ForwardError::Transport(_)));
        server.abort();
    }

    #[tokio::test]
    async fn test_unreachable_collector_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let sink = HttpCollectorSink::new(&format!("http://{addr}/")).unwrap();
        let err = assert_err!(sink.submit("{}".to_string()).await);
        assert!(matches!(err, ForwardError::Transport(_)));
    }

    #[test]
    fn test_url_parsing() {
        assert!(HttpCollectorSink::new("http://localhost:9000").is_ok());
        assert!(HttpCollectorSink::new("http://").is_err());
        assert!(HttpCollectorSink::new("not a url").is_err());
    }
}
