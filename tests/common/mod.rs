//! Shared utilities for integration testing.
//!
//! Backends are raw TCP listeners speaking just enough HTTP/1.1 to stand in
//! for an origin or the configuration service.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::http::StatusCode;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use edge_augment::config::AugmentConfig;
use edge_augment::{HttpServer, Shutdown};

/// Tenant used by every test proxy.
pub const TENANT: &str = "tenant42";

/// A canned response.
#[derive(Clone)]
pub struct MockResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<String>,
    pub chunked: bool,
    pub delay: Duration,
}

impl MockResponse {
    pub fn new(status: u16, content_type: &str, body: &str) -> Self {
        Self {
            status,
            headers: vec![("Content-Type".to_string(), content_type.to_string())],
            body: vec![body.to_string()],
            chunked: false,
            delay: Duration::ZERO,
        }
    }

    pub fn html(body: &str) -> Self {
        Self::new(200, "text/html; charset=utf-8", body)
    }

    pub fn json(body: &str) -> Self {
        Self::new(200, "application/json", body)
    }

    pub fn not_found() -> Self {
        Self::new(404, "text/plain", "not found")
    }

    /// Send the body as separate chunks with `Transfer-Encoding: chunked`.
    pub fn chunked(mut self, parts: &[&str]) -> Self {
        self.body = parts.iter().map(|p| p.to_string()).collect();
        self.chunked = true;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Wait before answering.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// A request as the backend saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A running mock backend.
pub struct MockBackend {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockBackend {
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

/// Start a programmable backend that answers based on method and path.
pub async fn start_backend<F>(handler: F) -> MockBackend
where
    F: Fn(&str, &str) -> MockResponse + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let handler = Arc::new(handler);

    let recorded = requests.clone();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let handler = handler.clone();
            let recorded = recorded.clone();
            tokio::spawn(async move {
                let _ = serve_connection(socket, handler.as_ref(), &recorded).await;
            });
        }
    });

    MockBackend { addr, requests }
}

async fn serve_connection<F>(
    mut socket: TcpStream,
    handler: &F,
    recorded: &Mutex<Vec<RecordedRequest>>,
) -> Option<()>
where
    F: Fn(&str, &str) -> MockResponse,
{
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let head_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split(' ');
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(n, v)| (n.trim().to_string(), v.trim().to_string()))
        .collect();

    let length = headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = buf[head_end..].to_vec();
    while body.len() < length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    let response = handler(&method, &path);
    recorded.lock().unwrap().push(RecordedRequest {
        method: method.clone(),
        path,
        headers,
        body,
    });

    if !response.delay.is_zero() {
        tokio::time::sleep(response.delay).await;
    }
    write_response(&mut socket, &method, &response).await;
    Some(())
}

async fn write_response(socket: &mut TcpStream, method: &str, response: &MockResponse) {
    let reason = StatusCode::from_u16(response.status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown");
    let mut head = format!("HTTP/1.1 {} {}\r\n", response.status, reason);
    for (name, value) in &response.headers {
        head.push_str(&format!("{}: {}\r\n", name, value));
    }
    if response.chunked {
        head.push_str("Transfer-Encoding: chunked\r\n");
    } else {
        let length: usize = response.body.iter().map(|p| p.len()).sum();
        head.push_str(&format!("Content-Length: {}\r\n", length));
    }
    head.push_str("Connection: close\r\n\r\n");

    if socket.write_all(head.as_bytes()).await.is_err() {
        return;
    }

    if method != "HEAD" {
        for part in &response.body {
            let bytes = if response.chunked {
                format!("{:x}\r\n{}\r\n", part.len(), part)
            } else {
                part.clone()
            };
            if socket.write_all(bytes.as_bytes()).await.is_err() {
                return;
            }
            let _ = socket.flush().await;
            if response.chunked {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        }
        if response.chunked {
            let _ = socket.write_all(b"0\r\n\r\n").await;
        }
    }

    let _ = socket.shutdown().await;
}

/// An address nothing is listening on.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Proxy configuration pointing at the given origin and rules service.
pub fn proxy_config(origin: SocketAddr, rules: SocketAddr) -> AugmentConfig {
    let mut config = AugmentConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.origin.address = origin.to_string();
    config.rules.base_url = format!("http://{}/x", rules);
    config.rules.tenant_id = TENANT.to_string();
    config.rules.timeout_ms = 1_000;
    config
}

/// A running proxy. Dropping it shuts the server down.
pub struct TestProxy {
    pub addr: SocketAddr,
    _shutdown: Shutdown,
}

impl TestProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

pub async fn start_proxy(config: AugmentConfig) -> TestProxy {
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config).unwrap();
    let receiver = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, receiver).await;
    });

    TestProxy {
        addr,
        _shutdown: shutdown,
    }
}

/// HTTP client that ignores proxy environment variables.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}
