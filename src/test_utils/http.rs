//! A minimal HTTP/1.1 server for tests.
//!
//! Serves a fixed response per path, closes the connection after each
//! response, and records the request targets it saw (path plus query).

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// What the server sends back for a path.
#[derive(Debug, Clone)]
pub enum CannedResponse {
    /// `200 OK` with a `Content-Length` header.
    Body {
        content_type: &'static str,
        body: Vec<u8>,
    },
    /// `200 OK` without `Content-Length`; the body ends when the connection closes.
    Unsized(Vec<u8>),
    /// Advertises `advertised` bytes, sends `body`, then closes.
    Truncated { advertised: usize, body: Vec<u8> },
    /// Bare status line with an empty body.
    Status(u16),
}

impl CannedResponse {
    /// `200 OK` JSON body.
    pub fn json(body: impl Into<String>) -> Self {
        Self::Body {
            content_type: "application/json",
            body: body.into().into_bytes(),
        }
    }

    /// `200 OK` binary body.
    pub fn bytes(body: impl Into<Vec<u8>>) -> Self {
        Self::Body {
            content_type: "application/octet-stream",
            body: body.into(),
        }
    }

    /// A version manifest pointing at `download_url`.
    pub fn manifest(latest_version: &str, download_url: &str) -> Self {
        Self::json(
            serde_json::json!({
                "latest_version": latest_version,
                "download_url": download_url,
            })
            .to_string(),
        )
    }
}

/// Local HTTP server bound to `127.0.0.1` on a random port.
///
/// Shut down when dropped.
pub struct TestServer {
    addr: SocketAddr,
    routes: Arc<Mutex<HashMap<String, CannedResponse>>>,
    requests: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Bind and start serving. Unknown paths get `404`.
    pub async fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let routes = Arc::new(Mutex::new(HashMap::new()));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let handle = {
            let routes = Arc::clone(&routes);
            let requests = Arc::clone(&requests);
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    let routes = Arc::clone(&routes);
                    let requests = Arc::clone(&requests);
                    tokio::spawn(async move {
                        let _ = serve(stream, routes, requests).await;
                    });
                }
            })
        };

        Ok(Self {
            addr,
            routes,
            requests,
            handle,
        })
    }

    /// Register (or replace) the response for `path`.
    pub fn route(&self, path: &str, response: CannedResponse) -> &Self {
        if let Ok(mut routes) = self.routes.lock() {
            routes.insert(path.to_string(), response);
        }
        self
    }

    /// Absolute URL of `path` on this server.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Request targets received so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve(
    mut stream: TcpStream,
    routes: Arc<Mutex<HashMap<String, CannedResponse>>>,
    requests: Arc<Mutex<Vec<String>>>,
) -> std::io::Result<()> {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") && head.len() < 64 * 1024 {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        head.extend_from_slice(&buf[..n]);
    }

    let head = String::from_utf8_lossy(&head);
    let target = head.split_whitespace().nth(1).unwrap_or("/").to_string();
    let path = target.split('?').next().unwrap_or("/").to_string();
    if let Ok(mut requests) = requests.lock() {
        requests.push(target);
    }

    let response = routes.lock().ok().and_then(|r| r.get(&path).cloned());
    match response {
        Some(CannedResponse::Body {
            content_type,
            body,
        }) => {
            let header = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            stream.write_all(header.as_bytes()).await?;
            stream.write_all(&body).await?;
        }
        Some(CannedResponse::Unsized(body)) => {
            stream
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\nConnection: close\r\n\r\n")
                .await?;
            stream.write_all(&body).await?;
        }
        Some(CannedResponse::Truncated {
            advertised,
            body,
        }) => {
            let header = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\nContent-Length: {advertised}\r\nConnection: close\r\n\r\n"
            );
            stream.write_all(header.as_bytes()).await?;
            stream.write_all(&body).await?;
        }
        Some(CannedResponse::Status(code)) => {
            let header = format!(
                "HTTP/1.1 {code} Status\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
            );
            stream.write_all(header.as_bytes()).await?;
        }
        None => {
            stream
                .write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
                .await?;
        }
    }

    stream.flush().await?;
    stream.shutdown().await
}
