//! Test doubles: an in-memory [`Transport`] and a minimal local HTTP server.

use crate::error::FetchError;
use crate::fetcher::Transport;
use crate::models::FetchedPage;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::time::Instant;
use url::Url;

#[derive(Debug, Clone)]
struct MockResponse {
    status: u16,
    content_type: Option<String>,
    body: String,
}

/// Serves canned responses and records how it was called.
///
/// Unknown URLs answer 404. Every call is counted, and the number of calls
/// outstanding at once is tracked in `max_in_flight`.
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: HashMap<String, MockResponse>,
    redirects: HashMap<String, String>,
    failures: Mutex<HashMap<String, (usize, u16)>>,
    latency: Duration,
    pub calls: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub requested: Mutex<Vec<String>>,
    dispatched_at: Mutex<Vec<Instant>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` as `text/html` with `status`.
    pub fn with_page(self, url: &str, status: u16, body: &str) -> Self {
        self.with_response(url, status, Some("text/html; charset=UTF-8"), body)
    }

    pub fn with_response(
        mut self,
        url: &str,
        status: u16,
        content_type: Option<&str>,
        body: &str,
    ) -> Self {
        self.responses.insert(
            url.to_string(),
            MockResponse {
                status,
                content_type: content_type.map(str::to_string),
                body: body.to_string(),
            },
        );
        self
    }

    /// Answer requests for `from` with the response registered for `to`.
    pub fn with_redirect(mut self, from: &str, to: &str) -> Self {
        self.redirects.insert(from.to_string(), to.to_string());
        self
    }

    /// Answer the first `times` requests for `url` with `status`.
    pub fn failing_first(self, url: &str, times: usize, status: u16) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert(url.to_string(), (times, status));
        self
    }

    /// Hold every request open for `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }

    /// Clock readings taken as each request arrived, in arrival order.
    pub fn dispatch_times(&self) -> Vec<Instant> {
        self.dispatched_at.lock().unwrap().clone()
    }

    fn respond(&self, url: &Url) -> FetchedPage {
        let key = url.to_string();

        {
            let mut failures = self.failures.lock().unwrap();
            if let Some((remaining, status)) = failures.get_mut(&key) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return FetchedPage {
                        url: url.clone(),
                        status: *status,
                        content_type: Some("text/html".to_string()),
                        body: String::new(),
                    };
                }
            }
        }

        let final_url = match self.redirects.get(&key) {
            Some(to) => Url::parse(to).unwrap(),
            None => url.clone(),
        };
        match self.responses.get(final_url.as_str()) {
            Some(r) => FetchedPage {
                url: final_url,
                status: r.status,
                content_type: r.content_type.clone(),
                body: r.body.clone(),
            },
            None => FetchedPage {
                url: final_url,
                status: 404,
                content_type: Some("text/html".to_string()),
                body: String::new(),
            },
        }
    }
}

impl Transport for MockTransport {
    async fn get(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().unwrap().push(url.to_string());
        self.dispatched_at.lock().unwrap().push(Instant::now());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let page = self.respond(url);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        Ok(page)
    }
}

/// Raw HTTP/1.1 response text with `Content-Length` and `Connection: close`.
pub fn http_response(status: &str, headers: &[(&str, &str)], body: &str) -> String {
    let mut head = format!(
        "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n",
        body.len()
    );
    for (name, value) in headers {
        head.push_str(&format!("{name}: {value}\r\n"));
    }
    format!("{head}\r\n{body}")
}

/// Serve on an ephemeral 127.0.0.1 port. `route` maps a request path and the
/// server's own address to a raw response.
pub async fn serve<F>(route: F) -> SocketAddr
where
    F: Fn(&str, SocketAddr) -> String + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let route = Arc::new(route);

    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            let route = Arc::clone(&route);
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let request = String::from_utf8_lossy(&request);
                let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();
                let response = route(&path, addr);
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });

    addr
}
