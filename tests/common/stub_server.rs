//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves a fixed table of routes. A route is matched on the full request
//! target (path and query) first, then on the path alone. Unknown targets get
//! a 404. Every response closes the connection.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// A canned response
#[derive(Debug, Clone)]
pub struct Route {
    pub status: u16,
    pub body: Vec<u8>,
    /// Advertise this many extra bytes, then hold the connection open
    pub stall: Option<(usize, Duration)>,
}

impl Route {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            stall: None,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: Vec::new(),
            stall: None,
        }
    }

    /// Send `body`, promise `missing` more bytes and go quiet for `hold`
    pub fn stalled(body: impl Into<Vec<u8>>, missing: usize, hold: Duration) -> Self {
        Self {
            stall: Some((missing, hold)),
            ..Self::ok(body)
        }
    }
}

/// Handle to a running stub server
#[derive(Clone)]
pub struct StubServer {
    base_url: String,
    routes: Arc<Mutex<HashMap<String, Route>>>,
    hits: Arc<Mutex<HashMap<String, usize>>>,
    requests: Arc<AtomicUsize>,
}

impl StubServer {
    /// Start a server in a background thread. It runs until the process exits.
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().unwrap().port();

        let server = Self {
            base_url: format!("http://127.0.0.1:{}/", port),
            routes: Arc::new(Mutex::new(HashMap::new())),
            hits: Arc::new(Mutex::new(HashMap::new())),
            requests: Arc::new(AtomicUsize::new(0)),
        };

        let handle = server.clone();
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let handle = handle.clone();
                thread::spawn(move || handle.serve(stream));
            }
        });

        server
    }

    /// Base URL with a trailing slash, e.g. "http://127.0.0.1:12345/"
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL of a path
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Register a response for a request target such as "/finpress-6.7.zip"
    pub fn route(&self, target: &str, route: Route) -> &Self {
        self.routes.lock().unwrap().insert(target.to_string(), route);
        self
    }

    /// Number of requests received for a path
    pub fn hits(&self, path: &str) -> usize {
        self.hits.lock().unwrap().get(path).copied().unwrap_or(0)
    }

    /// Total number of requests received
    pub fn total_requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn serve(&self, mut stream: TcpStream) {
        let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
        let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));

        let Some(target) = read_request_target(&mut stream) else {
            return;
        };
        self.requests.fetch_add(1, Ordering::SeqCst);

        let path = target.split('?').next().unwrap_or(&target).to_string();
        *self.hits.lock().unwrap().entry(path.clone()).or_default() += 1;

        let route = {
            let routes = self.routes.lock().unwrap();
            routes
                .get(&target)
                .or_else(|| routes.get(&path))
                .cloned()
                .unwrap_or_else(|| Route::status(404))
        };

        let missing = route.stall.map_or(0, |(missing, _)| missing);
        let header = format!(
            "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            route.status,
            reason(route.status),
            route.body.len() + missing
        );
        let _ = stream.write_all(header.as_bytes());
        let _ = stream.write_all(&route.body);
        let _ = stream.flush();

        if let Some((_, hold)) = route.stall {
            thread::sleep(hold);
        }
    }
}

/// Read request headers and return the request target
fn read_request_target(stream: &mut TcpStream) -> Option<String> {
    let mut request = Vec::new();
    let mut buf = [0u8; 4096];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            break;
        }
        request.extend_from_slice(&buf[..n]);
    }

    let text = String::from_utf8_lossy(&request);
    let request_line = text.lines().next()?;
    request_line.split_whitespace().nth(1).map(str::to_string)
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}
