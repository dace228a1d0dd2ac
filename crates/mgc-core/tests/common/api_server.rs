//! Minimal HTTP/1.1 server standing in for the repository API.
//!
//! Serves canned responses keyed by the request target (path plus query).
//! When several responses are registered for one target they are served in
//! order and the last one repeats. Every request head is recorded.

use std::collections::{HashMap, VecDeque};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Canned {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Canned {
    pub fn json(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: vec![("Content-Type".into(), "application/json".into())],
            body: body.into(),
        }
    }

    pub fn header(mut self, name: &str, value: impl ToString) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

#[derive(Default)]
struct Routes {
    by_target: HashMap<String, VecDeque<Canned>>,
    requests: Vec<String>,
}

#[derive(Clone)]
pub struct ApiServer {
    routes: Arc<Mutex<Routes>>,
    base_url: String,
}

impl ApiServer {
    /// Starts the server on an ephemeral port. Runs until the process exits.
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().unwrap().port();
        let server = Self {
            routes: Arc::default(),
            base_url: format!("http://127.0.0.1:{}", port),
        };
        let routes = Arc::clone(&server.routes);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let routes = Arc::clone(&routes);
                thread::spawn(move || handle(stream, &routes));
            }
        });
        server
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Register a response for `target` (e.g. `/users/octo`).
    pub fn route(&self, target: &str, response: Canned) -> &Self {
        self.routes
            .lock()
            .unwrap()
            .by_target
            .entry(target.to_string())
            .or_default()
            .push_back(response);
        self
    }

    /// Raw request heads received so far.
    pub fn requests(&self) -> Vec<String> {
        self.routes.lock().unwrap().requests.clone()
    }

    /// Request targets received so far, in order.
    pub fn targets(&self) -> Vec<String> {
        self.requests()
            .iter()
            .filter_map(|r| r.split_whitespace().nth(1).map(str::to_string))
            .collect()
    }
}

fn handle(mut stream: TcpStream, routes: &Mutex<Routes>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));

    let mut head = Vec::new();
    let mut buf = [0u8; 4096];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => return,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }
    let request = String::from_utf8_lossy(&head).into_owned();
    let target = request
        .split_whitespace()
        .nth(1)
        .unwrap_or("/")
        .to_string();

    let canned = {
        let mut routes = routes.lock().unwrap();
        routes.requests.push(request);
        let picked = match routes.by_target.get_mut(&target) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };
        picked
    }
    .unwrap_or_else(|| Canned::json(404, r#"{"message":"Not Found"}"#));

    let mut response = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n",
        canned.status,
        reason(canned.status),
        canned.body.len()
    );
    for (name, value) in &canned.headers {
        response.push_str(&format!("{}: {}\r\n", name, value));
    }
    response.push_str("\r\n");
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.write_all(canned.body.as_bytes());
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        403 => "Forbidden",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}
