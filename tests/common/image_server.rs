//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves a route table of path -> reply. HEAD answers with Content-Type and
//! Content-Length only; GET sends the body; anything else is 404. A route can
//! also never answer, or cut its body short after the headers.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Clone)]
enum Reply {
    Serve(String, Vec<u8>),
    /// Reads the request and stays silent.
    Hang,
    /// Declares the full length but closes after half the body.
    Truncated(String, Vec<u8>),
}

type Routes = Arc<Mutex<HashMap<String, Reply>>>;

pub struct ImageServer {
    /// e.g. "http://127.0.0.1:12345"
    pub origin: String,
    routes: Routes,
}

impl ImageServer {
    /// Starts the server in a background thread. It runs until the process exits.
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().unwrap().port();
        let routes: Routes = Arc::default();
        let shared = Arc::clone(&routes);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let routes = Arc::clone(&shared);
                thread::spawn(move || handle(stream, &routes));
            }
        });
        Self {
            origin: format!("http://127.0.0.1:{}", port),
            routes,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.origin, path)
    }

    pub fn route(&self, path: &str, content_type: &str, body: impl Into<Vec<u8>>) {
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_owned(), Reply::Serve(content_type.to_owned(), body.into()));
    }

    pub fn hang(&self, path: &str) {
        self.routes.lock().unwrap().insert(path.to_owned(), Reply::Hang);
    }

    pub fn truncated_jpeg(&self, path: &str) {
        self.routes.lock().unwrap().insert(
            path.to_owned(),
            Reply::Truncated("image/jpeg".to_owned(), jpeg_body(path)),
        );
    }

    pub fn jpeg(&self, path: &str) {
        self.route(path, "image/jpeg", jpeg_body(path));
    }
}

/// Deterministic fake image bytes, distinct per path.
pub fn jpeg_body(path: &str) -> Vec<u8> {
    let mut body = vec![0xFF, 0xD8, 0xFF, 0xE0];
    body.extend(path.bytes().cycle().take(10_000));
    body
}

fn handle(mut stream: TcpStream, routes: &Routes) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let Ok(request) = std::str::from_utf8(&buf[..n]) else {
        return;
    };
    let mut parts = request.lines().next().unwrap_or("").split_whitespace();
    let method = parts.next().unwrap_or("");
    let path = parts.next().unwrap_or("");

    let route = routes.lock().unwrap().get(path).cloned();
    let (content_type, body, truncate) = match route {
        Some(Reply::Serve(content_type, body)) => (content_type, body, false),
        Some(Reply::Truncated(content_type, body)) => (content_type, body, true),
        Some(Reply::Hang) => {
            thread::sleep(Duration::from_secs(30));
            return;
        }
        None => {
            let _ = stream.write_all(
                b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            );
            return;
        }
    };

    let head = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        content_type,
        body.len()
    );
    let _ = stream.write_all(head.as_bytes());
    if method.eq_ignore_ascii_case("GET") {
        let sent = if truncate { body.len() / 2 } else { body.len() };
        let _ = stream.write_all(&body[..sent]);
        let _ = stream.flush();
    }
}
