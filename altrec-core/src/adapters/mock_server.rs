//! Mock HTTP server for testing
//!
//! A small HTTP/1.1 server on a random local port that records every request
//! and answers through a handler closure. [`MockBackend`] provides a handler
//! that simulates the recommendation backend:
//! - POST /auth/jwt returns { token } for the posted email
//! - /queries and /recommendations CRUD over fixed seed data

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use serde_json::{json, Value as JsonValue};

/// A request as seen by the mock server
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    /// Path including the query string
    pub path: String,
    pub authorization: Option<String>,
    pub body: String,
}

impl RecordedRequest {
    pub fn path_only(&self) -> &str {
        self.path.split('?').next().unwrap_or(&self.path)
    }

    pub fn query_param(&self, name: &str) -> Option<String> {
        let query = self.path.split_once('?')?.1;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }

    pub fn json(&self) -> JsonValue {
        serde_json::from_str(&self.body).unwrap_or(JsonValue::Null)
    }

    /// A field of a form-urlencoded body
    pub fn form_param(&self, name: &str) -> Option<String> {
        url::form_urlencoded::parse(self.body.as_bytes())
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }
}

/// Response produced by a handler
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub body: String,
}

impl MockResponse {
    pub fn json(status: u16, body: JsonValue) -> Self {
        Self {
            status,
            body: body.to_string(),
        }
    }

    pub fn ok(body: JsonValue) -> Self {
        Self::json(200, body)
    }
}

type Handler = Arc<dyn Fn(&RecordedRequest) -> MockResponse + Send + Sync>;

/// Mock server running on a background thread
pub struct MockServer {
    port: u16,
    running: Arc<AtomicBool>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl MockServer {
    /// Start a server on a random available port
    pub fn start<F>(handler: F) -> std::io::Result<Self>
    where
        F: Fn(&RecordedRequest) -> MockResponse + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let running = Arc::new(AtomicBool::new(true));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let handler: Handler = Arc::new(handler);

        // Non-blocking so the loop can notice shutdown
        listener.set_nonblocking(true)?;

        let running_clone = running.clone();
        let requests_clone = requests.clone();
        let thread_handle = thread::spawn(move || {
            while running_clone.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        let handler = handler.clone();
                        let requests = requests_clone.clone();
                        thread::spawn(move || handle_connection(stream, &handler, &requests));
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(Duration::from_millis(5));
                    }
                    Err(_) => break,
                }
            }
        });

        Ok(Self {
            port,
            running,
            requests,
            thread_handle: Some(thread_handle),
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// All requests received so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests matching a method and exact path (query string ignored)
    pub fn requests_to(&self, method: &str, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path_only() == path)
            .collect()
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn handle_connection(
    mut stream: TcpStream,
    handler: &Handler,
    requests: &Mutex<Vec<RecordedRequest>>,
) {
    // Accepted sockets inherit non-blocking mode on some platforms
    let _ = stream.set_nonblocking(false);
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));

    let Some(request) = read_request(&mut stream) else {
        send_response(&mut stream, &MockResponse::json(400, json!({ "message": "bad request" })));
        return;
    };

    requests.lock().unwrap().push(request.clone());
    let response = handler(&request);
    send_response(&mut stream, &response);
}

fn read_request(stream: &mut TcpStream) -> Option<RecordedRequest> {
    let mut data = Vec::new();
    let mut buffer = [0u8; 4096];

    // Read until the end of headers
    let header_end = loop {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buffer[..n]);
        if let Some(pos) = find_subsequence(&data, b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&data[..header_end]).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();

    let mut content_length = 0usize;
    let mut authorization = None;
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim().to_ascii_lowercase();
            let value = value.trim();
            if name == "content-length" {
                content_length = value.parse().unwrap_or(0);
            } else if name == "authorization" {
                authorization = Some(value.to_string());
            }
        }
    }

    while data.len() < header_end + content_length {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buffer[..n]);
    }

    let body_end = data.len().min(header_end + content_length);
    let body = String::from_utf8_lossy(&data[header_end..body_end]).to_string();

    Some(RecordedRequest {
        method,
        path,
        authorization,
        body,
    })
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

fn send_response(stream: &mut TcpStream, response: &MockResponse) {
    let status_text = match response.status {
        200 => "OK",
        201 => "Created",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        _ => "Error",
    };
    let raw = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        response.status,
        status_text,
        response.body.len(),
        response.body
    );
    let _ = stream.write_all(raw.as_bytes());
    let _ = stream.flush();
}

// =============================================================================
// Simulated recommendation backend
// =============================================================================

/// Behavior switches and seed data for the simulated backend
#[derive(Debug, Clone)]
pub struct MockBackend {
    pub queries: Vec<JsonValue>,
    pub recommendations: Vec<JsonValue>,
    /// Answer POST /auth/jwt with 500
    pub fail_token_exchange: bool,
    /// Answer every POST/PUT/DELETE with 500
    pub fail_writes: bool,
    /// Answer 401 to private endpoints without a bearer token
    pub require_bearer: bool,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self {
            queries: sample_queries(),
            recommendations: sample_recommendations(),
            fail_token_exchange: false,
            fail_writes: false,
            require_bearer: true,
        }
    }
}

impl MockBackend {
    /// Start a mock server answering with this backend
    pub fn start(self) -> MockServer {
        MockServer::start(move |request| self.handle(request)).expect("mock server starts")
    }

    fn handle(&self, request: &RecordedRequest) -> MockResponse {
        let method = request.method.as_str();
        let path = request.path_only();
        let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();

        if method == "POST" && path == "/auth/jwt" {
            if self.fail_token_exchange {
                return MockResponse::json(500, json!({ "message": "token service unavailable" }));
            }
            let email = request.json().get("email").and_then(|e| e.as_str()).map(str::to_string);
            return match email {
                Some(email) => MockResponse::ok(json!({ "token": format!("jwt-for-{}", email) })),
                None => MockResponse::json(400, json!({ "message": "email is required" })),
            };
        }

        let is_public_read = method == "GET"
            && (segments[0] == "queries" || path.starts_with("/recommendations/by-query/"));
        let has_bearer = request
            .authorization
            .as_deref()
            .is_some_and(|a| a.starts_with("Bearer ") && a.len() > "Bearer ".len());
        if self.require_bearer && !is_public_read && !has_bearer {
            return MockResponse::json(401, json!({ "message": "unauthorized access" }));
        }

        if self.fail_writes && method != "GET" {
            return MockResponse::json(500, json!({ "message": "write failed" }));
        }

        match (method, segments.as_slice()) {
            ("GET", ["queries"]) => {
                let search = request.query_param("search").map(|s| s.to_lowercase());
                let list: Vec<JsonValue> = self
                    .queries
                    .iter()
                    .filter(|q| match &search {
                        Some(term) => q["productName"]
                            .as_str()
                            .is_some_and(|name| name.to_lowercase().contains(term)),
                        None => true,
                    })
                    .cloned()
                    .collect();
                MockResponse::ok(JsonValue::Array(list))
            }
            ("GET", ["queries", id]) => match self.queries.iter().find(|q| q["_id"] == *id) {
                Some(query) => MockResponse::ok(query.clone()),
                None => MockResponse::json(404, json!({ "message": "query not found" })),
            },
            ("POST", ["queries"]) => {
                MockResponse::ok(json!({ "acknowledged": true, "insertedId": "q-new" }))
            }
            ("PUT", ["queries", _]) => {
                MockResponse::ok(json!({ "acknowledged": true, "modifiedCount": 1 }))
            }
            ("DELETE", ["queries", _]) | ("DELETE", ["recommendations", _]) => {
                MockResponse::ok(json!({ "acknowledged": true, "deletedCount": 1 }))
            }
            ("GET", ["recommendations", "by-query", id]) => MockResponse::ok(JsonValue::Array(
                self.recommendations
                    .iter()
                    .filter(|r| r["queryId"] == *id)
                    .cloned()
                    .collect(),
            )),
            ("GET", ["recommendations", "my"]) | ("GET", ["recommendations", "for-me"]) => {
                MockResponse::ok(JsonValue::Array(self.recommendations.clone()))
            }
            ("POST", ["recommendations"]) => {
                let mut record = request.json();
                record["_id"] = json!("r-new");
                record["createdAt"] = json!("2024-05-02T09:30:00.000Z");
                MockResponse::ok(record)
            }
            _ => MockResponse::json(404, json!({ "message": "endpoint not found" })),
        }
    }
}

pub fn sample_queries() -> Vec<JsonValue> {
    vec![
        json!({
            "_id": "q1",
            "queryTitle": "Is there a palm-oil-free soap?",
            "productName": "Soap",
            "productBrand": "Acme",
            "boycottReason": "Palm oil sourcing",
            "userEmail": "owner@example.com",
            "userName": "Owen",
            "recommendationCount": 1
        }),
        json!({
            "_id": "q2",
            "queryTitle": "Alternative to sugary cola?",
            "productName": "Cola",
            "productBrand": "FizzCo",
            "boycottReason": "Too much sugar",
            "userEmail": "a@example.com",
            "userName": "Ann",
            "recommendationCount": 0
        }),
    ]
}

pub fn sample_recommendations() -> Vec<JsonValue> {
    vec![json!({
        "_id": "r1",
        "queryId": "q1",
        "queryTitle": "Is there a palm-oil-free soap?",
        "productName": "Soap",
        "userEmail": "owner@example.com",
        "recommenderName": "Bob",
        "recommendedTitle": "Olive oil soap works",
        "recommendedProductName": "Olive Soap",
        "recommendationReason": "No palm oil at all",
        "createdAt": "2024-05-01T10:00:00.000Z"
    })]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorded_request_query_param() {
        let request = RecordedRequest {
            method: "GET".to_string(),
            path: "/queries?search=olive+soap".to_string(),
            authorization: None,
            body: String::new(),
        };
        assert_eq!(request.path_only(), "/queries");
        assert_eq!(request.query_param("search").as_deref(), Some("olive soap"));
        assert_eq!(request.query_param("missing"), None);
    }

    #[test]
    fn test_backend_requires_bearer_for_private_routes() {
        let backend = MockBackend::default();
        let request = RecordedRequest {
            method: "GET".to_string(),
            path: "/recommendations/my".to_string(),
            authorization: None,
            body: String::new(),
        };
        assert_eq!(backend.handle(&request).status, 401);
    }

    #[test]
    fn test_backend_issues_token_for_email() {
        let backend = MockBackend::default();
        let request = RecordedRequest {
            method: "POST".to_string(),
            path: "/auth/jwt".to_string(),
            authorization: None,
            body: r#"{"email":"a@example.com"}"#.to_string(),
        };
        let response = backend.handle(&request);
        assert_eq!(response.status, 200);
        assert!(response.body.contains("jwt-for-a@example.com"));
    }
}
