//! Shared test fixtures: a scripted HTTP backend and scripted host doubles.

#![allow(dead_code)]

use refactor_relay::delivery::{DeliveryClient, Endpoints};
use refactor_relay::host::{Document, Notifier, Prompter, Workspace};
use refactor_relay::timeline::{TimelineRender, TimelineView};
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

// ---------------------------------------------------------------------------
// Stub backend
// ---------------------------------------------------------------------------

/// One request as the stub saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: String,
    pub body: Value,
}

impl Recorded {
    /// Percent-decoded value of a query parameter.
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.query.split('&').find_map(|pair| {
            let (k, v) = pair.split_once('=')?;
            (k == name).then(|| percent_decode(v))
        })
    }
}

#[derive(Default)]
struct Route {
    once: VecDeque<(u16, Value)>,
    standing: Option<(u16, Value)>,
}

type Routes = Arc<Mutex<HashMap<String, Route>>>;

/// Minimal HTTP/1.1 backend on a random local port. Answers each request on
/// a fresh connection and closes it. Unrouted paths get `200 {"status":"ok"}`.
pub struct StubBackend {
    pub port: u16,
    requests: Arc<Mutex<Vec<Recorded>>>,
    routes: Routes,
    task: tokio::task::JoinHandle<()>,
}

impl StubBackend {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let routes: Routes = Arc::new(Mutex::new(HashMap::new()));

        let task = {
            let requests = Arc::clone(&requests);
            let routes = Arc::clone(&routes);
            tokio::spawn(async move {
                loop {
                    let Ok((stream, _)) = listener.accept().await else {
                        return;
                    };
                    let requests = Arc::clone(&requests);
                    let routes = Arc::clone(&routes);
                    tokio::spawn(async move {
                        let _ = serve(stream, requests, routes).await;
                    });
                }
            })
        };

        Self {
            port,
            requests,
            routes,
            task,
        }
    }

    /// Answer `path` with `status` and `body` until replaced. Responses
    /// queued with `route_once` are used first.
    pub fn route(&self, path: &str, status: u16, body: Value) {
        let mut routes = self.routes.lock().unwrap();
        routes.entry(path.to_string()).or_default().standing = Some((status, body));
    }

    /// Answer the next request to `path` with this response, then fall back
    /// to whatever was routed before.
    pub fn route_once(&self, path: &str, status: u16, body: Value) {
        let mut routes = self.routes.lock().unwrap();
        routes
            .entry(path.to_string())
            .or_default()
            .once
            .push_back((status, body));
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }
}

impl Drop for StubBackend {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(
    mut stream: TcpStream,
    requests: Arc<Mutex<Vec<Recorded>>>,
    routes: Routes,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0_u8; 4096];
    let header_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let target = request_line.next().unwrap_or_default().to_string();
    let content_length = lines
        .filter_map(|l| l.split_once(':'))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body_bytes = &buf[header_end..(header_end + content_length).min(buf.len())];
    let body = serde_json::from_slice(body_bytes).unwrap_or(Value::Null);

    let (path, query) = match target.split_once('?') {
        Some((p, q)) => (p.to_string(), q.to_string()),
        None => (target.clone(), String::new()),
    };

    let (status, reply) = {
        let mut routes = routes.lock().unwrap();
        let route = routes.entry(path.clone()).or_default();
        route
            .once
            .pop_front()
            .or_else(|| route.standing.clone())
            .unwrap_or_else(|| (200, json!({"status": "ok"})))
    };

    requests.lock().unwrap().push(Recorded {
        method,
        path,
        query,
        body,
    });

    let payload = reply.to_string();
    let response = format!(
        "HTTP/1.1 {status} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{payload}",
        reason_phrase(status),
        payload.len()
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Status",
    }
}

fn percent_decode(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).unwrap_or("");
                match u8::from_str_radix(hex, 16) {
                    Ok(b) => {
                        out.push(b);
                        i += 2;
                    }
                    Err(_) => out.push(b'%'),
                }
            }
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// A local port with nothing listening on it.
pub fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// A listener that accepts connections and never answers.
pub async fn silent_listener() -> (u16, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let task = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });
    (port, task)
}

/// Client whose primary and fallback are the given local ports.
pub fn client_for(primary: u16, fallback: u16) -> DeliveryClient {
    DeliveryClient::new(
        Endpoints::pair("127.0.0.1", primary, fallback),
        Duration::from_millis(500),
    )
}

/// Wait until `check` holds, polling briefly. Panics after two seconds.
pub async fn eventually(mut check: impl FnMut() -> bool) {
    for _ in 0..100 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition not met in time");
}

// ---------------------------------------------------------------------------
// Host doubles
// ---------------------------------------------------------------------------

/// Host with pre-scripted answers. Records every message shown.
#[derive(Default)]
pub struct ScriptedHost {
    pub root: Option<PathBuf>,
    pub document: Option<Document>,
    texts: Mutex<VecDeque<Option<String>>>,
    confirms: Mutex<VecDeque<bool>>,
    picks: Mutex<VecDeque<Option<String>>>,
    pub infos: Mutex<Vec<String>>,
    pub errors: Mutex<Vec<String>>,
}

impl ScriptedHost {
    pub fn in_workspace(root: &str) -> Self {
        Self {
            root: Some(PathBuf::from(root)),
            ..Self::default()
        }
    }

    pub fn with_document(mut self, path: &str, text: &str) -> Self {
        self.document = Some(Document {
            uri: format!("file://{path}"),
            path: path.to_string(),
            text: text.to_string(),
        });
        self
    }

    pub fn answer_text(self, answer: Option<&str>) -> Self {
        self.texts.lock().unwrap().push_back(answer.map(String::from));
        self
    }

    pub fn answer_confirm(self, answer: bool) -> Self {
        self.confirms.lock().unwrap().push_back(answer);
        self
    }

    pub fn answer_pick(self, answer: Option<&str>) -> Self {
        self.picks.lock().unwrap().push_back(answer.map(String::from));
        self
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }

    pub fn infos(&self) -> Vec<String> {
        self.infos.lock().unwrap().clone()
    }
}

impl Prompter for ScriptedHost {
    fn ask_text(&self, _prompt: &str, default: Option<&str>) -> Option<String> {
        match self.texts.lock().unwrap().pop_front() {
            Some(answer) => answer,
            None => default.map(String::from),
        }
    }

    fn confirm(&self, _prompt: &str) -> bool {
        self.confirms.lock().unwrap().pop_front().unwrap_or(false)
    }

    fn pick(&self, _placeholder: &str, options: &[&str]) -> Option<String> {
        let answer = self.picks.lock().unwrap().pop_front().flatten()?;
        options.contains(&answer.as_str()).then_some(answer)
    }
}

impl Notifier for ScriptedHost {
    fn info(&self, message: &str) {
        self.infos.lock().unwrap().push(message.to_string());
    }

    fn error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }
}

impl Workspace for ScriptedHost {
    fn active_document(&self) -> Option<Document> {
        self.document.clone()
    }

    fn root(&self) -> Option<PathBuf> {
        self.root.clone()
    }
}

/// View that keeps every render it was shown.
#[derive(Clone, Default)]
pub struct RecordingView {
    renders: Arc<Mutex<Vec<TimelineRender>>>,
}

impl RecordingView {
    pub fn renders(&self) -> Vec<TimelineRender> {
        self.renders.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<TimelineRender> {
        self.renders.lock().unwrap().last().cloned()
    }
}

impl TimelineView for RecordingView {
    fn show(&mut self, render: &TimelineRender) {
        self.renders.lock().unwrap().push(render.clone());
    }
}
