//! In-process creditdb server used by the integration tests

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use creditdb::{BackoffPolicy, Client, ClientConfig};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Page whose listing reports a non-OK payload status
pub const REJECTED_PAGE: u64 = 999;

#[derive(Default)]
pub struct State {
    pages: Mutex<HashMap<u64, BTreeMap<String, String>>>,
    health_failures: AtomicUsize,
    health_hits: AtomicUsize,
    get_delay: Mutex<Option<Duration>>,
    ping_body: Mutex<Option<String>>,
    fail_flush: AtomicBool,
    open_connections: AtomicUsize,
    seen_pages: Mutex<Vec<u64>>,
}

pub struct MockServer {
    pub addr: SocketAddr,
    pub state: Arc<State>,
    accept_loop: JoinHandle<()>,
}

impl MockServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(State::default());

        let accept_state = state.clone();
        let accept_loop = tokio::spawn(async move {
            loop {
                let (stream, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => continue,
                };
                let state = accept_state.clone();
                state.open_connections.fetch_add(1, Ordering::SeqCst);

                tokio::spawn(async move {
                    let service = service_fn({
                        let state = state.clone();
                        move |req| route(state.clone(), req)
                    });
                    let _ = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await;
                    state.open_connections.fetch_sub(1, Ordering::SeqCst);
                });
            }
        });

        Self {
            addr,
            state,
            accept_loop,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Config pointed at this server with a short, jitter-free probe budget
    pub fn config(&self) -> ClientConfig {
        ClientConfig {
            host: self.url(),
            backoff: fast_backoff(),
            ..Default::default()
        }
    }

    pub async fn client(&self) -> Client {
        Client::connect_with(self.config()).await.expect("mock server should be healthy")
    }

    pub fn fail_health(&self, times: usize) {
        self.state.health_failures.store(times, Ordering::SeqCst);
    }

    pub fn health_hits(&self) -> usize {
        self.state.health_hits.load(Ordering::SeqCst)
    }

    pub fn delay_gets(&self, delay: Option<Duration>) {
        *self.state.get_delay.lock().unwrap() = delay;
    }

    pub fn set_ping_body(&self, body: &str) {
        *self.state.ping_body.lock().unwrap() = Some(body.to_string());
    }

    pub fn fail_flush(&self, fail: bool) {
        self.state.fail_flush.store(fail, Ordering::SeqCst);
    }

    pub fn open_connections(&self) -> usize {
        self.state.open_connections.load(Ordering::SeqCst)
    }

    /// Pages named in request bodies, in arrival order
    pub fn seen_pages(&self) -> Vec<u64> {
        self.state.seen_pages.lock().unwrap().clone()
    }

    /// Poll until the server has no open connections or `within` passes
    pub async fn wait_for_idle(&self, within: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + within;
        while tokio::time::Instant::now() < deadline {
            if self.open_connections() == 0 {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        self.open_connections() == 0
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.accept_loop.abort();
    }
}

pub fn fast_backoff() -> BackoffPolicy {
    BackoffPolicy {
        initial_interval: Duration::from_millis(10),
        randomization_factor: 0.0,
        max_elapsed_time: Duration::from_secs(2),
        ..BackoffPolicy::default()
    }
}

/// Address nothing is listening on
pub fn unreachable_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

fn respond(status: StatusCode, body: Value) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

fn field<'a>(body: &'a Value, name: &str) -> Option<&'a str> {
    body.get(name).and_then(Value::as_str).filter(|s| !s.is_empty())
}

async fn route(state: Arc<State>, req: Request<Incoming>) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let raw = req.into_body().collect().await.map(|c| c.to_bytes()).unwrap_or_default();
    let body: Value = serde_json::from_slice(&raw).unwrap_or(Value::Null);

    let page = body.get("page").and_then(Value::as_u64);
    if let Some(page) = page {
        state.seen_pages.lock().unwrap().push(page);
    }
    let page = page.unwrap_or(0);

    let response = match (method, path.as_str()) {
        (Method::GET, "/") => {
            state.health_hits.fetch_add(1, Ordering::SeqCst);
            let failing = state
                .health_failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                respond(StatusCode::SERVICE_UNAVAILABLE, json!({"status": "starting"}))
            } else {
                respond(StatusCode::OK, json!({"status": "OK"}))
            }
        }
        (Method::GET, "/ping") => {
            let custom = state.ping_body.lock().unwrap().clone();
            match custom {
                Some(text) => Response::new(Full::new(Bytes::from(text))),
                None => respond(StatusCode::OK, json!({"ping": "pong"})),
            }
        }
        (Method::POST, "/set") => match (field(&body, "key"), field(&body, "value")) {
            (Some(key), Some(value)) => {
                state
                    .pages
                    .lock()
                    .unwrap()
                    .entry(page)
                    .or_default()
                    .insert(key.to_string(), value.to_string());
                respond(StatusCode::OK, json!({"status": "OK"}))
            }
            _ => respond(StatusCode::BAD_REQUEST, json!({"status": "missing key or value"})),
        },
        (Method::GET, "/get") => {
            let delay = *state.get_delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            let Some(key) = field(&body, "key") else {
                return Ok(respond(StatusCode::BAD_REQUEST, json!({"status": "missing key"})));
            };
            let found = state
                .pages
                .lock()
                .unwrap()
                .get(&page)
                .and_then(|lines| lines.get(key).cloned());
            match found {
                Some(value) => respond(StatusCode::OK, json!({"key": key, "value": value})),
                None => respond(StatusCode::NOT_FOUND, json!({"status": "not found"})),
            }
        }
        (Method::GET, "/getall") => {
            if page == REJECTED_PAGE {
                return Ok(respond(
                    StatusCode::OK,
                    json!({"status": "page out of range", "pagenumber": page, "result": null}),
                ));
            }
            let lines: Vec<Value> = state
                .pages
                .lock()
                .unwrap()
                .get(&page)
                .map(|lines| {
                    lines
                        .iter()
                        .map(|(key, value)| json!({"key": key, "value": value}))
                        .collect()
                })
                .unwrap_or_default();
            respond(StatusCode::OK, json!({"status": "OK", "pagenumber": page, "result": lines}))
        }
        (Method::DELETE, "/delete") => {
            let Some(key) = field(&body, "key") else {
                return Ok(respond(StatusCode::BAD_REQUEST, json!({"status": "missing key"})));
            };
            let removed = state
                .pages
                .lock()
                .unwrap()
                .get_mut(&page)
                .and_then(|lines| lines.remove(key));
            match removed {
                Some(_) => respond(StatusCode::OK, json!({"status": "OK"})),
                None => respond(StatusCode::NOT_FOUND, json!({"status": "not found"})),
            }
        }
        (Method::DELETE, "/flush") => {
            if state.fail_flush.load(Ordering::SeqCst) {
                respond(StatusCode::BAD_REQUEST, json!({"status": "flush refused"}))
            } else {
                state.pages.lock().unwrap().remove(&page);
                respond(StatusCode::OK, json!({"status": "OK"}))
            }
        }
        _ => respond(StatusCode::NOT_FOUND, json!({"status": "no such route"})),
    };

    Ok(response)
}
