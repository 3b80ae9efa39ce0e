// Fake upstream shared by the integration tests: canned responses per path, with hit counting.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::net::TcpListener;

use hakushin_harvester::{Category, HarvestConfig, RetryPolicy};

#[derive(Clone)]
pub enum Canned {
    Json(Value),
    Raw(StatusCode, Vec<u8>),
    /// 200 whose body stream fails after the given bytes.
    Broken(Vec<u8>),
    /// JSON answered after a delay, for concurrency measurements.
    Slow(Value, Duration),
}

#[derive(Default)]
pub struct Upstream {
    routes: Mutex<HashMap<String, Canned>>,
    hits: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl Upstream {
    pub fn route(&self, path: &str, canned: Canned) {
        self.routes.lock().insert(path.to_string(), canned);
    }

    pub fn json(&self, path: &str, value: Value) {
        self.route(path, Canned::Json(value));
    }

    pub fn hits(&self, path: &str) -> usize {
        self.hits.lock().get(path).copied().unwrap_or(0)
    }

    pub fn total_hits(&self) -> usize {
        self.hits.lock().values().sum()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

async fn serve(State(upstream): State<Arc<Upstream>>, uri: Uri) -> Response {
    let path = uri.path().to_string();
    *upstream.hits.lock().entry(path.clone()).or_insert(0) += 1;
    let canned = upstream.routes.lock().get(&path).cloned();

    match canned {
        None => StatusCode::NOT_FOUND.into_response(),
        Some(Canned::Json(value)) => json_response(&value),
        Some(Canned::Raw(status, body)) => (status, body).into_response(),
        Some(Canned::Broken(partial)) => {
            let chunks: Vec<Result<Bytes, io::Error>> = vec![
                Ok(Bytes::from(partial)),
                Err(io::Error::other("upstream reset")),
            ];
            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "image/webp")
                .body(Body::from_stream(futures::stream::iter(chunks)))
                .unwrap()
        }
        Some(Canned::Slow(value, delay)) => {
            let now = upstream.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            upstream.peak_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            upstream.in_flight.fetch_sub(1, Ordering::SeqCst);
            json_response(&value)
        }
    }
}

fn json_response(value: &Value) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        value.to_string(),
    )
        .into_response()
}

/// Start the fake upstream on a random port. Returns its base URL (no trailing slash).
pub async fn start_upstream() -> (String, Arc<Upstream>) {
    let upstream = Arc::new(Upstream::default());
    let app = Router::new()
        .fallback(serve)
        .with_state(Arc::clone(&upstream));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    (format!("http://{}", addr), upstream)
}

/// Config pointing at the fake upstream, with short retry delays.
pub fn test_config(base: &str, out: &std::path::Path) -> HarvestConfig {
    HarvestConfig {
        output_dir: out.to_path_buf(),
        languages: vec!["en".to_string(), "ja".to_string()],
        categories: vec![Category::new("character", "character.json", "character")],
        api_base: format!("{}/data/", base),
        asset_base: format!("{}/", base),
        request_timeout_secs: 5,
        retry: RetryPolicy {
            max_attempts: 3,
            json_delay_ms: 10,
            download_delay_ms: 10,
        },
        ..HarvestConfig::default()
    }
}
