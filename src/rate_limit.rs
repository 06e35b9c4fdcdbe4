use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tower::{Layer, Service};
use tracing::warn;

const WINDOW: Duration = Duration::from_secs(1);
const LOG_EVERY: u64 = 100;

// Sweep stale windows once the map grows past this many clients.
const SWEEP_THRESHOLD: usize = 4096;

/// Per-client fixed-window limiter in front of the lookup endpoints.
#[derive(Clone)]
pub struct RateLimitLayer {
    max_per_window: u32,
}

impl RateLimitLayer {
    pub fn new(max_per_window: u32) -> Self {
        Self { max_per_window }
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimit<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimit {
            inner,
            windows: Arc::new(DashMap::new()),
            dropped: Arc::new(AtomicU64::new(0)),
            max_per_window: self.max_per_window,
        }
    }
}

#[derive(Clone)]
pub struct RateLimit<S> {
    inner: S,
    windows: Arc<DashMap<String, Window>>,
    dropped: Arc<AtomicU64>,
    max_per_window: u32,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    opened: Instant,
    hits: u32,
}

impl<S, ReqBody> Service<axum::http::Request<ReqBody>> for RateLimit<S>
where
    S: Service<axum::http::Request<ReqBody>, Response = axum::http::Response<axum::body::Body>>
        + Send
        + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: axum::http::Request<ReqBody>) -> Self::Future {
        if let Some(client) = client_id(&req) {
            if !self.admit(&client) {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                if dropped % LOG_EVERY == 0 {
                    warn!("rate limiter has dropped {dropped} requests");
                }
                return Box::pin(async move {
                    Ok(axum::http::Response::builder()
                        .status(axum::http::StatusCode::TOO_MANY_REQUESTS)
                        .body(axum::body::Body::from("rate limited"))
                        .unwrap())
                });
            }
        }

        let fut = self.inner.call(req);
        Box::pin(fut)
    }
}

impl<S> RateLimit<S> {
    fn admit(&self, client: &str) -> bool {
        let now = Instant::now();
        let mut window = self.windows.entry(client.to_string()).or_insert(Window {
            opened: now,
            hits: 0,
        });
        if now.saturating_duration_since(window.opened) >= WINDOW {
            window.opened = now;
            window.hits = 0;
        }
        window.hits += 1;
        let admitted = window.hits <= self.max_per_window;
        drop(window);

        if self.windows.len() > SWEEP_THRESHOLD {
            self.windows
                .retain(|_, w| now.saturating_duration_since(w.opened) < WINDOW);
        }
        admitted
    }
}

/// First address in `x-forwarded-for`, as set by the reverse proxy in front
/// of the service. Requests without it (direct local traffic) are not
/// limited.
fn client_id<B>(req: &axum::http::Request<B>) -> Option<String> {
    req.headers()
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|list| list.split(',').next())
        .map(|addr| addr.trim().to_string())
        .filter(|addr| !addr.is_empty())
}
