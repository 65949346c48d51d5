use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use tokio::sync::Mutex;

use crate::config::{LimitRule, RateLimits};
use crate::error::ApiError;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    hits: u32,
}

/// Fixed-window request counter keyed by client address.
#[derive(Debug)]
pub struct RateLimiter {
    rule: LimitRule,
    message: &'static str,
    trust_proxy: bool,
    windows: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(rule: LimitRule, message: &'static str) -> Self {
        Self { rule, message, trust_proxy: false, windows: Mutex::new(HashMap::new()) }
    }

    pub fn trusting_proxy(mut self, trust: bool) -> Self {
        self.trust_proxy = trust;
        self
    }

    pub fn rule(&self) -> LimitRule {
        self.rule
    }

    /// Counts a hit for `key`. Returns the requests left in the window, or
    /// `None` once the ceiling is passed.
    pub async fn hit(&self, key: &str, now: Instant) -> Option<u32> {
        let mut windows = self.windows.lock().await;
        let window = windows
            .entry(key.to_string())
            .or_insert(Window { started: now, hits: 0 });

        if now.duration_since(window.started) >= self.rule.window {
            *window = Window { started: now, hits: 0 };
        }
        window.hits += 1;

        (window.hits <= self.rule.max).then(|| self.rule.max - window.hits)
    }

    /// Forgets windows that have run out.
    pub async fn sweep(&self, now: Instant) -> usize {
        let mut windows = self.windows.lock().await;
        let before = windows.len();
        windows.retain(|_, w| now.duration_since(w.started) < self.rule.window);
        before - windows.len()
    }
}

#[derive(Debug, Clone)]
pub struct Limiters {
    pub api: Arc<RateLimiter>,
    pub auth: Arc<RateLimiter>,
    pub search: Arc<RateLimiter>,
    pub booking: Arc<RateLimiter>,
    pub chat: Arc<RateLimiter>,
}

impl Limiters {
    pub fn new(limits: &RateLimits) -> Self {
        let limiter = |rule, message| Arc::new(RateLimiter::new(rule, message).trusting_proxy(limits.trust_proxy));
        Self {
            api: limiter(limits.api, "Too many requests from this IP, please try again later."),
            auth: limiter(limits.auth, "Too many authentication attempts, please try again later."),
            search: limiter(limits.search, "Too many search requests, please try again later."),
            booking: limiter(limits.booking, "Too many booking attempts, please try again later."),
            chat: limiter(limits.chat, "Too many messages, please slow down."),
        }
    }

    pub async fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;
        for limiter in [&self.api, &self.auth, &self.search, &self.booking, &self.chat] {
            removed += limiter.sweep(now).await;
        }
        removed
    }
}

/// Middleware: rejects with 429 once the caller's window is full.
pub async fn enforce(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let key = client_key(&request, limiter.trust_proxy);
    let Some(remaining) = limiter.hit(&key, Instant::now()).await else {
        tracing::warn!(client = %key, "rate limit exceeded");
        return Err(ApiError::TooManyRequests(limiter.message));
    };

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert("ratelimit-limit", HeaderValue::from(limiter.rule.max));
    headers.insert("ratelimit-remaining", HeaderValue::from(remaining));
    Ok(response)
}

// The socket address, unless a trusted proxy supplies `x-forwarded-for`.
fn client_key(request: &Request, trust_proxy: bool) -> String {
    let forwarded = trust_proxy
        .then(|| request.headers().get("x-forwarded-for"))
        .flatten()
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    forwarded
        .or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_window_fills_then_resets() {
        let limiter = RateLimiter::new(LimitRule::new(2, 60), "slow down");
        let start = Instant::now();

        assert_eq!(limiter.hit("a", start).await, Some(1));
        assert_eq!(limiter.hit("a", start).await, Some(0));
        assert_eq!(limiter.hit("a", start).await, None);
        // other clients have their own window
        assert_eq!(limiter.hit("b", start).await, Some(1));

        let later = start + Duration::from_secs(61);
        assert_eq!(limiter.hit("a", later).await, Some(1));
    }

    fn request_from(addr: &str, forwarded: &str) -> Request {
        let mut request = axum::http::Request::builder()
            .header("x-forwarded-for", forwarded)
            .body(axum::body::Body::empty())
            .unwrap();
        request.extensions_mut().insert(ConnectInfo(addr.parse::<SocketAddr>().unwrap()));
        request
    }

    #[test]
    fn test_forwarded_header_ignored_unless_trusted() {
        let request = request_from("10.0.0.7:5000", "203.0.113.9, 10.0.0.1");
        assert_eq!(client_key(&request, false), "10.0.0.7");
        assert_eq!(client_key(&request, true), "203.0.113.9");

        let bare = axum::http::Request::builder().body(axum::body::Body::empty()).unwrap();
        assert_eq!(client_key(&bare, true), "unknown");
    }

    #[tokio::test]
    async fn test_sweep_drops_expired_windows() {
        let limiter = RateLimiter::new(LimitRule::new(5, 10), "slow down");
        let start = Instant::now();
        limiter.hit("a", start).await;
        limiter.hit("b", start + Duration::from_secs(8)).await;

        assert_eq!(limiter.sweep(start + Duration::from_secs(12)).await, 1);
    }
}
