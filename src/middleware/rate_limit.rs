//! Fixed-window request limiting per client IP.

use std::{
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;

use crate::error::AppError;

/// Entries are swept once the map grows past this many clients.
const SWEEP_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRule {
    pub name: &'static str,
    pub limit: u32,
    pub window: Duration,
    pub message: &'static str,
}

impl RateLimitRule {
    pub const STANDARD: Self = Self {
        name: "standard",
        limit: 100,
        window: Duration::from_secs(15 * 60),
        message: "Too many requests from this IP, please try again after 15 minutes",
    };

    pub const ADMIN: Self = Self {
        name: "admin",
        limit: 50,
        window: Duration::from_secs(15 * 60),
        message: "Too many admin requests from this IP, please try again after 15 minutes",
    };

    pub const ORDER_CREATION: Self = Self {
        name: "order_creation",
        limit: 20,
        window: Duration::from_secs(60 * 60),
        message: "Order creation limit reached, please try again later",
    };
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_after: Duration,
}

#[derive(Debug)]
pub struct FixedWindowLimiter {
    rule: RateLimitRule,
    windows: DashMap<String, Window>,
}

impl FixedWindowLimiter {
    pub fn new(rule: RateLimitRule) -> Self {
        Self {
            rule,
            windows: DashMap::new(),
        }
    }

    pub fn rule(&self) -> &RateLimitRule {
        &self.rule
    }

    pub fn check(&self, key: &str) -> RateLimitDecision {
        self.check_at(key, Instant::now())
    }

    /// Counts one request for `key` at `now`.
    pub fn check_at(&self, key: &str, now: Instant) -> RateLimitDecision {
        let window = self.rule.window;
        if self.windows.len() >= SWEEP_THRESHOLD {
            self.windows
                .retain(|_, w| now.saturating_duration_since(w.started) < window);
        }

        let mut entry = self.windows.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.saturating_duration_since(entry.started) >= window {
            *entry = Window {
                started: now,
                count: 0,
            };
        }

        let allowed = entry.count < self.rule.limit;
        if allowed {
            entry.count += 1;
        }

        RateLimitDecision {
            allowed,
            limit: self.rule.limit,
            remaining: self.rule.limit.saturating_sub(entry.count),
            reset_after: window.saturating_sub(now.saturating_duration_since(entry.started)),
        }
    }
}

/// The three limiters the router mounts.
#[derive(Debug, Clone)]
pub struct RateLimits {
    pub standard: Arc<FixedWindowLimiter>,
    pub admin: Arc<FixedWindowLimiter>,
    pub orders: Arc<FixedWindowLimiter>,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            standard: Arc::new(FixedWindowLimiter::new(RateLimitRule::STANDARD)),
            admin: Arc::new(FixedWindowLimiter::new(RateLimitRule::ADMIN)),
            orders: Arc::new(FixedWindowLimiter::new(RateLimitRule::ORDER_CREATION)),
        }
    }
}

pub async fn rate_limit(
    State(limiter): State<Arc<FixedWindowLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let client = client_ip(&request);
    let decision = limiter.check(&client);

    if !decision.allowed {
        tracing::warn!(
            limiter = limiter.rule().name,
            client = %client,
            "rate limit exceeded"
        );
        let mut response = AppError::TooManyRequests {
            message: limiter.rule().message.to_string(),
            retry_after_secs: decision.reset_after.as_secs().max(1),
        }
        .into_response();
        apply_headers(response.headers_mut(), &decision);
        return response;
    }

    let mut response = next.run(request).await;
    apply_headers(response.headers_mut(), &decision);
    response
}

fn client_ip(request: &Request) -> String {
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn apply_headers(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    let values = [
        ("ratelimit-limit", decision.limit.to_string()),
        ("ratelimit-remaining", decision.remaining.to_string()),
        ("ratelimit-reset", decision.reset_after.as_secs().to_string()),
    ];
    for (name, value) in values {
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.insert(name, value);
        }
    }
}
