use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;
use tracing::{debug, warn};

use configs::RateLimitConfig;

use crate::auth::ClientIp;
use crate::errors::JsonApiError;
use crate::observability::RATE_LIMITED_TOTAL;
use crate::startup::ServerState;

#[derive(Debug)]
pub struct TokenBucket {
    capacity: f64,
    tokens: f64,
    refill_rate: f64, // tokens per second
    last_refill: Instant,
}

impl TokenBucket {
    /// A bucket that allows `capacity` requests per `window`.
    pub fn new(capacity: u32, window: Duration) -> Self {
        let capacity = f64::from(capacity);
        Self {
            capacity,
            tokens: capacity,
            refill_rate: capacity / window.as_secs_f64(),
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill);
        self.tokens = (self.tokens + elapsed.as_secs_f64() * self.refill_rate).min(self.capacity);
        self.last_refill = now;
    }

    fn has_token(&mut self, now: Instant) -> bool {
        self.refill(now);
        self.tokens >= 1.0
    }

    fn take(&mut self) {
        self.tokens -= 1.0;
    }
}

/// Hourly and daily buckets for one client.
#[derive(Debug)]
struct ClientBuckets {
    hourly: TokenBucket,
    daily: TokenBucket,
    last_seen: Instant,
}

/// After a day without requests both buckets are full again, so the entry
/// carries no state worth keeping.
const IDLE_TTL: Duration = Duration::from_secs(86_400);

/// Per-client limiter; both windows must have room for a request to pass.
#[derive(Clone)]
pub struct RateLimiter {
    clients: Arc<DashMap<String, ClientBuckets>>,
    per_hour: u32,
    per_day: u32,
    enabled: bool,
}

impl RateLimiter {
    pub fn new(per_hour: u32, per_day: u32, enabled: bool) -> Self {
        Self { clients: Arc::new(DashMap::new()), per_hour, per_day, enabled }
    }

    pub fn from_config(cfg: &RateLimitConfig) -> Self {
        Self::new(cfg.requests_per_hour, cfg.requests_per_day, cfg.enabled)
    }

    pub fn check(&self, client: &str) -> bool {
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: &str, now: Instant) -> bool {
        if !self.enabled {
            return true;
        }
        let mut entry = self.clients.entry(client.to_string()).or_insert_with(|| ClientBuckets {
            hourly: TokenBucket::new(self.per_hour, Duration::from_secs(3600)),
            daily: TokenBucket::new(self.per_day, Duration::from_secs(86_400)),
            last_seen: now,
        });
        let buckets = entry.value_mut();
        buckets.last_seen = now;
        // 两个窗口都有余量才扣减，避免拒绝的请求消耗日配额
        if buckets.hourly.has_token(now) && buckets.daily.has_token(now) {
            buckets.hourly.take();
            buckets.daily.take();
            debug!(%client, remaining_hour = buckets.hourly.tokens as u64, "request admitted");
            true
        } else {
            warn!(%client, "rate limit exceeded");
            false
        }
    }

    /// Drop clients idle for longer than a day; returns how many were removed.
    pub fn evict_idle(&self, now: Instant) -> usize {
        let before = self.clients.len();
        self.clients.retain(|_, b| now.saturating_duration_since(b.last_seen) < IDLE_TTL);
        before.saturating_sub(self.clients.len())
    }

    pub fn tracked_clients(&self) -> usize {
        self.clients.len()
    }

    /// Periodically evict idle clients until the runtime shuts down.
    pub fn spawn_sweeper(&self, every: Duration) -> tokio::task::JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let evicted = limiter.evict_idle(Instant::now());
                if evicted > 0 {
                    debug!(evicted, remaining = limiter.tracked_clients(), "rate limiter sweep");
                }
            }
        })
    }
}

/// Middleware rejecting clients over either window with 429.
pub async fn limit_by_ip(State(state): State<ServerState>, ClientIp(ip): ClientIp, req: Request, next: Next) -> Response {
    if state.limiter.check(&ip) {
        return next.run(req).await;
    }
    RATE_LIMITED_TOTAL.inc();
    let mut err = JsonApiError::too_many_requests();
    err.body = Some(serde_json::json!({"message": err.message}));
    err.into_response()
}
