// Rate limiting middleware for API protection
// Uses token bucket algorithm with configurable limits per client IP

use std::future::{Ready, ready};
use std::sync::Arc;
use std::time::{Duration, Instant};

use actix_web::{
    Error, HttpResponse,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http::{
        StatusCode,
        header::{HeaderName, HeaderValue},
    },
};
use dashmap::DashMap;
use futures::future::LocalBoxFuture;
use tracing::{debug, warn};

use crate::model::response::ErrorBody;

/// Rate limiter configuration
#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    /// Maximum requests per window
    pub max_requests: u32,
    /// Time window duration
    pub window_duration: Duration,
    /// Whether rate limiting is enabled
    pub enabled: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 120,
            window_duration: Duration::from_secs(60),
            enabled: true,
        }
    }
}

/// Token bucket for rate limiting
struct TokenBucket {
    tokens: u32,
    last_refill: Instant,
    max_tokens: u32,
    refill_interval: Duration,
}

impl TokenBucket {
    fn new(max_tokens: u32, refill_interval: Duration) -> Self {
        Self {
            tokens: max_tokens,
            last_refill: Instant::now(),
            max_tokens,
            refill_interval,
        }
    }

    fn try_consume(&mut self) -> bool {
        self.refill();
        if self.tokens > 0 {
            self.tokens -= 1;
            true
        } else {
            false
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        if now.duration_since(self.last_refill) >= self.refill_interval {
            self.tokens = self.max_tokens;
            self.last_refill = now;
        }
    }

    /// Seconds until the bucket refills
    fn retry_after(&self) -> u64 {
        let elapsed = Instant::now().duration_since(self.last_refill);
        self.refill_interval
            .saturating_sub(elapsed)
            .as_secs()
            .max(1)
    }
}

/// Outcome of a rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Decision {
    allowed: bool,
    remaining: u32,
    retry_after: u64,
}

/// Rate limiter state shared across all workers
pub struct RateLimiterState {
    buckets: DashMap<String, TokenBucket>,
    config: RateLimitConfig,
}

impl RateLimiterState {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            buckets: DashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    fn check_rate_limit(&self, key: &str) -> Decision {
        if !self.config.enabled {
            return Decision {
                allowed: true,
                remaining: self.config.max_requests,
                retry_after: 0,
            };
        }

        let mut bucket = self.buckets.entry(key.to_string()).or_insert_with(|| {
            TokenBucket::new(self.config.max_requests, self.config.window_duration)
        });

        let allowed = bucket.try_consume();
        Decision {
            allowed,
            remaining: bucket.tokens,
            retry_after: if allowed { 0 } else { bucket.retry_after() },
        }
    }

    /// Drop buckets that have not been touched for two windows
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.buckets.retain(|_, bucket| {
            now.duration_since(bucket.last_refill) < self.config.window_duration * 2
        });
    }

    pub fn tracked_clients(&self) -> usize {
        self.buckets.len()
    }
}

/// Rate limiting middleware factory
pub struct RateLimiter {
    state: Arc<RateLimiterState>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self::from_state(Arc::new(RateLimiterState::new(config)))
    }

    /// Share one set of buckets between the factories built for each worker
    pub fn from_state(state: Arc<RateLimiterState>) -> Self {
        Self { state }
    }

    pub fn with_defaults() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimiter
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RateLimiterMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimiterMiddleware {
            service,
            state: self.state.clone(),
        }))
    }
}

pub struct RateLimiterMiddleware<S> {
    service: S,
    state: Arc<RateLimiterState>,
}

fn header_value(value: impl ToString) -> HeaderValue {
    HeaderValue::from_str(&value.to_string()).unwrap_or_else(|_| HeaderValue::from_static("0"))
}

impl<S, B> Service<ServiceRequest> for RateLimiterMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // Get client IP for rate limiting key
        let client_ip = req
            .connection_info()
            .realip_remote_addr()
            .unwrap_or("unknown")
            .to_string();

        let decision = self.state.check_rate_limit(&client_ip);
        let max_requests = self.state.config.max_requests;

        if !decision.allowed {
            warn!(client = %client_ip, path = %req.path(), "Rate limit exceeded");

            let response = HttpResponse::build(StatusCode::TOO_MANY_REQUESTS)
                .insert_header(("X-RateLimit-Limit", max_requests.to_string()))
                .insert_header(("X-RateLimit-Remaining", "0"))
                .insert_header(("Retry-After", decision.retry_after.to_string()))
                .json(ErrorBody::new(
                    "too many requests",
                    Some(format!("retry in {} seconds", decision.retry_after)),
                ));

            return Box::pin(async move { Ok(req.into_response(response).map_into_right_body()) });
        }

        let fut = self.service.call(req);

        Box::pin(async move {
            let mut res = fut.await?;

            res.headers_mut().insert(
                HeaderName::from_static("x-ratelimit-limit"),
                header_value(max_requests),
            );
            res.headers_mut().insert(
                HeaderName::from_static("x-ratelimit-remaining"),
                header_value(decision.remaining),
            );

            Ok(res.map_into_left_body())
        })
    }
}

/// Cleanup interval for rate limiter entries (5 minutes)
const CLEANUP_INTERVAL_SECS: u64 = 300;

/// Start a background task that periodically drops stale buckets.
/// Abort the returned handle on shutdown.
pub fn start_cleanup_task(state: Arc<RateLimiterState>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(CLEANUP_INTERVAL_SECS));
        loop {
            interval.tick().await;
            state.cleanup();
            debug!(clients = state.tracked_clients(), "Rate limiter cleanup completed");
        }
    })
}
