use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use common::errors::AppError;
use governor::clock::DefaultClock;
use governor::middleware::StateInformationMiddleware;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter as GovLimiter};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

type KeyedLimiter = GovLimiter<
    IpAddr,
    DefaultKeyedStateStore<IpAddr>,
    DefaultClock,
    StateInformationMiddleware,
>;

/// Requests without a peer address share this bucket
const UNKNOWN_CLIENT: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

/// Per-client request budget: `max_requests` per `window`, refilled evenly
pub struct RateLimiter {
    max_requests: NonZeroU32,
    window: Duration,
    limiter: KeyedLimiter,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        let max_requests = NonZeroU32::new(max_requests).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::with_period(window / max_requests.get())
            .unwrap_or_else(|| Quota::per_second(max_requests))
            .allow_burst(max_requests);

        Self {
            max_requests,
            window,
            limiter: GovLimiter::keyed(quota).with_middleware::<StateInformationMiddleware>(),
        }
    }

    pub fn limit(&self) -> u32 {
        self.max_requests.get()
    }

    /// Counts one request for `client` and returns how many remain in its burst.
    pub fn check(&self, client: &IpAddr) -> Result<u32, AppError> {
        self.limiter
            .check_key(client)
            .map(|snapshot| snapshot.remaining_burst_capacity())
            .map_err(|_| AppError::RateLimited)
    }

    /// Drops clients whose budget has fully refilled.
    pub fn retain_recent(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
    }

    #[cfg(test)]
    fn tracked_clients(&self) -> usize {
        self.limiter.len()
    }
}

/// Prunes idle clients once per window for as long as the server runs
pub fn spawn_pruning(limiter: Arc<RateLimiter>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(limiter.window);
        loop {
            interval.tick().await;
            limiter.retain_recent();
            debug!("Pruned idle rate limit entries");
        }
    })
}

fn client_ip(request: &Request<Body>) -> IpAddr {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(UNKNOWN_CLIENT)
}

/// Middleware rejecting clients that exceed their request budget
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let client = client_ip(&request);

    let remaining = match limiter.check(&client) {
        Ok(remaining) => remaining,
        Err(e) => {
            warn!(client = %client, "Rate limit exceeded");
            return Err(e);
        }
    };

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert("x-ratelimit-limit", HeaderValue::from(limiter.limit()));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(remaining));

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    #[test]
    fn allows_up_to_the_limit() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));

        assert_eq!(limiter.check(&ip(1)).unwrap(), 2);
        assert_eq!(limiter.check(&ip(1)).unwrap(), 1);
        assert_eq!(limiter.check(&ip(1)).unwrap(), 0);
        assert!(matches!(limiter.check(&ip(1)), Err(AppError::RateLimited)));
    }

    #[test]
    fn clients_are_counted_separately() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));

        assert!(limiter.check(&ip(1)).is_ok());
        assert!(limiter.check(&ip(2)).is_ok());
        assert!(limiter.check(&ip(1)).is_err());
    }

    #[test]
    fn zero_limit_still_admits_one_request() {
        let limiter = RateLimiter::new(0, Duration::from_secs(60));

        assert_eq!(limiter.limit(), 1);
        assert!(limiter.check(&ip(1)).is_ok());
        assert!(limiter.check(&ip(1)).is_err());
    }

    #[tokio::test]
    async fn budget_refills_after_the_window() {
        let limiter = RateLimiter::new(1, Duration::from_millis(100));

        assert!(limiter.check(&ip(1)).is_ok());
        assert!(limiter.check(&ip(1)).is_err());

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(limiter.check(&ip(1)).is_ok());
    }

    #[tokio::test]
    async fn idle_clients_are_pruned() {
        let limiter = RateLimiter::new(5, Duration::from_millis(50));
        for last in 0..20 {
            limiter.check(&ip(last)).unwrap();
        }
        assert_eq!(limiter.tracked_clients(), 20);

        tokio::time::sleep(Duration::from_millis(100)).await;
        limiter.retain_recent();

        assert_eq!(limiter.tracked_clients(), 0);
    }
}
