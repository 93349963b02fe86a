use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{clock::Clock, DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ApiConfig;
use crate::error::ApiError;

/// Tracked clients before idle entries are dropped
const PRUNE_THRESHOLD: usize = 10_000;

/// Process-wide request budget per client address
#[derive(Clone)]
pub struct ClientRateLimiter {
    limiter: Arc<DefaultKeyedRateLimiter<IpAddr>>,
}

impl ClientRateLimiter {
    /// `requests` per `window_secs`, replenished evenly across the window
    pub fn new(requests: u32, window_secs: u64) -> Option<Self> {
        let burst = NonZeroU32::new(requests)?;
        let period = Duration::from_secs(window_secs.max(1)) / burst.get();
        let quota = Quota::with_period(period)?.allow_burst(burst);
        Some(Self {
            limiter: Arc::new(RateLimiter::keyed(quota)),
        })
    }

    pub fn from_config(api: &ApiConfig) -> Option<Self> {
        if !api.enable_rate_limiting {
            return None;
        }
        let limiter = Self::new(api.rate_limit_requests, api.rate_limit_window_secs);
        if limiter.is_none() {
            tracing::warn!("Rate limiting enabled with an empty budget; disabled");
        }
        limiter
    }

    /// Seconds until `ip` may retry, or `None` when the request is allowed
    pub fn check(&self, ip: IpAddr) -> Option<u64> {
        if self.limiter.len() > PRUNE_THRESHOLD {
            self.prune();
        }
        self.limiter.check_key(&ip).err().map(|not_until| {
            not_until
                .wait_time_from(self.limiter.clock().now())
                .as_secs()
                .max(1)
        })
    }

    /// Forget clients whose budget has fully replenished
    pub fn prune(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
        tracing::debug!("Rate limiter tracking {} clients after prune", self.limiter.len());
    }

    pub fn tracked_clients(&self) -> usize {
        self.limiter.len()
    }
}

pub async fn rate_limit_middleware(
    State(limiter): State<ClientRateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    let ip = client_ip(&request);

    if let Some(wait) = limiter.check(ip) {
        tracing::warn!("Rate limit exceeded for {}", ip);
        let mut response =
            ApiError::too_many_requests("Too many requests, please try again later").into_response();
        response.headers_mut().insert(header::RETRY_AFTER, HeaderValue::from(wait));
        return response;
    }

    next.run(request).await
}

/// Socket peer address, else the first `X-Forwarded-For` hop
fn client_ip(request: &Request) -> IpAddr {
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip();
    }

    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausts_budget_per_client() {
        let limiter = ClientRateLimiter::new(2, 600).unwrap();
        let a: IpAddr = "10.0.0.1".parse().unwrap();
        let b: IpAddr = "10.0.0.2".parse().unwrap();

        assert!(limiter.check(a).is_none());
        assert!(limiter.check(a).is_none());
        assert!(limiter.check(a).is_some());
        // other clients keep their own budget
        assert!(limiter.check(b).is_none());
    }

    #[test]
    fn prune_drops_replenished_clients() {
        // one request per millisecond replenishes almost at once
        let limiter = ClientRateLimiter {
            limiter: Arc::new(RateLimiter::keyed(
                Quota::with_period(Duration::from_millis(1)).unwrap(),
            )),
        };
        for last in 1..=50u8 {
            assert!(limiter.check(IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))).is_none());
        }
        assert_eq!(limiter.tracked_clients(), 50);

        std::thread::sleep(Duration::from_millis(20));
        limiter.prune();
        assert_eq!(limiter.tracked_clients(), 0);
    }

    #[test]
    fn zero_budget_disables_limiter() {
        assert!(ClientRateLimiter::new(0, 600).is_none());
    }
}
