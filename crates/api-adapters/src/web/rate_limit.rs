//! Fixed-window request limiting per client address.

use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;

use super::error::ApiError;
use super::state::AppState;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    clients: DashMap<IpAddr, Window>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self { max_requests, window, clients: DashMap::new() }
    }

    pub fn per_minute(max_requests: u32) -> Self {
        Self::new(max_requests, Duration::from_secs(60))
    }

    /// Counts one request from `client`; `false` once the window is exhausted.
    pub fn check(&self, client: IpAddr) -> bool {
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: IpAddr, now: Instant) -> bool {
        let mut entry = self.clients.entry(client).or_insert(Window { started: now, count: 0 });
        if now.duration_since(entry.started) >= self.window {
            *entry = Window { started: now, count: 0 };
        }
        entry.count += 1;
        entry.count <= self.max_requests
    }

    /// Drops clients whose window has closed.
    pub fn prune(&self) {
        let now = Instant::now();
        self.clients.retain(|_, w| now.duration_since(w.started) < self.window);
    }

    pub fn tracked_clients(&self) -> usize {
        self.clients.len()
    }
}

fn client_addr(request: &Request) -> IpAddr {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::from([127, 0, 0, 1]))
}

pub async fn limit_by_ip(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let client = client_addr(&request);
    if !state.limiter.check(client) {
        tracing::warn!(%client, path = %request.uri().path(), "rate limit exceeded");
        return Err(ApiError::TooManyRequests);
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_exhausts_then_resets() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        let client = IpAddr::from([10, 0, 0, 1]);
        let start = Instant::now();

        assert!(limiter.check_at(client, start));
        assert!(limiter.check_at(client, start));
        assert!(!limiter.check_at(client, start));
        assert!(limiter.check_at(client, start + Duration::from_secs(61)));
    }

    #[test]
    fn clients_are_counted_separately() {
        let limiter = RateLimiter::per_minute(1);
        assert!(limiter.check(IpAddr::from([10, 0, 0, 1])));
        assert!(limiter.check(IpAddr::from([10, 0, 0, 2])));
        assert!(!limiter.check(IpAddr::from([10, 0, 0, 1])));
    }

    #[test]
    fn prune_forgets_closed_windows() {
        let limiter = RateLimiter::new(5, Duration::ZERO);
        limiter.check(IpAddr::from([10, 0, 0, 1]));
        limiter.prune();
        assert_eq!(limiter.tracked_clients(), 0);
    }
}
