//! Per-client token buckets behind a bounded table.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use actix_web::body::{EitherBody, MessageBody};
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::middleware::Next;
use actix_web::{web, ResponseError};

use crate::config::RateLimitConfig;
use crate::errors::AppError;

const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy)]
struct Bucket {
    tokens: f64,
    updated: Instant,
}

#[derive(Debug)]
struct Table {
    buckets: HashMap<IpAddr, Bucket>,
    last_sweep: Instant,
}

#[derive(Debug)]
pub struct RateLimiter {
    table: Mutex<Table>,
    per_second: f64,
    burst: f64,
    max_clients: usize,
    idle: Duration,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            table: Mutex::new(Table {
                buckets: HashMap::new(),
                last_sweep: Instant::now(),
            }),
            per_second: config.per_second,
            burst: f64::from(config.burst.max(1)),
            max_clients: config.max_clients.max(1),
            idle: config.idle,
        }
    }

    /// Take one token from `client`'s bucket. `false` means the request
    /// should be refused.
    pub fn check(&self, client: IpAddr, now: Instant) -> bool {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);

        if !table.buckets.contains_key(&client) {
            self.make_room(&mut table, now);
            table.buckets.insert(
                client,
                Bucket {
                    tokens: self.burst,
                    updated: now,
                },
            );
        }

        let Some(bucket) = table.buckets.get_mut(&client) else {
            return true;
        };
        let elapsed = now.saturating_duration_since(bucket.updated).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.per_second).min(self.burst);
        bucket.updated = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    pub fn tracked_clients(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .buckets
            .len()
    }

    fn make_room(&self, table: &mut Table, now: Instant) {
        let full = table.buckets.len() >= self.max_clients;
        if full || now.saturating_duration_since(table.last_sweep) >= SWEEP_INTERVAL {
            let idle = self.idle;
            table
                .buckets
                .retain(|_, b| now.saturating_duration_since(b.updated) < idle);
            table.last_sweep = now;
        }

        if table.buckets.len() >= self.max_clients {
            let oldest = table
                .buckets
                .iter()
                .min_by_key(|(_, b)| b.updated)
                .map(|(ip, _)| *ip);
            if let Some(ip) = oldest {
                table.buckets.remove(&ip);
            }
        }
    }
}

/// Middleware refusing requests from clients whose bucket is empty.
pub async fn enforce<B: MessageBody>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<EitherBody<B>>, actix_web::Error> {
    if let Some(limiter) = req.app_data::<web::Data<RateLimiter>>() {
        let client = req
            .peer_addr()
            .map(|addr| addr.ip())
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        if !limiter.check(client, Instant::now()) {
            log::warn!("rate limit exceeded for {}", client);
            let refused = AppError::TooManyRequests.error_response();
            return Ok(req.into_response(refused).map_into_right_body());
        }
    }
    next.call(req).await.map(ServiceResponse::map_into_left_body)
}
