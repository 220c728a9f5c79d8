use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Semaphore, SemaphorePermit};

#[derive(Clone, Debug, Default)]
pub struct Limits {
    pub requests_per_min: Option<u64>,
    pub concurrency: Option<u32>,
}

/// Token bucket on requests per minute plus an optional cap on requests in flight.
#[derive(Debug)]
pub struct RateLimiter {
    limits: Limits,
    // token bucket modeled by current tokens and time of last refill
    rpm_tokens: Mutex<(f64, Instant)>,
    sem: Option<Semaphore>,
}

impl RateLimiter {
    pub fn new(limits: Limits) -> Self {
        let rpm_capacity = limits.requests_per_min.unwrap_or(0) as f64;
        let sem = limits.concurrency.map(|c| Semaphore::new(c.max(1) as usize));
        Self {
            limits,
            rpm_tokens: Mutex::new((rpm_capacity, Instant::now())),
            sem,
        }
    }

    /// Wait until a request may be sent. The returned permit must be held
    /// for the duration of the request when a concurrency cap is set.
    pub async fn acquire(&self) -> Option<SemaphorePermit<'_>> {
        let permit = match &self.sem {
            Some(sem) => sem.acquire().await.ok(),
            None => None,
        };

        if let Some(rpm) = self.limits.requests_per_min {
            if rpm > 0 {
                self.consume_token(rpm as f64, 60.0).await;
            }
        }
        permit
    }

    async fn consume_token(&self, capacity: f64, period_secs: f64) {
        loop {
            let mut guard = self.rpm_tokens.lock().await;
            let (ref mut tokens, ref mut last) = *guard;
            let now = Instant::now();
            let elapsed = now.duration_since(*last).as_secs_f64();
            let refill_rate = capacity / period_secs;
            *tokens = (*tokens + elapsed * refill_rate).min(capacity);
            *last = now;
            if *tokens >= 1.0 {
                *tokens -= 1.0;
                break;
            }
            let secs = (1.0 - *tokens) / refill_rate;
            drop(guard);
            tokio::time::sleep(Duration::from_secs_f64(secs.max(0.001))).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unlimited_limiter_never_blocks() {
        let rl = RateLimiter::new(Limits::default());
        for _ in 0..100 {
            assert!(rl.acquire().await.is_none());
        }
    }

    #[tokio::test]
    async fn burst_up_to_capacity_is_immediate() {
        let rl = RateLimiter::new(Limits {
            requests_per_min: Some(600),
            concurrency: Some(2),
        });
        let started = Instant::now();
        for _ in 0..5 {
            let permit = rl.acquire().await;
            assert!(permit.is_some());
        }
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
