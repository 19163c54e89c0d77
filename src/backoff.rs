//! Exponential backoff for the construction-time health probe.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;
use tracing::debug;

use crate::error::Result;

/// Parameters of an exponential backoff schedule
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    /// First retry interval
    pub initial_interval: Duration,
    /// Growth factor applied to the interval after every retry
    pub multiplier: f64,
    /// Each interval is drawn from `current ± factor * current`; 0 disables jitter
    pub randomization_factor: f64,
    /// Upper bound on the (un-randomized) interval
    pub max_interval: Duration,
    /// Total budget; retrying stops once the next sleep would exceed it.
    /// `Duration::ZERO` retries forever.
    pub max_elapsed_time: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(100),
            multiplier: 1.5,
            randomization_factor: 0.5,
            max_interval: Duration::from_secs(30),
            max_elapsed_time: Duration::from_secs(5),
        }
    }
}

/// Time source for the retry loop
pub trait Clock {
    /// Current instant
    fn now(&self) -> Instant;

    /// Suspend for `duration`
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// Clock backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}

/// Stateful schedule produced from a [`BackoffPolicy`]
#[derive(Debug)]
pub struct Backoff<'a, C> {
    policy: &'a BackoffPolicy,
    clock: &'a C,
    start: Instant,
    current: Duration,
}

impl<'a, C: Clock> Backoff<'a, C> {
    /// Start a schedule; elapsed time is measured from now
    pub fn new(policy: &'a BackoffPolicy, clock: &'a C) -> Self {
        Self {
            policy,
            clock,
            start: clock.now(),
            current: policy.initial_interval,
        }
    }

    /// Time since the schedule started
    pub fn elapsed(&self) -> Duration {
        self.clock.now().saturating_duration_since(self.start)
    }

    /// Instant at which the elapsed budget runs out, if bounded
    pub fn deadline(&self) -> Option<Instant> {
        if self.policy.max_elapsed_time.is_zero() {
            None
        } else {
            Some(self.start + self.policy.max_elapsed_time)
        }
    }

    /// Next interval to wait, or `None` once the budget would be exceeded
    pub fn next_backoff(&mut self) -> Option<Duration> {
        let elapsed = self.elapsed();
        let next = randomize(self.current, self.policy.randomization_factor);
        self.grow();

        let budget = self.policy.max_elapsed_time;
        if !budget.is_zero() && elapsed + next > budget {
            return None;
        }
        Some(next)
    }

    fn grow(&mut self) {
        let max = self.policy.max_interval;
        if self.current.as_secs_f64() >= max.as_secs_f64() / self.policy.multiplier {
            self.current = max;
        } else {
            let nanos = self.current.as_nanos() as f64 * self.policy.multiplier;
            self.current = Duration::from_nanos(nanos as u64);
        }
    }
}

fn randomize(interval: Duration, factor: f64) -> Duration {
    if factor <= 0.0 || interval.is_zero() {
        return interval;
    }
    let delta = interval.as_secs_f64() * factor;
    let low = interval.as_secs_f64() - delta;
    let high = interval.as_secs_f64() + delta;
    Duration::from_secs_f64(rand::thread_rng().gen_range(low.max(0.0)..=high))
}

/// Run `operation` until it succeeds or the policy's budget is exhausted.
///
/// Returns the first success, or the error of the last attempt.
pub async fn retry<C, T, F, Fut>(policy: &BackoffPolicy, clock: &C, mut operation: F) -> Result<T>
where
    C: Clock,
    F: FnMut(Option<Instant>) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut backoff = Backoff::new(policy, clock);
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        let err = match operation(backoff.deadline()).await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        match backoff.next_backoff() {
            Some(delay) => {
                debug!(attempt, delay_ms = delay.as_millis() as u64, error = %err, "Retrying after backoff");
                clock.sleep(delay).await;
            }
            None => {
                debug!(attempt, elapsed_ms = backoff.elapsed().as_millis() as u64, "Backoff budget exhausted");
                return Err(err);
            }
        }
    }
}
