//! Self-imposed crawl delays
//!
//! Two kinds of pauses keep the crawler's request pattern irregular:
//! - after an emitted post, a random pause with a configured probability
//! - after a rate-limit signal, the source's suggested wait plus jitter

use crate::config::ThrottleConfig;
use rand::Rng;
use std::time::Duration;

/// Delay policy shared by all chunk fetchers of a run
#[derive(Debug, Clone)]
pub struct Throttle {
    emit_probability: f64,
    emit_min: Duration,
    emit_max: Duration,
    jitter_min: Duration,
    jitter_max: Duration,
}

impl Throttle {
    pub fn new(config: &ThrottleConfig) -> Self {
        Self {
            emit_probability: config.emit_delay_probability,
            emit_min: Duration::from_millis(config.emit_delay_min_ms),
            emit_max: Duration::from_millis(config.emit_delay_max_ms),
            jitter_min: Duration::from_millis(config.rate_limit_jitter_min_ms),
            jitter_max: Duration::from_millis(config.rate_limit_jitter_max_ms),
        }
    }

    /// A throttle that never sleeps
    pub fn disabled() -> Self {
        Self {
            emit_probability: 0.0,
            emit_min: Duration::ZERO,
            emit_max: Duration::ZERO,
            jitter_min: Duration::ZERO,
            jitter_max: Duration::ZERO,
        }
    }

    /// Pause to take after emitting a post, if any
    pub fn emit_delay(&self) -> Option<Duration> {
        if self.emit_probability <= 0.0 {
            return None;
        }

        let mut rng = rand::rng();
        if rng.random_bool(self.emit_probability.min(1.0)) {
            Some(random_between(&mut rng, self.emit_min, self.emit_max))
        } else {
            None
        }
    }

    /// Pause to take after a rate-limit signal
    pub fn rate_limit_delay(&self, suggested: Option<Duration>) -> Duration {
        let jitter = random_between(&mut rand::rng(), self.jitter_min, self.jitter_max);
        suggested.unwrap_or(Duration::ZERO) + jitter
    }

    /// Sleeps after an emission when the dice say so
    pub async fn after_emit(&self) {
        if let Some(delay) = self.emit_delay() {
            tracing::debug!("Random delay of {:.2} seconds", delay.as_secs_f64());
            tokio::time::sleep(delay).await;
        }
    }

    /// Sleeps off a rate-limit signal
    pub async fn after_rate_limit(&self, suggested: Option<Duration>) {
        let delay = self.rate_limit_delay(suggested);
        if !delay.is_zero() {
            tracing::info!("Sleeping for {:.2} seconds...", delay.as_secs_f64());
            tokio::time::sleep(delay).await;
        }
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(&ThrottleConfig::default())
    }
}

fn random_between(rng: &mut impl Rng, min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    let millis = rng.random_range(min.as_millis() as u64..=max.as_millis() as u64);
    Duration::from_millis(millis)
}
