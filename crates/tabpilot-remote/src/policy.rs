//! Reconnect delay policy.

use std::time::Duration;

use tabpilot_config::{ReconnectConfig, ReconnectStrategy};

/// Delay schedule for reconnect attempts after an abnormal closure.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    pub strategy: ReconnectStrategy,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Attempts before giving up; 0 retries forever.
    pub max_attempts: u32,
    pub multiplier: f64,
    pub jitter: bool,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from(&ReconnectConfig::default())
    }
}

impl From<&ReconnectConfig> for ReconnectPolicy {
    fn from(config: &ReconnectConfig) -> Self {
        Self {
            strategy: config.strategy,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            max_attempts: config.max_attempts,
            multiplier: config.multiplier,
            jitter: config.jitter,
        }
    }
}

impl ReconnectPolicy {
    /// Fixed interval, no jitter, unbounded.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            strategy: ReconnectStrategy::Fixed,
            base_delay: delay,
            max_delay: delay,
            max_attempts: 0,
            multiplier: 1.0,
            jitter: false,
        }
    }

    /// Delay before reconnect attempt number `attempt` (0-based), or `None`
    /// once the attempt budget is spent.
    pub fn delay_for_attempt(&self, attempt: u32) -> Option<Duration> {
        if self.max_attempts > 0 && attempt >= self.max_attempts {
            return None;
        }

        let base = self.base_delay.as_millis() as f64;
        let delay = match self.strategy {
            ReconnectStrategy::Fixed => base,
            ReconnectStrategy::Exponential => {
                let exponent = attempt.min(i32::MAX as u32) as i32;
                (base * self.multiplier.powi(exponent)).min(self.max_delay.as_millis() as f64)
            }
        };

        let delay_ms = if self.jitter {
            (delay + rand_jitter(delay * 0.1)).max(0.0) as u64
        } else {
            delay as u64
        };

        Some(Duration::from_millis(delay_ms))
    }
}

/// Simple jitter using system time.
fn rand_jitter(max: f64) -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    (nanos as f64 / u32::MAX as f64) * max * 2.0 - max
}
