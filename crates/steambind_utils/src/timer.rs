use std::time::{Duration, Instant};

/// Simple stopwatch helper for wall-clock measurements.
pub struct Stopwatch {
    start: Instant,
}

impl Stopwatch {
    pub fn start_new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Whether more than `limit` has passed since the stopwatch started.
    pub fn exceeded(&self, limit: Duration) -> bool {
        self.elapsed() >= limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_limit_is_exceeded_immediately() {
        let watch = Stopwatch::start_new();
        assert!(watch.exceeded(Duration::ZERO));
        assert!(!watch.exceeded(Duration::from_secs(3600)));
    }
}
