use tokio::time::Instant;

/// byte counter for a single transfer. speed is the plain average since the
/// first reported tick.
#[derive(Debug, Clone, Default)]
pub struct Progress {
    total: u64,
    uploaded: u64,
    first_tick: Option<Instant>,
    speed: f64,
}

impl Progress {
    pub fn new(total: u64) -> Self {
        Progress {
            total,
            ..Default::default()
        }
    }

    pub fn record(&mut self, uploaded: u64, now: Instant) {
        let first = *self.first_tick.get_or_insert(now);
        let elapsed = now.saturating_duration_since(first).as_secs_f64();

        self.uploaded = uploaded;

        self.speed = if elapsed > 0.0 {
            self.uploaded as f64 / elapsed
        } else {
            0.0
        };
    }

    /// marks the transfer done regardless of how many ticks were seen
    pub fn finish(&mut self) {
        self.uploaded = self.total;
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn uploaded(&self) -> u64 {
        self.uploaded
    }

    /// bytes per second
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// percentage in 0..=100
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return if self.first_tick.is_some() || self.uploaded > 0 { 100.0 } else { 0.0 };
        }

        f64::min(self.uploaded as f64 / self.total as f64 * 100.0, 100.0)
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::*;

    #[test]
    fn speed_is_average_since_first_tick() {
        let start = Instant::now();
        let mut progress = Progress::new(4000);

        progress.record(1000, start);
        assert_eq!(progress.speed(), 0.0);
        assert_eq!(progress.percent(), 25.0);

        progress.record(3000, start + Duration::from_secs(2));
        assert_eq!(progress.speed(), 1500.0);
        assert_eq!(progress.percent(), 75.0);

        progress.finish();
        assert_eq!(progress.uploaded(), 4000);
        assert_eq!(progress.percent(), 100.0);
    }

    #[test]
    fn empty_transfer() {
        let mut progress = Progress::new(0);

        assert_eq!(progress.percent(), 0.0);

        progress.record(0, Instant::now());
        assert_eq!(progress.percent(), 100.0);
    }
}
