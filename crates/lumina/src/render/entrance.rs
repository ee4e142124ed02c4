use std::time::{Duration, Instant};

pub const ENTRANCE_DURATION: Duration = Duration::from_millis(400);

/// Vertical travel of the entrance, in reference-frame pixels.
pub const ENTRANCE_RISE: f32 = 30.0;

/// Replays the entrance animation whenever the store's transition epoch
/// moves. Anything else (style changes, duplicate deliveries) leaves a
/// running or finished animation alone.
#[derive(Debug, Clone)]
pub struct Entrance {
    epoch: u64,
    start: Option<Instant>,
}

impl Entrance {
    /// Starts settled on `epoch`, so whatever is already showing does not
    /// animate.
    pub fn new(epoch: u64) -> Self {
        Self { epoch, start: None }
    }

    /// Returns `true` when a new animation was started.
    pub fn observe(&mut self, epoch: u64, now: Instant) -> bool {
        if epoch == self.epoch {
            return false;
        }
        self.epoch = epoch;
        self.start = Some(now);
        true
    }

    /// Eased progress in `0.0..=1.0`.
    pub fn progress(&self, now: Instant) -> f32 {
        let Some(start) = self.start else {
            return 1.0;
        };
        let raw = now.saturating_duration_since(start).as_secs_f32()
            / ENTRANCE_DURATION.as_secs_f32();
        ease_out_cubic(raw.clamp(0.0, 1.0))
    }

    pub fn is_running(&self, now: Instant) -> bool {
        self.start
            .is_some_and(|start| now.saturating_duration_since(start) < ENTRANCE_DURATION)
    }

    /// `(opacity, rise)` for the current frame; `rise` is in reference pixels.
    pub fn frame(&self, now: Instant) -> (f32, f32) {
        let t = self.progress(now);
        (t, (1.0 - t) * ENTRANCE_RISE)
    }
}

pub fn ease_out_cubic(t: f32) -> f32 {
    1.0 - (1.0 - t).powi(3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settled_at_start() {
        let entrance = Entrance::new(3);
        let now = Instant::now();
        assert_eq!(entrance.frame(now), (1.0, 0.0));
        assert!(!entrance.is_running(now));
    }

    #[test]
    fn test_epoch_change_replays() {
        let mut entrance = Entrance::new(0);
        let t0 = Instant::now();
        assert!(entrance.observe(1, t0));
        assert!(!entrance.observe(1, t0 + Duration::from_millis(100)));

        let (opacity, rise) = entrance.frame(t0);
        assert_eq!(opacity, 0.0);
        assert_eq!(rise, ENTRANCE_RISE);

        let mid = t0 + Duration::from_millis(200);
        let (opacity, rise) = entrance.frame(mid);
        assert!(opacity > 0.5 && opacity < 1.0);
        assert!(rise > 0.0 && rise < ENTRANCE_RISE);
        assert!(entrance.is_running(mid));

        let done = t0 + ENTRANCE_DURATION;
        assert_eq!(entrance.frame(done), (1.0, 0.0));
        assert!(!entrance.is_running(done));
    }

    #[test]
    fn test_ease_bounds() {
        assert_eq!(ease_out_cubic(0.0), 0.0);
        assert_eq!(ease_out_cubic(1.0), 1.0);
        assert!(ease_out_cubic(0.5) > 0.5);
    }
}
