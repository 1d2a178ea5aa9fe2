// StrideBeat — Sensor Task
//
// Reads the accelerometer at 100 Hz, feeds the rolling-window classifier and
// forwards confirmed activity changes to the arbiter.  A failed read skips the
// tick and leaves the window untouched.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crate::arbiter::Arbiter;
use crate::classifier::ActivityClassifier;
use crate::config::Settings;
use crate::error::SensorError;
use crate::events::{Accel, ActivityLabel, Sample};

/// Accelerometer access.  Implementations must bound the bus transaction in
/// time and return an error instead of blocking.
pub trait SampleSource {
    fn read_sample(&mut self) -> Result<Accel, SensorError>;
}

/// Per-tick sensor logic, separated from the timing loop.
pub struct SensorLoop {
    classifier: ActivityClassifier,
    consecutive_failures: u32,
    warn_after: u32,
}

impl SensorLoop {
    pub fn new(settings: &Settings) -> Self {
        Self {
            classifier: ActivityClassifier::new(settings.hysteresis_samples),
            consecutive_failures: 0,
            warn_after: settings.sensor_failure_warn,
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn classifier(&self) -> &ActivityClassifier {
        &self.classifier
    }

    /// Handle one read result.  Returns a newly confirmed activity.
    pub fn on_read(&mut self, read: Result<Accel, SensorError>, now: Instant) -> Option<ActivityLabel> {
        let accel = match read {
            Ok(accel) => accel,
            Err(e) => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                if self.consecutive_failures == self.warn_after + 1 {
                    log::warn!(
                        "IMU read failing for {} consecutive samples: {}",
                        self.consecutive_failures,
                        e
                    );
                }
                return None;
            }
        };

        if self.consecutive_failures > self.warn_after {
            log::info!("IMU recovered after {} failed reads", self.consecutive_failures);
        }
        self.consecutive_failures = 0;

        let activity = self.classifier.update(Sample { timestamp: now, accel })?;
        log::info!(
            "Activity: {} (variance {:.4})",
            activity.display_name(),
            self.classifier.last_variance().unwrap_or_default()
        );
        Some(activity)
    }
}

pub fn sensor_task<S: SampleSource>(
    mut source: S,
    arbiter: Arc<Arbiter>,
    settings: Settings,
    running: Arc<AtomicBool>,
) {
    log::info!("Sensor task started");

    let interval = settings.sample_interval;
    let mut state = SensorLoop::new(&settings);

    while running.load(Ordering::SeqCst) {
        let tick_start = Instant::now();

        if let Some(activity) = state.on_read(source.read_sample(), tick_start) {
            arbiter.on_activity_changed(activity);
        }

        // Sleep for the remainder of the sampling interval to maintain 100 Hz.
        let elapsed = tick_start.elapsed();
        if elapsed < interval {
            thread::sleep(interval - elapsed);
        }
    }

    log::info!("Sensor task stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WINDOW_SIZE;

    fn still() -> Result<Accel, SensorError> {
        Ok(Accel { ax: 0.0, ay: 0.0, az: 1.0 })
    }

    #[test]
    fn failed_reads_do_not_touch_the_window() {
        let mut s = SensorLoop::new(&Settings::default());
        let now = Instant::now();
        for _ in 0..(WINDOW_SIZE - 1) {
            s.on_read(still(), now);
        }
        for _ in 0..500 {
            assert_eq!(s.on_read(Err(SensorError::Timeout), now), None);
        }
        assert_eq!(s.consecutive_failures(), 500);
        assert!(!s.classifier().is_warmed_up());

        s.on_read(still(), now);
        assert_eq!(s.consecutive_failures(), 0);
        assert!(s.classifier().is_warmed_up());
    }

    #[test]
    fn vigorous_motion_is_reported_once() {
        let settings = Settings::default();
        let mut s = SensorLoop::new(&settings);
        let now = Instant::now();
        let mut changes = Vec::new();
        for i in 0..400 {
            let x = if i % 2 == 0 { 0.6 } else { -0.6 };
            if let Some(a) = s.on_read(Ok(Accel { ax: x, ay: 0.0, az: 1.0 }), now) {
                changes.push((i, a));
            }
        }
        // Window fills at sample 30, hysteresis confirms 70 samples later.
        let first = WINDOW_SIZE - 1 + settings.hysteresis_samples as usize - 1;
        assert_eq!(changes, vec![(first, ActivityLabel::Running)]);
    }
}
