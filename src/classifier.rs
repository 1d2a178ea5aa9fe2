// StrideBeat — Activity Classifier
//
// Raw per-sample classification from window variance, smoothed by a
// run-length hysteresis: a new activity is only confirmed after the raw label
// has agreed with it for `threshold` consecutive samples (0.7 s at 100 Hz).

use crate::config::*;
use crate::events::{ActivityLabel, Sample};
use crate::window::RollingWindow;

/// Map combined variance to a raw activity label.
pub fn classify(variance: f32) -> ActivityLabel {
    if variance <= THRESH_LIGHTWALK {
        ActivityLabel::Still
    } else if variance <= THRESH_BRISKWALK {
        ActivityLabel::LightWalk
    } else if variance <= THRESH_RUNNING {
        ActivityLabel::BriskWalk
    } else {
        ActivityLabel::Running
    }
}

// ---------------------------------------------------------------------------
// Hysteresis state machine
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hysteresis {
    confirmed: ActivityLabel,
    candidate: ActivityLabel,
    candidate_run_length: u32,
    threshold: u32,
}

impl Hysteresis {
    pub fn new(threshold: u32) -> Self {
        Self {
            confirmed: ActivityLabel::Still,
            candidate: ActivityLabel::Still,
            candidate_run_length: 0,
            threshold,
        }
    }

    pub fn confirmed(&self) -> ActivityLabel {
        self.confirmed
    }

    pub fn candidate(&self) -> ActivityLabel {
        self.candidate
    }

    pub fn candidate_run_length(&self) -> u32 {
        self.candidate_run_length
    }

    /// Feed one raw label.  Returns the newly confirmed activity on a
    /// transition.
    pub fn observe(&mut self, raw: ActivityLabel) -> Option<ActivityLabel> {
        if raw == self.candidate {
            self.candidate_run_length = self.candidate_run_length.saturating_add(1);
        } else {
            self.candidate = raw;
            self.candidate_run_length = 1;
        }

        if self.candidate_run_length >= self.threshold && self.candidate != self.confirmed {
            self.confirmed = self.candidate;
            self.candidate_run_length = 0;
            return Some(self.confirmed);
        }
        None
    }

    /// Classify `variance` and feed the result.
    pub fn step(&mut self, variance: f32) -> Option<ActivityLabel> {
        self.observe(classify(variance))
    }
}

impl Default for Hysteresis {
    fn default() -> Self {
        Self::new(HYSTERESIS_SAMPLES)
    }
}

// ---------------------------------------------------------------------------
// Window + hysteresis, driven once per sample by the sensor task
// ---------------------------------------------------------------------------
pub struct ActivityClassifier {
    window: RollingWindow,
    hysteresis: Hysteresis,
    warmed_up: bool,
    last_variance: Option<f32>,
}

impl ActivityClassifier {
    pub fn new(hysteresis_samples: u32) -> Self {
        Self {
            window: RollingWindow::new(),
            hysteresis: Hysteresis::new(hysteresis_samples),
            warmed_up: false,
            last_variance: None,
        }
    }

    /// Push a sample.  Returns the new confirmed activity when it changes.
    ///
    /// Nothing is classified until the window has filled once.
    pub fn update(&mut self, sample: Sample) -> Option<ActivityLabel> {
        self.window.push(sample);
        if !self.warmed_up {
            if !self.window.is_full() {
                return None;
            }
            self.warmed_up = true;
            log::debug!("Classifier warm-up complete ({} samples)", WINDOW_SIZE);
        }

        let variance = self.window.variance()?;
        self.last_variance = Some(variance);
        self.hysteresis.step(variance)
    }

    pub fn confirmed(&self) -> ActivityLabel {
        self.hysteresis.confirmed()
    }

    pub fn is_warmed_up(&self) -> bool {
        self.warmed_up
    }

    /// Variance of the last classified window (for diagnostics).
    pub fn last_variance(&self) -> Option<f32> {
        self.last_variance
    }
}

impl Default for ActivityClassifier {
    fn default() -> Self {
        Self::new(HYSTERESIS_SAMPLES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn classify_threshold_boundaries() {
        assert_eq!(classify(0.0), ActivityLabel::Still);
        assert_eq!(classify(0.01), ActivityLabel::Still);
        assert_eq!(classify(0.011), ActivityLabel::LightWalk);
        assert_eq!(classify(0.03), ActivityLabel::LightWalk);
        assert_eq!(classify(0.031), ActivityLabel::BriskWalk);
        assert_eq!(classify(0.15), ActivityLabel::BriskWalk);
        assert_eq!(classify(0.151), ActivityLabel::Running);
        assert_eq!(classify(4.0), ActivityLabel::Running);
    }

    #[test]
    fn initial_state_is_still() {
        let h = Hysteresis::default();
        assert_eq!(h.confirmed(), ActivityLabel::Still);
        assert_eq!(h.candidate(), ActivityLabel::Still);
        assert_eq!(h.candidate_run_length(), 0);
    }

    #[test]
    fn sustained_running_confirms_exactly_once() {
        let mut h = Hysteresis::default();
        let mut transitions = Vec::new();
        for i in 1..=300u32 {
            if let Some(a) = h.step(0.2) {
                transitions.push((i, a));
            }
        }
        assert_eq!(transitions, vec![(70, ActivityLabel::Running)]);
        assert_eq!(h.confirmed(), ActivityLabel::Running);
    }

    #[test]
    fn single_outlier_resets_the_run() {
        let mut h = Hysteresis::default();
        for _ in 0..69 {
            assert_eq!(h.step(0.2), None);
        }
        // One Still reading amid the run.
        assert_eq!(h.step(0.0), None);
        assert_eq!(h.confirmed(), ActivityLabel::Still);
        // The Running run starts over from one.
        for _ in 0..69 {
            assert_eq!(h.step(0.2), None);
        }
        assert_eq!(h.step(0.2), Some(ActivityLabel::Running));
    }

    #[test]
    fn still_then_running_scenario() {
        let mut h = Hysteresis::default();
        for _ in 0..80 {
            assert_eq!(h.step(0.001), None);
        }
        assert_eq!(h.confirmed(), ActivityLabel::Still);
        for i in 1..=70 {
            let out = h.step(0.2);
            if i < 70 {
                assert_eq!(out, None);
            } else {
                assert_eq!(out, Some(ActivityLabel::Running));
            }
        }
    }

    #[test]
    fn classifier_waits_for_full_window() {
        let mut c = ActivityClassifier::new(1);
        let t = Instant::now();
        // Alternating samples would classify as Running immediately.
        for i in 0..(WINDOW_SIZE - 1) {
            let x = if i % 2 == 0 { 1.0 } else { -1.0 };
            assert_eq!(c.update(Sample::new(t, x, 0.0, 0.0)), None);
            assert!(!c.is_warmed_up());
        }
        assert_eq!(
            c.update(Sample::new(t, 1.0, 0.0, 0.0)),
            Some(ActivityLabel::Running)
        );
        assert!(c.is_warmed_up());
        assert!(c.last_variance().unwrap() > THRESH_RUNNING);
    }

    #[test]
    fn resting_wearer_never_transitions() {
        let mut c = ActivityClassifier::default();
        let t = Instant::now();
        for _ in 0..500 {
            assert_eq!(c.update(Sample::new(t, 0.02, -0.01, 0.98)), None);
        }
        assert_eq!(c.confirmed(), ActivityLabel::Still);
    }
}
