// StrideBeat — Button Input Manager
//
// Debounced handler for the four control buttons.  Designed to be polled at
// ~100 Hz from the button task.  Each pin has its own debouncer; only a
// debounced press (released → pressed) produces an event, and holding a
// button down does not repeat.

use std::time::{Duration, Instant};

use crate::events::{ButtonEvent, ButtonKind};

/// Raw level source for the buttons (active LOW, internal pull-ups).
pub trait ButtonInputs {
    /// `true` while the contact for `kind` is closed.
    fn is_low(&mut self, kind: ButtonKind) -> bool;
}

// ---------------------------------------------------------------------------
// Per-pin debounce filter
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy)]
pub struct Debouncer {
    window: Duration,
    // Last raw level seen and when it last changed.
    last_raw_low: bool,
    last_change: Instant,
    // Level accepted after being stable for `window`.
    pressed: bool,
}

impl Debouncer {
    pub fn new(window: Duration, now: Instant) -> Self {
        Self {
            window,
            last_raw_low: false, // pull-up → idle HIGH
            last_change: now,
            pressed: false,
        }
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    /// Feed one raw reading.  Returns `true` on a debounced press edge.
    pub fn update(&mut self, raw_low: bool, now: Instant) -> bool {
        if raw_low != self.last_raw_low {
            // Signal still bouncing — restart the stability window.
            self.last_raw_low = raw_low;
            self.last_change = now;
            return false;
        }

        if now.duration_since(self.last_change) < self.window {
            return false;
        }

        if raw_low != self.pressed {
            self.pressed = raw_low;
            return raw_low;
        }
        false
    }
}

// ---------------------------------------------------------------------------
// Four-button handler
// ---------------------------------------------------------------------------
pub struct ButtonHandler {
    debouncers: [Debouncer; 4],
}

impl ButtonHandler {
    pub fn new(debounce: Duration, now: Instant) -> Self {
        Self {
            debouncers: [Debouncer::new(debounce, now); 4],
        }
    }

    /// Call every ~10 ms from the button task loop.
    pub fn poll<I: ButtonInputs>(&mut self, inputs: &mut I, now: Instant) -> Vec<ButtonEvent> {
        let mut events = Vec::new();
        for kind in ButtonKind::ALL {
            let raw_low = inputs.is_low(kind);
            if self.debouncers[kind.index()].update(raw_low, now) {
                log::debug!("Button: {:?}", kind);
                events.push(ButtonEvent::new(kind, now));
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(50);
    const TICK: Duration = Duration::from_millis(10);

    /// Drive a debouncer with one raw level per 10 ms tick; collect press ticks.
    fn run(levels: &[bool]) -> Vec<usize> {
        let start = Instant::now();
        let mut d = Debouncer::new(WINDOW, start);
        levels
            .iter()
            .enumerate()
            .filter_map(|(i, &low)| {
                let now = start + TICK * (i as u32 + 1);
                d.update(low, now).then_some(i)
            })
            .collect()
    }

    #[test]
    fn clean_press_fires_once_after_window() {
        let mut levels = vec![false; 3];
        levels.extend(vec![true; 20]);
        let presses = run(&levels);
        // Low from tick 3; stable for 50 ms at tick 8.
        assert_eq!(presses, vec![8]);
    }

    #[test]
    fn bounce_shorter_than_window_is_ignored() {
        let levels = [
            false, true, false, true, false, true, false, false, false, false, false, false, false,
        ];
        assert!(run(&levels).is_empty());
    }

    #[test]
    fn bouncy_press_fires_once() {
        let mut levels = vec![true, false, true, false, true];
        levels.extend(vec![true; 10]);
        assert_eq!(run(&levels).len(), 1);
    }

    #[test]
    fn held_button_does_not_repeat() {
        let levels = vec![true; 500];
        assert_eq!(run(&levels).len(), 1);
    }

    #[test]
    fn release_does_not_fire_and_second_press_does() {
        let mut levels = vec![true; 10];
        levels.extend(vec![false; 10]);
        levels.extend(vec![true; 10]);
        assert_eq!(run(&levels).len(), 2);
    }

    struct Pins([bool; 4]);

    impl ButtonInputs for Pins {
        fn is_low(&mut self, kind: ButtonKind) -> bool {
            self.0[kind.index()]
        }
    }

    #[test]
    fn pins_are_debounced_independently() {
        let start = Instant::now();
        let mut handler = ButtonHandler::new(WINDOW, start);
        let mut pins = Pins([false; 4]);

        pins.0[ButtonKind::Lock.index()] = true;
        let mut fired = Vec::new();
        for i in 1..=20u32 {
            if i == 3 {
                pins.0[ButtonKind::VolumeUp.index()] = true;
            }
            let now = start + TICK * i;
            fired.extend(handler.poll(&mut pins, now).into_iter().map(|e| e.kind));
        }
        assert_eq!(fired, vec![ButtonKind::Lock, ButtonKind::VolumeUp]);
    }
}
