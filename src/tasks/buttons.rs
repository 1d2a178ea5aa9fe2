// StrideBeat — Button Task
//
// Polls the four buttons every 10 ms and hands debounced presses to the
// arbiter in the order they were detected.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crate::arbiter::Arbiter;
use crate::config::Settings;
use crate::input::{ButtonHandler, ButtonInputs};

pub fn button_task<B: ButtonInputs>(
    mut inputs: B,
    arbiter: Arc<Arbiter>,
    settings: Settings,
    running: Arc<AtomicBool>,
) {
    log::info!("Button task started");

    let interval = settings.button_poll_interval;
    let mut handler = ButtonHandler::new(settings.debounce, Instant::now());

    while running.load(Ordering::SeqCst) {
        let tick_start = Instant::now();

        for event in handler.poll(&mut inputs, tick_start) {
            arbiter.on_button(event);
        }

        let elapsed = tick_start.elapsed();
        if elapsed < interval {
            thread::sleep(interval - elapsed);
        }
    }

    log::info!("Button task stopped");
}
