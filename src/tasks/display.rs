// StrideBeat — Display Task
//
// Rebuilds the status snapshot a few times per second and hands it to the
// display.  Render failures are logged on the first occurrence only.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crate::arbiter::Arbiter;
use crate::config::Settings;
use crate::director::NowPlaying;
use crate::status::{StatusDisplay, StatusProjector};

pub fn display_task<D: StatusDisplay>(
    mut display: D,
    arbiter: Arc<Arbiter>,
    now_playing: NowPlaying,
    settings: Settings,
    running: Arc<AtomicBool>,
) {
    log::info!("Display task started");

    let interval = settings.display_interval;
    let mut projector = StatusProjector::new(settings.title_chars);
    let mut render_failing = false;

    while running.load(Ordering::SeqCst) {
        let tick_start = Instant::now();

        let (decision, activity) = arbiter.snapshot();
        let snapshot = projector.project(decision, activity, now_playing.get(), now_playing.volume());
        match display.render(&snapshot) {
            Ok(()) => render_failing = false,
            Err(e) => {
                if !render_failing {
                    log::warn!("Display error: {}", e);
                }
                render_failing = true;
            }
        }

        let elapsed = tick_start.elapsed();
        if elapsed < interval {
            thread::sleep(interval - elapsed);
        }
    }

    if let Err(e) = display.clear() {
        log::warn!("Display clear failed: {}", e);
    }
    log::info!("Display task stopped");
}
