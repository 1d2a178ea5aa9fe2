// StrideBeat — Runtime
//
// Process boundary for the core: validates the setup, spawns the sensor,
// button, display and director tasks, and stops them again.  Shutdown first
// stops the three periodic tasks, then lets the director drain its queue, so
// no decision is left half-applied.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::Context;

use crate::arbiter::{Arbiter, PlaybackDecision};
use crate::config::*;
use crate::director::{Command, MusicBackend, NowPlaying, PlaybackDirector};
use crate::error::ConfigError;
use crate::events::{ActivityLabel, Playlist};
use crate::input::ButtonInputs;
use crate::status::StatusDisplay;
use crate::tasks::buttons::button_task;
use crate::tasks::display::display_task;
use crate::tasks::sensor::{sensor_task, SampleSource};

const TASK_SENSOR: &str = "sensor";
const TASK_BUTTONS: &str = "buttons";
const TASK_DISPLAY: &str = "display";
const TASK_DIRECTOR: &str = "director";

/// How the runtime came to a halt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    /// Every task exited within the grace period.
    Clean,
    /// At least one task had to be abandoned (or panicked).
    Forced,
}

impl Shutdown {
    pub fn exit_code(&self) -> i32 {
        match self {
            Shutdown::Clean => 0,
            Shutdown::Forced => 1,
        }
    }
}

/// Reports a task's exit on drop, so panics are noticed too.
struct ExitSignal {
    name: &'static str,
    tx: Sender<&'static str>,
}

impl Drop for ExitSignal {
    fn drop(&mut self) {
        let _ = self.tx.send(self.name);
    }
}

struct Task {
    name: &'static str,
    handle: JoinHandle<()>,
}

pub struct Runtime {
    arbiter: Arc<Arbiter>,
    now_playing: NowPlaying,
    running: Arc<AtomicBool>,
    commands: Sender<Command>,
    exits_tx: Sender<&'static str>,
    exits: Receiver<&'static str>,
    tasks: Vec<Task>,
    grace: Duration,
    outcome: Option<Shutdown>,
}

impl Runtime {
    /// Check the configuration and start every periodic activity.
    ///
    /// Fails on invalid settings or a playlist the backend reports as empty.
    /// An unreachable backend is tolerated: playback catches up once it
    /// answers.
    pub fn start<S, B, M, D>(
        settings: Settings,
        source: S,
        buttons: B,
        mut backend: M,
        display: D,
    ) -> anyhow::Result<Self>
    where
        S: SampleSource + Send + 'static,
        B: ButtonInputs + Send + 'static,
        M: MusicBackend + Send + 'static,
        D: StatusDisplay + Send + 'static,
    {
        settings.validate().context("invalid settings")?;
        check_playlists(&mut backend)?;

        let (commands, command_rx) = mpsc::channel();
        let (exits_tx, exits) = mpsc::channel();
        let arbiter = Arc::new(Arbiter::new(commands.clone(), &settings));
        let now_playing = NowPlaying::default();

        let mut runtime = Runtime {
            arbiter: Arc::clone(&arbiter),
            now_playing: now_playing.clone(),
            running: Arc::new(AtomicBool::new(true)),
            commands,
            exits_tx,
            exits,
            tasks: Vec::new(),
            grace: settings.shutdown_grace,
            outcome: None,
        };

        // Director first so the startup sync has a consumer.
        let director = PlaybackDirector::new(
            backend,
            Arc::clone(&arbiter),
            now_playing.clone(),
            settings.now_playing_interval,
        );
        runtime.spawn(TASK_DIRECTOR, STACK_DIRECTOR, move || {
            director.run(command_rx);
        })?;
        arbiter.start_playback();

        let (a, s, r) = (Arc::clone(&arbiter), settings.clone(), Arc::clone(&runtime.running));
        runtime.spawn(TASK_SENSOR, STACK_SENSOR, move || sensor_task(source, a, s, r))?;

        let (a, s, r) = (Arc::clone(&arbiter), settings.clone(), Arc::clone(&runtime.running));
        runtime.spawn(TASK_BUTTONS, STACK_BUTTONS, move || button_task(buttons, a, s, r))?;

        let (a, s, r) = (Arc::clone(&arbiter), settings, Arc::clone(&runtime.running));
        runtime.spawn(TASK_DISPLAY, STACK_DISPLAY, move || {
            display_task(display, a, now_playing, s, r)
        })?;

        log::info!("StrideBeat running — move around to change music");
        Ok(runtime)
    }

    fn spawn<F>(&mut self, name: &'static str, stack: usize, f: F) -> anyhow::Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let signal = ExitSignal {
            name,
            tx: self.exits_tx.clone(),
        };
        let handle = thread::Builder::new()
            .name(name.into())
            .stack_size(task_stack(stack))
            .spawn(move || {
                let _signal = signal;
                f();
            })
            .with_context(|| format!("failed to spawn {} task", name))?;
        self.tasks.push(Task { name, handle });
        Ok(())
    }

    pub fn decision(&self) -> PlaybackDecision {
        self.arbiter.decision()
    }

    pub fn activity(&self) -> ActivityLabel {
        self.arbiter.activity()
    }

    pub fn now_playing(&self) -> Option<String> {
        self.now_playing.get()
    }

    pub fn is_running(&self) -> bool {
        self.outcome.is_none()
    }

    /// Halt all tasks.  The final decision stays readable afterwards.
    /// Calling `stop` again returns the first outcome.
    pub fn stop(&mut self) -> Shutdown {
        if let Some(outcome) = self.outcome {
            return outcome;
        }

        log::info!("Stopping StrideBeat…");
        let deadline = Instant::now() + self.grace;

        self.running.store(false, Ordering::SeqCst);
        let periodic: Vec<&'static str> = self
            .tasks
            .iter()
            .map(|t| t.name)
            .filter(|&n| n != TASK_DIRECTOR)
            .collect();
        let mut all_exited = self.await_exits(periodic, deadline);

        // Periodic tasks are done issuing commands; let the director drain.
        let _ = self.commands.send(Command::Shutdown);
        if self.tasks.iter().any(|t| t.name == TASK_DIRECTOR) {
            all_exited &= self.await_exits(vec![TASK_DIRECTOR], deadline);
        }

        let outcome = if all_exited {
            let mut panicked = false;
            for task in self.tasks.drain(..) {
                if task.handle.join().is_err() {
                    log::error!("{} task panicked", task.name);
                    panicked = true;
                }
            }
            if panicked { Shutdown::Forced } else { Shutdown::Clean }
        } else {
            // Stragglers are detached; they exit on their own once unblocked.
            self.tasks.clear();
            Shutdown::Forced
        };

        match outcome {
            Shutdown::Clean => log::info!("Shutdown complete"),
            Shutdown::Forced => log::warn!("Shutdown forced"),
        }
        self.outcome = Some(outcome);
        outcome
    }

    /// Wait until every task in `pending` has reported its exit.
    fn await_exits(&self, mut pending: Vec<&'static str>, deadline: Instant) -> bool {
        while !pending.is_empty() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.exits.recv_timeout(remaining) {
                Ok(name) => {
                    log::debug!("{} task exited", name);
                    pending.retain(|&n| n != name);
                }
                Err(_) => {
                    log::warn!("Tasks did not stop in time: {:?}", pending);
                    return false;
                }
            }
        }
        true
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        if self.outcome.is_none() {
            self.stop();
        }
    }
}

/// Every playlist must exist on the backend before the core starts.
fn check_playlists<M: MusicBackend>(backend: &mut M) -> anyhow::Result<()> {
    for playlist in Playlist::ALL {
        match backend.track_count(playlist) {
            Ok(0) => return Err(ConfigError::MissingPlaylist(playlist).into()),
            Ok(n) => log::info!("Playlist {}: {} tracks", playlist.name(), n),
            Err(e) => log::warn!("Cannot verify playlist {}: {}", playlist.name(), e),
        }
    }
    Ok(())
}

/// FreeRTOS stacks are sized for the target; host threads need more headroom.
fn task_stack(bytes: usize) -> usize {
    if cfg!(target_os = "espidf") {
        bytes
    } else {
        bytes.max(256 * 1024)
    }
}
