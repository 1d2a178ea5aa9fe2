// StrideBeat — Playback Director
//
// Worker that executes arbiter decisions against the external music backend.
// Runs on its own thread and drains a FIFO command queue, so a slow or absent
// backend never holds up the arbiter.  Every command's outcome is reported
// back to the arbiter; the now-playing title is refreshed after track-changing
// commands and once per poll interval while idle.

use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::arbiter::Arbiter;
use crate::error::BackendError;
use crate::events::Playlist;

/// The external music player.  Implementations bound every call in time and
/// report an unreachable player as an error rather than blocking.
pub trait MusicBackend {
    /// Load `playlist` as the play queue.
    fn switch_playlist(&mut self, playlist: Playlist) -> Result<(), BackendError>;
    fn play(&mut self) -> Result<(), BackendError>;
    fn pause(&mut self) -> Result<(), BackendError>;
    fn resume(&mut self) -> Result<(), BackendError>;
    /// Relative volume nudge.  Returns the resulting absolute volume
    /// (`0..=VOLUME_MAX`).
    fn set_volume(&mut self, delta: i8) -> Result<u8, BackendError>;
    fn now_playing(&mut self) -> Result<Option<String>, BackendError>;
    /// Number of tracks available for `playlist` (startup check).
    fn track_count(&mut self, playlist: Playlist) -> Result<u16, BackendError>;
    fn stop(&mut self) -> Result<(), BackendError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Switch { playlist: Playlist, autoplay: bool },
    Pause,
    Resume,
    Volume(i8),
    /// Re-apply the whole decision (after a backend failure or at startup).
    Sync { playlist: Playlist, paused: bool },
    Shutdown,
}

// ---------------------------------------------------------------------------
// Now-playing cell shared with the display task
// ---------------------------------------------------------------------------
#[derive(Debug, Default)]
struct Track {
    title: Option<String>,
    volume: Option<u8>,
}

/// What the backend last reported: current title and absolute volume.
#[derive(Debug, Clone, Default)]
pub struct NowPlaying(Arc<Mutex<Track>>);

impl NowPlaying {
    fn track(&self) -> MutexGuard<'_, Track> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current title, `None` until the backend has named one.
    pub fn get(&self) -> Option<String> {
        self.track().title.clone()
    }

    pub fn volume(&self) -> Option<u8> {
        self.track().volume
    }

    fn set(&self, title: String) {
        self.track().title = Some(title);
    }

    fn set_volume(&self, volume: u8) {
        self.track().volume = Some(volume);
    }
}

// ---------------------------------------------------------------------------
// Director
// ---------------------------------------------------------------------------
pub struct PlaybackDirector<B: MusicBackend> {
    backend: B,
    arbiter: Arc<Arbiter>,
    now_playing: NowPlaying,
    poll_interval: Duration,
    // Playlist the backend last confirmed loading; `None` when unknown.
    active: Option<Playlist>,
    playing: bool,
}

impl<B: MusicBackend> PlaybackDirector<B> {
    pub fn new(
        backend: B,
        arbiter: Arc<Arbiter>,
        now_playing: NowPlaying,
        poll_interval: Duration,
    ) -> Self {
        Self {
            backend,
            arbiter,
            now_playing,
            poll_interval,
            active: None,
            playing: false,
        }
    }

    /// Process commands until `Shutdown` or until every sender is gone.
    /// Returns the backend so the caller can inspect or reuse it.
    pub fn run(mut self, commands: Receiver<Command>) -> B {
        log::info!("Playback director started");

        loop {
            match commands.recv_timeout(self.poll_interval) {
                Ok(Command::Shutdown) => break,
                Ok(command) => {
                    let result = self.execute(command);
                    if let Err(e) = &result {
                        log::warn!("Backend command {:?} failed: {}", command, e);
                    }
                    self.arbiter.on_backend_report(command, result.is_ok());
                    if result.is_ok() && changes_track(command) {
                        self.refresh_title();
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    if self.playing {
                        self.refresh_title();
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    log::warn!("Command channel closed — exiting director");
                    break;
                }
            }
        }

        if let Err(e) = self.backend.stop() {
            log::warn!("Backend stop failed: {}", e);
        }
        log::info!("Playback director stopped");
        self.backend
    }

    fn execute(&mut self, command: Command) -> Result<(), BackendError> {
        match command {
            Command::Switch { playlist, autoplay } => {
                if self.active != Some(playlist) {
                    self.load(playlist)?;
                } else if autoplay == self.playing {
                    // Already on this playlist in the requested state.
                    return Ok(());
                }
                self.set_playing(autoplay)
            }

            Command::Pause => {
                self.backend.pause()?;
                self.playing = false;
                Ok(())
            }

            Command::Resume => {
                self.backend.resume()?;
                self.playing = true;
                Ok(())
            }

            Command::Volume(delta) => self.nudge_volume(delta),

            // Also re-applies the volume, which publishes it after a restart.
            Command::Sync { playlist, paused } => {
                self.active = None;
                self.load(playlist)?;
                self.set_playing(!paused)?;
                self.nudge_volume(0)
            }

            Command::Shutdown => Ok(()),
        }
    }

    fn load(&mut self, playlist: Playlist) -> Result<(), BackendError> {
        log::info!("Switching to playlist {}", playlist.name().to_uppercase());
        match self.backend.switch_playlist(playlist) {
            Ok(()) => {
                self.active = Some(playlist);
                Ok(())
            }
            Err(e) => {
                self.active = None;
                Err(e)
            }
        }
    }

    fn nudge_volume(&mut self, delta: i8) -> Result<(), BackendError> {
        let volume = self.backend.set_volume(delta)?;
        self.now_playing.set_volume(volume);
        Ok(())
    }

    fn set_playing(&mut self, play: bool) -> Result<(), BackendError> {
        if play {
            self.backend.play()?;
        } else {
            self.backend.pause()?;
        }
        self.playing = play;
        Ok(())
    }

    fn refresh_title(&mut self) {
        match self.backend.now_playing() {
            Ok(Some(title)) => {
                if self.now_playing.get().as_deref() != Some(title.as_str()) {
                    log::debug!("Now playing: {}", title);
                    self.now_playing.set(title);
                }
            }
            Ok(None) => {}
            Err(e) => log::debug!("Now-playing query failed: {}", e),
        }
    }
}

fn changes_track(command: Command) -> bool {
    matches!(
        command,
        Command::Switch { .. } | Command::Sync { .. } | Command::Resume
    )
}
