// StrideBeat — Input Arbiter
//
// Single owner of the playback decision.  Activity changes from the sensor
// task and button presses from the button task are applied one at a time
// under one mutex, and the resulting director command is queued before the
// lock is released, so commands reach the backend in decision order.  Queuing
// never blocks: the director runs on its own thread.

use std::sync::mpsc::Sender;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::config::Settings;
use crate::director::Command;
use crate::events::{ActivityLabel, ButtonEvent, ButtonKind, Playlist};

/// The one piece of shared mutable state.  Handed out by value only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackDecision {
    pub playlist: Playlist,
    pub locked: bool,
    pub paused: bool,
    /// False once the backend failed to apply a command; cleared by the next
    /// successful one.
    pub confirmed: bool,
}

impl Default for PlaybackDecision {
    fn default() -> Self {
        Self {
            playlist: Playlist::LowActivity,
            locked: false,
            paused: false,
            confirmed: true,
        }
    }
}

struct State {
    decision: PlaybackDecision,
    activity: ActivityLabel,
    commands: Sender<Command>,
}

impl State {
    /// Queue a command for the director.  A state-changing command issued
    /// while the backend is out of sync is widened to a full resync.
    fn issue(&mut self, command: Command) {
        let command = match command {
            Command::Switch { .. } | Command::Pause | Command::Resume if !self.decision.confirmed => {
                Command::Sync {
                    playlist: self.decision.playlist,
                    paused: self.decision.paused,
                }
            }
            other => other,
        };

        if self.commands.send(command).is_err() {
            log::warn!("Playback director has exited — dropping {:?}", command);
            self.decision.confirmed = false;
        }
    }
}

pub struct Arbiter {
    state: Mutex<State>,
    volume_step: i8,
    volume_while_paused: bool,
}

impl Arbiter {
    pub fn new(commands: Sender<Command>, settings: &Settings) -> Self {
        Self {
            state: Mutex::new(State {
                decision: PlaybackDecision::default(),
                activity: ActivityLabel::Still,
                commands,
            }),
            volume_step: settings.volume_step,
            volume_while_paused: settings.volume_while_paused,
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // Every update leaves the decision consistent before it can panic,
        // so a poisoned lock still guards valid state.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Bring the backend in line with the startup decision.
    pub fn start_playback(&self) {
        let mut state = self.lock();
        let command = Command::Sync {
            playlist: state.decision.playlist,
            paused: state.decision.paused,
        };
        log::info!("Starting playback: {}", state.decision.playlist.name());
        state.issue(command);
    }

    pub fn decision(&self) -> PlaybackDecision {
        self.lock().decision
    }

    /// Last confirmed activity reported by the classifier.
    pub fn activity(&self) -> ActivityLabel {
        self.lock().activity
    }

    /// Decision and activity read under one lock.
    pub fn snapshot(&self) -> (PlaybackDecision, ActivityLabel) {
        let state = self.lock();
        (state.decision, state.activity)
    }

    pub fn on_activity_changed(&self, activity: ActivityLabel) {
        let mut state = self.lock();
        state.activity = activity;

        if state.decision.locked {
            log::debug!("Activity {:?} ignored — playlist locked", activity);
            return;
        }

        let playlist = Playlist::for_activity(activity);
        if playlist == state.decision.playlist {
            return;
        }

        log::info!(
            "Activity: {} → playlist {}",
            activity.display_name(),
            playlist.name()
        );
        state.decision.playlist = playlist;
        let autoplay = !state.decision.paused;
        state.issue(Command::Switch { playlist, autoplay });
    }

    pub fn on_button(&self, event: ButtonEvent) {
        let mut state = self.lock();

        match event.kind {
            ButtonKind::Lock => {
                state.decision.locked = !state.decision.locked;
                log::info!(
                    "State {}",
                    if state.decision.locked { "LOCKED" } else { "UNLOCKED" }
                );
            }

            ButtonKind::PlayPause => {
                state.decision.paused = !state.decision.paused;
                let command = if state.decision.paused {
                    log::info!("Paused by user");
                    Command::Pause
                } else {
                    log::info!("Playing");
                    Command::Resume
                };
                state.issue(command);
            }

            ButtonKind::VolumeUp | ButtonKind::VolumeDown => {
                if state.decision.paused && !self.volume_while_paused {
                    log::debug!("{:?} ignored while paused", event.kind);
                    return;
                }
                let delta = if event.kind == ButtonKind::VolumeUp {
                    self.volume_step
                } else {
                    self.volume_step.saturating_neg()
                };
                state.issue(Command::Volume(delta));
            }
        }
    }

    /// Outcome of one director command.  Once the backend has lost the
    /// decision, only a successful `Switch` or `Sync` that carries the current
    /// playlist and play state can confirm it again; a volume nudge or a bare
    /// pause/resume leaves it unconfirmed.
    pub fn on_backend_report(&self, command: Command, ok: bool) {
        let mut state = self.lock();
        let decision = state.decision;
        let confirmed = ok
            && (decision.confirmed
                || match command {
                    Command::Switch { playlist, autoplay } => {
                        playlist == decision.playlist && autoplay != decision.paused
                    }
                    Command::Sync { playlist, paused } => {
                        playlist == decision.playlist && paused == decision.paused
                    }
                    _ => false,
                });

        if decision.confirmed != confirmed {
            if confirmed {
                log::info!("Music backend back in sync");
            } else {
                log::warn!("Music backend unreachable — decision unconfirmed");
            }
        }
        state.decision.confirmed = confirmed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::{self, Receiver};
    use std::time::Instant;

    fn arbiter() -> (Arbiter, Receiver<Command>) {
        arbiter_with(Settings::default())
    }

    fn arbiter_with(settings: Settings) -> (Arbiter, Receiver<Command>) {
        let (tx, rx) = mpsc::channel();
        (Arbiter::new(tx, &settings), rx)
    }

    fn press(arbiter: &Arbiter, kind: ButtonKind) {
        arbiter.on_button(ButtonEvent::new(kind, Instant::now()));
    }

    fn drain(rx: &Receiver<Command>) -> Vec<Command> {
        rx.try_iter().collect()
    }

    #[test]
    fn defaults() {
        let (arbiter, _rx) = arbiter();
        let d = arbiter.decision();
        assert_eq!(d.playlist, Playlist::LowActivity);
        assert!(!d.locked);
        assert!(!d.paused);
        assert!(d.confirmed);
    }

    #[test]
    fn activity_maps_to_playlist_and_switches() {
        let (arbiter, rx) = arbiter();
        arbiter.on_activity_changed(ActivityLabel::Running);
        assert_eq!(arbiter.decision().playlist, Playlist::Running);
        assert_eq!(
            drain(&rx),
            vec![Command::Switch { playlist: Playlist::Running, autoplay: true }]
        );

        // Same playlist again: no command.
        arbiter.on_activity_changed(ActivityLabel::Running);
        assert!(drain(&rx).is_empty());
    }

    #[test]
    fn lock_blocks_activity_switches() {
        let (arbiter, rx) = arbiter();
        arbiter.on_activity_changed(ActivityLabel::LightWalk);
        press(&arbiter, ButtonKind::Lock);
        drain(&rx);

        arbiter.on_activity_changed(ActivityLabel::Running);
        let d = arbiter.decision();
        assert_eq!(d.playlist, Playlist::Walking);
        assert!(d.locked);
        assert!(drain(&rx).is_empty());
        // Activity is still tracked for the display.
        assert_eq!(arbiter.activity(), ActivityLabel::Running);
    }

    #[test]
    fn unlock_is_not_retroactive() {
        let (arbiter, rx) = arbiter();
        press(&arbiter, ButtonKind::Lock);
        arbiter.on_activity_changed(ActivityLabel::BriskWalk);
        press(&arbiter, ButtonKind::Lock);

        // Unlocking alone does not switch.
        assert_eq!(arbiter.decision().playlist, Playlist::LowActivity);
        assert!(drain(&rx).is_empty());

        // The next qualifying event does.
        arbiter.on_activity_changed(ActivityLabel::Running);
        assert_eq!(arbiter.decision().playlist, Playlist::Running);
        assert_eq!(drain(&rx).len(), 1);
    }

    #[test]
    fn play_pause_only_touches_paused() {
        for locked in [false, true] {
            for activity in ActivityLabel::ALL {
                let (arbiter, rx) = arbiter();
                arbiter.on_activity_changed(activity);
                if locked {
                    press(&arbiter, ButtonKind::Lock);
                }
                drain(&rx);
                let before = arbiter.decision();

                press(&arbiter, ButtonKind::PlayPause);
                let after = arbiter.decision();
                assert_eq!(after.playlist, before.playlist);
                assert_eq!(after.locked, before.locked);
                assert!(after.paused);
                assert_eq!(drain(&rx), vec![Command::Pause]);

                press(&arbiter, ButtonKind::PlayPause);
                assert_eq!(arbiter.decision(), before);
                assert_eq!(drain(&rx), vec![Command::Resume]);
            }
        }
    }

    #[test]
    fn switch_while_paused_does_not_autoplay() {
        let (arbiter, rx) = arbiter();
        press(&arbiter, ButtonKind::PlayPause);
        drain(&rx);
        arbiter.on_activity_changed(ActivityLabel::BriskWalk);
        assert_eq!(
            drain(&rx),
            vec![Command::Switch { playlist: Playlist::FastWalk, autoplay: false }]
        );
        assert!(arbiter.decision().paused);
    }

    #[test]
    fn lock_and_activity_in_either_order() {
        // Lock first: the activity change is gated.
        let (a, _rx) = arbiter();
        press(&a, ButtonKind::Lock);
        a.on_activity_changed(ActivityLabel::Running);
        assert_eq!(a.decision().playlist, Playlist::LowActivity);
        assert!(a.decision().locked);

        // Activity first: the mapping applies, then the lock freezes it.
        let (b, _rx) = arbiter();
        b.on_activity_changed(ActivityLabel::Running);
        press(&b, ButtonKind::Lock);
        assert_eq!(b.decision().playlist, Playlist::Running);
        assert!(b.decision().locked);
    }

    #[test]
    fn volume_is_a_pass_through() {
        let (arbiter, rx) = arbiter();
        let before = arbiter.decision();
        press(&arbiter, ButtonKind::VolumeUp);
        press(&arbiter, ButtonKind::VolumeDown);
        assert_eq!(arbiter.decision(), before);
        let step = Settings::default().volume_step;
        assert_eq!(drain(&rx), vec![Command::Volume(step), Command::Volume(-step)]);
    }

    #[test]
    fn volume_while_paused_is_configurable() {
        let (arbiter, rx) = arbiter_with(Settings {
            volume_while_paused: false,
            ..Settings::default()
        });
        press(&arbiter, ButtonKind::PlayPause);
        drain(&rx);
        press(&arbiter, ButtonKind::VolumeUp);
        assert!(drain(&rx).is_empty());
    }

    #[test]
    fn backend_failure_keeps_decision_and_resyncs_next_change() {
        let (arbiter, rx) = arbiter();
        arbiter.on_activity_changed(ActivityLabel::LightWalk);
        drain(&rx);

        arbiter.on_backend_report(
            Command::Switch { playlist: Playlist::Walking, autoplay: true },
            false,
        );
        let d = arbiter.decision();
        assert_eq!(d.playlist, Playlist::Walking);
        assert!(!d.confirmed);

        arbiter.on_activity_changed(ActivityLabel::Running);
        assert_eq!(
            drain(&rx),
            vec![Command::Sync { playlist: Playlist::Running, paused: false }]
        );

        arbiter.on_backend_report(
            Command::Sync { playlist: Playlist::Running, paused: false },
            true,
        );
        assert!(arbiter.decision().confirmed);
    }

    #[test]
    fn volume_success_does_not_confirm_a_lost_switch() {
        let (arbiter, rx) = arbiter();
        arbiter.on_activity_changed(ActivityLabel::Running);
        let switch = drain(&rx)[0];
        arbiter.on_backend_report(switch, false);

        press(&arbiter, ButtonKind::VolumeUp);
        for command in drain(&rx) {
            arbiter.on_backend_report(command, true);
        }
        assert!(!arbiter.decision().confirmed);

        // The next state change still carries the whole decision.
        press(&arbiter, ButtonKind::PlayPause);
        let sync = Command::Sync { playlist: Playlist::Running, paused: true };
        assert_eq!(drain(&rx), vec![sync]);
        arbiter.on_backend_report(sync, true);
        assert!(arbiter.decision().confirmed);
    }

    #[test]
    fn outdated_sync_does_not_confirm() {
        let (arbiter, rx) = arbiter();
        arbiter.on_backend_report(Command::Pause, false);
        arbiter.on_activity_changed(ActivityLabel::LightWalk);
        arbiter.on_activity_changed(ActivityLabel::Running);
        let commands = drain(&rx);
        assert_eq!(commands.len(), 2);

        // The first resync carried a playlist the decision has moved past.
        arbiter.on_backend_report(commands[0], true);
        assert!(!arbiter.decision().confirmed);
        arbiter.on_backend_report(commands[1], true);
        assert!(arbiter.decision().confirmed);
    }

    #[test]
    fn extreme_volume_step_does_not_overflow() {
        let (arbiter, rx) = arbiter_with(Settings {
            volume_step: i8::MIN,
            ..Settings::default()
        });
        press(&arbiter, ButtonKind::VolumeDown);
        assert_eq!(drain(&rx), vec![Command::Volume(i8::MAX)]);
    }

    #[test]
    fn dropped_director_marks_unconfirmed() {
        let (arbiter, rx) = arbiter();
        drop(rx);
        arbiter.on_activity_changed(ActivityLabel::Running);
        let d = arbiter.decision();
        assert_eq!(d.playlist, Playlist::Running);
        assert!(!d.confirmed);
    }
}
