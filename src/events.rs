// StrideBeat — System Events & Data Types

use std::time::Instant;

// ---------------------------------------------------------------------------
// Sensor Data (3-axis accelerometer reading, in g)
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Accel {
    pub ax: f32,
    pub ay: f32,
    pub az: f32,
}

/// One timestamped accelerometer reading.  Immutable once captured.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub timestamp: Instant,
    pub accel: Accel,
}

impl Sample {
    pub fn new(timestamp: Instant, ax: f32, ay: f32, az: f32) -> Self {
        Self {
            timestamp,
            accel: Accel { ax, ay, az },
        }
    }
}

// ---------------------------------------------------------------------------
// Activity Classification
// ---------------------------------------------------------------------------

/// Ordered by intensity: `Still < LightWalk < BriskWalk < Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ActivityLabel {
    #[default]
    Still,
    LightWalk,
    BriskWalk,
    Running,
}

impl ActivityLabel {
    pub const ALL: [ActivityLabel; 4] = [
        Self::Still,
        Self::LightWalk,
        Self::BriskWalk,
        Self::Running,
    ];

    /// Human-readable label shown on the display.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Still     => "Staying still",
            Self::LightWalk => "Light walking",
            Self::BriskWalk => "Brisk walking",
            Self::Running   => "Running/Intense",
        }
    }
}

// ---------------------------------------------------------------------------
// Playlists
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Playlist {
    #[default]
    LowActivity,
    Walking,
    FastWalk,
    Running,
}

impl Playlist {
    pub const ALL: [Playlist; 4] = [
        Self::LowActivity,
        Self::Walking,
        Self::FastWalk,
        Self::Running,
    ];

    /// Fixed activity → playlist mapping.
    pub fn for_activity(activity: ActivityLabel) -> Self {
        match activity {
            ActivityLabel::Still     => Self::LowActivity,
            ActivityLabel::LightWalk => Self::Walking,
            ActivityLabel::BriskWalk => Self::FastWalk,
            ActivityLabel::Running   => Self::Running,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::LowActivity => "lowactivity",
            Self::Walking     => "walking",
            Self::FastWalk    => "fastwalk",
            Self::Running     => "running",
        }
    }

    /// SD-card folder number (`01`..`04`) holding the playlist's tracks.
    pub fn folder(&self) -> u8 {
        match self {
            Self::LowActivity => 1,
            Self::Walking     => 2,
            Self::FastWalk    => 3,
            Self::Running     => 4,
        }
    }
}

// ---------------------------------------------------------------------------
// Button Events — produced by the button task, consumed by the arbiter
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonKind {
    Lock,
    PlayPause,
    VolumeUp,
    VolumeDown,
}

impl ButtonKind {
    pub const ALL: [ButtonKind; 4] = [
        Self::Lock,
        Self::PlayPause,
        Self::VolumeUp,
        Self::VolumeDown,
    ];

    pub fn index(&self) -> usize {
        match self {
            Self::Lock       => 0,
            Self::PlayPause  => 1,
            Self::VolumeUp   => 2,
            Self::VolumeDown => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    pub kind: ButtonKind,
    pub timestamp: Instant,
}

impl ButtonEvent {
    pub fn new(kind: ButtonKind, timestamp: Instant) -> Self {
        Self { kind, timestamp }
    }
}
