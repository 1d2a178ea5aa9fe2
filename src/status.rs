// StrideBeat — Status Projector
//
// Builds a fresh `StatusSnapshot` every display tick from the arbiter's
// decision and the director's now-playing title, and renders it onto any
// monochrome embedded-graphics target.  Long text scrolls one character per
// tick and wraps around; nothing here feeds back into the decision.

use embedded_graphics::mono_font::ascii::FONT_6X10;
use embedded_graphics::mono_font::{MonoTextStyle, MonoTextStyleBuilder};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Line, PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Baseline, Text};

use crate::arbiter::PlaybackDecision;
use crate::config::*;
use crate::events::{ActivityLabel, Playlist};

const UNKNOWN_TITLE: &str = "Unknown";

/// Everything the display needs for one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub activity: ActivityLabel,
    pub playlist: Playlist,
    pub paused: bool,
    pub locked: bool,
    /// Backend has not confirmed the decision.
    pub stale: bool,
    pub title: String,
    /// Absolute backend volume, `None` until the backend has reported one.
    pub volume: Option<u8>,
    pub scroll_offset: usize,
    pub visible_title: String,
    pub visible_activity: String,
}

/// Anything that can show a snapshot.  No feedback to the core.
pub trait StatusDisplay {
    fn render(&mut self, snapshot: &StatusSnapshot) -> anyhow::Result<()>;

    /// Blank the screen on shutdown.
    fn clear(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Horizontal scroller
// ---------------------------------------------------------------------------
#[derive(Debug, Clone)]
pub struct Scroller {
    width: usize,
    text: String,
    offset: usize,
    delay_counter: u32,
}

impl Scroller {
    pub fn new(width: usize) -> Self {
        Self {
            width,
            text: String::new(),
            offset: 0,
            delay_counter: 0,
        }
    }

    /// Advance one tick for `text`.  Returns the visible window and the offset
    /// it starts at.
    pub fn tick(&mut self, text: &str) -> (String, usize) {
        if text != self.text {
            self.text = text.to_owned();
            self.offset = 0;
            self.delay_counter = 0;
        }

        let chars: Vec<char> = text.chars().collect();
        if chars.len() <= self.width {
            return (text.to_owned(), 0);
        }

        // Hold the start of the text for a few ticks before each cycle.
        if self.delay_counter < SCROLL_START_DELAY_TICKS {
            self.delay_counter += 1;
            return (chars[..self.width].iter().collect(), 0);
        }

        let looped: Vec<char> = chars.into_iter().chain(SCROLL_GAP.chars()).collect();
        let offset = self.offset;
        let visible = looped
            .iter()
            .cycle()
            .skip(offset)
            .take(self.width)
            .collect();

        self.offset += 1;
        if self.offset >= looped.len() {
            self.offset = 0;
            self.delay_counter = 0;
        }
        (visible, offset)
    }
}

// ---------------------------------------------------------------------------
// Projector
// ---------------------------------------------------------------------------
pub struct StatusProjector {
    title: Scroller,
    activity: Scroller,
}

impl StatusProjector {
    pub fn new(title_chars: usize) -> Self {
        Self {
            title: Scroller::new(title_chars),
            activity: Scroller::new(ACTIVITY_VISIBLE_CHARS),
        }
    }

    pub fn project(
        &mut self,
        decision: PlaybackDecision,
        activity: ActivityLabel,
        title: Option<String>,
        volume: Option<u8>,
    ) -> StatusSnapshot {
        let title = title
            .map(|t| strip_path(&t).to_owned())
            .unwrap_or_else(|| UNKNOWN_TITLE.to_owned());
        let (visible_title, scroll_offset) = self.title.tick(&title);
        let (visible_activity, _) = self.activity.tick(activity.display_name());

        StatusSnapshot {
            activity,
            playlist: decision.playlist,
            paused: decision.paused,
            locked: decision.locked,
            stale: !decision.confirmed,
            title,
            volume,
            scroll_offset,
            visible_title,
            visible_activity,
        }
    }
}

/// Keep only the file name of a path-like title.
fn strip_path(title: &str) -> &str {
    title.rsplit('/').next().unwrap_or(title)
}

// ---------------------------------------------------------------------------
// Renderer (128×64 layout)
// ---------------------------------------------------------------------------
const VOLUME_BAR_ORIGIN: Point = Point::new(5, 60);
const VOLUME_BAR_SIZE: Size = Size::new(119, 4);

/// Filled width of the volume bar for `volume` out of `VOLUME_MAX`.
pub fn volume_bar_width(volume: u8) -> u32 {
    VOLUME_BAR_SIZE.width * volume.min(VOLUME_MAX) as u32 / VOLUME_MAX as u32
}
fn text_style() -> MonoTextStyle<'static, BinaryColor> {
    MonoTextStyleBuilder::new()
        .font(&FONT_6X10)
        .text_color(BinaryColor::On)
        .build()
}

pub fn draw_status<D>(target: &mut D, snapshot: &StatusSnapshot) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    let style = text_style();
    target.clear(BinaryColor::Off)?;

    Text::with_baseline("STRIDEBEAT", Point::new(0, 0), style, Baseline::Top).draw(target)?;
    if snapshot.stale {
        Text::with_baseline("?", Point::new(122, 0), style, Baseline::Top).draw(target)?;
    }
    Line::new(Point::new(0, 12), Point::new(SCREEN_WIDTH as i32 - 1, 12))
        .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
        .draw(target)?;

    let act = format!("Act: {}", snapshot.visible_activity);
    Text::with_baseline(&act, Point::new(0, 16), style, Baseline::Top).draw(target)?;

    let song = format!("Song: {}", snapshot.visible_title);
    Text::with_baseline(&song, Point::new(0, 28), style, Baseline::Top).draw(target)?;

    let status = if snapshot.paused { "|| Paused" } else { "> Playing" };
    Text::with_baseline(status, Point::new(0, 40), style, Baseline::Top).draw(target)?;
    if snapshot.locked {
        Text::with_baseline("LOCK", Point::new(90, 40), style, Baseline::Top).draw(target)?;
    }

    let list = format!("List: {}", snapshot.playlist.name());
    Text::with_baseline(&list, Point::new(0, 50), style, Baseline::Top).draw(target)?;

    if let Some(volume) = snapshot.volume {
        Rectangle::new(VOLUME_BAR_ORIGIN, VOLUME_BAR_SIZE)
            .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
            .draw(target)?;
        let filled = Size::new(volume_bar_width(volume), VOLUME_BAR_SIZE.height);
        Rectangle::new(VOLUME_BAR_ORIGIN, filled)
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
            .draw(target)?;
    }
    Ok(())
}
