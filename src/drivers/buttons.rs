// StrideBeat — GPIO Button Inputs
//
// Four tactile switches to ground, internal pull-ups, read as raw levels.
// Debouncing happens in `input::ButtonHandler`.

use esp_idf_hal::gpio::{AnyIOPin, Input, PinDriver, Pull};

use crate::events::ButtonKind;
use crate::input::ButtonInputs;

pub struct GpioButtons {
    lock: PinDriver<'static, AnyIOPin, Input>,
    play: PinDriver<'static, AnyIOPin, Input>,
    vol_up: PinDriver<'static, AnyIOPin, Input>,
    vol_down: PinDriver<'static, AnyIOPin, Input>,
}

fn pull_up(pin: AnyIOPin) -> anyhow::Result<PinDriver<'static, AnyIOPin, Input>> {
    let mut driver = PinDriver::input(pin)?;
    driver.set_pull(Pull::Up)?;
    Ok(driver)
}

impl GpioButtons {
    pub fn new(lock: AnyIOPin, play: AnyIOPin, vol_up: AnyIOPin, vol_down: AnyIOPin) -> anyhow::Result<Self> {
        Ok(Self {
            lock: pull_up(lock)?,
            play: pull_up(play)?,
            vol_up: pull_up(vol_up)?,
            vol_down: pull_up(vol_down)?,
        })
    }
}

impl ButtonInputs for GpioButtons {
    fn is_low(&mut self, kind: ButtonKind) -> bool {
        match kind {
            ButtonKind::Lock       => self.lock.is_low(),
            ButtonKind::PlayPause  => self.play.is_low(),
            ButtonKind::VolumeUp   => self.vol_up.is_low(),
            ButtonKind::VolumeDown => self.vol_down.is_low(),
        }
    }
}
