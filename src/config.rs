// StrideBeat — Hardware & System Configuration
// Target: Seeed Studio Xiao ESP32-C3 (RISC-V)

use std::time::Duration;

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// GPIO Pin Definitions (Xiao ESP32-C3 pinout)
// ---------------------------------------------------------------------------
pub const PIN_BTN_PLAY: i32 = 2;     // D0 — Play/Pause (INPUT_PULLUP, active LOW)
pub const PIN_BTN_LOCK: i32 = 3;     // D1 — State lock
pub const PIN_BTN_VOL_UP: i32 = 4;   // D2 — Volume up
pub const PIN_BTN_VOL_DOWN: i32 = 5; // D3 — Volume down
pub const PIN_I2C_SDA: i32 = 6;      // D4 — I2C data line
pub const PIN_I2C_SCL: i32 = 7;      // D5 — I2C clock line
pub const PIN_UART_TX: i32 = 21;     // D6 — DFPlayer RX
pub const PIN_UART_RX: i32 = 20;     // D7 — DFPlayer TX

// ---------------------------------------------------------------------------
// I2C Bus
// ---------------------------------------------------------------------------
pub const I2C_ADDR_MPU6050: u8 = 0x68;
pub const I2C_ADDR_OLED: u8 = 0x3C;
pub const I2C_TIMEOUT_TICKS: u32 = 10; // FreeRTOS ticks — a hung transfer must not stall the sensor loop

// ---------------------------------------------------------------------------
// UART (DFPlayer Mini)
// ---------------------------------------------------------------------------
pub const DFPLAYER_BAUD: u32 = 9600;
pub const DFPLAYER_REPLY_TIMEOUT_MS: u64 = 300; // module answers within ~30 ms
pub const UART_READ_TIMEOUT_TICKS: u32 = 5;

// ---------------------------------------------------------------------------
// Display (SSD1306 OLED)
// ---------------------------------------------------------------------------
pub const SCREEN_WIDTH: u32 = 128;
pub const SCREEN_HEIGHT: u32 = 64;
pub const DISPLAY_BUFFER_SIZE: usize = (SCREEN_WIDTH as usize * SCREEN_HEIGHT as usize) / 8; // 1024
pub const TITLE_VISIBLE_CHARS: usize = 15;   // "Song: " + 15 chars at 6 px
pub const ACTIVITY_VISIBLE_CHARS: usize = 16; // "Act: " + 16 chars at 6 px
pub const SCROLL_START_DELAY_TICKS: u32 = 3;
pub const SCROLL_GAP: &str = "   ";

// ---------------------------------------------------------------------------
// Task Stack Sizes (bytes)
// ---------------------------------------------------------------------------
pub const STACK_SENSOR: usize = 4096;
pub const STACK_BUTTONS: usize = 4096;
pub const STACK_DISPLAY: usize = 8192;
pub const STACK_DIRECTOR: usize = 6144;

// ---------------------------------------------------------------------------
// Timing (milliseconds)
// ---------------------------------------------------------------------------
pub const SENSOR_SAMPLE_INTERVAL_MS: u64 = 10;    // 100 Hz
pub const BUTTON_POLL_INTERVAL_MS: u64 = 10;      // 100 Hz input poll
pub const DISPLAY_REFRESH_INTERVAL_MS: u64 = 200; // 5 Hz (smooth scrolling)
pub const NOW_PLAYING_POLL_MS: u64 = 1000;
pub const DEBOUNCE_MS: u64 = 50;
pub const SENSOR_FAILURE_WARN_SAMPLES: u32 = 100; // ~1 s of consecutive bus errors
pub const SHUTDOWN_GRACE_MS: u64 = 1000;

// ---------------------------------------------------------------------------
// Activity Classifier
// ---------------------------------------------------------------------------
pub const WINDOW_SIZE: usize = 30;
pub const HYSTERESIS_SAMPLES: u32 = 70; // 0.7 s at 100 Hz

// Combined-variance thresholds (g²)
pub const THRESH_LIGHTWALK: f32 = 0.01;
pub const THRESH_BRISKWALK: f32 = 0.03;
pub const THRESH_RUNNING: f32 = 0.15;

// ---------------------------------------------------------------------------
// Playback
// ---------------------------------------------------------------------------
pub const VOLUME_STEP: i8 = 3;       // DFPlayer volume range 0–30
pub const VOLUME_DEFAULT: u8 = 20;
pub const VOLUME_MAX: u8 = 30;

// ---------------------------------------------------------------------------
// MPU6050 Sensor Scale Factors
// ---------------------------------------------------------------------------
pub const ACCEL_SCALE_2G: f32 = 16384.0; // LSB/g at ±2 g

// ---------------------------------------------------------------------------
// Runtime settings
// ---------------------------------------------------------------------------

/// Tunables handed to [`crate::runtime::Runtime::start`].  Defaults come from
/// the constants above; tests shrink the intervals.
#[derive(Debug, Clone)]
pub struct Settings {
    pub sample_interval: Duration,
    pub button_poll_interval: Duration,
    pub display_interval: Duration,
    pub now_playing_interval: Duration,
    pub debounce: Duration,
    pub shutdown_grace: Duration,
    pub hysteresis_samples: u32,
    pub sensor_failure_warn: u32,
    pub volume_step: i8,
    /// Whether volume buttons still act while playback is paused.
    pub volume_while_paused: bool,
    pub title_chars: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sample_interval: Duration::from_millis(SENSOR_SAMPLE_INTERVAL_MS),
            button_poll_interval: Duration::from_millis(BUTTON_POLL_INTERVAL_MS),
            display_interval: Duration::from_millis(DISPLAY_REFRESH_INTERVAL_MS),
            now_playing_interval: Duration::from_millis(NOW_PLAYING_POLL_MS),
            debounce: Duration::from_millis(DEBOUNCE_MS),
            shutdown_grace: Duration::from_millis(SHUTDOWN_GRACE_MS),
            hysteresis_samples: HYSTERESIS_SAMPLES,
            sensor_failure_warn: SENSOR_FAILURE_WARN_SAMPLES,
            volume_step: VOLUME_STEP,
            volume_while_paused: true,
            title_chars: TITLE_VISIBLE_CHARS,
        }
    }
}

impl Settings {
    /// Reject settings the periodic tasks cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let intervals = [
            ("sample_interval", self.sample_interval),
            ("button_poll_interval", self.button_poll_interval),
            ("display_interval", self.display_interval),
            ("now_playing_interval", self.now_playing_interval),
        ];
        for (name, interval) in intervals {
            if interval.is_zero() {
                return Err(ConfigError::Invalid(name, "interval must be non-zero"));
            }
        }
        if self.hysteresis_samples == 0 {
            return Err(ConfigError::Invalid("hysteresis_samples", "must be at least 1"));
        }
        if self.debounce >= Duration::from_secs(1) {
            return Err(ConfigError::Invalid("debounce", "must be shorter than one second"));
        }
        if self.volume_step <= 0 {
            return Err(ConfigError::Invalid("volume_step", "must be positive"));
        }
        if self.title_chars == 0 {
            return Err(ConfigError::Invalid("title_chars", "display width must be non-zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn zero_interval_is_rejected() {
        let settings = Settings {
            display_interval: Duration::ZERO,
            ..Settings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::Invalid("display_interval", _))
        ));
    }

    #[test]
    fn volume_step_must_be_positive() {
        for step in [0, -3, i8::MIN] {
            let settings = Settings {
                volume_step: step,
                ..Settings::default()
            };
            assert!(matches!(
                settings.validate(),
                Err(ConfigError::Invalid("volume_step", _))
            ));
        }
        let largest = Settings {
            volume_step: i8::MAX,
            ..Settings::default()
        };
        assert!(largest.validate().is_ok());
    }

    #[test]
    fn thresholds_are_strictly_increasing() {
        assert!(THRESH_LIGHTWALK < THRESH_BRISKWALK);
        assert!(THRESH_BRISKWALK < THRESH_RUNNING);
    }
}
