// StrideBeat — Peripheral Drivers
//
// The frame buffer and the DFPlayer frame codec are target independent; the
// bus-facing halves only build for ESP-IDF.

pub mod dfplayer;
pub mod display;

#[cfg(target_os = "espidf")]
pub mod buttons;
#[cfg(target_os = "espidf")]
pub mod imu;

/// Thread-safe handle to the I2C bus shared by the IMU and the OLED.
#[cfg(target_os = "espidf")]
pub type SharedBus = &'static std::sync::Mutex<esp_idf_hal::i2c::I2cDriver<'static>>;
