// StrideBeat — MPU6050 IMU Driver
//
// Accelerometer-only register driver on the shared I2C bus.  Every
// transaction is bounded by `I2C_TIMEOUT_TICKS`; a timeout surfaces as
// `SensorError::Timeout` so the sensor task can skip the tick.

use esp_idf_sys::{EspError, ESP_ERR_TIMEOUT};

use crate::config::*;
use crate::drivers::SharedBus;
use crate::error::SensorError;
use crate::events::Accel;
use crate::tasks::sensor::SampleSource;

// MPU6050 register addresses
const REG_PWR_MGMT_1: u8 = 0x6B;
const REG_CONFIG: u8 = 0x1A;
const REG_ACCEL_CONFIG: u8 = 0x1C;
const REG_ACCEL_XOUT_H: u8 = 0x3B; // Start of 6-byte accel burst
const REG_WHO_AM_I: u8 = 0x75;
const WHO_AM_I_EXPECTED: u8 = 0x68;

pub struct Mpu6050 {
    bus: SharedBus,
}

impl Mpu6050 {
    pub fn new(bus: SharedBus) -> Self {
        Self { bus }
    }

    /// Verify the device is reachable on the I2C bus.
    pub fn is_connected(&self) -> bool {
        let Ok(mut bus) = self.bus.lock() else {
            return false;
        };
        let mut buf = [0u8; 1];
        match bus.write_read(I2C_ADDR_MPU6050, &[REG_WHO_AM_I], &mut buf, I2C_TIMEOUT_TICKS) {
            Ok(()) => buf[0] == WHO_AM_I_EXPECTED,
            Err(_) => false,
        }
    }

    /// Wake the sensor and configure accel (±2 g), DLPF 44 Hz.
    pub fn init(&self) -> anyhow::Result<()> {
        let mut bus = self.bus.lock().map_err(|_| anyhow::anyhow!("I2C bus poisoned"))?;

        // Wake up (clear SLEEP bit)
        bus.write(I2C_ADDR_MPU6050, &[REG_PWR_MGMT_1, 0x00], I2C_TIMEOUT_TICKS)?;

        // DLPF bandwidth 44 Hz (below Nyquist for 100 Hz sampling)
        bus.write(I2C_ADDR_MPU6050, &[REG_CONFIG, 0x03], I2C_TIMEOUT_TICKS)?;

        // Accelerometer: ±2 g
        bus.write(I2C_ADDR_MPU6050, &[REG_ACCEL_CONFIG, 0x00], I2C_TIMEOUT_TICKS)?;

        log::info!("MPU6050 initialised (±2g, DLPF 44Hz)");
        Ok(())
    }
}

fn bus_error(e: EspError) -> SensorError {
    if e.code() == ESP_ERR_TIMEOUT as i32 {
        SensorError::Timeout
    } else {
        SensorError::Bus(e.to_string())
    }
}

impl SampleSource for Mpu6050 {
    /// Burst-read the 3 accel axes and convert to g.
    fn read_sample(&mut self) -> Result<Accel, SensorError> {
        let mut bus = self
            .bus
            .lock()
            .map_err(|_| SensorError::Bus("I2C bus poisoned".into()))?;
        let mut raw = [0u8; 6];
        bus.write_read(I2C_ADDR_MPU6050, &[REG_ACCEL_XOUT_H], &mut raw, I2C_TIMEOUT_TICKS)
            .map_err(bus_error)?;

        Ok(Accel {
            ax: i16::from_be_bytes([raw[0], raw[1]]) as f32 / ACCEL_SCALE_2G,
            ay: i16::from_be_bytes([raw[2], raw[3]]) as f32 / ACCEL_SCALE_2G,
            az: i16::from_be_bytes([raw[4], raw[5]]) as f32 / ACCEL_SCALE_2G,
        })
    }
}
