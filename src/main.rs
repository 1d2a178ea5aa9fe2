// StrideBeat — Firmware Entry Point
//
// Boot sequence:
//   1. Bring up the shared I2C bus and show a splash on the OLED.
//   2. Self-test the OLED and the MPU6050, configure the IMU.
//   3. Configure the four buttons and the DFPlayer UART.
//   4. Start the runtime (sensor, buttons, display and director tasks).
//
// The firmware never returns; the main thread parks once the tasks run.

#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    use std::sync::Mutex;
    use std::thread;
    use std::time::Duration;

    use esp_idf_hal::gpio::{AnyIOPin, IOPin};
    use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
    use esp_idf_hal::prelude::*;
    use esp_idf_hal::uart::{config::Config as UartConfig, UartDriver};

    use stridebeat::config::*;
    use stridebeat::drivers::buttons::GpioButtons;
    use stridebeat::drivers::dfplayer::DfPlayer;
    use stridebeat::drivers::display::OledDisplay;
    use stridebeat::drivers::imu::Mpu6050;
    use stridebeat::runtime::Runtime;

    // Link esp-idf-sys runtime patches and initialise logging.
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();
    log::info!("StrideBeat firmware starting…");

    let peripherals = Peripherals::take()?;

    // ---- I2C bus (shared between OLED and MPU6050) ------------------------
    let i2c_config = I2cConfig::new().baudrate(400u32.kHz().into());
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio6, // SDA
        peripherals.pins.gpio7, // SCL
        &i2c_config,
    )?;
    // SAFETY: The I2C peripheral is a singleton obtained from `Peripherals::take()`
    // and lives for the entire programme duration.
    let i2c_bus: &'static Mutex<I2cDriver<'static>> =
        Box::leak(Box::new(Mutex::new(unsafe { core::mem::transmute(i2c) })));

    // ---- Display + self-test ----------------------------------------------
    let mut display = OledDisplay::new(i2c_bus);
    if let Err(e) = display.init() {
        // Playback works without a screen.
        log::error!("OLED init failed: {}", e);
    }
    let _ = display.show_centered_text("StrideBeat");

    let imu = Mpu6050::new(i2c_bus);
    let oled_ok = display.is_connected();
    let imu_ok = imu.is_connected();
    if !imu_ok {
        log::error!("Boot check FAILED — OLED:{} IMU:{}", oled_ok, imu_ok);
        let _ = display.show_centered_text("IMU missing");
        anyhow::bail!("MPU6050 not found at 0x{:02X}", I2C_ADDR_MPU6050);
    }
    imu.init()?;

    // ---- Buttons (D1 lock, D0 play, D2/D3 volume) -------------------------
    let buttons = GpioButtons::new(
        peripherals.pins.gpio3.downgrade(),
        peripherals.pins.gpio2.downgrade(),
        peripherals.pins.gpio4.downgrade(),
        peripherals.pins.gpio5.downgrade(),
    )?;

    // ---- DFPlayer Mini on UART1 --------------------------------------------
    let uart_config = UartConfig::default().baudrate(Hertz(DFPLAYER_BAUD));
    let uart = UartDriver::new(
        peripherals.uart1,
        peripherals.pins.gpio21, // TX -> DFPlayer RX
        peripherals.pins.gpio20, // RX <- DFPlayer TX
        Option::<AnyIOPin>::None,
        Option::<AnyIOPin>::None,
        &uart_config,
    )?;
    // SAFETY: same argument as the I2C driver above.
    let uart: UartDriver<'static> = unsafe { core::mem::transmute(uart) };
    let player = DfPlayer::new(uart);

    let runtime = match Runtime::start(Settings::default(), imu, buttons, player, display) {
        Ok(runtime) => runtime,
        Err(e) => {
            log::error!("Startup failed: {:#}", e);
            return Err(e);
        }
    };
    log::info!("Boot complete — entering normal operation");

    // Main thread has nothing left to do — park it forever.
    while runtime.is_running() {
        thread::sleep(Duration::from_secs(60));
    }
    Ok(())
}

/// Host builds only carry the library; the firmware needs an ESP-IDF target.
#[cfg(not(target_os = "espidf"))]
fn main() {
    println!("stridebeat: build for riscv32imc-esp-espidf to get the firmware");
}
