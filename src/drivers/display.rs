// StrideBeat — SSD1306 OLED Driver
//
// Register-level SSD1306 (128×64) driver over the shared I2C bus.  Drawing
// goes into an in-memory page-ordered frame buffer; `flush` pushes it to the
// panel one page at a time so the bus is released between pages and the
// sensor task never waits on a whole frame.
// Hand-rolled rather than the `ssd1306` crate, whose driver owns its I2C
// interface and cannot take the mutex-shared bus the IMU also uses.

use core::convert::Infallible;

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;

use crate::config::*;

// ---------------------------------------------------------------------------
// Frame buffer (SSD1306 page layout: byte = 8 vertical pixels)
// ---------------------------------------------------------------------------
pub struct FrameBuffer {
    buf: [u8; DISPLAY_BUFFER_SIZE],
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self {
            buf: [0; DISPLAY_BUFFER_SIZE],
        }
    }

    pub fn pixel(&self, p: Point) -> bool {
        match Self::index(p) {
            Some((i, bit)) => self.buf[i] & bit != 0,
            None => false,
        }
    }

    /// One 128-byte page (rows `8*page .. 8*page+7`).
    pub fn page(&self, page: usize) -> &[u8] {
        let w = SCREEN_WIDTH as usize;
        &self.buf[page * w..(page + 1) * w]
    }

    fn index(p: Point) -> Option<(usize, u8)> {
        if p.x < 0 || p.y < 0 || p.x >= SCREEN_WIDTH as i32 || p.y >= SCREEN_HEIGHT as i32 {
            return None;
        }
        let (x, y) = (p.x as usize, p.y as usize);
        Some(((y / 8) * SCREEN_WIDTH as usize + x, 1 << (y % 8)))
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl OriginDimensions for FrameBuffer {
    fn size(&self) -> Size {
        Size::new(SCREEN_WIDTH, SCREEN_HEIGHT)
    }
}

impl DrawTarget for FrameBuffer {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if let Some((i, bit)) = Self::index(point) {
                match color {
                    BinaryColor::On => self.buf[i] |= bit,
                    BinaryColor::Off => self.buf[i] &= !bit,
                }
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.buf.fill(if color.is_on() { 0xFF } else { 0x00 });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Panel (ESP-IDF only)
// ---------------------------------------------------------------------------
#[cfg(target_os = "espidf")]
pub use panel::OledDisplay;

#[cfg(target_os = "espidf")]
mod panel {
    use super::*;
    use crate::drivers::SharedBus;
    use crate::status::{draw_status, StatusDisplay, StatusSnapshot};

    const CTRL_CMD: u8 = 0x00;
    const CTRL_DATA: u8 = 0x40;

    // Charge pump on, horizontal addressing, segment/COM remap for a
    // right-way-up 128×64 module.
    const INIT_SEQUENCE: &[u8] = &[
        0xAE, // display off
        0xD5, 0x80, // clock divide
        0xA8, 0x3F, // multiplex 64
        0xD3, 0x00, // display offset
        0x40, // start line 0
        0x8D, 0x14, // charge pump
        0x20, 0x00, // horizontal addressing
        0xA1, // segment remap
        0xC8, // COM scan descending
        0xDA, 0x12, // COM pins
        0x81, 0xCF, // contrast
        0xD9, 0xF1, // pre-charge
        0xDB, 0x40, // VCOMH
        0xA4, // resume from RAM
        0xA6, // normal (not inverted)
        0xAF, // display on
    ];

    pub struct OledDisplay {
        bus: SharedBus,
        frame: FrameBuffer,
    }

    impl OledDisplay {
        pub fn new(bus: SharedBus) -> Self {
            Self {
                bus,
                frame: FrameBuffer::new(),
            }
        }

        fn command(&self, bytes: &[u8]) -> anyhow::Result<()> {
            let mut bus = self.bus.lock().map_err(|_| anyhow::anyhow!("I2C bus poisoned"))?;
            for &b in bytes {
                bus.write(I2C_ADDR_OLED, &[CTRL_CMD, b], I2C_TIMEOUT_TICKS)?;
            }
            Ok(())
        }

        /// Verify the panel acknowledges on the I2C bus.
        pub fn is_connected(&self) -> bool {
            self.command(&[0xE3]).is_ok() // NOP
        }

        pub fn init(&mut self) -> anyhow::Result<()> {
            self.command(INIT_SEQUENCE)?;
            self.frame = FrameBuffer::new();
            self.flush()?;
            log::info!("SSD1306 initialised (128x64)");
            Ok(())
        }

        /// Push the frame buffer to the panel, one page per bus transaction.
        pub fn flush(&mut self) -> anyhow::Result<()> {
            self.command(&[0x21, 0, (SCREEN_WIDTH - 1) as u8, 0x22, 0, 7])?;
            let mut packet = [0u8; SCREEN_WIDTH as usize + 1];
            packet[0] = CTRL_DATA;
            for page in 0..(SCREEN_HEIGHT as usize / 8) {
                packet[1..].copy_from_slice(self.frame.page(page));
                let mut bus = self.bus.lock().map_err(|_| anyhow::anyhow!("I2C bus poisoned"))?;
                bus.write(I2C_ADDR_OLED, &packet, I2C_TIMEOUT_TICKS)?;
            }
            Ok(())
        }

        /// Splash shown while the tasks start.
        pub fn show_centered_text(&mut self, text: &str) -> anyhow::Result<()> {
            use embedded_graphics::mono_font::{ascii::FONT_6X10, MonoTextStyle};
            use embedded_graphics::text::{Alignment, Text};

            let _ = self.frame.clear(BinaryColor::Off);
            let style = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);
            let centre = Point::new(SCREEN_WIDTH as i32 / 2, SCREEN_HEIGHT as i32 / 2);
            let _ = Text::with_alignment(text, centre, style, Alignment::Center).draw(&mut self.frame);
            self.flush()
        }
    }

    impl StatusDisplay for OledDisplay {
        fn render(&mut self, snapshot: &StatusSnapshot) -> anyhow::Result<()> {
            let _ = draw_status(&mut self.frame, snapshot);
            self.flush()
        }

        fn clear(&mut self) -> anyhow::Result<()> {
            let _ = self.frame.clear(BinaryColor::Off);
            self.flush()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};

    #[test]
    fn pixels_map_to_page_bits() {
        let mut fb = FrameBuffer::new();
        Pixel(Point::new(3, 9), BinaryColor::On).draw(&mut fb).unwrap();
        assert!(fb.pixel(Point::new(3, 9)));
        assert_eq!(fb.page(1)[3], 0b0000_0010);
        assert_eq!(fb.page(0)[3], 0);
    }

    #[test]
    fn out_of_bounds_pixels_are_dropped() {
        let mut fb = FrameBuffer::new();
        Rectangle::new(Point::new(120, 60), Size::new(20, 20))
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
            .draw(&mut fb)
            .unwrap();
        assert!(fb.pixel(Point::new(127, 63)));
        assert!(!fb.pixel(Point::new(128, 63)));
    }

    #[test]
    fn clear_sets_every_byte() {
        let mut fb = FrameBuffer::new();
        fb.clear(BinaryColor::On).unwrap();
        assert!((0..8).all(|p| fb.page(p).iter().all(|&b| b == 0xFF)));
    }
}
