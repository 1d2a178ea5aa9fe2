// StrideBeat — DFPlayer Mini MP3 Module Driver
//
// Serial protocol (9600 8N1), fixed 10-byte frames:
//
//   7E FF 06 CMD FB PH PL CH CL EF
//
// FB = 1 asks the module to acknowledge (0x41) or reject (0x40) the command.
// The checksum is the two's complement of the sum of bytes FF..PL.
// Playlists live in SD-card folders 01..04.

use crate::error::BackendError;

pub const FRAME_LEN: usize = 10;
const START: u8 = 0x7E;
const VERSION: u8 = 0xFF;
const LENGTH: u8 = 0x06;
const END: u8 = 0xEF;

// Commands
pub const CMD_PLAY: u8 = 0x0D;
pub const CMD_PAUSE: u8 = 0x0E;
pub const CMD_SET_VOLUME: u8 = 0x06;
pub const CMD_STOP: u8 = 0x16;
pub const CMD_LOOP_FOLDER: u8 = 0x17;
pub const CMD_QUERY_TRACK: u8 = 0x4C; // current track on the TF card
pub const CMD_QUERY_FOLDER_COUNT: u8 = 0x4E;

// Replies
pub const REPLY_ERROR: u8 = 0x40;
pub const REPLY_ACK: u8 = 0x41;

fn checksum(body: &[u8]) -> u16 {
    body.iter()
        .fold(0u16, |acc, &b| acc.wrapping_add(b as u16))
        .wrapping_neg()
}

pub fn encode(cmd: u8, param: u16, feedback: bool) -> [u8; FRAME_LEN] {
    let [ph, pl] = param.to_be_bytes();
    let body = [VERSION, LENGTH, cmd, feedback as u8, ph, pl];
    let [ch, cl] = checksum(&body).to_be_bytes();
    [START, VERSION, LENGTH, cmd, feedback as u8, ph, pl, ch, cl, END]
}

/// A decoded frame from the module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reply {
    pub cmd: u8,
    pub param: u16,
}

pub fn decode(frame: &[u8; FRAME_LEN]) -> Result<Reply, BackendError> {
    if frame[0] != START || frame[9] != END || frame[2] != LENGTH {
        return Err(BackendError::Protocol);
    }
    let expected = u16::from_be_bytes([frame[7], frame[8]]);
    if checksum(&frame[1..7]) != expected {
        return Err(BackendError::Protocol);
    }
    Ok(Reply {
        cmd: frame[3],
        param: u16::from_be_bytes([frame[5], frame[6]]),
    })
}

/// Reassembles frames from a byte stream, resynchronising on the start byte.
/// A buffered frame with a bad header or end byte is dropped up to the next
/// start byte inside it, so a stray `0x7E` costs at most one frame.
#[derive(Debug, Default)]
pub struct FrameReader {
    buf: [u8; FRAME_LEN],
    len: usize,
}

impl FrameReader {
    pub fn push(&mut self, byte: u8) -> Option<[u8; FRAME_LEN]> {
        if self.len == 0 && byte != START {
            return None;
        }
        self.buf[self.len] = byte;
        self.len += 1;
        if self.len < FRAME_LEN {
            return None;
        }

        let frame = self.buf;
        if frame[1] == VERSION && frame[2] == LENGTH && frame[9] == END {
            self.len = 0;
            return Some(frame);
        }
        match frame[1..].iter().position(|&b| b == START) {
            Some(i) => {
                let from = i + 1;
                self.buf.copy_within(from.., 0);
                self.len = FRAME_LEN - from;
            }
            None => self.len = 0,
        }
        None
    }
}

/// Absolute volume after a relative nudge, clamped to the module's range.
pub fn nudge_volume(current: u8, delta: i8, max: u8) -> u8 {
    (current as i16 + delta as i16).clamp(0, max as i16) as u8
}

// ---------------------------------------------------------------------------
// UART backend (ESP-IDF only)
// ---------------------------------------------------------------------------
#[cfg(target_os = "espidf")]
pub use uart::DfPlayer;

#[cfg(target_os = "espidf")]
mod uart {
    use std::time::{Duration, Instant};

    use esp_idf_hal::uart::UartDriver;

    use super::*;
    use crate::config::*;
    use crate::director::MusicBackend;
    use crate::events::Playlist;

    pub struct DfPlayer {
        uart: UartDriver<'static>,
        reader: FrameReader,
        volume: u8,
        playlist: Option<Playlist>,
    }

    impl DfPlayer {
        pub fn new(uart: UartDriver<'static>) -> Self {
            Self {
                uart,
                reader: FrameReader::default(),
                volume: VOLUME_DEFAULT,
                playlist: None,
            }
        }

        /// Wait for the first frame matching `wanted`, skipping unsolicited
        /// status frames (track finished, card inserted, ...).
        fn await_reply(&mut self, wanted: impl Fn(&Reply) -> bool) -> Result<Reply, BackendError> {
            let deadline = Instant::now() + Duration::from_millis(DFPLAYER_REPLY_TIMEOUT_MS);
            let mut byte = [0u8; 1];

            while Instant::now() < deadline {
                let n = self
                    .uart
                    .read(&mut byte, UART_READ_TIMEOUT_TICKS)
                    .map_err(|_| BackendError::Unreachable)?;
                if n == 0 {
                    continue;
                }
                if let Some(frame) = self.reader.push(byte[0]) {
                    match decode(&frame) {
                        Ok(reply) if wanted(&reply) => return Ok(reply),
                        Ok(_) => {}
                        Err(e) => log::debug!("DFPlayer: dropping frame {:02X?}: {}", frame, e),
                    }
                }
            }
            Err(BackendError::Unreachable)
        }

        fn send(&mut self, cmd: u8, param: u16, feedback: bool) -> Result<(), BackendError> {
            if let Err(e) = self.uart.clear_rx() {
                log::debug!("DFPlayer: clearing RX failed: {}", e);
            }
            self.reader = FrameReader::default();
            self.uart
                .write(&encode(cmd, param, feedback))
                .map_err(|_| BackendError::Unreachable)?;
            Ok(())
        }

        /// Send a command and require the module's acknowledgement.
        fn command(&mut self, cmd: u8, param: u16) -> Result<(), BackendError> {
            self.send(cmd, param, true)?;
            let reply = self.await_reply(|r| r.cmd == REPLY_ACK || r.cmd == REPLY_ERROR)?;
            if reply.cmd == REPLY_ERROR {
                return Err(BackendError::Rejected(reply.param));
            }
            Ok(())
        }

        fn query(&mut self, cmd: u8, param: u16) -> Result<u16, BackendError> {
            self.send(cmd, param, false)?;
            let reply = self.await_reply(|r| r.cmd == cmd || r.cmd == REPLY_ERROR)?;
            if reply.cmd == REPLY_ERROR {
                return Err(BackendError::Rejected(reply.param));
            }
            Ok(reply.param)
        }
    }

    impl MusicBackend for DfPlayer {
        fn switch_playlist(&mut self, playlist: Playlist) -> Result<(), BackendError> {
            self.command(CMD_LOOP_FOLDER, playlist.folder() as u16)?;
            self.playlist = Some(playlist);
            Ok(())
        }

        fn play(&mut self) -> Result<(), BackendError> {
            self.command(CMD_PLAY, 0)
        }

        fn pause(&mut self) -> Result<(), BackendError> {
            self.command(CMD_PAUSE, 0)
        }

        fn resume(&mut self) -> Result<(), BackendError> {
            self.command(CMD_PLAY, 0)
        }

        fn set_volume(&mut self, delta: i8) -> Result<u8, BackendError> {
            let volume = nudge_volume(self.volume, delta, VOLUME_MAX);
            self.command(CMD_SET_VOLUME, volume as u16)?;
            self.volume = volume;
            log::info!("Volume {}/{}", volume, VOLUME_MAX);
            Ok(volume)
        }

        fn now_playing(&mut self) -> Result<Option<String>, BackendError> {
            let track = self.query(CMD_QUERY_TRACK, 0)?;
            Ok(self
                .playlist
                .map(|p| format!("{} - Track {:03}", p.name(), track)))
        }

        fn track_count(&mut self, playlist: Playlist) -> Result<u16, BackendError> {
            self.query(CMD_QUERY_FOLDER_COUNT, playlist.folder() as u16)
        }

        fn stop(&mut self) -> Result<(), BackendError> {
            self.command(CMD_STOP, 0)
        }
    }
}
