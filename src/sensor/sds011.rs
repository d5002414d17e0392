//! Nova Fitness SDS011 driver over a serial TTY.

use super::ParticulateSensor;
use crate::error::SensorError;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::Path;

const HEAD: u8 = 0xAA;
const TAIL: u8 = 0xAB;
const COMMAND: u8 = 0xB4;
const REPLY_DATA: u8 = 0xC0;
const REPLY_COMMAND: u8 = 0xC5;

const CMD_REPORT_MODE: u8 = 0x02;
const CMD_QUERY_DATA: u8 = 0x04;
const CMD_WORK_STATE: u8 = 0x06;
const MODE_SET: u8 = 0x01;
const REPORT_QUERY: u8 = 0x01;
const STATE_SLEEP: u8 = 0x00;
const STATE_WORK: u8 = 0x01;

const COMMAND_LEN: usize = 19;
const REPLY_LEN: usize = 10;

// The sensor may be streaming active-mode data frames; give up after this many
// unrelated frames or this many bytes without a frame head.
const MAX_FRAMES_PER_REPLY: usize = 8;
const MAX_SKIPPED_BYTES: usize = 4 * REPLY_LEN;

// VTIME is in deciseconds.
const READ_TIMEOUT_DECISECONDS: u8 = 20;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Reply {
    Data { pm25: f64, pm10: f64 },
    Command { command: u8 },
}

/// Byte stream to the sensor that can drop input received but not yet read.
pub trait SerialPort: Read + Write {
    fn discard_input(&mut self) -> io::Result<()>;
}

impl SerialPort for File {
    fn discard_input(&mut self) -> io::Result<()> {
        // SAFETY: the descriptor is owned by `self` and open.
        if unsafe { libc::tcflush(self.as_raw_fd(), libc::TCIFLUSH) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

pub struct Sds011<P> {
    port: P,
    device: String,
}

impl Sds011<File> {
    /// Opens the TTY at `path`, configures it for 9600 8N1 raw I/O and puts
    /// the sensor in query reporting mode.
    pub fn open(path: &Path) -> Result<Self, SensorError> {
        let device = path.display().to_string();
        let io_err = |source| SensorError::Io {
            device: device.clone(),
            source,
        };
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY)
            .open(path)
            .map_err(io_err)?;
        configure_tty(&file).map_err(io_err)?;
        let mut sensor = Self::new(file, device);
        sensor.set_work_state(STATE_WORK)?;
        sensor.set_query_mode()?;
        Ok(sensor)
    }
}

impl<P: SerialPort> Sds011<P> {
    pub fn new(port: P, device: impl Into<String>) -> Self {
        Self {
            port,
            device: device.into(),
        }
    }

    /// Stops active-mode streaming; the sensor then only answers queries.
    pub fn set_query_mode(&mut self) -> Result<(), SensorError> {
        self.command_with_ack(CMD_REPORT_MODE, &[MODE_SET, REPORT_QUERY])
    }

    fn set_work_state(&mut self, state: u8) -> Result<(), SensorError> {
        self.command_with_ack(CMD_WORK_STATE, &[MODE_SET, state])
    }

    fn command_with_ack(&mut self, command: u8, args: &[u8]) -> Result<(), SensorError> {
        self.send(command, args)?;
        self.await_reply(|reply| matches!(reply, Reply::Command { command: acked } if *acked == command))?;
        Ok(())
    }

    fn send(&mut self, command: u8, args: &[u8]) -> Result<(), SensorError> {
        let frame = command_frame(command, args);
        // Anything already buffered predates this command and cannot be its reply.
        self.port
            .discard_input()
            .and_then(|_| self.port.write_all(&frame))
            .and_then(|_| self.port.flush())
            .map_err(|source| self.io_error(source))
    }

    fn await_reply(&mut self, wanted: impl Fn(&Reply) -> bool) -> Result<Reply, SensorError> {
        for _ in 0..MAX_FRAMES_PER_REPLY {
            let frame = self.read_frame()?;
            match self.decode(&frame)? {
                Some(reply) if wanted(&reply) => return Ok(reply),
                other => tracing::trace!(reply=?other, device=%self.device, "skipping unrelated frame"),
            }
        }
        Err(SensorError::Timeout {
            device: self.device.clone(),
        })
    }

    fn read_frame(&mut self) -> Result<[u8; REPLY_LEN], SensorError> {
        let mut byte = [0u8; 1];
        let mut skipped = 0;
        loop {
            self.fill(&mut byte)?;
            if byte[0] == HEAD {
                break;
            }
            skipped += 1;
            if skipped > MAX_SKIPPED_BYTES {
                return Err(SensorError::Timeout {
                    device: self.device.clone(),
                });
            }
        }
        let mut frame = [0u8; REPLY_LEN];
        frame[0] = HEAD;
        self.fill(&mut frame[1..])?;
        Ok(frame)
    }

    fn fill(&mut self, buf: &mut [u8]) -> Result<(), SensorError> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.port.read(&mut buf[filled..]) {
                Ok(0) => {
                    return Err(SensorError::Timeout {
                        device: self.device.clone(),
                    })
                }
                Ok(n) => filled += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(self.io_error(err)),
            }
        }
        Ok(())
    }

    fn decode(&self, frame: &[u8; REPLY_LEN]) -> Result<Option<Reply>, SensorError> {
        if frame[9] != TAIL {
            return Ok(None);
        }
        let data = &frame[2..8];
        let expected = checksum(data);
        if expected != frame[8] {
            return Err(SensorError::Checksum {
                device: self.device.clone(),
                expected,
                actual: frame[8],
            });
        }
        let reply = match frame[1] {
            REPLY_DATA => Reply::Data {
                pm25: f64::from(u16::from_le_bytes([data[0], data[1]])) / 10.0,
                pm10: f64::from(u16::from_le_bytes([data[2], data[3]])) / 10.0,
            },
            REPLY_COMMAND => Reply::Command { command: data[0] },
            _ => return Ok(None),
        };
        Ok(Some(reply))
    }

    fn io_error(&self, source: io::Error) -> SensorError {
        SensorError::Io {
            device: self.device.clone(),
            source,
        }
    }
}

impl<P: SerialPort + Send> ParticulateSensor for Sds011<P> {
    fn wake(&mut self) -> Result<(), SensorError> {
        self.set_work_state(STATE_WORK)
    }

    fn query(&mut self) -> Result<(f64, f64), SensorError> {
        self.send(CMD_QUERY_DATA, &[])?;
        match self.await_reply(|reply| matches!(reply, Reply::Data { .. }))? {
            Reply::Data { pm25, pm10 } => Ok((pm25, pm10)),
            Reply::Command { .. } => Err(SensorError::Timeout {
                device: self.device.clone(),
            }),
        }
    }

    fn sleep(&mut self) -> Result<(), SensorError> {
        self.set_work_state(STATE_SLEEP)
    }
}

fn command_frame(command: u8, args: &[u8]) -> [u8; COMMAND_LEN] {
    let mut frame = [0u8; COMMAND_LEN];
    frame[0] = HEAD;
    frame[1] = COMMAND;
    frame[2] = command;
    for (slot, arg) in frame[3..15].iter_mut().zip(args) {
        *slot = *arg;
    }
    // Broadcast device id.
    frame[15] = 0xFF;
    frame[16] = 0xFF;
    frame[17] = checksum(&frame[2..17]);
    frame[18] = TAIL;
    frame
}

fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, byte| acc.wrapping_add(*byte))
}

fn configure_tty(file: &File) -> io::Result<()> {
    let fd = file.as_raw_fd();
    // SAFETY: `fd` stays open for the lifetime of `file`, and `tty` is a
    // plain C struct fully initialized by tcgetattr before use.
    unsafe {
        let mut tty: libc::termios = std::mem::zeroed();
        if libc::tcgetattr(fd, &mut tty) != 0 {
            return Err(io::Error::last_os_error());
        }
        libc::cfmakeraw(&mut tty);
        if libc::cfsetispeed(&mut tty, libc::B9600) != 0
            || libc::cfsetospeed(&mut tty, libc::B9600) != 0
        {
            return Err(io::Error::last_os_error());
        }
        tty.c_cflag |= libc::CLOCAL | libc::CREAD;
        tty.c_cflag &= !(libc::CSTOPB | libc::CRTSCTS);
        tty.c_cc[libc::VMIN] = 0;
        tty.c_cc[libc::VTIME] = READ_TIMEOUT_DECISECONDS;
        if libc::tcsetattr(fd, libc::TCSANOW, &tty) != 0 {
            return Err(io::Error::last_os_error());
        }
        libc::tcflush(fd, libc::TCIOFLUSH);
    }
    Ok(())
}
