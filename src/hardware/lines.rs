//! Raw digital lines read through the sysfs GPIO interface
//!
//! No filtering happens here. A read is a read; the decoder owns timing.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::HardwareConfig;

/// One reading of both input lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawSample {
    /// Raw hook switch level
    pub hook: bool,
    /// Raw rotary pulse contact level
    pub dial: bool,
}

/// Source of raw line samples, polled by the sampler thread
pub trait SignalLines: Send {
    fn sample(&mut self) -> Result<RawSample, LineError>;
}

/// Errors from the GPIO layer
#[derive(Debug, thiserror::Error)]
pub enum LineError {
    #[error("failed to export gpio {pin}: {source}")]
    Export {
        pin: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read gpio {pin}: {source}")]
    Read {
        pin: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write gpio {pin}: {source}")]
    Write {
        pin: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("gpio {pin} returned unexpected value {value:#04x}")]
    Unexpected { pin: u32, value: u8 },
}

/// A single exported sysfs GPIO pin
pub struct SysfsPin {
    pin: u32,
    value: File,
}

impl SysfsPin {
    /// Export `pin` as an input and keep its value file open
    pub fn input(root: &Path, pin: u32) -> Result<Self, LineError> {
        Self::open(root, pin, "in")
    }

    /// Export `pin` as an output, initially low
    pub fn output(root: &Path, pin: u32) -> Result<Self, LineError> {
        let mut out = Self::open(root, pin, "out")?;
        out.write(false)?;
        Ok(out)
    }

    fn open(root: &Path, pin: u32, direction: &str) -> Result<Self, LineError> {
        let dir = pin_dir(root, pin);
        if !dir.exists() {
            debug!(pin, "exporting gpio");
            std::fs::write(root.join("export"), pin.to_string())
                .map_err(|source| LineError::Export { pin, source })?;
        }
        std::fs::write(dir.join("direction"), direction)
            .map_err(|source| LineError::Export { pin, source })?;

        let value = OpenOptions::new()
            .read(true)
            .write(direction == "out")
            .open(dir.join("value"))
            .map_err(|source| LineError::Export { pin, source })?;

        Ok(Self { pin, value })
    }

    pub fn read(&mut self) -> Result<bool, LineError> {
        let pin = self.pin;
        let mut buf = [0u8; 1];
        self.value
            .seek(SeekFrom::Start(0))
            .and_then(|_| self.value.read_exact(&mut buf))
            .map_err(|source| LineError::Read { pin, source })?;

        match buf[0] {
            b'0' => Ok(false),
            b'1' => Ok(true),
            value => Err(LineError::Unexpected { pin, value }),
        }
    }

    pub fn write(&mut self, high: bool) -> Result<(), LineError> {
        let pin = self.pin;
        self.value
            .seek(SeekFrom::Start(0))
            .and_then(|_| self.value.write_all(if high { b"1" } else { b"0" }))
            .map_err(|source| LineError::Write { pin, source })
    }
}

fn pin_dir(root: &Path, pin: u32) -> PathBuf {
    root.join(format!("gpio{pin}"))
}

/// Hook and dial inputs on sysfs
pub struct SysfsLines {
    hook: SysfsPin,
    dial: SysfsPin,
}

impl SysfsLines {
    pub fn open(config: &HardwareConfig) -> Result<Self, LineError> {
        Ok(Self {
            hook: SysfsPin::input(&config.gpio_root, config.hook_pin)?,
            dial: SysfsPin::input(&config.gpio_root, config.dial_pin)?,
        })
    }
}

impl SignalLines for SysfsLines {
    fn sample(&mut self) -> Result<RawSample, LineError> {
        Ok(RawSample {
            hook: self.hook.read()?,
            dial: self.dial.read()?,
        })
    }
}
