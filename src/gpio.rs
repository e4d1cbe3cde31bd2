//! GPIO sampling through the Linux GPIO character device
//!
//! Both switch lines are requested in a single line handle so one ioctl
//! returns the two levels with minimal skew.

use crate::error::{ModswitchError, Result};
use std::fs::{File, OpenOptions};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::path::{Path, PathBuf};

/// Default GPIO character device
pub const DEFAULT_GPIOCHIP: &str = "/dev/gpiochip0";

/// Line offsets usable for the switch (BCM GPIO 0-27 on the 40-pin header)
pub const VALID_LINES: std::ops::RangeInclusive<u32> = 0..=27;

const CONSUMER_LABEL: &[u8] = b"modswitchd";

/// Internal pull resistor applied to both switch lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
    /// Line rests high; a closed contact reads low
    PullUp,
    /// Line rests low; a closed contact reads high
    PullDown,
}

impl Bias {
    /// Config encoding: 1 = pull-up, 0 = pull-down
    pub fn from_flag(flag: i64) -> Option<Self> {
        match flag {
            1 => Some(Bias::PullUp),
            0 => Some(Bias::PullDown),
            _ => None,
        }
    }

    fn request_flags(self) -> u32 {
        ioctl::GPIOHANDLE_REQUEST_INPUT
            | match self {
                Bias::PullUp => ioctl::GPIOHANDLE_REQUEST_BIAS_PULL_UP,
                Bias::PullDown => ioctl::GPIOHANDLE_REQUEST_BIAS_PULL_DOWN,
            }
    }
}

/// Source of the two raw switch levels
pub trait SwitchSampler {
    /// Return the instantaneous `(sw0, sw1)` levels, `true` meaning high
    fn sample(&mut self) -> Result<(bool, bool)>;
}

/// Linux GPIO chip ABI v1 (linux/gpio.h)
mod ioctl {
    pub const GPIOHANDLES_MAX: usize = 64;

    pub const GPIOHANDLE_REQUEST_INPUT: u32 = 1 << 0;
    pub const GPIOHANDLE_REQUEST_BIAS_PULL_UP: u32 = 1 << 5;
    pub const GPIOHANDLE_REQUEST_BIAS_PULL_DOWN: u32 = 1 << 6;

    const GPIO_IOC_MAGIC: u8 = 0xB4;

    #[repr(C)]
    pub struct GpioHandleRequest {
        pub lineoffsets: [u32; GPIOHANDLES_MAX],
        pub flags: u32,
        pub default_values: [u8; GPIOHANDLES_MAX],
        pub consumer_label: [u8; 32],
        pub lines: u32,
        pub fd: i32,
    }

    #[repr(C)]
    pub struct GpioHandleData {
        pub values: [u8; GPIOHANDLES_MAX],
    }

    nix::ioctl_readwrite!(get_linehandle, GPIO_IOC_MAGIC, 0x03, GpioHandleRequest);
    nix::ioctl_readwrite!(get_line_values, GPIO_IOC_MAGIC, 0x08, GpioHandleData);
}

/// Two input lines held through one GPIO line handle
pub struct GpioSwitches {
    line: OwnedFd,
    // Dropped after `line`
    #[allow(dead_code)]
    chip: File,
    chip_path: PathBuf,
    lines: [u32; 2],
}

impl GpioSwitches {
    /// Request `sw0` and `sw1` as inputs with the given bias
    pub fn open(chip_path: &Path, sw0: u32, sw1: u32, bias: Bias) -> Result<Self> {
        let chip = OpenOptions::new()
            .read(true)
            .open(chip_path)
            .map_err(|source| ModswitchError::GpioOpen {
                path: chip_path.to_path_buf(),
                source,
            })?;

        let lines = [sw0, sw1];
        let mut req = line_request(lines, bias);

        // SAFETY: `req` is a properly sized gpiohandle_request for this ioctl
        unsafe { ioctl::get_linehandle(chip.as_raw_fd(), &mut req) }.map_err(|e| {
            ModswitchError::GpioRequest {
                lines,
                source: e.into(),
            }
        })?;

        // SAFETY: on success the kernel hands us a fresh line handle fd
        let line = unsafe { OwnedFd::from_raw_fd(req.fd) };

        tracing::debug!(
            chip = %chip_path.display(),
            sw0,
            sw1,
            ?bias,
            "GPIO line handle acquired"
        );

        Ok(Self {
            line,
            chip,
            chip_path: chip_path.to_path_buf(),
            lines,
        })
    }

    /// Line offsets held by this handle
    pub fn lines(&self) -> [u32; 2] {
        self.lines
    }

    pub fn chip_path(&self) -> &Path {
        &self.chip_path
    }
}

impl SwitchSampler for GpioSwitches {
    fn sample(&mut self) -> Result<(bool, bool)> {
        let mut data = ioctl::GpioHandleData {
            values: [0; ioctl::GPIOHANDLES_MAX],
        };
        // SAFETY: `data` is a properly sized gpiohandle_data for this ioctl
        unsafe { ioctl::get_line_values(self.line.as_raw_fd(), &mut data) }
            .map_err(|e| ModswitchError::GpioRead(e.into()))?;
        Ok((data.values[0] != 0, data.values[1] != 0))
    }
}

fn line_request(lines: [u32; 2], bias: Bias) -> ioctl::GpioHandleRequest {
    let mut req = ioctl::GpioHandleRequest {
        lineoffsets: [0; ioctl::GPIOHANDLES_MAX],
        flags: bias.request_flags(),
        default_values: [0; ioctl::GPIOHANDLES_MAX],
        consumer_label: [0; 32],
        lines: lines.len() as u32,
        fd: -1,
    };
    req.lineoffsets[..2].copy_from_slice(&lines);
    req.consumer_label[..CONSUMER_LABEL.len()].copy_from_slice(CONSUMER_LABEL);
    req
}
