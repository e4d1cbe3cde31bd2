//! Error types for modswitch

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for modswitch operations
pub type Result<T> = std::result::Result<T, ModswitchError>;

/// Errors that can occur while publishing or reading the switch state
#[derive(Debug, Error)]
pub enum ModswitchError {
    /// Configuration or argument rejected before any resource was acquired
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Failed to open or create the lock file
    #[error("Cannot open lock file '{}': {source}", path.display())]
    LockOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Another publisher already holds the instance lock
    #[error("Another instance is already running (lock file '{}')", path.display())]
    AlreadyRunning { path: PathBuf },

    /// flock or pid write failed for a reason other than contention
    #[error("Lock file '{}' error: {source}", path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A daemonization step failed before detaching
    #[error("Failed to daemonize ({step}): {source}")]
    Daemonize {
        step: &'static str,
        #[source]
        source: io::Error,
    },

    /// Failed to open the GPIO character device
    #[error("Cannot open GPIO chip '{}': {source}", path.display())]
    GpioOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The line handle request ioctl failed
    #[error("GPIO line handle request for lines {lines:?} failed: {source}")]
    GpioRequest {
        lines: [u32; 2],
        #[source]
        source: io::Error,
    },

    /// Reading line values failed
    #[error("GPIO line value read failed: {0}")]
    GpioRead(#[source] io::Error),

    /// Shared memory name is not a single "/name" component
    #[error("Invalid shared memory name '{name}'")]
    InvalidName { name: String },

    /// Failed to create shared memory
    #[error("Failed to create shared memory '{name}': {source}")]
    ShmCreate {
        name: String,
        #[source]
        source: io::Error,
    },

    /// The shared memory object does not exist (publisher not running)
    #[error("Shared memory channel '{name}' not found; is modswitchd running?")]
    ChannelNotFound { name: String },

    /// Failed to open shared memory
    #[error("Failed to open shared memory '{name}': {source}")]
    ShmOpen {
        name: String,
        #[source]
        source: io::Error,
    },

    /// The shared memory object is not exactly one byte
    #[error("Shared memory channel '{name}' has size {got}, expected {expected}")]
    ChannelSize {
        name: String,
        expected: usize,
        got: u64,
    },

    /// Failed to map memory
    #[error("Failed to map memory: {0}")]
    Mmap(#[source] io::Error),

    /// Failed to truncate shared memory
    #[error("Failed to set shared memory size: {0}")]
    Truncate(#[source] io::Error),

    /// The channel held a byte outside '0'..='3'
    #[error("Protocol corruption: channel holds byte 0x{byte:02X}, expected '0'..='3'")]
    ProtocolCorruption { byte: u8 },

    /// Installing a signal handler failed
    #[error("Failed to install {signal} handler: {source}")]
    SignalInstall {
        signal: &'static str,
        #[source]
        source: io::Error,
    },

    /// A termination signal arrived before the operation completed
    #[error("Interrupted by signal")]
    Interrupted,
}

/// Errors detected while resolving configuration and arguments
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("Cannot load config file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The configuration file is not valid ini
    #[error("Bad config file '{}' (first error on line {line}): {msg}", path.display())]
    Syntax {
        path: PathBuf,
        line: usize,
        msg: String,
    },

    /// A GPIO line outside the usable set
    #[error("Invalid switch {switch} pin: {value}")]
    InvalidPin { switch: u8, value: String },

    /// pullupdown other than 0 or 1
    #[error("Invalid pullupdown mode: {0}")]
    InvalidBias(String),

    /// Delay not made of decimal digits only, or out of range
    #[error("Cannot parse delay '{0}': expected a non-negative integer of microseconds")]
    InvalidDelay(String),

    /// Target is not exactly one switch state character
    #[error("Cannot parse specific char '{0}': expected exactly one of '0', '1', '2', '3'")]
    InvalidTarget(String),
}

