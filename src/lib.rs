//! modswitch - 2-position DIP switch state over shared memory
//!
//! A daemon samples two GPIO lines, decodes them into one of four states and
//! publishes the result as a single ASCII digit (`'0'..='3'`) in the POSIX
//! shared memory object `/modsw`. Other processes read that byte instead of
//! touching GPIO.
//!
//! # Architecture
//!
//! - **Single Writer (`modswitchd`)**: holds the instance lock, owns the GPIO
//!   line handle and the channel, republishes every `delay_us`
//! - **Multiple Readers (`cat4mod`)**: map the channel read-only and read it
//!   once or poll it until a change or a target state
//!
//! No lock guards the channel; every access is a single atomic byte load or
//! store.

pub mod channel;
pub mod config;
pub mod daemonize;
pub mod error;
pub mod gpio;
pub mod lock;
pub mod publisher;
pub mod reader;
pub mod shm;
pub mod signal;
pub mod state;

pub use channel::{StateReader, StateWriter, DEFAULT_CHANNEL_NAME};
pub use config::SwitchConfig;
pub use error::{ConfigError, ModswitchError, Result};
pub use gpio::{Bias, GpioSwitches, SwitchSampler};
pub use publisher::{Publisher, PublisherOptions, PublisherState};
pub use reader::{ReadMode, Reader};
pub use signal::CancelToken;
pub use state::SwitchState;
