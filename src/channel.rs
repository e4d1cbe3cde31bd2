//! Typed access to the one-byte state channel
//!
//! The publisher owns a [`StateWriter`]; any number of processes attach a
//! [`StateReader`]. There is no lock: every access is a single atomic byte
//! load or store, so a reader can never observe a torn value.

use crate::error::Result;
use crate::shm::SharedRegion;
use crate::state::SwitchState;
use std::sync::atomic::{AtomicU8, Ordering};

/// Well-known name of the state channel
pub const DEFAULT_CHANNEL_NAME: &str = "/modsw";

/// The channel carries exactly one ASCII digit
pub const CHANNEL_SIZE: usize = 1;

#[inline(always)]
fn cell(shm: &SharedRegion) -> &AtomicU8 {
    // SAFETY: the region is mapped for CHANNEL_SIZE bytes for as long as
    // `shm` lives, and AtomicU8 has the size and alignment of u8.
    unsafe { &*(shm.as_ptr() as *const AtomicU8) }
}

/// Publisher (writer) side of the channel
pub struct StateWriter {
    shm: SharedRegion,
}

impl StateWriter {
    /// Create the channel and publish `initial` before anyone can read it
    pub fn create(name: &str, initial: SwitchState) -> Result<Self> {
        let shm = SharedRegion::create(name, CHANNEL_SIZE)?;
        let writer = Self { shm };
        writer.write_state(initial);
        Ok(writer)
    }

    /// Publish a state with a single byte store
    #[inline]
    pub fn write_state(&self, state: SwitchState) {
        cell(&self.shm).store(state.as_byte(), Ordering::Release);
    }

    /// Get the name of the channel
    pub fn name(&self) -> &str {
        self.shm.name()
    }
}

/// Reader side of the channel
pub struct StateReader {
    shm: SharedRegion,
}

impl StateReader {
    /// Attach read-only to a channel created by a running publisher
    pub fn attach(name: &str) -> Result<Self> {
        let shm = SharedRegion::open_read_only(name, CHANNEL_SIZE)?;
        Ok(Self { shm })
    }

    /// Read the raw byte without validating it
    #[inline]
    pub fn read_raw(&self) -> u8 {
        cell(&self.shm).load(Ordering::Acquire)
    }

    /// Read and validate the published state
    #[inline]
    pub fn read_state(&self) -> Result<SwitchState> {
        SwitchState::from_byte(self.read_raw())
    }

    /// Get the name of the channel
    pub fn name(&self) -> &str {
        self.shm.name()
    }
}
