//! State publisher: the daemon side of the protocol
//!
//! A [`Publisher`] owns every resource the daemon acquires (instance lock,
//! GPIO handle, state channel). Teardown is the drop of those fields, so it
//! runs exactly once whether the loop ends through cancellation or a fault.

use crate::channel::{StateWriter, DEFAULT_CHANNEL_NAME};
use crate::config::SwitchConfig;
use crate::daemonize;
use crate::error::Result;
use crate::gpio::{GpioSwitches, SwitchSampler, DEFAULT_GPIOCHIP};
use crate::lock::{InstanceLock, DEFAULT_LOCK_FILE};
use crate::signal::CancelToken;
use crate::state::SwitchState;
use std::path::PathBuf;

/// Lifecycle of the publisher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublisherState {
    /// Resources acquired and first sample published, loop not yet entered
    Starting,
    Running,
    ShuttingDown,
    Crashed,
}

/// Everything needed to start a publisher
#[derive(Debug, Clone)]
pub struct PublisherOptions {
    pub config: SwitchConfig,
    pub lock_file: PathBuf,
    pub channel_name: String,
    pub gpiochip: PathBuf,
    /// Detach into the background after taking the lock
    pub daemonize: bool,
}

impl Default for PublisherOptions {
    fn default() -> Self {
        Self {
            config: SwitchConfig::default(),
            lock_file: PathBuf::from(DEFAULT_LOCK_FILE),
            channel_name: DEFAULT_CHANNEL_NAME.to_string(),
            gpiochip: PathBuf::from(DEFAULT_GPIOCHIP),
            daemonize: false,
        }
    }
}

/// Running publisher context.
///
/// Field order is teardown order: GPIO handle, then channel, then lock.
pub struct Publisher<S: SwitchSampler> {
    sampler: S,
    writer: StateWriter,
    lock: InstanceLock,
    config: SwitchConfig,
    state: PublisherState,
    last: SwitchState,
}

impl Publisher<GpioSwitches> {
    /// Start against the GPIO character device named in `options`
    pub fn start_gpio(options: &PublisherOptions) -> Result<Self> {
        Self::start(options, |config| {
            GpioSwitches::open(&options.gpiochip, config.sw0_pin, config.sw1_pin, config.bias)
        })
    }
}

impl<S: SwitchSampler> Publisher<S> {
    /// Run the startup sequence.
    ///
    /// Configuration is validated before anything is acquired, and the lock
    /// is taken before the sampler or channel exist, so a second instance
    /// fails without touching GPIO or shared memory.
    pub fn start<F>(options: &PublisherOptions, open_sampler: F) -> Result<Self>
    where
        F: FnOnce(&SwitchConfig) -> Result<S>,
    {
        let config = options.config.clone();
        config.validate()?;

        let mut lock = InstanceLock::acquire(&options.lock_file)?;
        tracing::debug!(path = %lock.path().display(), "instance lock acquired");

        if options.daemonize {
            daemonize::detach()?;
        }
        lock.record_pid()?;

        let mut sampler = open_sampler(&config)?;

        // Publish a real sample at creation so readers never see the
        // zero-filled byte of a fresh segment.
        let (sw0, sw1) = sampler.sample()?;
        let first = SwitchState::decode(sw0, sw1, config.bias);
        let writer = StateWriter::create(&options.channel_name, first)?;

        tracing::info!(
            channel = writer.name(),
            sw0_pin = config.sw0_pin,
            sw1_pin = config.sw1_pin,
            bias = ?config.bias,
            delay_us = config.delay_us,
            state = %first,
            "publisher started"
        );

        Ok(Self {
            sampler,
            writer,
            lock,
            config,
            state: PublisherState::Starting,
            last: first,
        })
    }

    /// Sample, decode and publish once
    pub fn step(&mut self) -> Result<SwitchState> {
        let (sw0, sw1) = self.sampler.sample()?;
        let state = SwitchState::decode(sw0, sw1, self.config.bias);
        self.writer.write_state(state);
        if state != self.last {
            tracing::debug!(from = %self.last, to = %state, "switch changed");
            self.last = state;
        }
        Ok(state)
    }

    /// Sampling loop; returns when `cancel` fires or sampling fails
    pub fn run(&mut self, cancel: &CancelToken) -> Result<()> {
        let delay = self.config.delay();
        self.state = PublisherState::Running;
        tracing::debug!("sampling loop entered");
        loop {
            if cancel.is_cancelled() {
                break;
            }
            if let Err(e) = self.step() {
                self.state = PublisherState::Crashed;
                tracing::error!(error = %e, "sampling failed");
                return Err(e);
            }
            if cancel.sleep(delay) {
                break;
            }
        }
        self.state = PublisherState::ShuttingDown;
        tracing::info!("termination requested, shutting down");
        Ok(())
    }

    /// Release the GPIO handle, unlink the channel and unlock, in that order
    pub fn shutdown(self) -> PublisherState {
        let Self {
            sampler,
            writer,
            lock,
            state,
            ..
        } = self;
        drop(sampler);
        let channel = writer.name().to_string();
        drop(writer);
        let lock_path = lock.path().to_path_buf();
        drop(lock);
        tracing::info!(%channel, lock = %lock_path.display(), ?state, "publisher stopped");
        state
    }

    pub fn state(&self) -> PublisherState {
        self.state
    }

    /// Last published state
    pub fn current(&self) -> SwitchState {
        self.last
    }

    pub fn config(&self) -> &SwitchConfig {
        &self.config
    }
}
