//! State reader: the client side of the protocol

use crate::channel::StateReader;
use crate::error::{ModswitchError, Result};
use crate::signal::CancelToken;
use crate::state::SwitchState;
use std::time::Duration;

/// Default polling interval of the reader
pub const DEFAULT_POLL_DELAY_US: u64 = 1000;

/// What the reader waits for before reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// Report the current state immediately
    Single,
    /// Report the first state that differs from the one seen at attach time
    UntilChange,
    /// Report once the channel holds this state
    UntilState(SwitchState),
}

/// Attached channel reader
pub struct Reader {
    channel: StateReader,
}

impl Reader {
    /// Attach to a published channel; fails with `ChannelNotFound` if the
    /// publisher is not running
    pub fn attach(name: &str) -> Result<Self> {
        let channel = StateReader::attach(name)?;
        Ok(Self { channel })
    }

    /// Single-shot read
    pub fn read(&self) -> Result<SwitchState> {
        self.channel.read_state()
    }

    /// Poll every `delay` until `mode` is satisfied.
    ///
    /// There is no timeout; the wait only ends early through `cancel`, which
    /// yields [`ModswitchError::Interrupted`].
    pub fn wait(&self, mode: ReadMode, delay: Duration, cancel: &CancelToken) -> Result<SwitchState> {
        let baseline = self.read()?;
        let done = |current: SwitchState| match mode {
            ReadMode::Single => true,
            ReadMode::UntilChange => current != baseline,
            ReadMode::UntilState(target) => current == target,
        };

        let mut current = baseline;
        loop {
            if done(current) {
                tracing::debug!(%baseline, %current, ?mode, "wait satisfied");
                return Ok(current);
            }
            if cancel.sleep(delay) {
                return Err(ModswitchError::Interrupted);
            }
            current = self.read()?;
        }
    }

    pub fn name(&self) -> &str {
        self.channel.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::StateWriter;
    use std::thread;
    use std::time::Instant;

    const POLL: Duration = Duration::from_micros(500);

    fn unique(tag: &str) -> String {
        format!("/modsw_reader_{}_{}", tag, std::process::id())
    }

    #[test]
    fn test_single_shot() {
        let name = unique("single");
        let _writer = StateWriter::create(&name, SwitchState::Two).unwrap();

        let reader = Reader::attach(&name).unwrap();
        assert_eq!(reader.read().unwrap(), SwitchState::Two);
        assert_eq!(
            reader.wait(ReadMode::Single, POLL, &CancelToken::new()).unwrap(),
            SwitchState::Two
        );
    }

    #[test]
    fn test_missing_channel() {
        assert!(matches!(
            Reader::attach(&unique("missing")),
            Err(ModswitchError::ChannelNotFound { .. })
        ));
    }

    #[test]
    fn test_wait_for_change() {
        let name = unique("change");
        let writer = StateWriter::create(&name, SwitchState::One).unwrap();
        let reader = Reader::attach(&name).unwrap();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            writer.write_state(SwitchState::One);
            thread::sleep(Duration::from_millis(30));
            writer.write_state(SwitchState::Three);
            writer
        });

        let start = Instant::now();
        let state = reader
            .wait(ReadMode::UntilChange, POLL, &CancelToken::new())
            .unwrap();
        assert_eq!(state, SwitchState::Three);
        assert!(start.elapsed() >= Duration::from_millis(60));
        drop(handle.join().unwrap());
    }

    #[test]
    fn test_wait_for_target_skips_other_states() {
        let name = unique("target");
        let writer = StateWriter::create(&name, SwitchState::Three).unwrap();
        let reader = Reader::attach(&name).unwrap();

        let handle = thread::spawn(move || {
            for state in [SwitchState::Two, SwitchState::One] {
                thread::sleep(Duration::from_millis(20));
                writer.write_state(state);
            }
            thread::sleep(Duration::from_millis(20));
            writer.write_state(SwitchState::Zero);
            writer
        });

        let state = reader
            .wait(ReadMode::UntilState(SwitchState::Zero), POLL, &CancelToken::new())
            .unwrap();
        assert_eq!(state, SwitchState::Zero);
        drop(handle.join().unwrap());
    }

    #[test]
    fn test_target_already_present_returns_immediately() {
        let name = unique("present");
        let _writer = StateWriter::create(&name, SwitchState::Zero).unwrap();
        let reader = Reader::attach(&name).unwrap();

        let state = reader
            .wait(
                ReadMode::UntilState(SwitchState::Zero),
                Duration::from_secs(60),
                &CancelToken::new(),
            )
            .unwrap();
        assert_eq!(state, SwitchState::Zero);
    }

    #[test]
    fn test_cancel_interrupts_wait() {
        let name = unique("cancel");
        let _writer = StateWriter::create(&name, SwitchState::One).unwrap();
        let reader = Reader::attach(&name).unwrap();

        let token = CancelToken::new();
        let canceller = token.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            canceller.cancel();
        });

        assert!(matches!(
            reader.wait(ReadMode::UntilChange, POLL, &token),
            Err(ModswitchError::Interrupted)
        ));
        handle.join().unwrap();
    }

    #[test]
    fn test_cancel_cuts_long_poll_delay_short() {
        let name = unique("longdelay");
        let _writer = StateWriter::create(&name, SwitchState::One).unwrap();
        let reader = Reader::attach(&name).unwrap();

        let token = CancelToken::new();
        let canceller = token.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            canceller.cancel();
        });

        let start = Instant::now();
        assert!(matches!(
            reader.wait(ReadMode::UntilChange, Duration::from_secs(3), &token),
            Err(ModswitchError::Interrupted)
        ));
        assert!(start.elapsed() < Duration::from_millis(500));
        handle.join().unwrap();
    }
}
