//! Switch state encoding
//!
//! The wire format is a single ASCII digit `'0'..='3'`: bit 1 is switch 1,
//! bit 0 is switch 0, after bias correction.

use crate::error::{ModswitchError, Result};
use crate::gpio::Bias;
use std::fmt;

/// Decoded position of the 2-position DIP switch
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwitchState {
    Zero = 0,
    One = 1,
    Two = 2,
    Three = 3,
}

impl SwitchState {
    pub const ALL: [SwitchState; 4] = [
        SwitchState::Zero,
        SwitchState::One,
        SwitchState::Two,
        SwitchState::Three,
    ];

    /// Build a state from a 2-bit code; higher bits are masked off
    #[inline]
    pub fn from_code(code: u8) -> Self {
        match code & 0x03 {
            0 => SwitchState::Zero,
            1 => SwitchState::One,
            2 => SwitchState::Two,
            _ => SwitchState::Three,
        }
    }

    /// Parse a channel byte, rejecting anything outside `'0'..='3'`
    #[inline]
    pub fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            b'0'..=b'3' => Ok(Self::from_code(byte - b'0')),
            _ => Err(ModswitchError::ProtocolCorruption { byte }),
        }
    }

    /// Decode raw line levels into a state.
    ///
    /// Under pull-up bias a closed contact pulls the line low, so raw levels
    /// are inverted before they are combined.
    #[inline]
    pub fn decode(sw0: bool, sw1: bool, bias: Bias) -> Self {
        let correct = |level: bool| match bias {
            Bias::PullUp => !level,
            Bias::PullDown => level,
        };
        Self::from_code(((correct(sw1) as u8) << 1) | correct(sw0) as u8)
    }

    #[inline(always)]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// ASCII byte stored in the channel
    #[inline(always)]
    pub fn as_byte(self) -> u8 {
        b'0' + self.code()
    }

    #[inline(always)]
    pub fn as_char(self) -> char {
        self.as_byte() as char
    }
}

impl fmt::Display for SwitchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_always_in_domain() {
        for bias in [Bias::PullUp, Bias::PullDown] {
            for sw0 in [false, true] {
                for sw1 in [false, true] {
                    let state = SwitchState::decode(sw0, sw1, bias);
                    assert!(state.code() <= 3);
                    assert!((b'0'..=b'3').contains(&state.as_byte()));
                }
            }
        }
    }

    #[test]
    fn test_pull_up_inverts_levels() {
        assert_eq!(SwitchState::decode(false, false, Bias::PullUp).code(), 0b11);
        assert_eq!(SwitchState::decode(false, false, Bias::PullDown).code(), 0b00);
        assert_eq!(SwitchState::decode(true, false, Bias::PullUp), SwitchState::Two);
        assert_eq!(SwitchState::decode(true, false, Bias::PullDown), SwitchState::One);
    }

    #[test]
    fn test_sw1_is_high_bit() {
        assert_eq!(SwitchState::decode(false, true, Bias::PullDown), SwitchState::Two);
        assert_eq!(SwitchState::decode(true, true, Bias::PullDown), SwitchState::Three);
    }

    #[test]
    fn test_from_byte_rejects_corruption() {
        assert_eq!(SwitchState::from_byte(b'2').unwrap(), SwitchState::Two);
        for byte in [0u8, b'4', b'/', b'a', 0xFF] {
            match SwitchState::from_byte(byte) {
                Err(ModswitchError::ProtocolCorruption { byte: got }) => assert_eq!(got, byte),
                other => panic!("expected corruption for {byte:#x}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_display_prints_digit() {
        assert_eq!(SwitchState::Three.to_string(), "3");
        assert_eq!(SwitchState::from_code(0b101), SwitchState::One);
    }
}
