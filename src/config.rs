//! Publisher configuration and strict argument parsing
//!
//! The config file is ini formatted:
//!
//! ```ini
//! [gpio]
//! sw0_pin = 10
//! sw1_pin = 7
//! ; 1 = pull-up, 0 = pull-down
//! pullupdown = 1
//!
//! [user]
//! delay_us = 1000
//! ```
//!
//! Keys that are absent keep their defaults; unknown keys are ignored.

use crate::error::ConfigError;
use crate::gpio::{Bias, VALID_LINES};
use crate::state::SwitchState;
use ini::Ini;
use std::path::Path;
use std::time::Duration;

/// Default config file location
pub const DEFAULT_CONFIG_FILE: &str = "/etc/modswitch/modswitch.conf";

pub const DEFAULT_SW0_PIN: u32 = 10;
pub const DEFAULT_SW1_PIN: u32 = 7;
pub const DEFAULT_BIAS: Bias = Bias::PullUp;
pub const DEFAULT_DELAY_US: u64 = 1000;

/// Resolved switch configuration, immutable once the publisher starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchConfig {
    pub sw0_pin: u32,
    pub sw1_pin: u32,
    pub bias: Bias,
    pub delay_us: u64,
}

impl Default for SwitchConfig {
    fn default() -> Self {
        Self {
            sw0_pin: DEFAULT_SW0_PIN,
            sw1_pin: DEFAULT_SW1_PIN,
            bias: DEFAULT_BIAS,
            delay_us: DEFAULT_DELAY_US,
        }
    }
}

impl SwitchConfig {
    /// Load a config file over the defaults and validate it
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ini_str(&text, path)
    }

    /// Parse ini text; `origin` is only used in error messages
    pub fn from_ini_str(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Syntax {
            path: origin.to_path_buf(),
            line: e.line,
            msg: e.msg.to_string(),
        })?;

        let mut config = Self::default();

        if let Some(value) = ini.get_from(Some("gpio"), "sw0_pin") {
            config.sw0_pin = parse_pin(0, value)?;
        }
        if let Some(value) = ini.get_from(Some("gpio"), "sw1_pin") {
            config.sw1_pin = parse_pin(1, value)?;
        }
        if let Some(value) = ini.get_from(Some("gpio"), "pullupdown") {
            config.bias = value
                .parse::<i64>()
                .ok()
                .and_then(Bias::from_flag)
                .ok_or_else(|| ConfigError::InvalidBias(value.to_string()))?;
        }
        if let Some(value) = ini.get_from(Some("user"), "delay_us") {
            config.delay_us = parse_delay_us(value)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check pin numbers against the usable line set
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (switch, pin) in [(0u8, self.sw0_pin), (1u8, self.sw1_pin)] {
            if !VALID_LINES.contains(&pin) {
                return Err(ConfigError::InvalidPin {
                    switch,
                    value: pin.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Sampling interval
    pub fn delay(&self) -> Duration {
        Duration::from_micros(self.delay_us)
    }
}

fn parse_pin(switch: u8, value: &str) -> Result<u32, ConfigError> {
    value
        .parse::<u32>()
        .ok()
        .filter(|pin| VALID_LINES.contains(pin))
        .ok_or_else(|| ConfigError::InvalidPin {
            switch,
            value: value.to_string(),
        })
}

/// Parse a microsecond delay.
///
/// Only plain decimal digits are accepted: no sign, no whitespace, no
/// trailing characters, and the value must fit in a u64.
pub fn parse_delay_us(value: &str) -> Result<u64, ConfigError> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ConfigError::InvalidDelay(value.to_string()));
    }
    value
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidDelay(value.to_string()))
}

/// Parse a target state given as exactly one character `'0'..='3'`
pub fn parse_target(value: &str) -> Result<SwitchState, ConfigError> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii() => SwitchState::from_byte(c as u8)
            .map_err(|_| ConfigError::InvalidTarget(value.to_string())),
        _ => Err(ConfigError::InvalidTarget(value.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<SwitchConfig, ConfigError> {
        SwitchConfig::from_ini_str(text, Path::new("test.conf"))
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config, SwitchConfig::default());
        assert_eq!(config.sw0_pin, 10);
        assert_eq!(config.sw1_pin, 7);
        assert_eq!(config.bias, Bias::PullUp);
        assert_eq!(config.delay(), Duration::from_millis(1));
    }

    #[test]
    fn test_full_file() {
        let config = parse(
            "; modswitch\n[gpio]\nsw0_pin = 17\nsw1_pin=27\npullupdown = 0\n\n[user]\ndelay_us = 2500\n",
        )
        .unwrap();
        assert_eq!(
            config,
            SwitchConfig {
                sw0_pin: 17,
                sw1_pin: 27,
                bias: Bias::PullDown,
                delay_us: 2500,
            }
        );
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let config = parse("[gpio]\nchip = 1\n[extra]\nfoo = bar\n[user]\nname = x\n").unwrap();
        assert_eq!(config, SwitchConfig::default());
    }

    #[test]
    fn test_invalid_pins() {
        assert!(matches!(
            parse("[gpio]\nsw0_pin = 28\n"),
            Err(ConfigError::InvalidPin { switch: 0, .. })
        ));
        assert!(matches!(
            parse("[gpio]\nsw1_pin = -1\n"),
            Err(ConfigError::InvalidPin { switch: 1, .. })
        ));
        assert!(matches!(
            parse("[gpio]\nsw1_pin = seven\n"),
            Err(ConfigError::InvalidPin { switch: 1, .. })
        ));
    }

    #[test]
    fn test_invalid_bias() {
        for value in ["2", "-1", "up", ""] {
            let text = format!("[gpio]\npullupdown = {value}\n");
            assert!(matches!(parse(&text), Err(ConfigError::InvalidBias(_))), "{value:?}");
        }
    }

    #[test]
    fn test_delay_with_trailing_garbage_rejected() {
        assert!(matches!(
            parse("[user]\ndelay_us = 100x\n"),
            Err(ConfigError::InvalidDelay(v)) if v == "100x"
        ));
    }

    #[test]
    fn test_parse_delay_us() {
        assert_eq!(parse_delay_us("0").unwrap(), 0);
        assert_eq!(parse_delay_us("1000").unwrap(), 1000);
        assert_eq!(parse_delay_us("18446744073709551615").unwrap(), u64::MAX);
        for bad in ["", "100x", "x100", "-5", "+5", " 5", "5 ", "1e3", "18446744073709551616"] {
            assert!(parse_delay_us(bad).is_err(), "{bad:?} accepted");
        }
    }

    #[test]
    fn test_parse_target() {
        assert_eq!(parse_target("0").unwrap(), SwitchState::Zero);
        assert_eq!(parse_target("3").unwrap(), SwitchState::Three);
        for bad in ["", "01", "4", "a", "é", "33"] {
            assert!(
                matches!(parse_target(bad), Err(ConfigError::InvalidTarget(_))),
                "{bad:?} accepted"
            );
        }
    }

    #[test]
    fn test_validate_programmatic_config() {
        let config = SwitchConfig {
            sw0_pin: 40,
            ..SwitchConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidPin { switch: 0, .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            SwitchConfig::load(Path::new("/nonexistent/modswitch.conf")),
            Err(ConfigError::Read { .. })
        ));
    }
}
