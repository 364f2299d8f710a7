//! Validated serial line configuration.

use super::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Baud rates accepted by every backend.
pub const VALID_BAUD_RATES: [u32; 13] = [
    110, 300, 600, 1200, 2400, 4800, 9600, 14400, 19200, 38400, 57600, 115200, 230400,
];

/// Accepted data bits per character.
pub const VALID_DATA_BITS: [u8; 4] = [5, 6, 7, 8];

/// Accepted stop bit counts.
pub const VALID_STOP_BITS: [u8; 2] = [1, 2];

/// Parity checking modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
}

impl Parity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Odd => "odd",
            Self::Even => "even",
        }
    }
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Parity {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "n" => Ok(Self::None),
            "odd" | "o" => Ok(Self::Odd),
            "even" | "e" => Ok(Self::Even),
            _ => Err(ValidationError::Parity(s.to_string())),
        }
    }
}

/// Line parameters for a serial device.
///
/// An instance is always valid: [`Configuration::new`] and every setter run
/// the full validation, and a rejected setter leaves the value untouched.
///
/// # Example
/// ```
/// use serial_transport::port::{Configuration, Parity};
///
/// let mut config = Configuration::default();
/// config
///     .set_baud_rate(115200)?
///     .set_data_bits(7)?
///     .set_parity(Parity::Even)?
///     .set_stop_bits(2)?;
///
/// assert_eq!(config.baud_rate(), 115200);
/// assert!(config.set_baud_rate(99999).is_err());
/// assert_eq!(config.baud_rate(), 115200);
/// # Ok::<(), serial_transport::port::ValidationError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Configuration {
    baud_rate: u32,
    data_bits: u8,
    parity: Parity,
    stop_bits: u8,
}

impl Default for Configuration {
    /// 9600 baud, 8N1.
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            data_bits: 8,
            parity: Parity::None,
            stop_bits: 1,
        }
    }
}

impl Configuration {
    /// Build a configuration, rejecting any field outside its valid set.
    pub fn new(
        baud_rate: u32,
        data_bits: u8,
        parity: Parity,
        stop_bits: u8,
    ) -> Result<Self, ValidationError> {
        let config = Self {
            baud_rate,
            data_bits,
            parity,
            stop_bits,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check every field. Parity is an enum, so only the numeric fields can fail.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !VALID_BAUD_RATES.contains(&self.baud_rate) {
            return Err(ValidationError::BaudRate(self.baud_rate));
        }
        if !VALID_DATA_BITS.contains(&self.data_bits) {
            return Err(ValidationError::DataBits(self.data_bits));
        }
        if !VALID_STOP_BITS.contains(&self.stop_bits) {
            return Err(ValidationError::StopBits(self.stop_bits));
        }
        Ok(())
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    pub fn data_bits(&self) -> u8 {
        self.data_bits
    }

    pub fn parity(&self) -> Parity {
        self.parity
    }

    pub fn stop_bits(&self) -> u8 {
        self.stop_bits
    }

    pub fn set_baud_rate(&mut self, baud_rate: u32) -> Result<&mut Self, ValidationError> {
        self.update(|c| c.baud_rate = baud_rate)
    }

    pub fn set_data_bits(&mut self, data_bits: u8) -> Result<&mut Self, ValidationError> {
        self.update(|c| c.data_bits = data_bits)
    }

    pub fn set_parity(&mut self, parity: Parity) -> Result<&mut Self, ValidationError> {
        self.update(|c| c.parity = parity)
    }

    pub fn set_stop_bits(&mut self, stop_bits: u8) -> Result<&mut Self, ValidationError> {
        self.update(|c| c.stop_bits = stop_bits)
    }

    /// Apply `change` to a copy and commit only if the whole copy validates.
    fn update(&mut self, change: impl FnOnce(&mut Self)) -> Result<&mut Self, ValidationError> {
        let mut candidate = *self;
        change(&mut candidate);
        candidate.validate()?;
        *self = candidate;
        Ok(self)
    }
}

impl fmt::Display for Configuration {
    /// Conventional `9600 8N1` notation.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parity = match self.parity {
            Parity::None => 'N',
            Parity::Odd => 'O',
            Parity::Even => 'E',
        };
        write!(
            f,
            "{} {}{}{}",
            self.baud_rate, self.data_bits, parity, self.stop_bits
        )
    }
}
