use std::str::FromStr;

use serde::{Serialize, Deserialize};
use strum::{AsRefStr as StrumAsRefStr, EnumString};

pub const KIBI: u64 = 1024;
pub const MEBI: u64 = KIBI * 1024;
pub const GIBI: u64 = MEBI * 1024;
pub const TEBI: u64 = GIBI * 1024;

/// units used for file sizes and disk capacities. multipliers are binary
/// so "1 GB" is 1024 MB everywhere in the client.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash,
    StrumAsRefStr, EnumString,
    Serialize, Deserialize
)]
#[strum(ascii_case_insensitive)]
pub enum SizeUnit {
    #[default]
    B,
    KB,
    MB,
    GB,
    TB,
}

impl SizeUnit {
    pub fn multiplier(&self) -> u64 {
        match self {
            SizeUnit::B => 1,
            SizeUnit::KB => KIBI,
            SizeUnit::MB => MEBI,
            SizeUnit::GB => GIBI,
            SizeUnit::TB => TEBI,
        }
    }

    /// converts a value in this unit to whole bytes, rounding to the nearest
    /// byte. negative and non finite values become 0.
    pub fn to_bytes(&self, value: f64) -> u64 {
        if !value.is_finite() || value <= 0.0 {
            return 0;
        }

        (value * self.multiplier() as f64).round() as u64
    }

    pub fn from_bytes(&self, bytes: u64) -> f64 {
        bytes as f64 / self.multiplier() as f64
    }

    /// disks can only be sized in MB, GB or TB
    pub fn is_disk_unit(&self) -> bool {
        matches!(self, SizeUnit::MB | SizeUnit::GB | SizeUnit::TB)
    }

    /// picks the largest unit that keeps the value at or above 1
    pub fn best_fit(bytes: u64) -> SizeUnit {
        for unit in [SizeUnit::TB, SizeUnit::GB, SizeUnit::MB, SizeUnit::KB] {
            if bytes >= unit.multiplier() {
                return unit;
            }
        }

        SizeUnit::B
    }
}

impl std::fmt::Display for SizeUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self.as_ref(), f)
    }
}

/// parses values like "10GB", "2.5 mb" or "512" (bytes)
pub fn parse_size(given: &str) -> Option<(f64, SizeUnit)> {
    let trimmed = given.trim();
    let split = trimmed.find(|ch: char| ch.is_ascii_alphabetic())
        .unwrap_or(trimmed.len());
    let (value, unit) = trimmed.split_at(split);

    let value = f64::from_str(value.trim()).ok()?;
    let unit = if unit.is_empty() {
        SizeUnit::B
    } else {
        SizeUnit::from_str(unit.trim()).ok()?
    };

    if !value.is_finite() || value < 0.0 {
        return None;
    }

    Some((value, unit))
}
