//! Observable charger status flags.
//!
//! Independent bits, each set and cleared on its own.  The charger owns
//! `Charging` and `Full`; the supervisor owns the load and
//! overtemperature bits.  Display and telemetry only read.

use core::fmt;

use serde::{Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StatusFlag {
    /// The power stage is switching and delivering charge.
    Charging = 0b0000_0001,
    /// The battery reached trickle (float) phase.
    Full = 0b0000_0010,
    /// The load output is connected.
    LoadConnected = 0b0000_0100,
    /// Temperature channel 1 is above its shutdown threshold.
    Overtemperature1 = 0b0000_1000,
    /// Temperature channel 2 is above its shutdown threshold.
    Overtemperature2 = 0b0001_0000,
}

impl StatusFlag {
    pub const ALL: [Self; 5] = [
        Self::Charging,
        Self::Full,
        Self::LoadConnected,
        Self::Overtemperature1,
        Self::Overtemperature2,
    ];

    pub const fn mask(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for StatusFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Charging => write!(f, "charging"),
            Self::Full => write!(f, "full"),
            Self::LoadConnected => write!(f, "load connected"),
            Self::Overtemperature1 => write!(f, "overtemperature 1"),
            Self::Overtemperature2 => write!(f, "overtemperature 2"),
        }
    }
}

/// Set of [`StatusFlag`]s.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChargerStatus {
    bits: u8,
}

impl ChargerStatus {
    pub const fn empty() -> Self {
        Self { bits: 0 }
    }

    pub fn set(&mut self, flag: StatusFlag) {
        self.bits |= flag.mask();
    }

    pub fn clear(&mut self, flag: StatusFlag) {
        self.bits &= !flag.mask();
    }

    /// Set or clear `flag`.  Returns `true` if the bit changed.
    pub fn assign(&mut self, flag: StatusFlag, on: bool) -> bool {
        let before = self.bits;
        if on {
            self.set(flag);
        } else {
            self.clear(flag);
        }
        before != self.bits
    }

    pub fn contains(&self, flag: StatusFlag) -> bool {
        self.bits & flag.mask() != 0
    }

    pub fn is_charging(&self) -> bool {
        self.contains(StatusFlag::Charging)
    }

    /// Either temperature channel is over its limit.
    pub fn is_overtemperature(&self) -> bool {
        self.contains(StatusFlag::Overtemperature1) || self.contains(StatusFlag::Overtemperature2)
    }

    pub fn bits(&self) -> u8 {
        self.bits
    }
}

impl fmt::Display for ChargerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for flag in StatusFlag::ALL.iter().filter(|fl| self.contains(**fl)) {
            if !first {
                write!(f, "|")?;
            }
            write!(f, "{flag}")?;
            first = false;
        }
        if first {
            write!(f, "idle")?;
        }
        Ok(())
    }
}

impl Serialize for ChargerStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.bits)
    }
}
