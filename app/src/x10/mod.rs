mod packet;

pub use packet::{ParsedEvent, RejectReason, parse};

use derive_more::Display;

/// Letter of the X10 house being monitored, always upper case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub struct HouseCode(char);

impl HouseCode {
    pub fn new(letter: char) -> Option<Self> {
        let letter = letter.to_ascii_uppercase();
        ('A'..='P').contains(&letter).then_some(Self(letter))
    }

    pub fn letter(&self) -> char {
        self.0
    }
}

/// X10 unit number within a house, 1 to 16.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
pub struct UnitId(u8);

impl UnitId {
    pub fn new(number: u8) -> Option<Self> {
        (1..=16).contains(&number).then_some(Self(number))
    }

    pub fn parse(s: &str) -> Option<Self> {
        s.parse::<u8>().ok().and_then(Self::new)
    }

    pub fn number(&self) -> u8 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum AddressAction {
    On,
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum LevelAction {
    Dim,
    Bright,
}

impl LevelAction {
    pub fn delta(&self, magnitude: u8) -> i16 {
        match self {
            LevelAction::Dim => -i16::from(magnitude),
            LevelAction::Bright => i16::from(magnitude),
        }
    }
}
