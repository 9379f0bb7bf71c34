//! Die types and hit-die rolls.
//!
//! Level-up only ever rolls a single class hit die, so this module keeps
//! the die vocabulary and a roll helper that accepts any `Rng` for
//! deterministic tests.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Standard D&D die types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DieType {
    D4,
    D6,
    D8,
    D10,
    D12,
    D20,
}

impl DieType {
    pub fn sides(&self) -> u8 {
        match self {
            DieType::D4 => 4,
            DieType::D6 => 6,
            DieType::D8 => 8,
            DieType::D10 => 10,
            DieType::D12 => 12,
            DieType::D20 => 20,
        }
    }

    pub fn from_sides(sides: u8) -> Option<DieType> {
        match sides {
            4 => Some(DieType::D4),
            6 => Some(DieType::D6),
            8 => Some(DieType::D8),
            10 => Some(DieType::D10),
            12 => Some(DieType::D12),
            20 => Some(DieType::D20),
            _ => None,
        }
    }

    /// The fixed hit point value taken instead of rolling: `sides / 2 + 1`.
    pub fn fixed_average(&self) -> u8 {
        self.sides() / 2 + 1
    }

    /// Whether `value` is a face of this die.
    pub fn is_face(&self, value: u8) -> bool {
        (1..=self.sides()).contains(&value)
    }

    /// Roll this die once.
    pub fn roll(&self) -> u8 {
        self.roll_with_rng(&mut rand::thread_rng())
    }

    /// Roll this die once with the supplied generator.
    pub fn roll_with_rng<R: Rng>(&self, rng: &mut R) -> u8 {
        rng.gen_range(1..=self.sides())
    }
}

impl fmt::Display for DieType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d{}", self.sides())
    }
}
