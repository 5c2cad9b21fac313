use serde::{Deserialize, Serialize};

/// A value clamped to an integer range.
/// Used for: standing-order aggression (0 to 2), combat odds (0 to 9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundedInt {
    value: i32,
    min: i32,
    max: i32,
}

impl BoundedInt {
    pub const fn new(value: i32, min: i32, max: i32) -> Self {
        let value = if value < min {
            min
        } else if value > max {
            max
        } else {
            value
        };
        Self { value, min, max }
    }

    pub fn get(&self) -> i32 {
        self.value
    }

    pub fn min(&self) -> i32 {
        self.min
    }

    pub fn max(&self) -> i32 {
        self.max
    }

    pub fn set(&mut self, value: i32) {
        self.value = value.clamp(self.min, self.max);
    }
}

pub type Aggression = BoundedInt;
pub type CombatOdds = BoundedInt;

pub fn new_aggression(value: i32) -> Aggression {
    BoundedInt::new(value, 0, crate::defines::army::MAX_AGGRESSION as i32)
}

pub fn new_combat_odds(value: i32) -> CombatOdds {
    BoundedInt::new(value, 0, crate::defines::army::MAX_COMBAT_ODDS as i32)
}
