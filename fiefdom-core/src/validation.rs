//! Input normalization and validation.
//!
//! Every identifier or numeric knob that arrives from outside the core passes
//! through here before it can touch state. Normalization trims whitespace and
//! upper-cases the leading character (`army_12` becomes `Army_12`); place IDs
//! are upper-cased entirely.

use crate::defines::{army as army_defines, days as day_defines, troops};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

static ARMY_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(Army|GarrisonArmy)_\d+$").expect("static regex"));
static CHAR_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Char_\d+$").expect("static regex"));
static PLACE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{3}\d{2}$").expect("static regex"));

/// Malformed input rejected before any state is touched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("army ID '{0}' must look like Army_<n> or GarrisonArmy_<n>")]
    ArmyId(String),
    #[error("character ID '{0}' must look like Char_<n>")]
    CharacterId(String),
    #[error("place ID '{0}' must be three letters followed by two digits")]
    PlaceId(String),
    #[error("days {0} outside the seasonal range [0, {max}]", max = day_defines::MAX_SEASON_DAYS)]
    Days(f64),
    #[error("aggression {0} exceeds {max}", max = army_defines::MAX_AGGRESSION)]
    Aggression(u8),
    #[error("combat odds {0} exceeds {max}", max = army_defines::MAX_COMBAT_ODDS)]
    CombatOdds(u8),
    #[error("troop array has {0} entries, expected {expected}", expected = troops::TROOP_TYPES)]
    TroopArray(usize),
    #[error("travel cost {0} must be a finite, non-negative number of days")]
    TravelCost(f64),
}

/// Trim and upper-case the first character.
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn validate_army_id(raw: &str) -> Result<String, ValidationError> {
    let id = normalize(raw);
    if ARMY_ID.is_match(&id) {
        Ok(id)
    } else {
        Err(ValidationError::ArmyId(raw.to_string()))
    }
}

pub fn validate_char_id(raw: &str) -> Result<String, ValidationError> {
    let id = normalize(raw);
    if CHAR_ID.is_match(&id) {
        Ok(id)
    } else {
        Err(ValidationError::CharacterId(raw.to_string()))
    }
}

pub fn validate_place_id(raw: &str) -> Result<String, ValidationError> {
    let id = raw.trim().to_ascii_uppercase();
    if PLACE_ID.is_match(&id) {
        Ok(id)
    } else {
        Err(ValidationError::PlaceId(raw.to_string()))
    }
}

/// Route costs arrive with player commands; NaN and negative costs would
/// corrupt the day budget.
pub fn validate_travel_cost(cost: f64) -> Result<f64, ValidationError> {
    if cost.is_finite() && cost >= 0.0 {
        Ok(cost)
    } else {
        Err(ValidationError::TravelCost(cost))
    }
}

pub fn validate_days(days: f64) -> Result<f64, ValidationError> {
    if (0.0..=day_defines::MAX_SEASON_DAYS).contains(&days) {
        Ok(days)
    } else {
        Err(ValidationError::Days(days))
    }
}

pub fn validate_aggression(aggression: u8) -> Result<u8, ValidationError> {
    if aggression <= army_defines::MAX_AGGRESSION {
        Ok(aggression)
    } else {
        Err(ValidationError::Aggression(aggression))
    }
}

pub fn validate_combat_odds(odds: u8) -> Result<u8, ValidationError> {
    if odds <= army_defines::MAX_COMBAT_ODDS {
        Ok(odds)
    } else {
        Err(ValidationError::CombatOdds(odds))
    }
}

/// Strict shape check, used where a wrong-sized array must be rejected.
pub fn validate_troop_array(raw: &[u32]) -> Result<[u32; troops::TROOP_TYPES], ValidationError> {
    <[u32; troops::TROOP_TYPES]>::try_from(raw).map_err(|_| ValidationError::TroopArray(raw.len()))
}

/// Lenient shape check used at construction: a malformed array is logged
/// and replaced by an empty one.
pub fn troop_array_or_default(raw: &[u32]) -> [u32; troops::TROOP_TYPES] {
    match validate_troop_array(raw) {
        Ok(troops) => troops,
        Err(e) => {
            log::warn!("{}; substituting an empty troop array", e);
            [0; troops::TROOP_TYPES]
        }
    }
}
