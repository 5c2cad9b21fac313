//! Game mechanic constants (defines).
//!
//! Values are fixed by the game rules. Anything a server operator may want
//! to tune lives in [`SimConfig`](crate::config::SimConfig) instead.

/// Troop array shape and indices
pub mod troops {
    /// Number of troop types carried by every army and detachment
    pub const TROOP_TYPES: usize = 7;

    pub const KNIGHTS: usize = 0;
    pub const MEN_AT_ARMS: usize = 1;
    pub const LIGHT_CAVALRY: usize = 2;
    pub const LONGBOWMEN: usize = 3;
    pub const CROSSBOWMEN: usize = 4;
    pub const FOOT: usize = 5;
    pub const RABBLE: usize = 6;
}

/// Season day budget
pub mod days {
    /// Upper bound for an army's day budget at construction
    pub const MAX_SEASON_DAYS: f64 = 109.0;

    /// Days granted to a character (and a leaderless army) each season
    pub const SEASON_DAYS: f64 = 90.0;

    /// One attrition check is rolled per elapsed week
    pub const DAYS_PER_ATTRITION_CHECK: f64 = 7.0;
}

/// Attrition model constants
pub mod attrition {
    /// Lower clamp for the attrition chance (percent)
    pub const MIN_CHANCE: f64 = 10.0;

    /// Upper clamp for the attrition chance (percent)
    pub const MAX_CHANCE: f64 = 100.0;

    /// Extra chance (percent) in winter and spring
    pub const HARSH_SEASON_BONUS: f64 = 20.0;

    /// Casualty multiplier in winter and spring
    pub const HARSH_SEASON_MULTIPLIER: f64 = 3.0;

    /// Divisor turning the population pressure ratio into a casualty modifier
    pub const CASUALTY_DIVISOR: f64 = 10.0;

    /// Casualty modifiers are kept strictly below one
    pub const MAX_CASUALTY_MODIFIER: f64 = 0.99;
}

/// Detachment transfer constants
pub mod transfer {
    /// Minimum days an army needs to drop off or pick up a detachment
    pub const MIN_DAYS: f64 = 10.0;

    /// Shortest possible transfer duration (days, inclusive)
    pub const MIN_DURATION: u32 = 10;

    /// Longest possible transfer duration (days, inclusive)
    pub const MAX_DURATION: u32 = 30;
}

/// Army lifecycle constants
pub mod army {
    /// Armies smaller than this dissolve at season end (unless defending a siege)
    pub const DISSOLUTION_THRESHOLD: u32 = 100;

    /// Highest aggression setting
    pub const MAX_AGGRESSION: u8 = 2;

    /// Highest combat-odds setting
    pub const MAX_COMBAT_ODDS: u8 = 9;

    /// Default aggression for new armies
    pub const DEFAULT_AGGRESSION: u8 = 1;

    /// Default combat odds for new armies
    pub const DEFAULT_COMBAT_ODDS: u8 = 2;

    pub const ARMY_PREFIX: &str = "Army_";
    pub const GARRISON_PREFIX: &str = "GarrisonArmy_";
}

/// Combat constants
pub mod combat {
    /// Foot-equivalent defenders contributed by each keep level
    pub const FOOT_PER_KEEP_LEVEL: f64 = 1000.0;

    /// Leadership value used for a side with no leader
    pub const LEADERLESS_LEADERSHIP: f64 = 4.0;

    /// Minimum days needed to launch an attack
    pub const MIN_ATTACK_DAYS: f64 = 1.0;
}
