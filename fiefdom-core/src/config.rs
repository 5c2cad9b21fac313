use crate::defines::troops::{self, TROOP_TYPES};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A registered troop-type advantage: `attacker` units count `multiplier`
/// times against enemy `defender` units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TroopAdvantage {
    pub attacker: usize,
    pub defender: usize,
    pub multiplier: f64,
}

/// Simulation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Per-troop combat weights keyed by owner nationality.
    pub combat_weights: BTreeMap<String, [f64; TROOP_TYPES]>,

    /// Weights for any nationality missing from `combat_weights`.
    pub default_combat_weights: [f64; TROOP_TYPES],

    pub troop_advantages: Vec<TroopAdvantage>,

    /// Treasury cost per soldier to maintain an army for one season.
    pub maintenance_cost_per_troop: f64,

    /// Estimate variance added per point of management below 10.
    pub estimate_variance_step: f64,

    /// Bailiff management at or above which a besieged garrison is kept
    /// supplied (no attrition for defenders).
    pub siege_supply_management: f64,
}

impl SimConfig {
    /// Parse a JSON config; absent fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn combat_weights_for(&self, nationality: &str) -> &[f64; TROOP_TYPES] {
        self.combat_weights
            .get(nationality)
            .unwrap_or(&self.default_combat_weights)
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        let mut combat_weights = BTreeMap::new();
        combat_weights.insert("E".to_string(), [9.0, 9.0, 1.0, 9.0, 5.0, 3.0, 1.0]);

        Self {
            combat_weights,
            default_combat_weights: [7.0, 7.0, 3.0, 2.0, 4.0, 2.0, 1.0],
            troop_advantages: vec![
                TroopAdvantage {
                    attacker: troops::KNIGHTS,
                    defender: troops::FOOT,
                    multiplier: 3.0,
                },
                TroopAdvantage {
                    attacker: troops::KNIGHTS,
                    defender: troops::RABBLE,
                    multiplier: 5.0,
                },
                TroopAdvantage {
                    attacker: troops::MEN_AT_ARMS,
                    defender: troops::RABBLE,
                    multiplier: 3.0,
                },
                TroopAdvantage {
                    attacker: troops::LIGHT_CAVALRY,
                    defender: troops::CROSSBOWMEN,
                    multiplier: 2.0,
                },
                TroopAdvantage {
                    attacker: troops::LONGBOWMEN,
                    defender: troops::KNIGHTS,
                    multiplier: 0.5,
                },
                TroopAdvantage {
                    attacker: troops::FOOT,
                    defender: troops::RABBLE,
                    multiplier: 2.0,
                },
            ],
            maintenance_cost_per_troop: 500.0,
            estimate_variance_step: 0.05,
            siege_supply_management: 5.0,
        }
    }
}
