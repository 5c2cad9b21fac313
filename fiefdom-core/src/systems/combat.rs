//! Combat value and battle resolution.
//!
//! Combat value is the weighted strength of an army: troop counts times the
//! owner's national weights, plus the keep it defends, its leader and (for
//! player leaders) the fighting men of his entourage. Battle values compare
//! two armies and reward the side with the better leadership.

use crate::config::SimConfig;
use crate::defines::{combat as defines, troops::FOOT};
use crate::error::{ActionError, Conflict, Denial};
use crate::ids::{ArmyId, SiegeId};
use crate::state::{Army, Troops, WorldState};
use tracing::instrument;

use super::siege::{end_siege, siege_role, SiegeEnd, SiegeRole};
use super::SimContext;

/// What a defending army does when attacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    Engage,
    Retreat,
}

/// Result of a successful pre-attack check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttackClearance {
    /// Siege the attacker abandoned to fight
    pub ended_siege: Option<SiegeId>,
    pub target_role: SiegeRole,
}

/// Weighted strength of an army. `keep_level` is 0 unless the army is
/// defending a keep.
pub fn calculate_combat_value(
    state: &WorldState,
    army: &Army,
    keep_level: u8,
    config: &SimConfig,
) -> f64 {
    let weights = match state.get_owner(army) {
        Some(owner) => config.combat_weights_for(&owner.nationality),
        None => &config.default_combat_weights,
    };

    let mut value: f64 = army
        .troops
        .iter()
        .zip(weights)
        .map(|(&count, weight)| count as f64 * weight)
        .sum();

    value += keep_level as f64 * defines::FOOT_PER_KEEP_LEVEL * weights[FOOT];

    if let Some(leader) = state.get_leader(army) {
        value += leader.combat_value();
        if leader.is_player() {
            value += leader
                .entourage()
                .iter()
                .filter_map(|id| state.characters.get(id))
                .filter(|c| c.is_male && c.is_active_entourage())
                .map(|c| c.combat_value())
                .sum::<f64>();
        }
    }
    value
}

/// Sum of the enemy strength neutralised by registered troop-type
/// advantages.
///
/// For each advantage, attacker type `i` neutralises up to
/// `troops[i] * multiplier` of the enemy's type `j`. The same enemy type is
/// counted once per attacker type that has an advantage over it, so the
/// result can exceed the enemy's actual numbers.
pub fn calculate_troop_type_advantages(troops: &Troops, enemy: &Troops, config: &SimConfig) -> f64 {
    let mut advantage = 0.0;
    for adv in &config.troop_advantages {
        let enemy_count = enemy[adv.defender] as f64;
        let neutralised = troops[adv.attacker] as f64 * adv.multiplier;
        if enemy_count - neutralised <= 0.0 {
            advantage += enemy_count;
        } else {
            advantage += neutralised;
        }
    }
    advantage
}

fn leadership_value(state: &WorldState, army: &Army, is_siege_storm: bool) -> f64 {
    state
        .get_leader(army)
        .map(|leader| leader.leadership_value(is_siege_storm))
        .unwrap_or(defines::LEADERLESS_LEADERSHIP)
}

/// Battle values `[attacker, defender]`.
///
/// The side with the higher leadership value has its combat value scaled by
/// the ratio of the two leadership values; the other side is unmodified.
#[instrument(skip_all, name = "battle_values")]
pub fn calculate_battle_values(
    state: &WorldState,
    attacker: &Army,
    defender: &Army,
    keep_level: u8,
    is_siege_storm: bool,
    config: &SimConfig,
) -> [f64; 2] {
    let mut values = [
        calculate_combat_value(state, attacker, 0, config),
        calculate_combat_value(state, defender, keep_level, config),
    ];
    let lv = [
        leadership_value(state, attacker, is_siege_storm),
        leadership_value(state, defender, is_siege_storm),
    ];

    let (high, low) = if lv[0] > lv[1] { (0, 1) } else { (1, 0) };
    if lv[high] > lv[low] && lv[low] > 0.0 {
        values[high] *= lv[high] / lv[low];
    }

    log::debug!(
        "Battle values {} vs {}: {:.1} / {:.1} (leadership {:.2} / {:.2})",
        attacker.id,
        defender.id,
        values[0],
        values[1],
        lv[0],
        lv[1]
    );
    values
}

/// Whether `defender` stands and fights, given the battle values
/// `[attacker, defender]`.
///
/// Garrisons and siege defenders always fight. Otherwise aggression 0 always
/// retreats, 2 always fights, and 1 fights while the odds against it are no
/// worse than its combat-odds setting.
pub fn standing_order_response(state: &WorldState, defender: &Army, values: [f64; 2]) -> Response {
    if defender.id.is_garrison() || siege_role(state, defender).is_defender() {
        return Response::Engage;
    }
    match defender.aggression.get() {
        0 => Response::Retreat,
        1 => {
            let [attack, defence] = values;
            let odds = if defence > 0.0 {
                attack / defence
            } else if attack > 0.0 {
                f64::INFINITY
            } else {
                0.0
            };
            if odds <= defender.combat_odds.get() as f64 {
                Response::Engage
            } else {
                Response::Retreat
            }
        }
        _ => Response::Engage,
    }
}

/// Validate an attack by `attacker_id` on `target_id`.
///
/// A besieging attacker gives up its siege to fight; that is the only
/// mutation, and only happens once every check has passed.
pub fn checks_before_attack(
    state: &mut WorldState,
    attacker_id: &ArmyId,
    target_id: &ArmyId,
    ctx: &mut SimContext,
) -> Result<AttackClearance, ActionError> {
    let attacker = state.army(attacker_id)?;
    let target = state.army(target_id)?;

    if attacker.owner == target.owner {
        return Err(ActionError::PermissionDenied(Denial::AttackOwnArmy));
    }
    if attacker.location != target.location {
        return Err(ActionError::StateConflict(Conflict::DifferentLocation));
    }
    let target_role = siege_role(state, target);
    if target_role == SiegeRole::DefendingGarrison {
        return Err(ActionError::StateConflict(Conflict::BesiegedTarget));
    }
    if attacker.days < defines::MIN_ATTACK_DAYS {
        return Err(ActionError::insufficient_days(
            defines::MIN_ATTACK_DAYS,
            attacker.days,
        ));
    }

    let abandoned = match siege_role(state, attacker) {
        SiegeRole::Besieger => state.get_location(attacker).and_then(|f| f.siege),
        _ => None,
    };
    let ended_siege = abandoned
        .and_then(|siege_id| end_siege(state, siege_id, SiegeEnd::BesiegerAttacked, ctx))
        .map(|siege| siege.id);

    Ok(AttackClearance {
        ended_siege,
        target_role,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::CharId;
    use crate::testing::{Harness, ScriptedRng, WorldStateBuilder};

    fn id(raw: &str) -> ArmyId {
        ArmyId::parse(raw).unwrap()
    }

    fn char_id(raw: &str) -> CharId {
        CharId::parse(raw).unwrap()
    }

    fn realm() -> WorldStateBuilder {
        WorldStateBuilder::new()
            .with_fief("ESX02", 10_000)
            .with_fief("KNT01", 10_000)
            .with_player("Char_1", "ESX02")
            .with_npc("Char_2", "ESX02", Some("Char_1"))
            .with_player("Char_3", "ESX02")
    }

    #[test]
    fn test_combat_value_weights_and_keep() {
        let state = realm()
            .with_army("Army_1", "Char_1", None, "ESX02", [1, 0, 0, 0, 0, 10, 0], 90.0)
            .build();
        let config = SimConfig::default();
        let army = &state.armies[&id("Army_1")];

        // English weights: 9 per knight, 3 per foot
        assert_eq!(calculate_combat_value(&state, army, 0, &config), 39.0);
        assert_eq!(calculate_combat_value(&state, army, 2, &config), 6039.0);
    }

    #[test]
    fn test_combat_value_uses_default_weights_for_unknown_nationality() {
        let mut state = realm()
            .with_army("Army_1", "Char_1", None, "ESX02", [1, 0, 0, 0, 0, 10, 0], 90.0)
            .build();
        state.characters.get_mut(&char_id("Char_1")).unwrap().nationality = "F".into();
        let army = &state.armies[&id("Army_1")];
        assert_eq!(calculate_combat_value(&state, army, 0, &SimConfig::default()), 27.0);
    }

    #[test]
    fn test_combat_value_counts_leader_and_active_male_entourage() {
        let mut state = realm()
            .with_npc("Char_4", "ESX02", Some("Char_1"))
            .with_npc("Char_5", "ESX02", Some("Char_1"))
            .with_army("Army_1", "Char_1", Some("Char_1"), "ESX02", [0; 7], 90.0)
            .build();
        state.characters.get_mut(&char_id("Char_4")).unwrap().is_male = false;
        state.characters.get_mut(&char_id("Char_5")).unwrap().leave_entourage();
        let army = &state.armies[&id("Army_1")];

        // Leader 5 + (5 + 5) / 2 = 10, Char_2 3 + 3 = 6
        assert_eq!(calculate_combat_value(&state, army, 0, &SimConfig::default()), 16.0);
    }

    #[test]
    fn test_npc_leader_brings_no_entourage() {
        let state = realm()
            .with_army("Army_1", "Char_1", Some("Char_2"), "ESX02", [0; 7], 90.0)
            .build();
        let army = &state.armies[&id("Army_1")];
        assert_eq!(calculate_combat_value(&state, army, 0, &SimConfig::default()), 6.0);
    }

    #[test]
    fn test_troop_type_advantages() {
        let config = SimConfig::default();
        let troops = [10, 10, 0, 0, 0, 0, 0];
        let enemy = [0, 0, 0, 0, 0, 20, 100];
        // knights/foot 20, knights/rabble 50, men-at-arms/rabble 30
        assert_eq!(calculate_troop_type_advantages(&troops, &enemy, &config), 100.0);
    }

    #[test]
    fn test_troop_type_advantages_count_enemy_type_per_attacker() {
        let config = SimConfig::default();
        let troops = [10, 10, 0, 0, 0, 0, 0];
        let enemy = [0, 0, 0, 0, 0, 0, 40];
        // All 40 rabble against knights, then 30 more against men-at-arms
        assert_eq!(calculate_troop_type_advantages(&troops, &enemy, &config), 70.0);
    }

    #[test]
    fn test_equal_leadership_applies_no_multiplier() {
        let state = realm()
            .with_army("Army_1", "Char_1", None, "ESX02", [0, 0, 0, 0, 0, 100, 0], 90.0)
            .with_army("Army_2", "Char_3", None, "ESX02", [0, 0, 0, 0, 0, 80, 0], 90.0)
            .build();
        let config = SimConfig::default();
        let values = calculate_battle_values(
            &state,
            &state.armies[&id("Army_1")],
            &state.armies[&id("Army_2")],
            0,
            false,
            &config,
        );
        assert_eq!(values, [300.0, 240.0]);
    }

    #[test]
    fn test_better_leadership_scales_own_side() {
        let mut state = realm()
            .with_army("Army_1", "Char_1", Some("Char_1"), "ESX02", [0, 0, 0, 0, 0, 100, 0], 90.0)
            .with_army("Army_2", "Char_3", None, "ESX02", [0, 0, 0, 0, 0, 80, 0], 90.0)
            .build();
        let config = SimConfig::default();
        let attacker = state.armies[&id("Army_1")].clone();
        let defender = state.armies[&id("Army_2")].clone();

        // Leadership 5 vs leaderless 4; combat value 300 + 10 + 6 entourage
        let values = calculate_battle_values(&state, &attacker, &defender, 0, false, &config);
        assert_eq!(values, [316.0 * 1.25, 240.0]);

        // Siege bonus only counts when storming
        state.characters.get_mut(&char_id("Char_1")).unwrap().siege_bonus = 1.0;
        let storm = calculate_battle_values(&state, &attacker, &defender, 0, true, &config);
        assert_eq!(storm[0], 316.0 * 2.5);
        let field = calculate_battle_values(&state, &attacker, &defender, 0, false, &config);
        assert_eq!(field, values);
    }

    #[test]
    fn test_standing_orders() {
        let mut state = realm()
            .with_army("Army_1", "Char_1", None, "ESX02", [0, 0, 0, 0, 0, 100, 0], 90.0)
            .build();
        let army_id = id("Army_1");

        state.armies.get_mut(&army_id).unwrap().adjust_standing_orders(0, 9);
        assert_eq!(
            standing_order_response(&state, &state.armies[&army_id], [1.0, 10.0]),
            Response::Retreat
        );

        state.armies.get_mut(&army_id).unwrap().adjust_standing_orders(1, 2);
        let army = &state.armies[&army_id];
        assert_eq!(standing_order_response(&state, army, [200.0, 100.0]), Response::Engage);
        assert_eq!(standing_order_response(&state, army, [201.0, 100.0]), Response::Retreat);
        assert_eq!(standing_order_response(&state, army, [5.0, 0.0]), Response::Retreat);

        state.armies.get_mut(&army_id).unwrap().adjust_standing_orders(2, 0);
        assert_eq!(
            standing_order_response(&state, &state.armies[&army_id], [1000.0, 1.0]),
            Response::Engage
        );
    }

    #[test]
    fn test_garrisons_always_engage() {
        let mut state = realm()
            .with_army("GarrisonArmy_1", "Char_1", None, "ESX02", [0, 0, 0, 0, 0, 100, 0], 90.0)
            .build();
        let garrison = id("GarrisonArmy_1");
        state.armies.get_mut(&garrison).unwrap().adjust_standing_orders(0, 0);
        assert_eq!(
            standing_order_response(&state, &state.armies[&garrison], [1000.0, 1.0]),
            Response::Engage
        );
    }

    #[test]
    fn test_checks_before_attack_rejections() {
        let mut state = realm()
            .with_army("Army_1", "Char_1", None, "ESX02", [0, 0, 0, 0, 0, 100, 0], 0.5)
            .with_army("Army_2", "Char_1", None, "ESX02", [0, 0, 0, 0, 0, 100, 0], 90.0)
            .with_army("Army_3", "Char_3", None, "KNT01", [0, 0, 0, 0, 0, 100, 0], 90.0)
            .with_army("Army_4", "Char_3", None, "ESX02", [0, 0, 0, 0, 0, 100, 0], 90.0)
            .build();
        let before = state.checksum();
        let mut harness = Harness::new(ScriptedRng::new());

        let mut check = |attacker: &str, target: &str| {
            checks_before_attack(&mut state, &id(attacker), &id(target), &mut harness.ctx())
        };

        let own = check("Army_2", "Army_1");
        assert_eq!(own.unwrap_err(), ActionError::PermissionDenied(Denial::AttackOwnArmy));

        let far = check("Army_2", "Army_3");
        assert_eq!(far.unwrap_err(), ActionError::StateConflict(Conflict::DifferentLocation));

        let tired = check("Army_1", "Army_4");
        assert!(tired.unwrap_err().is_insufficient_days());

        assert_eq!(state.checksum(), before);
    }

    #[test]
    fn test_attacking_besieger_ends_siege() {
        let mut state = realm()
            .with_army("Army_1", "Char_1", None, "ESX02", [0, 0, 0, 0, 0, 500, 0], 90.0)
            .with_army("GarrisonArmy_2", "Char_3", None, "ESX02", [0, 0, 0, 0, 0, 100, 0], 90.0)
            .with_army("Army_3", "Char_3", None, "ESX02", [0, 0, 0, 0, 0, 100, 0], 90.0)
            .with_siege("ESX02", "Army_1", "GarrisonArmy_2")
            .build();
        let mut harness = Harness::new(ScriptedRng::new());

        let target = id("GarrisonArmy_2");
        let err = checks_before_attack(&mut state, &id("Army_1"), &target, &mut harness.ctx())
            .unwrap_err();
        assert_eq!(err, ActionError::StateConflict(Conflict::BesiegedTarget));
        assert_eq!(state.sieges.len(), 1);

        let clearance =
            checks_before_attack(&mut state, &id("Army_1"), &id("Army_3"), &mut harness.ctx())
                .unwrap();
        assert_eq!(clearance.ended_siege, Some(SiegeId(1)));
        assert!(state.sieges.is_empty());
        assert_eq!(harness.outbox.len(), 2);
    }
}
