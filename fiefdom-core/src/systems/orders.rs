//! Player orders on a single army: upkeep, standing orders, command and
//! reconnaissance.

use crate::error::{ActionError, Conflict, Denial, Missing, Resource};
use crate::ids::{ArmyId, CharId};
use crate::state::{Troops, WorldState};

use super::siege::{siege_role, sync_siege_days, SiegeRole};
use super::SimContext;

/// Pay a season's upkeep from the owner's home-fief treasury. Returns the
/// amount paid.
pub fn maintain_army(
    state: &mut WorldState,
    army_id: &ArmyId,
    ctx: &mut SimContext,
) -> Result<f64, ActionError> {
    let army = state.army(army_id)?;
    if army.is_maintained {
        return Err(ActionError::StateConflict(Conflict::AlreadyMaintained));
    }
    let owner = state.character(&army.owner)?;
    let home = owner
        .home_fief()
        .cloned()
        .ok_or_else(|| ActionError::NotFound(Missing::HomeFief(owner.id.clone())))?;
    let treasury = state.fief(&home)?.treasury;

    let cost = army.calc_army_size() as f64 * ctx.config.maintenance_cost_per_troop;
    if treasury < cost {
        return Err(ActionError::InsufficientResource {
            resource: Resource::Treasury,
            required: cost,
            available: treasury,
        });
    }

    if let Some(fief) = state.fiefs.get_mut(&home) {
        fief.treasury -= cost;
    }
    if let Some(army) = state.armies.get_mut(army_id) {
        army.is_maintained = true;
    }
    log::info!("{} maintained for {:.0} from {}", army_id, cost, home);
    Ok(cost)
}

/// Store new standing orders, clamped into range. Returns the values kept.
pub fn adjust_standing_orders(
    state: &mut WorldState,
    army_id: &ArmyId,
    aggression: i32,
    combat_odds: i32,
) -> Result<(i32, i32), ActionError> {
    let army = state
        .armies
        .get_mut(army_id)
        .ok_or_else(|| ActionError::NotFound(Missing::Army(army_id.clone())))?;
    army.adjust_standing_orders(aggression, combat_odds);
    Ok((army.aggression.get(), army.combat_odds.get()))
}

/// Put `new_leader` in command of the army, or leave it leaderless.
///
/// The new leader must stand in the army's fief and be the army's owner or
/// one of the owner's retainers. He gives up any army he
/// led before, leaves his employer's entourage, and shares the lower of his
/// and the army's day budgets with it.
pub fn assign_new_leader(
    state: &mut WorldState,
    army_id: &ArmyId,
    new_leader: Option<&CharId>,
) -> Result<(), ActionError> {
    let army = state.army(army_id)?;
    let old_leader = army.leader.clone();
    let army_days = army.days;

    let incoming = match new_leader {
        Some(id) => {
            let leader = state.character(id)?;
            if leader.location != army.location {
                return Err(ActionError::StateConflict(Conflict::DifferentLocation));
            }
            if !leader.serves(&army.owner) {
                return Err(ActionError::PermissionDenied(Denial::NotInService {
                    leader: id.clone(),
                    owner: army.owner.clone(),
                }));
            }
            Some((id.clone(), leader.army.clone(), leader.days))
        }
        None => None,
    };
    let besieging = match siege_role(state, army) {
        SiegeRole::Besieger => state.get_location(army).and_then(|f| f.siege),
        _ => None,
    };

    if let Some(old) = old_leader.and_then(|id| state.characters.get_mut(&id)) {
        if old.army.as_ref() == Some(army_id) {
            old.army = None;
        }
    }

    let Some((leader_id, previous_command, leader_days)) = incoming else {
        if let Some(army) = state.armies.get_mut(army_id) {
            army.leader = None;
        }
        log::debug!("{} is now leaderless", army_id);
        return Ok(());
    };

    if let Some(previous) = previous_command.filter(|p| p != army_id) {
        if let Some(prev_army) = state.armies.get_mut(&previous) {
            prev_army.leader = None;
        }
    }

    let days = army_days.min(leader_days);
    if let Some(leader) = state.characters.get_mut(&leader_id) {
        leader.army = Some(army_id.clone());
        leader.leave_entourage();
        leader.days = days;
    }
    if let Some(army) = state.armies.get_mut(army_id) {
        army.leader = Some(leader_id.clone());
        army.days = days;
    }
    if let Some(siege_id) = besieging {
        sync_siege_days(state, siege_id, days);
    }

    log::debug!("{} now led by {} ({:.1} days)", army_id, leader_id, days);
    Ok(())
}

/// Troop counts of an army as seen by `observer`.
///
/// The owner sees exact numbers. Anyone else sees every count off by up to
/// their estimate variance in either direction.
pub fn get_troops_estimate(
    state: &WorldState,
    army_id: &ArmyId,
    observer: &CharId,
    ctx: &mut SimContext,
) -> Result<Troops, ActionError> {
    let army = state.army(army_id)?;
    let observer = state.character(observer)?;
    if observer.id == army.owner {
        return Ok(army.troops);
    }

    let variance = observer.estimate_variance(ctx.config.estimate_variance_step);
    let mut estimate = army.troops;
    for count in &mut estimate {
        let factor = 1.0 + ctx.rng.signed_unit() * variance;
        *count = (*count as f64 * factor).round().max(0.0) as u32;
    }
    Ok(estimate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{FiefId, SiegeId};
    use crate::testing::{Harness, ScriptedRng, WorldStateBuilder};

    fn army(raw: &str) -> ArmyId {
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
            .with_player("Char_3", "KNT01")
    }

    #[test]
    fn test_maintain_army() {
        let mut state = realm()
            .treasury("ESX02", 60_000.0)
            .with_army("Army_1", "Char_1", None, "KNT01", [0, 0, 0, 0, 0, 100, 0], 90.0)
            .build();
        let mut harness = Harness::new(ScriptedRng::new());

        let cost = maintain_army(&mut state, &army("Army_1"), &mut harness.ctx()).unwrap();
        assert_eq!(cost, 50_000.0);
        assert!(state.armies[&army("Army_1")].is_maintained);
        assert_eq!(state.fiefs[&FiefId::parse("ESX02").unwrap()].treasury, 10_000.0);

        let again = maintain_army(&mut state, &army("Army_1"), &mut harness.ctx());
        assert_eq!(again.unwrap_err(), ActionError::StateConflict(Conflict::AlreadyMaintained));
    }

    #[test]
    fn test_maintain_army_short_of_funds() {
        let mut state = realm()
            .treasury("ESX02", 1_000.0)
            .with_army("Army_1", "Char_1", None, "ESX02", [0, 0, 0, 0, 0, 100, 0], 90.0)
            .build();
        let before = state.checksum();
        let mut harness = Harness::new(ScriptedRng::new());

        let err = maintain_army(&mut state, &army("Army_1"), &mut harness.ctx()).unwrap_err();
        assert_eq!(err.shortfall(), Some(49_000.0));
        assert_eq!(state.checksum(), before);
    }

    #[test]
    fn test_adjust_standing_orders_clamps() {
        let mut state = realm()
            .with_army("Army_1", "Char_1", None, "ESX02", [0; 7], 90.0)
            .build();
        assert_eq!(adjust_standing_orders(&mut state, &army("Army_1"), 5, -1), Ok((2, 0)));
        assert!(adjust_standing_orders(&mut state, &army("Army_9"), 1, 1).is_err());
    }

    #[test]
    fn test_assign_leader_syncs_days_and_leaves_entourage() {
        let mut state = realm()
            .with_army("Army_1", "Char_1", Some("Char_1"), "ESX02", [0, 0, 0, 0, 0, 100, 0], 40.0)
            .build();

        assign_new_leader(&mut state, &army("Army_1"), Some(&char_id("Char_2"))).unwrap();

        let npc = &state.characters[&char_id("Char_2")];
        assert_eq!(npc.army, Some(army("Army_1")));
        assert!(!npc.is_active_entourage());
        assert_eq!(npc.days, 40.0);
        assert!(state.characters[&char_id("Char_1")].army.is_none());
        assert_eq!(state.armies[&army("Army_1")].leader, Some(char_id("Char_2")));
    }

    #[test]
    fn test_assign_leader_takes_him_from_previous_army() {
        let mut state = realm()
            .with_army("Army_1", "Char_1", Some("Char_2"), "ESX02", [0; 7], 90.0)
            .with_army("Army_2", "Char_1", None, "ESX02", [0; 7], 90.0)
            .build();

        assign_new_leader(&mut state, &army("Army_2"), Some(&char_id("Char_2"))).unwrap();

        assert!(state.armies[&army("Army_1")].leader.is_none());
        assert_eq!(state.armies[&army("Army_2")].leader, Some(char_id("Char_2")));
    }

    #[test]
    fn test_assign_leader_must_be_present() {
        let mut state = realm()
            .with_army("Army_1", "Char_1", None, "ESX02", [0; 7], 90.0)
            .build();
        let before = state.checksum();
        let err = assign_new_leader(&mut state, &army("Army_1"), Some(&char_id("Char_3")))
            .unwrap_err();
        assert_eq!(err, ActionError::StateConflict(Conflict::DifferentLocation));
        assert_eq!(state.checksum(), before);
    }

    #[test]
    fn test_assign_leader_must_serve_the_owner() {
        let mut state = realm()
            .with_player("Char_4", "ESX02")
            .with_npc("Char_5", "ESX02", Some("Char_4"))
            .with_npc("Char_6", "ESX02", None)
            .with_army("Army_1", "Char_1", None, "ESX02", [0; 7], 90.0)
            .with_army("Army_2", "Char_4", Some("Char_5"), "ESX02", [0; 7], 90.0)
            .build();
        let before = state.checksum();

        for outsider in ["Char_4", "Char_5", "Char_6"] {
            let err = assign_new_leader(&mut state, &army("Army_1"), Some(&char_id(outsider)))
                .unwrap_err();
            assert_eq!(
                err,
                ActionError::PermissionDenied(Denial::NotInService {
                    leader: char_id(outsider),
                    owner: char_id("Char_1"),
                })
            );
        }
        // The rival's army keeps its leader
        assert_eq!(state.armies[&army("Army_2")].leader, Some(char_id("Char_5")));
        assert_eq!(state.checksum(), before);

        assign_new_leader(&mut state, &army("Army_1"), Some(&char_id("Char_1"))).unwrap();
        assert_eq!(state.armies[&army("Army_1")].leader, Some(char_id("Char_1")));
    }

    #[test]
    fn test_remove_leader() {
        let mut state = realm()
            .with_army("Army_1", "Char_1", Some("Char_2"), "ESX02", [0; 7], 90.0)
            .build();
        assign_new_leader(&mut state, &army("Army_1"), None).unwrap();
        assert!(state.armies[&army("Army_1")].leader.is_none());
        assert!(state.characters[&char_id("Char_2")].army.is_none());
    }

    #[test]
    fn test_new_besieger_leader_resyncs_siege() {
        let mut state = realm()
            .with_player("Char_4", "ESX02")
            .with_army("Army_1", "Char_1", None, "ESX02", [0, 0, 0, 0, 0, 500, 0], 60.0)
            .with_army("GarrisonArmy_2", "Char_4", None, "ESX02", [0, 0, 0, 0, 0, 100, 0], 60.0)
            .with_siege("ESX02", "Army_1", "GarrisonArmy_2")
            .build();
        state.characters.get_mut(&char_id("Char_2")).unwrap().days = 25.0;

        assign_new_leader(&mut state, &army("Army_1"), Some(&char_id("Char_2"))).unwrap();

        assert_eq!(state.sieges[&SiegeId(1)].days, 25.0);
        assert_eq!(state.armies[&army("GarrisonArmy_2")].days, 25.0);
    }

    #[test]
    fn test_estimate_exact_for_owner() {
        let state = realm()
            .with_army("Army_1", "Char_1", None, "ESX02", [3, 0, 0, 0, 0, 100, 7], 90.0)
            .build();
        let mut harness = Harness::new(ScriptedRng::new().units(&[1.0; 7]));
        let seen =
            get_troops_estimate(&state, &army("Army_1"), &char_id("Char_1"), &mut harness.ctx())
                .unwrap();
        assert_eq!(seen, [3, 0, 0, 0, 0, 100, 7]);
    }

    #[test]
    fn test_estimate_perturbed_for_others() {
        let state = realm()
            .with_army("Army_1", "Char_1", None, "ESX02", [0, 0, 0, 0, 0, 100, 40], 90.0)
            .build();
        // Management 5 => variance 0.25
        let units = [0.0, 0.0, 0.0, 0.0, 0.0, 1.0, -1.0];
        let mut harness = Harness::new(ScriptedRng::new().units(&units));
        let seen =
            get_troops_estimate(&state, &army("Army_1"), &char_id("Char_3"), &mut harness.ctx())
                .unwrap();
        assert_eq!(seen, [0, 0, 0, 0, 0, 125, 30]);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_estimate_within_variance(
                foot in 0u32..100_000,
                unit in -1.0f64..=1.0,
                management in 0.0f64..12.0,
            ) {
                let mut state = realm()
                    .with_army("Army_1", "Char_1", None, "ESX02", [0, 0, 0, 0, 0, foot, 0], 90.0)
                    .build();
                state.characters.get_mut(&char_id("Char_3")).unwrap().management = management;
                let variance = (10.0 - management).max(0.0) * 0.05;
                let mut harness = Harness::new(ScriptedRng::new().units(&[unit; 7]));

                let observer = char_id("Char_3");
                let seen =
                    get_troops_estimate(&state, &army("Army_1"), &observer, &mut harness.ctx())
                        .unwrap();
                let low = (foot as f64 * (1.0 - variance)).floor();
                let high = (foot as f64 * (1.0 + variance)).ceil();
                prop_assert!((low..=high).contains(&(seen[5] as f64)));
            }
        }
    }
}
