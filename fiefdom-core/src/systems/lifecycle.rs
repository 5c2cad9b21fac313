//! End-of-season update, dissolution and disbanding.

use crate::defines::{army::DISSOLUTION_THRESHOLD, days::SEASON_DAYS};
use crate::error::{ActionError, Missing};
use crate::ids::ArmyId;
use crate::observer::NotificationKind;
use crate::state::{Army, WorldState};
use tracing::instrument;

use super::attrition::{checks_for_days, report_losses, run_attrition_checks};
use super::siege::{
    defender_attrition_applies, end_siege, record_casualties, siege_role, sync_siege_days,
    SiegeEnd, SiegeRole,
};
use super::SimContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeasonOutcome {
    Survived { lost: u32 },
    Dissolved { lost: u32 },
}

/// Totals from one season sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeasonSummary {
    pub armies_updated: usize,
    pub troops_lost: u32,
    pub dissolved: Vec<ArmyId>,
}

/// Detach the army from any siege role, then remove it from every registry.
fn remove_from_field(
    state: &mut WorldState,
    army_id: &ArmyId,
    besieger_reason: SiegeEnd,
    ctx: &mut SimContext,
) -> Option<(Army, String)> {
    let army = state.armies.get(army_id)?;
    let role = siege_role(state, army);
    let siege_id = state.get_location(army).and_then(|f| f.siege);

    if let Some(siege_id) = siege_id {
        match role {
            SiegeRole::AdditionalDefender => {
                if let Some(siege) = state.sieges.get_mut(&siege_id) {
                    siege.additional_defender = None;
                }
            }
            SiegeRole::Besieger => {
                end_siege(state, siege_id, besieger_reason, ctx);
            }
            SiegeRole::DefendingGarrison => {
                end_siege(state, siege_id, SiegeEnd::GarrisonDisbanded, ctx);
            }
            SiegeRole::NotInvolved => {}
        }
    }

    let army = state.unregister_army(army_id)?;
    let fief_name = state
        .fiefs
        .get(&army.location)
        .map(|f| f.name.clone())
        .unwrap_or_else(|| army.location.to_string());
    Some((army, fief_name))
}

/// Disband an army at its owner's order.
pub fn disband_army(
    state: &mut WorldState,
    army_id: &ArmyId,
    ctx: &mut SimContext,
) -> Result<Army, ActionError> {
    state.army(army_id)?;
    let (army, fief_name) = remove_from_field(state, army_id, SiegeEnd::BesiegerDisbanded, ctx)
        .ok_or_else(|| ActionError::NotFound(Missing::Army(army_id.clone())))?;

    ctx.notify(
        &army.owner,
        NotificationKind::ArmyDisbanded,
        vec![army_id.to_string(), fief_name],
    );
    log::info!("{} disbanded ({} troops)", army_id, army.calc_army_size());
    Ok(army)
}

/// End-of-season update for one army.
///
/// Runs a week's attrition check for every remaining day, dissolves armies
/// that fell below strength (siege defenders excepted), and resets the day
/// budget and upkeep of the survivors.
#[instrument(skip_all, name = "update_army")]
pub fn update_army(
    state: &mut WorldState,
    army_id: &ArmyId,
    ctx: &mut SimContext,
) -> Result<SeasonOutcome, ActionError> {
    let army = state.army(army_id)?;
    let role = siege_role(state, army);
    let siege_id = match role {
        SiegeRole::NotInvolved => None,
        _ => state.get_location(army).and_then(|f| f.siege),
    };

    let attrition_applies = if role.is_defender() {
        siege_id
            .and_then(|id| state.sieges.get(&id))
            .map(|siege| defender_attrition_applies(state, siege, ctx.config))
            .unwrap_or(true)
    } else {
        true
    };
    let checks = if attrition_applies {
        checks_for_days(army.days)
    } else {
        0
    };

    let lost = run_attrition_checks(state, army_id, checks, ctx.rng);
    if let Some(siege_id) = siege_id {
        record_casualties(state, siege_id, role, lost);
    }
    report_losses(state, army_id, lost, ctx);

    let army = state.army(army_id)?;
    if !role.is_defender() && army.calc_army_size() < DISSOLUTION_THRESHOLD {
        if let Some((army, fief_name)) =
            remove_from_field(state, army_id, SiegeEnd::BesiegerDissolved, ctx)
        {
            ctx.notify(
                &army.owner,
                NotificationKind::ArmyDissolved,
                vec![army_id.to_string(), fief_name],
            );
            log::info!(
                "{} dissolved with {} troops left",
                army_id,
                army.calc_army_size()
            );
        }
        return Ok(SeasonOutcome::Dissolved { lost });
    }

    let days = state
        .get_leader(army)
        .map(|leader| leader.days)
        .unwrap_or(SEASON_DAYS);
    if let Some(army) = state.armies.get_mut(army_id) {
        army.days = days;
        army.is_maintained = false;
    }
    if role == SiegeRole::Besieger {
        if let Some(siege_id) = siege_id {
            sync_siege_days(state, siege_id, days);
        }
    }
    Ok(SeasonOutcome::Survived { lost })
}

/// Close the season: characters get a fresh day budget, every army is
/// updated in ID order, then the clock advances.
pub fn run_season_tick(state: &mut WorldState, ctx: &mut SimContext) -> SeasonSummary {
    for character in state.characters.values_mut() {
        character.days = SEASON_DAYS;
    }

    let mut ids: Vec<ArmyId> = state.armies.keys().cloned().collect();
    ids.sort();

    let mut summary = SeasonSummary::default();
    for id in ids {
        match update_army(state, &id, ctx) {
            Ok(SeasonOutcome::Survived { lost }) => summary.troops_lost += lost,
            Ok(SeasonOutcome::Dissolved { lost }) => {
                summary.troops_lost += lost;
                summary.dissolved.push(id);
            }
            Err(e) => {
                log::warn!("Season update skipped {}: {}", id, e);
                continue;
            }
        }
        summary.armies_updated += 1;
    }

    let previous = state.clock;
    state.clock = state.clock.advance();
    log::info!(
        "Season {} closed: {} armies updated, {} troops lost, {} dissolved",
        previous,
        summary.armies_updated,
        summary.troops_lost,
        summary.dissolved.len()
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{CharId, FiefId, SiegeId};
    use crate::state::{GameClock, Season};
    use crate::testing::{Harness, ScriptedRng, WorldStateBuilder};

    fn army(raw: &str) -> ArmyId {
        ArmyId::parse(raw).unwrap()
    }

    fn char_id(raw: &str) -> CharId {
        CharId::parse(raw).unwrap()
    }

    fn knt() -> FiefId {
        FiefId::parse("KNT01").unwrap()
    }

    /// Army_1 besieges KNT01, held by GarrisonArmy_2 with Army_3 helping.
    fn besieged() -> WorldState {
        WorldStateBuilder::new()
            .with_fief("KNT01", 100_000)
            .with_player("Char_1", "KNT01")
            .with_player("Char_2", "KNT01")
            .with_army("Army_1", "Char_1", None, "KNT01", [0, 0, 0, 0, 0, 500, 0], 90.0)
            .with_army("GarrisonArmy_2", "Char_2", None, "KNT01", [0, 0, 0, 0, 0, 150, 0], 0.0)
            .with_army("Army_3", "Char_2", None, "KNT01", [0, 0, 0, 0, 0, 300, 0], 90.0)
            .with_siege("KNT01", "Army_1", "GarrisonArmy_2")
            .additional_defender(1, "Army_3")
            .build()
    }

    #[test]
    fn test_army_below_strength_dissolves() {
        let mut state = WorldStateBuilder::new()
            .with_fief("KNT01", 100_000)
            .with_player("Char_1", "KNT01")
            .with_army("Army_1", "Char_1", None, "KNT01", [0, 0, 0, 0, 0, 150, 0], 0.0)
            .build();
        let lost = state
            .armies
            .get_mut(&army("Army_1"))
            .unwrap()
            .apply_troop_losses(0.4);
        assert_eq!(lost, 60);
        let mut harness = Harness::new(ScriptedRng::new());

        let outcome = update_army(&mut state, &army("Army_1"), &mut harness.ctx()).unwrap();

        assert_eq!(outcome, SeasonOutcome::Dissolved { lost: 0 });
        assert!(state.armies.is_empty());
        assert!(state.fiefs[&knt()].armies.is_empty());
        assert!(state.characters[&char_id("Char_1")].owned_armies().is_empty());
        let note = harness.outbox.iter().next().unwrap();
        assert_eq!(note.kind, NotificationKind::ArmyDissolved);
    }

    #[test]
    fn test_defending_garrison_is_exempt_from_dissolution() {
        let mut state = besieged();
        state
            .armies
            .get_mut(&army("GarrisonArmy_2"))
            .unwrap()
            .apply_troop_losses(0.4);
        state.armies.get_mut(&army("GarrisonArmy_2")).unwrap().is_maintained = true;
        let mut harness = Harness::new(ScriptedRng::new());

        let outcome = update_army(&mut state, &army("GarrisonArmy_2"), &mut harness.ctx()).unwrap();

        assert_eq!(outcome, SeasonOutcome::Survived { lost: 0 });
        let garrison = &state.armies[&army("GarrisonArmy_2")];
        assert_eq!(garrison.calc_army_size(), 90);
        assert_eq!(garrison.days, 90.0);
        assert!(!garrison.is_maintained);
    }

    #[test]
    fn test_supplied_defenders_skip_attrition() {
        let mut state = WorldStateBuilder::new()
            .with_fief("KNT01", 100)
            .with_player("Char_1", "KNT01")
            .with_player("Char_2", "KNT01")
            .with_army("Army_1", "Char_1", None, "KNT01", [0, 0, 0, 0, 0, 500, 0], 7.0)
            .with_army("GarrisonArmy_2", "Char_2", None, "KNT01", [0, 0, 0, 0, 0, 500, 0], 90.0)
            .with_siege("KNT01", "Army_1", "GarrisonArmy_2")
            .build();
        state.fiefs.get_mut(&knt()).unwrap().bailiff = Some(char_id("Char_2"));
        state.characters.get_mut(&char_id("Char_2")).unwrap().management = 8.0;
        // Pressure 5 => chance 100, every roll hits
        let mut harness = Harness::new(ScriptedRng::new().percents(&[0.0; 12]));

        let outcome = update_army(&mut state, &army("GarrisonArmy_2"), &mut harness.ctx()).unwrap();
        assert_eq!(outcome, SeasonOutcome::Survived { lost: 0 });
        assert_eq!(state.armies[&army("GarrisonArmy_2")].calc_army_size(), 500);

        // The besieger is not supplied
        let outcome = update_army(&mut state, &army("Army_1"), &mut harness.ctx()).unwrap();
        // One week: 500 / 100 pressure, half the army lost
        assert_eq!(outcome, SeasonOutcome::Survived { lost: 250 });
        assert_eq!(state.sieges[&SiegeId(1)].besieger_casualties, 250);
    }

    #[test]
    fn test_dissolving_besieger_ends_siege() {
        let mut state = besieged();
        state.armies.get_mut(&army("Army_1")).unwrap().troops = [0, 0, 0, 0, 0, 50, 0];
        state.armies.get_mut(&army("Army_1")).unwrap().days = 0.0;
        let mut harness = Harness::new(ScriptedRng::new());

        let outcome = update_army(&mut state, &army("Army_1"), &mut harness.ctx()).unwrap();

        assert_eq!(outcome, SeasonOutcome::Dissolved { lost: 0 });
        assert!(state.sieges.is_empty());
        assert!(state.fiefs[&knt()].siege.is_none());
    }

    #[test]
    fn test_survivor_takes_leader_days() {
        let mut state = WorldStateBuilder::new()
            .with_fief("KNT01", 100_000)
            .with_player("Char_1", "KNT01")
            .with_army("Army_1", "Char_1", Some("Char_1"), "KNT01", [0, 0, 0, 0, 0, 500, 0], 10.0)
            .build();
        state.characters.get_mut(&char_id("Char_1")).unwrap().days = 72.0;
        let mut harness = Harness::new(ScriptedRng::new());

        update_army(&mut state, &army("Army_1"), &mut harness.ctx()).unwrap();
        assert_eq!(state.armies[&army("Army_1")].days, 72.0);
    }

    #[test]
    fn test_disband_additional_defender_keeps_siege() {
        let mut state = besieged();
        let mut harness = Harness::new(ScriptedRng::new());

        let removed = disband_army(&mut state, &army("Army_3"), &mut harness.ctx()).unwrap();

        assert_eq!(removed.id, army("Army_3"));
        assert_eq!(state.sieges[&SiegeId(1)].additional_defender, None);
        assert_eq!(state.fiefs[&knt()].armies.len(), 2);
        assert_eq!(harness.outbox.len(), 1);
    }

    #[test]
    fn test_disband_besieger_or_garrison_ends_siege() {
        for id in ["Army_1", "GarrisonArmy_2"] {
            let mut state = besieged();
            let mut harness = Harness::new(ScriptedRng::new());
            disband_army(&mut state, &army(id), &mut harness.ctx()).unwrap();
            assert!(state.sieges.is_empty());
            assert!(!state.armies.contains_key(&army(id)));
            // Two siege notices and the disband notice
            assert_eq!(harness.outbox.len(), 3);
        }
    }

    #[test]
    fn test_disband_unknown_army() {
        let mut state = besieged();
        let mut harness = Harness::new(ScriptedRng::new());
        assert!(disband_army(&mut state, &army("Army_9"), &mut harness.ctx()).is_err());
    }

    #[test]
    fn test_season_tick() {
        let mut state = WorldStateBuilder::new()
            .season(Season::Winter)
            .with_fief("KNT01", 100_000)
            .with_player("Char_1", "KNT01")
            .with_army("Army_1", "Char_1", Some("Char_1"), "KNT01", [0, 0, 0, 0, 0, 500, 0], 30.0)
            .with_army("Army_2", "Char_1", None, "KNT01", [0, 0, 0, 0, 0, 40, 0], 30.0)
            .build();
        state.characters.get_mut(&char_id("Char_1")).unwrap().days = 3.0;
        let mut harness = Harness::new(ScriptedRng::new());

        let summary = run_season_tick(&mut state, &mut harness.ctx());

        assert_eq!(summary.armies_updated, 2);
        assert_eq!(summary.dissolved, vec![army("Army_2")]);
        assert_eq!(state.clock, GameClock::new(1195, Season::Spring));
        assert_eq!(state.armies[&army("Army_1")].days, 90.0);
    }

    #[test]
    fn test_season_tick_is_deterministic() {
        let build = || {
            WorldStateBuilder::new()
                .with_fief("KNT01", 800)
                .with_player("Char_1", "KNT01")
                .with_army("Army_1", "Char_1", None, "KNT01", [5, 5, 5, 5, 5, 500, 200], 90.0)
                .build()
        };
        let run = || {
            let mut state = build();
            let rng = ScriptedRng::new().percents(&[0.0, 50.0, 0.0, 99.0, 0.0]);
            let mut harness = Harness::new(rng);
            run_season_tick(&mut state, &mut harness.ctx());
            state.checksum()
        };
        assert_eq!(run(), run());
    }
}
