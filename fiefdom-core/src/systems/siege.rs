//! Siege hooks - role detection, day synchronisation and termination.
//!
//! Siege progress itself is run elsewhere. The army engine only needs to know
//! which side of a siege an army is on (it changes attrition and dissolution
//! policy), keep the siege's day budget in step with the armies, and end the
//! siege when its besieger leaves the field.

use crate::config::SimConfig;
use crate::ids::{ArmyId, SiegeId};
use crate::observer::NotificationKind;
use crate::state::{Army, Siege, WorldState};

use super::SimContext;

/// An army's relationship to the siege (if any) in its current fief.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiegeRole {
    NotInvolved,
    Besieger,
    DefendingGarrison,
    AdditionalDefender,
}

impl SiegeRole {
    pub fn is_defender(self) -> bool {
        matches!(
            self,
            SiegeRole::DefendingGarrison | SiegeRole::AdditionalDefender
        )
    }
}

/// Why a siege was called off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiegeEnd {
    BesiegerDisbanded,
    BesiegerDissolved,
    BesiegerAttacked,
    BesiegerRetreated,
    GarrisonDisbanded,
}

impl SiegeEnd {
    fn describe(self) -> &'static str {
        match self {
            SiegeEnd::BesiegerDisbanded => "besieging army disbanded",
            SiegeEnd::BesiegerDissolved => "besieging army dissolved",
            SiegeEnd::BesiegerAttacked => "besieging army left to attack",
            SiegeEnd::BesiegerRetreated => "besieging army retreated",
            SiegeEnd::GarrisonDisbanded => "defending garrison disbanded",
        }
    }
}

/// The active siege in the army's fief, if there is one.
pub fn active_siege<'a>(state: &'a WorldState, army: &Army) -> Option<&'a Siege> {
    state
        .get_location(army)
        .and_then(|fief| fief.siege)
        .and_then(|id| state.sieges.get(&id))
}

/// Classify the army against the siege in its current fief.
///
/// Recomputed on every call; never cached on the army.
pub fn siege_role(state: &WorldState, army: &Army) -> SiegeRole {
    let Some(siege) = active_siege(state, army) else {
        return SiegeRole::NotInvolved;
    };
    if siege.besieging_army == army.id {
        SiegeRole::Besieger
    } else if siege.defending_garrison == army.id {
        SiegeRole::DefendingGarrison
    } else if siege.additional_defender.as_ref() == Some(&army.id) {
        SiegeRole::AdditionalDefender
    } else {
        SiegeRole::NotInvolved
    }
}

/// Whether besieged defenders suffer attrition this season.
///
/// A bailiff with enough management keeps the garrison supplied.
pub fn defender_attrition_applies(state: &WorldState, siege: &Siege, config: &SimConfig) -> bool {
    let bailiff = state
        .fiefs
        .get(&siege.fief)
        .and_then(|f| f.bailiff.as_ref())
        .and_then(|id| state.characters.get(id));
    match bailiff {
        Some(b) => b.management < config.siege_supply_management,
        None => true,
    }
}

/// Attribute attrition losses to the siege's casualty counters.
pub fn record_casualties(state: &mut WorldState, siege_id: SiegeId, role: SiegeRole, lost: u32) {
    if let Some(siege) = state.sieges.get_mut(&siege_id) {
        match role {
            SiegeRole::Besieger => siege.besieger_casualties += lost,
            SiegeRole::DefendingGarrison | SiegeRole::AdditionalDefender => {
                siege.defender_casualties += lost
            }
            SiegeRole::NotInvolved => {}
        }
    }
}

/// Bring the siege and every army (and leader) involved to the same day budget.
pub fn sync_siege_days(state: &mut WorldState, siege_id: SiegeId, days: f64) {
    let involved: Vec<ArmyId> = match state.sieges.get_mut(&siege_id) {
        Some(siege) => {
            siege.days = days;
            std::iter::once(siege.besieging_army.clone())
                .chain(std::iter::once(siege.defending_garrison.clone()))
                .chain(siege.additional_defender.clone())
                .collect()
        }
        None => return,
    };

    for army_id in involved {
        let leader = match state.armies.get_mut(&army_id) {
            Some(army) => {
                army.days = days;
                army.leader.clone()
            }
            None => continue,
        };
        if let Some(leader) = leader.and_then(|l| state.characters.get_mut(&l)) {
            leader.days = days;
        }
    }
    log::debug!("{} synchronised to {:.1} days", siege_id, days);
}

/// Call off a siege, clearing it from the registry and its fief, and tell
/// both sides.
pub fn end_siege(
    state: &mut WorldState,
    siege_id: SiegeId,
    reason: SiegeEnd,
    ctx: &mut SimContext,
) -> Option<Siege> {
    let siege = state.sieges.remove(&siege_id)?;
    let fief_name = match state.fiefs.get_mut(&siege.fief) {
        Some(fief) => {
            if fief.siege == Some(siege_id) {
                fief.siege = None;
            }
            fief.name.clone()
        }
        None => siege.fief.to_string(),
    };

    log::info!("{} at {} ended: {}", siege_id, fief_name, reason.describe());
    for recipient in [&siege.besieger_owner, &siege.defender_owner] {
        ctx.notify(
            recipient,
            NotificationKind::SiegeEnded,
            vec![
                siege_id.to_string(),
                fief_name.clone(),
                reason.describe().to_string(),
            ],
        );
    }
    Some(siege)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{CharId, FiefId};
    use crate::testing::{Harness, ScriptedRng, WorldStateBuilder};

    fn sieged_world() -> WorldState {
        WorldStateBuilder::new()
            .with_fief("KNT01", 3000)
            .with_player("Char_1", "KNT01")
            .with_player("Char_2", "KNT01")
            .with_army("Army_1", "Char_1", Some("Char_1"), "KNT01", [0, 0, 0, 0, 0, 500, 0], 80.0)
            .with_army("GarrisonArmy_2", "Char_2", None, "KNT01", [0, 0, 0, 0, 0, 200, 0], 90.0)
            .with_army("Army_3", "Char_2", Some("Char_2"), "KNT01", [0, 0, 0, 0, 0, 300, 0], 70.0)
            .with_army("Army_4", "Char_1", None, "KNT01", [0, 0, 0, 0, 0, 50, 0], 90.0)
            .with_siege("KNT01", "Army_1", "GarrisonArmy_2")
            .additional_defender(1, "Army_3")
            .build()
    }

    fn role_of(state: &WorldState, id: &str) -> SiegeRole {
        siege_role(state, &state.armies[&ArmyId::parse(id).unwrap()])
    }

    #[test]
    fn test_roles() {
        let state = sieged_world();
        assert_eq!(role_of(&state, "Army_1"), SiegeRole::Besieger);
        assert_eq!(role_of(&state, "GarrisonArmy_2"), SiegeRole::DefendingGarrison);
        assert_eq!(role_of(&state, "Army_3"), SiegeRole::AdditionalDefender);
        assert_eq!(role_of(&state, "Army_4"), SiegeRole::NotInvolved);
        assert!(SiegeRole::AdditionalDefender.is_defender());
        assert!(!SiegeRole::Besieger.is_defender());
    }

    #[test]
    fn test_role_is_recomputed_after_siege_ends() {
        let mut state = sieged_world();
        let mut harness = Harness::new(ScriptedRng::new());

        let reason = SiegeEnd::BesiegerDisbanded;
        let ended = end_siege(&mut state, SiegeId(1), reason, &mut harness.ctx());
        assert!(ended.is_some());
        assert_eq!(role_of(&state, "Army_1"), SiegeRole::NotInvolved);
        assert!(state.fiefs[&FiefId::parse("KNT01").unwrap()].siege.is_none());
        assert_eq!(harness.outbox.len(), 2);

        // Ending twice is a no-op
        assert!(end_siege(&mut state, SiegeId(1), reason, &mut harness.ctx()).is_none());
    }

    #[test]
    fn test_bailiff_supply_policy() {
        let mut state = sieged_world();
        let config = SimConfig::default();
        let siege = state.sieges[&SiegeId(1)].clone();
        assert!(defender_attrition_applies(&state, &siege, &config));

        let bailiff = CharId::parse("Char_2").unwrap();
        state.fiefs.get_mut(&siege.fief).unwrap().bailiff = Some(bailiff.clone());
        state.characters.get_mut(&bailiff).unwrap().management = 4.0;
        assert!(defender_attrition_applies(&state, &siege, &config));

        state.characters.get_mut(&bailiff).unwrap().management = 7.0;
        assert!(!defender_attrition_applies(&state, &siege, &config));
    }

    #[test]
    fn test_sync_days_and_casualties() {
        let mut state = sieged_world();
        sync_siege_days(&mut state, SiegeId(1), 42.0);

        for id in ["Army_1", "GarrisonArmy_2", "Army_3"] {
            assert_eq!(state.armies[&ArmyId::parse(id).unwrap()].days, 42.0);
        }
        assert_eq!(state.armies[&ArmyId::parse("Army_4").unwrap()].days, 90.0);
        assert_eq!(state.characters[&CharId::parse("Char_1").unwrap()].days, 42.0);

        record_casualties(&mut state, SiegeId(1), SiegeRole::Besieger, 12);
        record_casualties(&mut state, SiegeId(1), SiegeRole::AdditionalDefender, 5);
        let siege = &state.sieges[&SiegeId(1)];
        assert_eq!((siege.besieger_casualties, siege.defender_casualties), (12, 5));
    }
}
