//! Movement between fiefs.
//!
//! An army with a leader travels with him: the leader's movement is validated
//! and applied first, then [`move_army`] brings the army to wherever the
//! leader ended up. A leaderless army can still be marched with
//! [`move_without_leader`] if the caller supplies the route cost.

use crate::error::{ActionError, Conflict, Missing};
use crate::ids::{ArmyId, FiefId};
use crate::observer::NotificationKind;
use crate::state::WorldState;
use crate::validation;
use rustc_hash::FxHashMap;
use tracing::instrument;

use super::attrition::run_attrition_checks;
use super::siege::{end_siege, siege_role, SiegeEnd, SiegeRole};
use super::SimContext;

/// Map collaborator: which fiefs border which, and what the trip costs.
pub trait MapService {
    fn neighbours(&self, fief: &FiefId) -> Vec<FiefId>;
    fn travel_cost(&self, from: &FiefId, to: &FiefId) -> Option<f64>;
}

/// Undirected adjacency list with a day cost per edge.
#[derive(Debug, Default, Clone)]
pub struct TravelMap {
    edges: FxHashMap<FiefId, Vec<(FiefId, f64)>>,
}

impl TravelMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&mut self, a: &FiefId, b: &FiefId, cost: f64) {
        self.edges.entry(a.clone()).or_default().push((b.clone(), cost));
        self.edges.entry(b.clone()).or_default().push((a.clone(), cost));
    }
}

impl MapService for TravelMap {
    fn neighbours(&self, fief: &FiefId) -> Vec<FiefId> {
        let mut out: Vec<FiefId> = self
            .edges
            .get(fief)
            .map(|e| e.iter().map(|(to, _)| to.clone()).collect())
            .unwrap_or_default();
        out.sort();
        out
    }

    fn travel_cost(&self, from: &FiefId, to: &FiefId) -> Option<f64> {
        self.edges
            .get(from)?
            .iter()
            .find(|(f, _)| f == to)
            .map(|(_, cost)| *cost)
    }
}

/// The army must be listed in the fief it claims to stand in.
fn check_origin(state: &WorldState, army_id: &ArmyId) -> Result<FiefId, ActionError> {
    let army = state.army(army_id)?;
    let origin = state.fief(&army.location)?;
    if !origin.armies.contains(army_id) {
        return Err(ActionError::StateConflict(Conflict::NotInFief {
            army: army_id.clone(),
            fief: origin.id.clone(),
        }));
    }
    Ok(origin.id.clone())
}

/// Relink the army from one fief's army list to another's.
fn relocate(state: &mut WorldState, army_id: &ArmyId, from: &FiefId, to: &FiefId) {
    if let Some(origin) = state.fiefs.get_mut(from) {
        origin.remove_army(army_id);
    }
    if let Some(dest) = state.fiefs.get_mut(to) {
        dest.add_army(army_id.clone());
    }
    if let Some(army) = state.armies.get_mut(army_id) {
        army.location = to.clone();
    }
}

fn report_move_losses(state: &WorldState, army_id: &ArmyId, lost: u32, ctx: &mut SimContext) {
    if lost == 0 {
        return;
    }
    if let Some(army) = state.armies.get(army_id) {
        let destination = state
            .get_location(army)
            .map(|f| f.name.clone())
            .unwrap_or_else(|| army.location.to_string());
        ctx.notify(
            &army.owner,
            NotificationKind::MoveLosses,
            vec![army_id.to_string(), lost.to_string(), destination],
        );
    }
}

/// Bring an army to its leader after the leader has moved.
///
/// The army adopts the leader's location and remaining days, then takes one
/// attrition check. Returns troops lost on the way.
#[instrument(skip_all, name = "move_army")]
pub fn move_army(
    state: &mut WorldState,
    army_id: &ArmyId,
    ctx: &mut SimContext,
) -> Result<u32, ActionError> {
    let origin = check_origin(state, army_id)?;
    let army = state.army(army_id)?;
    let leader_id = army
        .leader
        .clone()
        .ok_or(ActionError::StateConflict(Conflict::NoLeader))?;
    let leader = state.character(&leader_id)?;
    let (destination, days) = (leader.location.clone(), leader.days);
    state.fief(&destination)?;

    relocate(state, army_id, &origin, &destination);
    if let Some(army) = state.armies.get_mut(army_id) {
        army.days = days;
    }

    let lost = run_attrition_checks(state, army_id, 1, ctx.rng);
    report_move_losses(state, army_id, lost, ctx);

    log::debug!(
        "{} moved {} -> {} ({:.1} days left, {} lost)",
        army_id,
        origin,
        destination,
        days,
        lost
    );
    Ok(lost)
}

/// Escorted move: the leader travels to `target` at `travel_cost` days and
/// the army follows.
pub fn march(
    state: &mut WorldState,
    army_id: &ArmyId,
    target: &FiefId,
    travel_cost: f64,
    ctx: &mut SimContext,
) -> Result<u32, ActionError> {
    let travel_cost = validation::validate_travel_cost(travel_cost)?;
    check_origin(state, army_id)?;
    state.fief(target)?;
    let army = state.army(army_id)?;
    let leader_id = army
        .leader
        .clone()
        .ok_or(ActionError::StateConflict(Conflict::NoLeader))?;
    let leader = state.character(&leader_id)?;
    if leader.days < travel_cost {
        return Err(ActionError::insufficient_days(travel_cost, leader.days));
    }

    if let Some(leader) = state.characters.get_mut(&leader_id) {
        leader.location = target.clone();
        leader.days -= travel_cost;
    }
    move_army(state, army_id, ctx)
}

/// Move an army with no leader, paying `travel_cost` from its own days.
#[instrument(skip_all, name = "move_without_leader")]
pub fn move_without_leader(
    state: &mut WorldState,
    army_id: &ArmyId,
    target: &FiefId,
    travel_cost: f64,
    ctx: &mut SimContext,
) -> Result<u32, ActionError> {
    let travel_cost = validation::validate_travel_cost(travel_cost)?;
    let army = state.army(army_id)?;
    if army.days < travel_cost {
        return Err(ActionError::insufficient_days(travel_cost, army.days));
    }
    let origin = check_origin(state, army_id)?;
    state.fief(target)?;

    relocate(state, army_id, &origin, target);
    if let Some(army) = state.armies.get_mut(army_id) {
        army.days -= travel_cost;
    }

    let lost = run_attrition_checks(state, army_id, 1, ctx.rng);
    report_move_losses(state, army_id, lost, ctx);
    Ok(lost)
}

/// Fall back to a random neighbouring fief after a lost battle.
///
/// No day check: a retreat always happens, with days clamped at zero. The
/// leader goes along. A retreating besieger abandons its siege; a defending
/// garrison cannot leave its keep and stays put. Returns the fief retreated
/// to, or `None` if the army did not move.
pub fn retreat_army(
    state: &mut WorldState,
    army_id: &ArmyId,
    map: &dyn MapService,
    ctx: &mut SimContext,
) -> Result<Option<FiefId>, ActionError> {
    let origin = check_origin(state, army_id)?;
    let army = state.army(army_id)?;
    let role = siege_role(state, army);
    if role == SiegeRole::DefendingGarrison {
        return Ok(None);
    }

    let options: Vec<FiefId> = map
        .neighbours(&origin)
        .into_iter()
        .filter(|f| state.fiefs.contains_key(f))
        .collect();
    if options.is_empty() {
        log::debug!("{} has nowhere to retreat from {}", army_id, origin);
        return Ok(None);
    }
    let pick = ctx.rng.range_inclusive(0, options.len() as u32 - 1) as usize;
    let destination = options[pick.min(options.len() - 1)].clone();
    let cost = map.travel_cost(&origin, &destination).unwrap_or(0.0);

    if let Some(siege_id) = state.fiefs.get(&origin).and_then(|f| f.siege) {
        match role {
            SiegeRole::Besieger => {
                end_siege(state, siege_id, SiegeEnd::BesiegerRetreated, ctx);
            }
            SiegeRole::AdditionalDefender => {
                if let Some(siege) = state.sieges.get_mut(&siege_id) {
                    siege.additional_defender = None;
                }
            }
            _ => {}
        }
    }

    relocate(state, army_id, &origin, &destination);
    let (owner, leader, days) = match state.armies.get_mut(army_id) {
        Some(army) => {
            army.days = (army.days - cost).max(0.0);
            (army.owner.clone(), army.leader.clone(), army.days)
        }
        None => return Err(ActionError::NotFound(Missing::Army(army_id.clone()))),
    };
    if let Some(leader) = leader.and_then(|l| state.characters.get_mut(&l)) {
        leader.location = destination.clone();
        leader.days = days;
    }

    ctx.notify(
        &owner,
        NotificationKind::ArmyRetreated,
        vec![army_id.to_string(), destination.to_string()],
    );
    Ok(Some(destination))
}
