//! Attrition system - population pressure and weekly casualties.
//!
//! An army eats its way through the fief it stands in. The chance of losing
//! men each week grows with the ratio of soldiers to local population, falls
//! with a capable leader, and rises in winter and spring. Maintained armies
//! are supplied by their owner and never suffer attrition.

use crate::defines::{attrition as defines, days::DAYS_PER_ATTRITION_CHECK};
use crate::ids::ArmyId;
use crate::observer::NotificationKind;
use crate::rng::RandomSource;
use crate::state::{Army, WorldState};
use tracing::instrument;

use super::SimContext;

/// Roll for attrition once and return the casualty modifier to apply
/// (0 when no attrition occurs).
///
/// Pure apart from the single random draw.
pub fn calc_attrition(state: &WorldState, army: &Army, rng: &mut dyn RandomSource) -> f64 {
    if army.is_maintained {
        return 0.0;
    }

    let fief = match state.get_location(army) {
        Some(f) => f,
        None => {
            log::warn!(
                "{} stands in unknown fief {}; skipping attrition",
                army.id,
                army.location
            );
            return 0.0;
        }
    };

    let pressure = army.calc_army_size() as f64 / fief.population.max(1) as f64;
    let mut chance = pressure * 100.0;

    if let Some(leader) = state.get_leader(army) {
        chance -= (leader.stature + leader.management) / 2.0;
    }

    let harsh = state.clock.season.is_harsh();
    if harsh {
        chance += defines::HARSH_SEASON_BONUS;
    }

    let chance = chance.clamp(defines::MIN_CHANCE, defines::MAX_CHANCE);
    let roll = rng.percent();
    if roll > chance {
        return 0.0;
    }

    let mut modifier = pressure / defines::CASUALTY_DIVISOR;
    if harsh {
        modifier *= defines::HARSH_SEASON_MULTIPLIER;
    }

    log::trace!(
        "Attrition on {}: chance {:.1}, roll {:.1}, modifier {:.4}",
        army.id,
        chance,
        roll,
        modifier
    );
    modifier.min(defines::MAX_CASUALTY_MODIFIER)
}

/// Apply a casualty modifier to every troop type; returns troops lost.
pub fn apply_troop_losses(army: &mut Army, modifier: f64) -> u32 {
    army.apply_troop_losses(modifier)
}

/// Number of weekly attrition checks covered by a span of days.
pub fn checks_for_days(days: f64) -> u32 {
    (days / DAYS_PER_ATTRITION_CHECK).floor().max(0.0) as u32
}

/// Run `checks` sequential attrition rolls on a registered army, each roll
/// seeing the counts left by the previous one. Returns total troops lost.
#[instrument(skip_all, name = "attrition")]
pub fn run_attrition_checks(
    state: &mut WorldState,
    army_id: &ArmyId,
    checks: u32,
    rng: &mut dyn RandomSource,
) -> u32 {
    let mut lost = 0;
    for _ in 0..checks {
        let modifier = match state.armies.get(army_id) {
            Some(army) => calc_attrition(state, army, rng),
            None => return lost,
        };
        if modifier > 0.0 {
            if let Some(army) = state.armies.get_mut(army_id) {
                lost += army.apply_troop_losses(modifier);
            }
        }
    }
    lost
}

/// Same as [`run_attrition_checks`] for an army that is not registered
/// (e.g. a detachment being brought up to date).
pub fn run_detached_attrition_checks(
    state: &WorldState,
    army: &mut Army,
    checks: u32,
    rng: &mut dyn RandomSource,
) -> u32 {
    let mut lost = 0;
    for _ in 0..checks {
        let modifier = calc_attrition(state, army, rng);
        if modifier > 0.0 {
            lost += army.apply_troop_losses(modifier);
        }
    }
    lost
}

/// Tell the owner about attrition losses, if there were any.
pub(crate) fn report_losses(state: &WorldState, army_id: &ArmyId, lost: u32, ctx: &mut SimContext) {
    if lost == 0 {
        return;
    }
    if let Some(army) = state.armies.get(army_id) {
        let fief_name = state
            .get_location(army)
            .map(|f| f.name.clone())
            .unwrap_or_else(|| army.location.to_string());
        ctx.notify(
            &army.owner,
            NotificationKind::AttritionLosses,
            vec![army_id.to_string(), lost.to_string(), fief_name],
        );
    }
}
