//! Detachments - splitting troops off into a fief and collecting them again.
//!
//! A split parks troops in the army's current fief under a transfer ID,
//! addressed to a recipient player. A pickup merges one or more parked
//! transfers into a collecting army. Every transfer keeps its own day
//! budget, so on pickup each one is aged (with attrition) down to the
//! common minimum before the troops are merged.

use crate::defines::{
    transfer as defines,
    troops::{RABBLE, TROOP_TYPES},
};
use crate::error::{ActionError, Conflict, Denial, Missing, Resource};
use crate::ids::{ArmyId, CharId, TransferId};
use crate::observer::NotificationKind;
use crate::state::{Army, Detachment, Troops, WorldState};
use crate::validation;
use tracing::instrument;

use super::attrition::{
    checks_for_days, report_losses, run_attrition_checks, run_detached_attrition_checks,
};
use super::SimContext;

/// Outcome of a successful split.
#[derive(Debug, Clone, PartialEq)]
pub struct DetachmentReceipt {
    pub transfer: TransferId,
    /// Days the split took to organise
    pub duration: u32,
    pub troops: Troops,
    /// Attrition suffered by the source army while organising
    pub lost: u32,
}

/// Outcome of a pickup. `not_all_collected` is set whenever a requested
/// transfer was left behind.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PickupReport {
    pub collected: Vec<TransferId>,
    pub skipped: Vec<TransferId>,
    /// Troops merged into the army, after ageing losses
    pub troops_added: u32,
    /// Losses while bringing transfers up to the common day budget
    pub ageing_losses: u32,
    /// Losses suffered by the collecting army afterwards
    pub lost: u32,
    pub not_all_collected: bool,
}

impl PickupReport {
    pub fn message(&self) -> String {
        if self.not_all_collected {
            let skipped: Vec<String> = self.skipped.iter().map(ToString::to_string).collect();
            format!(
                "Collected {} troops from {} transfer(s); not all were collected \
                 ({} had too few days left)",
                self.troops_added,
                self.collected.len(),
                skipped.join(", ")
            )
        } else {
            format!(
                "Collected {} troops from {} transfer(s)",
                self.troops_added,
                self.collected.len()
            )
        }
    }
}

fn draw_duration(ctx: &mut SimContext) -> u32 {
    ctx.rng
        .range_inclusive(defines::MIN_DURATION, defines::MAX_DURATION)
}

/// Split troops out of an army into a transfer parked in its current fief.
///
/// Checks run in a fixed order and the first failure is returned with
/// nothing mutated. Rabble are not checked against stock; a request for more
/// rabble than the army holds sends what there is, and a request that would
/// send nothing at all is rejected.
#[instrument(skip_all, name = "create_detachment")]
pub fn create_detachment(
    state: &mut WorldState,
    army_id: &ArmyId,
    requested: &[u32],
    recipient: &CharId,
    ctx: &mut SimContext,
) -> Result<DetachmentReceipt, ActionError> {
    let mut troops = validation::validate_troop_array(requested)?;
    let army = state.army(army_id)?;

    for kind in 0..RABBLE {
        if troops[kind] > army.troops[kind] {
            return Err(ActionError::InsufficientResource {
                resource: Resource::Troops,
                required: troops[kind] as f64,
                available: army.troops[kind] as f64,
            });
        }
    }
    troops[RABBLE] = troops[RABBLE].min(army.troops[RABBLE]);
    let total: u32 = troops.iter().sum();
    if total < 1 {
        return Err(ActionError::InsufficientResource {
            resource: Resource::Troops,
            required: 1.0,
            available: 0.0,
        });
    }
    if army.days < defines::MIN_DAYS {
        return Err(ActionError::insufficient_days(defines::MIN_DAYS, army.days));
    }
    let duration = draw_duration(ctx);
    if duration as f64 > army.days {
        log::debug!(
            "{} failed to organise a detachment: needs {} days, has {:.1}",
            army_id,
            duration,
            army.days
        );
        return Err(ActionError::insufficient_days(duration as f64, army.days));
    }
    if !state.is_player(recipient) {
        return Err(ActionError::NotFound(Missing::Player(recipient.clone())));
    }
    let leader_id = army
        .leader
        .clone()
        .ok_or(ActionError::StateConflict(Conflict::NoLeader))?;
    state.character(&leader_id)?;
    let fief_name = state.fief(&army.location)?.name.clone();

    // All checks passed; from here the split runs to completion.
    let transfer = state.issue_transfer_id();
    let (owner, location, detachment_days) = match state.armies.get_mut(army_id) {
        Some(army) => {
            for (held, sent) in army.troops.iter_mut().zip(&troops) {
                *held -= sent;
            }
            let detachment_days = army.days - duration as f64;
            army.days = detachment_days.max(0.0);
            (army.owner.clone(), army.location.clone(), detachment_days)
        }
        None => return Err(ActionError::NotFound(Missing::Army(army_id.clone()))),
    };
    if let Some(fief) = state.fiefs.get_mut(&location) {
        fief.transfers.insert(
            transfer,
            Detachment {
                id: transfer,
                left_by: owner.clone(),
                left_for: recipient.clone(),
                troops,
                days: detachment_days,
            },
        );
    }
    if let Some(leader) = state.characters.get_mut(&leader_id) {
        leader.days = (leader.days - duration as f64).max(0.0);
    }

    let lost = run_attrition_checks(state, army_id, checks_for_days(duration as f64), ctx.rng);
    report_losses(state, army_id, lost, ctx);

    let sent: u32 = troops.iter().sum();
    ctx.notify(
        recipient,
        NotificationKind::DetachmentLeft,
        vec![
            transfer.to_string(),
            sent.to_string(),
            fief_name,
            owner.to_string(),
        ],
    );
    log::info!(
        "{} left {} troops as {} for {} ({} days to organise)",
        army_id,
        sent,
        transfer,
        recipient,
        duration
    );

    Ok(DetachmentReceipt {
        transfer,
        duration,
        troops,
        lost,
    })
}

/// Merge parked transfers in the army's fief into the army.
///
/// A transfer addressed to anyone but the army's owner rejects the whole
/// batch before anything is consumed. Transfers with fewer days left than
/// the drawn pickup duration are left in place and reported.
#[instrument(skip_all, name = "process_pickups")]
pub fn process_pickups(
    state: &mut WorldState,
    army_id: &ArmyId,
    transfers: &[TransferId],
    ctx: &mut SimContext,
) -> Result<PickupReport, ActionError> {
    let army = state.army(army_id)?;
    let fief = state.fief(&army.location)?;

    if army.days < defines::MIN_DAYS {
        return Err(ActionError::insufficient_days(defines::MIN_DAYS, army.days));
    }

    let mut requested: Vec<(TransferId, f64)> = Vec::with_capacity(transfers.len());
    for id in transfers {
        let detachment = fief
            .transfers
            .get(id)
            .ok_or_else(|| ActionError::NotFound(Missing::Transfer(*id)))?;
        if detachment.left_for != army.owner {
            return Err(ActionError::PermissionDenied(Denial::WrongRecipient {
                transfer: *id,
                recipient: detachment.left_for.clone(),
            }));
        }
        if !requested.iter().any(|(seen, _)| seen == id) {
            requested.push((*id, detachment.days));
        }
    }
    if requested.is_empty() {
        return Ok(PickupReport::default());
    }

    let owner = army.owner.clone();
    let location = army.location.clone();
    let army_days = army.days;

    let duration = draw_duration(ctx) as f64;
    let (included, skipped): (Vec<_>, Vec<_>) = requested
        .into_iter()
        .partition(|(_, days)| *days >= duration);
    let mut report = PickupReport {
        skipped: skipped.into_iter().map(|(id, _)| id).collect(),
        ..Default::default()
    };
    report.not_all_collected = !report.skipped.is_empty();

    if !included.is_empty() {
        let min_days = included
            .iter()
            .map(|(_, days)| *days)
            .fold(army_days, f64::min);

        let mut gathered: Troops = [0; TROOP_TYPES];
        for (id, _) in &included {
            let Some(detachment) = state
                .fiefs
                .get_mut(&location)
                .and_then(|f| f.transfers.remove(id))
            else {
                continue;
            };
            let mut payload = Army::transient(
                owner.clone(),
                location.clone(),
                detachment.troops,
                detachment.days,
            );
            let checks = checks_for_days(detachment.days - min_days);
            report.ageing_losses +=
                run_detached_attrition_checks(state, &mut payload, checks, ctx.rng);
            for (total, t) in gathered.iter_mut().zip(&payload.troops) {
                *total += t;
            }
            report.collected.push(*id);
        }

        // Time the army spent waiting for the slowest transfer counts
        // towards the pickup duration.
        let waited = army_days - min_days;
        let remaining = (duration - waited).max(0.0);
        let new_days = (min_days - remaining).max(0.0);

        let leader = match state.armies.get_mut(army_id) {
            Some(army) => {
                army.add_troops(&gathered);
                army.days = new_days;
                army.leader.clone()
            }
            None => return Err(ActionError::NotFound(Missing::Army(army_id.clone()))),
        };
        if let Some(leader) = leader.and_then(|l| state.characters.get_mut(&l)) {
            leader.days = new_days;
        }

        report.troops_added = gathered.iter().sum();
        let checks = checks_for_days(army_days - new_days);
        report.lost = run_attrition_checks(state, army_id, checks, ctx.rng);
        report_losses(state, army_id, report.lost, ctx);
    }

    if report.not_all_collected {
        let skipped: Vec<String> = report.skipped.iter().map(ToString::to_string).collect();
        ctx.notify(
            &owner,
            NotificationKind::NotAllCollected,
            vec![
                army_id.to_string(),
                report.troops_added.to_string(),
                skipped.join(","),
            ],
        );
    }
    log::debug!("{}: {}", army_id, report.message());
    Ok(report)
}
