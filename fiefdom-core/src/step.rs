//! Command dispatch and the shared, lock-protected world.
//!
//! Player commands may arrive concurrently. [`SharedWorld`] serialises them
//! behind one world lock: every command holds the write lock for its whole
//! run, so multi-entity operations never interleave and the season sweep is
//! a world-wide pause point.

use crate::config::SimConfig;
use crate::error::{ActionError, Denial, Missing};
use crate::ids::{ArmyId, CharId, FiefId, SiegeId};
use crate::input::{Command, PlayerInputs};
use crate::observer::{Notification, Outbox};
use crate::rng::SeededRng;
use crate::state::{Troops, WorldState};
use crate::systems::{
    self, DetachmentReceipt, MapService, PickupReport, Response, SeasonSummary, SimContext,
    TravelMap,
};
use parking_lot::RwLock;
use rayon::prelude::*;

/// What a successfully executed command did.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Maintained {
        cost: f64,
    },
    StandingOrders {
        aggression: i32,
        combat_odds: i32,
    },
    LeaderAssigned,
    Moved {
        lost: u32,
    },
    Detached(DetachmentReceipt),
    PickedUp(PickupReport),
    Battle {
        ended_siege: Option<SiegeId>,
        values: [f64; 2],
        response: Response,
        retreated_to: Option<FiefId>,
    },
    Disbanded,
    Estimate(Troops),
}

/// Execute one command on behalf of `issuer`.
///
/// Everything except an estimate requires the issuer to own the army.
pub fn execute_command(
    state: &mut WorldState,
    map: &dyn MapService,
    issuer: &CharId,
    cmd: &Command,
    ctx: &mut SimContext,
) -> Result<Outcome, ActionError> {
    if !state.is_player(issuer) {
        return Err(ActionError::NotFound(Missing::Player(issuer.clone())));
    }
    let army_id = cmd.army();
    let army = state.army(army_id)?;
    if cmd.requires_ownership() && &army.owner != issuer {
        return Err(ActionError::PermissionDenied(Denial::NotOwner {
            army: army_id.clone(),
            issuer: issuer.clone(),
        }));
    }

    match cmd {
        Command::Maintain { army } => {
            systems::maintain_army(state, army, ctx).map(|cost| Outcome::Maintained { cost })
        }
        Command::StandingOrders {
            army,
            aggression,
            combat_odds,
        } => systems::adjust_standing_orders(state, army, *aggression, *combat_odds).map(
            |(aggression, combat_odds)| Outcome::StandingOrders {
                aggression,
                combat_odds,
            },
        ),
        Command::AssignLeader { army, leader } => {
            systems::assign_new_leader(state, army, leader.as_ref())
                .map(|_| Outcome::LeaderAssigned)
        }
        Command::March {
            army,
            target,
            travel_cost,
        } => systems::march(state, army, target, *travel_cost, ctx)
            .map(|lost| Outcome::Moved { lost }),
        Command::MoveWithoutLeader {
            army,
            target,
            travel_cost,
        } => systems::move_without_leader(state, army, target, *travel_cost, ctx)
            .map(|lost| Outcome::Moved { lost }),
        Command::Detach {
            army,
            troops,
            recipient,
        } => systems::create_detachment(state, army, troops, recipient, ctx)
            .map(Outcome::Detached),
        Command::PickUp { army, transfers } => {
            systems::process_pickups(state, army, transfers, ctx).map(Outcome::PickedUp)
        }
        Command::Attack { army, target } => attack(state, map, army, target, ctx),
        Command::Disband { army } => {
            systems::disband_army(state, army, ctx).map(|_| Outcome::Disbanded)
        }
        Command::Estimate { army } => {
            systems::get_troops_estimate(state, army, issuer, ctx).map(Outcome::Estimate)
        }
    }
}

/// Clear the attack, value both sides and let the defender's standing
/// orders decide whether it holds or falls back.
fn attack(
    state: &mut WorldState,
    map: &dyn MapService,
    attacker_id: &ArmyId,
    target_id: &ArmyId,
    ctx: &mut SimContext,
) -> Result<Outcome, ActionError> {
    let clearance = systems::checks_before_attack(state, attacker_id, target_id, ctx)?;
    let attacker = state.army(attacker_id)?;
    let defender = state.army(target_id)?;

    let keep_level = if clearance.target_role.is_defender() {
        state.get_location(defender).map_or(0, |f| f.keep_level)
    } else {
        0
    };
    let values =
        systems::calculate_battle_values(state, attacker, defender, keep_level, false, ctx.config);
    let response = systems::standing_order_response(state, defender, values);

    let retreated_to = match response {
        Response::Retreat => systems::retreat_army(state, target_id, map, ctx)?,
        Response::Engage => None,
    };
    Ok(Outcome::Battle {
        ended_siege: clearance.ended_siege,
        values,
        response,
        retreated_to,
    })
}

/// Run one player's commands in order. A failed command is logged and the
/// rest still run.
pub fn apply_inputs(
    state: &mut WorldState,
    map: &dyn MapService,
    inputs: &PlayerInputs,
    ctx: &mut SimContext,
) -> Vec<Result<Outcome, ActionError>> {
    inputs
        .commands
        .iter()
        .map(|cmd| {
            let result = execute_command(state, map, &inputs.player, cmd, ctx);
            if let Err(e) = &result {
                log::warn!("Failed to execute command for {}: {}", inputs.player, e);
            }
            result
        })
        .collect()
}

/// Everything a command mutates.
pub struct World {
    pub state: WorldState,
    pub rng: SeededRng,
    pub outbox: Outbox,
}

/// The authoritative world, shared between command handlers.
pub struct SharedWorld {
    config: SimConfig,
    map: TravelMap,
    inner: RwLock<World>,
}

impl SharedWorld {
    pub fn new(state: WorldState, config: SimConfig, map: TravelMap, seed: u64) -> Self {
        Self {
            config,
            map,
            inner: RwLock::new(World {
                state,
                rng: SeededRng::new(seed),
                outbox: Outbox::new(),
            }),
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Execute one command under the world lock.
    pub fn execute(&self, issuer: &CharId, cmd: &Command) -> Result<Outcome, ActionError> {
        let mut guard = self.inner.write();
        let World {
            state,
            rng,
            outbox,
        } = &mut *guard;
        let mut ctx = SimContext::new(&self.config, rng, outbox);
        execute_command(state, &self.map, issuer, cmd, &mut ctx)
    }

    /// Execute a batch of player inputs on the rayon pool.
    ///
    /// Each player's commands keep their order; commands from different
    /// players are serialised by the lock in arrival order, so the result of
    /// a batch is only reproducible if it has a single player.
    pub fn dispatch_batch(
        &self,
        batch: &[PlayerInputs],
    ) -> Vec<(CharId, Vec<Result<Outcome, ActionError>>)> {
        batch
            .par_iter()
            .map(|inputs| {
                let results = inputs
                    .commands
                    .iter()
                    .map(|cmd| self.execute(&inputs.player, cmd))
                    .collect();
                (inputs.player.clone(), results)
            })
            .collect()
    }

    /// Close the season with the world paused.
    pub fn end_season(&self) -> SeasonSummary {
        let mut guard = self.inner.write();
        let World {
            state,
            rng,
            outbox,
        } = &mut *guard;
        let mut ctx = SimContext::new(&self.config, rng, outbox);
        systems::run_season_tick(state, &mut ctx)
    }

    /// Read-only access to the current state.
    pub fn read<R>(&self, f: impl FnOnce(&WorldState) -> R) -> R {
        f(&self.inner.read().state)
    }

    pub fn drain_notifications(&self) -> Vec<Notification> {
        self.inner.write().outbox.drain()
    }

    pub fn into_state(self) -> WorldState {
        self.inner.into_inner().state
    }
}
