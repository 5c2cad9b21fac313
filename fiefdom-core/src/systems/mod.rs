//! Army lifecycle systems.

pub mod attrition;
pub mod combat;
pub mod detachment;
pub mod lifecycle;
pub mod movement;
pub mod orders;
pub mod siege;

pub use attrition::{apply_troop_losses, calc_attrition, run_attrition_checks};
pub use combat::{
    calculate_battle_values, calculate_combat_value, calculate_troop_type_advantages,
    checks_before_attack, standing_order_response, AttackClearance, Response,
};
pub use detachment::{create_detachment, process_pickups, DetachmentReceipt, PickupReport};
pub use lifecycle::{disband_army, run_season_tick, update_army, SeasonOutcome, SeasonSummary};
pub use movement::{march, move_army, move_without_leader, retreat_army, MapService, TravelMap};
pub use orders::{adjust_standing_orders, assign_new_leader, get_troops_estimate, maintain_army};
pub use siege::{end_siege, siege_role, sync_siege_days, SiegeEnd, SiegeRole};

use crate::config::SimConfig;
use crate::ids::CharId;
use crate::observer::{Notification, NotificationKind, NotificationSink};
use crate::rng::RandomSource;

/// Collaborators every operation may draw on: tunables, the random source
/// and the outbound notification sink.
pub struct SimContext<'a> {
    pub config: &'a SimConfig,
    pub rng: &'a mut dyn RandomSource,
    pub notices: &'a mut dyn NotificationSink,
}

impl<'a> SimContext<'a> {
    pub fn new(
        config: &'a SimConfig,
        rng: &'a mut dyn RandomSource,
        notices: &'a mut dyn NotificationSink,
    ) -> Self {
        Self {
            config,
            rng,
            notices,
        }
    }

    pub fn notify(&mut self, recipient: &CharId, kind: NotificationKind, fields: Vec<String>) {
        self.notices.notify(Notification {
            recipient: recipient.clone(),
            kind,
            fields,
        });
    }
}
