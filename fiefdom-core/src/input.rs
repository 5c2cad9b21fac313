use crate::ids::{ArmyId, CharId, FiefId, TransferId};
use serde::{Deserialize, Serialize};

/// Commands issued by one player in a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerInputs {
    pub player: CharId,
    pub commands: Vec<Command>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    // Upkeep and orders
    Maintain {
        army: ArmyId,
    },
    StandingOrders {
        army: ArmyId,
        aggression: i32,
        combat_odds: i32,
    },
    AssignLeader {
        army: ArmyId,
        leader: Option<CharId>,
    },

    // Movement
    /// Leader travels to `target` and the army follows.
    March {
        army: ArmyId,
        target: FiefId,
        travel_cost: f64,
    },
    MoveWithoutLeader {
        army: ArmyId,
        target: FiefId,
        travel_cost: f64,
    },

    // Detachments
    Detach {
        army: ArmyId,
        troops: Vec<u32>,
        recipient: CharId,
    },
    PickUp {
        army: ArmyId,
        transfers: Vec<TransferId>,
    },

    // Military
    Attack {
        army: ArmyId,
        target: ArmyId,
    },
    Disband {
        army: ArmyId,
    },
    /// Observe any army; the issuer is the observer.
    Estimate {
        army: ArmyId,
    },
}

impl Command {
    /// Army the command acts on.
    pub fn army(&self) -> &ArmyId {
        match self {
            Command::Maintain { army }
            | Command::StandingOrders { army, .. }
            | Command::AssignLeader { army, .. }
            | Command::March { army, .. }
            | Command::MoveWithoutLeader { army, .. }
            | Command::Detach { army, .. }
            | Command::PickUp { army, .. }
            | Command::Attack { army, .. }
            | Command::Disband { army }
            | Command::Estimate { army } => army,
        }
    }

    /// Whether only the army's owner may issue this command.
    pub fn requires_ownership(&self) -> bool {
        !matches!(self, Command::Estimate { .. })
    }
}
