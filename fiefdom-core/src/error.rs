use crate::ids::{ArmyId, CharId, FiefId, TransferId};
use crate::validation::ValidationError;
use thiserror::Error;

/// What an operation ran short of.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    #[error("days")]
    Days,
    #[error("troops")]
    Troops,
    #[error("treasury")]
    Treasury,
}

/// Reference to an entity that could not be resolved.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Missing {
    #[error("army {0}")]
    Army(ArmyId),
    #[error("character {0}")]
    Character(CharId),
    #[error("player {0}")]
    Player(CharId),
    #[error("fief {0}")]
    Fief(FiefId),
    #[error("transfer {0}")]
    Transfer(TransferId),
    #[error("home fief of {0}")]
    HomeFief(CharId),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    /// Transfer left for someone other than the collecting army's owner.
    #[error("{transfer} was left for {recipient}")]
    WrongRecipient {
        transfer: TransferId,
        recipient: CharId,
    },
    #[error("an army cannot attack its own side")]
    AttackOwnArmy,
    /// Issuer does not own the army it is trying to command.
    #[error("{issuer} does not own {army}")]
    NotOwner { army: ArmyId, issuer: CharId },
    /// Leader is neither the army's owner nor one of the owner's retainers.
    #[error("{leader} does not serve {owner}")]
    NotInService { leader: CharId, owner: CharId },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Conflict {
    #[error("army is already maintained this season")]
    AlreadyMaintained,
    #[error("army has no leader")]
    NoLeader,
    #[error("target is a besieged garrison")]
    BesiegedTarget,
    #[error("parties are not in the same fief")]
    DifferentLocation,
    /// Army is not listed in the fief it claims to be in.
    #[error("{army} is not listed in {fief}")]
    NotInFief { army: ArmyId, fief: FiefId },
    #[error("{0} is already registered")]
    DuplicateArmy(ArmyId),
}

/// Typed rejection returned by every army operation.
///
/// Nothing is mutated when one of these is returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActionError {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),
    #[error("insufficient {resource}: required {required}, available {available}")]
    InsufficientResource {
        resource: Resource,
        required: f64,
        available: f64,
    },
    #[error("permission denied: {0}")]
    PermissionDenied(Denial),
    #[error("not found: {0}")]
    NotFound(Missing),
    #[error("state conflict: {0}")]
    StateConflict(Conflict),
}

impl ActionError {
    pub fn insufficient_days(required: f64, available: f64) -> Self {
        ActionError::InsufficientResource {
            resource: Resource::Days,
            required,
            available,
        }
    }

    pub fn is_insufficient_days(&self) -> bool {
        matches!(
            self,
            ActionError::InsufficientResource {
                resource: Resource::Days,
                ..
            }
        )
    }

    /// Numeric shortfall for display, when the error carries one.
    pub fn shortfall(&self) -> Option<f64> {
        match self {
            ActionError::InsufficientResource {
                required,
                available,
                ..
            } => Some(required - available),
            _ => None,
        }
    }
}
