//! Typed identifiers.
//!
//! Entities reference each other by ID and resolve through the registries in
//! [`WorldState`](crate::state::WorldState). Each kind of ID has its own type
//! so an army ID can never be handed to a fief lookup.

use crate::defines::army as defines;
use crate::validation::{self, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $validate:path) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Normalize and validate a raw identifier.
            pub fn parse(raw: &str) -> Result<Self, ValidationError> {
                $validate(raw).map(Self)
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = ValidationError;

            fn try_from(raw: &str) -> Result<Self, Self::Error> {
                Self::parse(raw)
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(raw: String) -> Result<Self, Self::Error> {
                Self::parse(&raw)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> String {
                id.0
            }
        }
    };
}

string_id!(
    /// `Army_<n>` or `GarrisonArmy_<n>`.
    ArmyId,
    validation::validate_army_id
);
string_id!(
    /// `Char_<n>`, shared by player and non-player characters.
    CharId,
    validation::validate_char_id
);
string_id!(
    /// Five-character place code, e.g. `ESX02`.
    FiefId,
    validation::validate_place_id
);

impl ArmyId {
    pub fn field(n: u32) -> Self {
        Self(format!("{}{}", defines::ARMY_PREFIX, n))
    }

    pub fn garrison(n: u32) -> Self {
        Self(format!("{}{}", defines::GARRISON_PREFIX, n))
    }

    pub fn is_garrison(&self) -> bool {
        self.0.starts_with(defines::GARRISON_PREFIX)
    }
}

/// Key of a pending detachment in a fief's transfer table.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TransferId(pub u32);

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Transfer_{}", self.0)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SiegeId(pub u32);

impl fmt::Display for SiegeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Siege_{}", self.0)
    }
}
