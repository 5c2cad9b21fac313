//! # Fiefdom Core
//!
//! Army lifecycle and combat-resolution engine for a persistent, season-based
//! strategy game.
//!
//! Armies are troop collections with an owner, an optional leader, a location
//! and standing orders. This crate moves them between fiefs, bleeds them with
//! attrition, splits and merges detachments, values them for battle and
//! carries them through sieges and season boundaries.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────────┐
//! │ PlayerInputs │────▶│ SharedWorld  │────▶│ execute_command  │
//! │ (commands)   │     │ (world lock) │     │ (ownership check)│
//! └──────────────┘     └──────────────┘     └────────┬─────────┘
//!                                                    │
//!                      ┌──────────────┐     ┌────────▼─────────┐
//!                      │ Notification │◀────│ systems::*       │
//!                      │ Sink         │     │ (WorldState mut) │
//!                      └──────────────┘     └──────────────────┘
//! ```
//!
//! ## Key Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`WorldState`] | Registries of armies, characters, fiefs and sieges |
//! | [`Army`] | The central entity, built through [`Army::new`] |
//! | [`Command`] | Player actions (March, Detach, PickUp, Attack, ...) |
//! | [`SharedWorld`] | Lock-protected world shared by command handlers |
//! | [`ActionError`] | Typed rejection; nothing is mutated when returned |
//! | [`NotificationSink`] | Outbound player messages |
//!
//! Randomness is drawn through [`RandomSource`] so every outcome can be
//! replayed from a seed or scripted in tests.

pub mod bounded;
pub mod config;
pub mod defines;
pub mod error;
pub mod ids;
pub mod input;
pub mod observer;
pub mod rng;
pub mod state;
pub mod step;
pub mod systems;
pub mod testing;
pub mod validation;

pub use bounded::BoundedInt;
pub use config::{SimConfig, TroopAdvantage};
pub use error::ActionError;
pub use ids::{ArmyId, CharId, FiefId, SiegeId, TransferId};
pub use input::{Command, PlayerInputs};
pub use observer::{JsonlSink, Notification, NotificationKind, NotificationSink, Outbox};
pub use rng::{RandomSource, SeededRng};
pub use state::{Army, Character, Fief, NewArmy, Season, Siege, Troops, WorldState};
pub use step::{execute_command, Outcome, SharedWorld};
pub use systems::{MapService, SimContext, TravelMap};
pub use validation::ValidationError;
