//! Outbound player notifications.
//!
//! The engine never delivers messages itself. Every operation that has
//! something to tell a player pushes a [`Notification`] into the
//! [`NotificationSink`] it was handed; the surrounding server decides how
//! (and whether) to deliver it.
//!
//! # Architecture
//!
//! ```text
//! NotificationSink trait
//!        │
//!        ├── Outbox    (in-memory queue, drained by the server / tests)
//!        └── JsonlSink (one JSON line per notification)
//! ```

pub mod event_log;

pub use event_log::JsonlSink;

use crate::ids::CharId;
use serde::{Deserialize, Serialize};

/// Message kinds understood by the delivery layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Attrition losses outside of movement. Fields: army, troops lost, fief.
    AttritionLosses,
    /// Losses on the march. Fields: army, troops lost, destination name.
    MoveLosses,
    /// Army fell below strength and dissolved. Fields: army, fief.
    ArmyDissolved,
    ArmyDisbanded,
    /// Fields: transfer, troops, fief, sender.
    DetachmentLeft,
    /// Pickup skipped some transfers. Fields: army, collected, skipped list.
    NotAllCollected,
    /// Fields: siege, fief, reason.
    SiegeEnded,
    /// Fields: army, fief.
    ArmyRetreated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: CharId,
    pub kind: NotificationKind,
    pub fields: Vec<String>,
}

/// Destination for notifications produced during an operation.
pub trait NotificationSink {
    fn notify(&mut self, notification: Notification);
}

/// In-memory queue of undelivered notifications.
#[derive(Debug, Default, Clone)]
pub struct Outbox {
    pending: Vec<Notification>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.pending.iter()
    }

    /// Take everything queued so far.
    pub fn drain(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.pending)
    }

    pub fn for_recipient<'a>(
        &'a self,
        recipient: &'a CharId,
    ) -> impl Iterator<Item = &'a Notification> + 'a {
        self.pending.iter().filter(move |n| &n.recipient == recipient)
    }
}

impl NotificationSink for Outbox {
    fn notify(&mut self, notification: Notification) {
        log::trace!(
            "Queued {:?} for {}: {:?}",
            notification.kind,
            notification.recipient,
            notification.fields
        );
        self.pending.push(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(to: &str, kind: NotificationKind) -> Notification {
        Notification {
            recipient: CharId::parse(to).unwrap(),
            kind,
            fields: vec!["Army_1".into()],
        }
    }

    #[test]
    fn test_outbox_queues_and_drains() {
        let mut outbox = Outbox::new();
        outbox.notify(note("Char_1", NotificationKind::ArmyDisbanded));
        outbox.notify(note("Char_2", NotificationKind::SiegeEnded));
        outbox.notify(note("Char_1", NotificationKind::MoveLosses));

        let char1 = CharId::parse("Char_1").unwrap();
        assert_eq!(outbox.for_recipient(&char1).count(), 2);
        assert_eq!(outbox.len(), 3);

        let drained = outbox.drain();
        assert_eq!(drained.len(), 3);
        assert!(outbox.is_empty());
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&NotificationKind::NotAllCollected).unwrap();
        assert_eq!(json, "\"not_all_collected\"");
    }
}
