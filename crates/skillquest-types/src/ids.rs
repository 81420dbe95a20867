//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Users, characters, quests and the rest each get their own ID type so a
//! character ID can never be passed where a quest ID is expected. All IDs
//! are UUID v7 (time-ordered) and generated app-side, which keeps the
//! in-memory store and `PostgreSQL` on the same key scheme.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a platform user (trainee, instructor or admin).
    UserId
}

define_id! {
    /// Unique identifier for a character owned by a user.
    CharacterId
}

define_id! {
    /// Unique identifier for a quest.
    QuestId
}

define_id! {
    /// Unique identifier for a character's progress row on one quest.
    ///
    /// Instructors grade these rows, so the API calls them submissions.
    SubmissionId
}

define_id! {
    /// Unique identifier for an equipment catalogue item.
    EquipmentId
}

define_id! {
    /// Unique identifier for an achievement definition.
    AchievementId
}

define_id! {
    /// Unique identifier for a learner group.
    GroupId
}

define_id! {
    /// Unique identifier for a quest assignment to a user or group.
    AssignmentId
}

define_id! {
    /// Unique identifier for an in-app notification.
    NotificationId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_time_ordered() {
        let first = QuestId::new();
        let second = QuestId::new();
        assert_ne!(first.into_inner(), Uuid::nil());
        assert!(first <= second);
    }

    #[test]
    fn id_serializes_as_bare_uuid() {
        let id = CharacterId::new();
        let json = serde_json::to_string(&id).ok();
        assert_eq!(json, Some(format!("\"{}\"", id.into_inner())));
    }

    #[test]
    fn id_display_matches_uuid() {
        let id = SubmissionId::new();
        assert_eq!(id.to_string(), id.into_inner().to_string());
    }
}
