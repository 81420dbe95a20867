//! Enumeration types for the SkillQuest platform.
//!
//! Every enum here is stored as `TEXT` in `PostgreSQL` and travels as a
//! snake-case string over JSON. The `wire_names!` macro keeps the string
//! form, [`FromStr`](core::str::FromStr) and [`Display`](core::fmt::Display)
//! in one place per type so the API and both stores agree on spelling.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A string did not name any variant of the target enum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value:?}")]
pub struct ParseEnumError {
    /// The enum that was being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

/// Implements `as_str`, `ALL`, `FromStr` and `Display` from one name table.
macro_rules! wire_names {
    ($ty:ident, $kind:literal { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The canonical storage and wire name of this variant.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $name),+
                }
            }
        }

        impl core::str::FromStr for $ty {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(Self::$variant),)+
                    other => Err(ParseEnumError {
                        kind: $kind,
                        value: other.to_owned(),
                    }),
                }
            }
        }

        impl core::fmt::Display for $ty {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// Platform role of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Role {
    /// Trainee who plays characters and submits quests.
    Nachwuchskraft,
    /// Instructor who creates, assigns and grades quests.
    Dozent,
    /// Administrator with access to user management.
    Admin,
}

wire_names!(Role, "role" {
    Nachwuchskraft => "nachwuchskraft",
    Dozent => "dozent",
    Admin => "admin",
});

impl Role {
    /// Whether this role may author and grade quests.
    pub const fn can_author_quests(self) -> bool {
        matches!(self, Self::Dozent | Self::Admin)
    }
}

// ---------------------------------------------------------------------------
// Character attributes
// ---------------------------------------------------------------------------

/// One of the six skill attributes every character carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Attribute {
    /// Software development.
    Programming,
    /// Networking and infrastructure.
    Networking,
    /// Database design and querying.
    Databases,
    /// Hardware and electronics.
    Hardware,
    /// IT security.
    Security,
    /// Project management and planning.
    ProjectManagement,
}

wire_names!(Attribute, "attribute" {
    Programming => "programming",
    Networking => "networking",
    Databases => "databases",
    Hardware => "hardware",
    Security => "security",
    ProjectManagement => "project_management",
});

// ---------------------------------------------------------------------------
// Quests
// ---------------------------------------------------------------------------

/// Difficulty tier of a quest. Drives the scaled XP suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Difficulty {
    /// Entry-level task.
    Easy,
    /// Standard task.
    Medium,
    /// Demanding task.
    Hard,
}

wire_names!(Difficulty, "difficulty" {
    Easy => "easy",
    Medium => "medium",
    Hard => "hard",
});

impl Difficulty {
    /// Parse a free-form difficulty label.
    ///
    /// Unrecognized labels fall back to [`Difficulty::Easy`], which is the
    /// tier whose XP base is the floor for unknown input.
    pub fn from_label(label: &str) -> Self {
        label
            .trim()
            .to_ascii_lowercase()
            .parse()
            .unwrap_or(Self::Easy)
    }
}

/// How a quest's XP reward was chosen by its author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum XpScaling {
    /// The author supplies the XP value explicitly.
    Fixed,
    /// XP is derived from difficulty and minimum level unless overridden.
    Scaled,
}

wire_names!(XpScaling, "xp_scaling" {
    Fixed => "fixed",
    Scaled => "scaled",
});

/// Status of a character's progress on one quest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum QuestStatus {
    /// Visible and not yet started.
    Available,
    /// Started by the character.
    InProgress,
    /// Work handed in, waiting for a grade.
    Submitted,
    /// Approved or directly completed. Rewards have been granted.
    Completed,
    /// Graded as rejected. May be resubmitted.
    Rejected,
    /// Deadline passed before completion.
    Failed,
}

wire_names!(QuestStatus, "quest status" {
    Available => "available",
    InProgress => "in_progress",
    Submitted => "submitted",
    Completed => "completed",
    Rejected => "rejected",
    Failed => "failed",
});

/// An instructor's verdict on a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum GradeDecision {
    /// The submission passes and the quest rewards are granted.
    Approved,
    /// The submission fails. Feedback is mandatory.
    Rejected,
}

wire_names!(GradeDecision, "grade" {
    Approved => "approved",
    Rejected => "rejected",
});

/// Recurrence interval of a repeatable quest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum RepeatInterval {
    /// Every day at the configured time.
    Daily,
    /// Every week on the configured weekday.
    Weekly,
    /// Every month on the configured day.
    Monthly,
}

wire_names!(RepeatInterval, "repeat interval" {
    Daily => "daily",
    Weekly => "weekly",
    Monthly => "monthly",
});

// ---------------------------------------------------------------------------
// Equipment and achievements
// ---------------------------------------------------------------------------

/// Rarity tier of an equipment item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Rarity {
    /// Default tier.
    Common,
    /// Slightly harder to obtain.
    Uncommon,
    /// Rare reward.
    Rare,
    /// Very rare reward.
    Epic,
    /// Top tier.
    Legendary,
}

wire_names!(Rarity, "rarity" {
    Common => "common",
    Uncommon => "uncommon",
    Rare => "rare",
    Epic => "epic",
    Legendary => "legendary",
});

/// Which character statistic an achievement threshold is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum RequirementKind {
    /// Character level.
    Level,
    /// Highest single attribute.
    Stat,
    /// Number of completed quests.
    QuestCount,
    /// Number of owned equipment items.
    EquipmentCount,
}

wire_names!(RequirementKind, "requirement" {
    Level => "level",
    Stat => "stat",
    QuestCount => "quest_count",
    EquipmentCount => "equipment_count",
});

// ---------------------------------------------------------------------------
// Social
// ---------------------------------------------------------------------------

/// Ranking criterion for leaderboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum LeaderboardKind {
    /// Level, then banked XP.
    Level,
    /// Sum of all six attributes.
    Stats,
    /// Number of unlocked achievements.
    Achievements,
    /// Number of completed quests.
    Quests,
}

wire_names!(LeaderboardKind, "leaderboard" {
    Level => "level",
    Stats => "stats",
    Achievements => "achievements",
    Quests => "quests",
});

/// Event that produced a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum NotificationKind {
    /// A quest was assigned to the recipient.
    QuestAssigned,
    /// A trainee handed in work on one of the recipient's quests.
    SubmissionReceived,
    /// One of the recipient's submissions was graded.
    SubmissionGraded,
}

wire_names!(NotificationKind, "notification" {
    QuestAssigned => "quest_assigned",
    SubmissionReceived => "submission_received",
    SubmissionGraded => "submission_graded",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_match_serde() {
        for status in QuestStatus::ALL {
            let json = serde_json::to_string(status).ok();
            assert_eq!(json, Some(format!("\"{}\"", status.as_str())));
        }
        for attribute in Attribute::ALL {
            let json = serde_json::to_string(attribute).ok();
            assert_eq!(json, Some(format!("\"{}\"", attribute.as_str())));
        }
    }

    #[test]
    fn from_str_round_trips_every_status() {
        for status in QuestStatus::ALL {
            assert_eq!(status.as_str().parse::<QuestStatus>(), Ok(*status));
        }
    }

    #[test]
    fn unknown_value_is_rejected() {
        let err = "graded".parse::<QuestStatus>();
        assert!(err.is_err());
    }

    #[test]
    fn difficulty_label_falls_back_to_easy() {
        assert_eq!(Difficulty::from_label("Hard"), Difficulty::Hard);
        assert_eq!(Difficulty::from_label(" medium "), Difficulty::Medium);
        assert_eq!(Difficulty::from_label("legendary"), Difficulty::Easy);
        assert_eq!(Difficulty::from_label(""), Difficulty::Easy);
    }

    #[test]
    fn only_instructors_and_admins_author_quests() {
        assert!(!Role::Nachwuchskraft.can_author_quests());
        assert!(Role::Dozent.can_author_quests());
        assert!(Role::Admin.can_author_quests());
    }
}
