//! Core entity structs for the SkillQuest platform.
//!
//! Characters, quests, submissions, equipment, achievements, groups and
//! notifications, plus the progression value types they embed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{
    Attribute, Difficulty, GradeDecision, NotificationKind, QuestStatus, Rarity, RepeatInterval,
    RequirementKind, Role,
};
use crate::ids::{
    AchievementId, CharacterId, EquipmentId, GroupId, NotificationId, QuestId, SubmissionId,
    UserId,
};

// ---------------------------------------------------------------------------
// Progression values
// ---------------------------------------------------------------------------

/// The six attribute values of a character, or a per-attribute delta.
///
/// Characters hold values in `0..=100`. The same shape carries quest
/// attribute rewards and equipment bonuses, where zero means "no change".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Attributes {
    /// Software development.
    #[serde(default)]
    pub programming: u32,
    /// Networking and infrastructure.
    #[serde(default)]
    pub networking: u32,
    /// Database design and querying.
    #[serde(default)]
    pub databases: u32,
    /// Hardware and electronics.
    #[serde(default)]
    pub hardware: u32,
    /// IT security.
    #[serde(default)]
    pub security: u32,
    /// Project management and planning.
    #[serde(default)]
    pub project_management: u32,
}

impl Attributes {
    /// Attribute value every new character starts with.
    pub const STARTING_VALUE: u32 = 10;

    /// All six attributes set to the same value.
    pub const fn uniform(value: u32) -> Self {
        Self {
            programming: value,
            networking: value,
            databases: value,
            hardware: value,
            security: value,
            project_management: value,
        }
    }

    /// Attributes of a freshly created character.
    pub const fn starting() -> Self {
        Self::uniform(Self::STARTING_VALUE)
    }

    /// Read one attribute.
    pub const fn get(&self, attribute: Attribute) -> u32 {
        match attribute {
            Attribute::Programming => self.programming,
            Attribute::Networking => self.networking,
            Attribute::Databases => self.databases,
            Attribute::Hardware => self.hardware,
            Attribute::Security => self.security,
            Attribute::ProjectManagement => self.project_management,
        }
    }

    /// Overwrite one attribute.
    pub const fn set(&mut self, attribute: Attribute, value: u32) {
        match attribute {
            Attribute::Programming => self.programming = value,
            Attribute::Networking => self.networking = value,
            Attribute::Databases => self.databases = value,
            Attribute::Hardware => self.hardware = value,
            Attribute::Security => self.security = value,
            Attribute::ProjectManagement => self.project_management = value,
        }
    }

    /// Pairs of attribute and value, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (Attribute, u32)> + '_ {
        Attribute::ALL.iter().map(|a| (*a, self.get(*a)))
    }

    /// Sum of all six values. Used by the stats leaderboard.
    pub fn total(&self) -> u64 {
        self.iter().map(|(_, v)| u64::from(v)).sum()
    }

    /// Highest single value. Used by `stat` achievements.
    pub fn highest(&self) -> u32 {
        self.iter().map(|(_, v)| v).max().unwrap_or(0)
    }

    /// Whether every value is zero.
    pub fn is_zero(&self) -> bool {
        self.iter().all(|(_, v)| v == 0)
    }
}

/// The mutable progression state of a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ProgressionState {
    /// Current level, `1..=50`.
    pub level: u32,
    /// XP banked within the current level.
    pub xp: u32,
    /// XP needed to leave the current level.
    pub xp_to_next_level: u32,
    /// Current attribute values.
    pub attributes: Attributes,
}

/// Everything a quest grants on approval or direct completion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RewardBundle {
    /// XP added through the award loop.
    pub xp_reward: u32,
    /// Added to the character's attributes, each clamped at 100.
    pub attribute_rewards: Attributes,
    /// Whether this quest grants a title.
    pub is_title_quest: bool,
    /// The title granted when `is_title_quest` is set.
    pub title_reward: Option<String>,
    /// Equipment granted once per character.
    pub equipment_reward_id: Option<EquipmentId>,
}

impl RewardBundle {
    /// The title to grant, if any. Blank titles count as none.
    pub fn granted_title(&self) -> Option<&str> {
        if !self.is_title_quest {
            return None;
        }
        self.title_reward
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Users and characters
// ---------------------------------------------------------------------------

/// A platform user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct User {
    /// Unique identifier.
    pub id: UserId,
    /// Unique login name.
    pub username: String,
    /// Platform role.
    pub role: Role,
    /// Admin flag, kept in sync with [`Role::Admin`].
    pub is_admin: bool,
    /// The super admin's role can never be changed.
    pub is_super_admin: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// A user's RPG character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Character {
    /// Unique identifier.
    pub id: CharacterId,
    /// Owning user.
    pub user_id: UserId,
    /// Display name.
    pub name: String,
    /// Active title shown next to the name.
    pub title: String,
    /// Level, XP and attributes.
    #[serde(flatten)]
    pub progression: ProgressionState,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// A title a character has earned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CharacterTitle {
    /// Title text.
    pub title: String,
    /// Whether this is the displayed title.
    pub is_active: bool,
    /// When it was first earned.
    pub unlocked_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Quests
// ---------------------------------------------------------------------------

/// Recurrence rule of a repeatable quest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RepeatSchedule {
    /// How often the quest reopens.
    pub interval: RepeatInterval,
    /// Time of day in `HH:MM` (UTC).
    pub time: String,
    /// Weekday for weekly quests, `0` = Sunday through `6` = Saturday.
    pub day_of_week: Option<u8>,
    /// Day of month for monthly quests, `1..=31`.
    pub day_of_month: Option<u8>,
}

/// A quest authored by an instructor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Quest {
    /// Unique identifier.
    pub id: QuestId,
    /// Short title.
    pub title: String,
    /// Task description.
    pub description: String,
    /// Free-form category label.
    pub category: Option<String>,
    /// Difficulty tier.
    pub difficulty: Difficulty,
    /// Rewards granted on completion.
    #[serde(flatten)]
    pub rewards: RewardBundle,
    /// Equipment the character must own to start.
    pub required_equipment_id: Option<EquipmentId>,
    /// Lowest character level that sees and may start the quest.
    pub min_level: u32,
    /// Quest that should be completed first. Informational.
    pub prerequisite_quest_id: Option<QuestId>,
    /// Authoring instructor. Only they may grade submissions.
    pub created_by: Option<UserId>,
    /// Recurrence rule for repeatable quests.
    pub repeat: Option<RepeatSchedule>,
    /// Deadline after which unfinished progress fails.
    pub due_date: Option<DateTime<Utc>>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// A character's progress on one quest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct QuestProgress {
    /// Unique identifier, also used as the submission ID.
    pub id: SubmissionId,
    /// The character.
    pub character_id: CharacterId,
    /// The quest.
    pub quest_id: QuestId,
    /// Lifecycle status.
    pub status: QuestStatus,
    /// When the character started.
    pub started_at: Option<DateTime<Utc>>,
    /// When work was last handed in.
    pub submitted_at: Option<DateTime<Utc>>,
    /// Submitted text.
    pub submission_text: Option<String>,
    /// Link to an uploaded file.
    pub submission_file_url: Option<String>,
    /// Verdict on the current submission.
    pub grade: Option<GradeDecision>,
    /// Instructor feedback.
    pub feedback: Option<String>,
    /// When the current submission was graded.
    pub graded_at: Option<DateTime<Utc>>,
    /// Who graded it.
    pub graded_by: Option<UserId>,
    /// When the quest was completed.
    pub completed_at: Option<DateTime<Utc>>,
    /// Most recent completion, kept across repeat cycles.
    pub last_completed_at: Option<DateTime<Utc>>,
}

/// A quest as seen by one character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CharacterQuest {
    /// The quest definition.
    #[serde(flatten)]
    pub quest: Quest,
    /// Status, `available` when the character has no progress row yet.
    pub status: QuestStatus,
    /// The progress row, if any.
    pub progress: Option<QuestProgress>,
    /// Whether the character owns the required equipment (true when none is required).
    pub has_required_equipment: bool,
    /// Whether the quest cannot be started because equipment is missing.
    pub is_locked: bool,
}

/// A submission joined with its character and owner, for grading views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SubmissionView {
    /// The progress row.
    #[serde(flatten)]
    pub progress: QuestProgress,
    /// Character name.
    pub character_name: String,
    /// Owner's username.
    pub username: String,
}

/// A quest with author-facing counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct QuestOverview {
    /// The quest.
    #[serde(flatten)]
    pub quest: Quest,
    /// Number of assignments.
    pub assignment_count: u64,
    /// Number of progress rows waiting for a grade.
    pub pending_submissions: u64,
}

/// Rewards actually granted by a grading or completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GrantedRewards {
    /// XP added.
    pub xp: u32,
    /// Attribute deltas requested by the quest.
    pub attributes: Attributes,
    /// Title granted, if any.
    pub title: Option<String>,
    /// Equipment granted, if any.
    pub equipment_id: Option<EquipmentId>,
    /// Levels gained by the award loop.
    pub levels_gained: u32,
}

// ---------------------------------------------------------------------------
// Equipment and achievements
// ---------------------------------------------------------------------------

/// An item in the equipment catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Equipment {
    /// Unique identifier.
    pub id: EquipmentId,
    /// Display name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Free-form item category such as `laptop` or `certification`.
    pub kind: String,
    /// Rarity tier.
    pub rarity: Rarity,
    /// Attribute bonuses shown on the item.
    pub bonuses: Attributes,
    /// Suggested minimum level.
    pub min_level: u32,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// An equipment item owned by a character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct OwnedEquipment {
    /// The catalogue entry.
    #[serde(flatten)]
    pub equipment: Equipment,
    /// Whether the item is equipped.
    pub equipped: bool,
    /// When it was acquired.
    pub acquired_at: DateTime<Utc>,
}

/// An achievement definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Achievement {
    /// Unique identifier.
    pub id: AchievementId,
    /// Display name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Icon name or emoji.
    pub icon: Option<String>,
    /// Grouping label.
    pub category: String,
    /// XP granted on unlock.
    pub xp_reward: u32,
    /// Statistic the threshold applies to.
    pub requirement_kind: RequirementKind,
    /// Threshold that unlocks the achievement.
    pub requirement_value: u32,
}

/// An achievement with the viewing character's unlock state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CharacterAchievement {
    /// The definition.
    #[serde(flatten)]
    pub achievement: Achievement,
    /// When it was unlocked, if it was.
    pub unlocked_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Social
// ---------------------------------------------------------------------------

/// One row of a leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LeaderboardEntry {
    /// One-based rank.
    pub rank: u32,
    /// The character.
    pub character_id: CharacterId,
    /// Character name.
    pub name: String,
    /// Active title.
    pub title: String,
    /// Owner's username.
    pub username: String,
    /// Character level.
    pub level: u32,
    /// Ranking score for the requested board.
    pub score: u64,
}

/// A learner group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Group {
    /// Unique identifier.
    pub id: GroupId,
    /// Unique group name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Creating user.
    pub created_by: Option<UserId>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// A group with its member count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GroupSummary {
    /// The group.
    #[serde(flatten)]
    pub group: Group,
    /// Number of members.
    pub member_count: u64,
}

/// A member of a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GroupMember {
    /// The user.
    pub user_id: UserId,
    /// Username.
    pub username: String,
    /// Role.
    pub role: Role,
    /// When they joined.
    pub joined_at: DateTime<Utc>,
}

/// A group with its members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GroupDetail {
    /// The group.
    #[serde(flatten)]
    pub group: Group,
    /// Members ordered by username.
    pub members: Vec<GroupMember>,
}

/// An in-app notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Notification {
    /// Unique identifier.
    pub id: NotificationId,
    /// Recipient.
    pub user_id: UserId,
    /// What happened.
    pub kind: NotificationKind,
    /// Headline.
    pub title: String,
    /// Body text.
    pub message: String,
    /// Whether the recipient has read it.
    pub is_read: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// When it was read.
    pub read_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starting_attributes_are_ten_each() {
        let attrs = Attributes::starting();
        assert!(attrs.iter().all(|(_, v)| v == 10));
        assert_eq!(attrs.total(), 60);
    }

    #[test]
    fn set_then_get_touches_one_attribute() {
        let mut attrs = Attributes::default();
        attrs.set(Attribute::Security, 42);
        assert_eq!(attrs.get(Attribute::Security), 42);
        assert_eq!(attrs.highest(), 42);
        assert_eq!(attrs.total(), 42);
    }

    #[test]
    fn missing_attribute_fields_default_to_zero() {
        let parsed: Result<Attributes, _> = serde_json::from_str(r#"{"programming": 5}"#);
        let attrs = parsed.ok().unwrap_or_default();
        assert_eq!(attrs.programming, 5);
        assert_eq!(attrs.networking, 0);
    }

    #[test]
    fn granted_title_requires_flag_and_text() {
        let mut bundle = RewardBundle {
            xp_reward: 0,
            attribute_rewards: Attributes::default(),
            is_title_quest: false,
            title_reward: Some(String::from("Netzwerk-Guru")),
            equipment_reward_id: None,
        };
        assert_eq!(bundle.granted_title(), None);
        bundle.is_title_quest = true;
        assert_eq!(bundle.granted_title(), Some("Netzwerk-Guru"));
        bundle.title_reward = Some(String::from("   "));
        assert_eq!(bundle.granted_title(), None);
    }
}
