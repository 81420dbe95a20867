//! The [`Store`] trait: every persistent operation the platform performs.
//!
//! The API depends on `Arc<dyn Store>` only. [`PgStore`](crate::PgStore)
//! implements it on `PostgreSQL`, [`MemoryStore`](crate::MemoryStore) in
//! process memory for tests and single-node demos.
//!
//! Operations that read, decide and write (grading, completion, XP grants,
//! achievement checks, the sweep) run as one unit of work in both
//! implementations, so concurrent requests on the same character never
//! interleave between the read and the write.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use skillquest_progression::GradeRequest;
use skillquest_types::{
    Achievement, Attribute, Attributes, Character, CharacterAchievement, CharacterId,
    CharacterQuest, CharacterTitle, Difficulty, Equipment, EquipmentId, GrantedRewards, Group,
    GroupDetail, GroupId, GroupSummary, LeaderboardEntry, LeaderboardKind, Notification,
    NotificationId, OwnedEquipment, QuestId, QuestOverview, QuestProgress, Quest, Rarity,
    RepeatSchedule, RequirementKind, RewardBundle, Role, SubmissionId, SubmissionView, User,
    UserId,
};

use crate::error::DbError;

/// Title every new character starts with.
pub const STARTING_TITLE: &str = "Azubi";

/// Leaderboard size when the caller gives none.
pub const DEFAULT_LEADERBOARD_LIMIT: u32 = 10;

/// Largest leaderboard a caller may request.
pub const MAX_LEADERBOARD_LIMIT: u32 = 100;

/// Number of notifications returned per listing.
pub const NOTIFICATION_LIMIT: u32 = 50;

/// Clamp a requested leaderboard size into `1..=100`.
pub const fn leaderboard_limit(requested: Option<u32>) -> u32 {
    match requested {
        None | Some(0) => DEFAULT_LEADERBOARD_LIMIT,
        Some(n) if n > MAX_LEADERBOARD_LIMIT => MAX_LEADERBOARD_LIMIT,
        Some(n) => n,
    }
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// A user to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    /// Unique login name.
    pub username: String,
    /// Initial role.
    pub role: Role,
}

/// A character to create. Progression starts at the defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCharacter {
    /// Owning user.
    pub user_id: UserId,
    /// Display name.
    pub name: String,
}

/// An equipment catalogue entry to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEquipment {
    /// Display name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Free-form category.
    pub kind: String,
    /// Rarity tier.
    pub rarity: Rarity,
    /// Attribute bonuses.
    pub bonuses: Attributes,
    /// Suggested minimum level.
    pub min_level: u32,
}

/// A quest to create. XP is already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQuest {
    /// Short title.
    pub title: String,
    /// Task description.
    pub description: String,
    /// Category label.
    pub category: Option<String>,
    /// Difficulty tier.
    pub difficulty: Difficulty,
    /// Rewards granted on completion.
    pub rewards: RewardBundle,
    /// Equipment needed to start.
    pub required_equipment_id: Option<EquipmentId>,
    /// Minimum level.
    pub min_level: u32,
    /// Informational prerequisite.
    pub prerequisite_quest_id: Option<QuestId>,
    /// Authoring instructor.
    pub created_by: UserId,
    /// Validated repeat rule.
    pub repeat: Option<RepeatSchedule>,
    /// Deadline.
    pub due_date: Option<DateTime<Utc>>,
}

/// A partial quest update. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestPatch {
    /// New title.
    pub title: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New category.
    pub category: Option<String>,
    /// New difficulty.
    pub difficulty: Option<Difficulty>,
    /// New XP reward.
    pub xp_reward: Option<u32>,
    /// New attribute rewards.
    pub attribute_rewards: Option<Attributes>,
    /// New minimum level.
    pub min_level: Option<u32>,
    /// New deadline.
    pub due_date: Option<DateTime<Utc>>,
}

impl QuestPatch {
    /// Apply the patch to a quest in place.
    pub fn apply_to(&self, quest: &mut Quest) {
        if let Some(title) = &self.title {
            quest.title.clone_from(title);
        }
        if let Some(description) = &self.description {
            quest.description.clone_from(description);
        }
        if let Some(category) = &self.category {
            quest.category = Some(category.clone());
        }
        if let Some(difficulty) = self.difficulty {
            quest.difficulty = difficulty;
        }
        if let Some(xp) = self.xp_reward {
            quest.rewards.xp_reward = xp;
        }
        if let Some(rewards) = self.attribute_rewards {
            quest.rewards.attribute_rewards = rewards;
        }
        if let Some(min_level) = self.min_level {
            quest.min_level = min_level;
        }
        if let Some(due) = self.due_date {
            quest.due_date = Some(due);
        }
    }
}

/// Who a quest is assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentTarget {
    /// Every character of one user.
    User(UserId),
    /// Every character of every member of a group.
    Group(GroupId),
}

/// Work handed in for a quest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Submission {
    /// Free text.
    pub text: Option<String>,
    /// Link to an uploaded file.
    pub file_url: Option<String>,
}

impl Submission {
    /// Whether the submission carries any content.
    pub fn is_empty(&self) -> bool {
        let blank = |v: &Option<String>| v.as_deref().is_none_or(|s| s.trim().is_empty());
        blank(&self.text) && blank(&self.file_url)
    }
}

/// An achievement definition to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAchievement {
    /// Unique display name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Icon name or emoji.
    pub icon: Option<String>,
    /// Grouping label.
    pub category: String,
    /// XP granted on unlock.
    pub xp_reward: u32,
    /// Statistic checked.
    pub requirement_kind: RequirementKind,
    /// Threshold.
    pub requirement_value: u32,
}

/// A group to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGroup {
    /// Unique name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Creating user.
    pub created_by: Option<UserId>,
}

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

/// Result of grading a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeOutcome {
    /// The graded progress row.
    pub progress: QuestProgress,
    /// The character after the award. `None` for rejections.
    pub character: Option<Character>,
    /// Rewards granted. `None` for rejections.
    pub rewards: Option<GrantedRewards>,
}

/// Result of a direct quest completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionOutcome {
    /// The completed progress row.
    pub progress: QuestProgress,
    /// The character after the award.
    pub character: Character,
    /// Rewards granted.
    pub rewards: GrantedRewards,
}

/// Result of a direct XP grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XpGrant {
    /// The character after the award.
    pub character: Character,
    /// Levels gained.
    pub levels_gained: u32,
    /// XP dropped at the level cap.
    pub xp_discarded: u64,
}

/// Result of an achievement check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnlockReport {
    /// Achievements unlocked by this check.
    pub unlocked: Vec<Achievement>,
    /// The character after unlock rewards.
    pub character: Character,
}

/// Counts of rows changed by a maintenance sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Progress rows moved to `failed`.
    pub expired: u64,
    /// Repeatable progress rows moved back to `available`.
    pub reopened: u64,
}

// ---------------------------------------------------------------------------
// The trait
// ---------------------------------------------------------------------------

/// Persistent storage for the platform.
#[async_trait]
pub trait Store: Send + Sync {
    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<(), DbError>;

    // ----- users -----

    /// Create a user. Usernames are unique.
    async fn create_user(&self, new: NewUser) -> Result<User, DbError>;
    /// Fetch a user.
    async fn get_user(&self, id: UserId) -> Result<User, DbError>;
    /// All users ordered by username.
    async fn list_users(&self) -> Result<Vec<User>, DbError>;
    /// Change a user's role. The super admin is immutable.
    async fn set_user_role(&self, id: UserId, role: Role) -> Result<User, DbError>;

    // ----- characters -----

    /// Create a character with default progression and the starting title.
    async fn create_character(&self, new: NewCharacter) -> Result<Character, DbError>;
    /// Fetch a character.
    async fn get_character(&self, id: CharacterId) -> Result<Character, DbError>;
    /// All characters of a user, oldest first.
    async fn list_characters_for_user(&self, user_id: UserId) -> Result<Vec<Character>, DbError>;
    /// Rename a character.
    async fn rename_character(&self, id: CharacterId, name: String) -> Result<Character, DbError>;
    /// Delete a character and everything it owns.
    async fn delete_character(&self, id: CharacterId) -> Result<(), DbError>;
    /// Grant XP through the award operation.
    async fn grant_xp(&self, id: CharacterId, xp: u32) -> Result<XpGrant, DbError>;
    /// Raise one attribute, clamped at 100.
    async fn increase_attribute(
        &self,
        id: CharacterId,
        attribute: Attribute,
        amount: u32,
    ) -> Result<Character, DbError>;
    /// Titles the character has earned.
    async fn list_titles(&self, id: CharacterId) -> Result<Vec<CharacterTitle>, DbError>;
    /// Switch the displayed title to an earned one.
    async fn set_active_title(&self, id: CharacterId, title: String) -> Result<Character, DbError>;

    // ----- equipment -----

    /// The equipment catalogue.
    async fn list_equipment(&self) -> Result<Vec<Equipment>, DbError>;
    /// Add a catalogue entry.
    async fn create_equipment(&self, new: NewEquipment) -> Result<Equipment, DbError>;
    /// Remove a catalogue entry.
    async fn delete_equipment(&self, id: EquipmentId) -> Result<(), DbError>;
    /// A character's inventory.
    async fn character_equipment(&self, id: CharacterId) -> Result<Vec<OwnedEquipment>, DbError>;
    /// Flip the equipped flag of an owned item.
    async fn toggle_equipment(
        &self,
        character_id: CharacterId,
        equipment_id: EquipmentId,
    ) -> Result<OwnedEquipment, DbError>;

    // ----- quests -----

    /// Create a quest.
    async fn create_quest(&self, new: NewQuest) -> Result<Quest, DbError>;
    /// Fetch a quest.
    async fn get_quest(&self, id: QuestId) -> Result<Quest, DbError>;
    /// All quests ordered by minimum level then difficulty.
    async fn list_quests(&self) -> Result<Vec<Quest>, DbError>;
    /// Quests with author counters. `None` lists every quest.
    async fn quest_overview(&self, author: Option<UserId>) -> Result<Vec<QuestOverview>, DbError>;
    /// Patch a quest.
    async fn update_quest(&self, id: QuestId, patch: QuestPatch) -> Result<Quest, DbError>;
    /// Delete a quest and its progress rows.
    async fn delete_quest(&self, id: QuestId) -> Result<(), DbError>;
    /// Assign a quest and notify the recipients.
    ///
    /// Returns the number of characters that gained an `available` row.
    async fn assign_quest(
        &self,
        quest_id: QuestId,
        target: AssignmentTarget,
        assigned_by: Option<UserId>,
    ) -> Result<u64, DbError>;
    /// Level-eligible quests with the character's status and equipment lock.
    async fn quests_for_character(&self, id: CharacterId) -> Result<Vec<CharacterQuest>, DbError>;

    // ----- quest progress -----

    /// Start or resume a quest.
    async fn start_quest(
        &self,
        character_id: CharacterId,
        quest_id: QuestId,
    ) -> Result<QuestProgress, DbError>;
    /// Hand in work and notify the quest's author.
    async fn submit_quest(
        &self,
        character_id: CharacterId,
        quest_id: QuestId,
        submission: Submission,
    ) -> Result<QuestProgress, DbError>;
    /// Complete a quest without grading and apply its rewards.
    async fn complete_quest(
        &self,
        character_id: CharacterId,
        quest_id: QuestId,
    ) -> Result<CompletionOutcome, DbError>;
    /// Progress rows of a quest that have been handed in at least once.
    async fn list_submissions(&self, quest_id: QuestId) -> Result<Vec<SubmissionView>, DbError>;
    /// Grade a submission and settle rewards in one transaction.
    async fn grade_submission(
        &self,
        id: SubmissionId,
        grader: UserId,
        request: GradeRequest,
    ) -> Result<GradeOutcome, DbError>;
    /// Expire overdue work and reopen due repeatable quests.
    async fn sweep(&self, now: DateTime<Utc>) -> Result<SweepReport, DbError>;

    // ----- achievements -----

    /// The achievement catalogue.
    async fn list_achievements(&self) -> Result<Vec<Achievement>, DbError>;
    /// Add an achievement definition.
    async fn create_achievement(&self, new: NewAchievement) -> Result<Achievement, DbError>;
    /// The catalogue with the character's unlock times.
    async fn character_achievements(
        &self,
        id: CharacterId,
    ) -> Result<Vec<CharacterAchievement>, DbError>;
    /// Unlock everything the character qualifies for and grant the XP.
    async fn check_achievements(&self, id: CharacterId) -> Result<UnlockReport, DbError>;

    // ----- leaderboard -----

    /// The top `limit` characters by `kind`.
    async fn leaderboard(
        &self,
        kind: LeaderboardKind,
        limit: u32,
    ) -> Result<Vec<LeaderboardEntry>, DbError>;

    // ----- notifications -----

    /// A user's latest notifications, newest first.
    async fn notifications_for_user(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<Notification>, DbError>;
    /// Number of unread notifications.
    async fn unread_count(&self, user_id: UserId) -> Result<u64, DbError>;
    /// Mark one notification read.
    async fn mark_notification_read(&self, id: NotificationId) -> Result<(), DbError>;
    /// Mark all of a user's notifications read. Returns how many changed.
    async fn mark_all_read(&self, user_id: UserId) -> Result<u64, DbError>;

    // ----- groups -----

    /// Groups with member counts, by name.
    async fn list_groups(&self) -> Result<Vec<GroupSummary>, DbError>;
    /// Create a group. Names are unique.
    async fn create_group(&self, new: NewGroup) -> Result<Group, DbError>;
    /// A group with its members.
    async fn get_group(&self, id: GroupId) -> Result<GroupDetail, DbError>;
    /// Delete a group.
    async fn delete_group(&self, id: GroupId) -> Result<(), DbError>;
    /// Add a member. Adding twice is a conflict.
    async fn add_group_member(&self, group_id: GroupId, user_id: UserId) -> Result<(), DbError>;
    /// Remove a member.
    async fn remove_group_member(&self, group_id: GroupId, user_id: UserId)
    -> Result<(), DbError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaderboard_limit_defaults_and_caps() {
        assert_eq!(leaderboard_limit(None), 10);
        assert_eq!(leaderboard_limit(Some(0)), 10);
        assert_eq!(leaderboard_limit(Some(25)), 25);
        assert_eq!(leaderboard_limit(Some(500)), 100);
    }

    #[test]
    fn blank_submission_is_empty() {
        let mut submission = Submission::default();
        assert!(submission.is_empty());
        submission.text = Some(String::from("  "));
        assert!(submission.is_empty());
        submission.file_url = Some(String::from("https://files.example/abgabe.pdf"));
        assert!(!submission.is_empty());
    }

    #[test]
    fn patch_touches_only_given_fields() {
        let mut quest = Quest {
            id: QuestId::new(),
            title: String::from("Subnetting"),
            description: String::from("Teile das Netz auf"),
            category: None,
            difficulty: Difficulty::Easy,
            rewards: RewardBundle {
                xp_reward: 50,
                attribute_rewards: Attributes::default(),
                is_title_quest: false,
                title_reward: None,
                equipment_reward_id: None,
            },
            required_equipment_id: None,
            min_level: 1,
            prerequisite_quest_id: None,
            created_by: None,
            repeat: None,
            due_date: None,
            created_at: Utc::now(),
        };
        let patch = QuestPatch {
            xp_reward: Some(120),
            difficulty: Some(Difficulty::Medium),
            ..QuestPatch::default()
        };
        patch.apply_to(&mut quest);
        assert_eq!(quest.rewards.xp_reward, 120);
        assert_eq!(quest.difficulty, Difficulty::Medium);
        assert_eq!(quest.title, "Subnetting");
    }
}
