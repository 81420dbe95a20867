//! `FromRow` structs mirroring the tables, and their mapping to domain types.
//!
//! Each row struct has exactly the columns of its table so queries can
//! select `table.*`; joined rows flatten a table row and add the extra
//! computed columns.

use chrono::{DateTime, Utc};
use skillquest_types::{
    Achievement, Character, CharacterAchievement, CharacterTitle, Equipment, Group, GroupMember,
    GroupSummary, Notification, OwnedEquipment, ProgressionState, Quest, QuestOverview,
    QuestProgress, RepeatSchedule, RewardBundle, SubmissionView, User,
};
use uuid::Uuid;

use crate::convert::{
    attributes_from_db, from_db_count, from_db_int, from_db_small, parse_column,
};
use crate::error::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct UserRow {
    pub(crate) id: Uuid,
    pub(crate) username: String,
    pub(crate) role: String,
    pub(crate) is_admin: bool,
    pub(crate) is_super_admin: bool,
    pub(crate) created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = DbError;

    fn try_from(row: UserRow) -> Result<Self, DbError> {
        Ok(Self {
            id: row.id.into(),
            username: row.username,
            role: parse_column(&row.role)?,
            is_admin: row.is_admin,
            is_super_admin: row.is_super_admin,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct CharacterRow {
    pub(crate) id: Uuid,
    pub(crate) user_id: Uuid,
    pub(crate) name: String,
    pub(crate) title: String,
    pub(crate) level: i32,
    pub(crate) xp: i32,
    pub(crate) xp_to_next_level: i32,
    pub(crate) programming: i32,
    pub(crate) networking: i32,
    pub(crate) databases: i32,
    pub(crate) hardware: i32,
    pub(crate) security: i32,
    pub(crate) project_management: i32,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl TryFrom<CharacterRow> for Character {
    type Error = DbError;

    fn try_from(row: CharacterRow) -> Result<Self, DbError> {
        Ok(Self {
            id: row.id.into(),
            user_id: row.user_id.into(),
            name: row.name,
            title: row.title,
            progression: ProgressionState {
                level: from_db_int(row.level, "level")?,
                xp: from_db_int(row.xp, "xp")?,
                xp_to_next_level: from_db_int(row.xp_to_next_level, "xp_to_next_level")?,
                attributes: attributes_from_db([
                    row.programming,
                    row.networking,
                    row.databases,
                    row.hardware,
                    row.security,
                    row.project_management,
                ])?,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct TitleRow {
    pub(crate) title: String,
    pub(crate) is_active: bool,
    pub(crate) unlocked_at: DateTime<Utc>,
}

impl From<TitleRow> for CharacterTitle {
    fn from(row: TitleRow) -> Self {
        Self {
            title: row.title,
            is_active: row.is_active,
            unlocked_at: row.unlocked_at,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct EquipmentRow {
    pub(crate) id: Uuid,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) kind: String,
    pub(crate) rarity: String,
    pub(crate) programming_bonus: i32,
    pub(crate) networking_bonus: i32,
    pub(crate) databases_bonus: i32,
    pub(crate) hardware_bonus: i32,
    pub(crate) security_bonus: i32,
    pub(crate) project_management_bonus: i32,
    pub(crate) min_level: i32,
    pub(crate) created_at: DateTime<Utc>,
}

impl TryFrom<EquipmentRow> for Equipment {
    type Error = DbError;

    fn try_from(row: EquipmentRow) -> Result<Self, DbError> {
        Ok(Self {
            id: row.id.into(),
            name: row.name,
            description: row.description,
            kind: row.kind,
            rarity: parse_column(&row.rarity)?,
            bonuses: attributes_from_db([
                row.programming_bonus,
                row.networking_bonus,
                row.databases_bonus,
                row.hardware_bonus,
                row.security_bonus,
                row.project_management_bonus,
            ])?,
            min_level: from_db_int(row.min_level, "min_level")?,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct OwnedEquipmentRow {
    #[sqlx(flatten)]
    pub(crate) equipment: EquipmentRow,
    pub(crate) equipped: bool,
    pub(crate) acquired_at: DateTime<Utc>,
}

impl TryFrom<OwnedEquipmentRow> for OwnedEquipment {
    type Error = DbError;

    fn try_from(row: OwnedEquipmentRow) -> Result<Self, DbError> {
        Ok(Self {
            equipment: row.equipment.try_into()?,
            equipped: row.equipped,
            acquired_at: row.acquired_at,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct QuestRow {
    pub(crate) id: Uuid,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) category: Option<String>,
    pub(crate) difficulty: String,
    pub(crate) xp_reward: i32,
    pub(crate) programming_reward: i32,
    pub(crate) networking_reward: i32,
    pub(crate) databases_reward: i32,
    pub(crate) hardware_reward: i32,
    pub(crate) security_reward: i32,
    pub(crate) project_management_reward: i32,
    pub(crate) is_title_quest: bool,
    pub(crate) title_reward: Option<String>,
    pub(crate) equipment_reward_id: Option<Uuid>,
    pub(crate) required_equipment_id: Option<Uuid>,
    pub(crate) min_level: i32,
    pub(crate) prerequisite_quest_id: Option<Uuid>,
    pub(crate) created_by: Option<Uuid>,
    pub(crate) repeat_interval: Option<String>,
    pub(crate) repeat_time: Option<String>,
    pub(crate) repeat_day_of_week: Option<i16>,
    pub(crate) repeat_day_of_month: Option<i16>,
    pub(crate) due_date: Option<DateTime<Utc>>,
    pub(crate) created_at: DateTime<Utc>,
}

impl TryFrom<QuestRow> for Quest {
    type Error = DbError;

    fn try_from(row: QuestRow) -> Result<Self, DbError> {
        let repeat = match (row.repeat_interval, row.repeat_time) {
            (Some(interval), Some(time)) => Some(RepeatSchedule {
                interval: parse_column(&interval)?,
                time,
                day_of_week: from_db_small(row.repeat_day_of_week, "repeat_day_of_week")?,
                day_of_month: from_db_small(row.repeat_day_of_month, "repeat_day_of_month")?,
            }),
            _ => None,
        };
        Ok(Self {
            id: row.id.into(),
            title: row.title,
            description: row.description,
            category: row.category,
            difficulty: parse_column(&row.difficulty)?,
            rewards: RewardBundle {
                xp_reward: from_db_int(row.xp_reward, "xp_reward")?,
                attribute_rewards: attributes_from_db([
                    row.programming_reward,
                    row.networking_reward,
                    row.databases_reward,
                    row.hardware_reward,
                    row.security_reward,
                    row.project_management_reward,
                ])?,
                is_title_quest: row.is_title_quest,
                title_reward: row.title_reward,
                equipment_reward_id: row.equipment_reward_id.map(Into::into),
            },
            required_equipment_id: row.required_equipment_id.map(Into::into),
            min_level: from_db_int(row.min_level, "min_level")?,
            prerequisite_quest_id: row.prerequisite_quest_id.map(Into::into),
            created_by: row.created_by.map(Into::into),
            repeat,
            due_date: row.due_date,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct QuestOverviewRow {
    #[sqlx(flatten)]
    pub(crate) quest: QuestRow,
    pub(crate) assignment_count: i64,
    pub(crate) pending_submissions: i64,
}

impl TryFrom<QuestOverviewRow> for QuestOverview {
    type Error = DbError;

    fn try_from(row: QuestOverviewRow) -> Result<Self, DbError> {
        Ok(Self {
            quest: row.quest.try_into()?,
            assignment_count: from_db_count(row.assignment_count),
            pending_submissions: from_db_count(row.pending_submissions),
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct ProgressRow {
    pub(crate) id: Uuid,
    pub(crate) character_id: Uuid,
    pub(crate) quest_id: Uuid,
    pub(crate) status: String,
    pub(crate) started_at: Option<DateTime<Utc>>,
    pub(crate) submitted_at: Option<DateTime<Utc>>,
    pub(crate) submission_text: Option<String>,
    pub(crate) submission_file_url: Option<String>,
    pub(crate) grade: Option<String>,
    pub(crate) feedback: Option<String>,
    pub(crate) graded_at: Option<DateTime<Utc>>,
    pub(crate) graded_by: Option<Uuid>,
    pub(crate) completed_at: Option<DateTime<Utc>>,
    pub(crate) last_completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<ProgressRow> for QuestProgress {
    type Error = DbError;

    fn try_from(row: ProgressRow) -> Result<Self, DbError> {
        Ok(Self {
            id: row.id.into(),
            character_id: row.character_id.into(),
            quest_id: row.quest_id.into(),
            status: parse_column(&row.status)?,
            started_at: row.started_at,
            submitted_at: row.submitted_at,
            submission_text: row.submission_text,
            submission_file_url: row.submission_file_url,
            grade: row.grade.as_deref().map(parse_column).transpose()?,
            feedback: row.feedback,
            graded_at: row.graded_at,
            graded_by: row.graded_by.map(Into::into),
            completed_at: row.completed_at,
            last_completed_at: row.last_completed_at,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct SubmissionViewRow {
    #[sqlx(flatten)]
    pub(crate) progress: ProgressRow,
    pub(crate) character_name: String,
    pub(crate) username: String,
}

impl TryFrom<SubmissionViewRow> for SubmissionView {
    type Error = DbError;

    fn try_from(row: SubmissionViewRow) -> Result<Self, DbError> {
        Ok(Self {
            progress: row.progress.try_into()?,
            character_name: row.character_name,
            username: row.username,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct AchievementRow {
    pub(crate) id: Uuid,
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) icon: Option<String>,
    pub(crate) category: String,
    pub(crate) xp_reward: i32,
    pub(crate) requirement_kind: String,
    pub(crate) requirement_value: i32,
}

impl TryFrom<AchievementRow> for Achievement {
    type Error = DbError;

    fn try_from(row: AchievementRow) -> Result<Self, DbError> {
        Ok(Self {
            id: row.id.into(),
            name: row.name,
            description: row.description,
            icon: row.icon,
            category: row.category,
            xp_reward: from_db_int(row.xp_reward, "xp_reward")?,
            requirement_kind: parse_column(&row.requirement_kind)?,
            requirement_value: from_db_int(row.requirement_value, "requirement_value")?,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct CharacterAchievementRow {
    #[sqlx(flatten)]
    pub(crate) achievement: AchievementRow,
    pub(crate) unlocked_at: Option<DateTime<Utc>>,
}

impl TryFrom<CharacterAchievementRow> for CharacterAchievement {
    type Error = DbError;

    fn try_from(row: CharacterAchievementRow) -> Result<Self, DbError> {
        Ok(Self {
            achievement: row.achievement.try_into()?,
            unlocked_at: row.unlocked_at,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct GroupRow {
    pub(crate) id: Uuid,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) created_by: Option<Uuid>,
    pub(crate) created_at: DateTime<Utc>,
}

impl From<GroupRow> for Group {
    fn from(row: GroupRow) -> Self {
        Self {
            id: row.id.into(),
            name: row.name,
            description: row.description,
            created_by: row.created_by.map(Into::into),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct GroupSummaryRow {
    #[sqlx(flatten)]
    pub(crate) group: GroupRow,
    pub(crate) member_count: i64,
}

impl From<GroupSummaryRow> for GroupSummary {
    fn from(row: GroupSummaryRow) -> Self {
        Self {
            group: row.group.into(),
            member_count: from_db_count(row.member_count),
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct GroupMemberRow {
    pub(crate) user_id: Uuid,
    pub(crate) username: String,
    pub(crate) role: String,
    pub(crate) joined_at: DateTime<Utc>,
}

impl TryFrom<GroupMemberRow> for GroupMember {
    type Error = DbError;

    fn try_from(row: GroupMemberRow) -> Result<Self, DbError> {
        Ok(Self {
            user_id: row.user_id.into(),
            username: row.username,
            role: parse_column(&row.role)?,
            joined_at: row.joined_at,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct NotificationRow {
    pub(crate) id: Uuid,
    pub(crate) user_id: Uuid,
    pub(crate) kind: String,
    pub(crate) title: String,
    pub(crate) message: String,
    pub(crate) is_read: bool,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) read_at: Option<DateTime<Utc>>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = DbError;

    fn try_from(row: NotificationRow) -> Result<Self, DbError> {
        Ok(Self {
            id: row.id.into(),
            user_id: row.user_id.into(),
            kind: parse_column(&row.kind)?,
            title: row.title,
            message: row.message,
            is_read: row.is_read,
            created_at: row.created_at,
            read_at: row.read_at,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct LeaderboardRow {
    pub(crate) id: Uuid,
    pub(crate) name: String,
    pub(crate) title: String,
    pub(crate) username: String,
    pub(crate) level: i32,
    pub(crate) score: i64,
}

/// Map every row of a result set, stopping at the first bad value.
pub(crate) fn map_rows<R, T>(rows: Vec<R>) -> Result<Vec<T>, DbError>
where
    T: TryFrom<R, Error = DbError>,
{
    rows.into_iter().map(T::try_from).collect()
}
