//! Quest definitions and assignments in `PostgreSQL`.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use skillquest_types::{
    AssignmentId, CharacterId, CharacterQuest, EquipmentId, Quest, QuestId, QuestOverview,
    QuestProgress, QuestStatus, SubmissionId, UserId,
};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::character_store::fetch_character;
use crate::convert::{attributes_to_db, to_db_int};
use crate::error::DbError;
use crate::notices;
use crate::rows::{ProgressRow, QuestOverviewRow, QuestRow, map_rows};
use crate::social_store::insert_notification;
use crate::store::{AssignmentTarget, NewQuest, QuestPatch};

/// Sort key putting easy before medium before hard.
const DIFFICULTY_ORDER: &str =
    "CASE difficulty WHEN 'easy' THEN 0 WHEN 'medium' THEN 1 ELSE 2 END";

/// Operations on the `quests` and `quest_assignments` tables.
pub struct QuestStore<'a> {
    pool: &'a PgPool,
}

impl<'a> QuestStore<'a> {
    /// Create a store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a quest.
    pub async fn create(&self, new: NewQuest) -> Result<Quest, DbError> {
        let [programming, networking, databases, hardware, security, project_management] =
            attributes_to_db(&new.rewards.attribute_rewards)?;
        let repeat = new.repeat.as_ref();
        let row = sqlx::query_as::<_, QuestRow>(
            r"INSERT INTO quests (id, title, description, category, difficulty, xp_reward,
                                  programming_reward, networking_reward, databases_reward,
                                  hardware_reward, security_reward, project_management_reward,
                                  is_title_quest, title_reward, equipment_reward_id,
                                  required_equipment_id, min_level, prerequisite_quest_id,
                                  created_by, repeat_interval, repeat_time,
                                  repeat_day_of_week, repeat_day_of_month, due_date)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                      $16, $17, $18, $19, $20, $21, $22, $23, $24)
              RETURNING *",
        )
        .bind(QuestId::new().into_inner())
        .bind(&new.title)
        .bind(&new.description)
        .bind(&new.category)
        .bind(new.difficulty.as_str())
        .bind(to_db_int(new.rewards.xp_reward, "xp_reward")?)
        .bind(programming)
        .bind(networking)
        .bind(databases)
        .bind(hardware)
        .bind(security)
        .bind(project_management)
        .bind(new.rewards.is_title_quest)
        .bind(&new.rewards.title_reward)
        .bind(new.rewards.equipment_reward_id.map(EquipmentId::into_inner))
        .bind(new.required_equipment_id.map(EquipmentId::into_inner))
        .bind(to_db_int(new.min_level, "min_level")?)
        .bind(new.prerequisite_quest_id.map(QuestId::into_inner))
        .bind(new.created_by.into_inner())
        .bind(repeat.map(|r| r.interval.as_str()))
        .bind(repeat.map(|r| r.time.clone()))
        .bind(repeat.and_then(|r| r.day_of_week).map(i16::from))
        .bind(repeat.and_then(|r| r.day_of_month).map(i16::from))
        .bind(new.due_date)
        .fetch_one(self.pool)
        .await?;

        let quest = Quest::try_from(row)?;
        tracing::info!(quest_id = %quest.id, xp_reward = quest.rewards.xp_reward, "Quest created");
        Ok(quest)
    }

    /// Fetch one quest.
    pub async fn get(&self, id: QuestId) -> Result<Quest, DbError> {
        let mut conn = self.pool.acquire().await?;
        fetch_quest(&mut conn, id).await
    }

    /// All quests by minimum level then difficulty.
    pub async fn list(&self) -> Result<Vec<Quest>, DbError> {
        let rows = sqlx::query_as::<_, QuestRow>(&format!(
            "SELECT * FROM quests ORDER BY min_level, {DIFFICULTY_ORDER}, created_at"
        ))
        .fetch_all(self.pool)
        .await?;
        map_rows(rows)
    }

    /// Quests with assignment and pending-submission counts, newest first.
    pub async fn overview(&self, author: Option<UserId>) -> Result<Vec<QuestOverview>, DbError> {
        let rows = sqlx::query_as::<_, QuestOverviewRow>(
            r"SELECT q.*,
                     (SELECT COUNT(*) FROM quest_assignments qa WHERE qa.quest_id = q.id)
                         AS assignment_count,
                     (SELECT COUNT(*) FROM character_quests cq
                      WHERE cq.quest_id = q.id AND cq.status = 'submitted')
                         AS pending_submissions
              FROM quests q
              WHERE $1::UUID IS NULL OR q.created_by = $1
              ORDER BY q.created_at DESC",
        )
        .bind(author.map(UserId::into_inner))
        .fetch_all(self.pool)
        .await?;
        map_rows(rows)
    }

    /// Apply a partial update under a row lock.
    pub async fn update(&self, id: QuestId, patch: &QuestPatch) -> Result<Quest, DbError> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, QuestRow>("SELECT * FROM quests WHERE id = $1 FOR UPDATE")
            .bind(id.into_inner())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::not_found("quest", id))?;
        let mut quest = Quest::try_from(row)?;
        patch.apply_to(&mut quest);

        let [programming, networking, databases, hardware, security, project_management] =
            attributes_to_db(&quest.rewards.attribute_rewards)?;
        let row = sqlx::query_as::<_, QuestRow>(
            r"UPDATE quests
              SET title = $2, description = $3, category = $4, difficulty = $5, xp_reward = $6,
                  programming_reward = $7, networking_reward = $8, databases_reward = $9,
                  hardware_reward = $10, security_reward = $11,
                  project_management_reward = $12, min_level = $13, due_date = $14
              WHERE id = $1
              RETURNING *",
        )
        .bind(id.into_inner())
        .bind(&quest.title)
        .bind(&quest.description)
        .bind(&quest.category)
        .bind(quest.difficulty.as_str())
        .bind(to_db_int(quest.rewards.xp_reward, "xp_reward")?)
        .bind(programming)
        .bind(networking)
        .bind(databases)
        .bind(hardware)
        .bind(security)
        .bind(project_management)
        .bind(to_db_int(quest.min_level, "min_level")?)
        .bind(quest.due_date)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        row.try_into()
    }

    /// Delete a quest; progress rows and assignments cascade.
    pub async fn delete(&self, id: QuestId) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM quests WHERE id = $1")
            .bind(id.into_inner())
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("quest", id));
        }
        tracing::info!(quest_id = %id, "Quest deleted");
        Ok(())
    }

    /// Record an assignment, open an `available` row for every reached
    /// character and notify each recipient once.
    pub async fn assign(
        &self,
        quest_id: QuestId,
        target: AssignmentTarget,
        assigned_by: Option<UserId>,
    ) -> Result<u64, DbError> {
        let mut tx = self.pool.begin().await?;
        let quest = fetch_quest(&mut tx, quest_id).await?;

        let (user_id, group_id, recipients) = match target {
            AssignmentTarget::User(user_id) => {
                let found: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE id = $1")
                    .bind(user_id.into_inner())
                    .fetch_optional(&mut *tx)
                    .await?;
                if found.is_none() {
                    return Err(DbError::not_found("user", user_id));
                }
                (Some(user_id.into_inner()), None, vec![user_id.into_inner()])
            }
            AssignmentTarget::Group(group_id) => {
                let found: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM groups WHERE id = $1")
                    .bind(group_id.into_inner())
                    .fetch_optional(&mut *tx)
                    .await?;
                if found.is_none() {
                    return Err(DbError::not_found("group", group_id));
                }
                let members: Vec<(Uuid,)> =
                    sqlx::query_as("SELECT user_id FROM group_members WHERE group_id = $1")
                        .bind(group_id.into_inner())
                        .fetch_all(&mut *tx)
                        .await?;
                (
                    None,
                    Some(group_id.into_inner()),
                    members.into_iter().map(|(u,)| u).collect(),
                )
            }
        };

        sqlx::query(
            r"INSERT INTO quest_assignments (id, quest_id, user_id, group_id, assigned_by)
              VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(AssignmentId::new().into_inner())
        .bind(quest_id.into_inner())
        .bind(user_id)
        .bind(group_id)
        .bind(assigned_by.map(UserId::into_inner))
        .execute(&mut *tx)
        .await?;

        let now = Utc::now();
        let mut assigned = 0_u64;
        for recipient in recipients {
            let characters: Vec<(Uuid,)> =
                sqlx::query_as("SELECT id FROM characters WHERE user_id = $1")
                    .bind(recipient)
                    .fetch_all(&mut *tx)
                    .await?;
            for (character_id,) in characters {
                let inserted = sqlx::query(
                    r"INSERT INTO character_quests (id, character_id, quest_id, status)
                      VALUES ($1, $2, $3, 'available')
                      ON CONFLICT (character_id, quest_id) DO NOTHING",
                )
                .bind(SubmissionId::new().into_inner())
                .bind(character_id)
                .bind(quest_id.into_inner())
                .execute(&mut *tx)
                .await?;
                assigned = assigned.saturating_add(inserted.rows_affected());
            }
            insert_notification(
                &mut tx,
                recipient.into(),
                notices::quest_assigned(&quest.title),
                now,
            )
            .await?;
        }
        tx.commit().await?;

        tracing::info!(quest_id = %quest_id, assigned, "Quest assigned");
        Ok(assigned)
    }

    /// Level-eligible quests with the character's progress and equipment lock.
    pub async fn for_character(&self, id: CharacterId) -> Result<Vec<CharacterQuest>, DbError> {
        let mut conn = self.pool.acquire().await?;
        let character = fetch_character(&mut conn, id).await?;
        let level = to_db_int(character.progression.level, "level")?;

        let quests: Vec<Quest> = map_rows(
            sqlx::query_as::<_, QuestRow>(&format!(
                "SELECT * FROM quests WHERE min_level <= $1 ORDER BY min_level, {DIFFICULTY_ORDER}"
            ))
            .bind(level)
            .fetch_all(&mut *conn)
            .await?,
        )?;
        let progress: Vec<QuestProgress> = map_rows(
            sqlx::query_as::<_, ProgressRow>("SELECT * FROM character_quests WHERE character_id = $1")
                .bind(id.into_inner())
                .fetch_all(&mut *conn)
                .await?,
        )?;
        let owned: Vec<(Uuid,)> =
            sqlx::query_as("SELECT equipment_id FROM character_equipment WHERE character_id = $1")
                .bind(id.into_inner())
                .fetch_all(&mut *conn)
                .await?;

        let owned: BTreeSet<EquipmentId> = owned.into_iter().map(|(e,)| e.into()).collect();
        let mut by_quest: BTreeMap<QuestId, QuestProgress> =
            progress.into_iter().map(|p| (p.quest_id, p)).collect();

        Ok(quests
            .into_iter()
            .map(|quest| {
                let progress = by_quest.remove(&quest.id);
                let has_required_equipment =
                    quest.required_equipment_id.is_none_or(|e| owned.contains(&e));
                CharacterQuest {
                    status: progress.as_ref().map_or(QuestStatus::Available, |p| p.status),
                    progress,
                    has_required_equipment,
                    is_locked: !has_required_equipment,
                    quest,
                }
            })
            .collect())
    }
}

pub(crate) async fn fetch_quest(conn: &mut PgConnection, id: QuestId) -> Result<Quest, DbError> {
    sqlx::query_as::<_, QuestRow>("SELECT * FROM quests WHERE id = $1")
        .bind(id.into_inner())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("quest", id))?
        .try_into()
}
