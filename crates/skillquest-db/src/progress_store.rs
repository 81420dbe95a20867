//! Quest progress in `PostgreSQL`: start, submit, grade, complete, sweep.
//!
//! Every operation that changes a character locks the character row first
//! and the progress row second, so two requests touching the same pair
//! always queue in the same order. Grading additionally guards its update
//! with `grade IS NULL`, which makes a second grade a no-op even if the
//! locks were bypassed.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use skillquest_progression::lifecycle::ensure_level;
use skillquest_progression::schedule::{self, ValidSchedule};
use skillquest_progression::{
    GradeRequest, ProgressionError, QuestAction, Settlement, settle_completion, settle_grade,
    transition,
};
use skillquest_types::{
    Character, CharacterId, EquipmentId, Quest, QuestId, QuestProgress, QuestStatus, SubmissionId,
    SubmissionView, UserId,
};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::character_store::{fetch_character, grant_title, lock_character, write_progression};
use crate::error::DbError;
use crate::notices;
use crate::quest_store::fetch_quest;
use crate::rows::{ProgressRow, QuestRow, SubmissionViewRow, map_rows};
use crate::social_store::insert_notification;
use crate::store::{CompletionOutcome, GradeOutcome, Submission, SweepReport};

/// Operations on the `character_quests` table.
pub struct ProgressStore<'a> {
    pool: &'a PgPool,
}

impl<'a> ProgressStore<'a> {
    /// Create a store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Start or resume a quest. Level and required equipment are enforced.
    pub async fn start(
        &self,
        character_id: CharacterId,
        quest_id: QuestId,
    ) -> Result<QuestProgress, DbError> {
        let mut tx = self.pool.begin().await?;
        let character = lock_character(&mut tx, character_id).await?;
        let quest = fetch_quest(&mut tx, quest_id).await?;
        ensure_can_start(&mut tx, &character, &quest).await?;

        let current = lock_or_open(&mut tx, character_id, quest_id).await?;
        let next = transition(current.status, QuestAction::Start)?;
        let row = sqlx::query_as::<_, ProgressRow>(
            "UPDATE character_quests SET status = $2, started_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(current.id.into_inner())
        .bind(next.as_str())
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(character_id = %character_id, quest_id = %quest_id, "Quest started");
        row.try_into()
    }

    /// Hand in work and notify the quest's author.
    pub async fn submit(
        &self,
        character_id: CharacterId,
        quest_id: QuestId,
        submission: Submission,
    ) -> Result<QuestProgress, DbError> {
        if submission.is_empty() {
            return Err(DbError::Invalid(String::from(
                "a submission needs text or a file URL",
            )));
        }
        let mut tx = self.pool.begin().await?;
        let character = lock_character(&mut tx, character_id).await?;
        let quest = fetch_quest(&mut tx, quest_id).await?;
        let current = lock_progress(&mut tx, character_id, quest_id)
            .await?
            .ok_or_else(|| {
                DbError::NotFound(format!(
                    "progress of character {character_id} on quest {quest_id}"
                ))
            })?;
        let next = transition(current.status, QuestAction::Submit)?;

        let now = Utc::now();
        let row = sqlx::query_as::<_, ProgressRow>(
            r"UPDATE character_quests
              SET status = $2, submission_text = $3, submission_file_url = $4,
                  submitted_at = $5, grade = NULL, feedback = NULL,
                  graded_at = NULL, graded_by = NULL
              WHERE id = $1
              RETURNING *",
        )
        .bind(current.id.into_inner())
        .bind(next.as_str())
        .bind(&submission.text)
        .bind(&submission.file_url)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(author) = quest.created_by {
            insert_notification(
                &mut tx,
                author,
                notices::submission_received(&character.name, &quest.title),
                now,
            )
            .await?;
        }
        tx.commit().await?;

        tracing::info!(character_id = %character_id, quest_id = %quest_id, "Quest submitted");
        row.try_into()
    }

    /// Complete a quest directly and apply its rewards.
    pub async fn complete(
        &self,
        character_id: CharacterId,
        quest_id: QuestId,
    ) -> Result<CompletionOutcome, DbError> {
        let mut tx = self.pool.begin().await?;
        let character = lock_character(&mut tx, character_id).await?;
        let quest = fetch_quest(&mut tx, quest_id).await?;
        ensure_can_start(&mut tx, &character, &quest).await?;

        let current = lock_or_open(&mut tx, character_id, quest_id).await?;
        let now = Utc::now();
        let settlement =
            settle_completion(current.status, &character.progression, &quest.rewards, now)?;

        let row = sqlx::query_as::<_, ProgressRow>(
            r"UPDATE character_quests
              SET status = $2, completed_at = $3, last_completed_at = $3
              WHERE id = $1
              RETURNING *",
        )
        .bind(current.id.into_inner())
        .bind(settlement.status.as_str())
        .bind(settlement.completed_at)
        .fetch_one(&mut *tx)
        .await?;

        let character = write_settlement(&mut tx, character_id, &settlement, now)
            .await?
            .ok_or_else(|| DbError::Corrupt(String::from("completion without award")))?;
        let rewards = settlement
            .granted(&quest.rewards)
            .ok_or_else(|| DbError::Corrupt(String::from("completion without award")))?;
        tx.commit().await?;

        tracing::info!(
            character_id = %character_id,
            quest_id = %quest_id,
            levels_gained = rewards.levels_gained,
            "Quest completed"
        );
        Ok(CompletionOutcome {
            progress: row.try_into()?,
            character,
            rewards,
        })
    }

    /// Rows of a quest that have been handed in, newest first.
    pub async fn list_submissions(&self, quest_id: QuestId) -> Result<Vec<SubmissionView>, DbError> {
        let mut conn = self.pool.acquire().await?;
        fetch_quest(&mut conn, quest_id).await?;
        let rows = sqlx::query_as::<_, SubmissionViewRow>(
            r"SELECT cq.*, c.name AS character_name, u.username
              FROM character_quests cq
              JOIN characters c ON c.id = cq.character_id
              JOIN users u ON u.id = c.user_id
              WHERE cq.quest_id = $1 AND cq.submitted_at IS NOT NULL
              ORDER BY cq.submitted_at DESC",
        )
        .bind(quest_id.into_inner())
        .fetch_all(&mut *conn)
        .await?;
        map_rows(rows)
    }

    /// Grade a submission and settle every reward in one transaction.
    pub async fn grade(
        &self,
        id: SubmissionId,
        grader: UserId,
        request: &GradeRequest,
    ) -> Result<GradeOutcome, DbError> {
        request.validate()?;
        let mut tx = self.pool.begin().await?;

        let unlocked: QuestProgress =
            sqlx::query_as::<_, ProgressRow>("SELECT * FROM character_quests WHERE id = $1")
                .bind(id.into_inner())
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| DbError::not_found("submission", id))?
                .try_into()?;
        let quest = fetch_quest(&mut tx, unlocked.quest_id).await?;
        if quest.created_by != Some(grader) {
            return Err(DbError::Forbidden(String::from(
                "only the quest's author may grade it",
            )));
        }

        let character = lock_character(&mut tx, unlocked.character_id).await?;
        let current = lock_progress(&mut tx, unlocked.character_id, unlocked.quest_id)
            .await?
            .ok_or_else(|| DbError::not_found("submission", id))?;
        let now = Utc::now();
        let settlement = settle_grade(
            current.status,
            current.grade,
            request,
            &character.progression,
            &quest.rewards,
            now,
        )?;

        let feedback = request.trimmed_feedback();
        let row = sqlx::query_as::<_, ProgressRow>(
            r"UPDATE character_quests
              SET status = $2, grade = $3, feedback = $4, graded_at = $5, graded_by = $6,
                  completed_at = COALESCE($7, completed_at),
                  last_completed_at = COALESCE($7, last_completed_at)
              WHERE id = $1 AND grade IS NULL
              RETURNING *",
        )
        .bind(id.into_inner())
        .bind(settlement.status.as_str())
        .bind(request.decision.as_str())
        .bind(feedback)
        .bind(now)
        .bind(grader.into_inner())
        .bind(settlement.completed_at)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ProgressionError::AlreadyGraded)?;

        let updated = write_settlement(&mut tx, character.id, &settlement, now).await?;
        insert_notification(
            &mut tx,
            character.user_id,
            notices::submission_graded(&quest.title, request.decision, feedback),
            now,
        )
        .await?;
        tx.commit().await?;

        tracing::info!(
            submission_id = %id,
            decision = %request.decision,
            levels_gained = settlement.award.as_ref().map_or(0, |a| a.levels_gained),
            "Submission graded"
        );
        Ok(GradeOutcome {
            progress: row.try_into()?,
            character: updated,
            rewards: settlement.granted(&quest.rewards),
        })
    }

    /// Fail overdue work and reopen due repeatable quests.
    ///
    /// Expiry runs first, so a repeatable row failed here is already
    /// eligible for the reopen check in the same sweep.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<SweepReport, DbError> {
        let mut tx = self.pool.begin().await?;

        let expired = sqlx::query(
            r"UPDATE character_quests cq SET status = 'failed'
              FROM quests q
              WHERE cq.quest_id = q.id
                AND q.due_date IS NOT NULL AND q.due_date < $1
                AND cq.status IN ('in_progress', 'submitted')",
        )
        .bind(now)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let repeatable: Vec<Quest> = map_rows(
            sqlx::query_as::<_, QuestRow>("SELECT * FROM quests WHERE repeat_interval IS NOT NULL")
                .fetch_all(&mut *tx)
                .await?,
        )?;
        let schedules: BTreeMap<QuestId, ValidSchedule> = repeatable
            .iter()
            .filter_map(|q| {
                let rule = q.repeat.as_ref()?;
                match schedule::validate(rule) {
                    Ok(valid) => Some((q.id, valid)),
                    Err(e) => {
                        tracing::warn!(quest_id = %q.id, error = %e, "Skipping quest with invalid repeat rule");
                        None
                    }
                }
            })
            .collect();
        let quest_ids: Vec<Uuid> = schedules.keys().map(|q| q.into_inner()).collect();

        let closed: Vec<QuestProgress> = map_rows(
            sqlx::query_as::<_, ProgressRow>(
                r"SELECT * FROM character_quests
                  WHERE quest_id = ANY($1)
                    AND status IN ('completed', 'rejected', 'failed')
                  FOR UPDATE",
            )
            .bind(&quest_ids)
            .fetch_all(&mut *tx)
            .await?,
        )?;

        let mut reopened = 0_u64;
        for progress in closed {
            let due = schedules.get(&progress.quest_id).is_some_and(|valid| {
                schedule::reopen_anchor(&progress).is_some_and(|anchor| valid.is_due(anchor, now))
            });
            if !due {
                continue;
            }
            let Ok(next) = transition(progress.status, QuestAction::Reopen) else {
                continue;
            };
            reopen(&mut tx, progress.id, next).await?;
            reopened = reopened.saturating_add(1);
        }
        tx.commit().await?;

        let report = SweepReport { expired, reopened };
        if report != SweepReport::default() {
            tracing::info!(expired, reopened, "Maintenance sweep changed quest progress");
        }
        Ok(report)
    }
}

// ---------------------------------------------------------------------------
// Connection-level helpers
// ---------------------------------------------------------------------------

async fn ensure_can_start(
    conn: &mut PgConnection,
    character: &Character,
    quest: &Quest,
) -> Result<(), DbError> {
    ensure_level(character.progression.level, quest.min_level)?;
    let Some(required) = quest.required_equipment_id else {
        return Ok(());
    };
    let owned: Option<(Uuid,)> = sqlx::query_as(
        "SELECT equipment_id FROM character_equipment WHERE character_id = $1 AND equipment_id = $2",
    )
    .bind(character.id.into_inner())
    .bind(required.into_inner())
    .fetch_optional(&mut *conn)
    .await?;
    if owned.is_some() {
        return Ok(());
    }
    let name: Option<(String,)> = sqlx::query_as("SELECT name FROM equipment WHERE id = $1")
        .bind(required.into_inner())
        .fetch_optional(&mut *conn)
        .await?;
    let name = name.map_or_else(|| required.to_string(), |(n,)| n);
    Err(DbError::Forbidden(format!("required equipment missing: {name}")))
}

async fn lock_progress(
    conn: &mut PgConnection,
    character_id: CharacterId,
    quest_id: QuestId,
) -> Result<Option<QuestProgress>, DbError> {
    sqlx::query_as::<_, ProgressRow>(
        "SELECT * FROM character_quests WHERE character_id = $1 AND quest_id = $2 FOR UPDATE",
    )
    .bind(character_id.into_inner())
    .bind(quest_id.into_inner())
    .fetch_optional(&mut *conn)
    .await?
    .map(QuestProgress::try_from)
    .transpose()
}

/// Lock the progress row, creating it as `available` when absent.
async fn lock_or_open(
    conn: &mut PgConnection,
    character_id: CharacterId,
    quest_id: QuestId,
) -> Result<QuestProgress, DbError> {
    sqlx::query(
        r"INSERT INTO character_quests (id, character_id, quest_id, status)
          VALUES ($1, $2, $3, 'available')
          ON CONFLICT (character_id, quest_id) DO NOTHING",
    )
    .bind(SubmissionId::new().into_inner())
    .bind(character_id.into_inner())
    .bind(quest_id.into_inner())
    .execute(&mut *conn)
    .await?;
    lock_progress(conn, character_id, quest_id)
        .await?
        .ok_or_else(|| {
            DbError::NotFound(format!(
                "progress of character {character_id} on quest {quest_id}"
            ))
        })
}

/// Write the character side of a settlement: progression, title, equipment.
async fn write_settlement(
    conn: &mut PgConnection,
    character_id: CharacterId,
    settlement: &Settlement,
    now: DateTime<Utc>,
) -> Result<Option<Character>, DbError> {
    let Some(award) = &settlement.award else {
        return Ok(None);
    };
    write_progression(conn, character_id, &award.state).await?;
    if let Some(title) = &settlement.title {
        grant_title(conn, character_id, title, now).await?;
    }
    if let Some(equipment_id) = settlement.equipment_id {
        grant_equipment(conn, character_id, equipment_id, now).await?;
    }
    fetch_character(conn, character_id).await.map(Some)
}

async fn grant_equipment(
    conn: &mut PgConnection,
    character_id: CharacterId,
    equipment_id: EquipmentId,
    now: DateTime<Utc>,
) -> Result<(), DbError> {
    sqlx::query(
        r"INSERT INTO character_equipment (character_id, equipment_id, equipped, acquired_at)
          SELECT $1, id, FALSE, $3 FROM equipment WHERE id = $2
          ON CONFLICT (character_id, equipment_id) DO NOTHING",
    )
    .bind(character_id.into_inner())
    .bind(equipment_id.into_inner())
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn reopen(
    conn: &mut PgConnection,
    id: SubmissionId,
    status: QuestStatus,
) -> Result<(), DbError> {
    sqlx::query(
        r"UPDATE character_quests
          SET status = $2, started_at = NULL, submitted_at = NULL,
              submission_text = NULL, submission_file_url = NULL,
              grade = NULL, feedback = NULL, graded_at = NULL, graded_by = NULL,
              completed_at = NULL
          WHERE id = $1",
    )
    .bind(id.into_inner())
    .bind(status.as_str())
    .execute(&mut *conn)
    .await?;
    Ok(())
}
