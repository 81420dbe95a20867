//! Leaderboards, notifications and groups in `PostgreSQL`.

use chrono::{DateTime, Utc};
use skillquest_types::{
    Group, GroupDetail, GroupId, GroupMember, GroupSummary, LeaderboardEntry, LeaderboardKind,
    Notification, NotificationId, UserId,
};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::convert::{from_db_count, from_db_int};
use crate::error::{DbError, conflict_on_unique};
use crate::notices::Notice;
use crate::rows::{GroupMemberRow, GroupRow, GroupSummaryRow, LeaderboardRow, NotificationRow, map_rows};
use crate::store::NewGroup;

/// Operations on leaderboards, `notifications`, `groups` and `group_members`.
pub struct SocialStore<'a> {
    pool: &'a PgPool,
}

impl<'a> SocialStore<'a> {
    /// Create a store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The top `limit` characters ranked by `kind`.
    ///
    /// Ties fall back to level, then XP, then name.
    pub async fn leaderboard(
        &self,
        kind: LeaderboardKind,
        limit: u32,
    ) -> Result<Vec<LeaderboardEntry>, DbError> {
        let score = match kind {
            LeaderboardKind::Level => "c.level::BIGINT",
            LeaderboardKind::Stats => {
                "(c.programming + c.networking + c.databases + c.hardware + c.security \
                 + c.project_management)::BIGINT"
            }
            LeaderboardKind::Achievements => {
                "(SELECT COUNT(*) FROM character_achievements ca WHERE ca.character_id = c.id)"
            }
            LeaderboardKind::Quests => {
                "(SELECT COUNT(*) FROM character_quests cq \
                 WHERE cq.character_id = c.id AND cq.last_completed_at IS NOT NULL)"
            }
        };
        let rows = sqlx::query_as::<_, LeaderboardRow>(&format!(
            r"SELECT c.id, c.name, c.title, u.username, c.level, {score} AS score
              FROM characters c
              JOIN users u ON u.id = c.user_id
              ORDER BY score DESC, c.level DESC, c.xp DESC, c.name
              LIMIT $1"
        ))
        .bind(i64::from(limit))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .zip(1_u32..)
            .map(|(row, rank)| {
                Ok(LeaderboardEntry {
                    rank,
                    character_id: row.id.into(),
                    name: row.name,
                    title: row.title,
                    username: row.username,
                    level: from_db_int(row.level, "level")?,
                    score: from_db_count(row.score),
                })
            })
            .collect()
    }

    /// A user's latest notifications, newest first.
    pub async fn notifications_for_user(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<Notification>, DbError> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            r"SELECT * FROM notifications WHERE user_id = $1
              ORDER BY created_at DESC, id DESC LIMIT $2",
        )
        .bind(user_id.into_inner())
        .bind(i64::from(limit))
        .fetch_all(self.pool)
        .await?;
        map_rows(rows)
    }

    /// Unread notifications of a user.
    pub async fn unread_count(&self, user_id: UserId) -> Result<u64, DbError> {
        let (n,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND NOT is_read",
        )
        .bind(user_id.into_inner())
        .fetch_one(self.pool)
        .await?;
        Ok(from_db_count(n))
    }

    /// Mark one notification read. Already-read notifications keep their time.
    pub async fn mark_read(&self, id: NotificationId) -> Result<(), DbError> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE, read_at = COALESCE(read_at, now()) WHERE id = $1",
        )
        .bind(id.into_inner())
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("notification", id));
        }
        Ok(())
    }

    /// Mark every unread notification of a user read.
    pub async fn mark_all_read(&self, user_id: UserId) -> Result<u64, DbError> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE, read_at = now() WHERE user_id = $1 AND NOT is_read",
        )
        .bind(user_id.into_inner())
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Groups with member counts, by name.
    pub async fn list_groups(&self) -> Result<Vec<GroupSummary>, DbError> {
        let rows = sqlx::query_as::<_, GroupSummaryRow>(
            r"SELECT g.*,
                     (SELECT COUNT(*) FROM group_members gm WHERE gm.group_id = g.id) AS member_count
              FROM groups g
              ORDER BY g.name",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(GroupSummary::from).collect())
    }

    /// Insert a group. Names are unique.
    pub async fn create_group(&self, new: NewGroup) -> Result<Group, DbError> {
        let row = sqlx::query_as::<_, GroupRow>(
            r"INSERT INTO groups (id, name, description, created_by)
              VALUES ($1, $2, $3, $4)
              RETURNING *",
        )
        .bind(GroupId::new().into_inner())
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.created_by.map(UserId::into_inner))
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, &format!("group \"{}\" already exists", new.name)))?;
        Ok(row.into())
    }

    /// A group with its members by username.
    pub async fn get_group(&self, id: GroupId) -> Result<GroupDetail, DbError> {
        let mut conn = self.pool.acquire().await?;
        let group = fetch_group(&mut conn, id).await?;
        let rows = sqlx::query_as::<_, GroupMemberRow>(
            r"SELECT u.id AS user_id, u.username, u.role, gm.joined_at
              FROM group_members gm
              JOIN users u ON u.id = gm.user_id
              WHERE gm.group_id = $1
              ORDER BY u.username",
        )
        .bind(id.into_inner())
        .fetch_all(&mut *conn)
        .await?;
        let members: Vec<GroupMember> = map_rows(rows)?;
        Ok(GroupDetail { group, members })
    }

    /// Delete a group; memberships and group assignments cascade.
    pub async fn delete_group(&self, id: GroupId) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM groups WHERE id = $1")
            .bind(id.into_inner())
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("group", id));
        }
        Ok(())
    }

    /// Add a member. A second insert of the same pair is a conflict.
    pub async fn add_member(&self, group_id: GroupId, user_id: UserId) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;
        fetch_group(&mut tx, group_id).await?;
        let user: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE id = $1")
            .bind(user_id.into_inner())
            .fetch_optional(&mut *tx)
            .await?;
        if user.is_none() {
            return Err(DbError::not_found("user", user_id));
        }
        sqlx::query("INSERT INTO group_members (group_id, user_id) VALUES ($1, $2)")
            .bind(group_id.into_inner())
            .bind(user_id.into_inner())
            .execute(&mut *tx)
            .await
            .map_err(|e| conflict_on_unique(e, "user is already a member of the group"))?;
        tx.commit().await?;
        Ok(())
    }

    /// Remove a member.
    pub async fn remove_member(&self, group_id: GroupId, user_id: UserId) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM group_members WHERE group_id = $1 AND user_id = $2")
            .bind(group_id.into_inner())
            .bind(user_id.into_inner())
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!(
                "member {user_id} of group {group_id}"
            )));
        }
        Ok(())
    }
}

async fn fetch_group(conn: &mut PgConnection, id: GroupId) -> Result<Group, DbError> {
    sqlx::query_as::<_, GroupRow>("SELECT * FROM groups WHERE id = $1")
        .bind(id.into_inner())
        .fetch_optional(&mut *conn)
        .await?
        .map(Group::from)
        .ok_or_else(|| DbError::not_found("group", id))
}

/// Write one notification inside the caller's transaction.
pub(crate) async fn insert_notification(
    conn: &mut PgConnection,
    user_id: UserId,
    notice: Notice,
    now: DateTime<Utc>,
) -> Result<(), DbError> {
    sqlx::query(
        r"INSERT INTO notifications (id, user_id, kind, title, message, created_at)
          VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(NotificationId::new().into_inner())
    .bind(user_id.into_inner())
    .bind(notice.kind.as_str())
    .bind(notice.title)
    .bind(notice.message)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
