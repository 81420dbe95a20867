//! Users, characters and titles in `PostgreSQL`.
//!
//! The free functions at the bottom work on a borrowed connection so the
//! quest and achievement stores can reuse them inside their own
//! transactions.

use chrono::{DateTime, Utc};
use skillquest_progression::{apply_award, increase_attribute, starting_state};
use skillquest_types::{
    Attribute, Attributes, Character, CharacterId, CharacterTitle, ProgressionState, Role, User,
    UserId,
};
use sqlx::{PgConnection, PgPool};

use crate::convert::{attributes_to_db, to_db_int};
use crate::error::{DbError, conflict_on_unique};
use crate::rows::{CharacterRow, TitleRow, UserRow, map_rows};
use crate::store::{NewCharacter, NewUser, STARTING_TITLE, XpGrant};

/// Operations on the `users`, `characters` and `character_titles` tables.
pub struct CharacterStore<'a> {
    pool: &'a PgPool,
}

impl<'a> CharacterStore<'a> {
    /// Create a store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a user. The first admin becomes the super admin.
    pub async fn create_user(&self, new: NewUser) -> Result<User, DbError> {
        let is_admin = new.role == Role::Admin;
        let row = sqlx::query_as::<_, UserRow>(
            r"INSERT INTO users (id, username, role, is_admin, is_super_admin)
              VALUES ($1, $2, $3, $4,
                      $4 AND NOT EXISTS (SELECT 1 FROM users WHERE is_super_admin))
              RETURNING *",
        )
        .bind(UserId::new().into_inner())
        .bind(&new.username)
        .bind(new.role.as_str())
        .bind(is_admin)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, &format!("username \"{}\" is taken", new.username)))?;

        let user = User::try_from(row)?;
        tracing::info!(user_id = %user.id, role = %user.role, "User created");
        Ok(user)
    }

    /// Fetch one user.
    pub async fn get_user(&self, id: UserId) -> Result<User, DbError> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
            .bind(id.into_inner())
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("user", id))?
            .try_into()
    }

    /// All users by username.
    pub async fn list_users(&self) -> Result<Vec<User>, DbError> {
        let rows = sqlx::query_as::<_, UserRow>("SELECT * FROM users ORDER BY username")
            .fetch_all(self.pool)
            .await?;
        map_rows(rows)
    }

    /// Change a user's role unless the user is the super admin.
    pub async fn set_user_role(&self, id: UserId, role: Role) -> Result<User, DbError> {
        let mut tx = self.pool.begin().await?;
        let current = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1 FOR UPDATE")
            .bind(id.into_inner())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::not_found("user", id))?;
        if current.is_super_admin {
            return Err(DbError::Forbidden(String::from(
                "the super admin cannot be changed",
            )));
        }
        let row = sqlx::query_as::<_, UserRow>(
            "UPDATE users SET role = $2, is_admin = $3 WHERE id = $1 RETURNING *",
        )
        .bind(id.into_inner())
        .bind(role.as_str())
        .bind(role == Role::Admin)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        row.try_into()
    }

    /// Insert a character with starting progression and the starting title.
    pub async fn create_character(&self, new: NewCharacter) -> Result<Character, DbError> {
        let state = starting_state();
        let [programming, networking, databases, hardware, security, project_management] =
            attributes_to_db(&state.attributes)?;
        let mut tx = self.pool.begin().await?;

        let exists: Option<(uuid::Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE id = $1")
            .bind(new.user_id.into_inner())
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(DbError::not_found("user", new.user_id));
        }

        let row = sqlx::query_as::<_, CharacterRow>(
            r"INSERT INTO characters (id, user_id, name, title, level, xp, xp_to_next_level,
                                      programming, networking, databases, hardware, security,
                                      project_management)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
              RETURNING *",
        )
        .bind(CharacterId::new().into_inner())
        .bind(new.user_id.into_inner())
        .bind(&new.name)
        .bind(STARTING_TITLE)
        .bind(to_db_int(state.level, "level")?)
        .bind(to_db_int(state.xp, "xp")?)
        .bind(to_db_int(state.xp_to_next_level, "xp_to_next_level")?)
        .bind(programming)
        .bind(networking)
        .bind(databases)
        .bind(hardware)
        .bind(security)
        .bind(project_management)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO character_titles (character_id, title, is_active) VALUES ($1, $2, TRUE)",
        )
        .bind(row.id)
        .bind(STARTING_TITLE)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        let character = Character::try_from(row)?;
        tracing::info!(character_id = %character.id, user_id = %new.user_id, "Character created");
        Ok(character)
    }

    /// Fetch one character.
    pub async fn get_character(&self, id: CharacterId) -> Result<Character, DbError> {
        sqlx::query_as::<_, CharacterRow>("SELECT * FROM characters WHERE id = $1")
            .bind(id.into_inner())
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("character", id))?
            .try_into()
    }

    /// Characters of one user, oldest first.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Character>, DbError> {
        let rows = sqlx::query_as::<_, CharacterRow>(
            "SELECT * FROM characters WHERE user_id = $1 ORDER BY created_at",
        )
        .bind(user_id.into_inner())
        .fetch_all(self.pool)
        .await?;
        map_rows(rows)
    }

    /// Rename a character.
    pub async fn rename(&self, id: CharacterId, name: &str) -> Result<Character, DbError> {
        sqlx::query_as::<_, CharacterRow>(
            "UPDATE characters SET name = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id.into_inner())
        .bind(name)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("character", id))?
        .try_into()
    }

    /// Delete a character; owned rows cascade.
    pub async fn delete(&self, id: CharacterId) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM characters WHERE id = $1")
            .bind(id.into_inner())
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("character", id));
        }
        tracing::info!(character_id = %id, "Character deleted");
        Ok(())
    }

    /// Grant XP through the award operation under a row lock.
    pub async fn grant_xp(&self, id: CharacterId, xp: u32) -> Result<XpGrant, DbError> {
        let mut tx = self.pool.begin().await?;
        let current = lock_character(&mut tx, id).await?;
        let award = apply_award(&current.progression, xp, &Attributes::default());
        let character = write_progression(&mut tx, id, &award.state).await?;
        tx.commit().await?;

        tracing::info!(
            character_id = %id,
            xp,
            levels_gained = award.levels_gained,
            "XP granted"
        );
        Ok(XpGrant {
            character,
            levels_gained: award.levels_gained,
            xp_discarded: award.xp_discarded,
        })
    }

    /// Raise one attribute, clamped at the maximum.
    pub async fn increase_attribute(
        &self,
        id: CharacterId,
        attribute: Attribute,
        amount: u32,
    ) -> Result<Character, DbError> {
        let mut tx = self.pool.begin().await?;
        let current = lock_character(&mut tx, id).await?;
        let state = ProgressionState {
            attributes: increase_attribute(&current.progression.attributes, attribute, amount),
            ..current.progression
        };
        let character = write_progression(&mut tx, id, &state).await?;
        tx.commit().await?;
        Ok(character)
    }

    /// Titles a character has earned, oldest first.
    pub async fn list_titles(&self, id: CharacterId) -> Result<Vec<CharacterTitle>, DbError> {
        self.get_character(id).await?;
        let rows = sqlx::query_as::<_, TitleRow>(
            r"SELECT title, is_active, unlocked_at FROM character_titles
              WHERE character_id = $1 ORDER BY unlocked_at",
        )
        .bind(id.into_inner())
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(CharacterTitle::from).collect())
    }

    /// Make an earned title the displayed one.
    pub async fn set_active_title(
        &self,
        id: CharacterId,
        title: &str,
    ) -> Result<Character, DbError> {
        let mut tx = self.pool.begin().await?;
        lock_character(&mut tx, id).await?;
        activate_title(&mut tx, id, title, Utc::now()).await?;
        let character = fetch_character(&mut tx, id).await?;
        tx.commit().await?;
        Ok(character)
    }
}

// ---------------------------------------------------------------------------
// Connection-level helpers
// ---------------------------------------------------------------------------

pub(crate) async fn fetch_character(
    conn: &mut PgConnection,
    id: CharacterId,
) -> Result<Character, DbError> {
    sqlx::query_as::<_, CharacterRow>("SELECT * FROM characters WHERE id = $1")
        .bind(id.into_inner())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("character", id))?
        .try_into()
}

/// Read a character and hold its row lock until the transaction ends.
pub(crate) async fn lock_character(
    conn: &mut PgConnection,
    id: CharacterId,
) -> Result<Character, DbError> {
    sqlx::query_as::<_, CharacterRow>("SELECT * FROM characters WHERE id = $1 FOR UPDATE")
        .bind(id.into_inner())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("character", id))?
        .try_into()
}

/// Store a new progression state on a locked character.
pub(crate) async fn write_progression(
    conn: &mut PgConnection,
    id: CharacterId,
    state: &ProgressionState,
) -> Result<Character, DbError> {
    let [programming, networking, databases, hardware, security, project_management] =
        attributes_to_db(&state.attributes)?;
    sqlx::query_as::<_, CharacterRow>(
        r"UPDATE characters
          SET level = $2, xp = $3, xp_to_next_level = $4,
              programming = $5, networking = $6, databases = $7,
              hardware = $8, security = $9, project_management = $10,
              updated_at = now()
          WHERE id = $1
          RETURNING *",
    )
    .bind(id.into_inner())
    .bind(to_db_int(state.level, "level")?)
    .bind(to_db_int(state.xp, "xp")?)
    .bind(to_db_int(state.xp_to_next_level, "xp_to_next_level")?)
    .bind(programming)
    .bind(networking)
    .bind(databases)
    .bind(hardware)
    .bind(security)
    .bind(project_management)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| DbError::not_found("character", id))?
    .try_into()
}

/// Insert a title if absent and make it the active one.
pub(crate) async fn grant_title(
    conn: &mut PgConnection,
    id: CharacterId,
    title: &str,
    now: DateTime<Utc>,
) -> Result<(), DbError> {
    sqlx::query(
        r"INSERT INTO character_titles (character_id, title, is_active, unlocked_at)
          VALUES ($1, $2, FALSE, $3)
          ON CONFLICT (character_id, title) DO NOTHING",
    )
    .bind(id.into_inner())
    .bind(title)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    activate_title(conn, id, title, now).await
}

/// Switch the active title. The title must already be earned.
pub(crate) async fn activate_title(
    conn: &mut PgConnection,
    id: CharacterId,
    title: &str,
    now: DateTime<Utc>,
) -> Result<(), DbError> {
    let earned: Option<(String,)> = sqlx::query_as(
        "SELECT title FROM character_titles WHERE character_id = $1 AND title = $2",
    )
    .bind(id.into_inner())
    .bind(title)
    .fetch_optional(&mut *conn)
    .await?;
    if earned.is_none() {
        return Err(DbError::NotFound(format!("title \"{title}\" of character {id}")));
    }

    sqlx::query("UPDATE character_titles SET is_active = (title = $2) WHERE character_id = $1")
        .bind(id.into_inner())
        .bind(title)
        .execute(&mut *conn)
        .await?;
    sqlx::query("UPDATE characters SET title = $2, updated_at = $3 WHERE id = $1")
        .bind(id.into_inner())
        .bind(title)
        .bind(now)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
