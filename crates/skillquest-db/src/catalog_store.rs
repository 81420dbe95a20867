//! Equipment and achievement catalogues in `PostgreSQL`.

use std::collections::BTreeSet;

use chrono::Utc;
use skillquest_progression::achievements::CharacterStats;
use skillquest_progression::evaluate_unlocks;
use skillquest_types::{
    Achievement, AchievementId, CharacterAchievement, CharacterId, Equipment, EquipmentId,
    OwnedEquipment,
};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::character_store::{fetch_character, lock_character, write_progression};
use crate::convert::{attributes_to_db, from_db_count, to_db_int};
use crate::error::{DbError, conflict_on_unique};
use crate::rows::{
    AchievementRow, CharacterAchievementRow, EquipmentRow, OwnedEquipmentRow, map_rows,
};
use crate::store::{NewAchievement, NewEquipment, UnlockReport};

/// Operations on equipment, inventories and achievements.
pub struct CatalogStore<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogStore<'a> {
    /// Create a store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The equipment catalogue by level then name.
    pub async fn list_equipment(&self) -> Result<Vec<Equipment>, DbError> {
        let rows = sqlx::query_as::<_, EquipmentRow>(
            "SELECT * FROM equipment ORDER BY min_level, name",
        )
        .fetch_all(self.pool)
        .await?;
        map_rows(rows)
    }

    /// Insert a catalogue entry.
    pub async fn create_equipment(&self, new: NewEquipment) -> Result<Equipment, DbError> {
        let [programming, networking, databases, hardware, security, project_management] =
            attributes_to_db(&new.bonuses)?;
        sqlx::query_as::<_, EquipmentRow>(
            r"INSERT INTO equipment (id, name, description, kind, rarity,
                                     programming_bonus, networking_bonus, databases_bonus,
                                     hardware_bonus, security_bonus, project_management_bonus,
                                     min_level)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
              RETURNING *",
        )
        .bind(EquipmentId::new().into_inner())
        .bind(&new.name)
        .bind(&new.description)
        .bind(&new.kind)
        .bind(new.rarity.as_str())
        .bind(programming)
        .bind(networking)
        .bind(databases)
        .bind(hardware)
        .bind(security)
        .bind(project_management)
        .bind(to_db_int(new.min_level, "min_level")?)
        .fetch_one(self.pool)
        .await?
        .try_into()
    }

    /// Remove a catalogue entry. Inventories cascade, quest links are cleared.
    pub async fn delete_equipment(&self, id: EquipmentId) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM equipment WHERE id = $1")
            .bind(id.into_inner())
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("equipment", id));
        }
        Ok(())
    }

    /// A character's inventory, newest first.
    pub async fn character_equipment(
        &self,
        id: CharacterId,
    ) -> Result<Vec<OwnedEquipment>, DbError> {
        let mut conn = self.pool.acquire().await?;
        fetch_character(&mut conn, id).await?;
        let rows = sqlx::query_as::<_, OwnedEquipmentRow>(
            r"SELECT e.*, ce.equipped, ce.acquired_at
              FROM character_equipment ce
              JOIN equipment e ON e.id = ce.equipment_id
              WHERE ce.character_id = $1
              ORDER BY ce.acquired_at DESC",
        )
        .bind(id.into_inner())
        .fetch_all(&mut *conn)
        .await?;
        map_rows(rows)
    }

    /// Flip the equipped flag of an owned item.
    pub async fn toggle_equipment(
        &self,
        character_id: CharacterId,
        equipment_id: EquipmentId,
    ) -> Result<OwnedEquipment, DbError> {
        let mut tx = self.pool.begin().await?;
        let toggled: Option<(Uuid,)> = sqlx::query_as(
            r"UPDATE character_equipment SET equipped = NOT equipped
              WHERE character_id = $1 AND equipment_id = $2
              RETURNING equipment_id",
        )
        .bind(character_id.into_inner())
        .bind(equipment_id.into_inner())
        .fetch_optional(&mut *tx)
        .await?;
        if toggled.is_none() {
            return Err(DbError::NotFound(format!(
                "equipment {equipment_id} of character {character_id}"
            )));
        }
        let row = sqlx::query_as::<_, OwnedEquipmentRow>(
            r"SELECT e.*, ce.equipped, ce.acquired_at
              FROM character_equipment ce
              JOIN equipment e ON e.id = ce.equipment_id
              WHERE ce.character_id = $1 AND ce.equipment_id = $2",
        )
        .bind(character_id.into_inner())
        .bind(equipment_id.into_inner())
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        row.try_into()
    }

    /// The achievement catalogue.
    pub async fn list_achievements(&self) -> Result<Vec<Achievement>, DbError> {
        let rows = sqlx::query_as::<_, AchievementRow>(
            "SELECT * FROM achievements ORDER BY category, requirement_value",
        )
        .fetch_all(self.pool)
        .await?;
        map_rows(rows)
    }

    /// Insert an achievement definition. Names are unique.
    pub async fn create_achievement(&self, new: NewAchievement) -> Result<Achievement, DbError> {
        sqlx::query_as::<_, AchievementRow>(
            r"INSERT INTO achievements (id, name, description, icon, category, xp_reward,
                                        requirement_kind, requirement_value)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
              RETURNING *",
        )
        .bind(AchievementId::new().into_inner())
        .bind(&new.name)
        .bind(&new.description)
        .bind(&new.icon)
        .bind(&new.category)
        .bind(to_db_int(new.xp_reward, "xp_reward")?)
        .bind(new.requirement_kind.as_str())
        .bind(to_db_int(new.requirement_value, "requirement_value")?)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            conflict_on_unique(e, &format!("achievement \"{}\" already exists", new.name))
        })?
        .try_into()
    }

    /// The catalogue with this character's unlock times.
    pub async fn character_achievements(
        &self,
        id: CharacterId,
    ) -> Result<Vec<CharacterAchievement>, DbError> {
        let mut conn = self.pool.acquire().await?;
        fetch_character(&mut conn, id).await?;
        let rows = sqlx::query_as::<_, CharacterAchievementRow>(
            r"SELECT a.*, ca.unlocked_at
              FROM achievements a
              LEFT JOIN character_achievements ca
                ON ca.achievement_id = a.id AND ca.character_id = $1
              ORDER BY a.category, a.requirement_value",
        )
        .bind(id.into_inner())
        .fetch_all(&mut *conn)
        .await?;
        map_rows(rows)
    }

    /// Unlock every achievement the character qualifies for, in one transaction.
    pub async fn check_achievements(&self, id: CharacterId) -> Result<UnlockReport, DbError> {
        let mut tx = self.pool.begin().await?;
        let character = lock_character(&mut tx, id).await?;
        let stats = CharacterStats {
            progression: character.progression,
            completed_quests: completed_quests(&mut tx, id).await?,
            owned_equipment: owned_equipment(&mut tx, id).await?,
        };

        let owned: Vec<(Uuid,)> = sqlx::query_as(
            "SELECT achievement_id FROM character_achievements WHERE character_id = $1",
        )
        .bind(id.into_inner())
        .fetch_all(&mut *tx)
        .await?;
        let owned: BTreeSet<AchievementId> = owned.into_iter().map(|(a,)| a.into()).collect();

        let catalogue: Vec<Achievement> = map_rows(
            sqlx::query_as::<_, AchievementRow>("SELECT * FROM achievements")
                .fetch_all(&mut *tx)
                .await?,
        )?;
        let outcome = evaluate_unlocks(&stats, &catalogue, &owned);

        let now = Utc::now();
        for achievement in &outcome.unlocked {
            sqlx::query(
                r"INSERT INTO character_achievements (character_id, achievement_id, unlocked_at)
                  VALUES ($1, $2, $3)
                  ON CONFLICT DO NOTHING",
            )
            .bind(id.into_inner())
            .bind(achievement.id.into_inner())
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }
        let character = match &outcome.award {
            Some(award) => write_progression(&mut tx, id, &award.state).await?,
            None => character,
        };
        tx.commit().await?;

        if !outcome.unlocked.is_empty() {
            tracing::info!(
                character_id = %id,
                unlocked = outcome.unlocked.len(),
                xp = outcome.xp_granted(),
                "Achievements unlocked"
            );
        }
        Ok(UnlockReport {
            unlocked: outcome.unlocked.into_iter().cloned().collect(),
            character,
        })
    }
}

/// Quests the character has completed at least once.
pub(crate) async fn completed_quests(
    conn: &mut PgConnection,
    id: CharacterId,
) -> Result<u64, DbError> {
    let (n,): (i64,) = sqlx::query_as(
        r"SELECT COUNT(*) FROM character_quests
          WHERE character_id = $1 AND last_completed_at IS NOT NULL",
    )
    .bind(id.into_inner())
    .fetch_one(&mut *conn)
    .await?;
    Ok(from_db_count(n))
}

async fn owned_equipment(conn: &mut PgConnection, id: CharacterId) -> Result<u64, DbError> {
    let (n,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM character_equipment WHERE character_id = $1")
            .bind(id.into_inner())
            .fetch_one(&mut *conn)
            .await?;
    Ok(from_db_count(n))
}
