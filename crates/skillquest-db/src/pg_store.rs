//! [`Store`] implementation on `PostgreSQL`, delegating to the area stores.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use skillquest_progression::GradeRequest;
use skillquest_types::{
    Achievement, Attribute, Character, CharacterAchievement, CharacterId, CharacterQuest,
    CharacterTitle, Equipment, EquipmentId, Group, GroupDetail, GroupId, GroupSummary,
    LeaderboardEntry, LeaderboardKind, Notification, NotificationId, OwnedEquipment, Quest,
    QuestId, QuestOverview, QuestProgress, Role, SubmissionId, SubmissionView, User, UserId,
};

use crate::catalog_store::CatalogStore;
use crate::character_store::CharacterStore;
use crate::error::DbError;
use crate::postgres::PostgresPool;
use crate::progress_store::ProgressStore;
use crate::quest_store::QuestStore;
use crate::social_store::SocialStore;
use crate::store::{
    AssignmentTarget, CompletionOutcome, GradeOutcome, NewAchievement, NewCharacter,
    NewEquipment, NewGroup, NewQuest, NewUser, QuestPatch, Store, Submission, SweepReport,
    UnlockReport, XpGrant,
};

/// The production [`Store`].
#[derive(Clone)]
pub struct PgStore {
    pool: PostgresPool,
}

impl PgStore {
    /// Wrap a connected pool.
    pub const fn new(pool: PostgresPool) -> Self {
        Self { pool }
    }

    /// The underlying pool handle.
    pub const fn pool(&self) -> &PostgresPool {
        &self.pool
    }

    fn characters(&self) -> CharacterStore<'_> {
        CharacterStore::new(self.pool.pool())
    }

    fn catalog(&self) -> CatalogStore<'_> {
        CatalogStore::new(self.pool.pool())
    }

    fn quests(&self) -> QuestStore<'_> {
        QuestStore::new(self.pool.pool())
    }

    fn progress(&self) -> ProgressStore<'_> {
        ProgressStore::new(self.pool.pool())
    }

    fn social(&self) -> SocialStore<'_> {
        SocialStore::new(self.pool.pool())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), DbError> {
        self.pool.ping().await
    }

    async fn create_user(&self, new: NewUser) -> Result<User, DbError> {
        self.characters().create_user(new).await
    }

    async fn get_user(&self, id: UserId) -> Result<User, DbError> {
        self.characters().get_user(id).await
    }

    async fn list_users(&self) -> Result<Vec<User>, DbError> {
        self.characters().list_users().await
    }

    async fn set_user_role(&self, id: UserId, role: Role) -> Result<User, DbError> {
        self.characters().set_user_role(id, role).await
    }

    async fn create_character(&self, new: NewCharacter) -> Result<Character, DbError> {
        self.characters().create_character(new).await
    }

    async fn get_character(&self, id: CharacterId) -> Result<Character, DbError> {
        self.characters().get_character(id).await
    }

    async fn list_characters_for_user(&self, user_id: UserId) -> Result<Vec<Character>, DbError> {
        self.characters().list_for_user(user_id).await
    }

    async fn rename_character(&self, id: CharacterId, name: String) -> Result<Character, DbError> {
        self.characters().rename(id, &name).await
    }

    async fn delete_character(&self, id: CharacterId) -> Result<(), DbError> {
        self.characters().delete(id).await
    }

    async fn grant_xp(&self, id: CharacterId, xp: u32) -> Result<XpGrant, DbError> {
        self.characters().grant_xp(id, xp).await
    }

    async fn increase_attribute(
        &self,
        id: CharacterId,
        attribute: Attribute,
        amount: u32,
    ) -> Result<Character, DbError> {
        self.characters()
            .increase_attribute(id, attribute, amount)
            .await
    }

    async fn list_titles(&self, id: CharacterId) -> Result<Vec<CharacterTitle>, DbError> {
        self.characters().list_titles(id).await
    }

    async fn set_active_title(&self, id: CharacterId, title: String) -> Result<Character, DbError> {
        self.characters().set_active_title(id, &title).await
    }

    async fn list_equipment(&self) -> Result<Vec<Equipment>, DbError> {
        self.catalog().list_equipment().await
    }

    async fn create_equipment(&self, new: NewEquipment) -> Result<Equipment, DbError> {
        self.catalog().create_equipment(new).await
    }

    async fn delete_equipment(&self, id: EquipmentId) -> Result<(), DbError> {
        self.catalog().delete_equipment(id).await
    }

    async fn character_equipment(&self, id: CharacterId) -> Result<Vec<OwnedEquipment>, DbError> {
        self.catalog().character_equipment(id).await
    }

    async fn toggle_equipment(
        &self,
        character_id: CharacterId,
        equipment_id: EquipmentId,
    ) -> Result<OwnedEquipment, DbError> {
        self.catalog()
            .toggle_equipment(character_id, equipment_id)
            .await
    }

    async fn create_quest(&self, new: NewQuest) -> Result<Quest, DbError> {
        self.quests().create(new).await
    }

    async fn get_quest(&self, id: QuestId) -> Result<Quest, DbError> {
        self.quests().get(id).await
    }

    async fn list_quests(&self) -> Result<Vec<Quest>, DbError> {
        self.quests().list().await
    }

    async fn quest_overview(&self, author: Option<UserId>) -> Result<Vec<QuestOverview>, DbError> {
        self.quests().overview(author).await
    }

    async fn update_quest(&self, id: QuestId, patch: QuestPatch) -> Result<Quest, DbError> {
        self.quests().update(id, &patch).await
    }

    async fn delete_quest(&self, id: QuestId) -> Result<(), DbError> {
        self.quests().delete(id).await
    }

    async fn assign_quest(
        &self,
        quest_id: QuestId,
        target: AssignmentTarget,
        assigned_by: Option<UserId>,
    ) -> Result<u64, DbError> {
        self.quests().assign(quest_id, target, assigned_by).await
    }

    async fn quests_for_character(&self, id: CharacterId) -> Result<Vec<CharacterQuest>, DbError> {
        self.quests().for_character(id).await
    }

    async fn start_quest(
        &self,
        character_id: CharacterId,
        quest_id: QuestId,
    ) -> Result<QuestProgress, DbError> {
        self.progress().start(character_id, quest_id).await
    }

    async fn submit_quest(
        &self,
        character_id: CharacterId,
        quest_id: QuestId,
        submission: Submission,
    ) -> Result<QuestProgress, DbError> {
        self.progress()
            .submit(character_id, quest_id, submission)
            .await
    }

    async fn complete_quest(
        &self,
        character_id: CharacterId,
        quest_id: QuestId,
    ) -> Result<CompletionOutcome, DbError> {
        self.progress().complete(character_id, quest_id).await
    }

    async fn list_submissions(&self, quest_id: QuestId) -> Result<Vec<SubmissionView>, DbError> {
        self.progress().list_submissions(quest_id).await
    }

    async fn grade_submission(
        &self,
        id: SubmissionId,
        grader: UserId,
        request: GradeRequest,
    ) -> Result<GradeOutcome, DbError> {
        self.progress().grade(id, grader, &request).await
    }

    async fn sweep(&self, now: DateTime<Utc>) -> Result<SweepReport, DbError> {
        self.progress().sweep(now).await
    }

    async fn list_achievements(&self) -> Result<Vec<Achievement>, DbError> {
        self.catalog().list_achievements().await
    }

    async fn create_achievement(&self, new: NewAchievement) -> Result<Achievement, DbError> {
        self.catalog().create_achievement(new).await
    }

    async fn character_achievements(
        &self,
        id: CharacterId,
    ) -> Result<Vec<CharacterAchievement>, DbError> {
        self.catalog().character_achievements(id).await
    }

    async fn check_achievements(&self, id: CharacterId) -> Result<UnlockReport, DbError> {
        self.catalog().check_achievements(id).await
    }

    async fn leaderboard(
        &self,
        kind: LeaderboardKind,
        limit: u32,
    ) -> Result<Vec<LeaderboardEntry>, DbError> {
        self.social().leaderboard(kind, limit).await
    }

    async fn notifications_for_user(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<Notification>, DbError> {
        self.social().notifications_for_user(user_id, limit).await
    }

    async fn unread_count(&self, user_id: UserId) -> Result<u64, DbError> {
        self.social().unread_count(user_id).await
    }

    async fn mark_notification_read(&self, id: NotificationId) -> Result<(), DbError> {
        self.social().mark_read(id).await
    }

    async fn mark_all_read(&self, user_id: UserId) -> Result<u64, DbError> {
        self.social().mark_all_read(user_id).await
    }

    async fn list_groups(&self) -> Result<Vec<GroupSummary>, DbError> {
        self.social().list_groups().await
    }

    async fn create_group(&self, new: NewGroup) -> Result<Group, DbError> {
        self.social().create_group(new).await
    }

    async fn get_group(&self, id: GroupId) -> Result<GroupDetail, DbError> {
        self.social().get_group(id).await
    }

    async fn delete_group(&self, id: GroupId) -> Result<(), DbError> {
        self.social().delete_group(id).await
    }

    async fn add_group_member(&self, group_id: GroupId, user_id: UserId) -> Result<(), DbError> {
        self.social().add_member(group_id, user_id).await
    }

    async fn remove_group_member(
        &self,
        group_id: GroupId,
        user_id: UserId,
    ) -> Result<(), DbError> {
        self.social().remove_member(group_id, user_id).await
    }
}
