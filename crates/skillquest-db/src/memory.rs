//! In-process [`Store`] backed by ordered maps behind one `RwLock`.
//!
//! Every mutating operation takes the write guard for its whole duration,
//! which gives the same single-writer guarantee the `PostgreSQL` store gets
//! from row locks. IDs are UUID v7, so map order is creation order.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use skillquest_progression::achievements::CharacterStats;
use skillquest_progression::lifecycle::{ensure_level, is_overdue};
use skillquest_progression::{
    AwardOutcome, GradeRequest, QuestAction, Settlement, apply_award, evaluate_unlocks,
    increase_attribute, schedule, settle_completion, settle_grade, starting_state, transition,
};
use skillquest_types::{
    Achievement, AchievementId, Attribute, Attributes, Character, CharacterAchievement, CharacterId,
    CharacterQuest, CharacterTitle, Equipment, EquipmentId, Group, GroupDetail, GroupId,
    GroupMember, GroupSummary, LeaderboardEntry, LeaderboardKind, Notification, NotificationId,
    OwnedEquipment, Quest, QuestId, QuestOverview, QuestProgress, QuestStatus, Role,
    SubmissionId, SubmissionView, User, UserId,
};
use tokio::sync::RwLock;

use crate::error::DbError;
use crate::notices::{self, Notice};
use crate::store::{
    AssignmentTarget, CompletionOutcome, GradeOutcome, NewAchievement, NewCharacter,
    NewEquipment, NewGroup, NewQuest, NewUser, QuestPatch, STARTING_TITLE, Store, Submission,
    SweepReport, UnlockReport, XpGrant,
};

#[derive(Debug, Clone, Copy)]
struct Owned {
    equipped: bool,
    acquired_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
struct Assignment {
    quest_id: QuestId,
    target: AssignmentTarget,
}

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    characters: BTreeMap<CharacterId, Character>,
    titles: BTreeMap<(CharacterId, String), CharacterTitle>,
    equipment: BTreeMap<EquipmentId, Equipment>,
    inventory: BTreeMap<(CharacterId, EquipmentId), Owned>,
    quests: BTreeMap<QuestId, Quest>,
    assignments: Vec<Assignment>,
    progress: BTreeMap<SubmissionId, QuestProgress>,
    achievements: BTreeMap<AchievementId, Achievement>,
    unlocks: BTreeMap<(CharacterId, AchievementId), DateTime<Utc>>,
    groups: BTreeMap<GroupId, Group>,
    members: BTreeMap<(GroupId, UserId), DateTime<Utc>>,
    notifications: BTreeMap<NotificationId, Notification>,
}

impl Tables {
    fn user(&self, id: UserId) -> Result<&User, DbError> {
        self.users.get(&id).ok_or_else(|| DbError::not_found("user", id))
    }

    fn character(&self, id: CharacterId) -> Result<&Character, DbError> {
        self.characters
            .get(&id)
            .ok_or_else(|| DbError::not_found("character", id))
    }

    fn character_mut(&mut self, id: CharacterId) -> Result<&mut Character, DbError> {
        self.characters
            .get_mut(&id)
            .ok_or_else(|| DbError::not_found("character", id))
    }

    fn quest(&self, id: QuestId) -> Result<&Quest, DbError> {
        self.quests.get(&id).ok_or_else(|| DbError::not_found("quest", id))
    }

    fn group(&self, id: GroupId) -> Result<&Group, DbError> {
        self.groups.get(&id).ok_or_else(|| DbError::not_found("group", id))
    }

    fn progress_id(&self, character_id: CharacterId, quest_id: QuestId) -> Option<SubmissionId> {
        self.progress
            .values()
            .find(|p| p.character_id == character_id && p.quest_id == quest_id)
            .map(|p| p.id)
    }

    fn owns(&self, character_id: CharacterId, equipment_id: EquipmentId) -> bool {
        self.inventory.contains_key(&(character_id, equipment_id))
    }

    fn completed_quests(&self, character_id: CharacterId) -> u64 {
        count(
            self.progress
                .values()
                .filter(|p| p.character_id == character_id && p.last_completed_at.is_some()),
        )
    }

    fn stats(&self, character: &Character) -> CharacterStats {
        CharacterStats {
            progression: character.progression,
            completed_quests: self.completed_quests(character.id),
            owned_equipment: count(self.inventory.keys().filter(|(c, _)| *c == character.id)),
        }
    }

    fn notify(&mut self, user_id: UserId, notice: Notice, now: DateTime<Utc>) {
        let id = NotificationId::new();
        self.notifications.insert(
            id,
            Notification {
                id,
                user_id,
                kind: notice.kind,
                title: notice.title,
                message: notice.message,
                is_read: false,
                created_at: now,
                read_at: None,
            },
        );
    }

    fn write_award(
        &mut self,
        character_id: CharacterId,
        award: &AwardOutcome,
        now: DateTime<Utc>,
    ) -> Result<Character, DbError> {
        let character = self.character_mut(character_id)?;
        character.progression = award.state;
        character.updated_at = now;
        Ok(character.clone())
    }

    fn grant_title(
        &mut self,
        character_id: CharacterId,
        title: &str,
        now: DateTime<Utc>,
    ) -> Result<(), DbError> {
        self.titles
            .entry((character_id, title.to_owned()))
            .or_insert_with(|| CharacterTitle {
                title: title.to_owned(),
                is_active: false,
                unlocked_at: now,
            });
        self.activate_title(character_id, title, now)
    }

    fn activate_title(
        &mut self,
        character_id: CharacterId,
        title: &str,
        now: DateTime<Utc>,
    ) -> Result<(), DbError> {
        if !self.titles.contains_key(&(character_id, title.to_owned())) {
            return Err(DbError::NotFound(format!(
                "title \"{title}\" of character {character_id}"
            )));
        }
        for ((owner, name), entry) in &mut self.titles {
            if *owner == character_id {
                entry.is_active = name == title;
            }
        }
        let character = self.character_mut(character_id)?;
        title.clone_into(&mut character.title);
        character.updated_at = now;
        Ok(())
    }

    /// Write back a grade or completion settlement for one character.
    fn settle(
        &mut self,
        character_id: CharacterId,
        settlement: &Settlement,
        now: DateTime<Utc>,
    ) -> Result<Option<Character>, DbError> {
        let Some(award) = &settlement.award else {
            return Ok(None);
        };
        self.write_award(character_id, award, now)?;
        if let Some(title) = &settlement.title {
            self.grant_title(character_id, title, now)?;
        }
        if let Some(equipment_id) = settlement.equipment_id
            && self.equipment.contains_key(&equipment_id)
        {
            self.inventory
                .entry((character_id, equipment_id))
                .or_insert(Owned {
                    equipped: false,
                    acquired_at: now,
                });
        }
        self.character(character_id).map(|c| Some(c.clone()))
    }

    fn ensure_can_start(&self, character: &Character, quest: &Quest) -> Result<(), DbError> {
        ensure_level(character.progression.level, quest.min_level)?;
        if let Some(required) = quest.required_equipment_id
            && !self.owns(character.id, required)
        {
            let name = self
                .equipment
                .get(&required)
                .map_or_else(|| required.to_string(), |e| e.name.clone());
            return Err(DbError::Forbidden(format!("required equipment missing: {name}")));
        }
        Ok(())
    }

    fn insert_progress(
        &mut self,
        character_id: CharacterId,
        quest_id: QuestId,
    ) -> SubmissionId {
        let id = SubmissionId::new();
        self.progress.insert(
            id,
            QuestProgress {
                id,
                character_id,
                quest_id,
                status: QuestStatus::Available,
                started_at: None,
                submitted_at: None,
                submission_text: None,
                submission_file_url: None,
                grade: None,
                feedback: None,
                graded_at: None,
                graded_by: None,
                completed_at: None,
                last_completed_at: None,
            },
        );
        id
    }

    fn progress_mut(&mut self, id: SubmissionId) -> Result<&mut QuestProgress, DbError> {
        self.progress
            .get_mut(&id)
            .ok_or_else(|| DbError::not_found("submission", id))
    }

    fn score(&self, character: &Character, kind: LeaderboardKind) -> u64 {
        match kind {
            LeaderboardKind::Level => u64::from(character.progression.level),
            LeaderboardKind::Stats => character.progression.attributes.total(),
            LeaderboardKind::Achievements => {
                count(self.unlocks.keys().filter(|(c, _)| *c == character.id))
            }
            LeaderboardKind::Quests => self.completed_quests(character.id),
        }
    }
}

fn count<I: Iterator>(iter: I) -> u64 {
    u64::try_from(iter.count()).unwrap_or(u64::MAX)
}

fn bump(counter: &mut u64) {
    *counter = counter.saturating_add(1);
}

/// Clear everything a fresh cycle of a repeatable quest must not inherit.
fn reopen(progress: &mut QuestProgress, status: QuestStatus) {
    progress.status = status;
    progress.started_at = None;
    progress.submitted_at = None;
    progress.submission_text = None;
    progress.submission_file_url = None;
    progress.grade = None;
    progress.feedback = None;
    progress.graded_at = None;
    progress.graded_by = None;
    progress.completed_at = None;
}

/// A [`Store`] held entirely in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), DbError> {
        Ok(())
    }

    // ----- users -----

    async fn create_user(&self, new: NewUser) -> Result<User, DbError> {
        let mut t = self.tables.write().await;
        if t.users.values().any(|u| u.username == new.username) {
            return Err(DbError::Conflict(format!(
                "username \"{}\" is taken",
                new.username
            )));
        }
        let is_admin = new.role == Role::Admin;
        let user = User {
            id: UserId::new(),
            username: new.username,
            role: new.role,
            is_admin,
            is_super_admin: is_admin && !t.users.values().any(|u| u.is_super_admin),
            created_at: Utc::now(),
        };
        t.users.insert(user.id, user.clone());
        tracing::info!(user_id = %user.id, role = %user.role, "User created");
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> Result<User, DbError> {
        self.tables.read().await.user(id).cloned()
    }

    async fn list_users(&self) -> Result<Vec<User>, DbError> {
        let t = self.tables.read().await;
        let mut users: Vec<User> = t.users.values().cloned().collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn set_user_role(&self, id: UserId, role: Role) -> Result<User, DbError> {
        let mut t = self.tables.write().await;
        let user = t
            .users
            .get_mut(&id)
            .ok_or_else(|| DbError::not_found("user", id))?;
        if user.is_super_admin {
            return Err(DbError::Forbidden(String::from(
                "the super admin cannot be changed",
            )));
        }
        user.role = role;
        user.is_admin = role == Role::Admin;
        Ok(user.clone())
    }

    // ----- characters -----

    async fn create_character(&self, new: NewCharacter) -> Result<Character, DbError> {
        let mut t = self.tables.write().await;
        t.user(new.user_id)?;
        let now = Utc::now();
        let character = Character {
            id: CharacterId::new(),
            user_id: new.user_id,
            name: new.name,
            title: STARTING_TITLE.to_owned(),
            progression: starting_state(),
            created_at: now,
            updated_at: now,
        };
        t.characters.insert(character.id, character.clone());
        t.titles.insert(
            (character.id, STARTING_TITLE.to_owned()),
            CharacterTitle {
                title: STARTING_TITLE.to_owned(),
                is_active: true,
                unlocked_at: now,
            },
        );
        tracing::info!(character_id = %character.id, user_id = %new.user_id, "Character created");
        Ok(character)
    }

    async fn get_character(&self, id: CharacterId) -> Result<Character, DbError> {
        self.tables.read().await.character(id).cloned()
    }

    async fn list_characters_for_user(&self, user_id: UserId) -> Result<Vec<Character>, DbError> {
        let t = self.tables.read().await;
        Ok(t.characters
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn rename_character(&self, id: CharacterId, name: String) -> Result<Character, DbError> {
        let mut t = self.tables.write().await;
        let character = t.character_mut(id)?;
        character.name = name;
        character.updated_at = Utc::now();
        Ok(character.clone())
    }

    async fn delete_character(&self, id: CharacterId) -> Result<(), DbError> {
        let mut t = self.tables.write().await;
        t.characters
            .remove(&id)
            .ok_or_else(|| DbError::not_found("character", id))?;
        t.titles.retain(|(c, _), _| *c != id);
        t.inventory.retain(|(c, _), _| *c != id);
        t.progress.retain(|_, p| p.character_id != id);
        t.unlocks.retain(|(c, _), _| *c != id);
        tracing::info!(character_id = %id, "Character deleted");
        Ok(())
    }

    async fn grant_xp(&self, id: CharacterId, xp: u32) -> Result<XpGrant, DbError> {
        let mut t = self.tables.write().await;
        let state = t.character(id)?.progression;
        let award = apply_award(&state, xp, &Attributes::default());
        let character = t.write_award(id, &award, Utc::now())?;
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

    async fn increase_attribute(
        &self,
        id: CharacterId,
        attribute: Attribute,
        amount: u32,
    ) -> Result<Character, DbError> {
        let mut t = self.tables.write().await;
        let character = t.character_mut(id)?;
        character.progression.attributes =
            increase_attribute(&character.progression.attributes, attribute, amount);
        character.updated_at = Utc::now();
        Ok(character.clone())
    }

    async fn list_titles(&self, id: CharacterId) -> Result<Vec<CharacterTitle>, DbError> {
        let t = self.tables.read().await;
        t.character(id)?;
        let mut titles: Vec<CharacterTitle> = t
            .titles
            .iter()
            .filter(|((c, _), _)| *c == id)
            .map(|(_, title)| title.clone())
            .collect();
        titles.sort_by_key(|title| title.unlocked_at);
        Ok(titles)
    }

    async fn set_active_title(&self, id: CharacterId, title: String) -> Result<Character, DbError> {
        let mut t = self.tables.write().await;
        t.character(id)?;
        t.activate_title(id, &title, Utc::now())?;
        t.character(id).cloned()
    }

    // ----- equipment -----

    async fn list_equipment(&self) -> Result<Vec<Equipment>, DbError> {
        let t = self.tables.read().await;
        let mut items: Vec<Equipment> = t.equipment.values().cloned().collect();
        items.sort_by(|a, b| a.min_level.cmp(&b.min_level).then_with(|| a.name.cmp(&b.name)));
        Ok(items)
    }

    async fn create_equipment(&self, new: NewEquipment) -> Result<Equipment, DbError> {
        let mut t = self.tables.write().await;
        let item = Equipment {
            id: EquipmentId::new(),
            name: new.name,
            description: new.description,
            kind: new.kind,
            rarity: new.rarity,
            bonuses: new.bonuses,
            min_level: new.min_level,
            created_at: Utc::now(),
        };
        t.equipment.insert(item.id, item.clone());
        Ok(item)
    }

    async fn delete_equipment(&self, id: EquipmentId) -> Result<(), DbError> {
        let mut t = self.tables.write().await;
        t.equipment
            .remove(&id)
            .ok_or_else(|| DbError::not_found("equipment", id))?;
        t.inventory.retain(|(_, e), _| *e != id);
        for quest in t.quests.values_mut() {
            if quest.required_equipment_id == Some(id) {
                quest.required_equipment_id = None;
            }
            if quest.rewards.equipment_reward_id == Some(id) {
                quest.rewards.equipment_reward_id = None;
            }
        }
        Ok(())
    }

    async fn character_equipment(&self, id: CharacterId) -> Result<Vec<OwnedEquipment>, DbError> {
        let t = self.tables.read().await;
        t.character(id)?;
        Ok(t.inventory
            .iter()
            .filter(|((c, _), _)| *c == id)
            .filter_map(|((_, e), owned)| {
                t.equipment.get(e).map(|equipment| OwnedEquipment {
                    equipment: equipment.clone(),
                    equipped: owned.equipped,
                    acquired_at: owned.acquired_at,
                })
            })
            .collect())
    }

    async fn toggle_equipment(
        &self,
        character_id: CharacterId,
        equipment_id: EquipmentId,
    ) -> Result<OwnedEquipment, DbError> {
        let mut t = self.tables.write().await;
        let equipment = t
            .equipment
            .get(&equipment_id)
            .cloned()
            .ok_or_else(|| DbError::not_found("equipment", equipment_id))?;
        let owned = t
            .inventory
            .get_mut(&(character_id, equipment_id))
            .ok_or_else(|| {
                DbError::NotFound(format!(
                    "equipment {equipment_id} of character {character_id}"
                ))
            })?;
        owned.equipped = !owned.equipped;
        Ok(OwnedEquipment {
            equipment,
            equipped: owned.equipped,
            acquired_at: owned.acquired_at,
        })
    }

    // ----- quests -----

    async fn create_quest(&self, new: NewQuest) -> Result<Quest, DbError> {
        let mut t = self.tables.write().await;
        let quest = Quest {
            id: QuestId::new(),
            title: new.title,
            description: new.description,
            category: new.category,
            difficulty: new.difficulty,
            rewards: new.rewards,
            required_equipment_id: new.required_equipment_id,
            min_level: new.min_level,
            prerequisite_quest_id: new.prerequisite_quest_id,
            created_by: Some(new.created_by),
            repeat: new.repeat,
            due_date: new.due_date,
            created_at: Utc::now(),
        };
        t.quests.insert(quest.id, quest.clone());
        tracing::info!(quest_id = %quest.id, xp_reward = quest.rewards.xp_reward, "Quest created");
        Ok(quest)
    }

    async fn get_quest(&self, id: QuestId) -> Result<Quest, DbError> {
        self.tables.read().await.quest(id).cloned()
    }

    async fn list_quests(&self) -> Result<Vec<Quest>, DbError> {
        let t = self.tables.read().await;
        let mut quests: Vec<Quest> = t.quests.values().cloned().collect();
        quests.sort_by_key(|q| (q.min_level, q.difficulty));
        Ok(quests)
    }

    async fn quest_overview(&self, author: Option<UserId>) -> Result<Vec<QuestOverview>, DbError> {
        let t = self.tables.read().await;
        Ok(t.quests
            .values()
            .rev()
            .filter(|q| author.is_none() || q.created_by == author)
            .map(|q| QuestOverview {
                quest: q.clone(),
                assignment_count: count(t.assignments.iter().filter(|a| a.quest_id == q.id)),
                pending_submissions: count(
                    t.progress
                        .values()
                        .filter(|p| p.quest_id == q.id && p.status == QuestStatus::Submitted),
                ),
            })
            .collect())
    }

    async fn update_quest(&self, id: QuestId, patch: QuestPatch) -> Result<Quest, DbError> {
        let mut t = self.tables.write().await;
        let quest = t
            .quests
            .get_mut(&id)
            .ok_or_else(|| DbError::not_found("quest", id))?;
        patch.apply_to(quest);
        Ok(quest.clone())
    }

    async fn delete_quest(&self, id: QuestId) -> Result<(), DbError> {
        let mut t = self.tables.write().await;
        t.quests
            .remove(&id)
            .ok_or_else(|| DbError::not_found("quest", id))?;
        t.progress.retain(|_, p| p.quest_id != id);
        t.assignments.retain(|a| a.quest_id != id);
        for quest in t.quests.values_mut() {
            if quest.prerequisite_quest_id == Some(id) {
                quest.prerequisite_quest_id = None;
            }
        }
        tracing::info!(quest_id = %id, "Quest deleted");
        Ok(())
    }

    async fn assign_quest(
        &self,
        quest_id: QuestId,
        target: AssignmentTarget,
        _assigned_by: Option<UserId>,
    ) -> Result<u64, DbError> {
        let mut t = self.tables.write().await;
        let title = t.quest(quest_id)?.title.clone();
        let recipients: Vec<UserId> = match target {
            AssignmentTarget::User(user_id) => {
                t.user(user_id)?;
                vec![user_id]
            }
            AssignmentTarget::Group(group_id) => {
                t.group(group_id)?;
                t.members
                    .keys()
                    .filter(|(g, _)| *g == group_id)
                    .map(|(_, u)| *u)
                    .collect()
            }
        };
        t.assignments.push(Assignment { quest_id, target });

        let now = Utc::now();
        let mut assigned = 0_u64;
        for user_id in recipients {
            let characters: Vec<CharacterId> = t
                .characters
                .values()
                .filter(|c| c.user_id == user_id)
                .map(|c| c.id)
                .collect();
            for character_id in characters {
                if t.progress_id(character_id, quest_id).is_none() {
                    t.insert_progress(character_id, quest_id);
                    bump(&mut assigned);
                }
            }
            t.notify(user_id, notices::quest_assigned(&title), now);
        }
        tracing::info!(quest_id = %quest_id, assigned, "Quest assigned");
        Ok(assigned)
    }

    async fn quests_for_character(&self, id: CharacterId) -> Result<Vec<CharacterQuest>, DbError> {
        let t = self.tables.read().await;
        let character = t.character(id)?;
        let mut quests: Vec<CharacterQuest> = t
            .quests
            .values()
            .filter(|q| q.min_level <= character.progression.level)
            .map(|q| {
                let progress = t
                    .progress_id(id, q.id)
                    .and_then(|pid| t.progress.get(&pid))
                    .cloned();
                let has_required_equipment =
                    q.required_equipment_id.is_none_or(|e| t.owns(id, e));
                CharacterQuest {
                    quest: q.clone(),
                    status: progress.as_ref().map_or(QuestStatus::Available, |p| p.status),
                    progress,
                    has_required_equipment,
                    is_locked: !has_required_equipment,
                }
            })
            .collect();
        quests.sort_by_key(|cq| (cq.quest.min_level, cq.quest.difficulty));
        Ok(quests)
    }

    // ----- quest progress -----

    async fn start_quest(
        &self,
        character_id: CharacterId,
        quest_id: QuestId,
    ) -> Result<QuestProgress, DbError> {
        let mut t = self.tables.write().await;
        let character = t.character(character_id)?;
        let quest = t.quest(quest_id)?;
        t.ensure_can_start(character, quest)?;

        let id = t
            .progress_id(character_id, quest_id)
            .unwrap_or_else(|| t.insert_progress(character_id, quest_id));
        let progress = t.progress_mut(id)?;
        progress.status = transition(progress.status, QuestAction::Start)?;
        progress.started_at = Some(Utc::now());
        tracing::info!(character_id = %character_id, quest_id = %quest_id, "Quest started");
        Ok(progress.clone())
    }

    async fn submit_quest(
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
        let mut t = self.tables.write().await;
        let character_name = t.character(character_id)?.name.clone();
        let quest = t.quest(quest_id)?;
        let (title, author) = (quest.title.clone(), quest.created_by);
        let id = t.progress_id(character_id, quest_id).ok_or_else(|| {
            DbError::NotFound(format!(
                "progress of character {character_id} on quest {quest_id}"
            ))
        })?;

        let now = Utc::now();
        let progress = t.progress_mut(id)?;
        progress.status = transition(progress.status, QuestAction::Submit)?;
        progress.submission_text = submission.text;
        progress.submission_file_url = submission.file_url;
        progress.submitted_at = Some(now);
        progress.grade = None;
        progress.feedback = None;
        progress.graded_at = None;
        progress.graded_by = None;
        let snapshot = progress.clone();

        if let Some(author) = author {
            t.notify(author, notices::submission_received(&character_name, &title), now);
        }
        tracing::info!(character_id = %character_id, quest_id = %quest_id, "Quest submitted");
        Ok(snapshot)
    }

    async fn complete_quest(
        &self,
        character_id: CharacterId,
        quest_id: QuestId,
    ) -> Result<CompletionOutcome, DbError> {
        let mut t = self.tables.write().await;
        let character = t.character(character_id)?;
        let quest = t.quest(quest_id)?;
        t.ensure_can_start(character, quest)?;
        let state = character.progression;
        let rewards = quest.rewards.clone();

        let existing = t.progress_id(character_id, quest_id);
        let status = existing
            .and_then(|id| t.progress.get(&id))
            .map_or(QuestStatus::Available, |p| p.status);
        let now = Utc::now();
        let settlement = settle_completion(status, &state, &rewards, now)?;

        let id = existing.unwrap_or_else(|| t.insert_progress(character_id, quest_id));
        let progress = t.progress_mut(id)?;
        progress.status = settlement.status;
        progress.completed_at = settlement.completed_at;
        progress.last_completed_at = settlement.completed_at;
        let progress = progress.clone();

        let character = t
            .settle(character_id, &settlement, now)?
            .ok_or_else(|| DbError::Corrupt(String::from("completion without award")))?;
        let rewards = settlement
            .granted(&rewards)
            .ok_or_else(|| DbError::Corrupt(String::from("completion without award")))?;
        tracing::info!(
            character_id = %character_id,
            quest_id = %quest_id,
            levels_gained = rewards.levels_gained,
            "Quest completed"
        );
        Ok(CompletionOutcome {
            progress,
            character,
            rewards,
        })
    }

    async fn list_submissions(&self, quest_id: QuestId) -> Result<Vec<SubmissionView>, DbError> {
        let t = self.tables.read().await;
        t.quest(quest_id)?;
        let mut views: Vec<SubmissionView> = t
            .progress
            .values()
            .filter(|p| p.quest_id == quest_id && p.submitted_at.is_some())
            .filter_map(|p| {
                let character = t.characters.get(&p.character_id)?;
                let user = t.users.get(&character.user_id)?;
                Some(SubmissionView {
                    progress: p.clone(),
                    character_name: character.name.clone(),
                    username: user.username.clone(),
                })
            })
            .collect();
        views.sort_by(|a, b| b.progress.submitted_at.cmp(&a.progress.submitted_at));
        Ok(views)
    }

    async fn grade_submission(
        &self,
        id: SubmissionId,
        grader: UserId,
        request: GradeRequest,
    ) -> Result<GradeOutcome, DbError> {
        request.validate()?;
        let mut t = self.tables.write().await;
        let progress = t
            .progress
            .get(&id)
            .cloned()
            .ok_or_else(|| DbError::not_found("submission", id))?;
        let quest = t.quest(progress.quest_id)?;
        if quest.created_by != Some(grader) {
            return Err(DbError::Forbidden(String::from(
                "only the quest's author may grade it",
            )));
        }
        let (title, rewards) = (quest.title.clone(), quest.rewards.clone());
        let character = t.character(progress.character_id)?;
        let owner = character.user_id;
        let now = Utc::now();
        let settlement = settle_grade(
            progress.status,
            progress.grade,
            &request,
            &character.progression,
            &rewards,
            now,
        )?;

        let feedback = request.trimmed_feedback().map(str::to_owned);
        let row = t.progress_mut(id)?;
        row.status = settlement.status;
        row.grade = Some(request.decision);
        row.feedback.clone_from(&feedback);
        row.graded_at = Some(now);
        row.graded_by = Some(grader);
        if settlement.completed_at.is_some() {
            row.completed_at = settlement.completed_at;
            row.last_completed_at = settlement.completed_at;
        }
        let progress = row.clone();

        let character = t.settle(progress.character_id, &settlement, now)?;
        t.notify(
            owner,
            notices::submission_graded(&title, request.decision, feedback.as_deref()),
            now,
        );
        tracing::info!(
            submission_id = %id,
            decision = %request.decision,
            levels_gained = settlement.award.as_ref().map_or(0, |a| a.levels_gained),
            "Submission graded"
        );
        Ok(GradeOutcome {
            progress,
            character,
            rewards: settlement.granted(&rewards),
        })
    }

    async fn sweep(&self, now: DateTime<Utc>) -> Result<SweepReport, DbError> {
        let mut guard = self.tables.write().await;
        let t = &mut *guard;
        let mut report = SweepReport::default();
        for progress in t.progress.values_mut() {
            let Some(quest) = t.quests.get(&progress.quest_id) else {
                continue;
            };
            if is_overdue(quest.due_date, now)
                && let Ok(failed) = transition(progress.status, QuestAction::Expire)
            {
                progress.status = failed;
                bump(&mut report.expired);
            }
            let Some(rule) = &quest.repeat else {
                continue;
            };
            let Ok(valid) = schedule::validate(rule) else {
                tracing::warn!(quest_id = %quest.id, "Skipping quest with invalid repeat rule");
                continue;
            };
            let due = schedule::reopen_anchor(progress).is_some_and(|anchor| valid.is_due(anchor, now));
            if due && let Ok(available) = transition(progress.status, QuestAction::Reopen) {
                reopen(progress, available);
                bump(&mut report.reopened);
            }
        }
        if report != SweepReport::default() {
            tracing::info!(
                expired = report.expired,
                reopened = report.reopened,
                "Maintenance sweep changed quest progress"
            );
        }
        Ok(report)
    }

    // ----- achievements -----

    async fn list_achievements(&self) -> Result<Vec<Achievement>, DbError> {
        let t = self.tables.read().await;
        let mut list: Vec<Achievement> = t.achievements.values().cloned().collect();
        list.sort_by(|a, b| {
            a.category
                .cmp(&b.category)
                .then_with(|| a.requirement_value.cmp(&b.requirement_value))
        });
        Ok(list)
    }

    async fn create_achievement(&self, new: NewAchievement) -> Result<Achievement, DbError> {
        let mut t = self.tables.write().await;
        if t.achievements.values().any(|a| a.name == new.name) {
            return Err(DbError::Conflict(format!(
                "achievement \"{}\" already exists",
                new.name
            )));
        }
        let achievement = Achievement {
            id: AchievementId::new(),
            name: new.name,
            description: new.description,
            icon: new.icon,
            category: new.category,
            xp_reward: new.xp_reward,
            requirement_kind: new.requirement_kind,
            requirement_value: new.requirement_value,
        };
        t.achievements.insert(achievement.id, achievement.clone());
        Ok(achievement)
    }

    async fn character_achievements(
        &self,
        id: CharacterId,
    ) -> Result<Vec<CharacterAchievement>, DbError> {
        let t = self.tables.read().await;
        t.character(id)?;
        Ok(t.achievements
            .values()
            .map(|a| CharacterAchievement {
                achievement: a.clone(),
                unlocked_at: t.unlocks.get(&(id, a.id)).copied(),
            })
            .collect())
    }

    async fn check_achievements(&self, id: CharacterId) -> Result<UnlockReport, DbError> {
        let mut t = self.tables.write().await;
        let character = t.character(id)?;
        let stats = t.stats(character);
        let owned: BTreeSet<AchievementId> = t
            .unlocks
            .keys()
            .filter(|(c, _)| *c == id)
            .map(|(_, a)| *a)
            .collect();
        let catalogue: Vec<Achievement> = t.achievements.values().cloned().collect();
        let outcome = evaluate_unlocks(&stats, &catalogue, &owned);

        let now = Utc::now();
        for achievement in &outcome.unlocked {
            t.unlocks.insert((id, achievement.id), now);
        }
        let character = match &outcome.award {
            Some(award) => t.write_award(id, award, now)?,
            None => t.character(id)?.clone(),
        };
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

    // ----- leaderboard -----

    async fn leaderboard(
        &self,
        kind: LeaderboardKind,
        limit: u32,
    ) -> Result<Vec<LeaderboardEntry>, DbError> {
        let t = self.tables.read().await;
        let mut scored: Vec<(u64, &Character)> = t
            .characters
            .values()
            .map(|c| (t.score(c, kind), c))
            .collect();
        scored.sort_by(|(sa, a), (sb, b)| {
            sb.cmp(sa)
                .then_with(|| b.progression.level.cmp(&a.progression.level))
                .then_with(|| b.progression.xp.cmp(&a.progression.xp))
                .then_with(|| a.name.cmp(&b.name))
        });
        let take = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(scored
            .into_iter()
            .take(take)
            .zip(1_u32..)
            .map(|((score, c), rank)| LeaderboardEntry {
                rank,
                character_id: c.id,
                name: c.name.clone(),
                title: c.title.clone(),
                username: t
                    .users
                    .get(&c.user_id)
                    .map(|u| u.username.clone())
                    .unwrap_or_default(),
                level: c.progression.level,
                score,
            })
            .collect())
    }

    // ----- notifications -----

    async fn notifications_for_user(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<Notification>, DbError> {
        let t = self.tables.read().await;
        let take = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(t.notifications
            .values()
            .rev()
            .filter(|n| n.user_id == user_id)
            .take(take)
            .cloned()
            .collect())
    }

    async fn unread_count(&self, user_id: UserId) -> Result<u64, DbError> {
        let t = self.tables.read().await;
        Ok(count(
            t.notifications
                .values()
                .filter(|n| n.user_id == user_id && !n.is_read),
        ))
    }

    async fn mark_notification_read(&self, id: NotificationId) -> Result<(), DbError> {
        let mut t = self.tables.write().await;
        let notification = t
            .notifications
            .get_mut(&id)
            .ok_or_else(|| DbError::not_found("notification", id))?;
        if !notification.is_read {
            notification.is_read = true;
            notification.read_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn mark_all_read(&self, user_id: UserId) -> Result<u64, DbError> {
        let mut t = self.tables.write().await;
        let now = Utc::now();
        let mut changed = 0_u64;
        for notification in t
            .notifications
            .values_mut()
            .filter(|n| n.user_id == user_id && !n.is_read)
        {
            notification.is_read = true;
            notification.read_at = Some(now);
            bump(&mut changed);
        }
        Ok(changed)
    }

    // ----- groups -----

    async fn list_groups(&self) -> Result<Vec<GroupSummary>, DbError> {
        let t = self.tables.read().await;
        let mut groups: Vec<GroupSummary> = t
            .groups
            .values()
            .map(|g| GroupSummary {
                group: g.clone(),
                member_count: count(t.members.keys().filter(|(gid, _)| *gid == g.id)),
            })
            .collect();
        groups.sort_by(|a, b| a.group.name.cmp(&b.group.name));
        Ok(groups)
    }

    async fn create_group(&self, new: NewGroup) -> Result<Group, DbError> {
        let mut t = self.tables.write().await;
        if t.groups.values().any(|g| g.name == new.name) {
            return Err(DbError::Conflict(format!(
                "group \"{}\" already exists",
                new.name
            )));
        }
        let group = Group {
            id: GroupId::new(),
            name: new.name,
            description: new.description,
            created_by: new.created_by,
            created_at: Utc::now(),
        };
        t.groups.insert(group.id, group.clone());
        Ok(group)
    }

    async fn get_group(&self, id: GroupId) -> Result<GroupDetail, DbError> {
        let t = self.tables.read().await;
        let group = t.group(id)?.clone();
        let mut members: Vec<GroupMember> = t
            .members
            .iter()
            .filter(|((gid, _), _)| *gid == id)
            .filter_map(|((_, uid), joined_at)| {
                t.users.get(uid).map(|u| GroupMember {
                    user_id: u.id,
                    username: u.username.clone(),
                    role: u.role,
                    joined_at: *joined_at,
                })
            })
            .collect();
        members.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(GroupDetail { group, members })
    }

    async fn delete_group(&self, id: GroupId) -> Result<(), DbError> {
        let mut t = self.tables.write().await;
        t.groups
            .remove(&id)
            .ok_or_else(|| DbError::not_found("group", id))?;
        t.members.retain(|(gid, _), _| *gid != id);
        t.assignments
            .retain(|a| a.target != AssignmentTarget::Group(id));
        Ok(())
    }

    async fn add_group_member(&self, group_id: GroupId, user_id: UserId) -> Result<(), DbError> {
        let mut t = self.tables.write().await;
        t.group(group_id)?;
        t.user(user_id)?;
        if t.members.contains_key(&(group_id, user_id)) {
            return Err(DbError::Conflict(String::from(
                "user is already a member of the group",
            )));
        }
        t.members.insert((group_id, user_id), Utc::now());
        Ok(())
    }

    async fn remove_group_member(
        &self,
        group_id: GroupId,
        user_id: UserId,
    ) -> Result<(), DbError> {
        let mut t = self.tables.write().await;
        t.members.remove(&(group_id, user_id)).map(|_| ()).ok_or_else(|| {
            DbError::NotFound(format!("member {user_id} of group {group_id}"))
        })
    }
}
