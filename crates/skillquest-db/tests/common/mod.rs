//! Store scenarios shared by the in-memory and `PostgreSQL` test suites.
//!
//! Every scenario takes `&dyn Store` and creates its own uniquely named
//! users, so the suites can run against a database that already holds data.

#![allow(dead_code)]

use chrono::{Duration, Utc};
use skillquest_db::{
    AssignmentTarget, DbError, NewAchievement, NewCharacter, NewEquipment, NewGroup, NewQuest,
    NewUser, Store, Submission,
};
use skillquest_progression::{GradeRequest, ProgressionError};
use skillquest_types::{
    Attributes, Character, CharacterQuest, Difficulty, GradeDecision, LeaderboardKind,
    NotificationKind, Quest, QuestStatus, Rarity, RepeatInterval, RepeatSchedule, RequirementKind,
    RewardBundle, Role, User, UserId,
};
use uuid::Uuid;

pub fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::now_v7().simple())
}

pub async fn user(store: &dyn Store, role: Role) -> User {
    store
        .create_user(NewUser {
            username: unique("user"),
            role,
        })
        .await
        .unwrap()
}

pub async fn character(store: &dyn Store, owner: UserId) -> Character {
    store
        .create_character(NewCharacter {
            user_id: owner,
            name: unique("Held"),
        })
        .await
        .unwrap()
}

pub fn rewards(xp: u32) -> RewardBundle {
    RewardBundle {
        xp_reward: xp,
        attribute_rewards: Attributes::default(),
        is_title_quest: false,
        title_reward: None,
        equipment_reward_id: None,
    }
}

pub fn quest_by(author: UserId, rewards: RewardBundle) -> NewQuest {
    NewQuest {
        title: unique("Quest"),
        description: String::from("Richte einen DHCP-Server ein"),
        category: Some(String::from("Netzwerke")),
        difficulty: Difficulty::Medium,
        rewards,
        required_equipment_id: None,
        min_level: 1,
        prerequisite_quest_id: None,
        created_by: author,
        repeat: None,
        due_date: None,
    }
}

fn approve() -> GradeRequest {
    GradeRequest {
        decision: GradeDecision::Approved,
        feedback: Some(String::from("Sauber gelöst")),
    }
}

fn reject(feedback: &str) -> GradeRequest {
    GradeRequest {
        decision: GradeDecision::Rejected,
        feedback: Some(feedback.to_owned()),
    }
}

fn text(body: &str) -> Submission {
    Submission {
        text: Some(body.to_owned()),
        file_url: None,
    }
}

/// Trainee, character and a quest assigned to the trainee and handed in.
async fn submitted(store: &dyn Store, bundle: RewardBundle) -> (User, User, Character, Quest) {
    let dozent = user(store, Role::Dozent).await;
    let trainee = user(store, Role::Nachwuchskraft).await;
    let hero = character(store, trainee.id).await;
    let quest = store.create_quest(quest_by(dozent.id, bundle)).await.unwrap();
    let reached = store
        .assign_quest(quest.id, AssignmentTarget::User(trainee.id), Some(dozent.id))
        .await
        .unwrap();
    assert_eq!(reached, 1);
    store.start_quest(hero.id, quest.id).await.unwrap();
    store
        .submit_quest(hero.id, quest.id, text("Screenshot der Konfiguration"))
        .await
        .unwrap();
    (dozent, trainee, hero, quest)
}

async fn submission_id(store: &dyn Store, quest: &Quest) -> skillquest_types::SubmissionId {
    let submissions = store.list_submissions(quest.id).await.unwrap();
    assert_eq!(submissions.len(), 1);
    submissions.first().unwrap().progress.id
}

// -----------------------------------------------------------------------------
// Scenarios
// -----------------------------------------------------------------------------

pub async fn approval_settles_rewards_once(store: &dyn Store) {
    let gear = store
        .create_equipment(NewEquipment {
            name: unique("Crimpzange"),
            description: None,
            kind: String::from("tool"),
            rarity: Rarity::Rare,
            bonuses: Attributes::default(),
            min_level: 1,
        })
        .await
        .unwrap();
    let bundle = RewardBundle {
        xp_reward: 150,
        attribute_rewards: Attributes {
            networking: 5,
            ..Attributes::default()
        },
        is_title_quest: true,
        title_reward: Some(String::from("Netzwerk-Guru")),
        equipment_reward_id: Some(gear.id),
    };
    let (dozent, trainee, hero, quest) = submitted(store, bundle).await;
    let id = submission_id(store, &quest).await;

    let outcome = store
        .grade_submission(id, dozent.id, approve())
        .await
        .unwrap();
    assert_eq!(outcome.progress.status, QuestStatus::Completed);
    let after = outcome.character.unwrap();
    assert_eq!(after.progression.level, 2);
    assert_eq!(after.progression.xp, 50);
    assert_eq!(after.progression.xp_to_next_level, 150);
    assert_eq!(after.progression.attributes.networking, 15);
    assert_eq!(after.title, "Netzwerk-Guru");
    assert_eq!(outcome.rewards.unwrap().levels_gained, 1);

    let inventory = store.character_equipment(hero.id).await.unwrap();
    assert_eq!(inventory.len(), 1);
    assert!(!inventory.first().unwrap().equipped);

    let titles = store.list_titles(hero.id).await.unwrap();
    assert_eq!(titles.iter().filter(|t| t.is_active).count(), 1);

    let again = store.grade_submission(id, dozent.id, approve()).await;
    assert!(matches!(
        again,
        Err(DbError::Progression(ProgressionError::AlreadyGraded))
    ));
    let unchanged = store.get_character(hero.id).await.unwrap();
    assert_eq!(unchanged.progression, after.progression);

    let inbox = store.notifications_for_user(trainee.id, 50).await.unwrap();
    assert!(inbox.iter().any(|n| n.kind == NotificationKind::QuestAssigned));
    assert!(inbox.iter().any(|n| n.kind == NotificationKind::SubmissionGraded));
    let author_inbox = store.notifications_for_user(dozent.id, 50).await.unwrap();
    assert!(
        author_inbox
            .iter()
            .any(|n| n.kind == NotificationKind::SubmissionReceived)
    );
}

pub async fn rejection_needs_feedback_and_spares_character(store: &dyn Store) {
    let (dozent, _trainee, hero, quest) = submitted(store, rewards(80)).await;
    let id = submission_id(store, &quest).await;

    let blank = store.grade_submission(id, dozent.id, reject("   ")).await;
    assert!(matches!(
        blank,
        Err(DbError::Progression(ProgressionError::MissingFeedback))
    ));

    let outcome = store
        .grade_submission(id, dozent.id, reject("Bitte mit Screenshot"))
        .await
        .unwrap();
    assert_eq!(outcome.progress.status, QuestStatus::Rejected);
    assert_eq!(outcome.progress.feedback.as_deref(), Some("Bitte mit Screenshot"));
    assert!(outcome.character.is_none());
    assert_eq!(store.get_character(hero.id).await.unwrap().progression, hero.progression);

    let resubmitted = store
        .submit_quest(hero.id, quest.id, text("Jetzt mit Screenshot"))
        .await
        .unwrap();
    assert_eq!(resubmitted.status, QuestStatus::Submitted);
    assert!(resubmitted.grade.is_none());
    let approved = store
        .grade_submission(id, dozent.id, approve())
        .await
        .unwrap();
    assert_eq!(approved.character.unwrap().progression.xp, 80);
}

pub async fn only_the_author_grades(store: &dyn Store) {
    let (_dozent, _trainee, _hero, quest) = submitted(store, rewards(50)).await;
    let other = user(store, Role::Dozent).await;
    let id = submission_id(store, &quest).await;
    let result = store.grade_submission(id, other.id, approve()).await;
    assert!(matches!(result, Err(DbError::Forbidden(_))));
}

pub async fn start_enforces_level_and_equipment(store: &dyn Store) {
    let dozent = user(store, Role::Dozent).await;
    let trainee = user(store, Role::Nachwuchskraft).await;
    let hero = character(store, trainee.id).await;

    let mut advanced = quest_by(dozent.id, rewards(200));
    advanced.min_level = 3;
    let advanced = store.create_quest(advanced).await.unwrap();
    let result = store.start_quest(hero.id, advanced.id).await;
    assert!(matches!(
        result,
        Err(DbError::Progression(ProgressionError::LevelTooLow {
            required: 3,
            actual: 1
        }))
    ));

    let laptop = store
        .create_equipment(NewEquipment {
            name: unique("Laptop"),
            description: None,
            kind: String::from("laptop"),
            rarity: Rarity::Common,
            bonuses: Attributes::default(),
            min_level: 1,
        })
        .await
        .unwrap();
    let mut gated = quest_by(dozent.id, rewards(50));
    gated.required_equipment_id = Some(laptop.id);
    let gated = store.create_quest(gated).await.unwrap();
    let result = store.start_quest(hero.id, gated.id).await;
    assert!(matches!(result, Err(DbError::Forbidden(_))));

    let listed = store.quests_for_character(hero.id).await.unwrap();
    let entry = listed.iter().find(|q| q.quest.id == gated.id).unwrap();
    assert!(entry.is_locked);
    assert_eq!(entry.status, QuestStatus::Available);
    assert!(listed.iter().all(|q| q.quest.id != advanced.id));
}

pub async fn direct_completion_and_cap(store: &dyn Store) {
    let dozent = user(store, Role::Dozent).await;
    let trainee = user(store, Role::Nachwuchskraft).await;
    let hero = character(store, trainee.id).await;
    let quest = store
        .create_quest(quest_by(dozent.id, rewards(100)))
        .await
        .unwrap();

    let done = store.complete_quest(hero.id, quest.id).await.unwrap();
    assert_eq!(done.progress.status, QuestStatus::Completed);
    assert_eq!(done.character.progression.level, 2);
    assert!(store.complete_quest(hero.id, quest.id).await.is_err());

    let grant = store.grant_xp(hero.id, u32::MAX).await.unwrap();
    assert_eq!(grant.character.progression.level, 50);
    assert_eq!(grant.character.progression.xp, 3999);
    assert!(grant.xp_discarded > 0);
}

pub async fn achievements_unlock_and_pay_xp(store: &dyn Store) {
    let trainee = user(store, Role::Nachwuchskraft).await;
    let hero = character(store, trainee.id).await;
    let first = store
        .create_achievement(NewAchievement {
            name: unique("Erste Schritte"),
            description: String::from("Erreiche Level 1"),
            icon: None,
            category: String::from("level"),
            xp_reward: 100,
            requirement_kind: RequirementKind::Level,
            requirement_value: 1,
        })
        .await
        .unwrap();

    let report = store.check_achievements(hero.id).await.unwrap();
    assert!(report.unlocked.iter().any(|a| a.id == first.id));
    assert!(report.character.progression.level >= 2);

    let again = store.check_achievements(hero.id).await.unwrap();
    assert!(again.unlocked.iter().all(|a| a.id != first.id));

    let listed = store.character_achievements(hero.id).await.unwrap();
    let entry = listed.iter().find(|a| a.achievement.id == first.id).unwrap();
    assert!(entry.unlocked_at.is_some());
}

pub async fn sweep_expires_and_reopens(store: &dyn Store) {
    let dozent = user(store, Role::Dozent).await;
    let trainee = user(store, Role::Nachwuchskraft).await;
    let hero = character(store, trainee.id).await;

    let mut overdue = quest_by(dozent.id, rewards(50));
    overdue.due_date = Some(Utc::now() - Duration::hours(1));
    let overdue = store.create_quest(overdue).await.unwrap();
    store.start_quest(hero.id, overdue.id).await.unwrap();

    let mut daily = quest_by(dozent.id, rewards(50));
    daily.repeat = Some(RepeatSchedule {
        interval: RepeatInterval::Daily,
        time: String::from("06:00"),
        day_of_week: None,
        day_of_month: None,
    });
    let daily = store.create_quest(daily).await.unwrap();
    store.complete_quest(hero.id, daily.id).await.unwrap();

    let report = store.sweep(Utc::now() + Duration::days(2)).await.unwrap();
    assert!(report.expired >= 1);
    assert!(report.reopened >= 1);

    let listed = store.quests_for_character(hero.id).await.unwrap();
    let status_of = |id| listed.iter().find(|q| q.quest.id == id).map(|q| q.status);
    assert_eq!(status_of(overdue.id), Some(QuestStatus::Failed));
    assert_eq!(status_of(daily.id), Some(QuestStatus::Available));
}

pub async fn sweep_fails_overdue_repeatable_work(store: &dyn Store) {
    let dozent = user(store, Role::Dozent).await;
    let trainee = user(store, Role::Nachwuchskraft).await;
    let hero = character(store, trainee.id).await;

    let mut daily = quest_by(dozent.id, rewards(50));
    daily.due_date = Some(Utc::now() - Duration::hours(1));
    daily.repeat = Some(RepeatSchedule {
        interval: RepeatInterval::Daily,
        time: String::from("06:00"),
        day_of_week: None,
        day_of_month: None,
    });
    let daily = store.create_quest(daily).await.unwrap();
    store.start_quest(hero.id, daily.id).await.unwrap();

    let status_of = |listed: &[CharacterQuest]| {
        listed.iter().find(|q| q.quest.id == daily.id).map(|q| q.status)
    };

    let report = store.sweep(Utc::now()).await.unwrap();
    assert!(report.expired >= 1);
    let listed = store.quests_for_character(hero.id).await.unwrap();
    assert_eq!(status_of(&listed), Some(QuestStatus::Failed));

    // The failed row counts as closed and reopens on a later cycle.
    store.sweep(Utc::now() + Duration::days(2)).await.unwrap();
    let listed = store.quests_for_character(hero.id).await.unwrap();
    assert_eq!(status_of(&listed), Some(QuestStatus::Available));
}

pub async fn groups_reject_duplicates(store: &dyn Store) {
    let admin = user(store, Role::Admin).await;
    let member = user(store, Role::Nachwuchskraft).await;
    let name = unique("FIAE-2026");
    let group = store
        .create_group(NewGroup {
            name: name.clone(),
            description: None,
            created_by: Some(admin.id),
        })
        .await
        .unwrap();
    let duplicate = store
        .create_group(NewGroup {
            name,
            description: None,
            created_by: None,
        })
        .await;
    assert!(matches!(duplicate, Err(DbError::Conflict(_))));

    store.add_group_member(group.id, member.id).await.unwrap();
    let twice = store.add_group_member(group.id, member.id).await;
    assert!(matches!(twice, Err(DbError::Conflict(_))));
    let detail = store.get_group(group.id).await.unwrap();
    assert_eq!(detail.members.len(), 1);

    store.remove_group_member(group.id, member.id).await.unwrap();
    assert!(store.remove_group_member(group.id, member.id).await.is_err());
}

pub async fn leaderboard_ranks_by_level(store: &dyn Store) {
    let trainee = user(store, Role::Nachwuchskraft).await;
    let leader = character(store, trainee.id).await;
    store.grant_xp(leader.id, 1_000_000).await.unwrap();

    let board = store.leaderboard(LeaderboardKind::Level, 10).await.unwrap();
    let top = board.first().unwrap();
    assert_eq!(top.rank, 1);
    assert_eq!(top.level, 50);
    assert!(board.windows(2).all(|w| w[0].score >= w[1].score));
}
