//! Behaviour tests for [`MemoryStore`].
//!
//! The same scenarios run against `PostgreSQL` in `integration.rs`; here they
//! need no external services.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    clippy::too_many_lines,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]

mod common;

use skillquest_db::{DbError, MemoryStore, NewUser, Store};
use skillquest_types::Role;

#[tokio::test]
async fn approval_settles_rewards_once() {
    common::approval_settles_rewards_once(&MemoryStore::new()).await;
}

#[tokio::test]
async fn rejection_needs_feedback_and_spares_character() {
    common::rejection_needs_feedback_and_spares_character(&MemoryStore::new()).await;
}

#[tokio::test]
async fn only_the_author_grades() {
    common::only_the_author_grades(&MemoryStore::new()).await;
}

#[tokio::test]
async fn start_enforces_level_and_equipment() {
    common::start_enforces_level_and_equipment(&MemoryStore::new()).await;
}

#[tokio::test]
async fn direct_completion_and_cap() {
    common::direct_completion_and_cap(&MemoryStore::new()).await;
}

#[tokio::test]
async fn achievements_unlock_and_pay_xp() {
    common::achievements_unlock_and_pay_xp(&MemoryStore::new()).await;
}

#[tokio::test]
async fn sweep_expires_and_reopens() {
    common::sweep_expires_and_reopens(&MemoryStore::new()).await;
}

#[tokio::test]
async fn sweep_fails_overdue_repeatable_work() {
    common::sweep_fails_overdue_repeatable_work(&MemoryStore::new()).await;
}

#[tokio::test]
async fn groups_reject_duplicates() {
    common::groups_reject_duplicates(&MemoryStore::new()).await;
}

#[tokio::test]
async fn leaderboard_ranks_by_level() {
    common::leaderboard_ranks_by_level(&MemoryStore::new()).await;
}

// =============================================================================
// Users
// =============================================================================

#[tokio::test]
async fn first_admin_is_super_admin_and_keeps_role() {
    let store = MemoryStore::new();
    let first = store
        .create_user(NewUser {
            username: String::from("ausbilder"),
            role: Role::Admin,
        })
        .await
        .unwrap();
    let second = store
        .create_user(NewUser {
            username: String::from("vertretung"),
            role: Role::Admin,
        })
        .await
        .unwrap();
    assert!(first.is_super_admin);
    assert!(!second.is_super_admin);

    let demoted = store.set_user_role(first.id, Role::Dozent).await;
    assert!(matches!(demoted, Err(DbError::Forbidden(_))));
    let changed = store.set_user_role(second.id, Role::Dozent).await.unwrap();
    assert_eq!(changed.role, Role::Dozent);
    assert!(!changed.is_admin);
}

#[tokio::test]
async fn duplicate_username_conflicts() {
    let store = MemoryStore::new();
    let new = NewUser {
        username: String::from("azubi1"),
        role: Role::Nachwuchskraft,
    };
    store.create_user(new.clone()).await.unwrap();
    assert!(matches!(
        store.create_user(new).await,
        Err(DbError::Conflict(_))
    ));
}

#[tokio::test]
async fn new_character_starts_at_level_one() {
    let store = MemoryStore::new();
    let owner = common::user(&store, Role::Nachwuchskraft).await;
    let hero = common::character(&store, owner.id).await;
    assert_eq!(hero.progression.level, 1);
    assert_eq!(hero.progression.xp, 0);
    assert_eq!(hero.progression.xp_to_next_level, 100);
    assert_eq!(hero.progression.attributes.programming, 10);
    assert_eq!(hero.title, skillquest_db::STARTING_TITLE);

    let titles = store.list_titles(hero.id).await.unwrap();
    assert_eq!(titles.len(), 1);
    assert!(titles[0].is_active);
}

#[tokio::test]
async fn mark_all_read_clears_unread_count() {
    let store = MemoryStore::new();
    let dozent = common::user(&store, Role::Dozent).await;
    let trainee = common::user(&store, Role::Nachwuchskraft).await;
    common::character(&store, trainee.id).await;
    for _ in 0..3 {
        let quest = store
            .create_quest(common::quest_by(dozent.id, common::rewards(10)))
            .await
            .unwrap();
        store
            .assign_quest(
                quest.id,
                skillquest_db::AssignmentTarget::User(trainee.id),
                Some(dozent.id),
            )
            .await
            .unwrap();
    }
    assert_eq!(store.unread_count(trainee.id).await.unwrap(), 3);
    assert_eq!(store.mark_all_read(trainee.id).await.unwrap(), 3);
    assert_eq!(store.unread_count(trainee.id).await.unwrap(), 0);
}
