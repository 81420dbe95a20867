//! Background maintenance task.
//!
//! [`spawn_sweeper`] runs [`Store::sweep`](skillquest_db::Store::sweep) on
//! a fixed interval so overdue work fails and repeatable quests reopen
//! without anyone calling `POST /api/maintenance/sweep`.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::state::AppState;

/// Spawn the sweeper on a background Tokio task.
///
/// The first sweep runs immediately. A failed sweep is logged and retried
/// on the next tick; the task only ends when aborted or when the runtime
/// shuts down. Hold the returned handle and abort it on shutdown.
pub fn spawn_sweeper(state: Arc<AppState>, every: Duration) -> JoinHandle<()> {
    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match state.store.sweep(Utc::now()).await {
                Ok(report) => tracing::debug!(
                    expired = report.expired,
                    reopened = report.reopened,
                    "Maintenance sweep finished"
                ),
                Err(e) => tracing::error!(error = %e, "Maintenance sweep failed"),
            }
        }
    });

    tracing::info!(
        interval_secs = every.as_secs(),
        "Maintenance sweeper spawned on background task"
    );
    handle
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use skillquest_db::{NewCharacter, NewQuest, NewUser};
    use skillquest_types::{Attributes, Difficulty, QuestStatus, RewardBundle, Role};

    use super::*;

    #[tokio::test]
    async fn sweeper_fails_overdue_work() {
        let state = Arc::new(AppState::in_memory());
        let store = &state.store;
        let author = store
            .create_user(NewUser {
                username: String::from("dozent"),
                role: Role::Dozent,
            })
            .await
            .unwrap();
        let trainee = store
            .create_user(NewUser {
                username: String::from("azubi"),
                role: Role::Nachwuchskraft,
            })
            .await
            .unwrap();
        let hero = store
            .create_character(NewCharacter {
                user_id: trainee.id,
                name: String::from("Ada"),
            })
            .await
            .unwrap();
        let quest = store
            .create_quest(NewQuest {
                title: String::from("Firewall-Regeln"),
                description: String::from("Regeln dokumentieren"),
                category: None,
                difficulty: Difficulty::Easy,
                rewards: RewardBundle {
                    xp_reward: 50,
                    attribute_rewards: Attributes::default(),
                    is_title_quest: false,
                    title_reward: None,
                    equipment_reward_id: None,
                },
                required_equipment_id: None,
                min_level: 1,
                prerequisite_quest_id: None,
                created_by: author.id,
                repeat: None,
                due_date: Utc::now().checked_sub_signed(chrono::Duration::minutes(5)),
            })
            .await
            .unwrap();
        store.start_quest(hero.id, quest.id).await.unwrap();

        let handle = spawn_sweeper(Arc::clone(&state), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.abort();

        let listed = store.quests_for_character(hero.id).await.unwrap();
        let entry = listed.iter().find(|q| q.quest.id == quest.id).unwrap();
        assert_eq!(entry.status, QuestStatus::Failed);
    }
}
