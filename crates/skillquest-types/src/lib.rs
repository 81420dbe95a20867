//! Shared type definitions for the SkillQuest learning platform.
//!
//! This crate is the single source of truth for the entities exchanged
//! between the progression engine, the stores and the REST API. Types
//! defined here flow downstream to `TypeScript` via `ts-rs` for the SPA.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for all entity identifiers
//! - [`enums`] -- Roles, quest statuses, difficulty tiers and other closed sets
//! - [`structs`] -- Characters, quests, submissions, equipment and social entities

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{
    Attribute, Difficulty, GradeDecision, LeaderboardKind, NotificationKind, ParseEnumError,
    QuestStatus, Rarity, RepeatInterval, RequirementKind, Role, XpScaling,
};
pub use ids::{
    AchievementId, AssignmentId, CharacterId, EquipmentId, GroupId, NotificationId, QuestId,
    SubmissionId, UserId,
};
pub use structs::{
    Achievement, Attributes, Character, CharacterAchievement, CharacterQuest, CharacterTitle,
    Equipment, GrantedRewards, Group, GroupDetail, GroupMember, GroupSummary, LeaderboardEntry,
    Notification, OwnedEquipment, ProgressionState, Quest, QuestOverview, QuestProgress,
    RepeatSchedule, RewardBundle, SubmissionView, User,
};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation.

    #[test]
    fn export_bindings() {
        // Calling export_all writes each type and its dependencies to
        // `bindings/` relative to the crate root.
        use ts_rs::TS;

        // IDs
        let _ = crate::ids::UserId::export_all();
        let _ = crate::ids::CharacterId::export_all();
        let _ = crate::ids::QuestId::export_all();
        let _ = crate::ids::SubmissionId::export_all();
        let _ = crate::ids::EquipmentId::export_all();
        let _ = crate::ids::AchievementId::export_all();
        let _ = crate::ids::GroupId::export_all();
        let _ = crate::ids::AssignmentId::export_all();
        let _ = crate::ids::NotificationId::export_all();

        // Enums
        let _ = crate::enums::Role::export_all();
        let _ = crate::enums::Attribute::export_all();
        let _ = crate::enums::Difficulty::export_all();
        let _ = crate::enums::XpScaling::export_all();
        let _ = crate::enums::QuestStatus::export_all();
        let _ = crate::enums::GradeDecision::export_all();
        let _ = crate::enums::RepeatInterval::export_all();
        let _ = crate::enums::Rarity::export_all();
        let _ = crate::enums::RequirementKind::export_all();
        let _ = crate::enums::LeaderboardKind::export_all();
        let _ = crate::enums::NotificationKind::export_all();

        // Structs
        let _ = crate::structs::Character::export_all();
        let _ = crate::structs::CharacterQuest::export_all();
        let _ = crate::structs::SubmissionView::export_all();
        let _ = crate::structs::QuestOverview::export_all();
        let _ = crate::structs::GrantedRewards::export_all();
        let _ = crate::structs::OwnedEquipment::export_all();
        let _ = crate::structs::CharacterAchievement::export_all();
        let _ = crate::structs::CharacterTitle::export_all();
        let _ = crate::structs::LeaderboardEntry::export_all();
        let _ = crate::structs::GroupSummary::export_all();
        let _ = crate::structs::GroupDetail::export_all();
        let _ = crate::structs::Notification::export_all();
        let _ = crate::structs::User::export_all();
    }
}
