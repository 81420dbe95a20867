//! Achievements, leaderboards, notifications and groups.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/api/achievements` | Achievement catalogue |
//! | `POST` | `/api/achievements` | Add a definition |
//! | `GET` | `/api/achievements/character/{id}` | Catalogue with unlock state |
//! | `POST` | `/api/achievements/character/{id}/check` | Evaluate and unlock |
//! | `GET` | `/api/leaderboard/{kind}` | Top characters by level, stats, achievements or quests |
//! | `GET` | `/api/notifications/user/{id}` | Latest notifications |
//! | `GET` | `/api/notifications/user/{id}/unread` | Unread count |
//! | `PUT` | `/api/notifications/{id}/read` | Mark one read |
//! | `PUT` | `/api/notifications/user/{id}/read-all` | Mark all read |
//! | `GET` | `/api/groups` | Groups with member counts |
//! | `POST` | `/api/groups` | Create a group |
//! | `GET` | `/api/groups/{id}` | Group with members |
//! | `DELETE` | `/api/groups/{id}` | Delete a group |
//! | `POST` | `/api/groups/{id}/members` | Add a member |
//! | `DELETE` | `/api/groups/{id}/members/{user_id}` | Remove a member |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use skillquest_db::{NOTIFICATION_LIMIT, NewAchievement, NewGroup, leaderboard_limit};
use skillquest_types::{
    CharacterId, GroupId, LeaderboardKind, NotificationId, ParseEnumError, RequirementKind,
    UserId,
};
use validator::Validate;

use crate::error::ApiError;
use crate::handlers::{Message, parse_id};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Query parameter structs and bodies
// ---------------------------------------------------------------------------

/// Query parameters for `GET /api/leaderboard/{kind}`.
#[derive(Debug, serde::Deserialize)]
pub struct LeaderboardQuery {
    /// Entries to return (default 10, max 100).
    pub limit: Option<u32>,
}

/// Body of `POST /api/achievements`.
#[derive(Debug, serde::Deserialize, Validate)]
pub struct CreateAchievementRequest {
    /// Unique name.
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// What the trainee has to do.
    #[validate(length(min = 1))]
    pub description: String,
    /// Icon identifier for the SPA.
    pub icon: Option<String>,
    /// Grouping in the catalogue.
    #[validate(length(min = 1, max = 50))]
    pub category: String,
    /// XP granted on unlock.
    #[serde(default)]
    pub xp_reward: u32,
    /// Statistic the threshold applies to.
    pub requirement_type: RequirementKind,
    /// Threshold value.
    #[validate(range(min = 1))]
    pub requirement_value: u32,
}

/// Body of `POST /api/groups`.
#[derive(Debug, serde::Deserialize, Validate)]
pub struct CreateGroupRequest {
    /// Unique name.
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Creating user.
    pub created_by: Option<UserId>,
}

/// Body of `POST /api/groups/{id}/members`.
#[derive(Debug, serde::Deserialize)]
pub struct AddMemberRequest {
    /// The user to add.
    pub user_id: UserId,
}

// ---------------------------------------------------------------------------
// Achievements
// ---------------------------------------------------------------------------

/// The achievement catalogue.
pub async fn list_achievements(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.store.list_achievements().await?))
}

/// Add an achievement definition. Names are unique.
pub async fn create_achievement(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateAchievementRequest>,
) -> Result<impl IntoResponse, ApiError> {
    body.validate()?;
    let achievement = state
        .store
        .create_achievement(NewAchievement {
            name: body.name,
            description: body.description,
            icon: body.icon,
            category: body.category,
            xp_reward: body.xp_reward,
            requirement_kind: body.requirement_type,
            requirement_value: body.requirement_value,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(achievement)))
}

/// The catalogue with the character's unlock times.
pub async fn character_achievements(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: CharacterId = parse_id(&id)?;
    Ok(Json(state.store.character_achievements(id).await?))
}

/// Unlock every achievement the character now qualifies for.
pub async fn check_achievements(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: CharacterId = parse_id(&id)?;
    let report = state.store.check_achievements(id).await?;
    Ok(Json(serde_json::json!({
        "unlocked": report.unlocked,
        "character": report.character,
    })))
}

// ---------------------------------------------------------------------------
// GET /api/leaderboard/{kind}
// ---------------------------------------------------------------------------

/// Top characters by the requested criterion.
pub async fn leaderboard(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    Query(params): Query<LeaderboardQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let kind: LeaderboardKind = kind
        .parse()
        .map_err(|e: ParseEnumError| ApiError::NotFound(format!("leaderboard {:?}", e.value)))?;
    let limit = leaderboard_limit(params.limit);
    Ok(Json(state.store.leaderboard(kind, limit).await?))
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// The user's latest notifications, newest first.
pub async fn notifications(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id: UserId = parse_id(&user_id)?;
    Ok(Json(
        state
            .store
            .notifications_for_user(user_id, NOTIFICATION_LIMIT)
            .await?,
    ))
}

/// Number of unread notifications.
pub async fn unread_count(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id: UserId = parse_id(&user_id)?;
    let count = state.store.unread_count(user_id).await?;
    Ok(Json(serde_json::json!({ "count": count })))
}

/// Mark one notification read.
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: NotificationId = parse_id(&id)?;
    state.store.mark_notification_read(id).await?;
    Ok(Message::new("notification marked as read"))
}

/// Mark every notification of a user read.
pub async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id: UserId = parse_id(&user_id)?;
    let updated = state.store.mark_all_read(user_id).await?;
    Ok(Json(serde_json::json!({ "updated": updated })))
}

// ---------------------------------------------------------------------------
// Groups
// ---------------------------------------------------------------------------

/// Groups with member counts.
pub async fn list_groups(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.store.list_groups().await?))
}

/// Create a group. Names are unique.
pub async fn create_group(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateGroupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    body.validate()?;
    let group = state
        .store
        .create_group(NewGroup {
            name: body.name.trim().to_owned(),
            description: body.description,
            created_by: body.created_by,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(group)))
}

/// A group with its members.
pub async fn get_group(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: GroupId = parse_id(&id)?;
    Ok(Json(state.store.get_group(id).await?))
}

/// Delete a group and its memberships.
pub async fn delete_group(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: GroupId = parse_id(&id)?;
    state.store.delete_group(id).await?;
    Ok(Message::new("group deleted"))
}

/// Add a member. Adding an existing member is a conflict.
pub async fn add_member(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<AddMemberRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id: GroupId = parse_id(&id)?;
    state.store.add_group_member(id, body.user_id).await?;
    Ok((StatusCode::CREATED, Message::new("member added")))
}

/// Remove a member.
pub async fn remove_member(
    State(state): State<Arc<AppState>>,
    Path((id, user_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let id: GroupId = parse_id(&id)?;
    let user_id: UserId = parse_id(&user_id)?;
    state.store.remove_group_member(id, user_id).await?;
    Ok(Message::new("member removed"))
}
