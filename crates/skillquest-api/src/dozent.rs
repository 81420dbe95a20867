//! Instructor endpoints: quest authoring, assignment and grading.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/api/dozent/xp-preview` | Suggested XP for a tier and level |
//! | `POST` | `/api/dozent/quests` | Create a quest |
//! | `GET` | `/api/dozent/quests/all` | Quests with counters |
//! | `PUT` | `/api/dozent/quests/{id}` | Patch a quest |
//! | `DELETE` | `/api/dozent/quests/{id}` | Delete a quest |
//! | `POST` | `/api/dozent/quests/{id}/assign` | Assign to a user or a group |
//! | `GET` | `/api/dozent/quests/{id}/submissions` | Handed-in work |
//! | `POST` | `/api/dozent/submissions/{id}/grade` | Approve or reject |
//!
//! XP for a new quest is resolved here with
//! [`resolve_quest_xp`](skillquest_progression::resolve_quest_xp): `fixed`
//! mode needs an explicit positive value, `scaled` mode falls back to the
//! suggestion. Grading always pays the stored value.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use skillquest_db::{AssignmentTarget, NewQuest, QuestPatch};
use skillquest_progression::scaling::base_xp;
use skillquest_progression::{GradeRequest, resolve_quest_xp, scaled_xp, schedule};
use skillquest_types::{
    Attributes, Difficulty, EquipmentId, GradeDecision, GroupId, QuestId, RepeatInterval,
    RepeatSchedule, RewardBundle, SubmissionId, UserId, XpScaling,
};
use validator::Validate;

use crate::error::ApiError;
use crate::handlers::{Message, default_min_level, parse_id, parse_optional_id};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Query parameter structs
// ---------------------------------------------------------------------------

/// Query parameters for `GET /api/dozent/xp-preview`.
#[derive(Debug, serde::Deserialize)]
pub struct XpPreviewQuery {
    /// Tier label. Unknown labels are treated as easy.
    pub difficulty: Option<String>,
    /// Minimum level of the quest (default 1).
    pub min_level: Option<u32>,
}

/// Query parameters naming the requesting instructor.
#[derive(Debug, serde::Deserialize)]
pub struct RequesterQuery {
    /// The requesting user. Admins see everything.
    #[serde(alias = "userId")]
    pub user_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

/// Body of `POST /api/dozent/quests`.
#[derive(Debug, serde::Deserialize, Validate)]
pub struct CreateQuestRequest {
    /// Quest title.
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    /// Task description.
    #[validate(length(min = 1))]
    pub description: String,
    /// Free-form category.
    pub category: Option<String>,
    /// Tier label, defaults to easy.
    pub difficulty: Option<String>,
    /// Explicit XP. Required in fixed mode.
    pub xp_reward: Option<u32>,
    /// `fixed` or `scaled` (default).
    #[serde(default = "default_scaling")]
    pub xp_scaling: XpScaling,
    /// Attribute rewards, added verbatim on approval.
    #[serde(default)]
    pub attribute_rewards: Attributes,
    /// Whether approval grants a title.
    #[serde(default)]
    pub is_title_quest: bool,
    /// The title granted.
    pub title_reward: Option<String>,
    /// Equipment granted on approval.
    pub equipment_reward_id: Option<EquipmentId>,
    /// Equipment needed to start.
    pub required_equipment_id: Option<EquipmentId>,
    /// Minimum character level.
    #[validate(range(min = 1, max = 50))]
    #[serde(default = "default_min_level")]
    pub min_level: u32,
    /// Quest that should be finished first. Informational.
    pub prerequisite_quest_id: Option<QuestId>,
    /// Author of the quest.
    pub created_by_user_id: UserId,
    /// Whether the quest reopens on a schedule.
    #[serde(default)]
    pub is_repeatable: bool,
    /// `daily`, `weekly` or `monthly`.
    pub repeat_interval: Option<RepeatInterval>,
    /// Time of day, `HH:MM` UTC.
    pub repeat_time: Option<String>,
    /// Weekday for weekly quests, 0 = Sunday.
    pub repeat_day_of_week: Option<u8>,
    /// Day of month for monthly quests.
    pub repeat_day_of_month: Option<u8>,
    /// Deadline after which open work fails.
    pub due_date: Option<DateTime<Utc>>,
}

const fn default_scaling() -> XpScaling {
    XpScaling::Scaled
}

impl CreateQuestRequest {
    fn repeat_schedule(&self) -> Result<Option<RepeatSchedule>, ApiError> {
        if !self.is_repeatable {
            return Ok(None);
        }
        let interval = self.repeat_interval.ok_or_else(|| {
            ApiError::BadRequest(String::from(
                "repeat_interval must be daily, weekly or monthly",
            ))
        })?;
        let time = self
            .repeat_time
            .clone()
            .ok_or_else(|| ApiError::BadRequest(String::from("repeat_time (HH:MM) is required")))?;
        let rule = RepeatSchedule {
            interval,
            time,
            day_of_week: self.repeat_day_of_week,
            day_of_month: self.repeat_day_of_month,
        };
        schedule::validate(&rule)?;
        Ok(Some(rule))
    }

    fn title_reward(&self) -> Result<Option<String>, ApiError> {
        let title = self
            .title_reward
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());
        match (self.is_title_quest, title) {
            (true, None) => Err(ApiError::BadRequest(String::from(
                "title quests need a title_reward",
            ))),
            (true, Some(t)) => Ok(Some(t.to_owned())),
            (false, _) => Ok(None),
        }
    }
}

/// Body of `PUT /api/dozent/quests/{id}`. Absent fields stay unchanged.
#[derive(Debug, serde::Deserialize, Validate)]
pub struct UpdateQuestRequest {
    /// New title.
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    /// New description.
    #[validate(length(min = 1))]
    pub description: Option<String>,
    /// New category.
    pub category: Option<String>,
    /// New tier label.
    pub difficulty: Option<String>,
    /// New XP reward.
    #[validate(range(min = 1))]
    pub xp_reward: Option<u32>,
    /// New attribute rewards.
    pub attribute_rewards: Option<Attributes>,
    /// New minimum level.
    #[validate(range(min = 1, max = 50))]
    pub min_level: Option<u32>,
    /// New deadline.
    pub due_date: Option<DateTime<Utc>>,
}

/// Body of `POST /api/dozent/quests/{id}/assign`.
#[derive(Debug, serde::Deserialize)]
pub struct AssignRequest {
    /// Assign to every character of this user.
    pub user_id: Option<UserId>,
    /// Assign to every character of every member of this group.
    pub group_id: Option<GroupId>,
    /// The assigning instructor.
    pub assigned_by_user_id: Option<UserId>,
}

/// Body of `POST /api/dozent/submissions/{id}/grade`.
#[derive(Debug, serde::Deserialize)]
pub struct GradeBody {
    /// `approved` or `rejected`.
    pub grade: GradeDecision,
    /// Feedback text. Required for rejections.
    pub feedback: Option<String>,
    /// The grading instructor. Must be the quest's author.
    pub graded_by_user_id: UserId,
}

// ---------------------------------------------------------------------------
// GET /api/dozent/xp-preview
// ---------------------------------------------------------------------------

/// Suggested XP for a tier and minimum level. Advisory only.
pub async fn xp_preview(Query(params): Query<XpPreviewQuery>) -> impl IntoResponse {
    let difficulty = params
        .difficulty
        .as_deref()
        .map_or(Difficulty::Easy, Difficulty::from_label);
    let min_level = params.min_level.unwrap_or(1).max(1);
    Json(serde_json::json!({
        "difficulty": difficulty,
        "min_level": min_level,
        "base_xp": base_xp(difficulty),
        "xp_reward": scaled_xp(difficulty, min_level),
    }))
}

// ---------------------------------------------------------------------------
// Quest authoring
// ---------------------------------------------------------------------------

/// Create a quest. Repeat rules are validated, XP is resolved once.
pub async fn create_quest(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateQuestRequest>,
) -> Result<impl IntoResponse, ApiError> {
    body.validate()?;
    let difficulty = body
        .difficulty
        .as_deref()
        .map_or(Difficulty::Easy, Difficulty::from_label);
    let xp_reward = resolve_quest_xp(body.xp_scaling, body.xp_reward, difficulty, body.min_level)?;
    let repeat = body.repeat_schedule()?;
    let title_reward = body.title_reward()?;

    let quest = state
        .store
        .create_quest(NewQuest {
            title: body.title,
            description: body.description,
            category: body.category,
            difficulty,
            rewards: RewardBundle {
                xp_reward,
                attribute_rewards: body.attribute_rewards,
                is_title_quest: body.is_title_quest,
                title_reward,
                equipment_reward_id: body.equipment_reward_id,
            },
            required_equipment_id: body.required_equipment_id,
            min_level: body.min_level,
            prerequisite_quest_id: body.prerequisite_quest_id,
            created_by: body.created_by_user_id,
            repeat,
            due_date: body.due_date,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(quest)))
}

/// Quests with assignment and pending-submission counts.
///
/// Instructors see their own quests, admins and anonymous callers see all.
pub async fn overview(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RequesterQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let requester: Option<UserId> = parse_optional_id(params.user_id.as_deref())?;
    let author = match requester {
        Some(id) => {
            let user = state.store.get_user(id).await?;
            (!user.is_admin).then_some(id)
        }
        None => None,
    };
    Ok(Json(state.store.quest_overview(author).await?))
}

/// Patch a quest.
pub async fn update_quest(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateQuestRequest>,
) -> Result<impl IntoResponse, ApiError> {
    body.validate()?;
    let id: QuestId = parse_id(&id)?;
    let patch = QuestPatch {
        title: body.title,
        description: body.description,
        category: body.category,
        difficulty: body.difficulty.as_deref().map(Difficulty::from_label),
        xp_reward: body.xp_reward,
        attribute_rewards: body.attribute_rewards,
        min_level: body.min_level,
        due_date: body.due_date,
    };
    Ok(Json(state.store.update_quest(id, patch).await?))
}

/// Delete a quest with its progress rows and assignments.
pub async fn delete_quest(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: QuestId = parse_id(&id)?;
    state.store.delete_quest(id).await?;
    Ok(Message::new("quest deleted"))
}

/// Assign a quest to exactly one of a user or a group.
pub async fn assign_quest(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<AssignRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id: QuestId = parse_id(&id)?;
    let target = match (body.user_id, body.group_id) {
        (Some(user), None) => AssignmentTarget::User(user),
        (None, Some(group)) => AssignmentTarget::Group(group),
        (None, None) => {
            return Err(ApiError::BadRequest(String::from(
                "either user_id or group_id is required",
            )));
        }
        (Some(_), Some(_)) => {
            return Err(ApiError::BadRequest(String::from(
                "only one of user_id or group_id is allowed",
            )));
        }
    };
    let assigned = state
        .store
        .assign_quest(id, target, body.assigned_by_user_id)
        .await?;
    Ok(Json(serde_json::json!({
        "message": "quest assigned",
        "assigned_characters": assigned,
    })))
}

// ---------------------------------------------------------------------------
// Submissions and grading
// ---------------------------------------------------------------------------

/// Handed-in work for a quest, newest first.
///
/// When `user_id` is given, only the quest's author or an admin may look.
pub async fn submissions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<RequesterQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let id: QuestId = parse_id(&id)?;
    let requester: Option<UserId> = parse_optional_id(params.user_id.as_deref())?;
    let quest = state.store.get_quest(id).await?;
    if let Some(requester) = requester
        && quest.created_by != Some(requester)
    {
        let user = state.store.get_user(requester).await?;
        if !user.is_admin {
            return Err(ApiError::Forbidden(String::from(
                "only the quest's author can view its submissions",
            )));
        }
    }
    Ok(Json(state.store.list_submissions(id).await?))
}

/// Approve or reject a submission and settle rewards atomically.
pub async fn grade(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<GradeBody>,
) -> Result<impl IntoResponse, ApiError> {
    let id: SubmissionId = parse_id(&id)?;
    let message = match body.grade {
        GradeDecision::Approved => "submission approved",
        GradeDecision::Rejected => "submission rejected",
    };
    let request = GradeRequest {
        decision: body.grade,
        feedback: body.feedback,
    };
    request.validate()?;
    let outcome = state
        .store
        .grade_submission(id, body.graded_by_user_id, request)
        .await?;
    Ok(Json(serde_json::json!({
        "message": message,
        "submission": outcome.progress,
        "character": outcome.character,
        "rewards": outcome.rewards,
    })))
}
