//! Trainee-facing quest endpoints.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/api/quests` | All quests |
//! | `GET` | `/api/quests/character/{character_id}` | Quests with the character's status |
//! | `POST` | `/api/quests/{id}/start` | Start or resume |
//! | `POST` | `/api/quests/{id}/submit` | Hand in text and/or a file URL |
//! | `POST` | `/api/quests/{id}/complete` | Complete without grading |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use skillquest_db::Submission;
use skillquest_types::{CharacterId, QuestId};
use validator::Validate;

use crate::error::ApiError;
use crate::handlers::parse_id;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

/// Body of `POST /api/quests/{id}/start` and `/complete`.
#[derive(Debug, serde::Deserialize)]
pub struct CharacterRequest {
    /// The acting character.
    #[serde(alias = "characterId")]
    pub character_id: CharacterId,
}

/// Body of `POST /api/quests/{id}/submit`.
#[derive(Debug, serde::Deserialize, Validate)]
pub struct SubmitRequest {
    /// The acting character.
    #[serde(alias = "characterId")]
    pub character_id: CharacterId,
    /// Free-text answer.
    #[validate(length(max = 20000))]
    pub submission_text: Option<String>,
    /// Path or URL of an uploaded file.
    #[validate(length(max = 2048))]
    pub submission_file_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

/// Every quest, ordered by minimum level then difficulty.
pub async fn list(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.store.list_quests().await?))
}

/// Level-eligible quests with the character's status and equipment lock.
pub async fn for_character(
    State(state): State<Arc<AppState>>,
    Path(character_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let character_id: CharacterId = parse_id(&character_id)?;
    Ok(Json(state.store.quests_for_character(character_id).await?))
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Start a quest. The character's level and required equipment are checked.
pub async fn start(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<CharacterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let quest_id: QuestId = parse_id(&id)?;
    Ok(Json(
        state.store.start_quest(body.character_id, quest_id).await?,
    ))
}

/// Hand in work. At least one of text or file URL is needed.
pub async fn submit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<SubmitRequest>,
) -> Result<impl IntoResponse, ApiError> {
    body.validate()?;
    let quest_id: QuestId = parse_id(&id)?;
    let submission = Submission {
        text: body.submission_text,
        file_url: body.submission_file_url,
    };
    if submission.is_empty() {
        return Err(ApiError::BadRequest(String::from(
            "submission_text or submission_file_url is required",
        )));
    }
    Ok(Json(
        state
            .store
            .submit_quest(body.character_id, quest_id, submission)
            .await?,
    ))
}

/// Complete a quest directly and apply its rewards once.
pub async fn complete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<CharacterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let quest_id: QuestId = parse_id(&id)?;
    let outcome = state
        .store
        .complete_quest(body.character_id, quest_id)
        .await?;
    Ok(Json(serde_json::json!({
        "progress": outcome.progress,
        "character": outcome.character,
        "rewards": outcome.rewards,
    })))
}
