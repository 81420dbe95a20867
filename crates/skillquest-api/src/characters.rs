//! Character endpoints: creation, renaming, titles, XP, attributes and
//! inventory.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/api/characters/user/{user_id}` | Characters of a user |
//! | `POST` | `/api/characters` | Create a character |
//! | `GET` | `/api/characters/{id}` | Single character |
//! | `PUT` | `/api/characters/{id}` | Rename and/or switch title |
//! | `DELETE` | `/api/characters/{id}` | Delete a character |
//! | `POST` | `/api/characters/{id}/xp` | Grant XP |
//! | `POST` | `/api/characters/{id}/attribute` | Raise one attribute |
//! | `GET` | `/api/characters/{id}/equipment` | Inventory |
//! | `POST` | `/api/characters/{id}/equipment/{equipment_id}/toggle` | Equip or unequip |
//! | `GET` | `/api/characters/{id}/titles` | Earned titles |
//! | `PUT` | `/api/characters/{id}/titles/active` | Switch active title |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use skillquest_db::NewCharacter;
use skillquest_types::{Attribute, CharacterId, EquipmentId, UserId};
use validator::Validate;

use crate::error::ApiError;
use crate::handlers::{Message, parse_id};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

/// Body of `POST /api/characters`.
#[derive(Debug, serde::Deserialize, Validate)]
pub struct CreateCharacterRequest {
    /// Owner of the character.
    pub user_id: UserId,
    /// Display name.
    #[validate(length(min = 1, max = 64))]
    pub name: String,
}

/// Body of `PUT /api/characters/{id}`. Both fields are optional.
#[derive(Debug, serde::Deserialize, Validate)]
pub struct UpdateCharacterRequest {
    /// New display name.
    #[validate(length(min = 1, max = 64))]
    pub name: Option<String>,
    /// Earned title to display.
    pub title: Option<String>,
}

/// Body of `POST /api/characters/{id}/xp`.
#[derive(Debug, serde::Deserialize, Validate)]
pub struct GrantXpRequest {
    /// XP to add. Must be positive.
    #[validate(range(min = 1))]
    pub xp: u32,
}

/// Body of `POST /api/characters/{id}/attribute`.
#[derive(Debug, serde::Deserialize, Validate)]
pub struct IncreaseAttributeRequest {
    /// Attribute to raise.
    pub attribute: Attribute,
    /// Amount to add before clamping at 100.
    #[validate(range(min = 1))]
    pub amount: u32,
}

/// Body of `PUT /api/characters/{id}/titles/active`.
#[derive(Debug, serde::Deserialize, Validate)]
pub struct SetTitleRequest {
    /// An earned title.
    #[validate(length(min = 1))]
    pub title: String,
}

// ---------------------------------------------------------------------------
// Characters
// ---------------------------------------------------------------------------

/// All characters of a user.
pub async fn list_for_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id: UserId = parse_id(&user_id)?;
    Ok(Json(state.store.list_characters_for_user(user_id).await?))
}

/// Create a level-1 character with the starting title.
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateCharacterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    body.validate()?;
    let character = state
        .store
        .create_character(NewCharacter {
            user_id: body.user_id,
            name: body.name.trim().to_owned(),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(character)))
}

/// A single character.
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: CharacterId = parse_id(&id)?;
    Ok(Json(state.store.get_character(id).await?))
}

/// Rename a character and/or switch its displayed title.
pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateCharacterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    body.validate()?;
    let id: CharacterId = parse_id(&id)?;
    let mut character = state.store.get_character(id).await?;
    if let Some(name) = body.name {
        character = state
            .store
            .rename_character(id, name.trim().to_owned())
            .await?;
    }
    if let Some(title) = body.title {
        character = state.store.set_active_title(id, title).await?;
    }
    Ok(Json(character))
}

/// Delete a character with its progress, inventory and titles.
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: CharacterId = parse_id(&id)?;
    state.store.delete_character(id).await?;
    Ok(Message::new("character deleted"))
}

/// Grant XP through the award operation. Level-ups and the cap apply.
pub async fn grant_xp(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<GrantXpRequest>,
) -> Result<impl IntoResponse, ApiError> {
    body.validate()?;
    let id: CharacterId = parse_id(&id)?;
    let grant = state.store.grant_xp(id, body.xp).await?;
    Ok(Json(serde_json::json!({
        "character": grant.character,
        "levels_gained": grant.levels_gained,
        "xp_discarded": grant.xp_discarded,
    })))
}

/// Raise one attribute, clamped at 100.
pub async fn increase_attribute(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<IncreaseAttributeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    body.validate()?;
    let id: CharacterId = parse_id(&id)?;
    Ok(Json(
        state
            .store
            .increase_attribute(id, body.attribute, body.amount)
            .await?,
    ))
}

// ---------------------------------------------------------------------------
// Inventory and titles
// ---------------------------------------------------------------------------

/// The character's inventory.
pub async fn equipment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: CharacterId = parse_id(&id)?;
    Ok(Json(state.store.character_equipment(id).await?))
}

/// Equip or unequip an owned item.
pub async fn toggle_equipment(
    State(state): State<Arc<AppState>>,
    Path((id, equipment_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let id: CharacterId = parse_id(&id)?;
    let equipment_id: EquipmentId = parse_id(&equipment_id)?;
    Ok(Json(state.store.toggle_equipment(id, equipment_id).await?))
}

/// Titles the character has earned.
pub async fn titles(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: CharacterId = parse_id(&id)?;
    Ok(Json(state.store.list_titles(id).await?))
}

/// Display a different earned title.
pub async fn set_active_title(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<SetTitleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    body.validate()?;
    let id: CharacterId = parse_id(&id)?;
    Ok(Json(state.store.set_active_title(id, body.title).await?))
}
