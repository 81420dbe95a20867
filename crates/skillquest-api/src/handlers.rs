//! Health, user administration, equipment catalogue and maintenance
//! handlers, plus the helpers every handler module shares.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/health` | Liveness and server time |
//! | `POST` | `/api/users` | Create a user |
//! | `GET` | `/api/admin/users` | List users |
//! | `PUT` | `/api/admin/users/{id}/role` | Change a user's role |
//! | `GET` | `/api/equipment` | Equipment catalogue |
//! | `POST` | `/api/equipment` | Add catalogue entry |
//! | `DELETE` | `/api/equipment/{id}` | Remove catalogue entry |
//! | `POST` | `/api/maintenance/sweep` | Run the deadline and repeat sweep |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use skillquest_db::{NewEquipment, NewUser};
use skillquest_types::{Attributes, EquipmentId, Rarity, Role, UserId};
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

/// Body of `POST /api/users`.
#[derive(Debug, serde::Deserialize, Validate)]
pub struct CreateUserRequest {
    /// Unique login name.
    #[validate(length(min = 1, max = 64))]
    pub username: String,
    /// Role, defaults to trainee.
    #[serde(default = "default_role")]
    pub role: Role,
}

const fn default_role() -> Role {
    Role::Nachwuchskraft
}

/// Body of `PUT /api/admin/users/{id}/role`.
#[derive(Debug, serde::Deserialize)]
pub struct SetRoleRequest {
    /// The new role.
    pub role: Role,
}

/// Body of `POST /api/equipment`.
#[derive(Debug, serde::Deserialize, Validate)]
pub struct CreateEquipmentRequest {
    /// Display name.
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// `laptop`, `software`, `tool` or `certification`.
    #[validate(length(min = 1, max = 32))]
    #[serde(rename = "type")]
    pub kind: String,
    /// Rarity, defaults to common.
    #[serde(default = "default_rarity")]
    pub rarity: Rarity,
    /// Attribute bonuses while equipped.
    #[serde(default)]
    pub bonuses: Attributes,
    /// Level needed to use the item.
    #[validate(range(min = 1, max = 50))]
    #[serde(default = "default_min_level")]
    pub min_level: u32,
}

const fn default_rarity() -> Rarity {
    Rarity::Common
}

pub(crate) const fn default_min_level() -> u32 {
    1
}

/// Confirmation returned by deletions and other body-less writes.
#[derive(Debug, serde::Serialize)]
pub(crate) struct Message {
    /// Human-readable outcome.
    pub message: String,
}

impl Message {
    pub(crate) fn new(message: &str) -> Json<Self> {
        Json(Self {
            message: message.to_owned(),
        })
    }
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

/// Report liveness, storage reachability and the server clock.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let storage = match state.store.ping().await {
        Ok(()) => "ok",
        Err(e) => {
            tracing::warn!(error = %e, "Storage ping failed");
            "unavailable"
        }
    };
    Json(serde_json::json!({
        "status": "ok",
        "storage": storage,
        "timestamp": Utc::now(),
    }))
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// Create a user. The first admin becomes the super admin.
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    body.validate()?;
    let user = state
        .store
        .create_user(NewUser {
            username: body.username.trim().to_owned(),
            role: body.role,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// List every user.
pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.store.list_users().await?))
}

/// Change a user's role. The super admin cannot be changed.
pub async fn set_user_role(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<SetRoleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id: UserId = parse_id(&id)?;
    Ok(Json(state.store.set_user_role(id, body.role).await?))
}

// ---------------------------------------------------------------------------
// Equipment catalogue
// ---------------------------------------------------------------------------

/// The equipment catalogue.
pub async fn list_equipment(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.store.list_equipment().await?))
}

/// Add a catalogue entry.
pub async fn create_equipment(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateEquipmentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    body.validate()?;
    let equipment = state
        .store
        .create_equipment(NewEquipment {
            name: body.name,
            description: body.description,
            kind: body.kind,
            rarity: body.rarity,
            bonuses: body.bonuses,
            min_level: body.min_level,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(equipment)))
}

/// Remove a catalogue entry.
pub async fn delete_equipment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: EquipmentId = parse_id(&id)?;
    state.store.delete_equipment(id).await?;
    Ok(Message::new("equipment deleted"))
}

// ---------------------------------------------------------------------------
// POST /api/maintenance/sweep
// ---------------------------------------------------------------------------

/// Expire overdue work and reopen due repeatable quests now.
pub async fn run_sweep(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state.store.sweep(Utc::now()).await?;
    Ok(Json(serde_json::json!({
        "expired": report.expired,
        "reopened": report.reopened,
    })))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a typed ID from a path or query segment.
pub(crate) fn parse_id<T: From<Uuid>>(s: &str) -> Result<T, ApiError> {
    s.parse::<Uuid>()
        .map(T::from)
        .map_err(|e| ApiError::InvalidUuid(format!("{s}: {e}")))
}

/// Parse an optional ID from a query string.
pub(crate) fn parse_optional_id<T: From<Uuid>>(s: Option<&str>) -> Result<Option<T>, ApiError> {
    s.map(parse_id).transpose()
}
