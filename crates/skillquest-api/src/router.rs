//! Axum router construction for the SkillQuest API.
//!
//! Assembles every route into a single [`Router`] with CORS enabled for
//! the SPA and HTTP request tracing.

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post, put};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{characters, dozent, handlers, quests, social};

/// Build the complete Axum router.
///
/// Route tables live in the module docs of [`handlers`], [`characters`],
/// [`quests`], [`dozent`] and [`social`].
///
/// CORS allows any origin so the SPA can be served from a separate host
/// during development.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        // Users
        .route("/api/users", post(handlers::create_user))
        .route("/api/admin/users", get(handlers::list_users))
        .route("/api/admin/users/{id}/role", put(handlers::set_user_role))
        // Characters
        .route("/api/characters", post(characters::create))
        .route(
            "/api/characters/user/{user_id}",
            get(characters::list_for_user),
        )
        .route(
            "/api/characters/{id}",
            get(characters::get)
                .put(characters::update)
                .delete(characters::delete),
        )
        .route("/api/characters/{id}/xp", post(characters::grant_xp))
        .route(
            "/api/characters/{id}/attribute",
            post(characters::increase_attribute),
        )
        .route("/api/characters/{id}/equipment", get(characters::equipment))
        .route(
            "/api/characters/{id}/equipment/{equipment_id}/toggle",
            post(characters::toggle_equipment),
        )
        .route("/api/characters/{id}/titles", get(characters::titles))
        .route(
            "/api/characters/{id}/titles/active",
            put(characters::set_active_title),
        )
        // Quests (trainee)
        .route("/api/quests", get(quests::list))
        .route(
            "/api/quests/character/{character_id}",
            get(quests::for_character),
        )
        .route("/api/quests/{id}/start", post(quests::start))
        .route("/api/quests/{id}/submit", post(quests::submit))
        .route("/api/quests/{id}/complete", post(quests::complete))
        // Quests (instructor)
        .route("/api/dozent/xp-preview", get(dozent::xp_preview))
        .route("/api/dozent/quests", post(dozent::create_quest))
        .route("/api/dozent/quests/all", get(dozent::overview))
        .route(
            "/api/dozent/quests/{id}",
            put(dozent::update_quest).delete(dozent::delete_quest),
        )
        .route("/api/dozent/quests/{id}/assign", post(dozent::assign_quest))
        .route(
            "/api/dozent/quests/{id}/submissions",
            get(dozent::submissions),
        )
        .route("/api/dozent/submissions/{id}/grade", post(dozent::grade))
        // Achievements
        .route(
            "/api/achievements",
            get(social::list_achievements).post(social::create_achievement),
        )
        .route(
            "/api/achievements/character/{id}",
            get(social::character_achievements),
        )
        .route(
            "/api/achievements/character/{id}/check",
            post(social::check_achievements),
        )
        // Leaderboards
        .route("/api/leaderboard/{kind}", get(social::leaderboard))
        // Notifications
        .route("/api/notifications/user/{id}", get(social::notifications))
        .route(
            "/api/notifications/user/{id}/unread",
            get(social::unread_count),
        )
        .route(
            "/api/notifications/user/{id}/read-all",
            put(social::mark_all_read),
        )
        .route("/api/notifications/{id}/read", put(social::mark_read))
        // Equipment catalogue
        .route(
            "/api/equipment",
            get(handlers::list_equipment).post(handlers::create_equipment),
        )
        .route("/api/equipment/{id}", delete(handlers::delete_equipment))
        // Groups
        .route(
            "/api/groups",
            get(social::list_groups).post(social::create_group),
        )
        .route(
            "/api/groups/{id}",
            get(social::get_group).delete(social::delete_group),
        )
        .route("/api/groups/{id}/members", post(social::add_member))
        .route(
            "/api/groups/{id}/members/{user_id}",
            delete(social::remove_member),
        )
        // Maintenance
        .route("/api/maintenance/sweep", post(handlers::run_sweep))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
