//! REST API for the SkillQuest learning platform.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **Trainee endpoints** for characters, quests, submissions, titles
//!   and inventories
//! - **Instructor endpoints** (`/api/dozent`) for authoring quests,
//!   assigning them and grading submissions
//! - **Social endpoints** for achievements, leaderboards, notifications
//!   and groups
//! - **Maintenance** (`POST /api/maintenance/sweep`) plus a background
//!   sweeper that expires overdue work and reopens repeatable quests
//!
//! # Architecture
//!
//! Handlers hold an `Arc<dyn Store>` from [`AppState`] and never touch a
//! database directly. Every rule about XP, levels and quest status lives
//! in `skillquest-progression` and is applied by the store inside one
//! unit of work; handlers only parse, validate and translate errors.
//!
//! Callers identify themselves with explicit user IDs in request bodies
//! or query strings. There is no session layer.

pub mod characters;
pub mod dozent;
pub mod error;
pub mod handlers;
pub mod quests;
pub mod router;
pub mod server;
pub mod social;
pub mod startup;
pub mod state;

pub use error::ApiError;
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use startup::spawn_sweeper;
pub use state::AppState;
