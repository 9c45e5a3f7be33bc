//! # eventreg
//!
//! Event-registration backend: admin and team-user login, team registration,
//! an append-only leaderboard, and certificate uploads. Usable both as a
//! standalone binary and as a library.
//!
//! ## Library Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use eventreg::config::ServerConfig;
//! use eventreg::server::{AppState, create_router};
//! use eventreg::store::{SqliteStore, Store};
//!
//! let config = ServerConfig::default();
//! let store = SqliteStore::new(config.db_path()).unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState::new(Arc::new(store), &config));
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Builds the `eventreg` binary. Disable with `default-features = false`.

pub mod auth;
pub mod certificates;
pub mod config;
pub mod error;
pub mod server;
pub mod store;
pub mod types;
