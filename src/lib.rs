//! # Robokey
//!
//! Project-scoped robot accounts for a container registry, usable both as a
//! standalone server and as a library.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! robokey = { version = "0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use robokey::config::DEFAULT_REQUEST_TIMEOUT;
//! use robokey::robot::StaticCatalog;
//! use robokey::server::{AppState, create_router};
//! use robokey::store::{SqliteStore, Store};
//!
//! let store = SqliteStore::new("./data/robokey.db")?;
//! store.initialize()?;
//!
//! let state = Arc::new(AppState::new(
//!     Arc::new(store),
//!     StaticCatalog::builtin(),
//!     DEFAULT_REQUEST_TIMEOUT,
//! ));
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! The robot lifecycle itself lives in [`robot::RobotManager`] and does not
//! depend on HTTP or SQLite; bring your own [`robot::RobotStore`] to embed it.
//!
//! ## Feature Flags
//!
//! - `cli` (default): Includes CLI module. Disable with `default-features = false`.

pub mod auth;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod robot;
pub mod server;
pub mod store;
pub mod types;
pub mod validation;
