//! Tables SMS - command and query interpreter for spreadsheet tables
//!
//! Turns inbound text messages such as `@house +Name Elm +Beds 3` or
//! `@house ?Name =Beds 3` into a row insertion or a query whose answer is
//! texted back to the sender.
//!
//! # Features
//!
//! - Shortcuts that rewrite abbreviated commands
//! - Per-table password checks against access-control tables
//! - Date-aware filters over dates, times and date ranges
//! - Free-window replies for scheduling (`/avail 30m`)
//! - A SQLite reference store for the host side

/// Password check
pub mod access;
/// Add command compilation
pub mod add;
/// Free-window computation
pub mod availability;
/// Table and mode resolution
pub mod command;
/// Configuration management
pub mod config;
/// Error types
pub mod error;
/// The per-message pipeline
pub mod handler;
/// Logging setup and utilities
pub mod logging;
/// Metrics collection
pub mod metrics;
/// Data models and structures
pub mod models;
/// Query command compilation
pub mod query;
/// Collaborator traits
pub mod repository;
/// Query execution and reply rendering
pub mod respond;
/// Database schema definitions
pub mod schema;
/// Shortcut expansion
pub mod shortcut;
/// SQLite reference implementation of the collaborators
pub mod store;
/// Date, time and duration parsing
pub mod temporal;
/// Column value validation
pub mod validation;

// Re-export key components for easier access
pub use error::{Rejection, Result, TablesSmsError};
pub use handler::{MessageHandler, Outcome};
pub use models::{InboundMessage, TableDescriptor};
pub use store::SqliteStore;
