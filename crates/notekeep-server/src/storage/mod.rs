//! `SQLite` storage for notekeep.
//!
//! Provides persistence for users, tokens and notes.

mod db;
mod models;
mod queries;
mod queries_notes;


pub use db::Database;
pub use models::*;
pub use notekeep_core::db::DatabaseError;
