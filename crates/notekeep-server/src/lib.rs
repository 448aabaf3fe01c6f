//! notekeep Server Library
//!
//! Core functionality for the notekeep server:
//! - SQLite storage for users, tokens and notes
//! - JWT authentication and password hashing
//! - Token issuance, verification and single-use refresh rotation
//! - Note CRUD with a cache-aside read path (in-process or Redis)
//! - axum HTTP routes

pub mod auth;
pub mod cache;
pub mod http;
pub mod service;
pub mod storage;
