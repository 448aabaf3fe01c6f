//! Service layer: token lifecycle, user accounts and notes.
//!
//! Services own the business rules; the HTTP layer only translates requests
//! and renders [`ServiceError`]s.

pub mod error;
pub mod note;
pub mod token;
pub mod user;

#[cfg(test)]
mod token_tests;

pub use error::ServiceError;
pub use note::{NoteLookup, NotePage, NoteService, NoteSource};
pub use token::{EXPIRY_GRACE_SECS, IssuedToken, TokenPair, TokenService};
pub use user::UserService;
