//! Note cache.
//!
//! A derived, time-bounded copy of note records keyed by owner and note ID.
//! Nothing reads the cache for correctness: every failure is a miss.

mod backend;

pub use backend::{CacheBackend, create_cache_backend};

/// Cache key for a note. Encodes the owner so a hit never crosses users.
pub fn note_cache_key(user_id: &str, note_id: &str) -> String {
    format!("req:cache:note:{user_id}:{note_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_encodes_owner_and_note() {
        assert_eq!(note_cache_key("u1", "n1"), "req:cache:note:u1:n1");
        assert_ne!(note_cache_key("u1", "n1"), note_cache_key("u2", "n1"));
    }
}
