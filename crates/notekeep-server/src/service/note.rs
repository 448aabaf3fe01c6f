//! Note CRUD with a cache-aside read path.
//!
//! Reads check the cache first and fall back to the database. A database hit
//! populates the cache from a detached task, so the caller never waits on the
//! cache and a failed write only means the next read goes to the database
//! again. Updates and deletes drop the cached copy.
//!
//! Every update and delete bumps a write generation before invalidating. The
//! population task skips its write if the generation moved since the read,
//! and drops the entry again if it moved while the write was in flight, so a
//! late write from this process cannot outlive an invalidation. Writes from
//! other processes sharing the Redis tier are not tracked; for those the
//! cache TTL bounds staleness.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::cache::{CacheBackend, note_cache_key};
use crate::storage::{Database, Note};

use super::error::ServiceError;

/// Where a note returned by [`NoteService::get_by_id`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteSource {
    Cache,
    Store,
}

#[derive(Debug, Clone)]
pub struct NoteLookup {
    pub note: Note,
    pub source: NoteSource,
}

impl NoteLookup {
    pub fn is_cached(&self) -> bool {
        self.source == NoteSource::Cache
    }
}

/// One page of a user's notes.
#[derive(Debug, Clone)]
pub struct NotePage {
    pub notes: Vec<Note>,
    pub has_prev: bool,
    pub has_next: bool,
}

#[derive(Clone)]
pub struct NoteService {
    db: Database,
    cache: CacheBackend,
    cache_ttl: Duration,
    generation: Arc<AtomicU64>,
}

impl NoteService {
    pub fn new(db: Database, cache: CacheBackend, cache_ttl: Duration) -> Self {
        Self {
            db,
            cache,
            cache_ttl,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    #[instrument(skip(self, title, content))]
    pub async fn create(
        &self,
        user_id: &str,
        title: &str,
        content: &str,
    ) -> Result<Note, ServiceError> {
        let note_id = uuid::Uuid::new_v4().to_string();
        let note = self
            .db
            .create_note(&note_id, user_id, title, content)
            .await?;

        info!(note_id = %note.id, "Note created");
        Ok(note)
    }

    /// Page through a user's notes, `limit` per page.
    ///
    /// One extra row is fetched to learn whether a next page exists.
    pub async fn list(
        &self,
        user_id: &str,
        page: u32,
        limit: u32,
    ) -> Result<NotePage, ServiceError> {
        let skip = i64::from(page) * i64::from(limit);
        let take = i64::from(limit) + 1;

        let mut notes = self.db.list_notes(user_id, skip, take).await?;

        let has_next = notes.len() > limit as usize;
        notes.truncate(limit as usize);

        Ok(NotePage {
            notes,
            has_prev: page > 0,
            has_next,
        })
    }

    /// Fetch one of the user's notes, preferring the cache.
    ///
    /// The cache key includes the user id, so a cached entry can only ever
    /// be served back to its owner.
    #[instrument(skip(self))]
    pub async fn get_by_id(&self, user_id: &str, note_id: &str) -> Result<NoteLookup, ServiceError> {
        let key = note_cache_key(user_id, note_id);

        if let Some(bytes) = self.cache.get(&key).await {
            match serde_json::from_slice::<Note>(&bytes) {
                Ok(note) => {
                    debug!("Note served from cache");
                    return Ok(NoteLookup {
                        note,
                        source: NoteSource::Cache,
                    });
                }
                Err(e) => warn!(key = %key, error = %e, "Discarding undecodable cache entry"),
            }
        }

        // Taken before the read so a write that lands in between is noticed.
        let seen = self.generation.load(Ordering::SeqCst);
        let note = self
            .db
            .get_note_for_owner(note_id, user_id)
            .await?
            .ok_or(ServiceError::NotFound("note"))?;

        self.populate_cache(key, &note, seen);

        Ok(NoteLookup {
            note,
            source: NoteSource::Store,
        })
    }

    /// Overwrite a note's title and content.
    ///
    /// A note owned by someone else fails exactly like a missing one.
    #[instrument(skip(self, title, content))]
    pub async fn update(
        &self,
        user_id: &str,
        note_id: &str,
        title: &str,
        content: &str,
    ) -> Result<(), ServiceError> {
        if !self
            .db
            .update_note_for_owner(note_id, user_id, title, content)
            .await?
        {
            return Err(ServiceError::NotFound("note"));
        }

        self.invalidate(user_id, note_id).await;
        info!("Note updated");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, user_id: &str, note_id: &str) -> Result<(), ServiceError> {
        if !self.db.delete_note_for_owner(note_id, user_id).await? {
            return Err(ServiceError::NotFound("note"));
        }

        self.invalidate(user_id, note_id).await;
        info!("Note deleted");
        Ok(())
    }

    async fn invalidate(&self, user_id: &str, note_id: &str) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.cache.invalidate(&note_cache_key(user_id, note_id)).await;
    }

    fn populate_cache(&self, key: String, note: &Note, seen: u64) {
        if !self.cache.is_enabled() {
            return;
        }

        let payload = match serde_json::to_vec(note) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "Cannot encode note for cache");
                return;
            }
        };

        let cache = self.cache.clone();
        let generation = Arc::clone(&self.generation);
        let ttl = self.cache_ttl;
        tokio::spawn(async move {
            store_if_current(&cache, &generation, seen, &key, payload, ttl).await;
        });
    }
}

/// Write `payload` unless a note write happened after generation `seen`.
async fn store_if_current(
    cache: &CacheBackend,
    generation: &AtomicU64,
    seen: u64,
    key: &str,
    payload: Vec<u8>,
    ttl: Duration,
) {
    if generation.load(Ordering::SeqCst) != seen {
        debug!(key = %key, "Skipping cache write for a note changed since the read");
        return;
    }

    cache.set(key, payload, ttl).await;

    if generation.load(Ordering::SeqCst) != seen {
        cache.invalidate(key).await;
    }
}
