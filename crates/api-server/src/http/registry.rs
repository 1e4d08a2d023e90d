use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use shared::config::SessionConfig;
use shared::session::SessionController;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

pub type SharedController = Arc<Mutex<SessionController>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("session not found")]
    NotFound,
    #[error("session limit of {max_sessions} reached")]
    LimitReached { max_sessions: usize },
}

struct RegistryEntry {
    controller: SharedController,
    last_active: Instant,
}

/// Live sessions keyed by id. Each controller sits behind its own lock so sessions
/// never contend with one another. Sessions idle for longer than `idle_ttl` are
/// evicted on the next `create` or `get`; an in-flight completion keeps its own
/// handle to the controller and finishes unaffected.
#[derive(Clone)]
pub struct SessionRegistry {
    entries: Arc<Mutex<HashMap<Uuid, RegistryEntry>>>,
    max_sessions: usize,
    idle_ttl: Duration,
}

impl SessionRegistry {
    pub fn new(max_sessions: usize, idle_ttl: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            max_sessions,
            idle_ttl,
        }
    }

    pub fn create(&self, config: SessionConfig) -> Result<Uuid, RegistryError> {
        self.create_at(config, Instant::now())
    }

    pub fn get(&self, session_id: Uuid) -> Result<SharedController, RegistryError> {
        self.get_at(session_id, Instant::now())
    }

    pub fn remove(&self, session_id: Uuid) -> Result<(), RegistryError> {
        self.entries()
            .remove(&session_id)
            .map(|_| ())
            .ok_or(RegistryError::NotFound)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn create_at(&self, config: SessionConfig, now: Instant) -> Result<Uuid, RegistryError> {
        let mut entries = self.entries();
        self.evict_idle(&mut entries, now);
        if entries.len() >= self.max_sessions {
            return Err(RegistryError::LimitReached {
                max_sessions: self.max_sessions,
            });
        }

        let controller = SessionController::new(config);
        let session_id = controller.session_id();
        entries.insert(
            session_id,
            RegistryEntry {
                controller: Arc::new(Mutex::new(controller)),
                last_active: now,
            },
        );
        Ok(session_id)
    }

    fn get_at(&self, session_id: Uuid, now: Instant) -> Result<SharedController, RegistryError> {
        let mut entries = self.entries();
        self.evict_idle(&mut entries, now);

        let entry = entries
            .get_mut(&session_id)
            .ok_or(RegistryError::NotFound)?;
        entry.last_active = now;
        Ok(Arc::clone(&entry.controller))
    }

    fn evict_idle(&self, entries: &mut HashMap<Uuid, RegistryEntry>, now: Instant) {
        let before = entries.len();
        entries.retain(|_, entry| now.saturating_duration_since(entry.last_active) < self.idle_ttl);

        let evicted = before - entries.len();
        if evicted > 0 {
            info!(evicted, active_sessions = entries.len(), "evicted idle sessions");
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<Uuid, RegistryEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub(super) fn lock_controller(controller: &SharedController) -> MutexGuard<'_, SessionController> {
    controller.lock().unwrap_or_else(PoisonError::into_inner)
}
