pub mod session;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::info;

use crate::{
    config::AppConfig,
    dao::{
        archive::{ArchiveStore, CachedArchive, FolderId},
        storage::StorageResult,
    },
    state::session::SessionStore,
};

pub type SharedState = Arc<AppState>;

/// Central application state shared by every HTTP and WebSocket handler.
pub struct AppState {
    sessions: SessionStore,
    archive: CachedArchive,
    root_folder: FolderId,
    /// One lock per session, held while a session-level document is snapshotted and uploaded.
    archive_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl AppState {
    /// Wrap `archive` in a folder cache, resolve the root folder and build the shared state.
    pub async fn bootstrap(
        config: &AppConfig,
        archive: Arc<dyn ArchiveStore>,
    ) -> StorageResult<SharedState> {
        let archive = CachedArchive::new(archive);
        let root_folder = archive
            .get_or_create_folder(config.root_folder().to_string(), None)
            .await?;
        info!(folder = %config.root_folder(), id = %root_folder, "archive root folder ready");

        Ok(Arc::new(Self {
            sessions: SessionStore::new(config.teams().to_vec()),
            archive,
            root_folder,
            archive_locks: DashMap::new(),
        }))
    }

    /// Registry of in-memory sessions.
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Remote archive with memoized folder lookups.
    pub fn archive(&self) -> &CachedArchive {
        &self.archive
    }

    /// Folder holding one subfolder per session.
    pub fn root_folder(&self) -> &FolderId {
        &self.root_folder
    }

    /// Serialize `session.json` and `scoreboard.json` writes of one session.
    ///
    /// Take the guard before snapshotting the session so the last upload always
    /// carries the latest state.
    pub async fn lock_session_archive(&self, session_id: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .archive_locks
            .entry(session_id.to_string())
            .or_default()
            .clone();
        lock.lock_owned().await
    }
}

#[cfg(test)]
pub(crate) async fn memory_state() -> (SharedState, crate::dao::archive::MemoryArchive) {
    let archive = crate::dao::archive::MemoryArchive::new();
    let state = AppState::bootstrap(&AppConfig::default(), Arc::new(archive.clone()))
        .await
        .expect("memory archive never fails unless told to");
    (state, archive)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn session_archive_lock_is_exclusive_per_session() {
        let (state, _archive) = memory_state().await;

        let held = state.lock_session_archive("g1").await;
        let other = tokio::time::timeout(
            Duration::from_millis(20),
            state.lock_session_archive("g2"),
        )
        .await;
        assert!(other.is_ok(), "different sessions do not block each other");

        let same = tokio::time::timeout(
            Duration::from_millis(20),
            state.lock_session_archive("g1"),
        )
        .await;
        assert!(same.is_err(), "same session waits for the holder");

        drop(held);
        assert!(
            tokio::time::timeout(Duration::from_millis(20), state.lock_session_archive("g1"))
                .await
                .is_ok()
        );
    }
}
