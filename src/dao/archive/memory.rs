//! Process-local archive backend used by tests and by `ARCHIVE_BACKEND=memory` runs.

use std::{
    io,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
};

use futures::future::BoxFuture;

use crate::dao::storage::{StorageError, StorageResult};

use super::{ArchiveStore, FOLDER_MIME, FileId, FolderId};

/// Folder entry kept by [`MemoryArchive`].
#[derive(Debug, Clone)]
pub struct StoredFolder {
    pub id: FolderId,
    pub name: String,
    pub parent: Option<FolderId>,
    pub trashed: bool,
}

/// File entry kept by [`MemoryArchive`].
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub id: FileId,
    pub name: String,
    pub mime: String,
    pub parent: FolderId,
    pub content: Vec<u8>,
}

#[derive(Debug, Default)]
struct Inner {
    folders: Vec<StoredFolder>,
    files: Vec<StoredFile>,
    next_id: u64,
}

impl Inner {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }
}

/// In-memory [`ArchiveStore`] mirroring the lookup/create semantics of the remote store.
///
/// Folder lookup and creation are two separate steps with a yield point in between,
/// so concurrent callers can race exactly like they would against the remote API.
#[derive(Debug, Clone, Default)]
pub struct MemoryArchive {
    inner: Arc<Mutex<Inner>>,
    failing: Arc<AtomicBool>,
}

impl MemoryArchive {
    /// Create an empty archive.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail (or succeed again) with an unavailable error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Snapshot of every folder created so far, in creation order.
    pub fn folders(&self) -> Vec<StoredFolder> {
        self.lock().folders.clone()
    }

    /// Snapshot of every uploaded file, in upload order.
    pub fn files(&self) -> Vec<StoredFile> {
        self.lock().files.clone()
    }

    /// Files called `name` directly under `parent`, in upload order.
    pub fn files_named(&self, name: &str, parent: &FolderId) -> Vec<StoredFile> {
        self.lock()
            .files
            .iter()
            .filter(|file| file.name == name && &file.parent == parent)
            .cloned()
            .collect()
    }

    /// Move a folder to the trash so lookups skip it.
    pub fn trash_folder(&self, id: &FolderId) {
        if let Some(folder) = self.lock().folders.iter_mut().find(|f| &f.id == id) {
            folder.trashed = true;
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_available(&self) -> StorageResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::unavailable(
                "memory archive is failing",
                io::Error::new(io::ErrorKind::ConnectionRefused, "injected failure"),
            ));
        }
        Ok(())
    }

    fn find_folder(&self, name: &str, parent: Option<&FolderId>) -> Option<FolderId> {
        self.lock()
            .folders
            .iter()
            .find(|folder| !folder.trashed && folder.name == name && folder.parent.as_ref() == parent)
            .map(|folder| folder.id.clone())
    }
}

impl ArchiveStore for MemoryArchive {
    fn get_or_create_folder(
        &self,
        name: String,
        parent: Option<FolderId>,
    ) -> BoxFuture<'static, StorageResult<FolderId>> {
        let archive = self.clone();
        Box::pin(async move {
            archive.check_available()?;
            if let Some(existing) = archive.find_folder(&name, parent.as_ref()) {
                return Ok(existing);
            }

            tokio::task::yield_now().await;

            let mut inner = archive.lock();
            let id = FolderId::new(inner.next_id("folder"));
            inner.folders.push(StoredFolder {
                id: id.clone(),
                name,
                parent,
                trashed: false,
            });
            Ok(id)
        })
    }

    fn upload_file(
        &self,
        name: String,
        content: Vec<u8>,
        mime: String,
        parent: FolderId,
    ) -> BoxFuture<'static, StorageResult<FileId>> {
        let archive = self.clone();
        Box::pin(async move {
            archive.check_available()?;
            debug_assert_ne!(mime, FOLDER_MIME);
            tokio::task::yield_now().await;
            let mut inner = archive.lock();
            let id = FileId::new(inner.next_id("file"));
            inner.files.push(StoredFile {
                id: id.clone(),
                name,
                mime,
                parent,
                content,
            });
            Ok(id)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let archive = self.clone();
        Box::pin(async move { archive.check_available() })
    }
}
