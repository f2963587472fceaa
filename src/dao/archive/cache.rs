use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::dao::storage::StorageResult;

use super::{ArchiveStore, FileId, FolderId};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FolderKey {
    name: String,
    parent: Option<FolderId>,
}

/// Memoizes folder identifiers per `(name, parent)` for the lifetime of the process.
///
/// Concurrent callers asking for the same folder share a single lookup/create call,
/// so this process never creates the same folder twice. A failed lookup is not
/// cached and the next caller tries again.
#[derive(Clone)]
pub struct CachedArchive {
    inner: Arc<dyn ArchiveStore>,
    folders: Arc<DashMap<FolderKey, Arc<OnceCell<FolderId>>>>,
}

impl CachedArchive {
    /// Wrap `inner` with an empty folder cache.
    pub fn new(inner: Arc<dyn ArchiveStore>) -> Self {
        Self {
            inner,
            folders: Arc::new(DashMap::new()),
        }
    }

    /// Number of folders resolved so far.
    pub fn cached_folders(&self) -> usize {
        self.folders
            .iter()
            .filter(|entry| entry.value().initialized())
            .count()
    }
}

impl ArchiveStore for CachedArchive {
    fn get_or_create_folder(
        &self,
        name: String,
        parent: Option<FolderId>,
    ) -> BoxFuture<'static, StorageResult<FolderId>> {
        let key = FolderKey {
            name: name.clone(),
            parent: parent.clone(),
        };
        let cell = self.folders.entry(key).or_default().clone();
        let inner = self.inner.clone();

        Box::pin(async move {
            if let Some(id) = cell.get() {
                debug!(folder = %name, id = %id, "folder cache hit");
                return Ok(id.clone());
            }
            let id = cell
                .get_or_try_init(|| inner.get_or_create_folder(name, parent))
                .await?;
            Ok(id.clone())
        })
    }

    fn upload_file(
        &self,
        name: String,
        content: Vec<u8>,
        mime: String,
        parent: FolderId,
    ) -> BoxFuture<'static, StorageResult<FileId>> {
        self.inner.upload_file(name, content, mime, parent)
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.health_check()
    }
}
