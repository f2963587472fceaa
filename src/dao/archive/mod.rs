#[cfg(feature = "drive-store")]
pub mod drive;

mod cache;
mod memory;

use std::fmt;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::dao::storage::{StorageError, StorageResult};

pub use cache::CachedArchive;
pub use memory::MemoryArchive;

/// MIME type the remote store uses to flag an item as a folder.
pub const FOLDER_MIME: &str = "application/vnd.google-apps.folder";
/// MIME type attached to every JSON artifact.
pub const JSON_MIME: &str = "application/json";

/// Identifier of a folder inside the remote archive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FolderId(String);

impl FolderId {
    /// Wrap a raw identifier returned by the backend.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of an uploaded file inside the remote archive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(String);

impl FileId {
    /// Wrap a raw identifier returned by the backend.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Abstraction over the hierarchical file store used to archive session artifacts.
///
/// Uploads never overwrite: every call creates a new file entry, even when a file
/// with the same name already exists under `parent`.
pub trait ArchiveStore: Send + Sync {
    /// Return the first non-trashed folder called `name` under `parent`, creating it when absent.
    fn get_or_create_folder(
        &self,
        name: String,
        parent: Option<FolderId>,
    ) -> BoxFuture<'static, StorageResult<FolderId>>;
    /// Store raw `content` as a new file called `name` under `parent`.
    fn upload_file(
        &self,
        name: String,
        content: Vec<u8>,
        mime: String,
        parent: FolderId,
    ) -> BoxFuture<'static, StorageResult<FileId>>;
    /// Verify that the backend is reachable with the configured credentials.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}

/// Serialize `data` as pretty-printed JSON and store it as a new file under `parent`.
pub async fn upload_json<T>(
    archive: &dyn ArchiveStore,
    name: &str,
    data: &T,
    parent: &FolderId,
) -> StorageResult<FileId>
where
    T: ?Sized + Serialize,
{
    let content = serde_json::to_vec_pretty(data)
        .map_err(|source| StorageError::serialization(name, source))?;
    archive
        .upload_file(name.to_string(), content, JSON_MIME.to_string(), parent.clone())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn upload_json_stores_pretty_printed_payload() {
        let archive = MemoryArchive::new();
        let root = archive
            .get_or_create_folder("root".into(), None)
            .await
            .unwrap();

        upload_json(&archive, "scoreboard.json", &json!({"A": 1, "B": 0}), &root)
            .await
            .unwrap();

        let files = archive.files_named("scoreboard.json", &root);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].mime, JSON_MIME);
        let text = String::from_utf8(files[0].content.clone()).unwrap();
        assert!(text.contains('\n'));
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&text).unwrap(),
            json!({"A": 1, "B": 0})
        );
    }

    #[tokio::test]
    async fn repeated_uploads_accumulate_files() {
        let archive = MemoryArchive::new();
        let root = archive
            .get_or_create_folder("root".into(), None)
            .await
            .unwrap();

        upload_json(&archive, "scoreboard.json", &json!({"A": 0}), &root)
            .await
            .unwrap();
        upload_json(&archive, "scoreboard.json", &json!({"A": 1}), &root)
            .await
            .unwrap();

        assert_eq!(archive.files_named("scoreboard.json", &root).len(), 2);
    }
}
