use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, RequestBuilder, Response, header::CONTENT_TYPE};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::dao::{
    archive::{ArchiveStore, FileId, FolderId},
    storage::StorageResult,
};

use super::{
    auth::TokenSource,
    config::DriveConfig,
    error::{DriveDaoError, DriveResult},
    models::{
        FileList, FileMetadata, FileRef, MULTIPART_BOUNDARY, folder_query, multipart_related,
    },
};

const FILES_PATH: &str = "drive/v3/files";
const UPLOAD_PATH: &str = "upload/drive/v3/files";
const ABOUT_PATH: &str = "drive/v3/about";

/// [`ArchiveStore`] backed by the Google Drive v3 REST API.
#[derive(Clone)]
pub struct DriveArchive {
    client: Client,
    api_base: Arc<str>,
    tokens: TokenSource,
}

impl DriveArchive {
    /// Build the HTTP client, resolve credentials and verify that Drive answers.
    pub async fn connect(config: DriveConfig) -> DriveResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| DriveDaoError::ClientBuilder { source })?;

        let tokens = match config.access_token.as_deref() {
            Some(token) => TokenSource::from_token(token)?,
            None => TokenSource::from_default_credentials()?,
        };

        let store = Self {
            client,
            api_base: Arc::<str>::from(config.api_base.trim_end_matches('/')),
            tokens,
        };

        store.about().await?;
        info!(api_base = %store.api_base, "connected to Google Drive");
        Ok(store)
    }

    async fn request(&self, method: Method, path: &str) -> DriveResult<RequestBuilder> {
        let url = format!("{}/{}", self.api_base, path);
        let headers = self.tokens.headers().await?;
        Ok(self.client.request(method, url).headers(headers))
    }

    async fn send(path: &str, builder: RequestBuilder) -> DriveResult<Response> {
        let response = builder
            .send()
            .await
            .map_err(|source| DriveDaoError::RequestSend {
                path: path.to_string(),
                source,
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(DriveDaoError::RequestStatus {
                path: path.to_string(),
                status,
                body,
            })
        }
    }

    async fn decode<T>(path: &str, response: Response) -> DriveResult<T>
    where
        T: DeserializeOwned,
    {
        response
            .json::<T>()
            .await
            .map_err(|source| DriveDaoError::DecodeResponse {
                path: path.to_string(),
                source,
            })
    }

    async fn about(&self) -> DriveResult<()> {
        let builder = self
            .request(Method::GET, ABOUT_PATH)
            .await?
            .query(&[("fields", "user")]);
        Self::send(ABOUT_PATH, builder).await.map(|_| ())
    }

    async fn find_folder(&self, name: &str, parent: Option<&FolderId>) -> DriveResult<Option<FolderId>> {
        let query = folder_query(name, parent);
        let builder = self.request(Method::GET, FILES_PATH).await?.query(&[
            ("q", query.as_str()),
            ("fields", "files(id)"),
            ("spaces", "drive"),
        ]);
        let response = Self::send(FILES_PATH, builder).await?;
        let list = Self::decode::<FileList>(FILES_PATH, response).await?;
        Ok(list.files.into_iter().next().map(|file| FolderId::new(file.id)))
    }

    async fn create_folder(&self, name: &str, parent: Option<&FolderId>) -> DriveResult<FolderId> {
        let builder = self
            .request(Method::POST, FILES_PATH)
            .await?
            .query(&[("fields", "id")])
            .json(&FileMetadata::folder(name, parent));
        let response = Self::send(FILES_PATH, builder).await?;
        let created = Self::decode::<FileRef>(FILES_PATH, response).await?;
        Ok(FolderId::new(created.id))
    }

    async fn create_file(
        &self,
        name: &str,
        content: &[u8],
        mime: &str,
        parent: &FolderId,
    ) -> DriveResult<FileId> {
        let metadata = serde_json::to_vec(&FileMetadata::file(name, parent)).map_err(|source| {
            DriveDaoError::SerializeMetadata {
                name: name.to_string(),
                source,
            }
        })?;
        let body = multipart_related(&metadata, mime, content);

        let builder = self
            .request(Method::POST, UPLOAD_PATH)
            .await?
            .query(&[("uploadType", "multipart"), ("fields", "id")])
            .header(
                CONTENT_TYPE,
                format!("multipart/related; boundary={MULTIPART_BOUNDARY}"),
            )
            .body(body);
        let response = Self::send(UPLOAD_PATH, builder).await?;
        let created = Self::decode::<FileRef>(UPLOAD_PATH, response).await?;
        Ok(FileId::new(created.id))
    }
}

impl ArchiveStore for DriveArchive {
    fn get_or_create_folder(
        &self,
        name: String,
        parent: Option<FolderId>,
    ) -> BoxFuture<'static, StorageResult<FolderId>> {
        let store = self.clone();
        Box::pin(async move {
            if let Some(existing) = store.find_folder(&name, parent.as_ref()).await? {
                debug!(folder = %name, id = %existing, "reusing Drive folder");
                return Ok(existing);
            }
            let created = store.create_folder(&name, parent.as_ref()).await?;
            debug!(folder = %name, id = %created, "created Drive folder");
            Ok(created)
        })
    }

    fn upload_file(
        &self,
        name: String,
        content: Vec<u8>,
        mime: String,
        parent: FolderId,
    ) -> BoxFuture<'static, StorageResult<FileId>> {
        let store = self.clone();
        Box::pin(async move {
            let id = store.create_file(&name, &content, &mime, &parent).await?;
            debug!(file = %name, id = %id, parent = %parent, bytes = content.len(), "uploaded file to Drive");
            Ok(id)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.about().await.map_err(Into::into) })
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        sync::{Arc, Mutex},
    };

    use axum::{
        Json, Router,
        body::Bytes,
        extract::{Query, State},
        http::{HeaderMap, StatusCode, header::AUTHORIZATION},
        routing::get,
    };
    use serde_json::{Value, json};

    use super::*;
    use crate::dao::{archive::FOLDER_MIME, storage::StorageError};

    const TOKEN: &str = "test-token";

    struct StubFolder {
        id: String,
        name: String,
        parent: Option<String>,
    }

    struct StubUpload {
        params: HashMap<String, String>,
        content_type: String,
        body: Vec<u8>,
    }

    /// Minimal stand-in for the Drive v3 endpoints the archive calls.
    #[derive(Default)]
    struct StubDrive {
        folders: Vec<StubFolder>,
        list_params: Vec<HashMap<String, String>>,
        created: Vec<Value>,
        uploads: Vec<StubUpload>,
        next_id: usize,
    }

    type Stub = Arc<Mutex<StubDrive>>;

    fn authorized(headers: &HeaderMap) -> Result<(), StatusCode> {
        match headers.get(AUTHORIZATION) {
            Some(value) if value == format!("Bearer {TOKEN}").as_str() => Ok(()),
            _ => Err(StatusCode::UNAUTHORIZED),
        }
    }

    async fn about(headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
        authorized(&headers)?;
        Ok(Json(json!({"user": {"displayName": "stub"}})))
    }

    async fn list(
        State(stub): State<Stub>,
        headers: HeaderMap,
        Query(params): Query<HashMap<String, String>>,
    ) -> Result<Json<Value>, StatusCode> {
        authorized(&headers)?;
        let query = params.get("q").cloned().unwrap_or_default();
        if query.contains("forbidden") {
            return Err(StatusCode::FORBIDDEN);
        }

        let mut stub = stub.lock().unwrap();
        stub.list_params.push(params);
        let files: Vec<Value> = stub
            .folders
            .iter()
            .filter(|folder| {
                let parent = folder.parent.clone().map(FolderId::new);
                folder_query(&folder.name, parent.as_ref()) == query
            })
            .map(|folder| json!({"id": folder.id}))
            .collect();
        Ok(Json(json!({"files": files})))
    }

    async fn create(
        State(stub): State<Stub>,
        headers: HeaderMap,
        Query(params): Query<HashMap<String, String>>,
        Json(metadata): Json<Value>,
    ) -> Result<Json<Value>, StatusCode> {
        authorized(&headers)?;
        assert_eq!(params.get("fields").map(String::as_str), Some("id"));

        let mut stub = stub.lock().unwrap();
        stub.next_id += 1;
        let id = format!("folder-{}", stub.next_id);
        stub.folders.push(StubFolder {
            id: id.clone(),
            name: metadata["name"].as_str().unwrap_or_default().to_string(),
            parent: metadata["parents"][0].as_str().map(str::to_string),
        });
        stub.created.push(metadata);
        Ok(Json(json!({"id": id, "kind": "drive#file"})))
    }

    async fn upload(
        State(stub): State<Stub>,
        headers: HeaderMap,
        Query(params): Query<HashMap<String, String>>,
        body: Bytes,
    ) -> Result<Json<Value>, StatusCode> {
        authorized(&headers)?;
        let mut stub = stub.lock().unwrap();
        stub.next_id += 1;
        let id = format!("file-{}", stub.next_id);
        stub.uploads.push(StubUpload {
            params,
            content_type: headers
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .unwrap_or_default()
                .to_string(),
            body: body.to_vec(),
        });
        Ok(Json(json!({"id": id})))
    }

    async fn spawn_stub() -> (String, Stub) {
        let stub = Stub::default();
        let app = Router::new()
            .route("/drive/v3/about", get(about))
            .route("/drive/v3/files", get(list).post(create))
            .route("/upload/drive/v3/files", axum::routing::post(upload))
            .with_state(stub.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/"), stub)
    }

    async fn connected() -> (DriveArchive, Stub) {
        let (base, stub) = spawn_stub().await;
        let archive = DriveArchive::connect(DriveConfig::new(base).with_access_token(TOKEN))
            .await
            .unwrap();
        (archive, stub)
    }

    #[tokio::test]
    async fn connect_rejects_unauthorized_token() {
        let (base, _stub) = spawn_stub().await;
        let err = DriveArchive::connect(DriveConfig::new(base).with_access_token("wrong"))
            .await
            .err()
            .expect("wrong token is refused");
        assert!(matches!(
            err,
            DriveDaoError::RequestStatus {
                status: reqwest::StatusCode::UNAUTHORIZED,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn existing_folder_is_reused_instead_of_created() {
        let (archive, stub) = connected().await;

        let root = archive
            .get_or_create_folder("FreeThrowData".into(), None)
            .await
            .unwrap();
        let again = archive
            .get_or_create_folder("FreeThrowData".into(), None)
            .await
            .unwrap();
        assert_eq!(root, again);

        let session = archive
            .get_or_create_folder("g1".into(), Some(root.clone()))
            .await
            .unwrap();
        assert_ne!(session, root);

        let stub = stub.lock().unwrap();
        assert_eq!(stub.created.len(), 2);
        assert_eq!(
            stub.created[0],
            json!({"name": "FreeThrowData", "mimeType": FOLDER_MIME})
        );
        assert_eq!(
            stub.created[1],
            json!({"name": "g1", "mimeType": FOLDER_MIME, "parents": [root.as_str()]})
        );

        let list = &stub.list_params[2];
        assert_eq!(list["fields"], "files(id)");
        assert_eq!(list["spaces"], "drive");
        assert_eq!(
            list["q"],
            format!(
                "name='g1' and mimeType='{FOLDER_MIME}' and trashed=false and '{}' in parents",
                root
            )
        );
    }

    #[tokio::test]
    async fn folder_names_are_escaped_in_queries() {
        let (archive, stub) = connected().await;
        archive
            .get_or_create_folder("it's".into(), None)
            .await
            .unwrap();

        let stub = stub.lock().unwrap();
        assert!(stub.list_params[0]["q"].starts_with(r"name='it\'s'"));
        assert_eq!(stub.created[0]["name"], "it's");
    }

    #[tokio::test]
    async fn files_are_uploaded_as_multipart_related() {
        let (archive, stub) = connected().await;
        let parent = FolderId::new("folder-9");

        let id = archive
            .upload_file(
                "clip.webm".into(),
                vec![0xde, 0xad, 0xbe, 0xef],
                "video/webm".into(),
                parent,
            )
            .await
            .unwrap();
        assert_eq!(id, FileId::new("file-1"));

        let stub = stub.lock().unwrap();
        let upload = &stub.uploads[0];
        assert_eq!(upload.params["uploadType"], "multipart");
        assert_eq!(upload.params["fields"], "id");
        assert_eq!(
            upload.content_type,
            format!("multipart/related; boundary={MULTIPART_BOUNDARY}")
        );

        let metadata = serde_json::to_vec(&json!({"name": "clip.webm", "parents": ["folder-9"]}))
            .unwrap();
        assert_eq!(
            upload.body,
            multipart_related(&metadata, "video/webm", &[0xde, 0xad, 0xbe, 0xef])
        );
    }

    #[tokio::test]
    async fn error_status_becomes_storage_unavailable() {
        let (archive, _stub) = connected().await;
        let err = archive
            .get_or_create_folder("forbidden".into(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Unavailable { .. }));
        assert!(archive.health_check().await.is_ok());
    }
}
