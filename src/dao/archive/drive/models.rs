use serde::{Deserialize, Serialize};

use crate::dao::archive::{FOLDER_MIME, FolderId};

/// Boundary separating the metadata and media parts of a multipart upload.
pub const MULTIPART_BOUNDARY: &str = "free_throw_archive_boundary";

#[derive(Debug, Deserialize)]
pub struct FileList {
    #[serde(default)]
    pub files: Vec<FileRef>,
}

#[derive(Debug, Deserialize)]
pub struct FileRef {
    pub id: String,
}

/// Metadata sent when creating a folder or a file.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata<'a> {
    pub name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<&'a str>,
}

impl<'a> FileMetadata<'a> {
    pub fn folder(name: &'a str, parent: Option<&'a FolderId>) -> Self {
        Self {
            name,
            mime_type: Some(FOLDER_MIME),
            parents: parent.map(FolderId::as_str).into_iter().collect(),
        }
    }

    pub fn file(name: &'a str, parent: &'a FolderId) -> Self {
        Self {
            name,
            mime_type: None,
            parents: vec![parent.as_str()],
        }
    }
}

/// Escape a value for use inside a single-quoted Drive query literal.
pub fn escape_query_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Query selecting non-trashed folders called `name`, optionally under `parent`.
pub fn folder_query(name: &str, parent: Option<&FolderId>) -> String {
    let mut query = format!(
        "name='{}' and mimeType='{}' and trashed=false",
        escape_query_literal(name),
        FOLDER_MIME
    );
    if let Some(parent) = parent {
        query.push_str(&format!(
            " and '{}' in parents",
            escape_query_literal(parent.as_str())
        ));
    }
    query
}

/// Assemble a `multipart/related` body carrying JSON metadata followed by the media bytes.
pub fn multipart_related(metadata: &[u8], mime: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(metadata.len() + content.len() + 256);
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata);
    body.extend_from_slice(format!("\r\n--{MULTIPART_BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(format!("Content-Type: {mime}\r\n\r\n").as_bytes());
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{MULTIPART_BOUNDARY}--\r\n").as_bytes());
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_folder_query_has_no_parent_clause() {
        assert_eq!(
            folder_query("FreeThrowData", None),
            "name='FreeThrowData' and mimeType='application/vnd.google-apps.folder' and trashed=false"
        );
    }

    #[test]
    fn nested_folder_query_filters_on_parent() {
        let parent = FolderId::new("abc");
        let query = folder_query("attempts", Some(&parent));
        assert!(query.ends_with(" and 'abc' in parents"));
    }

    #[test]
    fn quotes_and_backslashes_are_escaped() {
        assert_eq!(escape_query_literal(r"o'neil\g1"), r"o\'neil\\g1");
    }

    #[test]
    fn folder_metadata_skips_empty_parents() {
        let value = serde_json::to_value(FileMetadata::folder("root", None)).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"name": "root", "mimeType": FOLDER_MIME})
        );
    }

    #[test]
    fn multipart_body_wraps_both_parts() {
        let body = multipart_related(br#"{"name":"a"}"#, "video/webm", &[0, 1, 2]);
        let text = String::from_utf8_lossy(&body);
        assert!(text.starts_with(&format!("--{MULTIPART_BOUNDARY}\r\n")));
        assert!(text.contains("Content-Type: video/webm\r\n\r\n"));
        assert!(text.ends_with(&format!("\r\n--{MULTIPART_BOUNDARY}--\r\n")));
        assert!(body.windows(3).any(|w| w == [0, 1, 2]));
    }
}
