use axum::http::Extensions;
use google_cloud_auth::credentials::{Builder, CacheableResource, Credentials};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};

use super::error::{DriveDaoError, DriveResult};

/// OAuth scope granting full access to the service account's Drive.
const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

/// Source of the authorization headers attached to every Drive request.
#[derive(Clone, Debug)]
pub enum TokenSource {
    /// Fixed bearer token supplied through the environment.
    Static(HeaderValue),
    /// Application-default credentials (service account) with token refresh.
    Google(Credentials),
}

impl TokenSource {
    /// Use a fixed bearer token.
    pub fn from_token(token: &str) -> DriveResult<Self> {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|source| DriveDaoError::InvalidToken { source })?;
        value.set_sensitive(true);
        Ok(Self::Static(value))
    }

    /// Resolve application-default credentials scoped to Drive.
    pub fn from_default_credentials() -> DriveResult<Self> {
        let credentials = Builder::default()
            .with_scopes([DRIVE_SCOPE])
            .build()
            .map_err(|err| DriveDaoError::Credentials {
                source: Box::new(err),
            })?;
        Ok(Self::Google(credentials))
    }

    /// Headers to attach to the next request, refreshing the token when needed.
    pub async fn headers(&self) -> DriveResult<HeaderMap> {
        match self {
            Self::Static(value) => {
                let mut headers = HeaderMap::new();
                headers.insert(AUTHORIZATION, value.clone());
                Ok(headers)
            }
            Self::Google(credentials) => {
                match credentials
                    .headers(Extensions::new())
                    .await
                    .map_err(|err| DriveDaoError::Credentials {
                        source: Box::new(err),
                    })? {
                    CacheableResource::New { data, .. } => Ok(data),
                    CacheableResource::NotModified => Err(DriveDaoError::MissingAuthHeaders),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_token_becomes_bearer_header() {
        let source = TokenSource::from_token("abc123").unwrap();
        let headers = source.headers().await.unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer abc123");
    }

    #[test]
    fn static_token_rejects_newlines() {
        assert!(matches!(
            TokenSource::from_token("abc\n123"),
            Err(DriveDaoError::InvalidToken { .. })
        ));
    }
}
