/// Public Google APIs endpoint.
const DEFAULT_API_BASE: &str = "https://www.googleapis.com";

/// Runtime configuration describing how to reach Google Drive.
#[derive(Debug, Clone)]
pub struct DriveConfig {
    pub api_base: String,
    /// Static bearer token; when absent, service-account credentials are resolved
    /// from `GOOGLE_APPLICATION_CREDENTIALS` by the Google auth library.
    pub access_token: Option<String>,
}

impl DriveConfig {
    /// Construct a configuration targeting `api_base` with service-account credentials.
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            access_token: None,
        }
    }

    /// Authenticate every request with a fixed bearer token.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Build a configuration by reading the expected environment variables.
    pub fn from_env() -> Self {
        let api_base = std::env::var("DRIVE_API_BASE")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let mut config = Self::new(api_base);
        if let Some(token) = std::env::var("DRIVE_ACCESS_TOKEN")
            .ok()
            .filter(|value| !value.trim().is_empty())
        {
            config = config.with_access_token(token);
        }

        config
    }
}
