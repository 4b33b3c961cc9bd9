//! Configuration: emulator slots, remote provider settings, API endpoint.

use crate::types::SubjectId;
use std::env;

/// Built-in demo login accepted when enabled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DemoAccount {
    pub identifier: String,
    pub secret: String,
    pub subject_id: SubjectId,
}

impl Default for DemoAccount {
    fn default() -> Self {
        Self {
            identifier: "demo@example.com".to_string(),
            secret: "demo123".to_string(),
            subject_id: SubjectId::new("demo-user-id"),
        }
    }
}

/// Emulator configuration.
#[derive(Clone, Debug)]
pub struct EmulatorConfig {
    /// Slot holding the session marker.
    pub session_key: String,

    /// Slot holding the serialized credential map.
    pub credentials_key: String,

    /// Demo login checked after stored credentials (None = disabled).
    pub demo_account: Option<DemoAccount>,

    /// Prefix for generated subject ids.
    pub subject_prefix: String,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            session_key: "user".to_string(),
            credentials_key: "mockUsers".to_string(),
            demo_account: None,
            subject_prefix: "user-".to_string(),
        }
    }
}

impl EmulatorConfig {
    /// Enable the default demo account.
    pub fn with_demo_account(mut self) -> Self {
        self.demo_account = Some(DemoAccount::default());
        self
    }
}

/// Placeholder values shipped in sample env files.
const PLACEHOLDER_API_KEY: &str = "demo-api-key";
const PLACEHOLDER_AUTH_DOMAIN: &str = "demo-project.firebaseapp.com";

/// Settings for the remote identity provider.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProviderSettings {
    pub api_key: Option<String>,
    pub auth_domain: Option<String>,
    pub project_id: Option<String>,
    pub storage_bucket: Option<String>,
    pub messaging_sender_id: Option<String>,
    pub app_id: Option<String>,
    /// Point the remote client at a locally running provider emulator.
    pub use_emulator_host: bool,
}

impl ProviderSettings {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Read settings through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Self {
            api_key: get("AUTH_API_KEY"),
            auth_domain: get("AUTH_DOMAIN"),
            project_id: get("AUTH_PROJECT_ID"),
            storage_bucket: get("AUTH_STORAGE_BUCKET"),
            messaging_sender_id: get("AUTH_MESSAGING_SENDER_ID"),
            app_id: get("AUTH_APP_ID"),
            use_emulator_host: get("AUTH_USE_EMULATOR").as_deref() == Some("true"),
        }
    }

    /// True when enough is set to reach a real provider.
    pub fn is_configured(&self) -> bool {
        match (&self.api_key, &self.auth_domain, &self.project_id) {
            (Some(api_key), Some(auth_domain), Some(_)) => {
                api_key != PLACEHOLDER_API_KEY && auth_domain != PLACEHOLDER_AUTH_DOMAIN
            }
            _ => false,
        }
    }
}

/// Which identity backend the application should use.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Backend {
    Remote(ProviderSettings),
    Emulator,
}

/// Pick the remote provider when it is fully configured, else the emulator.
pub fn resolve_backend(settings: &ProviderSettings) -> Backend {
    if settings.is_configured() {
        tracing::info!(
            auth_domain = settings.auth_domain.as_deref().unwrap_or_default(),
            use_emulator_host = settings.use_emulator_host,
            "Using remote identity provider"
        );
        Backend::Remote(settings.clone())
    } else {
        tracing::warn!("Identity provider configuration incomplete; using local auth emulator");
        Backend::Emulator
    }
}

/// Prediction service URL used during development.
pub const DEVELOPMENT_API_URL: &str = "http://localhost:8000";

/// Prediction service URL used in production builds.
pub const PRODUCTION_API_URL: &str =
    "https://foresightcare-ehbrhahub9cxf5gk.canadacentral-01.azurewebsites.net";

/// Resolved prediction service endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiEndpoint(pub String);

impl ApiEndpoint {
    /// A non-empty override wins; otherwise pick by build mode.
    pub fn resolve(custom_url: Option<&str>, is_development: bool) -> Self {
        let url = match custom_url.map(str::trim).filter(|u| !u.is_empty()) {
            Some(url) => url.to_string(),
            None if is_development => DEVELOPMENT_API_URL.to_string(),
            None => PRODUCTION_API_URL.to_string(),
        };
        tracing::debug!(url = %url, "API URL configured");
        ApiEndpoint(url)
    }

    /// Resolve using `PREDICTION_API_URL` as the override.
    pub fn from_env(is_development: bool) -> Self {
        Self::resolve(env::var("PREDICTION_API_URL").ok().as_deref(), is_development)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
