//! Options for the generated API and its OpenAPI document.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_TITLE: &str = "Entity REST API";
pub const DEFAULT_DESCRIPTION: &str = "Exposing a SQL database as REST";
pub const DEFAULT_VERSION: &str = "1.0.0";
pub const DEFAULT_DOCUMENTATION_PATH: &str = "/documentation/json";
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// `info` object of the OpenAPI document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenApiInfo {
    pub title: String,
    pub description: String,
    pub version: String,
}

impl Default for OpenApiInfo {
    fn default() -> Self {
        OpenApiInfo {
            title: DEFAULT_TITLE.into(),
            description: DEFAULT_DESCRIPTION.into(),
            version: DEFAULT_VERSION.into(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Mount point for entity routes, e.g. "/api". Empty mounts at the root.
    pub prefix: String,
    pub documentation_path: String,
    pub info: OpenApiInfo,
    /// Entity names that get no routes and no documentation.
    pub ignore: Vec<String>,
    /// Maximum request body size in bytes.
    pub body_limit: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            prefix: String::new(),
            documentation_path: DEFAULT_DOCUMENTATION_PATH.into(),
            info: OpenApiInfo::default(),
            ignore: Vec::new(),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

impl ApiConfig {
    pub fn with_info(mut self, info: OpenApiInfo) -> Self {
        self.info = info;
        self
    }

    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_string();
        self
    }

    pub fn with_ignore(mut self, entity: &str) -> Self {
        self.ignore.push(entity.to_string());
        self
    }

    /// Prefix with a leading slash and no trailing slash ("" when unset).
    pub fn normalized_prefix(&self) -> String {
        let trimmed = self.prefix.trim().trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{}", trimmed)
        }
    }

    pub fn is_ignored(&self, entity: &str) -> bool {
        self.ignore.iter().any(|e| e == entity)
    }

    /// Read overrides from the environment: `API_PREFIX`, `API_DOCS_PATH`, `OPENAPI_TITLE`,
    /// `OPENAPI_DESCRIPTION`, `OPENAPI_VERSION`, `API_IGNORE` (comma list), `API_BODY_LIMIT`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = ApiConfig::default();
        if let Some(prefix) = lookup("API_PREFIX") {
            config.prefix = prefix;
        }
        if let Some(path) = lookup("API_DOCS_PATH") {
            config.documentation_path = path;
        }
        if let Some(title) = lookup("OPENAPI_TITLE") {
            config.info.title = title;
        }
        if let Some(description) = lookup("OPENAPI_DESCRIPTION") {
            config.info.description = description;
        }
        if let Some(version) = lookup("OPENAPI_VERSION") {
            config.info.version = version;
        }
        if let Some(ignore) = lookup("API_IGNORE") {
            config.ignore = ignore
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(limit) = lookup("API_BODY_LIMIT") {
            config.body_limit = limit.trim().parse().map_err(|_| ConfigError::Env {
                name: "API_BODY_LIMIT",
                reason: format!("expected a byte count, got '{}'", limit),
            })?;
        }
        Ok(config)
    }
}
