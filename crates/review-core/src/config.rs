//! Configuration loaded from `config.toml`
//!
//! Every section and key is optional; missing values fall back to the
//! built-in defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::assembler::OverlapPolicy;
use crate::error::ConfigError;
use crate::presentation::{Paginator, DEFAULT_MAX_VISIBLE_PAGES, DEFAULT_PAGE_SIZE};
use crate::session::SessionSettings;
use crate::transport::{FixtureTiming, HttpTransportConfig};

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:5000/review";
pub const DEFAULT_FORM_FIELD: &str = "review_id";

const CONFIG_DIR_NAME: &str = "review-stream";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    pub backend: BackendConfig,
    pub assembler: AssemblerConfig,
    pub presentation: PresentationConfig,
    pub fixture: FixtureConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub endpoint: String,
    pub form_field: String,
    pub connect_timeout_secs: Option<u64>,
    /// Off unless set; a slow review can legitimately pause for a while
    pub idle_timeout_secs: Option<u64>,
    /// Added to the default stream headers
    pub extra_headers: BTreeMap<String, String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            form_field: DEFAULT_FORM_FIELD.to_string(),
            connect_timeout_secs: None,
            idle_timeout_secs: None,
            extra_headers: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblerConfig {
    pub overlap_policy: OverlapPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresentationConfig {
    pub page_size: usize,
    pub max_visible_pages: usize,
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_visible_pages: DEFAULT_MAX_VISIBLE_PAGES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureConfig {
    pub initial_delay_ms: u64,
    pub start_delay_ms: u64,
    pub newline_delay_ms: u64,
    pub content_delay_ms: u64,
    pub speed: f64,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 500,
            start_delay_ms: 1000,
            newline_delay_ms: 200,
            content_delay_ms: 50,
            speed: 1.0,
        }
    }
}

/// `<config_dir>/review-stream/config.toml`, if the platform has a config dir
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

impl ReviewConfig {
    /// Load and validate configuration
    ///
    /// An explicit path must exist. Without one, the default location is
    /// used when present and built-in defaults otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path().filter(|p| p.is_file()) {
                Some(path) => Self::from_file(&path)?,
                None => {
                    debug!("No config file found, using defaults");
                    Self::default()
                }
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml(&content)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.endpoint_url()?;

        if self.backend.form_field.trim().is_empty() {
            return Err(invalid("backend.form_field", "must not be empty"));
        }
        if self.presentation.page_size < 1 {
            return Err(invalid("presentation.page_size", "must be at least 1"));
        }
        if self.presentation.max_visible_pages < DEFAULT_MAX_VISIBLE_PAGES {
            return Err(invalid(
                "presentation.max_visible_pages",
                format!("must be at least {}", DEFAULT_MAX_VISIBLE_PAGES),
            ));
        }
        if !(self.fixture.speed > 0.0 && self.fixture.speed.is_finite()) {
            return Err(invalid("fixture.speed", "must be a positive number"));
        }
        Ok(())
    }

    /// Replace the endpoint (from a CLI flag or environment variable)
    pub fn with_endpoint(mut self, endpoint: Option<String>) -> Result<Self, ConfigError> {
        if let Some(endpoint) = endpoint {
            self.backend.endpoint = endpoint;
            self.endpoint_url()?;
        }
        Ok(self)
    }

    pub fn endpoint_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.backend.endpoint)
            .map_err(|e| invalid("backend.endpoint", e.to_string()))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(invalid(
                "backend.endpoint",
                format!("unsupported scheme '{}'", other),
            )),
        }
    }

    pub fn http_transport_config(&self) -> Result<HttpTransportConfig, ConfigError> {
        Ok(HttpTransportConfig {
            endpoint: self.endpoint_url()?,
            form_field: self.backend.form_field.clone(),
            connect_timeout: self.backend.connect_timeout_secs.map(Duration::from_secs),
            idle_timeout: self.backend.idle_timeout_secs.map(Duration::from_secs),
            extra_headers: self.backend.extra_headers.clone(),
        })
    }

    pub fn fixture_timing(&self) -> FixtureTiming {
        FixtureTiming {
            initial_delay: Duration::from_millis(self.fixture.initial_delay_ms),
            start_delay: Duration::from_millis(self.fixture.start_delay_ms),
            newline_delay: Duration::from_millis(self.fixture.newline_delay_ms),
            content_delay: Duration::from_millis(self.fixture.content_delay_ms),
            speed: self.fixture.speed,
        }
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            overlap_policy: self.assembler.overlap_policy,
        }
    }

    pub fn paginator(&self) -> Paginator {
        Paginator::new(
            self.presentation.page_size,
            self.presentation.max_visible_pages,
        )
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}
