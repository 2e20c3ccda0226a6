//! Configuration module for the Clovord desktop shell
//!
//! Settings are layered with the `config` crate:
//! - built-in defaults
//! - optional `settings.json` in the platform config directory
//! - `CLOVORD_*` environment variables
//!
//! The update feed credential never goes through these layers; it is read
//! from `GH_TOKEN` / `GITHUB_TOKEN` by [`update_credentials`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use super::error::{Result, ShellError};
use crate::update::{CoordinatorConfig, FeedConfig};

/// Remote web application loaded in the main window
pub const DEFAULT_REMOTE_ORIGIN: &str = "https://clovord.com";

/// Release manifest polled by the updater
pub const DEFAULT_UPDATE_FEED_URL: &str = "https://clovord.com/desktop/latest.json";

/// Prefix of environment overrides (`CLOVORD_REMOTE_ORIGIN`, ...)
pub const ENV_PREFIX: &str = "CLOVORD";

/// Environment variables holding the update feed credential, in order
pub const TOKEN_VARIABLES: [&str; 2] = ["GH_TOKEN", "GITHUB_TOKEN"];

/// Main shell configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShellConfig {
    /// Origin of the wrapped web application
    pub remote_origin: String,

    /// URL of the release manifest
    pub update_feed_url: String,

    /// Seconds between recurring update checks
    pub update_check_interval_secs: u64,

    /// Seconds an install may take before it is reported as stalled
    pub install_timeout_secs: u64,

    /// Where downloaded packages are stored; platform data dir when unset
    #[serde(default)]
    pub download_dir: Option<PathBuf>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            remote_origin: DEFAULT_REMOTE_ORIGIN.to_string(),
            update_feed_url: DEFAULT_UPDATE_FEED_URL.to_string(),
            update_check_interval_secs: 600,
            install_timeout_secs: 30,
            download_dir: None,
        }
    }
}

impl ShellConfig {
    /// Load from the platform config directory and the process environment
    pub fn load() -> Result<Self> {
        Self::load_from(Self::settings_path().as_deref(), None)
    }

    /// Load from an explicit settings file and environment.
    ///
    /// `env` replaces the process environment when given.
    pub fn load_from(
        settings: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self> {
        let defaults = Self::default();

        let mut builder = config::Config::builder()
            .set_default("remote_origin", defaults.remote_origin)?
            .set_default("update_feed_url", defaults.update_feed_url)?
            .set_default(
                "update_check_interval_secs",
                defaults.update_check_interval_secs as i64,
            )?
            .set_default("install_timeout_secs", defaults.install_timeout_secs as i64)?;

        if let Some(path) = settings {
            tracing::debug!("Reading settings from {}", path.display());
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Json)
                    .required(false),
            );
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .source(env),
        );

        let loaded: Self = builder.build()?.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// `<config dir>/Clovord/settings.json`
    pub fn settings_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("Clovord").join("settings.json"))
    }

    /// Reject values the shell cannot run with
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("remote_origin", &self.remote_origin),
            ("update_feed_url", &self.update_feed_url),
        ] {
            if !(value.starts_with("https://") || value.starts_with("http://")) {
                return Err(ShellError::InvalidConfig {
                    field: field.to_string(),
                    reason: format!("expected an http(s) URL, got '{}'", value),
                });
            }
        }
        if self.update_check_interval_secs == 0 {
            return Err(ShellError::InvalidConfig {
                field: "update_check_interval_secs".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Coordinator settings for this build
    pub fn coordinator_config(
        &self,
        dev_mode: bool,
        credentials: Option<SecretString>,
    ) -> CoordinatorConfig {
        let install_timeout = match self.install_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        CoordinatorConfig::new(dev_mode)
            .with_credentials(credentials)
            .with_check_interval(Duration::from_secs(self.update_check_interval_secs))
            .with_install_timeout(install_timeout)
    }

    /// Release feed settings
    pub fn feed_config(&self) -> FeedConfig {
        let mut feed = FeedConfig {
            feed_url: self.update_feed_url.clone(),
            ..FeedConfig::default()
        };
        if let Some(dir) = &self.download_dir {
            feed.download_dir = dir.clone();
        }
        feed
    }
}

/// Update feed credential from the process environment
pub fn update_credentials() -> Option<SecretString> {
    credentials_from(|name| std::env::var(name).ok())
}

/// First non-blank value of [`TOKEN_VARIABLES`] according to `lookup`
pub fn credentials_from(lookup: impl Fn(&str) -> Option<String>) -> Option<SecretString> {
    TOKEN_VARIABLES.iter().find_map(|name| {
        lookup(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(SecretString::new)
    })
}
