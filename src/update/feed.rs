//! Release feed backend
//!
//! [`FeedBackend`] implements [`UpdateBackend`] against a JSON release
//! manifest served over HTTPS:
//! - version check against the running build
//! - resumable streamed download with throttled progress events
//! - SHA-256 verification of the downloaded package
//! - hand-over to the installer on quit

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::RwLock;
use reqwest::header::{AUTHORIZATION, RANGE, RETRY_AFTER};
use secrecy::ExposeSecret;
use sha2::{Digest, Sha256};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use super::backend::{BackendEvent, BackendEvents, BackendOptions, UpdateBackend};
use super::error::{Result, UpdateError};
use super::event::{DownloadProgress, UpdateFile, UpdateMetadata};

/// Minimum delay between two progress events
const PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

/// Configuration for the release feed backend
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// URL of the release manifest
    pub feed_url: String,
    /// Directory for downloaded packages
    pub download_dir: PathBuf,
    /// HTTP request timeout
    pub timeout: Duration,
    /// Version of the running build
    pub current_version: semver::Version,
    /// Platform name matched against `UpdateFile::platform`
    pub platform: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        let download_dir = dirs::data_local_dir()
            .map(|dir| dir.join("Clovord").join("updates"))
            .unwrap_or_else(|| PathBuf::from("updates"));

        Self {
            feed_url: "https://clovord.com/desktop/latest.json".to_string(),
            download_dir,
            timeout: Duration::from_secs(60),
            current_version: semver::Version::parse(env!("CARGO_PKG_VERSION"))
                .unwrap_or_else(|_| semver::Version::new(0, 1, 0)),
            platform: std::env::consts::OS.to_string(),
        }
    }
}

/// Parse a release version, tolerating a leading `v`
pub fn parse_version(version: &str) -> Result<semver::Version> {
    let trimmed = version.trim().trim_start_matches('v');
    semver::Version::parse(trimmed)
        .map_err(|e| UpdateError::InvalidVersion(format!("{}: {}", version, e)))
}

/// Called once the installer is running; expected to end the process
pub type ExitHook = Arc<dyn Fn() + Send + Sync>;

/// Update backend reading a JSON release manifest
pub struct FeedBackend {
    config: FeedConfig,
    client: reqwest::Client,
    events: BackendEvents,
    options: RwLock<BackendOptions>,
    /// Release found by the last check
    latest: RwLock<Option<UpdateMetadata>>,
    /// Downloaded package ready to install
    pending: RwLock<Option<(UpdateMetadata, PathBuf)>>,
    exit: ExitHook,
}

impl FeedBackend {
    /// Create a backend reporting to `events`
    pub fn new(config: FeedConfig, events: BackendEvents) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(format!("Clovord-Desktop/{}", config.current_version))
            .build()?;

        Ok(Self {
            config,
            client,
            events,
            options: RwLock::new(BackendOptions::default()),
            latest: RwLock::new(None),
            pending: RwLock::new(None),
            exit: Arc::new(|| std::process::exit(0)),
        })
    }

    /// Replace the default `process::exit(0)` run after the installer starts.
    ///
    /// The desktop shell passes a hook that flushes logging first.
    pub fn with_exit_hook(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.exit = Arc::new(hook);
        self
    }

    /// Release found by the last check, if newer than the running build
    pub fn latest(&self) -> Option<UpdateMetadata> {
        self.latest.read().clone()
    }

    /// Downloaded package, if any
    pub fn pending_path(&self) -> Option<PathBuf> {
        self.pending.read().as_ref().map(|(_, path)| path.clone())
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.options.read().credentials.as_ref() {
            Some(token) => request.header(
                AUTHORIZATION,
                format!("token {}", token.expose_secret().trim()),
            ),
            None => request,
        }
    }

    /// Pick the package for this platform
    fn select_file<'a>(&self, meta: &'a UpdateMetadata) -> Option<&'a UpdateFile> {
        meta.files
            .iter()
            .find(|file| file.platform.as_deref() == Some(self.config.platform.as_str()))
            .or_else(|| meta.files.iter().find(|file| file.platform.is_none()))
    }

    fn package_name(meta: &UpdateMetadata, file: &UpdateFile) -> String {
        file.url
            .rsplit('/')
            .next()
            .map(|name| name.split(['?', '#']).next().unwrap_or(name))
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("clovord-{}.update", meta.version))
    }

    /// Stream the package to disk, resuming a partial file when present
    async fn fetch_package(&self, meta: &UpdateMetadata, file: &UpdateFile) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.config.download_dir).await?;

        let filename = Self::package_name(meta, file);
        let target_path = self.config.download_dir.join(&filename);
        let partial_path = self.config.download_dir.join(format!("{}.part", filename));

        let mut downloaded: u64 = 0;
        if partial_path.exists() {
            downloaded = tokio::fs::metadata(&partial_path).await?.len();
            tracing::info!("Resuming update download from byte {}", downloaded);
        }

        tracing::info!("Downloading update from: {}", file.url);

        let mut request = self.authorize(self.client.get(&file.url));
        if downloaded > 0 {
            request = request.header(RANGE, format!("bytes={}-", downloaded));
        }
        let response = request.send().await?;

        if response.status() == reqwest::StatusCode::OK && downloaded > 0 {
            // Server ignored the range; start over.
            downloaded = 0;
            tokio::fs::remove_file(&partial_path).await.ok();
        } else if !response.status().is_success() {
            return Err(UpdateError::DownloadFailed(format!(
                "Server returned status: {}",
                response.status()
            )));
        }

        let total = if file.size > 0 {
            file.size
        } else {
            response.content_length().map(|len| len + downloaded).unwrap_or(0)
        };

        let mut out = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&partial_path)
            .await?;

        let mut stream = response.bytes_stream();
        let start_time = Instant::now();
        let mut last_progress_time = start_time;
        let resumed_from = downloaded;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            out.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;

            let now = Instant::now();
            if now.duration_since(last_progress_time) >= PROGRESS_INTERVAL {
                last_progress_time = now;
                let elapsed = now.duration_since(start_time).as_secs_f64();
                let bytes_per_second = if elapsed > 0.0 {
                    ((downloaded - resumed_from) as f64 / elapsed) as u64
                } else {
                    0
                };
                self.events.emit(BackendEvent::DownloadProgress(DownloadProgress {
                    percent: percent_of(downloaded, total),
                    bytes_per_second,
                    transferred: downloaded,
                    total,
                }));
            }
        }

        out.flush().await?;
        drop(out);

        if let Some(expected) = file.sha256.as_deref() {
            let actual = sha256_file(&partial_path).await?;
            if !actual.eq_ignore_ascii_case(expected) {
                tokio::fs::remove_file(&partial_path).await.ok();
                return Err(UpdateError::ChecksumMismatch {
                    expected: expected.to_string(),
                    actual,
                });
            }
        }

        tokio::fs::rename(&partial_path, &target_path).await?;
        mark_executable(&target_path).await?;

        self.events.emit(BackendEvent::DownloadProgress(DownloadProgress {
            percent: 100.0,
            bytes_per_second: 0,
            transferred: downloaded,
            total: total.max(downloaded),
        }));

        Ok(target_path)
    }
}

#[async_trait]
impl UpdateBackend for FeedBackend {
    fn configure(&self, options: BackendOptions) {
        tracing::debug!(
            authenticated = options.credentials.is_some(),
            auto_download = options.auto_download,
            auto_install_on_app_quit = options.auto_install_on_app_quit,
            "Configuring release feed backend"
        );
        *self.options.write() = options;
    }

    async fn check_for_updates(&self) -> Result<()> {
        self.events.emit(BackendEvent::CheckingForUpdate);

        tracing::info!("Checking for updates at: {}", self.config.feed_url);

        let response = self.authorize(self.client.get(&self.config.feed_url)).send().await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(60);

            return Err(UpdateError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if !response.status().is_success() {
            return Err(UpdateError::CheckFailed(format!(
                "Server returned status: {}",
                response.status()
            )));
        }

        let meta: UpdateMetadata = response.json().await?;
        let version = parse_version(&meta.version)?;

        if version > self.config.current_version {
            tracing::info!(
                "Update available: {} -> {}",
                self.config.current_version,
                version
            );
            *self.latest.write() = Some(meta.clone());
            self.events.emit(BackendEvent::UpdateAvailable(meta));
        } else {
            tracing::info!("Already running latest version: {}", self.config.current_version);
            *self.latest.write() = None;
            self.events.emit(BackendEvent::UpdateNotAvailable(Some(meta)));
        }

        Ok(())
    }

    async fn download_update(&self) -> Result<()> {
        let meta = self.latest().ok_or(UpdateError::NoUpdateDiscovered)?;
        let file = self.select_file(&meta).cloned().ok_or_else(|| {
            UpdateError::DownloadFailed(format!(
                "Release {} has no package for {}",
                meta.version, self.config.platform
            ))
        })?;

        let path = self.fetch_package(&meta, &file).await?;
        tracing::info!("Update downloaded successfully: {}", path.display());

        *self.pending.write() = Some((meta.clone(), path));
        self.events.emit(BackendEvent::UpdateDownloaded(meta));
        Ok(())
    }

    fn quit_and_install(&self) -> Result<()> {
        let (meta, installer) = self
            .pending
            .read()
            .clone()
            .ok_or(UpdateError::NoPendingUpdate)?;

        tracing::info!(
            "Installing update: {} -> {}",
            self.config.current_version,
            meta.version
        );

        launch_installer(&installer)?;

        tracing::info!("Exiting for update...");
        (self.exit)();
        Ok(())
    }
}

fn percent_of(done: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        ((done as f64 / total as f64) * 100.0).min(100.0)
    }
}

/// Calculate the hex SHA-256 of a file
async fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 1024 * 1024];

    loop {
        let n = file.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Make a downloaded package runnable
#[cfg(unix)]
async fn mark_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = tokio::fs::metadata(path).await?.permissions();
    perms.set_mode(0o755);
    tokio::fs::set_permissions(path, perms).await?;
    Ok(())
}

#[cfg(not(unix))]
async fn mark_executable(_path: &Path) -> Result<()> {
    Ok(())
}

fn launch_installer(installer: &Path) -> Result<()> {
    std::process::Command::new(installer)
        .spawn()
        .map(|_| ())
        .map_err(|e| UpdateError::InstallFailed(e.to_string()))
}
