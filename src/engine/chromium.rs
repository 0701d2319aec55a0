//! Chromiumoxide engine adapter
//!
//! Launches Chrome/Chromium with stealth arguments and exposes it through
//! the capability traits. Each engine process gets its own profile
//! directory so concurrent instances never contend on a profile lock, and
//! each pooled context maps to an isolated CDP browser context.

use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfigBuilder, HeadlessMode};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams,
};
use futures::{FutureExt, StreamExt};
use tokio::sync::Mutex;
use tokio::task::{self, JoinHandle};
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use super::{ContextHandle, ContextOptions, EngineFactory, EngineHandle, PageHandle};

/// User agent presented by pooled browsers.
const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";

/// Find Chrome/Chromium executable on the system with platform-specific search paths.
pub fn find_browser_executable() -> Result<PathBuf> {
    // CHROMIUM_PATH overrides all other discovery methods
    if let Ok(path) = std::env::var("CHROMIUM_PATH") {
        let path = PathBuf::from(path);
        if path.exists() {
            info!("Using browser from CHROMIUM_PATH: {}", path.display());
            return Ok(path);
        }
        warn!(
            "CHROMIUM_PATH points to non-existent file: {}",
            path.display()
        );
    }

    let paths = if cfg!(target_os = "windows") {
        vec![
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files\Chromium\Application\chrome.exe",
        ]
    } else if cfg!(target_os = "macos") {
        vec![
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "~/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/opt/homebrew/bin/chromium",
        ]
    } else {
        vec![
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
            "/usr/local/bin/chromium",
            "/opt/google/chrome/chrome",
        ]
    };

    for path_str in paths {
        let path = if let Some(rest) = path_str.strip_prefix("~/") {
            match dirs::home_dir() {
                Some(home) => home.join(rest),
                None => continue,
            }
        } else {
            PathBuf::from(path_str)
        };

        if path.exists() {
            info!("Found browser at: {}", path.display());
            return Ok(path);
        }
    }

    if !cfg!(target_os = "windows") {
        for cmd in &["chromium", "chromium-browser", "google-chrome", "chrome"] {
            if let Ok(output) = Command::new("which").arg(cmd).output()
                && output.status.success()
            {
                let path_str = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path_str.is_empty() {
                    let path = PathBuf::from(path_str);
                    info!("Found browser via 'which': {}", path.display());
                    return Ok(path);
                }
            }
        }
    }

    Err(anyhow::anyhow!(
        "Chrome/Chromium executable not found; set CHROMIUM_PATH to override discovery"
    ))
}

struct EngineInner {
    browser: Mutex<Browser>,
    handler_task: JoinHandle<()>,
    user_data_dir: PathBuf,
}

/// A running Chrome/Chromium process driven over CDP.
pub struct ChromiumEngine {
    inner: Arc<EngineInner>,
}

impl ChromiumEngine {
    /// Launch a new browser process with stealth-mode arguments and a
    /// unique profile directory.
    pub async fn launch(headless: bool) -> Result<Self> {
        let chrome_path = find_browser_executable()?;

        let user_data_dir =
            std::env::temp_dir().join(format!("stealthswarm_profile_{}", Uuid::new_v4()));
        std::fs::create_dir_all(&user_data_dir)
            .context("Failed to create user data directory")?;

        let mut config_builder = BrowserConfigBuilder::default()
            .request_timeout(Duration::from_secs(30))
            .window_size(1920, 1080)
            .user_data_dir(user_data_dir.clone())
            .chrome_executable(chrome_path);

        if headless {
            config_builder = config_builder.headless_mode(HeadlessMode::default());
        } else {
            config_builder = config_builder.with_head();
        }

        config_builder = config_builder
            .arg(format!("--user-agent={CHROME_USER_AGENT}"))
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-infobars")
            .arg("--disable-notifications")
            .arg("--disable-desktop-notifications")
            .arg("--disable-software-rasterizer")
            .arg("--disable-setuid-sandbox")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--no-sandbox")
            .arg("--ignore-certificate-errors")
            .arg("--disable-extensions")
            .arg("--disable-popup-blocking")
            .arg("--disable-background-networking")
            .arg("--disable-background-timer-throttling")
            .arg("--disable-backgrounding-occluded-windows")
            .arg("--disable-breakpad")
            .arg("--disable-hang-monitor")
            .arg("--disable-ipc-flooding-protection")
            .arg("--disable-prompt-on-repost")
            .arg("--metrics-recording-only")
            .arg("--password-store=basic")
            .arg("--use-mock-keychain")
            .arg("--hide-scrollbars")
            .arg("--mute-audio");

        let browser_config = config_builder
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build browser config: {e}"))?;

        debug!("Launching browser with profile {}", user_data_dir.display());
        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .context("Failed to launch browser")?;

        let handler_task = task::spawn(async move {
            while let Some(h) = handler.next().await {
                if let Err(e) = h {
                    let error_msg = e.to_string();

                    // Chrome emits CDP events chromiumoxide doesn't recognize;
                    // those deserialization failures are not fatal.
                    // https://github.com/mattsse/chromiumoxide/issues/167
                    let is_benign_serialization_error = error_msg
                        .contains("data did not match any variant of untagged enum Message")
                        || error_msg.contains("Failed to deserialize WS response");

                    if is_benign_serialization_error {
                        trace!("Suppressed benign CDP serialization error: {error_msg}");
                    } else {
                        error!("Browser handler error: {e:?}");
                    }
                }
            }
            debug!("Browser handler task completed");
        });

        Ok(Self {
            inner: Arc::new(EngineInner {
                browser: Mutex::new(browser),
                handler_task,
                user_data_dir,
            }),
        })
    }

    /// Build an `EngineFactory` closure for the pools.
    #[must_use]
    pub fn factory(headless: bool) -> EngineFactory {
        Arc::new(move || {
            async move {
                let engine = Self::launch(headless).await?;
                Ok(Box::new(engine) as Box<dyn EngineHandle>)
            }
            .boxed()
        })
    }
}

#[async_trait]
impl EngineHandle for ChromiumEngine {
    async fn new_context(
        &self,
        options: ContextOptions<'_>,
    ) -> Result<Box<dyn ContextHandle>> {
        let mut params = CreateBrowserContextParams::default();
        params.dispose_on_detach = Some(true);
        if let Some(proxy) = options.proxy {
            params.proxy_server = Some(proxy.to_string());
        }
        // Fingerprints are applied by the anti-detection layer upstream;
        // here the tag is carried for correlation only.

        let context_id = {
            let browser = self.inner.browser.lock().await;
            browser
                .create_browser_context(params)
                .await
                .context("Failed to create browser context")?
        };

        Ok(Box::new(ChromiumContext {
            inner: Arc::clone(&self.inner),
            context_id,
        }))
    }

    async fn close(&self) -> Result<()> {
        let mut browser = self.inner.browser.lock().await;
        let close_result = browser.close().await;
        let _ = browser.wait().await;
        drop(browser);

        self.inner.handler_task.abort();

        if let Err(e) = std::fs::remove_dir_all(&self.inner.user_data_dir) {
            warn!(
                "Failed to remove profile directory {}: {e}",
                self.inner.user_data_dir.display()
            );
        }

        close_result.context("Failed to close browser")?;
        Ok(())
    }
}

/// An isolated CDP browser context inside one engine process.
struct ChromiumContext {
    inner: Arc<EngineInner>,
    context_id: BrowserContextId,
}

#[async_trait]
impl ContextHandle for ChromiumContext {
    async fn new_page(&self) -> Result<Box<dyn PageHandle>> {
        let mut params = CreateTargetParams::new("about:blank");
        params.browser_context_id = Some(self.context_id.clone());

        let page = {
            let browser = self.inner.browser.lock().await;
            browser
                .new_page(params)
                .await
                .context("Failed to create page")?
        };

        Ok(Box::new(ChromiumPage { page }))
    }

    async fn close(&self) -> Result<()> {
        let browser = self.inner.browser.lock().await;
        browser
            .dispose_browser_context(self.context_id.clone())
            .await
            .context("Failed to dispose browser context")?;
        Ok(())
    }
}

/// A page inside a pooled context.
struct ChromiumPage {
    page: chromiumoxide::Page,
}

#[async_trait]
impl PageHandle for ChromiumPage {
    async fn goto(&self, url: &str) -> Result<()> {
        self.page
            .goto(url)
            .await
            .with_context(|| format!("Failed to navigate to {url}"))?;
        Ok(())
    }

    async fn content(&self) -> Result<String> {
        self.page.content().await.context("Failed to read content")
    }

    async fn reset(&self) -> Result<()> {
        self.page
            .goto("about:blank")
            .await
            .context("Failed to reset page")?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.page
            .clone()
            .close()
            .await
            .context("Failed to close page")?;
        Ok(())
    }
}
