//! Browser control over the Chrome DevTools Protocol.
//!
//! When compiled with the `browser` feature, [`Browser`] launches chromium
//! through chromiumoxide and hands out one [`CdpDriver`] per scenario. Every
//! driver lives in its own browser context, so cookies and local storage never
//! leak between scenarios.
//!
//! Locators are resolved in the page by an embedded script that receives the
//! serialized locator chain. Native dialogs are answered by a background task
//! per page, which consults the page's [`crate::DialogSlot`].

use crate::config::HarnessConfig;
use std::path::PathBuf;

/// Browser configuration
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Run in headless mode
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<PathBuf>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 800,
            chromium_path: None,
            sandbox: true,
        }
    }
}

impl BrowserConfig {
    /// Browser settings taken from a harness configuration
    #[must_use]
    pub fn from_harness(config: &HarnessConfig) -> Self {
        Self {
            headless: config.headless,
            chromium_path: config.chromium_path.clone(),
            ..Self::default()
        }
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }
}

/// Locator resolver evaluated inside the page
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
const RESOLVER: &str = include_str!("resolver.js");

/// Build the expression that runs the resolver for one action.
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
fn resolver_call(
    locator: &crate::Locator,
    action: &str,
    index: usize,
    value: &str,
) -> crate::HarnessResult<String> {
    Ok(format!(
        "({})({}, {}, {index}, {})",
        RESOLVER.trim_end(),
        serde_json::to_string(locator)?,
        serde_json::to_string(action)?,
        serde_json::to_string(value)?,
    ))
}

// ============================================================================
// Real CDP Implementation (when `browser` feature is enabled)
// ============================================================================

#[cfg(feature = "browser")]
#[allow(clippy::significant_drop_tightening, clippy::missing_errors_doc)]
mod cdp {
    use super::{resolver_call, BrowserConfig};
    use crate::dialog::{DialogAction, DialogSlot, DialogType};
    use crate::driver::{ElementInfo, PageDriver, SessionFactory};
    use crate::locator::Locator;
    use crate::result::{HarnessError, HarnessResult};
    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
    use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
    use chromiumoxide::cdp::browser_protocol::page::{
        DialogType as CdpDialogType, EventJavascriptDialogOpening, HandleJavaScriptDialogParams,
    };
    use chromiumoxide::cdp::browser_protocol::target::{
        CreateBrowserContextParams, CreateTargetParams,
    };
    use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
    use chromiumoxide::page::Page as CdpPage;
    use futures::StreamExt;
    use serde::Deserialize;
    use std::sync::Arc;
    use tokio::sync::Mutex;
    use tokio::task::JoinHandle;

    /// Browser instance with real CDP connection
    #[derive(Debug)]
    pub struct Browser {
        config: BrowserConfig,
        inner: Arc<Mutex<CdpBrowser>>,
        handle: JoinHandle<()>,
    }

    impl Browser {
        /// Launch a new browser instance
        ///
        /// # Errors
        ///
        /// Returns a browser error if chromium cannot be started
        pub async fn launch(config: BrowserConfig) -> HarnessResult<Self> {
            let mut builder = CdpConfig::builder()
                .window_size(config.viewport_width, config.viewport_height);

            if !config.headless {
                builder = builder.with_head();
            }

            if !config.sandbox {
                builder = builder.no_sandbox();
            }

            if let Some(ref path) = config.chromium_path {
                builder = builder.chrome_executable(path);
            }

            let cdp_config = builder.build().map_err(HarnessError::browser)?;

            let (browser, mut handler) = CdpBrowser::launch(cdp_config)
                .await
                .map_err(|e| HarnessError::browser(format!("launch failed: {e}")))?;

            let handle = tokio::spawn(async move {
                while let Some(h) = handler.next().await {
                    if h.is_err() {
                        break;
                    }
                }
            });

            tracing::info!(headless = config.headless, "browser launched");
            Ok(Self {
                config,
                inner: Arc::new(Mutex::new(browser)),
                handle,
            })
        }

        /// Get the browser configuration
        #[must_use]
        pub const fn config(&self) -> &BrowserConfig {
            &self.config
        }

        /// Open a page in a fresh browser context
        ///
        /// # Errors
        ///
        /// Returns a browser error if the context or page cannot be created
        pub async fn new_driver(&self) -> HarnessResult<CdpDriver> {
            let (page, context) = {
                let mut browser = self.inner.lock().await;
                let context = browser
                    .create_browser_context(CreateBrowserContextParams::default())
                    .await
                    .map_err(|e| HarnessError::browser(format!("create context: {e}")))?;
                let params = CreateTargetParams::builder()
                    .url("about:blank")
                    .browser_context_id(context.clone())
                    .build()
                    .map_err(HarnessError::browser)?;
                let page = browser
                    .new_page(params)
                    .await
                    .map_err(|e| HarnessError::browser(format!("new page: {e}")))?;
                (page, context)
            };

            let dialogs = DialogSlot::new();
            let listener = spawn_dialog_listener(page.clone(), dialogs.clone()).await?;

            Ok(CdpDriver {
                page,
                context: Some(context),
                browser: Arc::clone(&self.inner),
                dialogs,
                listener,
                url: String::from("about:blank"),
            })
        }

        /// Close the browser
        ///
        /// # Errors
        ///
        /// Returns a browser error if chromium does not shut down cleanly
        pub async fn close(self) -> HarnessResult<()> {
            let mut browser = self.inner.lock().await;
            browser
                .close()
                .await
                .map_err(|e| HarnessError::browser(e.to_string()))?;
            self.handle.abort();
            Ok(())
        }
    }

    #[async_trait]
    impl SessionFactory for Browser {
        async fn open_page(&self) -> HarnessResult<Box<dyn PageDriver>> {
            Ok(Box::new(self.new_driver().await?))
        }
    }

    /// Answer every native dialog the page opens via the page's dialog slot.
    async fn spawn_dialog_listener(
        page: CdpPage,
        dialogs: DialogSlot,
    ) -> HarnessResult<JoinHandle<()>> {
        let mut events = page
            .event_listener::<EventJavascriptDialogOpening>()
            .await
            .map_err(|e| HarnessError::dialog(format!("subscribe: {e}")))?;

        Ok(tokio::spawn(async move {
            while let Some(event) = events.next().await {
                let kind = match event.r#type {
                    CdpDialogType::Alert => DialogType::Alert,
                    CdpDialogType::Confirm => DialogType::Confirm,
                    CdpDialogType::Prompt => DialogType::Prompt,
                    CdpDialogType::Beforeunload => DialogType::BeforeUnload,
                };
                let dialog = dialogs.answer(kind, event.message.clone(), event.default_prompt.clone());

                let mut params = HandleJavaScriptDialogParams::new(dialog.was_accepted());
                if let DialogAction::AcceptedWith(text) = dialog.action() {
                    params.prompt_text = Some(text.clone());
                }
                if let Err(e) = page.execute(params).await {
                    tracing::warn!(error = %e, "failed to answer dialog");
                }
            }
        }))
    }

    #[derive(Debug, Deserialize)]
    struct Reply {
        #[serde(default)]
        elements: Vec<ElementInfo>,
        error: Option<String>,
    }

    /// One page in its own browser context
    #[derive(Debug)]
    pub struct CdpDriver {
        page: CdpPage,
        context: Option<BrowserContextId>,
        browser: Arc<Mutex<CdpBrowser>>,
        dialogs: DialogSlot,
        listener: JoinHandle<()>,
        url: String,
    }

    impl CdpDriver {
        async fn run(
            &self,
            locator: &Locator,
            action: &str,
            index: usize,
            value: &str,
        ) -> HarnessResult<Reply> {
            let expression = resolver_call(locator, action, index, value)?;
            let params = EvaluateParams::builder()
                .expression(expression)
                .return_by_value(true)
                .build()
                .map_err(HarnessError::browser)?;
            let result = self
                .page
                .evaluate_expression(params)
                .await
                .map_err(|e| HarnessError::browser(format!("{action} {locator}: {e}")))?;
            let reply: Reply = result
                .into_value()
                .map_err(|e| HarnessError::browser(format!("{action} {locator}: {e}")))?;
            match reply.error {
                Some(message) => Err(HarnessError::browser(format!("{action} {locator}: {message}"))),
                None => Ok(reply),
            }
        }
    }

    #[async_trait]
    impl PageDriver for CdpDriver {
        async fn goto(&mut self, url: &str) -> HarnessResult<()> {
            self.page
                .goto(url)
                .await
                .map_err(|e| HarnessError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;
            self.url = url.to_string();
            Ok(())
        }

        async fn resolve(&self, locator: &Locator) -> HarnessResult<Vec<ElementInfo>> {
            Ok(self.run(locator, "resolve", 0, "").await?.elements)
        }

        async fn click(&mut self, locator: &Locator, index: usize) -> HarnessResult<()> {
            self.run(locator, "click", index, "").await.map(|_| ())
        }

        async fn fill(&mut self, locator: &Locator, index: usize, value: &str) -> HarnessResult<()> {
            self.run(locator, "fill", index, value).await.map(|_| ())
        }

        async fn current_url(&self) -> HarnessResult<String> {
            Ok(self
                .page
                .url()
                .await
                .map_err(|e| HarnessError::browser(e.to_string()))?
                .unwrap_or_else(|| self.url.clone()))
        }

        fn dialogs(&self) -> &DialogSlot {
            &self.dialogs
        }

        async fn close(&mut self) -> HarnessResult<()> {
            self.dialogs.disarm();
            self.listener.abort();
            let Some(context) = self.context.take() else {
                return Ok(());
            };
            if let Err(e) = self.page.clone().close().await {
                tracing::debug!(error = %e, "page already closed");
            }
            let browser = self.browser.lock().await;
            browser
                .dispose_browser_context(context)
                .await
                .map_err(|e| HarnessError::browser(format!("dispose context: {e}")))
        }
    }
}

#[cfg(feature = "browser")]
pub use cdp::{Browser, CdpDriver};
