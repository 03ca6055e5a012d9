//! Chromium backend over the DevTools protocol

use crate::browser::{Browser, BrowserError, BrowserResult, BrowserTab};
use crate::config::BrowserConfig;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpBrowserConfig};
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use futures::StreamExt;
use std::time::Duration;
use tokio::task::JoinHandle;

/// A launched Chromium process plus the task pumping its protocol events
///
/// Created with [`ChromiumBrowser::launch`] before a run and released with
/// [`ChromiumBrowser::shutdown`] after it, whether the run succeeded or not.
pub struct ChromiumBrowser {
    browser: CdpBrowser,
    handler: JoinHandle<()>,
}

impl ChromiumBrowser {
    /// Launches Chromium with the configured switches
    ///
    /// `request_timeout` bounds every protocol request, including the wait
    /// for a navigation to commit, and should match the page-ready ceiling.
    pub async fn launch(config: &BrowserConfig, request_timeout: Duration) -> BrowserResult<Self> {
        let mut builder = CdpBrowserConfig::builder().request_timeout(request_timeout);

        if !config.headless {
            builder = builder.with_head();
        }
        if config.no_sandbox {
            builder = builder.no_sandbox();
        }
        if config.single_process {
            builder = builder.arg("--single-process");
        }
        if let Some(executable) = &config.executable {
            builder = builder.chrome_executable(executable);
        }
        builder = builder.args(config.args.iter());

        let cdp_config = builder.build().map_err(BrowserError::Launch)?;

        let (browser, mut handler) = CdpBrowser::launch(cdp_config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("Browser event error: {}", e);
                }
            }
        });

        tracing::info!(headless = config.headless, "Browser started");

        Ok(Self { browser, handler })
    }

    /// Closes the browser and stops the event task
    pub async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            tracing::warn!("Failed to close browser cleanly: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            tracing::warn!("Failed to wait for browser process: {}", e);
        }

        if tokio::time::timeout(Duration::from_secs(5), &mut self.handler)
            .await
            .is_err()
        {
            self.handler.abort();
        }

        tracing::info!("Browser stopped");
    }
}

#[async_trait]
impl Browser for ChromiumBrowser {
    async fn open_tab(&self) -> BrowserResult<Box<dyn BrowserTab>> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(protocol_error)?;
        Ok(Box::new(ChromiumTab { page }))
    }
}

struct ChromiumTab {
    page: Page,
}

#[async_trait]
impl BrowserTab for ChromiumTab {
    async fn navigate(&mut self, url: &str) -> BrowserResult<()> {
        match self.page.goto(url).await {
            Ok(_) => Ok(()),
            Err(CdpError::Timeout) => Err(BrowserError::Timeout(format!("navigating to {}", url))),
            Err(e) => Err(BrowserError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            }),
        }
    }

    async fn execute_script(&mut self, script: &str) -> BrowserResult<serde_json::Value> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| match e {
                CdpError::Timeout => BrowserError::Timeout(format!("evaluating {}", script)),
                other => BrowserError::Script(other.to_string()),
            })?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn title(&mut self) -> BrowserResult<Option<String>> {
        self.page.get_title().await.map_err(protocol_error)
    }

    async fn content(&mut self) -> BrowserResult<String> {
        self.page.content().await.map_err(protocol_error)
    }

    async fn close(&mut self) -> BrowserResult<()> {
        self.page.clone().close().await.map_err(protocol_error)
    }
}

fn protocol_error(err: CdpError) -> BrowserError {
    match err {
        CdpError::Timeout => BrowserError::Timeout("browser request".to_string()),
        other => BrowserError::Protocol(other.to_string()),
    }
}
