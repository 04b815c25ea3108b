//! The Chromium engine: one browser connection, one target per view.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Child;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use tabpilot_config::EngineConfig;
use tabpilot_protocols::{BrowserEngine, EngineError, PageView};

use crate::client::CdpClient;
use crate::error::CdpError;
use crate::launch;
use crate::view::CdpPageView;

/// Views start blank; the registry loads the real URL.
const BLANK: &str = "about:blank";

pub struct CdpEngine {
    config: EngineConfig,
    client: Mutex<Option<Arc<CdpClient>>>,
    /// Browser process, if we launched it.
    browser: Mutex<Option<Child>>,
}

impl CdpEngine {
    /// The browser is reached lazily, on the first view.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            client: Mutex::new(None),
            browser: Mutex::new(None),
        }
    }

    /// Use an already connected client.
    pub fn with_client(config: EngineConfig, client: Arc<CdpClient>) -> Self {
        Self {
            config,
            client: Mutex::new(Some(client)),
            browser: Mutex::new(None),
        }
    }

    /// HTTP debugging endpoint.
    pub fn endpoint(&self) -> String {
        format!("http://127.0.0.1:{}", self.config.debug_port)
    }

    /// Connect to the browser, launching it if configured to.
    pub async fn connect(&self) -> Result<Arc<CdpClient>, CdpError> {
        let mut client = self.client.lock().await;
        if let Some(existing) = client.as_ref() {
            if !existing.is_closed() {
                return Ok(existing.clone());
            }
            warn!("Browser connection lost, reconnecting");
        }

        let endpoint = self.endpoint();
        if !launch::is_running(&endpoint).await {
            if !self.config.launch {
                return Err(CdpError::BrowserNotAvailable(endpoint));
            }
            info!("No browser on port {}, launching", self.config.debug_port);
            let child = launch::launch(&self.config, &endpoint).await?;
            *self.browser.lock().await = Some(child);
        } else {
            debug!("Browser already running on port {}", self.config.debug_port);
        }

        let connected = Arc::new(CdpClient::connect(&endpoint).await?);
        connected.discover_targets().await?;
        info!("Connected to browser at {}", endpoint);
        *client = Some(connected.clone());
        Ok(connected)
    }
}

#[async_trait]
impl BrowserEngine for CdpEngine {
    fn name(&self) -> &str {
        "chromium"
    }

    async fn create_view(&self) -> Result<Arc<dyn PageView>, EngineError> {
        let client = self.connect().await?;
        let target_id = client.create_target(BLANK).await?;
        match CdpPageView::open(client.clone(), &target_id).await {
            Ok(view) => Ok(Arc::new(view)),
            Err(e) => {
                if let Err(close_err) = client.close_target(&target_id).await {
                    debug!("Failed to close half-open target {}: {}", target_id, close_err);
                }
                Err(e.into())
            }
        }
    }

    async fn shutdown(&self) -> Result<(), EngineError> {
        self.client.lock().await.take();
        if let Some(mut child) = self.browser.lock().await.take() {
            info!("Shutting down browser");
            if let Err(e) = child.kill().await {
                warn!("Failed to stop browser: {}", e);
            }
        }
        Ok(())
    }
}
