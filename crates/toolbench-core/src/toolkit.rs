use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info};

use crate::config::AppConfig;
use crate::error::Result;
use crate::pdf::{MupdfRasterizer, Rasterizer};
use crate::tools::{CompressTool, JoinTool, SplitTool};

type RasterizerFactory = Box<dyn Fn() -> Arc<dyn Rasterizer> + Send + Sync>;

/// Shared context for every tool: configuration plus the page renderer.
///
/// The renderer is built on first use and dropped by [`Toolkit::shutdown`];
/// tools that never rasterize never pay for it.
pub struct Toolkit {
    config: AppConfig,
    factory: RasterizerFactory,
    rasterizer: Mutex<Option<Arc<dyn Rasterizer>>>,
}

impl Toolkit {
    /// Create a toolkit that renders with mupdf
    pub fn new(config: AppConfig) -> Arc<Self> {
        Self::with_rasterizer_factory(config, || Arc::new(MupdfRasterizer::new()))
    }

    /// Create a toolkit with a custom renderer
    pub fn with_rasterizer_factory<F>(config: AppConfig, factory: F) -> Arc<Self>
    where
        F: Fn() -> Arc<dyn Rasterizer> + Send + Sync + 'static,
    {
        Arc::new(Self {
            config,
            factory: Box::new(factory),
            rasterizer: Mutex::new(None),
        })
    }

    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    /// The shared renderer, constructing it if needed
    pub fn rasterizer(&self) -> Arc<dyn Rasterizer> {
        let mut slot = self.rasterizer.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slot.get_or_insert_with(|| {
            let rasterizer = (self.factory)();
            info!("Initialized {} rasterizer", rasterizer.name());
            rasterizer
        }))
    }

    pub fn has_rasterizer(&self) -> bool {
        self.rasterizer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Drop the shared renderer. A later job builds a fresh one.
    pub fn shutdown(&self) {
        if self
            .rasterizer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
        {
            debug!("Released rasterizer");
        }
    }

    pub fn join_tool(self: &Arc<Self>) -> Result<JoinTool> {
        JoinTool::new(Arc::clone(self))
    }

    pub fn split_tool(self: &Arc<Self>) -> Result<SplitTool> {
        SplitTool::new(Arc::clone(self))
    }

    pub fn compress_tool(self: &Arc<Self>) -> Result<CompressTool> {
        CompressTool::new(Arc::clone(self))
    }
}
