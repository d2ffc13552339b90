use std::sync::Arc;

use async_trait::async_trait;
use metrics::counter;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::application::render::service::ComrakConverter;
use crate::application::render::types::{Converter, RenderError};

pub(crate) const METRIC_CONVERTER_LOAD_TOTAL: &str = "markpane_converter_load_total";

/// Produces the converter on first use. Implementations may be slow or fail;
/// the pipeline retries on the next render after a failure.
#[async_trait]
pub trait ConverterLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn Converter>, RenderError>;
}

/// Loader for the converter compiled into the binary. Never fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinConverterLoader;

#[async_trait]
impl ConverterLoader for BuiltinConverterLoader {
    async fn load(&self) -> Result<Arc<dyn Converter>, RenderError> {
        Ok(Arc::new(ComrakConverter::new()))
    }
}

/// Converter handle shared by every render of one context.
///
/// Concurrent first calls await the same in-flight load, so the loader runs at
/// most once per success. A failed load leaves the cell empty.
pub struct ConverterCell {
    loader: Arc<dyn ConverterLoader>,
    converter: OnceCell<Arc<dyn Converter>>,
}

impl ConverterCell {
    pub fn new(loader: Arc<dyn ConverterLoader>) -> Self {
        Self {
            loader,
            converter: OnceCell::new(),
        }
    }

    #[cfg(test)]
    fn is_loaded(&self) -> bool {
        self.converter.initialized()
    }

    pub async fn get(&self) -> Result<Arc<dyn Converter>, RenderError> {
        self.converter
            .get_or_try_init(|| async {
                let loaded = self.loader.load().await;
                match &loaded {
                    Ok(_) => {
                        counter!(METRIC_CONVERTER_LOAD_TOTAL, "result" => "ok").increment(1);
                        info!(
                            target = "markpane::render::loader",
                            "Markdown converter loaded"
                        );
                    }
                    Err(err) => {
                        counter!(METRIC_CONVERTER_LOAD_TOTAL, "result" => "error").increment(1);
                        warn!(
                            target = "markpane::render::loader",
                            error = %err,
                            "Markdown converter failed to load"
                        );
                    }
                }
                loaded
            })
            .await
            .cloned()
    }
}
