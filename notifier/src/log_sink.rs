use async_trait::async_trait;
use tracing::info;

use crate::{DeliveryError, NotificationSink};

/// Writes alerts to the log instead of delivering them. Used when no
/// delivery channel is configured.
#[derive(Debug, Default, Clone)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn dispatch(&self, message: &str, formatted: bool) -> Result<(), DeliveryError> {
        info!(target: "alerts", formatted, "{message}");
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}
