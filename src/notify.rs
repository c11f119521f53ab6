use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::Deployment;

/// Delivers password-reset links to users.
#[async_trait]
pub trait ResetNotifier: Send + Sync {
    async fn send_reset(&self, email: &str, reset_url: &str) -> anyhow::Result<()>;
}

/// Writes the link to the log in development; production needs a real transport.
#[derive(Clone)]
pub struct LogNotifier {
    deployment: Deployment,
}

impl LogNotifier {
    pub fn new(deployment: Deployment) -> Self {
        Self { deployment }
    }
}

#[async_trait]
impl ResetNotifier for LogNotifier {
    async fn send_reset(&self, email: &str, reset_url: &str) -> anyhow::Result<()> {
        match self.deployment {
            Deployment::Development => {
                info!(%email, %reset_url, "password reset link issued");
            }
            Deployment::Production => {
                warn!(%email, "password reset issued but no mail transport is configured");
            }
        }
        Ok(())
    }
}
