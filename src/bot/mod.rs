// Chat-facing side of the bot: commands, formatting, outbound notifications
pub mod commands;
pub mod console;
pub mod context;
pub mod format;
pub mod telegram;
pub mod telegram_types;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("chat API rejected the message ({code:?}): {description}")]
    Api { code: Option<i64>, description: String },
    #[error("failed to write notification: {0}")]
    Io(#[from] std::io::Error),
}

/// The single outbound channel loop reports go to.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, text: &str) -> Result<(), NotifyError>;
}

/// Prints notifications to stdout with the markup removed.
pub struct StdoutNotifier;

#[async_trait]
impl Notifier for StdoutNotifier {
    async fn notify(&self, text: &str) -> Result<(), NotifyError> {
        use tokio::io::AsyncWriteExt;

        let mut out = tokio::io::stdout();
        out.write_all(format!("\n{}\n", format::strip_tags(text)).as_bytes()).await?;
        out.flush().await?;
        Ok(())
    }
}
