//! Archival run command.

use tracing::info;

use crate::archive::Archiver;
use crate::config::Config;
use crate::error::Result;
use crate::session::{get_client, SessionLock};

/// One operational cycle: lock the session, connect, archive every
/// configured channel in order, report the totals.
pub async fn run(config: Config) -> Result<()> {
    // Acquire session lock
    let _lock = SessionLock::acquire(config.lock_file())?;

    // Connect to Telegram
    let client = get_client(&config).await?;

    info!("Starting archival run for {} channels", config.channels.len());

    let archiver = Archiver::new(client.client.clone(), config);
    let summaries = archiver.run().await?;

    let messages: usize = summaries.iter().map(|s| s.messages).sum();
    let media: usize = summaries.iter().map(|s| s.media_downloaded).sum();
    info!(
        "Run complete: {} channels archived, {} messages, {} media files",
        summaries.len(),
        messages,
        media
    );

    client.save()?;

    Ok(())
}
