//! Session initialization binary.

use telegram_archiver::commands::init_session;
use telegram_archiver::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    init_session::run(&Config::new()).await?;
    Ok(())
}
