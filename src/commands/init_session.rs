//! Session initialization command
//!
//! Creates the session token file that archival runs reuse.

use std::io::{self, Write};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::session::get_client_for_init;

pub async fn run(config: &Config) -> Result<()> {
    println!(
        r#"
╔═══════════════════════════════════════════════════════════════╗
║  INITIALIZE A NEW TELEGRAM SESSION                            ║
╚═══════════════════════════════════════════════════════════════╝

⚠️  WARNING:
   This will create a NEW session for the number {}

   THIS WILL:
   - Sign Telegram out on all other devices
   - Invalidate existing sessions

   Are you SURE you want to continue?

   Type 'YES' (uppercase) to confirm: "#,
        config.phone
    );

    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    if input.trim() != "YES" {
        println!("\n❌ Cancelled. No session file was created.");
        return Ok(());
    }

    println!("\n🔄 Creating a new session for {}...", config.phone);
    println!("📱 Watch Telegram for the confirmation code...\n");

    // Connect without existing session
    let client = get_client_for_init(config).await?;

    // Request login code
    let token = client
        .request_login_code(&config.phone, &config.api_hash)
        .await
        .map_err(|e| Error::TelegramError(format!("Failed to request code: {}", e)))?;

    println!("Enter the code from Telegram: ");
    io::stdout().flush()?;

    let mut code = String::new();
    io::stdin().read_line(&mut code)?;
    let code = code.trim();

    // Sign in
    let user = client
        .sign_in(&token, code)
        .await
        .map_err(|e| Error::TelegramError(format!("Failed to sign in: {}", e)))?;

    // Session is auto-saved by SqliteSession

    println!(
        r#"
╔═══════════════════════════════════════════════════════════════╗
║  ✅ SESSION CREATED                                           ║
╚═══════════════════════════════════════════════════════════════╝

Profile:
  Name: {}
  Username: @{}

Session file: {}

From now on:
1. Run archival cycles with the `archive` subcommand
2. Every run reuses this session automatically
3. NEVER run init-session again unless the session is revoked

⚠️  IMPORTANT: keep a backup of the session file
"#,
        user.full_name(),
        user.username().unwrap_or("not set"),
        config.session_file(),
    );

    Ok(())
}
