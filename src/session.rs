//! Session management for the Telegram client
//!
//! Provides:
//! - File-based session locking to prevent parallel execution
//! - Session file validation
//! - Client creation with proper configuration

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fs2::FileExt;
use grammers_client::client::updates::UpdatesLike;
use grammers_client::Client;
use grammers_mtsender::{SenderPool, SenderPoolHandle};
use grammers_session::storages::SqliteSession;
use tokio::sync::mpsc;

use crate::config::Config;
use crate::error::{Error, Result};

/// Session lock guard that ensures exclusive access to the Telegram session.
pub struct SessionLock {
    path: PathBuf,
    lock_file: Option<File>,
}

impl SessionLock {
    /// Acquire an exclusive lock on the session.
    pub fn acquire<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| Error::LockError(format!("Failed to open lock file: {}", e)))?;

        match lock_file.try_lock_exclusive() {
            Ok(()) => Ok(Self {
                path,
                lock_file: Some(lock_file),
            }),
            Err(_) => {
                eprintln!(
                    r#"
⚠️  ERROR: the Telegram session is already in use by another process!

Telegram requires operations on one session to run sequentially.
Sharing a session between processes leads to conflicts and bans.

Wait for the other process to finish and try again.
"#
                );
                Err(Error::SessionLocked)
            }
        }
    }

    /// Release the lock manually
    pub fn release(&mut self) {
        if let Some(ref file) = self.lock_file {
            let _ = file.unlock();
        }
        self.lock_file = None;
        let _ = std::fs::remove_file(&self.path);
    }
}

impl Drop for SessionLock {
    fn drop(&mut self) {
        self.release();
    }
}

/// Check if the session file exists.
pub fn check_session_exists(config: &Config) -> Result<()> {
    let session_file = config.session_file();

    if !Path::new(&session_file).exists() {
        eprintln!(
            r#"
⚠️  ERROR: session file '{}' not found!

To create the session file:
1. Run: cargo run --bin init_session
2. Enter the code from Telegram
"#,
            session_file
        );
        return Err(Error::SessionNotFound(session_file));
    }

    Ok(())
}

/// Load an existing session from file.
pub fn load_session(config: &Config) -> Result<Arc<SqliteSession>> {
    let session_file = config.session_file();
    let session = SqliteSession::open(&session_file)
        .map_err(|e| Error::SessionNotFound(format!("Failed to load session: {}", e)))?;
    Ok(Arc::new(session))
}

/// Create a new session (for init_session only).
pub fn create_session(config: &Config) -> Result<Arc<SqliteSession>> {
    let session_file = config.session_file();
    let session = SqliteSession::open(&session_file)
        .map_err(|e| Error::SessionNotFound(format!("Failed to create session: {}", e)))?;
    Ok(Arc::new(session))
}

/// Holder for SenderPool components and Client
pub struct TelegramClient {
    pub client: Client,
    pub handle: SenderPoolHandle,
    session: Arc<SqliteSession>,
    _updates: mpsc::UnboundedReceiver<UpdatesLike>,
    _runner_handle: tokio::task::JoinHandle<()>,
}

impl TelegramClient {
    /// Create a new TelegramClient from session
    pub async fn connect(session: Arc<SqliteSession>, api_id: i32) -> Result<Self> {
        let pool = SenderPool::new(session.clone(), api_id);

        // Create client from pool (need reference to whole pool)
        let client = Client::new(&pool);

        // Get handle and runner after client is created
        let SenderPool {
            runner,
            updates,
            handle,
        } = pool;

        // Spawn the runner in background
        let runner_handle = tokio::spawn(async move {
            runner.run().await;
        });

        Ok(Self {
            client,
            handle,
            session,
            _updates: updates,
            _runner_handle: runner_handle,
        })
    }

    /// Save the session to file
    pub fn save(&self) -> Result<()> {
        save_session(&self.session)
    }
}

// Implement Deref to allow using TelegramClient as &Client
impl std::ops::Deref for TelegramClient {
    type Target = Client;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

/// Save session - SqliteSession auto-saves, this is a no-op for compatibility
pub fn save_session(_session: &SqliteSession) -> Result<()> {
    // SqliteSession auto-saves to the database file
    Ok(())
}

/// Create and connect a Telegram client with an existing session.
pub async fn get_client(config: &Config) -> Result<TelegramClient> {
    check_session_exists(config)?;
    let session = load_session(config)?;
    TelegramClient::connect(session, config.api_id).await
}

/// Create a Telegram client for initialization (no session check).
pub async fn get_client_for_init(config: &Config) -> Result<TelegramClient> {
    let session = create_session(config)?;
    TelegramClient::connect(session, config.api_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_config(dir: &Path, name: &str) -> Config {
        let mut config = Config::new();
        config.session_name = dir.join(name).to_string_lossy().to_string();
        config
    }

    #[test]
    fn test_session_lock_creation() {
        let temp = tempdir().expect("tempdir");
        let lock_path = temp.path().join("test.lock");

        let mut lock = SessionLock::acquire(&lock_path).expect("lock");
        lock.release();
    }

    #[test]
    fn lock_file_is_created_on_acquire() {
        let temp = tempdir().expect("tempdir");
        let lock_path = temp.path().join("test.lock");

        assert!(!lock_path.exists());
        let mut lock = SessionLock::acquire(&lock_path).expect("lock");
        assert!(lock_path.exists());
        lock.release();
    }

    #[test]
    fn release_removes_lock_file() {
        let temp = tempdir().expect("tempdir");
        let lock_path = temp.path().join("test.lock");

        let mut lock = SessionLock::acquire(&lock_path).expect("lock");
        assert!(lock_path.exists());
        lock.release();
        assert!(!lock_path.exists());
    }

    #[test]
    fn lock_dropped_releases_automatically() {
        let temp = tempdir().expect("tempdir");
        let lock_path = temp.path().join("test.lock");

        {
            let _lock = SessionLock::acquire(&lock_path).expect("lock");
            assert!(lock_path.exists());
        }
        // Lock should be released after drop
        assert!(!lock_path.exists());
    }

    #[test]
    fn double_release_is_safe() {
        let temp = tempdir().expect("tempdir");
        let lock_path = temp.path().join("test.lock");

        let mut lock = SessionLock::acquire(&lock_path).expect("lock");
        lock.release();
        lock.release(); // Should not panic
    }

    #[test]
    fn check_session_exists_reports_missing_and_success() {
        use std::fs::File;

        let temp = tempdir().expect("tempdir");
        let config = test_config(temp.path(), "probe");

        let err = check_session_exists(&config).unwrap_err();
        assert!(matches!(err, Error::SessionNotFound(_)));

        File::create(config.session_file()).expect("create session file");

        check_session_exists(&config).expect("session should exist");
    }

    #[test]
    fn check_session_exists_error_names_the_file() {
        let temp = tempdir().expect("tempdir");
        let config = test_config(temp.path(), "missing");

        let result = check_session_exists(&config);
        assert!(result.is_err());

        if let Err(Error::SessionNotFound(path)) = result {
            assert!(path.contains(".session"));
        } else {
            panic!("Expected SessionNotFound error");
        }
    }

    #[test]
    fn save_session_returns_ok() {
        let temp = tempdir().expect("tempdir");
        let config = test_config(temp.path(), "save_probe");

        let session = create_session(&config).expect("create session");
        save_session(session.as_ref()).expect("save session");
    }
}
