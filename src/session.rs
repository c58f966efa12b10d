use anyhow::{anyhow, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use log::info;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Read;
use std::path::PathBuf;

/// A signed-in user's identity as handed over by the authentication
/// collaborator. Owns the lifetime of the push connection: no session means
/// no connection and no stores.
#[derive(Serialize, Deserialize, Clone)]
pub struct Session {
    pub user_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<String>,
}

impl Session {
    pub fn new(user_id: i64, token: &str) -> Self {
        Session {
            user_id,
            token: Some(BASE64.encode(token)),
        }
    }

    /// Decode the bearer token stored with this session.
    pub fn token(&self) -> Option<String> {
        self.token.as_ref().map(|encoded| {
            String::from_utf8(BASE64.decode(encoded).unwrap_or_default()).unwrap_or_default()
        })
    }
}

pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| anyhow!("Could not determine config directory"))?
        .join("parley");

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

pub fn save_session(session: &Session) -> Result<()> {
    let session_path = get_session_path()?;
    let file = File::create(session_path)?;
    serde_json::to_writer_pretty(file, session)?;

    info!("Session saved for user {}", session.user_id);
    Ok(())
}

pub fn load_session() -> Result<Option<Session>> {
    let session_path = get_session_path()?;

    if !session_path.exists() {
        return Ok(None);
    }

    // Keep the path as a string for logging before the PathBuf moves
    let session_path_str = session_path.display().to_string();

    let mut file = File::open(session_path)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;

    let session: Session = serde_json::from_str(&contents)?;
    info!(
        "Loaded session for user {} from {}",
        session.user_id, session_path_str
    );

    Ok(Some(session))
}

/// Remove the persisted session, if any. Called at logout.
pub fn clear_session() -> Result<()> {
    let session_path = get_session_path()?;

    if session_path.exists() {
        fs::remove_file(session_path)?;
        info!("Cleared persisted session");
    }

    Ok(())
}

static SESSION_PATH_OVERRIDE: OnceCell<PathBuf> = OnceCell::new();

/// Redirect the session file, used by tests to avoid touching the real
/// config directory.
pub fn set_session_path_override(path: PathBuf) {
    let _ = SESSION_PATH_OVERRIDE.set(path);
}

fn get_session_path() -> Result<PathBuf> {
    if let Some(path) = SESSION_PATH_OVERRIDE.get() {
        return Ok(path.clone());
    }
    Ok(get_config_dir()?.join("session.json"))
}
