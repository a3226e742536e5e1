use crate::config;
use crate::models::Session;
use std::fs;
use std::path::PathBuf;

// The browser SDK keeps its session in local storage; the terminal
// equivalent is a JSON file next to the config.
fn session_path() -> Option<PathBuf> {
    config::config_dir().map(|dir| dir.join("session.json"))
}

/// A session only opens the authenticated view when it carries both a
/// non-empty access token and a user id.
pub fn is_authenticated(session: Option<&Session>) -> bool {
    match session {
        Some(session) => !session.access_token.is_empty() && !session.user.id.is_empty(),
        None => false,
    }
}

/// Restores the stored session, if any. Any failure (missing file,
/// unreadable JSON) just leaves the gate in the unauthenticated state.
pub fn load() -> Option<Session> {
    let path = session_path()?;
    let raw = fs::read_to_string(path).ok()?;
    serde_json::from_str(&raw).ok()
}

pub fn save(session: &Session) {
    let Some(path) = session_path() else {
        return;
    };
    if let Some(dir) = path.parent() {
        let _ = fs::create_dir_all(dir);
    }
    match serde_json::to_string(session) {
        Ok(raw) => {
            if let Err(err) = fs::write(&path, raw) {
                eprintln!("Error saving session: {}", err);
            }
        }
        Err(err) => eprintln!("Error serializing session: {}", err),
    }
}

pub fn clear() {
    if let Some(path) = session_path() {
        let _ = fs::remove_file(path);
    }
}
