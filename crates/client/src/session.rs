//! Locally persisted session and UI preferences.
//!
//! Everything lives in one JSON file. Logging out clears the token and user
//! but keeps preferences.

use std::{
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
};

use db::models::user::User;
use serde::{Deserialize, Serialize};

use crate::error::SessionError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorTheme {
    Light,
    Dark,
    #[default]
    System,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub color_theme: ColorTheme,
    /// Team slugs whose boards are pinned, in pin order.
    #[serde(default)]
    pub pinned_boards: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SessionState {
    token: Option<String>,
    user: Option<User>,
    #[serde(default)]
    preferences: Preferences,
}

/// Shared handle; clones see the same state.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    path: Option<Arc<PathBuf>>,
    state: Arc<RwLock<SessionState>>,
}

impl SessionStore {
    /// A store that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Loads `path` if it exists; later changes are written back to it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let path = path.as_ref().to_path_buf();
        let state = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => SessionState::default(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self {
            path: Some(Arc::new(path)),
            state: Arc::new(RwLock::new(state)),
        })
    }

    pub fn token(&self) -> Option<String> {
        self.read(|state| state.token.clone())
    }

    pub fn user(&self) -> Option<User> {
        self.read(|state| state.user.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.read(|state| state.token.is_some())
    }

    pub fn preferences(&self) -> Preferences {
        self.read(|state| state.preferences.clone())
    }

    pub fn set_token(&self, token: String) -> Result<(), SessionError> {
        self.update(|state| state.token = Some(token))
    }

    pub fn set_user(&self, user: User) -> Result<(), SessionError> {
        self.update(|state| state.user = Some(user))
    }

    /// Forced logout. Credentials leave memory even when the file write fails.
    pub fn clear(&self) -> Result<(), SessionError> {
        let snapshot = {
            let mut guard = self.state.write().unwrap_or_else(|err| err.into_inner());
            guard.token = None;
            guard.user = None;
            guard.clone()
        };
        self.persist(&snapshot)
    }

    pub fn set_color_theme(&self, color_theme: ColorTheme) -> Result<(), SessionError> {
        self.update(|state| state.preferences.color_theme = color_theme)
    }

    /// Pins a board; pinning twice keeps the original position.
    pub fn pin_board(&self, team_slug: &str) -> Result<(), SessionError> {
        self.update(|state| {
            let pinned = &mut state.preferences.pinned_boards;
            if !pinned.iter().any(|slug| slug == team_slug) {
                pinned.push(team_slug.to_string());
            }
        })
    }

    pub fn unpin_board(&self, team_slug: &str) -> Result<(), SessionError> {
        self.update(|state| {
            state
                .preferences
                .pinned_boards
                .retain(|slug| slug != team_slug)
        })
    }

    fn read<T>(&self, f: impl FnOnce(&SessionState) -> T) -> T {
        let guard = self.state.read().unwrap_or_else(|err| err.into_inner());
        f(&guard)
    }

    /// Applies `f` to a copy and swaps it in only after it is saved.
    fn update(&self, f: impl FnOnce(&mut SessionState)) -> Result<(), SessionError> {
        let mut guard = self.state.write().unwrap_or_else(|err| err.into_inner());
        let mut next = guard.clone();
        f(&mut next);
        self.persist(&next)?;
        *guard = next;
        Ok(())
    }

    fn persist(&self, state: &SessionState) -> Result<(), SessionError> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_vec_pretty(state)?)?;
        tracing::debug!(path = %path.display(), "Session saved");
        Ok(())
    }
}
