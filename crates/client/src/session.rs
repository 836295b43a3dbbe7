//! Signed-in state.
//!
//! A [`Session`] is created at login, handed explicitly to every call that
//! needs a credential and dropped at logout. [`SessionStore`] is the only
//! thing that persists it between runs.

use std::{
    fs,
    path::{Path, PathBuf},
};

use api_types::auth::CurrentUser;
use engine::{UserId, capitalize, name_from_email};
use serde::{Deserialize, Serialize};

use crate::{
    api::ApiClient,
    error::{ClientError, Result},
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    token: String,
    user: CurrentUser,
}

impl Session {
    pub fn new(token: String, user: CurrentUser) -> Self {
        Self { token, user }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn user(&self) -> &CurrentUser {
        &self.user
    }

    pub fn user_id(&self) -> UserId {
        UserId(self.user.id)
    }

    pub fn display_name(&self) -> String {
        match self.user.first_name.as_deref().map(str::trim) {
            Some(first) if !first.is_empty() => capitalize(first),
            _ => name_from_email(&self.user.email),
        }
    }
}

/// JSON file holding the current session.
#[derive(Clone, Debug)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<Session>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let payload = serde_json::to_string_pretty(session)?;
        fs::write(&self.path, payload)?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Loads the stored session and checks it against `/api/auth/me`.
    ///
    /// A refused credential clears the store and yields `None`, which sends
    /// the user back to the public commands. Other failures are returned
    /// and leave the store untouched.
    pub async fn restore(&self, api: &ApiClient) -> Result<Option<Session>> {
        let Some(session) = self.load()? else {
            return Ok(None);
        };

        match api.current_user(&session).await {
            Ok(user) => {
                let refreshed = Session::new(session.token.clone(), user);
                if refreshed != session {
                    self.save(&refreshed)?;
                }
                Ok(Some(refreshed))
            }
            Err(err) if err.is_auth_failure() => {
                tracing::info!("stored session rejected by server, logging out");
                self.clear()?;
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Requires a stored session without contacting the server.
    pub fn require(&self) -> Result<Session> {
        self.load()?.ok_or(ClientError::NotAuthenticated)
    }
}
