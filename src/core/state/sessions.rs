// src/core/state/sessions.rs

//! Tracks every live connection and its login state.

use crate::core::{ChatError, ConnectionId};
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use tracing::{debug, info, warn};

lazy_static! {
    static ref NICKNAME_PATTERN: Regex =
        Regex::new(r"^[A-Za-z0-9]{3,15}$").expect("nickname pattern is a valid regex");
}

/// Returns true if `nickname` is 3 to 15 ASCII letters or digits.
pub fn is_valid_nickname(nickname: &str) -> bool {
    NICKNAME_PATTERN.is_match(nickname)
}

/// The state held for a single connection.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub connection_id: ConnectionId,
    pub remote_addr: String,
    pub connected_at: DateTime<Utc>,
    pub nickname: Option<String>,
    pub authenticated: bool,
}

impl Session {
    fn new(connection_id: ConnectionId, remote_addr: String) -> Self {
        Self {
            connection_id,
            remote_addr,
            connected_at: Utc::now(),
            nickname: None,
            authenticated: false,
        }
    }
}

/// Owns all sessions. Only the event loop mutates it, so it needs no locking.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<ConnectionId, Session>,
    /// Claimed nicknames and the connection holding each one.
    nicknames: HashMap<String, ConnectionId>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new, unauthenticated session. A stale entry for the same id
    /// is replaced and its nickname released.
    pub fn on_connect(&mut self, id: ConnectionId, remote_addr: impl Into<String>) {
        let remote_addr = remote_addr.into();
        if let Some(stale) = self.sessions.remove(&id) {
            warn!(
                connection_id = id,
                "Session for connection {} already existed; replacing it.", id
            );
            self.release_nickname(&stale);
        }
        debug!(connection_id = id, remote_addr = %remote_addr, "Session registered.");
        self.sessions.insert(id, Session::new(id, remote_addr));
    }

    /// Authenticates a connection under `nickname`.
    pub fn login(&mut self, id: ConnectionId, nickname: &str) -> Result<(), ChatError> {
        let session = self.sessions.get(&id).ok_or(ChatError::NotConnected(id))?;
        if session.authenticated {
            return Err(ChatError::AlreadyLoggedIn);
        }
        if !is_valid_nickname(nickname) {
            return Err(ChatError::InvalidNickname);
        }
        if let Some(holder) = self.nicknames.get(nickname)
            && *holder != id
        {
            return Err(ChatError::NicknameTaken(nickname.to_string()));
        }

        self.nicknames.insert(nickname.to_string(), id);
        if let Some(session) = self.sessions.get_mut(&id) {
            session.nickname = Some(nickname.to_string());
            session.authenticated = true;
        }
        info!(connection_id = id, nickname, "User logged in.");
        Ok(())
    }

    /// Removes the session and returns the nickname it held, if it was logged in.
    pub fn logout(&mut self, id: ConnectionId) -> Option<String> {
        let session = self.sessions.remove(&id)?;
        self.release_nickname(&session);
        if session.authenticated {
            session.nickname
        } else {
            None
        }
    }

    /// Same as [`logout`](Self::logout); called when the socket goes away.
    pub fn on_disconnect(&mut self, id: ConnectionId) -> Option<String> {
        self.logout(id)
    }

    pub fn nickname(&self, id: ConnectionId) -> Option<&str> {
        self.sessions
            .get(&id)
            .filter(|s| s.authenticated)
            .and_then(|s| s.nickname.as_deref())
    }

    pub fn is_authenticated(&self, id: ConnectionId) -> bool {
        self.sessions.get(&id).is_some_and(|s| s.authenticated)
    }

    pub fn session(&self, id: ConnectionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn authenticated_count(&self) -> usize {
        self.sessions.values().filter(|s| s.authenticated).count()
    }

    fn release_nickname(&mut self, session: &Session) {
        if let Some(nickname) = &session.nickname
            && self.nicknames.get(nickname) == Some(&session.connection_id)
        {
            self.nicknames.remove(nickname);
        }
    }
}
