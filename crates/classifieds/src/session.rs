//! Server-side sessions
//!
//! Sessions live in memory, keyed by a random id the browser keeps in a
//! cookie. They carry the logged-in identity and a queue of flash notices.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;

pub const SESSION_COOKIE: &str = "classifieds_session";
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30 * 60);

/// Anonymous sessions kept before the least recently used ones are evicted
pub const DEFAULT_MAX_ANONYMOUS_SESSIONS: usize = 10_000;

/// Who a session belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// Logged in with a username and password
    Username(String),
    /// Logged in through single sign-on
    Email(String),
}

impl Identity {
    pub fn display_name(&self) -> &str {
        match self {
            Identity::Username(name) | Identity::Email(name) => name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    pub fn new(level: FlashLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

#[derive(Debug)]
struct Session {
    identity: Option<Identity>,
    flashes: Vec<Flash>,
    last_activity: Instant,
}

impl Session {
    fn new(identity: Option<Identity>, flashes: Vec<Flash>) -> Self {
        Self {
            identity,
            flashes,
            last_activity: Instant::now(),
        }
    }
}

pub struct SessionStore {
    sessions: Mutex<HashMap<String, Session>>,
    ttl: Duration,
    max_anonymous: usize,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
            max_anonymous: DEFAULT_MAX_ANONYMOUS_SESSIONS,
        }
    }

    /// Cap the number of sessions that only hold flashes
    pub fn with_anonymous_limit(mut self, max_anonymous: usize) -> Self {
        self.max_anonymous = max_anonymous.max(1);
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_expired(&self, session: &Session) -> bool {
        session.last_activity.elapsed() >= self.ttl
    }

    /// Identity of a live session, refreshing its idle timer
    ///
    /// An expired session is dropped along with its pending flashes.
    pub fn identity(&self, id: &str) -> Option<Identity> {
        let mut sessions = self.lock();

        let expired = self.is_expired(sessions.get(id)?);
        if expired {
            log::debug!("Session expired");
            sessions.remove(id);
            return None;
        }

        let session = sessions.get_mut(id)?;
        let identity = session.identity.clone()?;
        session.last_activity = Instant::now();
        Some(identity)
    }

    /// Start an authenticated session and return its id
    ///
    /// The previous session, if any, is replaced and its pending flashes move
    /// to the new one.
    pub fn login(&self, previous: Option<&str>, identity: Identity) -> String {
        let mut sessions = self.lock();

        let flashes = previous
            .and_then(|id| sessions.remove(id))
            .map(|session| session.flashes)
            .unwrap_or_default();

        let id = new_session_id();
        sessions.insert(id.clone(), Session::new(Some(identity), flashes));
        id
    }

    /// Queue a flash, creating an anonymous session when `id` is not live
    ///
    /// Returns the id of the session holding the flash.
    pub fn push_flash(&self, id: Option<&str>, flash: Flash) -> String {
        let mut sessions = self.lock();

        if let Some(id) = id {
            if let Some(session) = sessions.get_mut(id) {
                if !self.is_expired(session) {
                    session.flashes.push(flash);
                    return id.to_string();
                }
                sessions.remove(id);
            }
        }

        self.make_room_for_anonymous(&mut sessions);

        let id = new_session_id();
        sessions.insert(id.clone(), Session::new(None, vec![flash]));
        id
    }

    /// Evict anonymous sessions, least recently used first, until one more fits
    fn make_room_for_anonymous(&self, sessions: &mut HashMap<String, Session>) {
        let mut anonymous: Vec<(Instant, String)> = sessions
            .iter()
            .filter(|(_, session)| session.identity.is_none())
            .map(|(id, session)| (session.last_activity, id.clone()))
            .collect();

        if anonymous.len() < self.max_anonymous {
            return;
        }

        anonymous.sort_unstable();
        let excess = anonymous.len() + 1 - self.max_anonymous;
        for (_, id) in anonymous.into_iter().take(excess) {
            sessions.remove(&id);
        }
        log::debug!("Evicted {excess} anonymous sessions");
    }

    /// Drain the pending flashes of a live session
    pub fn take_flashes(&self, id: &str) -> Vec<Flash> {
        let mut sessions = self.lock();

        let Some(session) = sessions.get_mut(id) else {
            return Vec::new();
        };

        if self.is_expired(session) {
            sessions.remove(id);
            return Vec::new();
        }

        std::mem::take(&mut session.flashes)
    }

    /// Number of sessions held, live or not yet purged
    pub fn count(&self) -> usize {
        self.lock().len()
    }

    pub fn destroy(&self, id: &str) {
        self.lock().remove(id);
    }

    /// Drop every expired session, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, session| session.last_activity.elapsed() < self.ttl);
        before - sessions.len()
    }
}

fn new_session_id() -> String {
    hex::encode(rand::random::<[u8; 32]>())
}
