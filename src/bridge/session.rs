//! Local session records keyed by the `authbridge_session` cookie.

use anyhow::{anyhow, Context, Result};
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};
use std::{
    collections::HashMap,
    sync::RwLock,
    time::{Duration, Instant},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionData {
    pub authenticated: bool,
}

#[derive(Clone, Debug)]
struct SessionRecord {
    data: SessionData,
    expires_at: Instant,
}

pub trait SessionStore: Send + Sync {
    /// Store `data` under `session_id`, replacing any previous record.
    ///
    /// # Errors
    /// Returns an error if the backing store is unavailable.
    fn set_session(&self, session_id: &str, data: SessionData) -> Result<()>;

    /// Fetch a live record, if any.
    ///
    /// # Errors
    /// Returns an error if the backing store is unavailable.
    fn get_session(&self, session_id: &str) -> Result<Option<SessionData>>;

    /// Remove the record. Missing records are not an error.
    ///
    /// # Errors
    /// Returns an error if the backing store is unavailable.
    fn clear_session(&self, session_id: &str) -> Result<()>;
}

/// Process-local store; records expire after `ttl`.
#[derive(Debug)]
pub struct MemorySessionStore {
    ttl: Duration,
    records: RwLock<HashMap<String, SessionRecord>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            records: RwLock::new(HashMap::new()),
        }
    }

    fn purge_expired(records: &mut HashMap<String, SessionRecord>, now: Instant) {
        records.retain(|_, record| record.expires_at > now);
    }
}

impl SessionStore for MemorySessionStore {
    fn set_session(&self, session_id: &str, data: SessionData) -> Result<()> {
        let now = Instant::now();
        let expires_at = now
            .checked_add(self.ttl)
            .ok_or_else(|| anyhow!("session ttl of {}s is out of range", self.ttl.as_secs()))?;
        let mut records = self
            .records
            .write()
            .map_err(|_| anyhow!("session store lock poisoned"))?;
        Self::purge_expired(&mut records, now);
        records.insert(
            session_id.to_string(),
            SessionRecord {
                data,
                expires_at,
            },
        );
        Ok(())
    }

    fn get_session(&self, session_id: &str) -> Result<Option<SessionData>> {
        let records = self
            .records
            .read()
            .map_err(|_| anyhow!("session store lock poisoned"))?;
        Ok(records
            .get(session_id)
            .filter(|record| record.expires_at > Instant::now())
            .map(|record| record.data.clone()))
    }

    fn clear_session(&self, session_id: &str) -> Result<()> {
        self.records
            .write()
            .map_err(|_| anyhow!("session store lock poisoned"))?
            .remove(session_id);
        Ok(())
    }
}

/// Create a new opaque session id for the local session cookie.
///
/// # Errors
/// Returns an error if the OS random source fails.
pub fn generate_session_id() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate session id")?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}
