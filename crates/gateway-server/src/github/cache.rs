use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Tokens are dropped this long before the provider says they expire.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Installation tokens live an hour; anything longer is clamped.
const MAX_TTL_SECS: i64 = 3_600;

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    valid_until: DateTime<Utc>,
}

/// Installation-token cache keyed by installation id.
///
/// A zero TTL disables caching entirely, so every request goes back to the
/// token endpoint.
#[derive(Debug, Clone)]
pub struct TokenCache {
    ttl: Duration,
    entries: Arc<Mutex<HashMap<u64, CachedToken>>>,
}

impl TokenCache {
    pub fn disabled() -> Self {
        Self::with_ttl_secs(0)
    }

    pub fn with_ttl_secs(secs: u64) -> Self {
        Self {
            ttl: Duration::seconds(i64::try_from(secs).unwrap_or(MAX_TTL_SECS).min(MAX_TTL_SECS)),
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.ttl > Duration::zero()
    }

    pub fn get(&self, installation_id: u64, now: DateTime<Utc>) -> Option<String> {
        if !self.is_enabled() {
            return None;
        }
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get(&installation_id) {
            Some(cached) if cached.valid_until > now => Some(cached.token.clone()),
            Some(_) => {
                entries.remove(&installation_id);
                None
            }
            None => None,
        }
    }

    pub fn put(
        &self,
        installation_id: u64,
        token: &str,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) {
        if !self.is_enabled() {
            return;
        }
        let mut valid_until = now + self.ttl;
        if let Some(expires_at) = expires_at {
            valid_until = valid_until.min(expires_at - Duration::seconds(EXPIRY_MARGIN_SECS));
        }
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            installation_id,
            CachedToken {
                token: token.to_string(),
                valid_until,
            },
        );
    }
}
